//! Bookkeeping for attached page targets and the active-session pointer.

use serde::Serialize;

use crate::cdp::target::{SessionId, TargetId};

/// A daemon-side handle tracking one attached page target.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSession {
    /// Identifier of the target this session is attached to.
    pub target_id: TargetId,
    /// Identifier of the attached devtools session.
    pub session_id: SessionId,
    pub url: String,
    pub title: String,
}

impl PageSession {
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.target_id.as_ref().to_string(),
            url: self.url.clone(),
            title: self.title.clone(),
        }
    }
}

/// The wire rendering of a session in `status` output and ambiguity hints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub url: String,
    pub title: String,
}

/// Outcome of a fuzzy target lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Match(PageSession),
    Ambiguous(Vec<PageSession>),
    NotFound,
}

/// Shortest query that participates in id-prefix matching. Shorter queries
/// go straight to title matching.
const MIN_ID_PREFIX: usize = 4;

/// Insertion-ordered list of attached sessions plus the active pointer.
///
/// Mutated only by the driver event loop; dispatch handlers read it through
/// the shared lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Vec<PageSession>,
    active: Option<TargetId>,
    /// Active target to restore if it reappears during a resync.
    preferred_active: Option<TargetId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly attached session. The first session becomes active,
    /// as does the one a resync was asked to restore.
    pub fn insert(&mut self, session: PageSession) {
        let target_id = session.target_id.clone();
        if let Some(existing) = self
            .sessions
            .iter_mut()
            .find(|s| s.target_id == session.target_id)
        {
            *existing = session;
        } else {
            self.sessions.push(session);
        }

        if self.active.is_none() || self.preferred_active.as_ref() == Some(&target_id) {
            self.active = Some(target_id.clone());
        }
        if self.preferred_active.as_ref() == Some(&target_id) {
            self.preferred_active = None;
        }
    }

    /// Removes the session for a destroyed target. If it was active, the
    /// newest remaining session takes over (none if empty).
    pub fn remove_by_target(&mut self, target_id: &TargetId) -> Option<PageSession> {
        let idx = self.sessions.iter().position(|s| &s.target_id == target_id)?;
        let removed = self.sessions.remove(idx);
        if self.active.as_ref() == Some(target_id) {
            self.active = self.sessions.last().map(|s| s.target_id.clone());
        }
        Some(removed)
    }

    pub fn remove_by_session(&mut self, session_id: &SessionId) -> Option<PageSession> {
        let target_id = self
            .sessions
            .iter()
            .find(|s| &s.session_id == session_id)?
            .target_id
            .clone();
        self.remove_by_target(&target_id)
    }

    /// Refreshes url/title after a `targetInfoChanged` notification.
    pub fn update_info(&mut self, target_id: &TargetId, url: String, title: String) {
        if let Some(session) = self.sessions.iter_mut().find(|s| &s.target_id == target_id) {
            session.url = url;
            session.title = title;
        }
    }

    pub fn active(&self) -> Option<PageSession> {
        let target_id = self.active.as_ref()?;
        self.sessions
            .iter()
            .find(|s| &s.target_id == target_id)
            .cloned()
    }

    pub fn active_target_id(&self) -> Option<&TargetId> {
        self.active.as_ref()
    }

    pub fn set_active(&mut self, target_id: &TargetId) -> bool {
        if self.sessions.iter().any(|s| &s.target_id == target_id) {
            self.active = Some(target_id.clone());
            true
        } else {
            false
        }
    }

    pub fn sessions(&self) -> Vec<PageSession> {
        self.sessions.clone()
    }

    pub fn get(&self, target_id: &TargetId) -> Option<PageSession> {
        self.sessions
            .iter()
            .find(|s| &s.target_id == target_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops all sessions ahead of a reconnect resync, remembering the
    /// active target so it is restored when discovery re-reports it.
    pub fn begin_resync(&mut self) {
        self.preferred_active = self.active.take().or(self.preferred_active.take());
        self.sessions.clear();
    }

    /// Two-stage fuzzy lookup: case-sensitive id prefix (queries of at least
    /// four characters), then case-insensitive title substring. Multiple
    /// survivors of a stage are reported, not guessed between.
    pub fn resolve(&self, query: &str) -> Resolution {
        if query.len() >= MIN_ID_PREFIX {
            let by_id: Vec<&PageSession> = self
                .sessions
                .iter()
                .filter(|s| s.target_id.as_ref().starts_with(query))
                .collect();
            match by_id.len() {
                0 => {}
                1 => return Resolution::Match(by_id[0].clone()),
                _ => return Resolution::Ambiguous(by_id.into_iter().cloned().collect()),
            }
        }

        let needle = query.to_lowercase();
        let by_title: Vec<&PageSession> = self
            .sessions
            .iter()
            .filter(|s| s.title.to_lowercase().contains(&needle))
            .collect();
        match by_title.len() {
            0 => Resolution::NotFound,
            1 => Resolution::Match(by_title[0].clone()),
            _ => Resolution::Ambiguous(by_title.into_iter().cloned().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(target: &str, title: &str) -> PageSession {
        PageSession {
            target_id: TargetId::new(target),
            session_id: SessionId::from(format!("sess-{target}")),
            url: format!("https://example.com/{title}"),
            title: title.to_string(),
        }
    }

    #[test]
    fn first_session_becomes_active() {
        let mut registry = SessionRegistry::new();
        assert!(registry.active().is_none());
        registry.insert(session("aaaa1111", "One"));
        registry.insert(session("bbbb2222", "Two"));
        assert_eq!(registry.active().unwrap().title, "One");
    }

    #[test]
    fn destroying_active_falls_back_to_newest() {
        let mut registry = SessionRegistry::new();
        registry.insert(session("aaaa1111", "One"));
        registry.insert(session("bbbb2222", "Two"));
        registry.insert(session("cccc3333", "Three"));

        registry.remove_by_target(&TargetId::new("aaaa1111"));
        assert_eq!(registry.active().unwrap().title, "Three");

        registry.remove_by_target(&TargetId::new("cccc3333"));
        assert_eq!(registry.active().unwrap().title, "Two");

        registry.remove_by_target(&TargetId::new("bbbb2222"));
        assert!(registry.active().is_none());
    }

    #[test]
    fn resolve_prefers_unique_id_prefix() {
        let mut registry = SessionRegistry::new();
        registry.insert(session("abcd1111", "Dashboard"));
        registry.insert(session("efgh2222", "Settings"));

        match registry.resolve("abcd") {
            Resolution::Match(s) => assert_eq!(s.title, "Dashboard"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn short_query_skips_id_matching() {
        let mut registry = SessionRegistry::new();
        registry.insert(session("abc1111", "zebra"));
        // "abc" is a prefix of the id, but three chars fall through to titles
        match registry.resolve("abc") {
            Resolution::NotFound => {}
            other => panic!("unexpected: {other:?}"),
        }
        match registry.resolve("ZEB") {
            Resolution::Match(s) => assert_eq!(s.title, "zebra"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn title_tie_is_ambiguous() {
        let mut registry = SessionRegistry::new();
        registry.insert(session("aaaa1111", "Dashboard"));
        registry.insert(session("bbbb2222", "Dashboard v2"));

        match registry.resolve("dash") {
            Resolution::Ambiguous(matches) => assert_eq!(matches.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn id_prefix_tie_is_ambiguous() {
        let mut registry = SessionRegistry::new();
        registry.insert(session("aaaa1111", "One"));
        registry.insert(session("aaaa2222", "Two"));

        match registry.resolve("aaaa") {
            Resolution::Ambiguous(matches) => assert_eq!(matches.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn resync_restores_previous_active() {
        let mut registry = SessionRegistry::new();
        registry.insert(session("aaaa1111", "One"));
        registry.insert(session("bbbb2222", "Two"));
        registry.set_active(&TargetId::new("bbbb2222"));

        registry.begin_resync();
        assert!(registry.is_empty());

        // discovery reports targets in arbitrary order after reconnect
        registry.insert(session("aaaa1111", "One"));
        registry.insert(session("bbbb2222", "Two"));
        assert_eq!(registry.active().unwrap().title, "Two");
    }
}
