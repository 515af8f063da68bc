//! The `Target` domain: discovery, attachment and lifecycle of browser
//! targets (pages, workers, the browser itself).

use serde::{Deserialize, Serialize};

use super::Method;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        TargetId(id.into())
    }

    pub fn inner(&self) -> &String {
        &self.0
    }
}

impl AsRef<str> for TargetId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for TargetId {
    fn from(id: String) -> Self {
        TargetId(id)
    }
}

/// Identifier of an attached debugging session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn inner(&self) -> &String {
        &self.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        SessionId(id)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: TargetId,
    pub r#type: String,
    pub title: String,
    pub url: String,
    /// Whether the target has an attached client.
    pub attached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opener_id: Option<TargetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<String>,
}

impl TargetInfo {
    /// Targets of type `page` are the only ones the daemon tracks.
    pub fn is_page(&self) -> bool {
        self.r#type == "page"
    }
}

/// Controls whether to discover available targets and notify via
/// `targetCreated`/`targetInfoChanged`/`targetDestroyed` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDiscoverTargetsParams {
    pub discover: bool,
}

impl SetDiscoverTargetsParams {
    pub const IDENTIFIER: &'static str = "Target.setDiscoverTargets";

    pub fn new(discover: bool) -> Self {
        Self { discover }
    }
}

impl Method for SetDiscoverTargetsParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SetDiscoverTargetsReturns {}

impl super::Command for SetDiscoverTargetsParams {
    type Response = SetDiscoverTargetsReturns;
}

/// Retrieves a list of available targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GetTargetsParams {}

impl GetTargetsParams {
    pub const IDENTIFIER: &'static str = "Target.getTargets";
}

impl Method for GetTargetsParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetsReturns {
    pub target_infos: Vec<TargetInfo>,
}

impl super::Command for GetTargetsParams {
    type Response = GetTargetsReturns;
}

/// Attaches to the target with given id.
///
/// `flatten` enables access to the session via the `sessionId` attribute of
/// subsequent commands, which is the only mode the daemon uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetParams {
    pub target_id: TargetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
}

impl AttachToTargetParams {
    pub const IDENTIFIER: &'static str = "Target.attachToTarget";

    pub fn new(target_id: TargetId) -> Self {
        Self {
            target_id,
            flatten: Some(true),
        }
    }
}

impl Method for AttachToTargetParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetReturns {
    /// Id assigned to the session.
    pub session_id: SessionId,
}

impl super::Command for AttachToTargetParams {
    type Response = AttachToTargetReturns;
}

/// Creates a new page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetParams {
    /// The initial URL the page will be navigated to.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_window: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
}

impl CreateTargetParams {
    pub const IDENTIFIER: &'static str = "Target.createTarget";

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width: None,
            height: None,
            new_window: None,
            background: None,
        }
    }

    pub fn blank() -> Self {
        Self::new("about:blank")
    }
}

impl<T: Into<String>> From<T> for CreateTargetParams {
    fn from(url: T) -> Self {
        CreateTargetParams::new(url)
    }
}

impl Method for CreateTargetParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetReturns {
    /// The id of the page opened.
    pub target_id: TargetId,
}

impl super::Command for CreateTargetParams {
    type Response = CreateTargetReturns;
}

/// Activates (focuses) the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateTargetParams {
    pub target_id: TargetId,
}

impl ActivateTargetParams {
    pub const IDENTIFIER: &'static str = "Target.activateTarget";

    pub fn new(target_id: TargetId) -> Self {
        Self { target_id }
    }
}

impl Method for ActivateTargetParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ActivateTargetReturns {}

impl super::Command for ActivateTargetParams {
    type Response = ActivateTargetReturns;
}

/// Closes the target. If the target is a page that gets closed too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTargetParams {
    pub target_id: TargetId,
}

impl CloseTargetParams {
    pub const IDENTIFIER: &'static str = "Target.closeTarget";

    pub fn new(target_id: TargetId) -> Self {
        Self { target_id }
    }
}

impl Method for CloseTargetParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTargetReturns {
    pub success: bool,
}

impl super::Command for CloseTargetParams {
    type Response = CloseTargetReturns;
}

/// Issued when a possible inspection target is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTargetCreated {
    pub target_info: TargetInfo,
}

impl EventTargetCreated {
    pub const IDENTIFIER: &'static str = "Target.targetCreated";
}

/// Issued when some information about a target has changed. This only happens
/// between `targetCreated` and `targetDestroyed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTargetInfoChanged {
    pub target_info: TargetInfo,
}

impl EventTargetInfoChanged {
    pub const IDENTIFIER: &'static str = "Target.targetInfoChanged";
}

/// Issued when a target is destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTargetDestroyed {
    pub target_id: TargetId,
}

impl EventTargetDestroyed {
    pub const IDENTIFIER: &'static str = "Target.targetDestroyed";
}

/// Issued when an attached session is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttachedToTarget {
    pub session_id: SessionId,
    pub target_info: TargetInfo,
    #[serde(default)]
    pub waiting_for_debugger: bool,
}

impl EventAttachedToTarget {
    pub const IDENTIFIER: &'static str = "Target.attachedToTarget";
}

/// Issued when the session is detached from the target. Can be issued
/// multiple times per target if multiple sessions have been attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetachedFromTarget {
    pub session_id: SessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<TargetId>,
}

impl EventDetachedFromTarget {
    pub const IDENTIFIER: &'static str = "Target.detachedFromTarget";
}
