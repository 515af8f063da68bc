//! Maps decoded requests onto the driver, the registry and the telemetry
//! buffers, and wraps every outcome in the uniform response envelope.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::capture::EventBuffers;
use crate::cdp::network::{DeleteCookiesParams, SetCookieParams};
use crate::driver::{Driver, ReadyCondition, ScrollMode};
use crate::handler::session::{PageSession, Resolution, SessionRegistry};
use crate::ipc::protocol::{CmdError, Request, Response};
use crate::supervisor::{ConnectionState, SupervisorHandle};

/// Shared state handed to every handler, injected at construction.
#[derive(Clone)]
pub struct CommandContext {
    pub buffers: Arc<EventBuffers>,
    pub registry: Arc<Mutex<SessionRegistry>>,
    pub driver: Driver,
    pub supervisor: SupervisorHandle,
}

/// A handled request: the response to write, plus whether the daemon should
/// begin graceful teardown after the response is on the wire.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub response: Response,
    pub shutdown: bool,
}

impl DispatchOutcome {
    fn reply(result: Result<Option<serde_json::Value>, CmdError>) -> Self {
        Self {
            response: Response::from(result),
            shutdown: false,
        }
    }
}

pub async fn dispatch(ctx: &CommandContext, req: Request) -> DispatchOutcome {
    match req.cmd.as_str() {
        "status" => DispatchOutcome::reply(status(ctx)),
        "shutdown" => DispatchOutcome {
            response: Response::success(None),
            shutdown: true,
        },
        "clear" => DispatchOutcome::reply(clear(ctx, &req)),
        "console" => DispatchOutcome::reply(console(ctx, &req)),
        "network" => DispatchOutcome::reply(network(ctx, &req)),
        "target" => DispatchOutcome::reply(target(ctx, &req)),
        "reconnect" => DispatchOutcome::reply(reconnect(ctx).await),
        "navigate" => DispatchOutcome::reply(navigate(ctx, &req).await),
        "reload" => DispatchOutcome::reply(reload(ctx, &req).await),
        "back" => DispatchOutcome::reply(history(ctx, &req, -1).await),
        "forward" => DispatchOutcome::reply(history(ctx, &req, 1).await),
        "ready" => DispatchOutcome::reply(ready(ctx, &req).await),
        "eval" => DispatchOutcome::reply(eval(ctx, &req).await),
        "html" => DispatchOutcome::reply(html(ctx, &req).await),
        "css" => DispatchOutcome::reply(css(ctx, &req).await),
        "cookies" => DispatchOutcome::reply(cookies(ctx, &req).await),
        "screenshot" => DispatchOutcome::reply(screenshot(ctx, &req).await),
        "click" => DispatchOutcome::reply(click(ctx, &req).await),
        "type" => DispatchOutcome::reply(type_text(ctx, &req).await),
        "key" => DispatchOutcome::reply(key(ctx, &req).await),
        "select" => DispatchOutcome::reply(select(ctx, &req).await),
        "scroll" => DispatchOutcome::reply(scroll(ctx, &req).await),
        "focus" => DispatchOutcome::reply(focus(ctx, &req).await),
        "find" => DispatchOutcome::reply(find(ctx, &req).await),
        other => DispatchOutcome::reply(Err(CmdError::bad_request(format!(
            "unknown command: {other}"
        )))),
    }
}

// ---- parameter decoding --------------------------------------------------

fn decode_params<T>(req: &Request) -> Result<T, CmdError>
where
    T: DeserializeOwned + Default,
{
    match &req.params {
        None => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|err| CmdError::bad_request(format!("invalid params: {err}"))),
    }
}

/// Resolves the request's `target` (or the active session) to a page session.
fn resolve_session(ctx: &CommandContext, req: &Request) -> Result<PageSession, CmdError> {
    let registry = ctx.registry.lock().unwrap();
    match req.target.as_deref() {
        None | Some("") => registry.active().ok_or(CmdError::NoActiveSession),
        Some(query) => match registry.resolve(query) {
            Resolution::Match(session) => Ok(session),
            Resolution::Ambiguous(sessions) => Err(CmdError::AmbiguousTarget {
                query: query.to_string(),
                matches: sessions.iter().map(PageSession::summary).collect(),
            }),
            Resolution::NotFound => {
                Err(CmdError::bad_request(format!("no session matches '{query}'")))
            }
        },
    }
}

fn timeout_of(ms: Option<u64>, ctx: &CommandContext) -> Duration {
    ms.map(Duration::from_millis)
        .unwrap_or_else(|| ctx.driver.default_timeout())
}

// ---- observation ---------------------------------------------------------

fn status(ctx: &CommandContext) -> Result<Option<serde_json::Value>, CmdError> {
    let registry = ctx.registry.lock().unwrap();
    let active = registry.active_target_id().cloned();
    let sessions: Vec<_> = registry
        .sessions()
        .iter()
        .map(|s| {
            json!({
                "id": s.target_id.as_ref(),
                "url": s.url,
                "title": s.title,
                "active": Some(&s.target_id) == active.as_ref(),
            })
        })
        .collect();
    drop(registry);

    Ok(Some(json!({
        "running": true,
        "state": ctx.supervisor.state().as_str(),
        "reconnect_count": ctx.supervisor.reconnect_count(),
        "sessions": sessions,
        "buffers": {
            "console": ctx.buffers.console.len(),
            "network": ctx.buffers.network.len(),
        },
    })))
}

fn clear(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let cleared: &[&str] = match req.target.as_deref().unwrap_or("") {
        "" => {
            ctx.buffers.clear_console();
            ctx.buffers.clear_network();
            &["console", "network"]
        }
        "console" => {
            ctx.buffers.clear_console();
            &["console"]
        }
        "network" => {
            ctx.buffers.clear_network();
            &["network"]
        }
        other => {
            return Err(CmdError::bad_request(format!(
                "unknown clear target: {other}"
            )))
        }
    };
    Ok(Some(json!({ "cleared": cleared })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SnapshotParams {
    limit: Option<usize>,
}

fn console(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: SnapshotParams = decode_params(req)?;
    let mut entries = ctx.buffers.console.snapshot();
    if let Some(limit) = params.limit {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }
    Ok(Some(json!({ "entries": entries })))
}

fn network(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: SnapshotParams = decode_params(req)?;
    let mut entries = ctx.buffers.network.snapshot();
    if let Some(limit) = params.limit {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }
    Ok(Some(json!({ "entries": entries })))
}

fn target(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    match req.target.as_deref() {
        None | Some("") => {
            let registry = ctx.registry.lock().unwrap();
            let active = registry.active().map(|s| s.summary());
            let sessions: Vec<_> = registry.sessions().iter().map(PageSession::summary).collect();
            Ok(Some(json!({ "active": active, "sessions": sessions })))
        }
        Some(_) => {
            let session = resolve_session(ctx, req)?;
            let mut registry = ctx.registry.lock().unwrap();
            if !registry.set_active(&session.target_id) {
                return Err(CmdError::internal("resolved session vanished"));
            }
            Ok(Some(json!({
                "id": session.target_id.as_ref(),
                "url": session.url,
                "title": session.title,
            })))
        }
    }
}

async fn reconnect(ctx: &CommandContext) -> Result<Option<serde_json::Value>, CmdError> {
    let report = ctx.supervisor.reconnect().await?;
    if report.state != ConnectionState::Connected {
        return Err(CmdError::DriverUnavailable);
    }
    Ok(Some(json!({
        "state": report.state.as_str(),
        "reconnectCount": report.reconnect_count,
    })))
}

// ---- navigation ----------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NavigateCmdParams {
    url: Option<String>,
    wait: Option<bool>,
    timeout: Option<u64>,
}

async fn navigate(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: NavigateCmdParams = decode_params(req)?;
    let url = params
        .url
        .ok_or_else(|| CmdError::bad_request("navigate requires a url"))?;
    let session = resolve_session(ctx, req)?;
    let timeout = timeout_of(params.timeout, ctx);
    ctx.driver
        .navigate(&session, &url, params.wait.unwrap_or(true), timeout)
        .await
        .map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReloadCmdParams {
    ignore_cache: Option<bool>,
    wait: Option<bool>,
    timeout: Option<u64>,
}

async fn reload(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: ReloadCmdParams = decode_params(req)?;
    let session = resolve_session(ctx, req)?;
    let timeout = timeout_of(params.timeout, ctx);
    ctx.driver
        .reload(
            &session,
            params.ignore_cache.unwrap_or(false),
            params.wait.unwrap_or(true),
            timeout,
        )
        .await
        .map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HistoryCmdParams {
    wait: Option<bool>,
    timeout: Option<u64>,
}

async fn history(
    ctx: &CommandContext,
    req: &Request,
    delta: i64,
) -> Result<Option<serde_json::Value>, CmdError> {
    let params: HistoryCmdParams = decode_params(req)?;
    let session = resolve_session(ctx, req)?;
    let timeout = timeout_of(params.timeout, ctx);
    ctx.driver
        .history_step(&session, delta, params.wait.unwrap_or(true), timeout)
        .await
        .map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReadyCmdParams {
    timeout: Option<u64>,
    selector: Option<String>,
    network_idle: Option<bool>,
    eval: Option<String>,
}

async fn ready(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: ReadyCmdParams = decode_params(req)?;
    let session = resolve_session(ctx, req)?;
    let timeout = timeout_of(params.timeout, ctx);
    let condition = ReadyCondition {
        selector: params.selector,
        network_idle: params.network_idle.unwrap_or(false),
        eval: params.eval,
    };
    ctx.driver
        .wait_ready(&session, condition, timeout, &ctx.buffers)
        .await
        .map(Some)
}

// ---- page inspection -----------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EvalCmdParams {
    #[serde(alias = "expr")]
    expression: Option<String>,
    timeout: Option<u64>,
}

async fn eval(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: EvalCmdParams = decode_params(req)?;
    let expression = params
        .expression
        .ok_or_else(|| CmdError::bad_request("eval requires an expression"))?;
    let session = resolve_session(ctx, req)?;
    let timeout = timeout_of(params.timeout, ctx);
    ctx.driver
        .evaluate(&session, &expression, timeout)
        .await
        .map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SelectorParams {
    selector: Option<String>,
}

async fn html(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: SelectorParams = decode_params(req)?;
    let session = resolve_session(ctx, req)?;
    ctx.driver
        .html(&session, params.selector.as_deref())
        .await
        .map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CssCmdParams {
    action: Option<String>,
    selector: Option<String>,
    property: Option<String>,
}

async fn css(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: CssCmdParams = decode_params(req)?;
    let session = resolve_session(ctx, req)?;
    ctx.driver
        .css(
            &session,
            params.action.as_deref().unwrap_or("computed"),
            params.selector.as_deref(),
            params.property.as_deref(),
        )
        .await
        .map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CookiesCmdParams {
    action: Option<String>,
    name: Option<String>,
    value: Option<String>,
    url: Option<String>,
    domain: Option<String>,
    path: Option<String>,
}

async fn cookies(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: CookiesCmdParams = decode_params(req)?;
    let session = resolve_session(ctx, req)?;

    match params.action.as_deref().unwrap_or("list") {
        "list" => {
            let cookies = ctx.driver.cookies_list(&session).await?;
            Ok(Some(json!({ "cookies": cookies })))
        }
        "set" => {
            let name = params
                .name
                .ok_or_else(|| CmdError::bad_request("cookies set requires a name"))?;
            let value = params
                .value
                .ok_or_else(|| CmdError::bad_request("cookies set requires a value"))?;
            let mut set = SetCookieParams::new(name.clone(), value);
            set.url = params.url;
            set.domain = params.domain;
            set.path = params.path;
            ctx.driver.cookies_set(&session, set).await?;
            Ok(Some(json!({ "set": name })))
        }
        "delete" => {
            let name = params
                .name
                .ok_or_else(|| CmdError::bad_request("cookies delete requires a name"))?;
            let mut delete = DeleteCookiesParams::new(name.clone());
            delete.url = params.url;
            delete.domain = params.domain;
            delete.path = params.path;
            ctx.driver.cookies_delete(&session, delete).await?;
            Ok(Some(json!({ "deleted": name })))
        }
        other => Err(CmdError::bad_request(format!(
            "unknown cookies action: {other}"
        ))),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScreenshotCmdParams {
    full_page: Option<bool>,
    path: Option<String>,
}

async fn screenshot(
    ctx: &CommandContext,
    req: &Request,
) -> Result<Option<serde_json::Value>, CmdError> {
    let params: ScreenshotCmdParams = decode_params(req)?;
    let session = resolve_session(ctx, req)?;
    ctx.driver
        .screenshot(
            &session,
            params.full_page.unwrap_or(false),
            params.path.as_deref(),
        )
        .await
        .map(Some)
}

// ---- interaction ---------------------------------------------------------

async fn click(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: SelectorParams = decode_params(req)?;
    let selector = params
        .selector
        .ok_or_else(|| CmdError::bad_request("click requires a selector"))?;
    let session = resolve_session(ctx, req)?;
    ctx.driver.click(&session, &selector).await.map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TypeCmdParams {
    selector: Option<String>,
    text: Option<String>,
    key: Option<String>,
    clear: Option<bool>,
}

async fn type_text(
    ctx: &CommandContext,
    req: &Request,
) -> Result<Option<serde_json::Value>, CmdError> {
    let params: TypeCmdParams = decode_params(req)?;
    let clear = params.clear.unwrap_or(false);
    let text = params.text.unwrap_or_default();
    if text.is_empty() && !clear && params.key.is_none() {
        return Err(CmdError::bad_request("type requires text, key, or clear"));
    }
    let session = resolve_session(ctx, req)?;
    ctx.driver
        .type_text(
            &session,
            params.selector.as_deref(),
            &text,
            clear,
            params.key.as_deref(),
        )
        .await
        .map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KeyCmdParams {
    key: Option<String>,
    modifiers: Vec<String>,
}

async fn key(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: KeyCmdParams = decode_params(req)?;
    let name = params
        .key
        .ok_or_else(|| CmdError::bad_request("key requires a key name"))?;
    let session = resolve_session(ctx, req)?;
    ctx.driver
        .key(&session, &name, &params.modifiers)
        .await
        .map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SelectCmdParams {
    selector: Option<String>,
    value: Option<String>,
}

async fn select(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: SelectCmdParams = decode_params(req)?;
    let selector = params
        .selector
        .ok_or_else(|| CmdError::bad_request("select requires a selector"))?;
    let value = params
        .value
        .ok_or_else(|| CmdError::bad_request("select requires a value"))?;
    let session = resolve_session(ctx, req)?;
    ctx.driver.select(&session, &selector, &value).await.map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScrollCmdParams {
    selector: Option<String>,
    to: Option<Point>,
    by: Option<Point>,
}

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

async fn scroll(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: ScrollCmdParams = decode_params(req)?;
    let mode = if let Some(selector) = params.selector {
        ScrollMode::IntoView(selector)
    } else if let Some(Point { x, y }) = params.to {
        ScrollMode::To { x, y }
    } else if let Some(Point { x, y }) = params.by {
        ScrollMode::By { x, y }
    } else {
        return Err(CmdError::bad_request(
            "scroll requires a selector, 'to', or 'by'",
        ));
    };
    let session = resolve_session(ctx, req)?;
    ctx.driver.scroll(&session, mode).await.map(Some)
}

async fn focus(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: SelectorParams = decode_params(req)?;
    let selector = params
        .selector
        .ok_or_else(|| CmdError::bad_request("focus requires a selector"))?;
    let session = resolve_session(ctx, req)?;
    ctx.driver.focus(&session, &selector).await.map(Some)
}

async fn find(ctx: &CommandContext, req: &Request) -> Result<Option<serde_json::Value>, CmdError> {
    let params: SelectorParams = decode_params(req)?;
    let selector = params
        .selector
        .ok_or_else(|| CmdError::bad_request("find requires a selector"))?;
    let session = resolve_session(ctx, req)?;
    ctx.driver.find(&session, &selector).await.map(Some)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::capture::{ConsoleEntry, ConsoleKind};
    use crate::cdp::target::{SessionId, TargetId};
    use crate::handler::session::PageSession;
    use futures::channel::mpsc;
    use tokio::sync::watch;

    /// A context whose driver reports no connection, so page-scoped
    /// commands fail fast and in-memory commands work normally.
    pub(crate) fn disconnected_ctx() -> CommandContext {
        let buffers = Arc::new(EventBuffers::new(100, 100));
        let registry = Arc::new(Mutex::new(SessionRegistry::new()));
        let (cmd_tx, _cmd_rx) = mpsc::channel(8);
        let (_state_tx, state_rx) = watch::channel(ConnectionState::Failed);
        let driver = Driver::new(cmd_tx, state_rx, Duration::from_secs(5));

        let browser = crate::browser::BrowserHandle::new(Default::default());
        let (cmd_tx2, cmd_rx2) = mpsc::channel(8);
        drop(cmd_tx2);
        // the supervisor task is built but never spawned: these tests only
        // exercise state that never reaches the browser, and its dropped
        // watch sender keeps reporting the last published state
        let (supervisor, handle) = crate::supervisor::Supervisor::new(
            browser,
            cmd_rx2,
            Arc::clone(&registry),
            Arc::clone(&buffers),
            Default::default(),
            1024,
            Duration::from_secs(5),
        );
        drop(supervisor);

        CommandContext {
            buffers,
            registry,
            driver,
            supervisor: handle,
        }
    }

    fn seed_sessions(ctx: &CommandContext) {
        let mut registry = ctx.registry.lock().unwrap();
        registry.insert(PageSession {
            target_id: TargetId::new("aaaa1111"),
            session_id: SessionId::from("sess-a".to_string()),
            url: "https://a.example/".to_string(),
            title: "Dashboard".to_string(),
        });
        registry.insert(PageSession {
            target_id: TargetId::new("bbbb2222"),
            session_id: SessionId::from("sess-b".to_string()),
            url: "https://b.example/".to_string(),
            title: "Dashboard".to_string(),
        });
    }

    fn req(raw: &str) -> Request {
        serde_json::from_str(raw).unwrap()
    }

    #[tokio::test]
    async fn unknown_command_is_bad_request() {
        let ctx = disconnected_ctx();
        let outcome = dispatch(&ctx, req(r#"{"cmd":"bogus"}"#)).await;
        assert!(!outcome.response.ok);
        assert_eq!(
            outcome.response.error.as_deref(),
            Some("unknown command: bogus")
        );
    }

    #[tokio::test]
    async fn status_reports_sessions_and_buffers() {
        let ctx = disconnected_ctx();
        seed_sessions(&ctx);
        ctx.buffers.console.append(ConsoleEntry {
            kind: ConsoleKind::Log,
            text: "hi".to_string(),
            timestamp_ms: 1.0,
            source_url: None,
            source_line: None,
        });

        let outcome = dispatch(&ctx, req(r#"{"cmd":"status"}"#)).await;
        assert!(outcome.response.ok);
        let data = outcome.response.data.unwrap();
        assert_eq!(data["running"], json!(true));
        assert_eq!(data["sessions"].as_array().unwrap().len(), 2);
        assert_eq!(data["sessions"][0]["active"], json!(true));
        assert_eq!(data["buffers"]["console"], json!(1));
    }

    #[tokio::test]
    async fn clear_scopes_to_one_buffer() {
        let ctx = disconnected_ctx();
        ctx.buffers.console.append(ConsoleEntry {
            kind: ConsoleKind::Log,
            text: "keep".to_string(),
            timestamp_ms: 1.0,
            source_url: None,
            source_line: None,
        });

        let outcome = dispatch(&ctx, req(r#"{"cmd":"clear","target":"network"}"#)).await;
        assert!(outcome.response.ok);
        assert_eq!(ctx.buffers.console.len(), 1);

        let outcome = dispatch(&ctx, req(r#"{"cmd":"clear"}"#)).await;
        assert!(outcome.response.ok);
        assert_eq!(ctx.buffers.console.len(), 0);

        let outcome = dispatch(&ctx, req(r#"{"cmd":"clear","target":"bogus"}"#)).await;
        assert!(!outcome.response.ok);
        assert!(outcome.response.error.unwrap().contains("unknown clear target"));
    }

    #[tokio::test]
    async fn console_snapshot_honors_limit() {
        let ctx = disconnected_ctx();
        for i in 0..5 {
            ctx.buffers.console.append(ConsoleEntry {
                kind: ConsoleKind::Log,
                text: format!("line {i}"),
                timestamp_ms: i as f64,
                source_url: None,
                source_line: None,
            });
        }
        let outcome = dispatch(&ctx, req(r#"{"cmd":"console","params":{"limit":2}}"#)).await;
        let entries = outcome.response.data.unwrap()["entries"].clone();
        let entries = entries.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["text"], json!("line 3"));
        assert_eq!(entries[1]["text"], json!("line 4"));
    }

    #[tokio::test]
    async fn ambiguous_target_reports_matches() {
        let ctx = disconnected_ctx();
        seed_sessions(&ctx);
        let outcome = dispatch(&ctx, req(r#"{"cmd":"target","target":"dash"}"#)).await;
        assert!(!outcome.response.ok);
        assert_eq!(
            outcome.response.error.as_deref(),
            Some("ambiguous query 'dash', matches multiple sessions")
        );
        let matches = outcome.response.data.unwrap()["matches"].clone();
        assert_eq!(matches.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn target_selects_by_id_prefix() {
        let ctx = disconnected_ctx();
        seed_sessions(&ctx);
        let outcome = dispatch(&ctx, req(r#"{"cmd":"target","target":"bbbb"}"#)).await;
        assert!(outcome.response.ok);
        assert_eq!(
            ctx.registry.lock().unwrap().active().unwrap().target_id,
            TargetId::new("bbbb2222")
        );
    }

    #[tokio::test]
    async fn page_commands_need_a_session() {
        let ctx = disconnected_ctx();
        let outcome = dispatch(
            &ctx,
            req(r#"{"cmd":"navigate","params":{"url":"https://example.com"}}"#),
        )
        .await;
        assert!(!outcome.response.ok);
        assert_eq!(outcome.response.error.as_deref(), Some("no active session"));
    }

    #[tokio::test]
    async fn page_commands_fail_fast_when_disconnected() {
        let ctx = disconnected_ctx();
        seed_sessions(&ctx);
        let outcome = dispatch(&ctx, req(r##"{"cmd":"click","params":{"selector":"#go"}}"##)).await;
        assert!(!outcome.response.ok);
        assert_eq!(
            outcome.response.error.as_deref(),
            Some("driver_unavailable")
        );
    }

    #[tokio::test]
    async fn navigate_requires_url() {
        let ctx = disconnected_ctx();
        seed_sessions(&ctx);
        let outcome = dispatch(&ctx, req(r#"{"cmd":"navigate"}"#)).await;
        assert!(!outcome.response.ok);
        assert!(outcome.response.error.unwrap().contains("requires a url"));
    }

    #[tokio::test]
    async fn malformed_params_are_bad_request() {
        let ctx = disconnected_ctx();
        seed_sessions(&ctx);
        let outcome = dispatch(
            &ctx,
            req(r#"{"cmd":"console","params":"not-an-object"}"#),
        )
        .await;
        assert!(!outcome.response.ok);
        assert!(outcome.response.error.unwrap().starts_with("invalid params"));
    }

    #[tokio::test]
    async fn shutdown_flags_teardown_after_reply() {
        let ctx = disconnected_ctx();
        let outcome = dispatch(&ctx, req(r#"{"cmd":"shutdown"}"#)).await;
        assert!(outcome.response.ok);
        assert!(outcome.shutdown);
    }

    #[tokio::test]
    async fn scroll_requires_a_mode() {
        let ctx = disconnected_ctx();
        seed_sessions(&ctx);
        let outcome = dispatch(&ctx, req(r#"{"cmd":"scroll","params":{}}"#)).await;
        assert!(!outcome.response.ok);
        assert!(outcome
            .response
            .error
            .unwrap()
            .contains("requires a selector"));
    }
}
