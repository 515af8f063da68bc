//! The page-scoped capability set the command dispatcher calls into.
//!
//! A [`Driver`] is a cheap clonable handle: commands are marshaled into the
//! event loop through a channel, and every call fails fast with
//! `driver_unavailable` while the connection supervisor reports anything but
//! `Connected`.

use std::time::{Duration, Instant};

use futures::channel::{mpsc, oneshot};
use futures::SinkExt;
use serde_json::json;
use tokio::sync::watch;

use crate::capture::EventBuffers;
use crate::cdp::css::{
    GetComputedStyleForNodeParams, GetInlineStylesForNodeParams, GetMatchedStylesForNodeParams,
};
use crate::cdp::dom::{
    FocusParams, GetContentQuadsParams, GetDocumentParams, GetOuterHtmlParams, NodeId,
    QuerySelectorAllParams, QuerySelectorParams, ScrollIntoViewIfNeededParams,
};
use crate::cdp::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams, DispatchMouseEventType,
    InsertTextParams,
};
use crate::cdp::network::{Cookie, DeleteCookiesParams, GetCookiesParams, SetCookieParams};
use crate::cdp::page::{
    BringToFrontParams, CaptureScreenshotParams, GetNavigationHistoryParams, NavigateParams,
    NavigateToHistoryEntryParams, ReloadParams,
};
use crate::cdp::runtime::{EvaluateParams, EvaluateReturns, RemoteObject};
use crate::cdp::Command;
use crate::handler::session::PageSession;
use crate::handler::{decode_response, CommandMessage, LoopMessage};
use crate::ipc::protocol::CmdError;
use crate::supervisor::ConnectionState;

/// Quiescence window for the network-idle ready condition.
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);
/// Poll interval for ready-wait conditions.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Upper bound on elements summarized by `find`.
const FIND_LIMIT: usize = 100;

/// What `ready` should wait for. Conditions are OR-ed; an empty set waits
/// for `document.readyState === "complete"`.
#[derive(Debug, Clone, Default)]
pub struct ReadyCondition {
    pub selector: Option<String>,
    pub network_idle: bool,
    pub eval: Option<String>,
}

/// Scroll target for the `scroll` command.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollMode {
    IntoView(String),
    To { x: f64, y: f64 },
    By { x: f64, y: f64 },
}

#[derive(Clone)]
pub struct Driver {
    tx: mpsc::Sender<LoopMessage>,
    state: watch::Receiver<ConnectionState>,
    default_timeout: Duration,
}

impl Driver {
    pub fn new(
        tx: mpsc::Sender<LoopMessage>,
        state: watch::Receiver<ConnectionState>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            tx,
            state,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Sends a typed command to the browser on the given session and decodes
    /// the reply.
    pub async fn execute<T: Command>(
        &self,
        session: Option<&PageSession>,
        cmd: T,
    ) -> Result<T::Response, CmdError> {
        self.execute_with_deadline(session, cmd, Instant::now() + self.default_timeout)
            .await
    }

    async fn execute_with_deadline<T: Command>(
        &self,
        session: Option<&PageSession>,
        cmd: T,
        deadline: Instant,
    ) -> Result<T::Response, CmdError> {
        if self.connection_state() != ConnectionState::Connected {
            return Err(CmdError::DriverUnavailable);
        }

        let (tx, rx) = oneshot::channel();
        let session_id = session.map(|s| s.session_id.as_ref().to_string());
        let msg = CommandMessage::with_session(cmd, tx, session_id)
            .map_err(|err| CmdError::internal(err.to_string()))?;

        self.tx
            .clone()
            .send(LoopMessage::Command(msg))
            .await
            .map_err(|_| CmdError::DriverUnavailable)?;

        let resp = tokio::time::timeout(remaining(deadline), rx)
            .await
            .map_err(|_| CmdError::Timeout)?
            .map_err(|_| CmdError::DriverUnavailable)?;

        decode_response::<T>(resp).map_err(CmdError::from)
    }

    /// Registers interest in the next load event of the session. Must happen
    /// before the navigation is issued or the event can be missed.
    async fn load_waiter(&self, session: &PageSession) -> Result<oneshot::Receiver<()>, CmdError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .clone()
            .send(LoopMessage::WaitLoad {
                session_id: session.session_id.as_ref().to_string(),
                tx,
            })
            .await
            .map_err(|_| CmdError::DriverUnavailable)?;
        Ok(rx)
    }

    async fn await_load(
        &self,
        waiter: oneshot::Receiver<()>,
        deadline: Instant,
    ) -> Result<(), CmdError> {
        match tokio::time::timeout(remaining(deadline), waiter).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(CmdError::Browser(
                "target closed while waiting for load".to_string(),
            )),
            Err(_) => Err(CmdError::Timeout),
        }
    }

    // ---- navigation -----------------------------------------------------

    pub async fn navigate(
        &self,
        session: &PageSession,
        url: &str,
        wait: bool,
        timeout: Duration,
    ) -> Result<serde_json::Value, CmdError> {
        let url = normalize_url(url)?;
        let deadline = Instant::now() + timeout;
        let waiter = if wait {
            Some(self.load_waiter(session).await?)
        } else {
            None
        };

        let resp = self
            .execute_with_deadline(Some(session), NavigateParams::new(url.clone()), deadline)
            .await?;
        if let Some(err) = resp.error_text {
            return Err(CmdError::Browser(err));
        }
        if let Some(waiter) = waiter {
            self.await_load(waiter, deadline).await?;
        }
        Ok(json!({ "url": url, "loaded": wait }))
    }

    pub async fn reload(
        &self,
        session: &PageSession,
        ignore_cache: bool,
        wait: bool,
        timeout: Duration,
    ) -> Result<serde_json::Value, CmdError> {
        let deadline = Instant::now() + timeout;
        let waiter = if wait {
            Some(self.load_waiter(session).await?)
        } else {
            None
        };
        self.execute_with_deadline(Some(session), ReloadParams::new(ignore_cache), deadline)
            .await?;
        if let Some(waiter) = waiter {
            self.await_load(waiter, deadline).await?;
        }
        Ok(json!({ "reloaded": true }))
    }

    /// Moves through session history; `delta` is -1 for back, 1 for forward.
    pub async fn history_step(
        &self,
        session: &PageSession,
        delta: i64,
        wait: bool,
        timeout: Duration,
    ) -> Result<serde_json::Value, CmdError> {
        let deadline = Instant::now() + timeout;
        let history = self
            .execute_with_deadline(Some(session), GetNavigationHistoryParams::default(), deadline)
            .await?;
        let idx = history.current_index + delta;
        let entry = if idx < 0 {
            return Err(CmdError::NoValue("earlier history entry".to_string()));
        } else {
            history
                .entries
                .get(idx as usize)
                .ok_or_else(|| CmdError::NoValue("later history entry".to_string()))?
                .clone()
        };

        let waiter = if wait {
            Some(self.load_waiter(session).await?)
        } else {
            None
        };
        self.execute_with_deadline(
            Some(session),
            NavigateToHistoryEntryParams::new(entry.id),
            deadline,
        )
        .await?;
        if let Some(waiter) = waiter {
            self.await_load(waiter, deadline).await?;
        }
        Ok(json!({ "url": entry.url, "title": entry.title }))
    }

    /// Polls the given conditions until one holds or the deadline passes.
    pub async fn wait_ready(
        &self,
        session: &PageSession,
        condition: ReadyCondition,
        timeout: Duration,
        buffers: &EventBuffers,
    ) -> Result<serde_json::Value, CmdError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let has_conditions =
            condition.selector.is_some() || condition.network_idle || condition.eval.is_some();

        loop {
            let mut ready = false;

            if let Some(selector) = &condition.selector {
                let expr = format!("!!document.querySelector({})", js_string(selector));
                ready |= self.eval_truthy_soft(session, &expr, deadline).await?;
            }
            if !ready {
                if let Some(expr) = &condition.eval {
                    ready |= self.eval_truthy_soft(session, expr, deadline).await?;
                }
            }
            if !ready && condition.network_idle {
                ready |= buffers.network_quiet_for(NETWORK_IDLE_WINDOW);
            }
            if !ready && !has_conditions {
                ready |= self
                    .eval_truthy_soft(session, "document.readyState === \"complete\"", deadline)
                    .await?;
            }

            if ready {
                return Ok(json!({
                    "ready": true,
                    "elapsed_ms": started.elapsed().as_millis() as u64,
                }));
            }
            if Instant::now() + READY_POLL_INTERVAL >= deadline {
                return Err(CmdError::Timeout);
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    // ---- evaluation -----------------------------------------------------

    pub async fn evaluate(
        &self,
        session: &PageSession,
        expression: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, CmdError> {
        let deadline = Instant::now() + timeout;
        let result = self.eval(session, expression, deadline).await?;
        let has_value = result.result.value.is_some();
        Ok(json!({
            "value": result.result.value,
            "has_value": has_value,
            "type": result.result.r#type.as_str(),
            "description": result.result.description,
        }))
    }

    async fn eval(
        &self,
        session: &PageSession,
        expression: &str,
        deadline: Instant,
    ) -> Result<EvaluateReturns, CmdError> {
        let mut params = EvaluateParams::new(expression);
        params.timeout = Some(remaining(deadline).as_millis() as f64);
        let resp = self
            .execute_with_deadline(Some(session), params, deadline)
            .await?;
        if let Some(details) = &resp.exception_details {
            return Err(CmdError::Browser(details.message()));
        }
        Ok(resp)
    }

    async fn eval_value(
        &self,
        session: &PageSession,
        expression: &str,
        deadline: Instant,
    ) -> Result<serde_json::Value, CmdError> {
        let returns = self.eval(session, expression, deadline).await?;
        Ok(returns.result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Truthiness of an expression where evaluation errors count as "not yet"
    /// rather than failures (ready-wait polls malformed pages too).
    async fn eval_truthy_soft(
        &self,
        session: &PageSession,
        expression: &str,
        deadline: Instant,
    ) -> Result<bool, CmdError> {
        match self.eval(session, expression, deadline).await {
            Ok(returns) => Ok(is_truthy(&returns.result)),
            Err(CmdError::Browser(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    // ---- document queries -----------------------------------------------

    async fn root_node(&self, session: &PageSession) -> Result<NodeId, CmdError> {
        let resp = self
            .execute(Some(session), GetDocumentParams::default())
            .await?;
        Ok(resp.root.node_id)
    }

    async fn query_one(&self, session: &PageSession, selector: &str) -> Result<NodeId, CmdError> {
        let root = self.root_node(session).await?;
        let resp = self
            .execute(Some(session), QuerySelectorParams::new(root, selector))
            .await?;
        if resp.node_id.is_none() {
            return Err(CmdError::NoElements(selector.to_string()));
        }
        Ok(resp.node_id)
    }

    async fn query_all(
        &self,
        session: &PageSession,
        selector: &str,
    ) -> Result<Vec<NodeId>, CmdError> {
        let root = self.root_node(session).await?;
        let resp = self
            .execute(Some(session), QuerySelectorAllParams::new(root, selector))
            .await?;
        Ok(resp
            .node_ids
            .into_iter()
            .filter(|id| !id.is_none())
            .collect())
    }

    pub async fn html(
        &self,
        session: &PageSession,
        selector: Option<&str>,
    ) -> Result<serde_json::Value, CmdError> {
        match selector {
            None => {
                let root = self.root_node(session).await?;
                let resp = self
                    .execute(Some(session), GetOuterHtmlParams::new(root))
                    .await?;
                Ok(json!({ "html": resp.outer_html }))
            }
            Some(selector) => {
                let nodes = self.query_all(session, selector).await?;
                if nodes.is_empty() {
                    return Err(CmdError::NoElements(selector.to_string()));
                }
                let mut elements = Vec::with_capacity(nodes.len());
                for node_id in nodes {
                    let resp = self
                        .execute(Some(session), GetOuterHtmlParams::new(node_id))
                        .await?;
                    elements.push(resp.outer_html);
                }
                Ok(json!({ "count": elements.len(), "elements": elements }))
            }
        }
    }

    pub async fn css(
        &self,
        session: &PageSession,
        action: &str,
        selector: Option<&str>,
        property: Option<&str>,
    ) -> Result<serde_json::Value, CmdError> {
        if action == "save" {
            let deadline = Instant::now() + self.default_timeout;
            let css = self
                .eval_value(session, STYLESHEET_TEXT_JS, deadline)
                .await?;
            return Ok(json!({ "css": css }));
        }

        let selector = selector
            .ok_or_else(|| CmdError::bad_request(format!("css {action} requires a selector")))?;
        let node_id = self.query_one(session, selector).await?;

        match action {
            "computed" => {
                let resp = self
                    .execute(Some(session), GetComputedStyleForNodeParams::new(node_id))
                    .await?;
                let properties: Vec<_> = resp
                    .computed_style
                    .iter()
                    .map(|p| json!({ "name": p.name, "value": p.value }))
                    .collect();
                Ok(json!({ "properties": properties }))
            }
            "get" => {
                let property = property
                    .ok_or_else(|| CmdError::bad_request("css get requires a property"))?;
                let resp = self
                    .execute(Some(session), GetComputedStyleForNodeParams::new(node_id))
                    .await?;
                let value = resp
                    .computed_style
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(property))
                    .map(|p| p.value.clone())
                    .ok_or_else(|| CmdError::NoValue(property.to_string()))?;
                Ok(json!({ "property": property, "value": value }))
            }
            "inline" => {
                let resp = self
                    .execute(Some(session), GetInlineStylesForNodeParams::new(node_id))
                    .await?;
                let properties: Vec<_> = resp
                    .inline_style
                    .iter()
                    .flat_map(|style| style.css_properties.iter())
                    .map(|p| json!({
                        "name": p.name,
                        "value": p.value,
                        "important": p.important.unwrap_or(false),
                    }))
                    .collect();
                Ok(json!({ "properties": properties }))
            }
            "matched" => {
                let resp = self
                    .execute(Some(session), GetMatchedStylesForNodeParams::new(node_id))
                    .await?;
                let rules: Vec<_> = resp
                    .matched_css_rules
                    .unwrap_or_default()
                    .iter()
                    .map(|m| {
                        let properties: Vec<_> = m
                            .rule
                            .style
                            .css_properties
                            .iter()
                            .map(|p| json!({ "name": p.name, "value": p.value }))
                            .collect();
                        json!({
                            "selector": m.rule.selector_list.text,
                            "origin": m.rule.origin.as_str(),
                            "properties": properties,
                        })
                    })
                    .collect();
                Ok(json!({ "count": rules.len(), "rules": rules }))
            }
            other => Err(CmdError::bad_request(format!("unknown css action: {other}"))),
        }
    }

    // ---- cookies ---------------------------------------------------------

    pub async fn cookies_list(&self, session: &PageSession) -> Result<Vec<Cookie>, CmdError> {
        let resp = self
            .execute(Some(session), GetCookiesParams::default())
            .await?;
        Ok(resp.cookies)
    }

    pub async fn cookies_set(
        &self,
        session: &PageSession,
        mut params: SetCookieParams,
    ) -> Result<(), CmdError> {
        if params.url.is_none() && params.domain.is_none() {
            params.url = Some(session.url.clone());
        }
        let name = params.name.clone();
        let resp = self.execute(Some(session), params).await?;
        if !resp.success {
            return Err(CmdError::Browser(format!("could not set cookie '{name}'")));
        }
        Ok(())
    }

    pub async fn cookies_delete(
        &self,
        session: &PageSession,
        mut params: DeleteCookiesParams,
    ) -> Result<(), CmdError> {
        if params.url.is_none() && params.domain.is_none() {
            params.url = Some(session.url.clone());
        }
        self.execute(Some(session), params).await?;
        Ok(())
    }

    // ---- screenshot ------------------------------------------------------

    pub async fn screenshot(
        &self,
        session: &PageSession,
        full_page: bool,
        path: Option<&str>,
    ) -> Result<serde_json::Value, CmdError> {
        self.execute(Some(session), BringToFrontParams::default())
            .await?;
        let resp = self
            .execute(Some(session), CaptureScreenshotParams::png(full_page))
            .await?;

        match path {
            Some(path) => {
                use base64::Engine;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(resp.data.as_bytes())
                    .map_err(|err| CmdError::internal(format!("bad screenshot payload: {err}")))?;
                let size = bytes.len();
                tokio::fs::write(path, bytes)
                    .await
                    .map_err(|err| CmdError::bad_request(format!("cannot write '{path}': {err}")))?;
                Ok(json!({ "path": path, "size_bytes": size, "format": "png" }))
            }
            None => Ok(json!({ "data": resp.data, "format": "png" })),
        }
    }

    // ---- input -----------------------------------------------------------

    pub async fn click(
        &self,
        session: &PageSession,
        selector: &str,
    ) -> Result<serde_json::Value, CmdError> {
        let node_id = self.query_one(session, selector).await?;
        self.execute(Some(session), ScrollIntoViewIfNeededParams::new(node_id))
            .await?;
        let quads = self
            .execute(Some(session), GetContentQuadsParams::new(node_id))
            .await?;
        let (x, y) = quads
            .quads
            .first()
            .and_then(|quad| quad.center())
            .ok_or_else(|| {
                CmdError::Browser(format!("element '{selector}' is not visible"))
            })?;

        self.execute(
            Some(session),
            DispatchMouseEventParams::new(DispatchMouseEventType::MouseMoved, x, y),
        )
        .await?;
        self.execute(
            Some(session),
            DispatchMouseEventParams::left_click(DispatchMouseEventType::MousePressed, x, y),
        )
        .await?;
        self.execute(
            Some(session),
            DispatchMouseEventParams::left_click(DispatchMouseEventType::MouseReleased, x, y),
        )
        .await?;
        Ok(json!({ "clicked": selector, "x": x, "y": y }))
    }

    pub async fn type_text(
        &self,
        session: &PageSession,
        selector: Option<&str>,
        text: &str,
        clear: bool,
        trailing_key: Option<&str>,
    ) -> Result<serde_json::Value, CmdError> {
        if let Some(selector) = selector {
            let node_id = self.query_one(session, selector).await?;
            self.execute(Some(session), FocusParams::new(node_id)).await?;
        }

        if clear {
            let deadline = Instant::now() + self.default_timeout;
            self.eval_value(session, SELECT_ALL_JS, deadline).await?;
            if text.is_empty() {
                self.key(session, "Backspace", &[]).await?;
            }
        }
        if !text.is_empty() {
            self.execute(Some(session), InsertTextParams::new(text)).await?;
        }
        if let Some(name) = trailing_key {
            self.key(session, name, &[]).await?;
        }
        Ok(json!({ "typed": text.chars().count() }))
    }

    pub async fn key(
        &self,
        session: &PageSession,
        name: &str,
        modifier_names: &[String],
    ) -> Result<serde_json::Value, CmdError> {
        let def = crate::keys::lookup(name)
            .ok_or_else(|| CmdError::bad_request(format!("unknown key: {name}")))?;
        let modifiers = crate::keys::parse_modifiers(modifier_names)
            .ok_or_else(|| CmdError::bad_request("unknown modifier"))?;

        let down_type = if def.text.is_some() && modifiers == 0 {
            DispatchKeyEventType::KeyDown
        } else {
            DispatchKeyEventType::RawKeyDown
        };
        let mut down = DispatchKeyEventParams::new(down_type);
        down.modifiers = Some(modifiers);
        down.key = Some(def.key.clone());
        down.code = Some(def.code.clone());
        down.windows_virtual_key_code = Some(def.key_code);
        down.native_virtual_key_code = Some(def.key_code);
        if modifiers == 0 {
            down.text = def.text.clone();
            down.unmodified_text = def.text.clone();
        }
        self.execute(Some(session), down).await?;

        let mut up = DispatchKeyEventParams::new(DispatchKeyEventType::KeyUp);
        up.modifiers = Some(modifiers);
        up.key = Some(def.key);
        up.code = Some(def.code);
        up.windows_virtual_key_code = Some(def.key_code);
        up.native_virtual_key_code = Some(def.key_code);
        self.execute(Some(session), up).await?;

        Ok(json!({ "key": name }))
    }

    pub async fn select(
        &self,
        session: &PageSession,
        selector: &str,
        value: &str,
    ) -> Result<serde_json::Value, CmdError> {
        // resolve first so a bad selector reports no_elements, not a script
        // result
        self.query_one(session, selector).await?;

        let expr = format!(
            r#"(() => {{
    const el = document.querySelector({sel});
    if (!el) return {{ found: false }};
    const options = Array.from(el.options || []);
    const wanted = {val};
    const opt = options.find(o => o.value === wanted || o.label === wanted || o.text === wanted);
    if (!opt) return {{ found: true, option: false }};
    el.value = opt.value;
    el.dispatchEvent(new Event("input", {{ bubbles: true }}));
    el.dispatchEvent(new Event("change", {{ bubbles: true }}));
    return {{ found: true, option: true, value: el.value }};
}})()"#,
            sel = js_string(selector),
            val = js_string(value),
        );
        let deadline = Instant::now() + self.default_timeout;
        let result = self.eval_value(session, &expr, deadline).await?;

        if result["found"] != json!(true) {
            return Err(CmdError::NoElements(selector.to_string()));
        }
        if result["option"] != json!(true) {
            return Err(CmdError::NoValue(format!(
                "option '{value}' in '{selector}'"
            )));
        }
        Ok(json!({ "selected": result["value"] }))
    }

    pub async fn scroll(
        &self,
        session: &PageSession,
        mode: ScrollMode,
    ) -> Result<serde_json::Value, CmdError> {
        match mode {
            ScrollMode::IntoView(selector) => {
                let node_id = self.query_one(session, &selector).await?;
                self.execute(Some(session), ScrollIntoViewIfNeededParams::new(node_id))
                    .await?;
                Ok(json!({ "scrolled": selector }))
            }
            ScrollMode::To { x, y } => self.scroll_js(session, "scrollTo", x, y).await,
            ScrollMode::By { x, y } => self.scroll_js(session, "scrollBy", x, y).await,
        }
    }

    async fn scroll_js(
        &self,
        session: &PageSession,
        method: &str,
        x: f64,
        y: f64,
    ) -> Result<serde_json::Value, CmdError> {
        let expr = format!(
            "(() => {{ window.{method}({x}, {y}); \
             return {{ x: window.scrollX, y: window.scrollY }}; }})()"
        );
        let deadline = Instant::now() + self.default_timeout;
        self.eval_value(session, &expr, deadline).await
    }

    pub async fn focus(
        &self,
        session: &PageSession,
        selector: &str,
    ) -> Result<serde_json::Value, CmdError> {
        let node_id = self.query_one(session, selector).await?;
        self.execute(Some(session), FocusParams::new(node_id)).await?;
        Ok(json!({ "focused": selector }))
    }

    pub async fn find(
        &self,
        session: &PageSession,
        selector: &str,
    ) -> Result<serde_json::Value, CmdError> {
        let expr = format!(
            r#"(() => {{
    const els = Array.from(document.querySelectorAll({sel}));
    return {{
        count: els.length,
        elements: els.slice(0, {limit}).map(el => ({{
            tag: el.tagName.toLowerCase(),
            id: el.id || null,
            classes: Array.from(el.classList),
            text: (el.textContent || "").trim().slice(0, 200),
        }})),
    }};
}})()"#,
            sel = js_string(selector),
            limit = FIND_LIMIT,
        );
        let deadline = Instant::now() + self.default_timeout;
        let result = self.eval_value(session, &expr, deadline).await?;
        if result["count"] == json!(0) {
            return Err(CmdError::NoElements(selector.to_string()));
        }
        Ok(result)
    }
}

/// Collects the rule text of every readable document stylesheet.
const STYLESHEET_TEXT_JS: &str = r#"(() => {
    const out = [];
    for (const sheet of document.styleSheets) {
        try {
            const rules = Array.from(sheet.cssRules).map(r => r.cssText);
            out.push(rules.join("\n"));
        } catch (e) {
            // cross-origin sheets are unreadable
        }
    }
    return out.join("\n\n");
})()"#;

/// Selects the content of the focused editable element.
const SELECT_ALL_JS: &str = r#"(() => {
    const el = document.activeElement;
    if (el && typeof el.select === "function") {
        el.select();
    } else if (el && el.isContentEditable) {
        document.execCommand("selectAll");
    }
    return true;
})()"#;

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Renders a Rust string as a JavaScript string literal.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Accepts absolute URLs and bare hostnames; the latter get an https scheme.
fn normalize_url(input: &str) -> Result<String, CmdError> {
    if input.is_empty() {
        return Err(CmdError::bad_request("empty url"));
    }
    match url::Url::parse(input) {
        Ok(url) => Ok(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let with_scheme = format!("https://{input}");
            url::Url::parse(&with_scheme)
                .map(|url| url.to_string())
                .map_err(|err| CmdError::bad_request(format!("invalid url '{input}': {err}")))
        }
        Err(err) => Err(CmdError::bad_request(format!(
            "invalid url '{input}': {err}"
        ))),
    }
}

/// JavaScript truthiness of an evaluation result.
fn is_truthy(obj: &RemoteObject) -> bool {
    match &obj.value {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(serde_json::Value::Null) => false,
        Some(_) => true,
        // non-serializable values (functions, symbols, DOM nodes) are truthy
        // unless the type says undefined
        None => !matches!(
            obj.r#type,
            crate::cdp::runtime::RemoteObjectType::Undefined
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::runtime::RemoteObjectType;

    fn obj(value: Option<serde_json::Value>, r#type: RemoteObjectType) -> RemoteObject {
        RemoteObject {
            r#type,
            subtype: None,
            class_name: None,
            value,
            unserializable_value: None,
            description: None,
            object_id: None,
        }
    }

    #[test]
    fn truthiness_matches_javascript() {
        assert!(is_truthy(&obj(Some(json!(true)), RemoteObjectType::Boolean)));
        assert!(!is_truthy(&obj(Some(json!(false)), RemoteObjectType::Boolean)));
        assert!(!is_truthy(&obj(Some(json!(0)), RemoteObjectType::Number)));
        assert!(is_truthy(&obj(Some(json!(2.5)), RemoteObjectType::Number)));
        assert!(!is_truthy(&obj(Some(json!("")), RemoteObjectType::String)));
        assert!(is_truthy(&obj(Some(json!("x")), RemoteObjectType::String)));
        assert!(!is_truthy(&obj(Some(json!(null)), RemoteObjectType::Object)));
        assert!(is_truthy(&obj(Some(json!({"a": 1})), RemoteObjectType::Object)));
        assert!(!is_truthy(&obj(None, RemoteObjectType::Undefined)));
        assert!(is_truthy(&obj(None, RemoteObjectType::Function)));
    }

    #[test]
    fn urls_get_a_scheme_when_missing() {
        assert_eq!(
            normalize_url("example.com").unwrap(),
            "https://example.com/"
        );
        assert_eq!(
            normalize_url("http://example.com/x").unwrap(),
            "http://example.com/x"
        );
        assert!(normalize_url("").is_err());
    }

    #[test]
    fn js_string_escapes() {
        assert_eq!(js_string("a\"b"), r#""a\"b""#);
        assert_eq!(js_string("plain"), "\"plain\"");
    }
}
