//! Typed bindings for the subset of the Chrome DevTools Protocol the daemon
//! drives: target management, page control, script evaluation, input
//! injection, DOM/CSS queries, cookies and the console/network event
//! streams.
//!
//! The wire plumbing here is deliberately narrow. The daemon talks to one
//! browser over one socket, so there is no generic event parameterization:
//! inbound traffic is either a [`Response`] to an outstanding call or a
//! [`CdpEventMessage`], and outbound traffic is only ever an
//! [`OutboundCall`].

use std::borrow::Cow;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub mod browser;
pub mod css;
pub mod dom;
pub mod events;
pub mod input;
pub mod network;
pub mod page;
pub mod runtime;
pub mod target;

pub use events::{CdpEvent, CdpEventMessage};

/// Something addressable on the wire by its `Domain.method` name.
pub trait Method {
    fn identifier(&self) -> Cow<'static, str>;
}

/// A call the browser answers with a typed payload.
pub trait Command: Serialize + Method {
    type Response: DeserializeOwned + fmt::Debug;
}

/// Correlates a call with its eventual [`Response`].
///
/// Ids are handed out by the connection, strictly increasing for its
/// lifetime; a reconnected browser gets a fresh connection and a fresh
/// sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(u64);

impl CallId {
    /// The id the first call on a connection gets.
    pub fn first() -> Self {
        CallId(0)
    }

    /// The id following this one.
    pub fn next(self) -> Self {
        CallId(self.0.wrapping_add(1))
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One outbound frame: a method call, optionally scoped to an attached
/// session.
#[derive(Serialize, Debug, PartialEq)]
pub struct OutboundCall {
    pub id: CallId,
    pub method: Cow<'static, str>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub params: serde_json::Value,
}

impl OutboundCall {
    pub fn new(
        id: CallId,
        method: Cow<'static, str>,
        session_id: Option<String>,
        params: serde_json::Value,
    ) -> Self {
        Self {
            id,
            method,
            session_id,
            params,
        }
    }
}

/// The browser's answer to an [`OutboundCall`], matched up by id.
///
/// Exactly one of `result` and `error` is populated by the browser.
#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct Response {
    pub id: CallId,
    pub result: Option<serde_json::Value>,
    pub error: Option<CallError>,
}

impl Response {
    /// Splits the reply into its payload or the browser-reported failure.
    pub fn into_payload(self) -> Result<Option<serde_json::Value>, CallError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result),
        }
    }
}

/// A structured failure the browser attached to a call, e.g. an unknown
/// method or a navigation that could not start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallError {
    pub code: i64,
    pub message: String,
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (browser error code {})", self.message, self.code)
    }
}

impl std::error::Error for CallError {}

/// Everything that can arrive on the devtools socket.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
#[allow(clippy::large_enum_variant)]
pub enum Message {
    /// Answer to an outstanding call; carries an `id`.
    Reply(Response),
    /// Unsolicited event; carries a `method` instead.
    Event(CdpEventMessage),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::target::SetDiscoverTargetsParams;

    #[test]
    fn outbound_call_wire_shape() {
        let params = SetDiscoverTargetsParams::new(true);
        let call = OutboundCall::new(
            CallId::first().next(),
            params.identifier(),
            None,
            serde_json::to_value(&params).unwrap(),
        );
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["method"], "Target.setDiscoverTargets");
        assert_eq!(json["params"]["discover"], true);
        assert!(json.get("sessionId").is_none());
    }

    #[test]
    fn call_ids_increase() {
        let id = CallId::first();
        assert_eq!(id.to_string(), "0");
        assert_eq!(id.next().next().to_string(), "2");
    }

    #[test]
    fn message_decodes_reply_and_event() {
        let raw = r#"{"id":3,"result":{"targetId":"abc"}}"#;
        match serde_json::from_str::<Message>(raw).unwrap() {
            Message::Reply(resp) => {
                assert_eq!(resp.id, CallId::first().next().next().next());
                assert!(resp.error.is_none());
            }
            Message::Event(_) => panic!("expected reply"),
        }

        let raw = r#"{"method":"Page.loadEventFired","sessionId":"s1","params":{"timestamp":12.5}}"#;
        match serde_json::from_str::<Message>(raw).unwrap() {
            Message::Event(ev) => {
                assert_eq!(ev.method, "Page.loadEventFired");
                assert_eq!(ev.session_id.as_deref(), Some("s1"));
            }
            Message::Reply(_) => panic!("expected event"),
        }
    }

    #[test]
    fn payload_split_prefers_the_error() {
        let failed: Response = serde_json::from_str(
            r#"{"id":1,"error":{"code":-32000,"message":"Cannot navigate to invalid URL"}}"#,
        )
        .unwrap();
        let err = failed.into_payload().unwrap_err();
        assert_eq!(err.message, "Cannot navigate to invalid URL");
        assert_eq!(
            err.to_string(),
            "Cannot navigate to invalid URL (browser error code -32000)"
        );

        let ok: Response = serde_json::from_str(r#"{"id":2,"result":{}}"#).unwrap();
        assert!(matches!(ok.into_payload(), Ok(Some(_))));
    }
}
