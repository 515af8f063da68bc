//! Decoded browser events.
//!
//! Every inbound frame that is not a command response is an event envelope
//! `{method, sessionId?, params}`. The params are decoded into the matching
//! typed event by method name; methods the daemon does not consume are kept
//! as [`CdpEvent::Other`] so the stream never fails on unknown events.

use std::borrow::Cow;

use serde::de::{self, Deserializer};
use serde::Deserialize;

use super::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived,
};
use super::page::EventLoadEventFired;
use super::runtime::{EventConsoleApiCalled, EventExceptionThrown};
use super::target::{
    EventAttachedToTarget, EventDetachedFromTarget, EventTargetCreated, EventTargetDestroyed,
    EventTargetInfoChanged,
};

#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum CdpEvent {
    TargetCreated(EventTargetCreated),
    TargetInfoChanged(EventTargetInfoChanged),
    TargetDestroyed(EventTargetDestroyed),
    AttachedToTarget(EventAttachedToTarget),
    DetachedFromTarget(EventDetachedFromTarget),
    LoadEventFired(EventLoadEventFired),
    ConsoleApiCalled(EventConsoleApiCalled),
    ExceptionThrown(EventExceptionThrown),
    RequestWillBeSent(EventRequestWillBeSent),
    ResponseReceived(EventResponseReceived),
    LoadingFinished(EventLoadingFinished),
    LoadingFailed(EventLoadingFailed),
    Other(serde_json::Value),
}

/// A complete event envelope as read off the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct CdpEventMessage {
    /// Name of the method.
    pub method: Cow<'static, str>,
    /// The session this event is meant for, if any.
    pub session_id: Option<String>,
    /// The decoded event payload.
    pub params: CdpEvent,
}

impl<'de> Deserialize<'de> for CdpEventMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Envelope {
            method: String,
            #[serde(rename = "sessionId")]
            session_id: Option<String>,
            #[serde(default)]
            params: serde_json::Value,
        }

        fn typed<'de, T, D>(params: serde_json::Value) -> Result<T, D::Error>
        where
            T: serde::de::DeserializeOwned,
            D: Deserializer<'de>,
        {
            serde_json::from_value(params).map_err(de::Error::custom)
        }

        let envelope = Envelope::deserialize(deserializer)?;
        let params = match envelope.method.as_str() {
            EventTargetCreated::IDENTIFIER => {
                CdpEvent::TargetCreated(typed::<_, D>(envelope.params)?)
            }
            EventTargetInfoChanged::IDENTIFIER => {
                CdpEvent::TargetInfoChanged(typed::<_, D>(envelope.params)?)
            }
            EventTargetDestroyed::IDENTIFIER => {
                CdpEvent::TargetDestroyed(typed::<_, D>(envelope.params)?)
            }
            EventAttachedToTarget::IDENTIFIER => {
                CdpEvent::AttachedToTarget(typed::<_, D>(envelope.params)?)
            }
            EventDetachedFromTarget::IDENTIFIER => {
                CdpEvent::DetachedFromTarget(typed::<_, D>(envelope.params)?)
            }
            EventLoadEventFired::IDENTIFIER => {
                CdpEvent::LoadEventFired(typed::<_, D>(envelope.params)?)
            }
            EventConsoleApiCalled::IDENTIFIER => {
                CdpEvent::ConsoleApiCalled(typed::<_, D>(envelope.params)?)
            }
            EventExceptionThrown::IDENTIFIER => {
                CdpEvent::ExceptionThrown(typed::<_, D>(envelope.params)?)
            }
            EventRequestWillBeSent::IDENTIFIER => {
                CdpEvent::RequestWillBeSent(typed::<_, D>(envelope.params)?)
            }
            EventResponseReceived::IDENTIFIER => {
                CdpEvent::ResponseReceived(typed::<_, D>(envelope.params)?)
            }
            EventLoadingFinished::IDENTIFIER => {
                CdpEvent::LoadingFinished(typed::<_, D>(envelope.params)?)
            }
            EventLoadingFailed::IDENTIFIER => {
                CdpEvent::LoadingFailed(typed::<_, D>(envelope.params)?)
            }
            _ => CdpEvent::Other(envelope.params),
        };

        Ok(CdpEventMessage {
            method: Cow::Owned(envelope.method),
            session_id: envelope.session_id,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_target_created() {
        let raw = r#"{
            "method": "Target.targetCreated",
            "params": {"targetInfo": {
                "targetId": "t1",
                "type": "page",
                "title": "Example",
                "url": "https://example.com/",
                "attached": false
            }}
        }"#;
        let msg: CdpEventMessage = serde_json::from_str(raw).unwrap();
        match msg.params {
            CdpEvent::TargetCreated(ev) => {
                assert!(ev.target_info.is_page());
                assert_eq!(ev.target_info.title, "Example");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decodes_console_event_with_session() {
        let raw = r#"{
            "method": "Runtime.consoleAPICalled",
            "sessionId": "sess-1",
            "params": {
                "type": "error",
                "args": [{"type": "string", "value": "boom"}],
                "executionContextId": 2,
                "timestamp": 1700000000123.0
            }
        }"#;
        let msg: CdpEventMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.session_id.as_deref(), Some("sess-1"));
        match msg.params {
            CdpEvent::ConsoleApiCalled(ev) => {
                assert_eq!(ev.r#type, "error");
                assert_eq!(ev.args[0].preview(), "boom");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_methods_fall_through() {
        let raw = r#"{"method": "Animation.animationStarted", "params": {"id": "a"}}"#;
        let msg: CdpEventMessage = serde_json::from_str(raw).unwrap();
        assert!(matches!(msg.params, CdpEvent::Other(_)));
        assert_eq!(msg.method, "Animation.animationStarted");
    }
}
