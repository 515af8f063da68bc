//! The client-facing wire protocol: newline-delimited JSON envelopes and the
//! command error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CdpError;
use crate::handler::session::SessionSummary;

/// One decoded request frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub cmd: String,
    /// Fuzzy session query; absent means the active session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Command-specific parameter object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            target: None,
            params: None,
        }
    }
}

/// One response frame. `error` is present iff `ok` is false; `data` only
/// when the command produced a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Response {
    pub fn success(data: Option<serde_json::Value>) -> Self {
        Self {
            ok: true,
            error: None,
            data,
        }
    }

    pub fn failure(err: CmdError) -> Self {
        let data = err.hint();
        Self {
            ok: false,
            error: Some(err.to_string()),
            data,
        }
    }
}

impl From<Result<Option<serde_json::Value>, CmdError>> for Response {
    fn from(result: Result<Option<serde_json::Value>, CmdError>) -> Self {
        match result {
            Ok(data) => Response::success(data),
            Err(err) => Response::failure(err),
        }
    }
}

/// Client-facing failures. The `Display` strings are the wire `error` field
/// and are stable enough for front-ends to pattern-match.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CmdError {
    #[error("{0}")]
    BadRequest(String),
    #[error("no active session")]
    NoActiveSession,
    #[error("ambiguous query '{query}', matches multiple sessions")]
    AmbiguousTarget {
        query: String,
        matches: Vec<SessionSummary>,
    },
    #[error("no elements found for selector '{0}'")]
    NoElements(String),
    #[error("no value for '{0}'")]
    NoValue(String),
    #[error("timeout")]
    Timeout,
    #[error("driver_unavailable")]
    DriverUnavailable,
    /// A structured failure the browser reported; its message is propagated
    /// verbatim.
    #[error("{0}")]
    Browser(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CmdError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        CmdError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CmdError::Internal(msg.into())
    }

    /// Structured payload accompanying the error, when there is one.
    pub fn hint(&self) -> Option<serde_json::Value> {
        match self {
            CmdError::AmbiguousTarget { matches, .. } => Some(serde_json::json!({
                "matches": matches,
            })),
            _ => None,
        }
    }
}

impl From<CdpError> for CmdError {
    fn from(err: CdpError) -> Self {
        match err {
            CdpError::Timeout => CmdError::Timeout,
            CdpError::Chrome(e) => CmdError::Browser(e.message),
            CdpError::Serde(e) => CmdError::Internal(e.to_string()),
            CdpError::Ws(_)
            | CdpError::Io(_)
            | CdpError::ConnectionClosed
            | CdpError::NotConnected
            | CdpError::NoResponse
            | CdpError::Launch(_)
            | CdpError::ChannelSendError(_) => CmdError::DriverUnavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_decodes_with_optional_fields() {
        let req: Request = serde_json::from_str(r#"{"cmd":"status"}"#).unwrap();
        assert_eq!(req.cmd, "status");
        assert!(req.target.is_none());
        assert!(req.params.is_none());

        let req: Request =
            serde_json::from_str(r#"{"cmd":"target","target":"dash","params":{"x":1}}"#).unwrap();
        assert_eq!(req.target.as_deref(), Some("dash"));
    }

    #[test]
    fn success_omits_error_field() {
        let resp = Response::success(Some(serde_json::json!({"running": true})));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("error"));
        assert!(json.contains("\"ok\":true"));
    }

    #[test]
    fn failure_strings_are_stable() {
        assert_eq!(CmdError::Timeout.to_string(), "timeout");
        assert_eq!(CmdError::DriverUnavailable.to_string(), "driver_unavailable");
        assert_eq!(
            CmdError::bad_request("unknown command: bogus").to_string(),
            "unknown command: bogus"
        );
        assert_eq!(CmdError::NoActiveSession.to_string(), "no active session");
    }

    #[test]
    fn ambiguous_target_carries_matches() {
        let err = CmdError::AmbiguousTarget {
            query: "dash".to_string(),
            matches: vec![
                SessionSummary {
                    id: "aaaa".to_string(),
                    url: "https://a/".to_string(),
                    title: "Dashboard".to_string(),
                },
                SessionSummary {
                    id: "bbbb".to_string(),
                    url: "https://b/".to_string(),
                    title: "Dashboard".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "ambiguous query 'dash', matches multiple sessions"
        );
        let resp = Response::failure(err);
        let matches = resp.data.unwrap()["matches"].as_array().unwrap().len();
        assert_eq!(matches, 2);
    }

    #[test]
    fn transport_faults_collapse_to_driver_unavailable() {
        assert_eq!(
            CmdError::from(CdpError::ConnectionClosed),
            CmdError::DriverUnavailable
        );
        assert_eq!(CmdError::from(CdpError::Timeout), CmdError::Timeout);
        let chrome = CdpError::Chrome(crate::cdp::CallError {
            code: -32000,
            message: "Cannot navigate to invalid URL".to_string(),
        });
        assert_eq!(
            CmdError::from(chrome),
            CmdError::Browser("Cannot navigate to invalid URL".to_string())
        );
    }
}
