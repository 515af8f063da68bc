//! The `Browser` domain: version probing (used as the connection heartbeat)
//! and graceful shutdown.

use serde::{Deserialize, Serialize};

use super::Method;

/// Returns version information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GetVersionParams {}

impl GetVersionParams {
    pub const IDENTIFIER: &'static str = "Browser.getVersion";
}

impl Method for GetVersionParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVersionReturns {
    /// Protocol version.
    pub protocol_version: String,
    /// Product name, e.g. `Chrome/121.0.6167.85`.
    pub product: String,
    pub revision: String,
    pub user_agent: String,
    pub js_version: String,
}

impl super::Command for GetVersionParams {
    type Response = GetVersionReturns;
}

/// Close browser gracefully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CloseParams {}

impl CloseParams {
    pub const IDENTIFIER: &'static str = "Browser.close";
}

impl Method for CloseParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CloseReturns {}

impl super::Command for CloseParams {
    type Response = CloseReturns;
}
