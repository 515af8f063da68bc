//! The `Network` domain: request lifecycle events, response bodies and the
//! cookie jar.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Method;

/// Unique request identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn inner(&self) -> &String {
        &self.0
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId(id)
    }
}

/// Request / response headers as keys / values of JSON object.
///
/// The protocol leaves value types open, so they are normalized to strings on
/// access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Headers(pub serde_json::Value);

impl Headers {
    pub fn to_map(&self) -> BTreeMap<String, String> {
        match &self.0 {
            serde_json::Value::Object(map) => map
                .iter()
                .map(|(k, v)| {
                    let value = match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect(),
            _ => BTreeMap::new(),
        }
    }
}

/// Resource type as it was perceived by the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    TextTrack,
    #[serde(rename = "XHR")]
    Xhr,
    Fetch,
    Prefetch,
    EventSource,
    WebSocket,
    Manifest,
    SignedExchange,
    Ping,
    #[serde(rename = "CSPViolationReport")]
    CspViolationReport,
    Preflight,
    FedCM,
    Other,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Document => "document",
            ResourceType::Stylesheet => "stylesheet",
            ResourceType::Image => "image",
            ResourceType::Media => "media",
            ResourceType::Font => "font",
            ResourceType::Script => "script",
            ResourceType::TextTrack => "texttrack",
            ResourceType::Xhr => "xhr",
            ResourceType::Fetch => "fetch",
            ResourceType::Prefetch => "prefetch",
            ResourceType::EventSource => "eventsource",
            ResourceType::WebSocket => "websocket",
            ResourceType::Manifest => "manifest",
            ResourceType::SignedExchange => "signedexchange",
            ResourceType::Ping => "ping",
            ResourceType::CspViolationReport => "cspviolationreport",
            ResourceType::Preflight => "preflight",
            ResourceType::FedCM => "fedcm",
            ResourceType::Other => "other",
        }
    }
}

/// HTTP request data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub url: String,
    /// HTTP request method.
    pub method: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_data: Option<String>,
}

/// HTTP response data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub url: String,
    /// HTTP response status code.
    pub status: i64,
    pub status_text: String,
    #[serde(default)]
    pub headers: Headers,
    pub mime_type: String,
    /// Total number of bytes received for this request so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded_data_length: Option<f64>,
}

/// Enables network tracking, network events will now be delivered to the
/// client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnableParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_total_buffer_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_resource_buffer_size: Option<i64>,
}

impl EnableParams {
    pub const IDENTIFIER: &'static str = "Network.enable";
}

impl Method for EnableParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EnableReturns {}

impl super::Command for EnableParams {
    type Response = EnableReturns;
}

/// Returns content served for the given request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResponseBodyParams {
    pub request_id: RequestId,
}

impl GetResponseBodyParams {
    pub const IDENTIFIER: &'static str = "Network.getResponseBody";

    pub fn new(request_id: RequestId) -> Self {
        Self { request_id }
    }
}

impl Method for GetResponseBodyParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResponseBodyReturns {
    /// Response body.
    pub body: String,
    /// True, if content was sent as base64.
    pub base64_encoded: bool,
}

impl super::Command for GetResponseBodyParams {
    type Response = GetResponseBodyReturns;
}

/// Represents the cookie's 'SameSite' status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CookieSameSite {
    Strict,
    Lax,
    None,
}

/// Cookie object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Cookie expiration date as the number of seconds since the UNIX epoch.
    pub expires: f64,
    /// Cookie size.
    pub size: i64,
    pub http_only: bool,
    pub secure: bool,
    /// True in case of session cookie.
    pub session: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<CookieSameSite>,
}

/// Returns all browser cookies for the current URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetCookiesParams {
    /// The list of URLs for which applicable cookies will be fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
}

impl GetCookiesParams {
    pub const IDENTIFIER: &'static str = "Network.getCookies";
}

impl Method for GetCookiesParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCookiesReturns {
    pub cookies: Vec<Cookie>,
}

impl super::Command for GetCookiesParams {
    type Response = GetCookiesReturns;
}

/// Sets a cookie with the given cookie data; may overwrite equivalent cookies
/// if they exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCookieParams {
    pub name: String,
    pub value: String,
    /// The request-URI to associate with the setting of the cookie.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<CookieSameSite>,
}

impl SetCookieParams {
    pub const IDENTIFIER: &'static str = "Network.setCookie";

    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            url: None,
            domain: None,
            path: None,
            secure: None,
            http_only: None,
            expires: None,
            same_site: None,
        }
    }
}

impl Method for SetCookieParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SetCookieReturns {
    #[serde(default)]
    pub success: bool,
}

impl super::Command for SetCookieParams {
    type Response = SetCookieReturns;
}

/// Deletes browser cookies with matching name and url or domain/path pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCookiesParams {
    /// Name of the cookies to remove.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl DeleteCookiesParams {
    pub const IDENTIFIER: &'static str = "Network.deleteCookies";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            domain: None,
            path: None,
        }
    }
}

impl Method for DeleteCookiesParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeleteCookiesReturns {}

impl super::Command for DeleteCookiesParams {
    type Response = DeleteCookiesReturns;
}

/// Fired when page is about to send HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestWillBeSent {
    pub request_id: RequestId,
    #[serde(rename = "documentURL")]
    pub document_url: String,
    pub request: Request,
    /// Monotonic timestamp in seconds.
    pub timestamp: f64,
    /// Wall clock timestamp in seconds since the UNIX epoch.
    pub wall_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<ResourceType>,
}

impl EventRequestWillBeSent {
    pub const IDENTIFIER: &'static str = "Network.requestWillBeSent";
}

/// Fired when HTTP response is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponseReceived {
    pub request_id: RequestId,
    pub timestamp: f64,
    pub r#type: ResourceType,
    pub response: Response,
}

impl EventResponseReceived {
    pub const IDENTIFIER: &'static str = "Network.responseReceived";
}

/// Fired when HTTP request has finished loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLoadingFinished {
    pub request_id: RequestId,
    pub timestamp: f64,
    /// Total number of bytes received for this request.
    pub encoded_data_length: f64,
}

impl EventLoadingFinished {
    pub const IDENTIFIER: &'static str = "Network.loadingFinished";
}

/// Fired when HTTP request has failed to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLoadingFailed {
    pub request_id: RequestId,
    pub timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<ResourceType>,
    /// User friendly error message, e.g. `net::ERR_NAME_NOT_RESOLVED`.
    pub error_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled: Option<bool>,
}

impl EventLoadingFailed {
    pub const IDENTIFIER: &'static str = "Network.loadingFailed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_type_wire_names() {
        assert_eq!(
            serde_json::from_str::<ResourceType>("\"XHR\"").unwrap(),
            ResourceType::Xhr
        );
        assert_eq!(
            serde_json::from_str::<ResourceType>("\"Document\"").unwrap(),
            ResourceType::Document
        );
        assert_eq!(
            serde_json::to_string(&ResourceType::CspViolationReport).unwrap(),
            "\"CSPViolationReport\""
        );
    }

    #[test]
    fn headers_normalize_to_string_map() {
        let headers = Headers(serde_json::json!({
            "Content-Type": "text/html",
            "Content-Length": 42,
        }));
        let map = headers.to_map();
        assert_eq!(map.get("Content-Type").unwrap(), "text/html");
        assert_eq!(map.get("Content-Length").unwrap(), "42");
    }

    #[test]
    fn request_will_be_sent_decodes() {
        let raw = r#"{
            "requestId": "1000.1",
            "documentURL": "https://example.com/",
            "request": {"url": "https://example.com/", "method": "GET", "headers": {"Accept": "*/*"}},
            "timestamp": 100.5,
            "wallTime": 1700000000.25,
            "type": "Document"
        }"#;
        let ev: EventRequestWillBeSent = serde_json::from_str(raw).unwrap();
        assert_eq!(ev.request.method, "GET");
        assert_eq!(ev.r#type, Some(ResourceType::Document));
        assert_eq!(ev.request_id.as_ref(), "1000.1");
    }
}
