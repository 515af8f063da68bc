//! The `Page` domain: navigation, history, screenshots and load lifecycle
//! events.

use serde::{Deserialize, Serialize};

use super::Method;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameId(String);

impl AsRef<str> for FrameId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for FrameId {
    fn from(id: String) -> Self {
        FrameId(id)
    }
}

/// Enables page domain notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EnableParams {}

impl EnableParams {
    pub const IDENTIFIER: &'static str = "Page.enable";
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

/// Navigates current page to the given URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateParams {
    /// URL to navigate the page to.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
}

impl NavigateParams {
    pub const IDENTIFIER: &'static str = "Page.navigate";

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referrer: None,
            transition_type: None,
            frame_id: None,
        }
    }
}

impl<T: Into<String>> From<T> for NavigateParams {
    fn from(url: T) -> Self {
        NavigateParams::new(url)
    }
}

impl Method for NavigateParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateReturns {
    /// Frame id that has navigated (or failed to navigate).
    pub frame_id: FrameId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loader_id: Option<String>,
    /// User friendly error message, present if and only if navigation has
    /// failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl super::Command for NavigateParams {
    type Response = NavigateReturns;
}

/// Reloads given page, optionally ignoring the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReloadParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_cache: Option<bool>,
}

impl ReloadParams {
    pub const IDENTIFIER: &'static str = "Page.reload";

    pub fn new(ignore_cache: bool) -> Self {
        Self {
            ignore_cache: Some(ignore_cache),
        }
    }
}

impl Method for ReloadParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReloadReturns {}

impl super::Command for ReloadParams {
    type Response = ReloadReturns;
}

/// Navigation history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEntry {
    /// Unique id of the navigation history entry.
    pub id: i64,
    pub url: String,
    pub user_typed_url: String,
    pub title: String,
    pub transition_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GetNavigationHistoryParams {}

impl GetNavigationHistoryParams {
    pub const IDENTIFIER: &'static str = "Page.getNavigationHistory";
}

impl Method for GetNavigationHistoryParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetNavigationHistoryReturns {
    /// Index of the current navigation history entry.
    pub current_index: i64,
    pub entries: Vec<NavigationEntry>,
}

impl super::Command for GetNavigationHistoryParams {
    type Response = GetNavigationHistoryReturns;
}

/// Navigates current page to the given history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateToHistoryEntryParams {
    pub entry_id: i64,
}

impl NavigateToHistoryEntryParams {
    pub const IDENTIFIER: &'static str = "Page.navigateToHistoryEntry";

    pub fn new(entry_id: i64) -> Self {
        Self { entry_id }
    }
}

impl Method for NavigateToHistoryEntryParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NavigateToHistoryEntryReturns {}

impl super::Command for NavigateToHistoryEntryParams {
    type Response = NavigateToHistoryEntryReturns;
}

/// Brings page to front (activates tab).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BringToFrontParams {}

impl BringToFrontParams {
    pub const IDENTIFIER: &'static str = "Page.bringToFront";
}

impl Method for BringToFrontParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BringToFrontReturns {}

impl super::Command for BringToFrontParams {
    type Response = BringToFrontReturns;
}

/// Capture a screenshot of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CaptureScreenshotParams {
    /// Image compression format (defaults to png).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<i64>,
    /// Capture the screenshot beyond the viewport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_beyond_viewport: Option<bool>,
}

impl CaptureScreenshotParams {
    pub const IDENTIFIER: &'static str = "Page.captureScreenshot";

    pub fn png(full_page: bool) -> Self {
        Self {
            format: Some("png".to_string()),
            quality: None,
            capture_beyond_viewport: full_page.then_some(true),
        }
    }
}

impl Method for CaptureScreenshotParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureScreenshotReturns {
    /// Base64-encoded image data.
    pub data: String,
}

impl super::Command for CaptureScreenshotParams {
    type Response = CaptureScreenshotReturns;
}

/// Fired when the page's `load` event has been dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLoadEventFired {
    pub timestamp: f64,
}

impl EventLoadEventFired {
    pub const IDENTIFIER: &'static str = "Page.loadEventFired";
}
