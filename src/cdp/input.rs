//! The `Input` domain: trusted mouse and keyboard event injection.

use serde::{Deserialize, Serialize};

use super::Method;

/// Bit field of pressed modifier keys.
pub mod modifiers {
    pub const ALT: i64 = 1;
    pub const CTRL: i64 = 2;
    pub const META: i64 = 4;
    pub const SHIFT: i64 = 8;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DispatchKeyEventType {
    KeyDown,
    KeyUp,
    RawKeyDown,
    Char,
}

/// Dispatches a key event to the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchKeyEventParams {
    pub r#type: DispatchKeyEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<i64>,
    /// Text as generated by processing a virtual key code with a keyboard
    /// layout. Not needed for `keyUp` and `rawKeyDown` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmodified_text: Option<String>,
    /// DOM key value, e.g. `Enter`, `a`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Unique DOM key location, e.g. `KeyA`, `Enter`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_virtual_key_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_virtual_key_code: Option<i64>,
}

impl DispatchKeyEventParams {
    pub const IDENTIFIER: &'static str = "Input.dispatchKeyEvent";

    pub fn new(r#type: DispatchKeyEventType) -> Self {
        Self {
            r#type,
            modifiers: None,
            text: None,
            unmodified_text: None,
            key: None,
            code: None,
            windows_virtual_key_code: None,
            native_virtual_key_code: None,
        }
    }
}

impl Method for DispatchKeyEventParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DispatchKeyEventReturns {}

impl super::Command for DispatchKeyEventParams {
    type Response = DispatchKeyEventReturns;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DispatchMouseEventType {
    MousePressed,
    MouseReleased,
    MouseMoved,
    MouseWheel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    None,
    Left,
    Middle,
    Right,
    Back,
    Forward,
}

/// Dispatches a mouse event to the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchMouseEventParams {
    pub r#type: DispatchMouseEventType,
    /// X coordinate of the event relative to the main frame's viewport in CSS
    /// pixels.
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<MouseButton>,
    /// Number of times the mouse button was clicked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_count: Option<i64>,
    /// X delta in CSS pixels for mouse wheel event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_y: Option<f64>,
}

impl DispatchMouseEventParams {
    pub const IDENTIFIER: &'static str = "Input.dispatchMouseEvent";

    pub fn new(r#type: DispatchMouseEventType, x: f64, y: f64) -> Self {
        Self {
            r#type,
            x,
            y,
            modifiers: None,
            button: None,
            click_count: None,
            delta_x: None,
            delta_y: None,
        }
    }

    pub fn left_click(r#type: DispatchMouseEventType, x: f64, y: f64) -> Self {
        let mut params = Self::new(r#type, x, y);
        params.button = Some(MouseButton::Left);
        params.click_count = Some(1);
        params
    }
}

impl Method for DispatchMouseEventParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DispatchMouseEventReturns {}

impl super::Command for DispatchMouseEventParams {
    type Response = DispatchMouseEventReturns;
}

/// Emulates inserting text that doesn't come from a key press, replacing the
/// current selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertTextParams {
    pub text: String,
}

impl InsertTextParams {
    pub const IDENTIFIER: &'static str = "Input.insertText";

    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Method for InsertTextParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InsertTextReturns {}

impl super::Command for InsertTextParams {
    type Response = InsertTextReturns;
}
