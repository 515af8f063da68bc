//! The `CSS` domain: computed, inline and matched styles for a node.
//!
//! Requires `DOM.enable` followed by `CSS.enable` on the session.

use serde::{Deserialize, Serialize};

use super::dom::NodeId;
use super::Method;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleSheetId(String);

impl AsRef<str> for StyleSheetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Stylesheet type: "injected" for stylesheets injected via extension,
/// "user-agent" for user-agent stylesheets, "inspector" for stylesheets
/// created by the inspector, "regular" for regular stylesheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleSheetOrigin {
    Injected,
    UserAgent,
    Inspector,
    Regular,
}

impl StyleSheetOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleSheetOrigin::Injected => "injected",
            StyleSheetOrigin::UserAgent => "user-agent",
            StyleSheetOrigin::Inspector => "inspector",
            StyleSheetOrigin::Regular => "regular",
        }
    }
}

/// A single computed style property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CssComputedStyleProperty {
    pub name: String,
    pub value: String,
}

/// CSS property declaration data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CssProperty {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub important: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

/// CSS style representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CssStyle {
    pub css_properties: Vec<CssProperty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css_text: Option<String>,
}

/// Data for a simple selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CssValue {
    pub text: String,
}

/// Selector list data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorList {
    /// Selectors in the list.
    pub selectors: Vec<CssValue>,
    /// Rule selector text.
    pub text: String,
}

/// CSS rule representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CssRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_sheet_id: Option<StyleSheetId>,
    pub selector_list: SelectorList,
    pub origin: StyleSheetOrigin,
    pub style: CssStyle,
}

/// Match data for a CSS rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMatch {
    pub rule: CssRule,
    /// Matching selector indices in the rule's selector list.
    pub matching_selectors: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EnableParams {}

impl EnableParams {
    pub const IDENTIFIER: &'static str = "CSS.enable";
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

/// Returns the computed style for a DOM node identified by `nodeId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetComputedStyleForNodeParams {
    pub node_id: NodeId,
}

impl GetComputedStyleForNodeParams {
    pub const IDENTIFIER: &'static str = "CSS.getComputedStyleForNode";

    pub fn new(node_id: NodeId) -> Self {
        Self { node_id }
    }
}

impl Method for GetComputedStyleForNodeParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetComputedStyleForNodeReturns {
    pub computed_style: Vec<CssComputedStyleProperty>,
}

impl super::Command for GetComputedStyleForNodeParams {
    type Response = GetComputedStyleForNodeReturns;
}

/// Returns the styles defined inline (explicitly in the "style" attribute and
/// implicitly, using DOM attributes) for a DOM node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInlineStylesForNodeParams {
    pub node_id: NodeId,
}

impl GetInlineStylesForNodeParams {
    pub const IDENTIFIER: &'static str = "CSS.getInlineStylesForNode";

    pub fn new(node_id: NodeId) -> Self {
        Self { node_id }
    }
}

impl Method for GetInlineStylesForNodeParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInlineStylesForNodeReturns {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_style: Option<CssStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_style: Option<CssStyle>,
}

impl super::Command for GetInlineStylesForNodeParams {
    type Response = GetInlineStylesForNodeReturns;
}

/// Returns requested styles for a DOM node identified by `nodeId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMatchedStylesForNodeParams {
    pub node_id: NodeId,
}

impl GetMatchedStylesForNodeParams {
    pub const IDENTIFIER: &'static str = "CSS.getMatchedStylesForNode";

    pub fn new(node_id: NodeId) -> Self {
        Self { node_id }
    }
}

impl Method for GetMatchedStylesForNodeParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMatchedStylesForNodeReturns {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_style: Option<CssStyle>,
    /// CSS rules matching this node, from all applicable stylesheets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_css_rules: Option<Vec<RuleMatch>>,
}

impl super::Command for GetMatchedStylesForNodeParams {
    type Response = GetMatchedStylesForNodeReturns;
}
