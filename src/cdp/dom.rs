//! The `DOM` domain: node queries, focus and geometry for input injection.

use serde::{Deserialize, Serialize};

use super::Method;

/// Unique DOM node identifier.
///
/// A node id of `0` means "no node"; `Page.querySelector` answers with it
/// when nothing matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(i64);

impl NodeId {
    pub fn new(id: i64) -> Self {
        NodeId(id)
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

/// Unique DOM node identifier used to reference a node that may not have been
/// pushed to the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendNodeId(i64);

/// An array of quad vertices, x immediately followed by y for each point,
/// points clock-wise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quad(pub Vec<f64>);

impl Quad {
    /// Geometric center of the quad.
    pub fn center(&self) -> Option<(f64, f64)> {
        if self.0.len() < 8 {
            return None;
        }
        let xs = (self.0[0] + self.0[2] + self.0[4] + self.0[6]) / 4.0;
        let ys = (self.0[1] + self.0[3] + self.0[5] + self.0[7]) / 4.0;
        Some((xs, ys))
    }
}

/// DOM interaction is implemented in terms of mirror objects that represent
/// the actual DOM nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_id: NodeId,
    pub backend_node_id: BackendNodeId,
    pub node_type: i64,
    /// Node's nodeName.
    pub node_name: String,
    pub local_name: String,
    pub node_value: String,
    /// Attributes of the Element node in the form of flat array
    /// `[name1, value1, name2, value2]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EnableParams {}

impl EnableParams {
    pub const IDENTIFIER: &'static str = "DOM.enable";
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

/// Returns the root DOM node to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetDocumentParams {
    /// The maximum depth at which children should be retrieved, defaults
    /// to 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
}

impl GetDocumentParams {
    pub const IDENTIFIER: &'static str = "DOM.getDocument";
}

impl Method for GetDocumentParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDocumentReturns {
    /// Resulting node.
    pub root: Node,
}

impl super::Command for GetDocumentParams {
    type Response = GetDocumentReturns;
}

/// Executes `querySelector` on a given node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelectorParams {
    pub node_id: NodeId,
    pub selector: String,
}

impl QuerySelectorParams {
    pub const IDENTIFIER: &'static str = "DOM.querySelector";

    pub fn new(node_id: NodeId, selector: impl Into<String>) -> Self {
        Self {
            node_id,
            selector: selector.into(),
        }
    }
}

impl Method for QuerySelectorParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelectorReturns {
    pub node_id: NodeId,
}

impl super::Command for QuerySelectorParams {
    type Response = QuerySelectorReturns;
}

/// Executes `querySelectorAll` on a given node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelectorAllParams {
    pub node_id: NodeId,
    pub selector: String,
}

impl QuerySelectorAllParams {
    pub const IDENTIFIER: &'static str = "DOM.querySelectorAll";

    pub fn new(node_id: NodeId, selector: impl Into<String>) -> Self {
        Self {
            node_id,
            selector: selector.into(),
        }
    }
}

impl Method for QuerySelectorAllParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelectorAllReturns {
    pub node_ids: Vec<NodeId>,
}

impl super::Command for QuerySelectorAllParams {
    type Response = QuerySelectorAllReturns;
}

/// Returns node's HTML markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetOuterHtmlParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_node_id: Option<BackendNodeId>,
}

impl GetOuterHtmlParams {
    pub const IDENTIFIER: &'static str = "DOM.getOuterHTML";

    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id: Some(node_id),
            backend_node_id: None,
        }
    }
}

impl Method for GetOuterHtmlParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOuterHtmlReturns {
    pub outer_html: String,
}

impl super::Command for GetOuterHtmlParams {
    type Response = GetOuterHtmlReturns;
}

/// Returns attributes for the specified node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAttributesParams {
    pub node_id: NodeId,
}

impl GetAttributesParams {
    pub const IDENTIFIER: &'static str = "DOM.getAttributes";

    pub fn new(node_id: NodeId) -> Self {
        Self { node_id }
    }
}

impl Method for GetAttributesParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAttributesReturns {
    /// An interleaved array of node attribute names and values.
    pub attributes: Vec<String>,
}

impl super::Command for GetAttributesParams {
    type Response = GetAttributesReturns;
}

/// Focuses the given element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FocusParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

impl FocusParams {
    pub const IDENTIFIER: &'static str = "DOM.focus";

    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id: Some(node_id),
        }
    }
}

impl Method for FocusParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FocusReturns {}

impl super::Command for FocusParams {
    type Response = FocusReturns;
}

/// Scrolls the specified node into view if not already visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScrollIntoViewIfNeededParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

impl ScrollIntoViewIfNeededParams {
    pub const IDENTIFIER: &'static str = "DOM.scrollIntoViewIfNeeded";

    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id: Some(node_id),
        }
    }
}

impl Method for ScrollIntoViewIfNeededParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScrollIntoViewIfNeededReturns {}

impl super::Command for ScrollIntoViewIfNeededParams {
    type Response = ScrollIntoViewIfNeededReturns;
}

/// Returns quads that describe node position on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetContentQuadsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

impl GetContentQuadsParams {
    pub const IDENTIFIER: &'static str = "DOM.getContentQuads";

    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id: Some(node_id),
        }
    }
}

impl Method for GetContentQuadsParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetContentQuadsReturns {
    /// Quads that describe node layout relative to viewport.
    pub quads: Vec<Quad>,
}

impl super::Command for GetContentQuadsParams {
    type Response = GetContentQuadsReturns;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_center() {
        let quad = Quad(vec![0.0, 0.0, 10.0, 0.0, 10.0, 4.0, 0.0, 4.0]);
        assert_eq!(quad.center(), Some((5.0, 2.0)));
        assert_eq!(Quad(vec![1.0, 2.0]).center(), None);
    }

    #[test]
    fn zero_node_id_means_no_match() {
        let returns: QuerySelectorReturns = serde_json::from_str(r#"{"nodeId":0}"#).unwrap();
        assert!(returns.node_id.is_none());
    }
}
