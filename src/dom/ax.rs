use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BrowserError, Result};
use crate::utils::collapse_whitespace;

/// A node of the browser's accessibility tree, flattened into an arena.
///
/// `node_id` is a sequential label assigned per snapshot; it means nothing
/// outside the snapshot that produced it. `backend_node_id` is the
/// engine's DOM id and stays valid until the node is removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityNode {
    pub node_id: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_node_id: Option<i64>,

    pub role: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Flags such as `focusable`, `required`, `checked`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_ids: Vec<u32>,
}

impl AccessibilityNode {
    pub fn new(node_id: u32, role: impl Into<String>) -> Self {
        Self {
            node_id,
            backend_node_id: None,
            role: role.into(),
            name: None,
            value: None,
            properties: BTreeMap::new(),
            parent_id: None,
            child_ids: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_backend_id(mut self, backend_node_id: i64) -> Self {
        self.backend_node_id = Some(backend_node_id);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_parent(mut self, parent_id: u32) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_children(mut self, child_ids: Vec<u32>) -> Self {
        self.child_ids = child_ids;
        self
    }

    /// Display text: the value if it has any content, otherwise the name.
    /// Whitespace is collapsed; empty text is `None`.
    pub fn text(&self) -> Option<String> {
        [self.value.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .map(collapse_whitespace)
            .find(|text| !text.is_empty())
    }

    /// Whether a boolean property is present and true
    pub fn has_flag(&self, property: &str) -> bool {
        matches!(self.properties.get(property), Some(Value::Bool(true)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAxNode {
    node_id: String,
    #[serde(default)]
    ignored: Option<bool>,
    #[serde(default)]
    role: Option<RawAxValue>,
    #[serde(default)]
    name: Option<RawAxValue>,
    #[serde(default)]
    value: Option<RawAxValue>,
    #[serde(default)]
    properties: Option<Vec<RawAxProperty>>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    child_ids: Option<Vec<String>>,
    #[serde(default, rename = "backendDOMNodeId")]
    backend_dom_node_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawAxValue {
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawAxProperty {
    name: String,
    value: RawAxValue,
}

fn value_to_text(value: Option<&RawAxValue>) -> Option<String> {
    match value?.value.as_ref()? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Convert an `Accessibility.getFullAXTree` result into sequentially
/// numbered nodes. Ids follow the order the engine reported the nodes,
/// starting at 1; edges to nodes missing from the result are dropped.
pub fn parse_ax_tree(result: &Value) -> Result<Vec<AccessibilityNode>> {
    let raw_nodes = result
        .get("nodes")
        .cloned()
        .ok_or_else(|| {
            BrowserError::DomParseFailed("Accessibility tree has no 'nodes'".to_string())
        })?;
    let raw_nodes: Vec<RawAxNode> = serde_json::from_value(raw_nodes).map_err(|e| {
        BrowserError::DomParseFailed(format!("Failed to parse accessibility nodes: {}", e))
    })?;

    let sequential: HashMap<&str, u32> = raw_nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.node_id.as_str(), i as u32 + 1))
        .collect();

    let nodes = raw_nodes
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let role = if raw.ignored.unwrap_or(false) {
                "none".to_string()
            } else {
                value_to_text(raw.role.as_ref()).unwrap_or_else(|| "none".to_string())
            };

            let properties = raw
                .properties
                .iter()
                .flatten()
                .filter_map(|prop| prop.value.value.clone().map(|v| (prop.name.clone(), v)))
                .collect();

            AccessibilityNode {
                node_id: i as u32 + 1,
                backend_node_id: raw.backend_dom_node_id,
                role,
                name: value_to_text(raw.name.as_ref()),
                value: value_to_text(raw.value.as_ref()),
                properties,
                parent_id: raw
                    .parent_id
                    .as_deref()
                    .and_then(|id| sequential.get(id).copied()),
                child_ids: raw
                    .child_ids
                    .iter()
                    .flatten()
                    .filter_map(|id| sequential.get(id.as_str()).copied())
                    .collect(),
            }
        })
        .collect();

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ax_value(value: Value) -> Value {
        json!({ "type": "string", "value": value })
    }

    #[test]
    fn test_text_prefers_value() {
        let node = AccessibilityNode::new(1, "textbox")
            .with_name("Search")
            .with_value("  rust   developer ");
        assert_eq!(node.text().as_deref(), Some("rust developer"));

        let node = AccessibilityNode::new(2, "textbox").with_name("Search").with_value("   ");
        assert_eq!(node.text().as_deref(), Some("Search"));

        let node = AccessibilityNode::new(3, "generic");
        assert!(node.text().is_none());
    }

    #[test]
    fn test_has_flag() {
        let node = AccessibilityNode::new(1, "button")
            .with_property("focusable", true)
            .with_property("disabled", false);
        assert!(node.has_flag("focusable"));
        assert!(!node.has_flag("disabled"));
        assert!(!node.has_flag("editable"));
    }

    #[test]
    fn test_parse_ax_tree_assigns_sequential_ids() {
        let result = json!({
            "nodes": [
                {
                    "nodeId": "57",
                    "ignored": false,
                    "role": ax_value(json!("RootWebArea")),
                    "name": ax_value(json!("Jobs")),
                    "childIds": ["91", "400"],
                    "backendDOMNodeId": 1
                },
                {
                    "nodeId": "91",
                    "ignored": false,
                    "role": ax_value(json!("combobox")),
                    "name": ax_value(json!("Search by title, skill, or company")),
                    "properties": [
                        {
                            "name": "focusable",
                            "value": { "type": "booleanOrUndefined", "value": true }
                        },
                        {
                            "name": "expanded",
                            "value": { "type": "booleanOrUndefined", "value": false }
                        }
                    ],
                    "parentId": "57",
                    "childIds": [],
                    "backendDOMNodeId": 12
                },
                {
                    "nodeId": "400",
                    "ignored": true,
                    "role": ax_value(json!("generic")),
                    "parentId": "57",
                    "childIds": ["999"],
                    "backendDOMNodeId": 13
                }
            ]
        });

        let nodes = parse_ax_tree(&result).unwrap();
        assert_eq!(nodes.len(), 3);

        assert_eq!(nodes[0].node_id, 1);
        assert_eq!(nodes[0].child_ids, vec![2, 3]);
        assert_eq!(nodes[0].parent_id, None);

        assert_eq!(nodes[1].node_id, 2);
        assert_eq!(nodes[1].role, "combobox");
        assert_eq!(nodes[1].parent_id, Some(1));
        assert_eq!(nodes[1].backend_node_id, Some(12));
        assert!(nodes[1].has_flag("focusable"));
        assert_eq!(nodes[1].properties.get("expanded"), Some(&json!(false)));

        // ignored nodes become noise, and the dangling child edge is dropped
        assert_eq!(nodes[2].role, "none");
        assert!(nodes[2].child_ids.is_empty());
    }

    #[test]
    fn test_parse_ax_tree_tolerates_nulls() {
        let result = json!({
            "nodes": [{
                "nodeId": "1",
                "ignored": null,
                "role": ax_value(json!("button")),
                "name": null,
                "value": null,
                "properties": null,
                "parentId": null,
                "childIds": null,
                "backendDOMNodeId": null
            }]
        });

        let nodes = parse_ax_tree(&result).unwrap();
        assert_eq!(nodes[0].role, "button");
        assert!(nodes[0].backend_node_id.is_none());
    }

    #[test]
    fn test_parse_ax_tree_requires_nodes() {
        assert!(parse_ax_tree(&json!({})).is_err());
    }
}
