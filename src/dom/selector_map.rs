use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything needed to locate the DOM element behind an accessibility node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementMapping {
    /// Engine-assigned DOM id
    pub backend_node_id: i64,

    /// Positional XPath, every segment indexed
    pub xpath: String,

    /// Best CSS selector, or the XPath when no stable attribute exists
    pub css_selector: String,

    /// Element's tag name
    pub tag_name: String,

    /// Element attributes
    #[serde(default)]
    pub attributes: HashMap<String, String>,

    /// Visible text, truncated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Whether the element has layout (`offsetParent !== null`)
    #[serde(default)]
    pub visible: bool,
}

impl ElementMapping {
    /// Create a mapping whose CSS selector falls back to the XPath
    pub fn new(
        backend_node_id: i64,
        xpath: impl Into<String>,
        tag_name: impl Into<String>,
    ) -> Self {
        let xpath = xpath.into();
        Self {
            backend_node_id,
            css_selector: xpath.clone(),
            xpath,
            tag_name: tag_name.into(),
            attributes: HashMap::new(),
            text: None,
            visible: false,
        }
    }

    /// Builder method: set CSS selector
    pub fn with_css_selector(mut self, css_selector: impl Into<String>) -> Self {
        self.css_selector = css_selector.into();
        self
    }

    /// Builder method: set attributes
    pub fn with_attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Builder method: set text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder method: set visibility
    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// Backend node id → element mapping for a single snapshot.
/// Uses IndexMap to preserve the order nodes were resolved in.
#[derive(Debug, Clone, Default)]
pub struct SelectorMap {
    map: IndexMap<i64, ElementMapping>,
}

impl SelectorMap {
    /// Create a new empty SelectorMap
    pub fn new() -> Self {
        Self { map: IndexMap::new() }
    }

    /// Register a mapping under its backend node id, replacing any previous one
    pub fn insert(&mut self, mapping: ElementMapping) {
        self.map.insert(mapping.backend_node_id, mapping);
    }

    pub fn get(&self, backend_node_id: i64) -> Option<&ElementMapping> {
        self.map.get(&backend_node_id)
    }

    pub fn contains(&self, backend_node_id: i64) -> bool {
        self.map.contains_key(&backend_node_id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
