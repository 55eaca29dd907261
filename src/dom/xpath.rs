//! Positional XPaths for every node of a `DOM.getDocument` tree.
//!
//! Every segment carries an explicit 1-based index, `[1]` included, so a
//! path never depends on whether later siblings exist.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{BrowserError, Result};

const ELEMENT_NODE: u64 = 1;
const TEXT_NODE: u64 = 3;
const COMMENT_NODE: u64 = 8;

fn segment(node: &Value, index: usize) -> Option<String> {
    match node.get("nodeType").and_then(Value::as_u64)? {
        ELEMENT_NODE => {
            let name = node.get("nodeName").and_then(Value::as_str)?.to_lowercase();
            Some(format!("{}[{}]", name, index))
        }
        TEXT_NODE => Some(format!("text()[{}]", index)),
        COMMENT_NODE => Some(format!("comment()[{}]", index)),
        _ => None,
    }
}

fn sibling_key(node: &Value) -> (u64, String) {
    (
        node.get("nodeType").and_then(Value::as_u64).unwrap_or_default(),
        node.get("nodeName").and_then(Value::as_str).unwrap_or_default().to_lowercase(),
    )
}

/// Walk the document depth-first and map each backend node id to its
/// XPath. Frame documents restart at the root, so paths inside an iframe
/// are relative to that frame's document.
pub fn build_xpath_map(document: &Value) -> Result<HashMap<i64, String>> {
    let root = document
        .get("root")
        .ok_or_else(|| BrowserError::DomParseFailed("DOM document has no 'root'".to_string()))?;

    let mut xpaths = HashMap::new();
    let mut stack: Vec<(&Value, String)> = vec![(root, String::new())];

    while let Some((node, path)) = stack.pop() {
        if !path.is_empty() {
            if let Some(backend_id) = node.get("backendNodeId").and_then(Value::as_i64) {
                xpaths.insert(backend_id, path.clone());
            }
        }

        if let Some(frame_document) = node.get("contentDocument") {
            stack.push((frame_document, String::new()));
        }

        for shadow_root in node.get("shadowRoots").and_then(Value::as_array).into_iter().flatten() {
            stack.push((shadow_root, path.clone()));
        }

        let mut counters: HashMap<(u64, String), usize> = HashMap::new();
        let mut children = Vec::new();
        for child in node.get("children").and_then(Value::as_array).into_iter().flatten() {
            let counter = counters.entry(sibling_key(child)).or_insert(0);
            *counter += 1;
            if let Some(segment) = segment(child, *counter) {
                children.push((child, format!("{}/{}", path, segment)));
            }
        }
        // reversed so siblings are visited in document order
        stack.extend(children.into_iter().rev());
    }

    Ok(xpaths)
}
