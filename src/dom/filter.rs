//! Pruning and rendering of accessibility trees for the model.
//!
//! The rendered tree is the model's whole view of the page, so it keeps
//! interactive and landmark nodes and drops layout noise. `StaticText` is
//! dropped on purpose: it repeats the names of the controls around it and
//! lures the model into picking text instead of the control.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use serde_json::Value;

use crate::dom::ax::AccessibilityNode;

/// Roles that never survive filtering
pub const NOISE_ROLES: &[&str] = &[
    "generic",
    "presentation",
    "none",
    "InlineTextBox",
    "LineBreak",
    "StaticText",
];

/// Roles that always survive filtering
pub const KEEP_ROLES: &[&str] = &[
    // interactive
    "button",
    "link",
    "textbox",
    "searchbox",
    "combobox",
    "listbox",
    "option",
    "checkbox",
    "radio",
    "switch",
    "slider",
    "spinbutton",
    "menu",
    "menubar",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "tab",
    "tablist",
    "tabpanel",
    "treeitem",
    // structure and landmarks
    "RootWebArea",
    "WebArea",
    "form",
    "search",
    "navigation",
    "main",
    "banner",
    "contentinfo",
    "complementary",
    "region",
    "dialog",
    "alertdialog",
    "article",
    "heading",
    "list",
    "listitem",
    "table",
    "row",
    "cell",
    "columnheader",
    "rowheader",
    "grid",
    "gridcell",
];

/// Properties that make an otherwise unremarkable node worth keeping
const INTERACTIVE_FLAGS: &[&str] = &["focusable", "clickable", "editable"];

/// Properties rendered inline after a node's text
pub const INLINE_PROPERTIES: &[&str] = &["required", "disabled", "checked", "selected", "expanded"];

const MIN_TEXT_CHARS: usize = 2;

fn decide(
    node_id: u32,
    by_id: &HashMap<u32, &AccessibilityNode>,
    memo: &mut HashMap<u32, bool>,
    visiting: &mut HashSet<u32>,
) -> bool {
    if let Some(&kept) = memo.get(&node_id) {
        return kept;
    }
    let Some(node) = by_id.get(&node_id) else {
        return false;
    };
    if !visiting.insert(node_id) {
        // cycle in a malformed tree
        return false;
    }

    let role = node.role.as_str();
    let kept = if NOISE_ROLES.contains(&role) {
        false
    } else if KEEP_ROLES.contains(&role)
        || INTERACTIVE_FLAGS.iter().any(|flag| node.has_flag(flag))
        || node.text().is_some_and(|text| text.chars().count() > MIN_TEXT_CHARS)
    {
        true
    } else {
        // a bare container stays only if something beneath it stays
        let mut any_child = false;
        for &child in &node.child_ids {
            any_child |= decide(child, by_id, memo, visiting);
        }
        any_child
    };

    visiting.remove(&node_id);
    memo.insert(node_id, kept);
    kept
}

/// Keep the meaningful nodes and rewire edges among the survivors only.
///
/// A survivor whose parent was dropped becomes a root. Running this on its
/// own output returns the same nodes.
pub fn filter_nodes(nodes: &[AccessibilityNode]) -> Vec<AccessibilityNode> {
    let by_id: HashMap<u32, &AccessibilityNode> = nodes.iter().map(|n| (n.node_id, n)).collect();
    let mut memo = HashMap::new();
    let mut visiting = HashSet::new();

    let kept: HashSet<u32> = nodes
        .iter()
        .filter(|node| decide(node.node_id, &by_id, &mut memo, &mut visiting))
        .map(|node| node.node_id)
        .collect();

    nodes
        .iter()
        .filter(|node| kept.contains(&node.node_id))
        .map(|node| {
            let mut node = node.clone();
            node.child_ids.retain(|child| kept.contains(child));
            node.parent_id = node.parent_id.filter(|parent| kept.contains(parent));
            node
        })
        .collect()
}

fn property_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_line(node: &AccessibilityNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let _ = write!(out, "{}[{}] {}", indent, node.node_id, node.role);
    if let Some(text) = node.text() {
        let _ = write!(out, ": {}", text);
    }

    let props: Vec<String> = INLINE_PROPERTIES
        .iter()
        .filter_map(|name| {
            node.properties
                .get(*name)
                .map(|v| format!("{}={}", name, property_text(v)))
        })
        .collect();
    if !props.is_empty() {
        let _ = write!(out, " ({})", props.join(" "));
    }
    out.push('\n');
}

/// Render nodes depth-first as `<indent>[nodeId] role: text (prop=value ...)`.
/// Roots are nodes without a parent in `nodes`.
pub fn format_tree(nodes: &[AccessibilityNode]) -> String {
    let by_id: HashMap<u32, &AccessibilityNode> = nodes.iter().map(|n| (n.node_id, n)).collect();
    let mut out = String::new();
    let mut seen = HashSet::new();

    let roots = nodes
        .iter()
        .filter(|node| node.parent_id.is_none_or(|parent| !by_id.contains_key(&parent)));

    for root in roots {
        let mut stack = vec![(root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            if !seen.insert(node.node_id) {
                continue;
            }
            render_line(node, depth, &mut out);
            for child in node.child_ids.iter().rev() {
                if let Some(child) = by_id.get(child) {
                    stack.push((child, depth + 1));
                }
            }
        }
    }

    out.trim_end().to_string()
}

/// Filter then format
pub fn filter_and_format(nodes: &[AccessibilityNode]) -> String {
    format_tree(&filter_nodes(nodes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_page() -> Vec<AccessibilityNode> {
        vec![
            AccessibilityNode::new(1, "RootWebArea").with_name("Jobs").with_children(vec![2, 6]),
            AccessibilityNode::new(2, "generic").with_parent(1).with_children(vec![3, 4, 5]),
            AccessibilityNode::new(3, "combobox")
                .with_name("Search by title, skill, or company")
                .with_property("focusable", true)
                .with_property("expanded", false)
                .with_parent(2),
            AccessibilityNode::new(4, "StaticText")
                .with_name("Search by title, skill, or company")
                .with_parent(2),
            AccessibilityNode::new(5, "button").with_name("Search").with_parent(2),
            AccessibilityNode::new(6, "group").with_parent(1).with_children(vec![7]),
            AccessibilityNode::new(7, "paragraph").with_name("ok").with_parent(6),
        ]
    }

    #[test]
    fn test_noise_and_static_text_dropped() {
        let filtered = filter_nodes(&search_page());
        let ids: Vec<u32> = filtered.iter().map(|n| n.node_id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn test_edges_to_dropped_nodes_removed() {
        let filtered = filter_nodes(&search_page());
        let root = filtered.iter().find(|n| n.node_id == 1).unwrap();
        assert!(root.child_ids.is_empty());
        let combobox = filtered.iter().find(|n| n.node_id == 3).unwrap();
        assert_eq!(combobox.parent_id, None);
    }

    #[test]
    fn test_container_kept_through_descendants() {
        let nodes = vec![
            AccessibilityNode::new(1, "group").with_children(vec![2]),
            AccessibilityNode::new(2, "section").with_parent(1).with_children(vec![3]),
            AccessibilityNode::new(3, "link").with_name("Apply").with_parent(2),
            AccessibilityNode::new(4, "group").with_children(vec![5]),
            AccessibilityNode::new(5, "StaticText").with_name("long enough").with_parent(4),
        ];
        let filtered = filter_nodes(&nodes);
        let ids: Vec<u32> = filtered.iter().map(|n| n.node_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_short_text_without_flags_dropped() {
        let nodes = vec![
            AccessibilityNode::new(1, "paragraph").with_name("Hi"),
            AccessibilityNode::new(2, "paragraph").with_name("Hiring"),
            AccessibilityNode::new(3, "image").with_property("clickable", true),
        ];
        let ids: Vec<u32> = filter_nodes(&nodes).iter().map(|n| n.node_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let once = filter_nodes(&search_page());
        let twice = filter_nodes(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_format_tree() {
        let nodes = vec![
            AccessibilityNode::new(1, "RootWebArea").with_name("Jobs").with_children(vec![2, 4]),
            AccessibilityNode::new(2, "form").with_parent(1).with_children(vec![3]),
            AccessibilityNode::new(3, "textbox")
                .with_name("Keywords")
                .with_value("  rust\n engineer ")
                .with_property("required", true)
                .with_property("focusable", true)
                .with_parent(2),
            AccessibilityNode::new(4, "button")
                .with_name("Search")
                .with_property("disabled", false)
                .with_parent(1),
        ];

        let rendered = format_tree(&nodes);
        assert_eq!(
            rendered,
            "[1] RootWebArea: Jobs\n  [2] form\n    [3] textbox: rust engineer (required=true)\n  \
             [4] button: Search (disabled=false)"
        );
    }

    #[test]
    fn test_filter_and_format_uses_sequential_ids() {
        let nodes = vec![
            AccessibilityNode::new(1, "RootWebArea").with_backend_id(900).with_children(vec![2]),
            AccessibilityNode::new(2, "link")
                .with_name("Careers")
                .with_backend_id(901)
                .with_parent(1),
        ];
        let rendered = filter_and_format(&nodes);
        assert!(rendered.contains("[2] link: Careers"));
        assert!(!rendered.contains("901"));
    }
}
