//! Accessibility snapshots and their model-facing rendering
//!
//! This module turns a live page into something the model can reason over:
//! - AccessibilityNode: flattened accessibility tree with per-snapshot ids
//! - build_xpath_map: positional XPaths for every DOM node
//! - SelectorMap: backend node id → selectors for acting on a node
//! - filter_and_format: pruning and text rendering of the tree
//! - SnapshotBuilder: captures all of the above from a page

pub mod ax;
pub mod filter;
pub mod fixtures;
pub mod selector_map;
pub mod snapshot;
pub mod xpath;

pub use ax::{parse_ax_tree, AccessibilityNode};
pub use filter::{filter_and_format, filter_nodes, format_tree};
pub use fixtures::{SnapshotRecord, SnapshotRecorder, CAPTURE_ENV, FIXTURE_PATH};
pub use selector_map::{ElementMapping, SelectorMap};
pub use snapshot::{Snapshot, SnapshotBuilder};
pub use xpath::build_xpath_map;
