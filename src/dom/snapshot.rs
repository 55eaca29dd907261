//! Accessibility snapshots of a live page.
//!
//! A [`Snapshot`] pairs the filtered accessibility tree the model sees with
//! the selector mappings needed to act on what the model picks. Sequential
//! node ids are only meaningful inside the snapshot that produced them, so
//! every new snapshot replaces the previous one wholesale.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{Mutex, MutexGuard};

use crate::browser::{AutomationConfig, CdpSession, PageDriver};
use crate::dom::ax::{parse_ax_tree, AccessibilityNode};
use crate::dom::filter::{filter_nodes, format_tree};
use crate::dom::fixtures::SnapshotRecorder;
use crate::dom::selector_map::{ElementMapping, SelectorMap};
use crate::dom::xpath::build_xpath_map;
use crate::error::{BrowserError, Result};
use crate::utils::truncate_chars;

/// Protocol domains enabled once per session
const ENABLED_DOMAINS: &[&str] = &["DOM", "Accessibility", "Runtime", "Network"];

const ELEMENT_TEXT_CHARS: usize = 100;

/// Runs with `this` bound to the node; text nodes describe their parent
const ELEMENT_INFO_FUNCTION: &str = r#"function() {
    const el = this.nodeType === Node.ELEMENT_NODE ? this : this.parentElement;
    if (!el) {
        return null;
    }
    const attributes = {};
    for (const attr of Array.from(el.attributes || [])) {
        attributes[attr.name] = attr.value;
    }
    const parts = [];
    for (let n = el; n && n.nodeType === Node.ELEMENT_NODE; n = n.parentElement) {
        let index = 1;
        for (let s = n.previousElementSibling; s; s = s.previousElementSibling) {
            if (s.nodeName === n.nodeName) {
                index++;
            }
        }
        parts.unshift(n.nodeName.toLowerCase() + '[' + index + ']');
    }
    const xpath = '/' + parts.join('/');
    const quote = (v) => JSON.stringify(String(v));
    let cssSelector = xpath;
    if (el.id) {
        cssSelector = '#' + CSS.escape(el.id);
    } else if (el.getAttribute('aria-label')) {
        cssSelector = '[aria-label=' + quote(el.getAttribute('aria-label')) + ']';
    } else if (el.getAttribute('name')) {
        cssSelector = '[name=' + quote(el.getAttribute('name')) + ']';
    } else if (el.getAttribute('placeholder')) {
        cssSelector = '[placeholder=' + quote(el.getAttribute('placeholder')) + ']';
    }
    return {
        tagName: el.tagName.toLowerCase(),
        attributes,
        xpath,
        cssSelector,
        text: (el.textContent || '').trim(),
        visible: el.offsetParent !== null
    };
}"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ElementInfo {
    tag_name: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
    xpath: String,
    css_selector: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    visible: bool,
}

/// One capture of the page's accessibility tree
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Page URL at capture time, when it could be read
    pub url: Option<String>,

    /// The rendered tree handed to the model
    pub formatted_tree: String,

    /// Nodes that survived filtering
    pub nodes: Vec<AccessibilityNode>,

    /// Backend node id → element mapping
    pub mappings: SelectorMap,

    backend_by_node: HashMap<u32, i64>,
}

impl Snapshot {
    /// Filter `nodes`, render them, and index the survivors' backend ids
    pub fn from_parts(
        url: Option<String>,
        nodes: &[AccessibilityNode],
        mappings: SelectorMap,
    ) -> Self {
        let nodes = filter_nodes(nodes);
        let formatted_tree = format_tree(&nodes);
        let backend_by_node = nodes
            .iter()
            .filter_map(|node| node.backend_node_id.map(|backend| (node.node_id, backend)))
            .collect();

        Self {
            url,
            formatted_tree,
            nodes,
            mappings,
            backend_by_node,
        }
    }

    /// Backend id behind a sequential node id of this snapshot
    pub fn backend_id(&self, node_id: u32) -> Option<i64> {
        self.backend_by_node.get(&node_id).copied()
    }

    pub fn mapping_for(&self, node_id: u32) -> Option<&ElementMapping> {
        self.backend_id(node_id).and_then(|backend| self.mappings.get(backend))
    }

    /// A few of the node ids this snapshot can resolve, for diagnostics
    pub fn sample_node_ids(&self, limit: usize) -> Vec<u32> {
        let mut ids: Vec<u32> = self.backend_by_node.keys().copied().collect();
        ids.sort_unstable();
        ids.truncate(limit);
        ids
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Captures snapshots of one page over a lazily opened protocol session.
///
/// The session is opened on first use and kept until [`cleanup`]
/// is called. Only the most recent snapshot is kept.
///
/// [`cleanup`]: SnapshotBuilder::cleanup
pub struct SnapshotBuilder {
    page: Arc<dyn PageDriver>,
    config: AutomationConfig,
    session: Mutex<Option<Box<dyn CdpSession>>>,
    current: RwLock<Option<Arc<Snapshot>>>,
    recorder: Option<Arc<SnapshotRecorder>>,
}

impl SnapshotBuilder {
    /// Create a builder; fixture capture follows the environment
    pub fn new(page: Arc<dyn PageDriver>, config: AutomationConfig) -> Self {
        Self {
            page,
            config,
            session: Mutex::new(None),
            current: RwLock::new(None),
            recorder: SnapshotRecorder::from_env().map(Arc::new),
        }
    }

    /// Builder method: record every snapshot into `recorder`
    pub fn with_recorder(mut self, recorder: Arc<SnapshotRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn page(&self) -> &Arc<dyn PageDriver> {
        &self.page
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    pub fn recorder(&self) -> Option<&Arc<SnapshotRecorder>> {
        self.recorder.as_ref()
    }

    async fn session(&self) -> Result<MutexGuard<'_, Option<Box<dyn CdpSession>>>> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            let session = self.page.new_cdp_session().await?;
            for domain in ENABLED_DOMAINS {
                session.send(&format!("{}.enable", domain), json!({})).await?;
            }
            log::debug!("Opened CDP session with {} domains enabled", ENABLED_DOMAINS.len());
            *guard = Some(session);
        }
        Ok(guard)
    }

    /// Wait for network activity to stay quiet for the configured window,
    /// giving up after `timeout`. Returns whether the page settled.
    pub async fn wait_for_settle(&self, timeout: Duration) -> Result<bool> {
        let monitor = {
            let guard = self.session().await?;
            let session = guard
                .as_deref()
                .ok_or_else(|| BrowserError::Cdp("CDP session unavailable".to_string()))?;
            session.network()
        };

        let settled = monitor.wait_for_quiet(self.config.quiet_window, timeout).await;
        if !settled {
            log::debug!(
                "Page did not settle within {:?} ({} requests in flight); continuing",
                timeout,
                monitor.in_flight()
            );
        }
        Ok(settled)
    }

    /// Settle, then build a fresh snapshot
    pub async fn capture(&self) -> Result<Arc<Snapshot>> {
        self.wait_for_settle(self.config.settle_timeout).await?;
        self.build().await
    }

    /// Build a fresh snapshot and make it current
    pub async fn build(&self) -> Result<Arc<Snapshot>> {
        self.invalidate();

        let guard = self.session().await?;
        let session = guard
            .as_deref()
            .ok_or_else(|| BrowserError::Cdp("CDP session unavailable".to_string()))?;

        let document = session
            .send("DOM.getDocument", json!({ "depth": -1, "pierce": true }))
            .await?;
        let xpaths = build_xpath_map(&document)?;

        let ax_tree = session.send("Accessibility.getFullAXTree", json!({})).await?;
        let nodes = parse_ax_tree(&ax_tree)?;

        let mut mappings = SelectorMap::new();
        let mut failures = 0usize;
        for backend_id in nodes.iter().filter_map(|node| node.backend_node_id) {
            if mappings.contains(backend_id) {
                continue;
            }
            match describe_element(session, backend_id).await {
                Ok(info) => mappings.insert(to_mapping(backend_id, info, &xpaths)),
                Err(e) => {
                    failures += 1;
                    log::debug!("Skipping node {}: {}", backend_id, e);
                }
            }
        }
        drop(guard);

        let url = self.page.url().await.ok();
        let snapshot = Snapshot::from_parts(url, &nodes, mappings);
        log::debug!(
            "Snapshot: {} of {} nodes kept, {} mapped, {} unresolved",
            snapshot.node_count(),
            nodes.len(),
            snapshot.mappings.len(),
            failures
        );

        if let Some(recorder) = &self.recorder {
            let title = self.page.title().await.unwrap_or_default();
            recorder.record(
                snapshot.url.clone().unwrap_or_default(),
                title,
                snapshot.nodes.clone(),
            );
        }

        let snapshot = Arc::new(snapshot);
        match self.current.write() {
            Ok(mut current) => *current = Some(Arc::clone(&snapshot)),
            Err(e) => log::warn!("Snapshot lock poisoned: {}", e),
        }
        Ok(snapshot)
    }

    /// The most recent snapshot, if it has not been invalidated
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.read().ok().and_then(|current| current.clone())
    }

    /// Forget the current snapshot, e.g. after navigating
    pub fn invalidate(&self) {
        if let Ok(mut current) = self.current.write() {
            *current = None;
        }
    }

    /// Detach the protocol session and drop the current snapshot.
    /// Safe to call more than once.
    pub async fn cleanup(&self) -> Result<()> {
        self.invalidate();
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            session.detach().await?;
            log::debug!("Detached CDP session");
        }
        Ok(())
    }
}

async fn describe_element(session: &dyn CdpSession, backend_id: i64) -> Result<ElementInfo> {
    let resolved = session
        .send("DOM.resolveNode", json!({ "backendNodeId": backend_id }))
        .await?;
    let object_id = resolved
        .pointer("/object/objectId")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            BrowserError::ElementNotFound(format!("No remote object for node {}", backend_id))
        })?
        .to_string();

    let result = session
        .send(
            "Runtime.callFunctionOn",
            json!({
                "functionDeclaration": ELEMENT_INFO_FUNCTION,
                "objectId": object_id,
                "returnByValue": true
            }),
        )
        .await;

    if let Err(e) = session
        .send("Runtime.releaseObject", json!({ "objectId": object_id }))
        .await
    {
        log::debug!("Failed to release object {}: {}", object_id, e);
    }

    let result = result?;
    if let Some(details) = result.get("exceptionDetails") {
        return Err(BrowserError::EvaluationFailed(details.to_string()));
    }
    match result.pointer("/result/value") {
        Some(Value::Null) | None => Err(BrowserError::ElementNotFound(format!(
            "Node {} has no element",
            backend_id
        ))),
        Some(value) => Ok(serde_json::from_value(value.clone())?),
    }
}

fn to_mapping(backend_id: i64, info: ElementInfo, xpaths: &HashMap<i64, String>) -> ElementMapping {
    let fallback_css = info.css_selector == info.xpath;
    let xpath = xpaths.get(&backend_id).cloned().unwrap_or(info.xpath);
    let css_selector = if fallback_css { xpath.clone() } else { info.css_selector };

    let mut mapping = ElementMapping::new(backend_id, xpath, info.tag_name)
        .with_css_selector(css_selector)
        .with_attributes(info.attributes)
        .with_visibility(info.visible);
    let text = truncate_chars(&info.text, ELEMENT_TEXT_CHARS);
    if !text.is_empty() {
        mapping = mapping.with_text(text);
    }
    mapping
}
