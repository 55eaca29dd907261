//! Natural-language element lookup over an accessibility snapshot

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::browser::{xpath_selector, AutomationConfig, PageDriver};
use crate::dom::{Snapshot, SnapshotBuilder};
use crate::error::Result;
use crate::llm::prompts::{resolver_user_prompt, RESOLVER_SYSTEM_PROMPT};
use crate::llm::{parse_shape, ChatMessage, CompletionRequest, LlmClient};

const ID_SAMPLE_SIZE: usize = 20;

/// An element the model picked, mapped back to the live page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoundElement {
    /// XPath in the engine's selector syntax (`xpath=...`)
    pub selector: String,
    pub xpath: String,
    pub description: String,
    /// In `[0, 1]`
    pub confidence: f64,
    pub backend_node_id: i64,
    /// Element text captured with the snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResolverReply {
    #[serde(default)]
    elements: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElement {
    #[serde(default)]
    node_id: Value,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Accept ids as numbers or strings, with or without the `[..]` the tree uses
fn coerce_node_id(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim()
            .parse()
            .ok(),
        _ => None,
    }
}

fn normalize_confidence(confidence: Option<f64>, default: f64) -> f64 {
    match confidence {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => default,
    }
}

/// Map model-returned elements onto `snapshot`. Ids the snapshot cannot
/// resolve are dropped, never guessed.
fn resolve_elements(
    snapshot: &Snapshot,
    elements: Vec<RawElement>,
    default_confidence: f64,
) -> Vec<FoundElement> {
    let mut found = Vec::with_capacity(elements.len());

    for element in elements {
        let Some(node_id) = coerce_node_id(&element.node_id) else {
            log::warn!("Model returned an unusable nodeId: {}", element.node_id);
            continue;
        };
        let Some(mapping) = snapshot.mapping_for(node_id) else {
            log::warn!(
                "No element mapping for node {} (backend id {:?}); available ids include {:?}",
                node_id,
                snapshot.backend_id(node_id),
                snapshot.sample_node_ids(ID_SAMPLE_SIZE)
            );
            continue;
        };

        found.push(FoundElement {
            selector: xpath_selector(&mapping.xpath),
            xpath: mapping.xpath.clone(),
            description: element.description.unwrap_or_default(),
            confidence: normalize_confidence(element.confidence, default_confidence),
            backend_node_id: mapping.backend_node_id,
            text: mapping.text.clone(),
        });
    }

    found
}

/// Finds page elements from a description by asking the model to pick
/// nodes out of a fresh snapshot.
pub struct ElementResolver {
    snapshots: Arc<SnapshotBuilder>,
    llm: Arc<dyn LlmClient>,
}

impl ElementResolver {
    pub fn new(snapshots: Arc<SnapshotBuilder>, llm: Arc<dyn LlmClient>) -> Self {
        Self { snapshots, llm }
    }

    pub fn snapshots(&self) -> &Arc<SnapshotBuilder> {
        &self.snapshots
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    pub fn page(&self) -> &Arc<dyn PageDriver> {
        self.snapshots.page()
    }

    pub fn config(&self) -> &AutomationConfig {
        self.snapshots.config()
    }

    /// Like [`find_elements`](Self::find_elements) but reports failures
    /// instead of folding them into an empty result.
    pub async fn try_find_elements(&self, instruction: &str) -> Result<Vec<FoundElement>> {
        let snapshot = self.snapshots.capture().await?;
        if snapshot.formatted_tree.is_empty() {
            log::debug!("Empty accessibility tree; nothing to match '{}' against", instruction);
            return Ok(Vec::new());
        }

        let request = CompletionRequest::new(vec![
            ChatMessage::system(RESOLVER_SYSTEM_PROMPT),
            ChatMessage::user(resolver_user_prompt(instruction, &snapshot.formatted_tree)),
        ])
        .temperature(self.config().temperature)
        .json();

        let response = self.llm.create_completion(request).await?;
        let reply: ResolverReply = parse_shape(&response.data)?;

        let found = resolve_elements(&snapshot, reply.elements, self.config().default_confidence);
        log::debug!("'{}' matched {} element(s)", instruction, found.len());
        Ok(found)
    }

    /// Elements matching `instruction`, or an empty list when nothing
    /// matched or anything went wrong along the way.
    pub async fn find_elements(&self, instruction: &str) -> Vec<FoundElement> {
        match self.try_find_elements(instruction).await {
            Ok(found) => found,
            Err(e) => {
                log::warn!("Element lookup for '{}' failed: {}", instruction, e);
                Vec::new()
            }
        }
    }
}
