//! Model-driven page automation
//!
//! [`PageAutomation`] bundles the resolver, executor, and extractor for
//! one page around a single shared [`SnapshotBuilder`], so they all see
//! the same snapshot and protocol session.

pub mod executor;
pub mod extractor;
pub mod resolver;

use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::browser::{AutomationConfig, PageDriver};
use crate::dom::SnapshotBuilder;
use crate::error::Result;
use crate::llm::LlmClient;

pub use executor::{best_candidate, ActionExecutor, ActionPlan, SingleAction};
pub use extractor::{DataExtractor, ExtractOptions};
pub use resolver::{ElementResolver, FoundElement};

pub struct PageAutomation {
    resolver: Arc<ElementResolver>,
    executor: ActionExecutor,
    extractor: DataExtractor,
}

impl PageAutomation {
    pub fn new(
        page: Arc<dyn PageDriver>,
        llm: Arc<dyn LlmClient>,
        config: AutomationConfig,
    ) -> Self {
        Self::with_snapshots(Arc::new(SnapshotBuilder::new(page, config)), llm)
    }

    pub fn with_snapshots(snapshots: Arc<SnapshotBuilder>, llm: Arc<dyn LlmClient>) -> Self {
        let resolver = Arc::new(ElementResolver::new(snapshots, llm));
        Self {
            executor: ActionExecutor::new(Arc::clone(&resolver)),
            extractor: DataExtractor::new(Arc::clone(&resolver)),
            resolver,
        }
    }

    pub fn page(&self) -> &Arc<dyn PageDriver> {
        self.resolver.page()
    }

    pub fn config(&self) -> &AutomationConfig {
        self.resolver.config()
    }

    pub fn snapshots(&self) -> &Arc<SnapshotBuilder> {
        self.resolver.snapshots()
    }

    pub fn resolver(&self) -> &ElementResolver {
        &self.resolver
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    pub fn extractor(&self) -> &DataExtractor {
        &self.extractor
    }

    pub async fn find_elements(&self, instruction: &str) -> Vec<FoundElement> {
        self.resolver.find_elements(instruction).await
    }

    pub async fn act(&self, instruction: &str) -> bool {
        self.executor.act(instruction).await
    }

    pub async fn extract<T>(&self, instruction: &str, area: Option<&str>) -> Option<T>
    where
        T: DeserializeOwned + JsonSchema,
    {
        self.extractor.extract(instruction, area).await
    }

    pub async fn extract_json(&self, instruction: &str, options: ExtractOptions) -> Option<Value> {
        self.extractor.extract_json(instruction, options).await
    }

    /// Navigate and wait for the load; the old snapshot is dropped
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.snapshots().invalidate();
        let page = self.page();
        page.goto(url).await?;
        page.wait_for_load().await
    }

    /// Release the protocol session; call on every exit path
    pub async fn cleanup(&self) -> Result<()> {
        self.snapshots().cleanup().await
    }
}
