//! Schema-shaped data extraction from page content

use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::automation::executor::best_candidate;
use crate::automation::resolver::ElementResolver;
use crate::error::{BrowserError, Result};
use crate::llm::prompts::{extract_user_prompt, EXTRACT_SYSTEM_PROMPT};
use crate::llm::{parse_shape, ChatMessage, CompletionRequest};
use crate::utils::truncate_chars;

/// Where to read from and what to produce
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Description of the page region to read; the whole page when `None`
    pub area: Option<String>,
    /// JSON Schema the result should follow
    pub schema: Option<Value>,
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

pub struct DataExtractor {
    resolver: Arc<ElementResolver>,
}

impl DataExtractor {
    pub fn new(resolver: Arc<ElementResolver>) -> Self {
        Self { resolver }
    }

    /// Extract a `T`, with the schema derived from the type.
    /// `None` when anything fails or the result does not fit `T`.
    pub async fn extract<T>(&self, instruction: &str, area: Option<&str>) -> Option<T>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let schema = serde_json::to_value(schemars::schema_for!(T)).ok();
        let options = ExtractOptions {
            area: area.map(str::to_string),
            schema,
        };
        let value = self.extract_json(instruction, options).await?;

        match parse_shape(&value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                log::warn!("Extracted data for '{}' does not fit the schema: {}", instruction, e);
                None
            }
        }
    }

    /// Untyped extraction; `None` on any failure
    pub async fn extract_json(&self, instruction: &str, options: ExtractOptions) -> Option<Value> {
        match self.try_extract_json(instruction, &options).await {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Extraction for '{}' failed: {}", instruction, e);
                None
            }
        }
    }

    pub async fn try_extract_json(
        &self,
        instruction: &str,
        options: &ExtractOptions,
    ) -> Result<Value> {
        let content = self.gather_content(options.area.as_deref()).await?;
        let budget = self.resolver.config().extract_char_budget;
        let content = truncate_chars(&content, budget);
        log::debug!("Extracting '{}' from {} chars of content", instruction, content.len());

        let request = CompletionRequest::new(vec![
            ChatMessage::system(EXTRACT_SYSTEM_PROMPT),
            ChatMessage::user(extract_user_prompt(instruction, content, options.schema.as_ref())),
        ])
        .temperature(self.resolver.config().temperature)
        .json();

        let response = self.resolver.llm().create_completion(request).await?;
        match response.data {
            data @ (Value::Object(_) | Value::Array(_)) => Ok(data),
            other => Err(BrowserError::InvalidResponse(format!(
                "expected a JSON object, got {}",
                truncate_chars(&other.to_string(), 200)
            ))),
        }
    }

    async fn gather_content(&self, area: Option<&str>) -> Result<String> {
        let Some(area) = area else {
            let snapshot = self.resolver.snapshots().capture().await?;
            return Ok(snapshot.formatted_tree.clone());
        };

        match best_candidate(self.resolver.find_elements(area).await) {
            Some(element) => self.resolver.page().element_text(&element.selector).await,
            None => {
                log::debug!("Area '{}' not found; reading the whole page", area);
                self.page_text().await
            }
        }
    }

    /// Whole-page text: Markdown of the HTML, or the body text when that is empty
    async fn page_text(&self) -> Result<String> {
        let page = self.resolver.page();
        match page.content().await {
            Ok(html) => {
                let markdown = html2md::parse_html(&html);
                if !markdown.trim().is_empty() {
                    return Ok(markdown);
                }
            }
            Err(e) => log::debug!("Failed to read page HTML: {}", e),
        }
        page.text_content().await
    }
}
