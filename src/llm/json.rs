//! Validating parses for model output.
//!
//! Asking for a JSON response format is not a guarantee; every value the
//! model returns goes through one of these before it is trusted.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::llm::LlmError;

/// Parse a model's message content as a JSON value.
/// Tolerates a surrounding Markdown code fence.
pub fn parse_json_content(content: &str) -> Result<Value, LlmError> {
    let trimmed = strip_code_fence(content.trim());
    if trimmed.is_empty() {
        return Err(LlmError::EmptyContent);
    }
    serde_json::from_str(trimmed).map_err(|e| LlmError::InvalidJson(e.to_string()))
}

/// Deserialize `value` into `T`, rejecting anything that does not fit.
/// A JSON document wrapped in a string is unwrapped first.
pub fn parse_shape<T: DeserializeOwned>(value: &Value) -> Result<T, LlmError> {
    let value = match value {
        Value::String(content) => parse_json_content(content)?,
        other => other.clone(),
    };
    serde_json::from_value(value).map_err(|e| LlmError::Shape(e.to_string()))
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
