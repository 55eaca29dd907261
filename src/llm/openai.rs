//! OpenAI-compatible `/chat/completions` client over `reqwest`

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::json::parse_json_content;
use crate::llm::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmClient, LlmConfig, LlmError,
    ResponseFormat, Usage,
};
use crate::utils::truncate_chars;

const ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ApiResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ApiResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiClient {
    http: Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Client configured from `OPENAI_*` environment variables
    pub fn from_env() -> Result<Self, LlmError> {
        Self::new(LlmConfig::from_env()?)
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

fn request_body<'a>(model: &'a str, request: &'a CompletionRequest) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: &request.messages,
        temperature: request.temperature,
        response_format: match request.response_format {
            ResponseFormat::Json => Some(ApiResponseFormat {
                format_type: "json_object",
            }),
            ResponseFormat::Text => None,
        },
    }
}

fn parse_response(raw: &str, format: ResponseFormat) -> Result<CompletionResponse, LlmError> {
    let response: ChatResponse = serde_json::from_str(raw).map_err(|e| {
        LlmError::Shape(format!(
            "{}; body: {}",
            e,
            truncate_chars(raw, ERROR_BODY_CHARS)
        ))
    })?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(LlmError::EmptyContent)?;

    let data = match format {
        ResponseFormat::Json => parse_json_content(&content)?,
        ResponseFormat::Text => Value::String(content),
    };

    Ok(CompletionResponse {
        data,
        usage: response.usage.unwrap_or_default(),
    })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn create_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let url = self.endpoint();
        log::debug!(
            "Calling {} with model {} ({} messages)",
            url,
            self.config.model,
            request.messages.len()
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body(&self.config.model, &request))
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            log::error!("LLM API error {}: {}", status, truncate_chars(&raw, ERROR_BODY_CHARS));
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: raw,
            });
        }

        let completion = parse_response(&raw, request.response_format)?;
        log::debug!(
            "LLM usage: {} prompt + {} completion tokens",
            completion.usage.prompt_tokens,
            completion.usage.completion_tokens
        );
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_json_format() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let request = CompletionRequest::new(messages)
            .temperature(0.1)
            .json();
        let body = serde_json::to_value(request_body("gpt-4o-mini", &request)).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_request_body_text_format_omits_optional_fields() {
        let request = CompletionRequest::new(vec![ChatMessage::user("hi")]);
        let body = serde_json::to_value(request_body("m", &request)).unwrap();
        assert!(body.get("response_format").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_parse_json_response() {
        let raw = json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"elements\": []}" } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
        })
        .to_string();

        let response = parse_response(&raw, ResponseFormat::Json).unwrap();
        assert_eq!(response.data, json!({ "elements": [] }));
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[test]
    fn test_parse_text_response() {
        let raw = json!({ "choices": [{ "message": { "content": "hello" } }] }).to_string();
        let response = parse_response(&raw, ResponseFormat::Text).unwrap();
        assert_eq!(response.data, json!("hello"));
        assert_eq!(response.usage, Usage::default());
    }

    #[test]
    fn test_parse_response_errors() {
        let empty = json!({ "choices": [{ "message": { "content": "  " } }] }).to_string();
        assert!(matches!(
            parse_response(&empty, ResponseFormat::Json),
            Err(LlmError::EmptyContent)
        ));

        let no_choices = json!({ "choices": [] }).to_string();
        assert!(matches!(
            parse_response(&no_choices, ResponseFormat::Text),
            Err(LlmError::EmptyContent)
        ));

        let bad_json = json!({ "choices": [{ "message": { "content": "{oops" } }] }).to_string();
        assert!(matches!(
            parse_response(&bad_json, ResponseFormat::Json),
            Err(LlmError::InvalidJson(_))
        ));

        assert!(matches!(
            parse_response("<html>", ResponseFormat::Text),
            Err(LlmError::Shape(_))
        ));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = LlmConfig::new("sk").base_url("http://localhost:1234/v1/");
        let client = OpenAiClient::new(config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:1234/v1/chat/completions");
    }
}
