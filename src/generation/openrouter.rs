//! OpenAI-compatible chat completions client (OpenRouter by default).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::provider::{ChatMessage, ChatRequest, LlmProvider};
use super::GenerationError;
use crate::config::GenerationConfig;

#[derive(Debug, Clone)]
pub struct OpenRouterProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenRouterProvider {
    pub fn new(cfg: &GenerationConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(cfg.timeout())
            .build()?;
        Ok(Self {
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

fn message_json(m: &ChatMessage) -> Value {
    match &m.image_url {
        None => json!({ "role": m.role.as_str(), "content": m.content }),
        Some(url) => json!({
            "role": m.role.as_str(),
            "content": [
                { "type": "text", "text": m.content },
                { "type": "image_url", "image_url": { "url": url } }
            ]
        }),
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<String, GenerationError> {
        let body = CompletionRequest {
            model: &request.model,
            messages: request.messages.iter().map(message_json).collect(),
            response_format: request.schema.as_ref().map(|s| {
                json!({
                    "type": "json_schema",
                    "json_schema": { "name": s.name, "strict": true, "schema": s.schema }
                })
            }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(operation = %request.operation, %status, body = %text, "completion request rejected");
            let reason = if status == StatusCode::TOO_MANY_REQUESTS {
                "rate limited".to_string()
            } else {
                format!("status {}", status)
            };
            return Err(GenerationError::Unavailable(reason));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::Format(format!("completion envelope: {}", e))
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::Format("no content in completion".into()))?;

        debug!(operation = %request.operation, model = %request.model, len = content.len(), "completion received");
        Ok(content)
    }

    fn provider_name(&self) -> &'static str {
        "openrouter"
    }
}

#[cfg(test)]
mod openrouter_tests {
    use super::*;

    #[test]
    fn image_messages_use_content_parts() {
        let v = message_json(&ChatMessage::user_with_image("what is this", "https://x/y.jpg"));
        assert_eq!(v["role"], "user");
        assert_eq!(v["content"][0]["type"], "text");
        assert_eq!(v["content"][1]["image_url"]["url"], "https://x/y.jpg");

        let v = message_json(&ChatMessage::system("be brief"));
        assert_eq!(v["content"], "be brief");
    }
}
