//! OpenAI-compatible completion service.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any
//! other endpoint exposing `/v1/chat/completions`. Non-streaming text
//! completion only; the loop's decisions are prompt-level JSON, so no
//! tool-calling surface is needed.

use async_trait::async_trait;
use onager_core::error::CompletionError;
use onager_core::{CompletionRequest, CompletionService, Message, Role};
use serde::Deserialize;
use tracing::{debug, warn};

/// A completion service backed by an OpenAI-compatible HTTP endpoint.
pub struct OpenAiCompatService {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    default_max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAiCompatService {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            default_max_tokens: None,
            client,
        }
    }

    /// Cap the completion length for requests that don't set their own.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = Some(max_tokens);
        self
    }

    /// Create an OpenRouter service (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key, model)
    }

    /// Create an OpenAI service (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, model)
    }

    /// Create an Ollama service (convenience constructor).
    pub fn ollama(base_url: Option<&str>, model: impl Into<String>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
            model,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Map a non-200 status to the matching completion error.
    fn error_for_status(&self, status: u16, body: String) -> CompletionError {
        match status {
            429 => CompletionError::RateLimited { retry_after_secs: 5 },
            401 | 403 => CompletionError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            404 => CompletionError::ModelNotFound(self.model.clone()),
            _ => CompletionError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }

    /// Convert our messages to the OpenAI wire format.
    fn to_api_messages(messages: &[Message]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                        Role::System => "system",
                    },
                    "content": m.content,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionService for OpenAiCompatService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });
        if let Some(max_tokens) = request.max_tokens.or(self.default_max_tokens) {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(service = %self.name, model = %self.model, "sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(e.to_string())
                } else {
                    CompletionError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "completion endpoint returned error");
            return Err(self.error_for_status(status, error_body));
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| CompletionError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_conversion() {
        let messages = vec![
            Message::system("be brief"),
            Message::user("hi"),
            Message::assistant("hello"),
        ];
        let api = OpenAiCompatService::to_api_messages(&messages);
        assert_eq!(api[0]["role"], "system");
        assert_eq!(api[1]["role"], "user");
        assert_eq!(api[2]["role"], "assistant");
        assert_eq!(api[1]["content"], "hi");
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let service = OpenAiCompatService::new("test", "http://localhost:8000/v1/", "k", "m");
        assert_eq!(service.base_url, "http://localhost:8000/v1");
    }

    #[test]
    fn convenience_constructors() {
        let service = OpenAiCompatService::openrouter("key", "anthropic/claude-sonnet-4");
        assert_eq!(service.name(), "openrouter");
        assert_eq!(service.model(), "anthropic/claude-sonnet-4");

        let service = OpenAiCompatService::ollama(None, "qwen2.5:7b");
        assert_eq!(service.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn default_max_tokens_is_opt_in() {
        let service = OpenAiCompatService::openai("k", "gpt-4o");
        assert_eq!(service.default_max_tokens, None);
        let service = service.with_max_tokens(2048);
        assert_eq!(service.default_max_tokens, Some(2048));
    }

    #[test]
    fn status_codes_map_to_errors() {
        let service = OpenAiCompatService::openrouter("key", "anthropic/claude-sonnet-4");

        assert!(matches!(
            service.error_for_status(429, String::new()),
            CompletionError::RateLimited { retry_after_secs: 5 }
        ));
        assert!(matches!(
            service.error_for_status(401, String::new()),
            CompletionError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            service.error_for_status(404, String::new()),
            CompletionError::ModelNotFound(model) if model == "anthropic/claude-sonnet-4"
        ));
        assert!(matches!(
            service.error_for_status(500, "internal".into()),
            CompletionError::ApiError { status_code: 500, message } if message == "internal"
        ));
    }

    #[test]
    fn response_parsing() {
        let json = r#"{"choices": [{"message": {"content": "hello there"}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hello there"));
    }
}
