//! Language-model boundary for Encore
//!
//! Provides a `LanguageModel` trait with a chat-completions implementation:
//! - **ChatClient** — OpenAI-style `/chat/completions` endpoint, single
//!   string result, fixed low temperature for determinism
//!
//! The pipeline never retries a model call; a failed call is a recoverable
//! outcome handled by the calling stage.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default request timeout for the model boundary.
const REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// LanguageModel trait
// ============================================================================

/// Abstraction over completion providers.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion: a system instruction, the user content, and a
    /// response-length budget. Returns the model's text reply.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

/// Model boundary errors. All of them are recoverable from the pipeline's
/// point of view.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Missing API key")]
    MissingApiKey,

    #[error("Response contained no completion content")]
    MissingContent,
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone)]
pub struct ChatClientConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
}

impl ChatClientConfig {
    pub fn new(api_key: Option<String>, model: String, temperature: f32) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("LLM_API_KEY").ok())
            .unwrap_or_default();

        Self {
            api_key,
            model,
            temperature,
        }
    }
}

// ============================================================================
// Chat-completions API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// ChatClient
// ============================================================================

/// Chat-completions client — calls an OpenAI-style completion endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    config: ChatClientConfig,
    base_url: String,
}

impl ChatClient {
    pub fn new(config: ChatClientConfig) -> Result<Self, LlmError> {
        Self::with_base_url(config, "https://api.openai.com/v1".to_string())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(config: ChatClientConfig, base_url: String) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    async fn complete_once(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
            max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Completion API error");

            return Err(LlmError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::MissingContent)
    }
}

#[async_trait]
impl LanguageModel for ChatClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.complete_once(system, user, max_tokens).await
    }

    fn name(&self) -> &str {
        "chat-completions"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_key: &str) -> ChatClientConfig {
        ChatClientConfig {
            api_key: api_key.to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.1,
        }
    }

    fn mock_completion_response(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": content } }
            ]
        })
    }

    #[tokio::test]
    async fn test_complete_posts_messages_and_returns_content() {
        let mock_server = MockServer::start().await;
        let client = ChatClient::with_base_url(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-api-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 100,
                "messages": [
                    { "role": "system", "content": "You are a music event assistant." },
                    { "role": "user", "content": "Find concerts" }
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(mock_completion_response("{\"keyword\": \"jazz\"}")),
            )
            .mount(&mock_server)
            .await;

        let result = client
            .complete("You are a music event assistant.", "Find concerts", 100)
            .await;

        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result.err());
        assert_eq!(result.unwrap(), "{\"keyword\": \"jazz\"}");
    }

    #[tokio::test]
    async fn test_complete_returns_api_error_on_500() {
        let mock_server = MockServer::start().await;
        let client = ChatClient::with_base_url(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": { "message": "Internal server error" }
            })))
            .mount(&mock_server)
            .await;

        let result = client.complete("system", "user", 100).await;

        match result {
            Err(LlmError::Api { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "Internal server error");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_fails_with_missing_api_key() {
        let config = test_config("");
        let result = ChatClient::with_base_url(config, "http://localhost".to_string());

        match result {
            Err(LlmError::MissingApiKey) => {}
            _ => panic!("Expected MissingApiKey error"),
        }
    }

    #[tokio::test]
    async fn test_complete_returns_missing_content_on_empty_choices() {
        let mock_server = MockServer::start().await;
        let client = ChatClient::with_base_url(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&mock_server)
            .await;

        let result = client.complete("system", "user", 100).await;

        match result {
            Err(LlmError::MissingContent) => {}
            other => panic!("Expected MissingContent, got {:?}", other),
        }
    }
}
