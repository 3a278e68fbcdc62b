//! Chat completion backends shared by every language-model stage of the pipeline.
//!
//! Each stage sends a system instruction plus user content and receives plain text. Clients issue
//! HTTP requests directly to the provider (Ollama `/api/chat` or an OpenAI-compatible
//! `/chat/completions`). An empty completion is returned as an empty string; callers decide what
//! "no content" means for them.

use crate::config::{CompletionProvider, Config};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Provider was unreachable or the endpoint does not exist.
    #[error("Completion provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by chat completion providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for `user_content` under `system_instruction`.
    async fn complete(
        &self,
        system_instruction: &str,
        user_content: &str,
    ) -> Result<String, CompletionError>;
}

/// Build a completion client based on configuration.
pub fn build_completion_client(config: &Config, http: Client) -> Arc<dyn CompletionClient> {
    match config.completion_provider {
        CompletionProvider::Ollama => Arc::new(OllamaCompletionClient::new(
            http,
            config.ollama_base_url(),
            config.completion_model.clone(),
        )),
        CompletionProvider::OpenAI => Arc::new(OpenAiCompletionClient::new(
            http,
            config.openai_base_url(),
            config.openai_api_key.clone().unwrap_or_default(),
            config.completion_model.clone(),
        )),
    }
}

/// Completion client for a local Ollama runtime.
pub struct OllamaCompletionClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaCompletionClient {
    /// Construct a client targeting the given Ollama runtime.
    pub fn new(http: Client, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<ChatMessage>,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for OllamaCompletionClient {
    async fn complete(
        &self,
        system_instruction: &str,
        user_content: &str,
    ) -> Result<String, CompletionError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_instruction },
                { "role": "user", "content": user_content }
            ],
            "stream": false,
            "options": {
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                CompletionError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CompletionError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaChatResponse = response.json().await.map_err(|error| {
            CompletionError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(CompletionError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body
            .message
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default())
    }
}

/// Completion client for OpenAI-compatible chat APIs.
pub struct OpenAiCompletionClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompletionClient {
    /// Construct a client targeting an OpenAI-compatible API.
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: ChatMessage,
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(
        &self,
        system_instruction: &str,
        user_content: &str,
    ) -> Result<String, CompletionError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_instruction },
                { "role": "user", "content": user_content }
            ],
            "stream": false,
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                CompletionError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "OpenAI completion request failed");
            return Err(CompletionError::GenerationFailed(format!(
                "OpenAI returned {status}: {body}"
            )));
        }

        let body: OpenAiChatResponse = response.json().await.map_err(|error| {
            CompletionError::InvalidResponse(format!("failed to decode OpenAI response: {error}"))
        })?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default())
    }
}
