use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::{OpenAiConfig, ProviderError};

/// A text-completion model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logs
    fn name(&self) -> &str;

    /// Complete `prompt`, returning the raw completion text
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Chat-completions client for OpenAI-compatible endpoints.
/// Runs at temperature 0 so query construction is as stable as the model allows.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    config: OpenAiConfig,
    client: Client,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChatModel {
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let client = config.client()?;
        Ok(Self {
            config,
            client,
            temperature: 0.0,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(self.config.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Chat completion failed with status {}: {}", status, body);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no completion choices".to_string()))?;

        debug!(
            "Chat completion from {} in {:?} ({} chars)",
            self.config.model,
            start.elapsed(),
            content.len()
        );
        Ok(content)
    }
}
