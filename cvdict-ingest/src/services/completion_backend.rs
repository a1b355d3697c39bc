//! Generative completion backend
//!
//! [`CompletionBackend`] is the seam between the enrichment client and the
//! network. [`DeepSeekBackend`] speaks the OpenAI-compatible
//! `chat/completions` protocol used by DeepSeek; tests substitute scripted
//! backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::enrichment_client::EnrichError;
use crate::config::EnrichmentSettings;

/// One non-streaming completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Role-primed system instruction
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send one request and return the raw completion text
    async fn complete(&self, request: &CompletionRequest) -> Result<String, EnrichError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

/// DeepSeek chat-completions client
pub struct DeepSeekBackend {
    http_client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl DeepSeekBackend {
    pub fn new(settings: &EnrichmentSettings) -> Result<Self, EnrichError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| EnrichError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: settings.api_url.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait]
impl CompletionBackend for DeepSeekBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, EnrichError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| EnrichError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::Api(status.as_u16(), body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| EnrichError::Network(format!("Unreadable response body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(EnrichError::EmptyResponse)
    }
}
