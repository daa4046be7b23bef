//! OpenAI-style chat completion provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::credentials::OPENAI_API_KEY;
use crate::error::{ProviderError, Result};
use crate::persona::Persona;
use crate::provider::{OnlineProvider, Provenance, ProviderAnswer};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Chat completion provider.
pub struct OpenAiProvider {
    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Model to request.
    model: String,

    /// System instruction sent with every question.
    persona: Persona,

    /// Request timeout.
    timeout: Duration,
}

impl OpenAiProvider {
    /// Create a new provider with default settings.
    pub fn new() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            model: "gpt-3.5-turbo".to_string(),
            persona: Persona::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the persona used as the system message.
    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for OpenAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OnlineProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn credential_key(&self) -> &str {
        OPENAI_API_KEY
    }

    async fn answer(&self, credential: &str, question: &str) -> Result<ProviderAnswer> {
        debug!("Asking chat completion model: {}", self.model);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.persona.prompt() },
                { "role": "user", "content": question }
            ],
            "temperature": 0.2
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(credential)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let content = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: content,
            });
        }

        let result: ChatCompletionResponse = serde_json::from_str(&content)?;
        let text = result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("no message content".to_string()))?;

        info!("Chat completion answered ({} chars)", text.len());

        Ok(ProviderAnswer {
            text,
            provenance: Provenance::new(self.name()).with_model(&self.model),
        })
    }
}

/// Chat completion response; only the fields the router needs.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}
