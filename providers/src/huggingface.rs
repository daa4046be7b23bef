//! Hugging-Face-style text generation provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::credentials::HUGGINGFACE_API_KEY;
use crate::error::{ProviderError, Result};
use crate::persona::Persona;
use crate::provider::{OnlineProvider, Provenance, ProviderAnswer};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Text generation provider for hosted inference endpoints.
pub struct HuggingFaceProvider {
    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Model path appended to `/models/`.
    model: String,

    /// Instruction prepended to the prompt.
    persona: Persona,

    /// Request timeout.
    timeout: Duration,
}

impl HuggingFaceProvider {
    /// Create a new provider with default settings.
    pub fn new() -> Self {
        Self {
            base_url: "https://api-inference.huggingface.co".to_string(),
            client: reqwest::Client::new(),
            model: "meta-llama/Meta-Llama-3-8B-Instruct".to_string(),
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

    /// Set the persona used to compose prompts.
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

impl Default for HuggingFaceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OnlineProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn credential_key(&self) -> &str {
        HUGGINGFACE_API_KEY
    }

    async fn answer(&self, credential: &str, question: &str) -> Result<ProviderAnswer> {
        debug!("Asking text generation model: {}", self.model);

        let body = serde_json::json!({
            "inputs": self.persona.compose(question),
            "parameters": {
                "max_new_tokens": 256,
                "temperature": 0.2,
                "return_full_text": false
            }
        });

        let response = self
            .client
            .post(format!("{}/models/{}", self.base_url, self.model))
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

        let result: TextGenerationResponse = serde_json::from_str(&content)?;
        let text = result
            .into_text()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("no generated_text".to_string()))?;

        info!("Text generation answered ({} chars)", text.len());

        Ok(ProviderAnswer {
            text,
            provenance: Provenance::new(self.name()).with_model(&self.model),
        })
    }
}

/// Inference endpoints answer either a list of generations or a single one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextGenerationResponse {
    Batch(Vec<Generation>),
    Single(Generation),
}

#[derive(Debug, Deserialize)]
struct Generation {
    #[serde(default)]
    generated_text: Option<String>,
}

impl TextGenerationResponse {
    fn into_text(self) -> Option<String> {
        match self {
            Self::Batch(generations) => generations.into_iter().next()?.generated_text,
            Self::Single(generation) => generation.generated_text,
        }
    }
}
