//! Offline answering sources: an optional local model and canned guidance.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, Result};

/// Answer of last resort when nothing else can answer offline.
pub const CANNED_GUIDANCE: &str = "I am currently operating in offline mode. Based on my onboard knowledge, \
here are best practices: 1) Keep OS and apps updated. 2) Use a password manager and MFA. \
3) Avoid sideloading unknown APKs. 4) Back up regularly. 5) Use device encryption. \
Ask again when online for deeper analysis.";

/// Trait for on-device text generation.
#[async_trait]
pub trait LocalModel: Send + Sync {
    /// Model identifier recorded in provenance.
    fn name(&self) -> &str;

    /// Complete `prompt`. `Ok(None)` means the model had nothing to say.
    async fn generate(&self, prompt: &str) -> Result<Option<String>>;
}

/// Local model served by an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaModel {
    /// Server base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Model tag.
    model: String,

    /// Sampling temperature.
    temperature: f32,

    /// Maximum tokens to generate.
    max_tokens: u32,

    /// Request timeout.
    timeout: Duration,
}

impl OllamaModel {
    /// Create a client for `model` on the default local server.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            client: reqwest::Client::new(),
            model: model.into(),
            temperature: 0.4,
            max_tokens: 256,
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the server base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl LocalModel for OllamaModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<Option<String>> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let result: GenerateResponse = response.json().await?;
        let text = result.response.trim();
        debug!("Local model {} produced {} chars", self.model, text.len());

        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3.2:1b",
                "stream": false,
                "options": { "num_predict": 256 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3.2:1b",
                "response": " Lock your screen. ",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let model = OllamaModel::new("llama3.2:1b").with_base_url(server.uri());
        let text = model.generate("how do I secure my laptop").await.unwrap();
        assert_eq!(text.as_deref(), Some("Lock your screen."));
    }

    #[tokio::test]
    async fn test_blank_generation_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": "   " })))
            .mount(&server)
            .await;

        let model = OllamaModel::new("tiny").with_base_url(server.uri());
        assert_eq!(model.generate("hi").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let model = OllamaModel::new("missing").with_base_url(server.uri());
        assert!(matches!(
            model.generate("hi").await,
            Err(ProviderError::Status { status: 404, .. })
        ));
    }
}
