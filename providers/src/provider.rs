//! Provider trait and answer types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which provider and model produced an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Provider identifier, e.g. `openai` or `local_kb`.
    pub provider: String,

    /// Model identifier, when the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Provenance {
    /// Provenance without a model.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: None,
        }
    }

    /// Attach a model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Metadata object suitable for storing next to a chat message.
    pub fn to_metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("provider".to_string(), self.provider.clone().into());
        if let Some(model) = &self.model {
            map.insert("model".to_string(), model.clone().into());
        }
        map
    }
}

/// Text produced by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAnswer {
    /// The answer text, trimmed.
    pub text: String,

    /// Where it came from.
    pub provenance: Provenance,
}

/// Trait for remote answering providers.
#[async_trait]
pub trait OnlineProvider: Send + Sync {
    /// Provider identifier recorded in provenance.
    fn name(&self) -> &str;

    /// Model the provider asks for.
    fn model(&self) -> &str;

    /// Setting key holding this provider's bearer credential.
    fn credential_key(&self) -> &str;

    /// Ask the provider a question.
    async fn answer(&self, credential: &str, question: &str) -> Result<ProviderAnswer>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_provenance_metadata() {
        let meta = Provenance::new("openai").with_model("gpt-3.5-turbo").to_metadata();
        assert_eq!(meta.get("provider"), Some(&serde_json::json!("openai")));
        assert_eq!(meta.get("model"), Some(&serde_json::json!("gpt-3.5-turbo")));

        let meta = Provenance::new("local_fallback").to_metadata();
        assert!(!meta.contains_key("model"));
    }
}
