//! Credentials for online providers.

use std::collections::HashMap;
use std::fmt;

/// Setting key of the OpenAI-style provider's API key.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Setting key of the Hugging-Face-style provider's API key.
pub const HUGGINGFACE_API_KEY: &str = "HUGGINGFACE_API_KEY";

/// Optional provider secrets keyed by setting name.
///
/// A provider whose key is absent here is skipped by the router.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    keys: HashMap<String, String>,
}

impl ProviderCredentials {
    /// Empty credentials; every online provider is unavailable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret. Blank secrets are ignored.
    pub fn with(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.insert(key, secret);
        self
    }

    /// Add a secret in place. Blank secrets are ignored.
    pub fn insert(&mut self, key: impl Into<String>, secret: impl Into<String>) {
        let secret = secret.into().trim().to_string();
        if !secret.is_empty() {
            self.keys.insert(key.into(), secret);
        }
    }

    /// Read the known provider keys from the environment.
    pub fn from_env() -> Self {
        let mut credentials = Self::new();
        for key in [OPENAI_API_KEY, HUGGINGFACE_API_KEY] {
            if let Ok(secret) = std::env::var(key) {
                credentials.insert(key, secret);
            }
        }
        credentials
    }

    /// Fill in keys this set lacks from `fallback`.
    pub fn or(mut self, fallback: ProviderCredentials) -> Self {
        for (key, secret) in fallback.keys {
            self.keys.entry(key).or_insert(secret);
        }
        self
    }

    /// Secret for `key`, if configured.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }

    /// Whether no provider is configured.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("ProviderCredentials")
            .field("configured", &keys)
            .finish()
    }
}
