//! Error types for answering providers.

use thiserror::Error;

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors a single provider call can produce.
///
/// Every variant means "no answer from this provider"; the router logs it and
/// moves on to the next source. None of them reach the user.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network error, including timeouts.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response parsed but held no usable text.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Response body was not the expected JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Whether retrying the same provider later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse(_) | Self::Serialization(_) => false,
        }
    }
}
