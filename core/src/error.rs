//! Error types for orchestration, configuration and scans.

use thiserror::Error;

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Failures that reach the user.
///
/// Provider failures never show up here; they only move the question along
/// the fallback chain.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// The question was blank.
    #[error("question is empty")]
    EmptyQuestion,

    /// Persistence failed.
    #[error("store error: {0}")]
    Store(#[from] sentinel_store::StoreError),

    /// Connectivity monitor error.
    #[error("connectivity error: {0}")]
    Connectivity(#[from] sentinel_connectivity::ConnectivityError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors loading or saving the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the file.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the file.
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for the configuration.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered.
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Errors starting a scan.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Another scan has not finished yet.
    #[error("a scan is already running")]
    AlreadyRunning,

    /// The scan log could not be written.
    #[error("store error: {0}")]
    Store(#[from] sentinel_store::StoreError),
}
