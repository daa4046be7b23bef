//! Error types for the connectivity monitor.

use thiserror::Error;

/// Result type alias for connectivity operations.
pub type Result<T> = std::result::Result<T, ConnectivityError>;

/// Errors that can occur while setting up or starting the monitor.
///
/// Probe failures are not errors; they simply read as offline.
#[derive(Error, Debug)]
pub enum ConnectivityError {
    /// Monitor already polling.
    #[error("connectivity monitor already started")]
    AlreadyStarted,

    /// HTTP client could not be built.
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}
