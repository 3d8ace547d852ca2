//! Server error types.

use std::io;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (bind, accept, config file).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Provider could not be constructed.
    #[error("Provider error: {0}")]
    Provider(#[from] rebillable_providers::ProviderError),

    /// Tracing could not be initialized.
    #[error("Tracing error: {0}")]
    Tracing(#[from] rebillable_core::TracingError),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
