//! Unified error types for Finboard Core.
//!
//! Fetch failures never surface as `AppError`; they are folded into a
//! [`FetchOutcome`](finboard_types::FetchOutcome). This type covers the
//! surrounding operations: configuration files, cache stores, clients.

use finboard_types::ConfigError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Dashboard configuration could not be loaded, validated or saved.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client construction failed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A response cache store rejected the operation.
    #[error("Cache store error: {0}")]
    Cache(String),

    /// A URL could not be parsed or is not usable for this operation.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for Finboard Core operations.
pub type AppResult<T> = Result<T, AppError>;
