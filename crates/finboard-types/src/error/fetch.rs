//! Fetch pipeline errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while fetching a widget's data source.
///
/// At the pipeline boundary every variant is rendered to its `Display` text;
/// the variant itself travels alongside so schedulers can branch on it.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum FetchError {
    /// An active rate-limit window blocks the origin (429 observed).
    #[error("Rate limit exceeded. Please wait {wait_secs} seconds before trying again.")]
    RateLimited {
        /// Origin the window applies to
        origin: String,
        /// Seconds until the window expires
        wait_secs: u64,
    },

    /// 401/403 from the provider.
    #[error("Invalid API key or unauthorized access (HTTP {status}).")]
    Unauthorized { status: u16 },

    /// 400 from the provider; `message` is the provider's text verbatim.
    #[error("Bad Request: {message}. Check your API parameters (symbol format, parameter names, etc.).")]
    BadRequest { message: String },

    /// 5xx from the provider after the attempt cap was reached.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The request never produced an HTTP status.
    #[error("{}", transport_message(.message, .cors_suspected))]
    Transport {
        message: String,
        /// Failure looked like a cross-origin/connection-level block
        cors_suspected: bool,
    },

    /// 2xx response whose body encodes an error by provider convention.
    #[error("{message}")]
    PayloadLogical { message: String },

    /// The configured URL cannot be requested.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The body was not valid JSON.
    #[error("Invalid JSON response: {message}")]
    Decode { message: String },

    /// Any other non-success status; `message` is passed through verbatim.
    #[error("{message}")]
    Other { status: u16, message: String },
}

fn transport_message(message: &str, cors_suspected: &bool) -> String {
    if *cors_suspected {
        format!(
            "CORS error: Unable to fetch data. The API may not allow requests from this origin. ({})",
            message
        )
    } else {
        format!("Network error: {}", message)
    }
}

impl FetchError {
    /// Check if the pipeline may retry this error on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Server { .. })
    }

    /// Seconds the caller should wait before trying again, if disclosed.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { wait_secs, .. } => Some(*wait_secs),
            _ => None,
        }
    }

    /// Check if this is a user-actionable configuration problem (4xx equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::BadRequest { .. } | Self::InvalidUrl { .. }
        )
    }

    /// HTTP status behind the error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Unauthorized { status } | Self::Server { status, .. } | Self::Other { status, .. } => {
                Some(*status)
            }
            Self::BadRequest { .. } => Some(400),
            _ => None,
        }
    }
}
