//! Typed error definitions for Finboard.
//!
//! This module provides a structured error hierarchy with specific error types
//! for different domains. All errors are designed to be:
//!
//! - **Serializable** for persisted snapshots and CLI `--json` output
//! - **Displayable** as the plain message widgets show to the user
//! - **Matchable** for refresh scheduling decisions via enum variants

mod config;
mod fetch;

pub use config::ConfigError;
pub use fetch::FetchError;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = FetchError::RateLimited { origin: "https://api.example.com".to_string(), wait_secs: 42 };

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("RateLimited"));
        assert!(json.contains("42"));

        let deserialized: FetchError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }

    #[test]
    fn test_error_display() {
        let err = FetchError::RateLimited { origin: "https://api.example.com".to_string(), wait_secs: 60 };

        let msg = format!("{}", err);
        assert!(msg.contains("Please wait 60 seconds"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ValidationError {
            field: "apiUrl".to_string(),
            message: "must use http or https".to_string(),
        };
        assert_eq!(err.to_string(), "Config validation error for apiUrl: must use http or https");
    }
}
