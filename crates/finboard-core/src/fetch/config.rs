//! Fetch engine tuning.

use std::time::Duration;

/// Env var naming the passthrough proxy used when a direct request fails.
pub const PASSTHROUGH_URL_ENV: &str = "FINBOARD_PASSTHROUGH_URL";

/// Keys whose truthy presence in a 2xx body marks a provider-level error,
/// in priority order.
pub const DEFAULT_EMBEDDED_ERROR_KEYS: &[&str] = &["error", "Error Message"];

/// Keys searched for a human-readable message in an error body, in priority order.
pub const DEFAULT_ERROR_MESSAGE_KEYS: &[&str] =
    &["error", "message", "Error Message", "error_message", "msg"];

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Total network attempts per fetch, first attempt included
    pub max_attempts: u32,
    pub default_ttl_secs: u64,
    pub request_timeout: Duration,
    /// Window length when a 429 discloses no reset delay
    pub rate_limit_default_secs: u64,
    /// Longest single sleep spent waiting out a rate-limit window
    pub rate_limit_max_wait: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub embedded_error_keys: Vec<String>,
    pub error_message_keys: Vec<String>,
    pub passthrough_url: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_ttl_secs: 30,
            request_timeout: Duration::from_secs(30),
            rate_limit_default_secs: 60,
            rate_limit_max_wait: Duration::from_secs(60),
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(8),
            embedded_error_keys: DEFAULT_EMBEDDED_ERROR_KEYS.iter().map(|k| (*k).to_string()).collect(),
            error_message_keys: DEFAULT_ERROR_MESSAGE_KEYS.iter().map(|k| (*k).to_string()).collect(),
            passthrough_url: None,
        }
    }
}

impl FetchConfig {
    /// Defaults, with the passthrough URL taken from the environment.
    pub fn from_env() -> Self {
        let passthrough_url = std::env::var(PASSTHROUGH_URL_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Self { passthrough_url, ..Self::default() }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    pub fn with_rate_limit_max_wait(mut self, max_wait: Duration) -> Self {
        self.rate_limit_max_wait = max_wait;
        self
    }

    pub fn with_passthrough_url(mut self, url: impl Into<String>) -> Self {
        self.passthrough_url = Some(url.into());
        self
    }

    /// Register an extra provider convention for embedded 2xx errors.
    pub fn with_embedded_error_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !self.embedded_error_keys.contains(&key) {
            self.embedded_error_keys.push(key);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.default_ttl_secs, 30);
        assert_eq!(config.rate_limit_default_secs, 60);
        assert_eq!(config.embedded_error_keys, vec!["error", "Error Message"]);
        assert_eq!(config.error_message_keys.first().map(String::as_str), Some("error"));
        assert!(config.passthrough_url.is_none());
    }

    #[test]
    fn test_builders() {
        let config = FetchConfig::default()
            .with_max_attempts(0)
            .with_embedded_error_key("Note")
            .with_embedded_error_key("Note");
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.embedded_error_keys.len(), 3);
    }
}
