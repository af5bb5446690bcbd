//! Result of one fetch as handed to widgets.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;

/// `{data, error?, fromCache, cacheAge?}` consumer contract.
///
/// Exactly one of `data` (non-null) or `error` is meaningful; on failure
/// `data` is `Value::Null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FetchError>,
    pub from_cache: bool,
    #[serde(default, rename = "cacheAge", skip_serializing_if = "Option::is_none")]
    pub cache_age_secs: Option<u64>,
    /// Epoch milliseconds at which the outcome was produced
    pub timestamp: i64,
}

impl FetchOutcome {
    pub fn fresh(data: Value, timestamp: i64) -> Self {
        Self { data, error: None, error_kind: None, from_cache: false, cache_age_secs: None, timestamp }
    }

    pub fn cached(data: Value, age_secs: u64, timestamp: i64) -> Self {
        Self {
            data,
            error: None,
            error_kind: None,
            from_cache: true,
            cache_age_secs: Some(age_secs),
            timestamp,
        }
    }

    pub fn failure(error: FetchError, timestamp: i64) -> Self {
        Self {
            data: Value::Null,
            error: Some(error.to_string()),
            error_kind: Some(error),
            from_cache: false,
            cache_age_secs: None,
            timestamp,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.error_kind, Some(FetchError::RateLimited { .. }))
    }
}
