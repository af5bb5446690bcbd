//! Per-origin rate-limit windows.
//!
//! A window is opened when a provider answers 429 and is consulted before
//! every request to the same origin. Expired windows are dropped lazily on
//! the next check; there is no eviction timer and nothing is persisted.

pub mod parser;


use dashmap::DashMap;
use tracing::{debug, info};

use crate::utils::time::{millis_until_secs_ceil, now_millis};

/// An active "too many requests" window for one origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub origin_key: String,
    pub reset_at_ms: i64,
    pub detected_at_ms: i64,
}

/// Result of [`RateLimitRegistry::check_blocked`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStatus {
    pub blocked: bool,
    pub reset_at_ms: Option<i64>,
}

impl BlockStatus {
    const OPEN: Self = Self { blocked: false, reset_at_ms: None };

    /// Seconds left in the window relative to `now_ms`, rounded up.
    pub fn remaining_secs(&self, now_ms: i64) -> u64 {
        self.reset_at_ms.map_or(0, |reset| millis_until_secs_ceil(reset, now_ms))
    }
}

#[derive(Debug, Default)]
pub struct RateLimitRegistry {
    windows: DashMap<String, RateLimitWindow>,
}

impl RateLimitRegistry {
    pub fn new() -> Self {
        Self { windows: DashMap::new() }
    }

    /// Check whether `origin_key` is inside an active window.
    pub fn check_blocked(&self, origin_key: &str) -> BlockStatus {
        self.check_blocked_at(origin_key, now_millis())
    }

    pub(crate) fn check_blocked_at(&self, origin_key: &str, now_ms: i64) -> BlockStatus {
        let reset_at_ms = match self.windows.get(origin_key) {
            Some(window) => window.reset_at_ms,
            None => return BlockStatus::OPEN,
        };

        if now_ms < reset_at_ms {
            return BlockStatus { blocked: true, reset_at_ms: Some(reset_at_ms) };
        }

        // The guard above is dropped; a concurrent record_limit may have
        // extended the window, so only remove what is still expired.
        if self.windows.remove_if(origin_key, |_, w| w.reset_at_ms <= now_ms).is_some() {
            debug!(origin = %origin_key, "rate limit window expired");
        }
        BlockStatus::OPEN
    }

    /// Open (or replace) the window for `origin_key` until `reset_at_ms`.
    pub fn record_limit(&self, origin_key: &str, reset_at_ms: i64) {
        let now = now_millis();
        info!(
            origin = %origin_key,
            wait_secs = millis_until_secs_ceil(reset_at_ms, now),
            "rate limit window recorded"
        );
        self.windows.insert(
            origin_key.to_string(),
            RateLimitWindow { origin_key: origin_key.to_string(), reset_at_ms, detected_at_ms: now },
        );
    }

    /// Remaining wait in seconds; 0 when the origin is not blocked.
    pub fn remaining_wait_secs(&self, origin_key: &str) -> u64 {
        let now = now_millis();
        self.check_blocked_at(origin_key, now).remaining_secs(now)
    }

    pub fn get(&self, origin_key: &str) -> Option<RateLimitWindow> {
        self.windows.get(origin_key).map(|w| w.clone())
    }

    /// Clear the window for one origin.
    pub fn clear(&self, origin_key: &str) -> bool {
        self.windows.remove(origin_key).is_some()
    }

    pub fn clear_all(&self) {
        let count = self.windows.len();
        self.windows.clear();
        if count > 0 {
            debug!("cleared {} rate limit window(s)", count);
        }
    }

    /// Number of stored windows, expired or not.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
