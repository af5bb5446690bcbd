//! Retry decisions for the fetch loop.
//!
//! 429 waits for the disclosed window (capped), 5xx backs off
//! exponentially, everything else stops immediately.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// Strategy for retrying a failed provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Do not retry.
    NoRetry,
    /// Sleep until the rate-limit window closes, at most `max_wait`.
    WaitForWindow {
        /// Remaining window length
        delay: Duration,
        /// Upper bound on a single sleep
        max_wait: Duration,
    },
    /// Retry after `base * 2^attempt`, capped at `max`.
    ExponentialBackoff {
        /// Delay before the second attempt
        base: Duration,
        /// Upper bound on a single delay
        max: Duration,
    },
}

impl RetryStrategy {
    /// Delay to sleep before the attempt following `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::NoRetry => None,
            Self::WaitForWindow { delay, max_wait } => Some((*delay).min(*max_wait)),
            Self::ExponentialBackoff { base, max } => Some(exponential_delay(*base, *max, attempt)),
        }
    }
}

/// `base * 2^attempt`, saturating, capped at `max`.
pub fn exponential_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

/// Map a response status to a retry strategy.
///
/// `reset_delay` is the 429 window length when the status is 429.
pub fn determine_retry_strategy(
    status_code: u16,
    reset_delay: Option<Duration>,
    backoff_base: Duration,
    backoff_max: Duration,
    rate_limit_max_wait: Duration,
) -> RetryStrategy {
    match status_code {
        429 => RetryStrategy::WaitForWindow {
            delay: reset_delay.unwrap_or(rate_limit_max_wait),
            max_wait: rate_limit_max_wait,
        },
        500..=599 => RetryStrategy::ExponentialBackoff { base: backoff_base, max: backoff_max },
        _ => RetryStrategy::NoRetry,
    }
}

/// Sleep per `strategy` if another attempt is allowed.
///
/// `attempt` is the 0-based index of the attempt that just failed.
/// Returns `true` if the caller should issue the next attempt.
pub async fn apply_retry_strategy(
    strategy: &RetryStrategy,
    attempt: u32,
    max_attempts: u32,
    status_code: u16,
    origin: &str,
) -> bool {
    let Some(delay) = strategy.delay_for(attempt) else {
        debug!(origin = %origin, status = status_code, "non-retryable status, stopping");
        return false;
    };

    if attempt.saturating_add(1) >= max_attempts {
        debug!(
            origin = %origin,
            status = status_code,
            attempt = attempt + 1,
            "attempt cap reached ({}), giving up",
            max_attempts
        );
        return false;
    }

    info!(
        origin = %origin,
        status = status_code,
        attempt = attempt + 1,
        delay_ms = delay.as_millis() as u64,
        "retrying after delay ({}/{})",
        attempt + 1,
        max_attempts
    );
    sleep(delay).await;
    true
}
