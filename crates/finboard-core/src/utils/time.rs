//! Wall-clock helpers. All persisted timestamps are epoch milliseconds.

use std::time::Duration;

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Whole seconds, rounding any remainder up.
pub fn duration_to_secs_ceil(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Seconds from `now_ms` until `deadline_ms`, rounded up; 0 once passed.
pub fn millis_until_secs_ceil(deadline_ms: i64, now_ms: i64) -> u64 {
    if deadline_ms <= now_ms {
        return 0;
    }
    let remaining = u64::try_from(deadline_ms - now_ms).unwrap_or(0);
    duration_to_secs_ceil(Duration::from_millis(remaining))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_to_secs_ceil() {
        assert_eq!(duration_to_secs_ceil(Duration::from_millis(4001)), 5);
        assert_eq!(duration_to_secs_ceil(Duration::from_secs(4)), 4);
        assert_eq!(duration_to_secs_ceil(Duration::ZERO), 0);
    }

    #[test]
    fn test_millis_until_secs_ceil() {
        assert_eq!(millis_until_secs_ceil(10_500, 10_000), 1);
        assert_eq!(millis_until_secs_ceil(9_000, 10_000), 0);
        assert_eq!(millis_until_secs_ceil(15_000, 10_000), 5);
    }
}
