//! Reset-delay extraction from 429 responses.
//!
//! Sources are tried in order: the `Retry-After` header (delta-seconds or
//! HTTP-date), well-known JSON body fields, then free-text hints.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

static RETRY_M_S_REGEX: OnceLock<Regex> = OnceLock::new();
static RETRY_S_REGEX: OnceLock<Regex> = OnceLock::new();
static RETRY_AFTER_REGEX: OnceLock<Regex> = OnceLock::new();
static WAIT_PAREN_REGEX: OnceLock<Regex> = OnceLock::new();

fn retry_m_s_regex() -> &'static Regex {
    RETRY_M_S_REGEX.get_or_init(|| {
        Regex::new(r"(?i)try again in (\d+)m\s*(\d+)s").expect("Retry m s regex is valid")
    })
}

fn retry_s_regex() -> &'static Regex {
    RETRY_S_REGEX.get_or_init(|| {
        Regex::new(r"(?i)(?:try again in|backoff for|wait)\s*(\d+)\s*s").expect("Retry s regex is valid")
    })
}

fn retry_after_regex() -> &'static Regex {
    RETRY_AFTER_REGEX.get_or_init(|| {
        Regex::new(r"(?i)retry after (\d+) second").expect("Retry after regex is valid")
    })
}

fn wait_paren_regex() -> &'static Regex {
    WAIT_PAREN_REGEX
        .get_or_init(|| Regex::new(r"\(wait (\d+)s\)").expect("Wait paren regex is valid"))
}

/// Parse a `Retry-After` header value into seconds relative to `now_ms`.
pub fn parse_retry_after_header(value: &str, now_ms: i64) -> Option<u64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(secs) = trimmed.parse::<u64>() {
        return Some(secs);
    }

    // Non-integer numerics like "1.5" round up.
    if let Ok(secs) = trimmed.parse::<f64>() {
        if secs.is_finite() && secs >= 0.0 {
            return Some(secs.ceil() as u64);
        }
    }

    let date = chrono::DateTime::parse_from_rfc2822(trimmed).ok()?;
    let delta_ms = date.timestamp_millis() - now_ms;
    if delta_ms <= 0 {
        return Some(0);
    }
    Some((delta_ms as u64).div_ceil(1000))
}

fn seconds_field(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.ceil() as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Extract a reset delay in seconds from a 429 response body.
pub fn parse_retry_time_from_body(body: &str) -> Option<u64> {
    let trimmed = body.trim();
    if trimmed.starts_with('{') {
        if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
            for key in ["retry_after", "retryAfter"] {
                if let Some(secs) = json.get(key).and_then(seconds_field) {
                    tracing::debug!("[retry-after] body field {}: {}s", key, secs);
                    return Some(secs);
                }
            }

            if let Some(secs) = json.get("error").and_then(|e| e.get("retry_after")).and_then(seconds_field)
            {
                return Some(secs);
            }
        }
    }

    if let Some(caps) = retry_m_s_regex().captures(body) {
        if let (Ok(m), Ok(s)) = (caps[1].parse::<u64>(), caps[2].parse::<u64>()) {
            if let Some(total) = m.checked_mul(60).and_then(|secs| secs.checked_add(s)) {
                return Some(total);
            }
        }
    }

    for re in [retry_s_regex(), retry_after_regex(), wait_paren_regex()] {
        if let Some(caps) = re.captures(body) {
            if let Ok(s) = caps[1].parse::<u64>() {
                return Some(s);
            }
        }
    }

    None
}

/// Resolve the reset delay for a 429: header first, then body, then `default_secs`.
pub fn resolve_reset_delay_secs(
    retry_after_header: Option<&str>,
    body: &str,
    default_secs: u64,
    now_ms: i64,
) -> u64 {
    retry_after_header
        .and_then(|h| parse_retry_after_header(h, now_ms))
        .or_else(|| parse_retry_time_from_body(body))
        .unwrap_or(default_secs)
}
