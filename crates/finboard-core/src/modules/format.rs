//! Display formatting for resolved field values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use finboard_types::{FieldFormat, WidgetField};
use serde_json::Value;

use crate::fields::rows::{as_number, plain_text};

pub const MISSING: &str = "N/A";
const DEFAULT_CURRENCY_SYMBOL: &str = "$";
const DEFAULT_DECIMALS: u32 = 2;

/// Render a resolved value according to the field's format hint.
///
/// Missing and null values render as `N/A`. Input that cannot be read as the
/// requested kind (a word under `currency`, a non-date under `date`) falls
/// back to its plain text.
pub fn format_value(value: Option<&Value>, field: &WidgetField) -> String {
    let value = match value {
        None | Some(Value::Null) => return MISSING.to_string(),
        Some(v) => v,
    };
    let decimals = field.decimal_places.unwrap_or(DEFAULT_DECIMALS) as usize;

    match field.format.unwrap_or_default() {
        FieldFormat::None => plain_text(value),
        FieldFormat::Currency => numeric(value).map_or_else(
            || plain_text(value),
            |n| {
                let symbol = field.currency_symbol.as_deref().filter(|s| !s.is_empty()).unwrap_or(DEFAULT_CURRENCY_SYMBOL);
                format!("{}{}", symbol, group_thousands(n, decimals))
            },
        ),
        FieldFormat::Percentage => {
            numeric(value).map_or_else(|| plain_text(value), |n| format!("{}%", group_thousands(n, decimals)))
        }
        FieldFormat::Number => numeric(value).map_or_else(|| plain_text(value), |n| group_thousands(n, decimals)),
        FieldFormat::Date => parse_date(value)
            .map_or_else(|| plain_text(value), |d| d.format("%b %-d, %Y").to_string()),
        FieldFormat::Datetime => parse_date(value)
            .map_or_else(|| plain_text(value), |d| d.format("%b %-d, %Y, %H:%M").to_string()),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Array(_) | Value::Object(_) => None,
        other => as_number(other),
    }
}

/// `1234567.891` → `1,234,567.89` at `decimals` places.
pub fn group_thousands(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    if n.is_sign_negative() && n != 0.0 {
        grouped.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

/// Numbers are epoch milliseconds; strings may be RFC 3339, `YYYY-MM-DD`
/// or `YYYY-MM-DD HH:MM[:SS]`. Naive values are taken as UTC.
fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(d) = DateTime::parse_from_rfc3339(s) {
                return Some(d.with_timezone(&Utc));
            }
            for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
                    return Some(Utc.from_utc_datetime(&naive));
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        _ => None,
    }
}
