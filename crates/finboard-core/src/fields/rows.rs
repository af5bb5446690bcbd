//! Row-scoped resolution for table and chart widgets.
//!
//! A table binds to one array in the payload. Stored paths were usually
//! discovered as `items[0].price`; against a located row they are resolved
//! relative to the element, falling back to the last path component.

use std::cmp::Ordering;

use finboard_types::WidgetField;
use serde_json::Value;

use super::resolve::resolve;

/// The array a table or chart reads its rows from.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet<'a> {
    pub rows: &'a [Value],
    /// Dotted location of the array; empty for a root array
    pub path: String,
}

/// Find the row array: the value at `first_path` if it is an array, then
/// the payload itself, then the first non-empty array in key order.
pub fn locate_rows<'a>(payload: &'a Value, first_path: Option<&str>) -> Option<RowSet<'a>> {
    if let Some(path) = first_path {
        if let Some(Value::Array(rows)) = resolve(payload, path) {
            return Some(RowSet { rows, path: path.to_string() });
        }
    }

    if let Value::Array(rows) = payload {
        return Some(RowSet { rows, path: String::new() });
    }

    find_array(payload, "")
}

fn find_array<'a>(value: &'a Value, prefix: &str) -> Option<RowSet<'a>> {
    let Value::Object(map) = value else {
        return None;
    };
    for (key, child) in map {
        let path = if prefix.is_empty() { key.clone() } else { format!("{}.{}", prefix, key) };
        match child {
            Value::Array(rows) if !rows.is_empty() => return Some(RowSet { rows, path }),
            Value::Object(_) => {
                if let Some(found) = find_array(child, &path) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

/// Path relative to an array element: `items[0].price` → `price`.
fn row_relative(path: &str) -> &str {
    match path.rfind(']') {
        Some(pos) => path[pos + 1..].trim_start_matches('.'),
        None => path,
    }
}

/// Resolve a stored field path against one row.
///
/// Tries, in order: the element-relative path, the stored path as a
/// literal key, the last dotted component as a key, the full stored path.
pub fn resolve_in_row<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    let relative = row_relative(path);
    if !relative.is_empty() {
        if let Some(v) = resolve(row, relative) {
            return Some(v);
        }
    }

    if let Value::Object(map) = row {
        if let Some(v) = map.get(path) {
            return Some(v);
        }
        let last = relative.rsplit('.').next().unwrap_or(relative);
        if !last.is_empty() {
            if let Some(v) = map.get(last) {
                return Some(v);
            }
        }
    }

    resolve(row, path)
}

/// Numeric view of a value, JS `Number()`-style for strings and booleans.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Some(0.0);
            }
            trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        _ => None,
    }
}

/// Plain text of a value: strings unquoted, everything else as JSON.
pub(crate) fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Rows where any selected field's text contains `query`, case-insensitively.
pub fn filter_rows<'a>(rows: &'a [Value], fields: &[WidgetField], query: &str) -> Vec<&'a Value> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return rows.iter().collect();
    }
    rows.iter()
        .filter(|row| {
            fields.iter().any(|f| {
                resolve_in_row(row, &f.path).is_some_and(|v| plain_text(v).to_lowercase().contains(&needle))
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Stable sort by the value at `path`: numbers before text, numbers
/// numerically, text case-insensitively. Missing values sort last.
pub fn sort_rows<'a>(rows: &mut [&'a Value], path: &str, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let ordering = match (resolve_in_row(a, path), resolve_in_row(b, path)) {
            (Some(x), Some(y)) => compare_values(x, y),
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

/// Total order: numeric values first in numeric order, then text values in
/// case-insensitive order.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => plain_text(a).to_lowercase().cmp(&plain_text(b).to_lowercase()),
    }
}

/// One x-position of a line chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub index: usize,
    /// `(series label, value)`; numeric-looking values are coerced to numbers
    pub values: Vec<(String, Value)>,
}

/// Chart series for the first `limit` rows.
pub fn chart_points(rows: &[Value], fields: &[WidgetField], limit: usize) -> Vec<ChartPoint> {
    rows.iter()
        .take(limit)
        .enumerate()
        .map(|(index, row)| {
            let values = fields
                .iter()
                .map(|field| {
                    let value = resolve_in_row(row, &field.path).cloned().unwrap_or(Value::Null);
                    let coerced = if value.is_string() {
                        as_number(&value)
                            .and_then(serde_json::Number::from_f64)
                            .map(Value::Number)
                            .unwrap_or(value)
                    } else {
                        value
                    };
                    (field.label().to_string(), coerced)
                })
                .collect();
            ChartPoint { index, values }
        })
        .collect()
}
