//! Path evaluation: `a.b[0].c`, `[0].x`, `grid[0][1]`.
//!
//! Absence is `None`; a present JSON `null` is `Some(&Value::Null)`.
//! Keys that themselves contain dots (`"1. open"`) are matched by joining
//! consecutive segments when the shorter split does not resolve.

use serde_json::Value;

/// Resolve `path` against `root`. The empty path is the root itself.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    let segments: Vec<&str> = path.split('.').collect();
    resolve_segments(root, path, &segments, 0)
}

/// Owned variant of [`resolve`].
pub fn resolve_owned(root: &Value, path: &str) -> Option<Value> {
    resolve(root, path).cloned()
}

fn resolve_segments<'a>(current: &'a Value, path: &str, segments: &[&str], start: usize) -> Option<&'a Value> {
    if start >= segments.len() {
        return Some(current);
    }

    // Byte offset of segments[start] inside `path`, so joined candidates are slices.
    let offset: usize = segments[..start].iter().map(|s| s.len() + 1).sum();
    let mut end = offset;
    for (i, segment) in segments.iter().enumerate().skip(start) {
        end += segment.len();
        let candidate = &path[offset..end];
        if let Some(next) = step(current, candidate) {
            if let Some(found) = resolve_segments(next, path, segments, i + 1) {
                return Some(found);
            }
        }
        end += 1;
    }
    None
}

/// Apply one segment to `current`.
fn step<'a>(current: &'a Value, segment: &str) -> Option<&'a Value> {
    match current {
        Value::Object(map) => {
            if let Some(v) = map.get(segment) {
                return Some(v);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = segment.parse::<usize>() {
                return items.get(index);
            }
        }
        _ => {}
    }

    let (base, indices) = split_indices(segment)?;
    let mut value = if base.is_empty() { current } else { current.as_object()?.get(base)? };
    for index in indices {
        value = value.as_array()?.get(index)?;
    }
    Some(value)
}

/// Split `key[1][2]` into `("key", [1, 2])`. `None` unless at least one
/// well-formed trailing `[digits]` group is present.
fn split_indices(segment: &str) -> Option<(&str, Vec<usize>)> {
    let mut rest = segment;
    let mut indices = Vec::new();
    while let Some(inner_end) = rest.strip_suffix(']') {
        let open = inner_end.rfind('[')?;
        let digits = &inner_end[open + 1..];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        indices.push(digits.parse::<usize>().ok()?);
        rest = &inner_end[..open];
    }
    if indices.is_empty() {
        return None;
    }
    indices.reverse();
    Some((rest, indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::discover::discover_fields;
    use finboard_types::FieldDescriptor;
    use serde_json::json;

    #[test]
    fn test_plain_and_indexed_paths() {
        let v = json!({"items": [{"ticker": "AAA", "price": 10}, {"ticker": "BBB", "price": 20}]});
        assert_eq!(resolve(&v, "items[1].ticker"), Some(&json!("BBB")));
        assert_eq!(resolve(&v, "items[0].price"), Some(&json!(10)));
        assert_eq!(resolve(&v, "items[2].price"), None);
        assert_eq!(resolve(&v, "items.price"), None);
        assert_eq!(resolve(&v, "items.1.price"), Some(&json!(20)));
    }

    #[test]
    fn test_scenario_quote_path() {
        let v = json!({"c": 101.5, "d": 1.2, "dp": 0.012});
        assert_eq!(resolve(&v, "c"), Some(&json!(101.5)));
        assert_eq!(resolve(&v, "missing"), None);
    }

    #[test]
    fn test_null_is_present() {
        let v = json!({"a": null});
        assert_eq!(resolve(&v, "a"), Some(&Value::Null));
        assert_eq!(resolve(&v, "a.b"), None);
    }

    #[test]
    fn test_root_and_nested_indices() {
        let v = json!([[1, 2], [3, {"x": 4}]]);
        assert_eq!(resolve(&v, ""), Some(&v));
        assert_eq!(resolve(&v, "[1][0]"), Some(&json!(3)));
        assert_eq!(resolve(&v, "[1][1].x"), Some(&json!(4)));
        assert_eq!(resolve(&v, "[5]"), None);
    }

    #[test]
    fn test_dotted_keys() {
        let v = json!({
            "Time Series (Daily)": {"2024-01-02": {"1. open": "187.15", "4. close": "185.64"}},
            "Meta Data": {"2. Symbol": "IBM"}
        });
        assert_eq!(resolve(&v, "Time Series (Daily).2024-01-02.1. open"), Some(&json!("187.15")));
        assert_eq!(resolve(&v, "Meta Data.2. Symbol"), Some(&json!("IBM")));
    }

    #[test]
    fn test_literal_bracket_key_wins() {
        let v = json!({"a[0]": "literal", "a": ["indexed"]});
        assert_eq!(resolve(&v, "a[0]"), Some(&json!("literal")));
    }

    #[test]
    fn test_malformed_paths_never_panic() {
        let v = json!({"a": [1], "b": {"c": 1}, "": {"b": 2}});
        for path in ["a[", "..b", ".", "a[]", "a[x]", "a]", "[", "]", "a[0", "a[99999999999999999999999]", "b..c", "💥[0]", "a[0]]"] {
            let _ = resolve(&v, path);
        }
        assert_eq!(resolve(&v, "a["), None);
        assert_eq!(resolve(&v, ".b"), Some(&json!(2)));
        assert_eq!(resolve(&v, "a[x]"), None);
    }

    #[test]
    fn test_scalars_have_no_members() {
        assert_eq!(resolve(&json!(5), "x"), None);
        assert_eq!(resolve(&json!("str"), "[0]"), None);
    }

    #[test]
    fn test_discovered_paths_resolve_against_sample() {
        let samples = [
            json!({"c": 101.5, "d": 1.2, "dp": 0.012}),
            json!({"items": [{"ticker": "AAA", "price": 10}], "meta": {"count": 1, "tags": ["x"]}}),
            json!([{"symbol": "AAPL", "quotes": [[{"p": 1}]]}]),
            json!({"Meta Data": {"1. Information": "Daily"}, "nil": null, "e": []}),
            json!("scalar root"),
        ];
        for sample in &samples {
            for arrays_only in [false, true] {
                let fields = discover_fields(sample, arrays_only);
                for field in FieldDescriptor::flatten(&fields) {
                    assert!(
                        resolve(sample, &field.path).is_some(),
                        "path {:?} did not resolve against {}",
                        field.path,
                        sample
                    );
                }
            }
        }
    }
}
