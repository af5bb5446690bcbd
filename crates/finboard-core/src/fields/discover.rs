use finboard_types::{FieldDescriptor, StructuralType};
use serde_json::Value;

/// Scalar previews longer than this are cut and suffixed with `...`.
pub const SAMPLE_PREVIEW_CHARS: usize = 100;

/// Walk `value` into descriptors rooted at `prefix`.
///
/// Only the first element of an array is sampled. With `arrays_only`,
/// array-summary descriptors for directly reached arrays are dropped while
/// their sampled element is still walked under `[0]`.
pub fn discover(value: &Value, prefix: &str, arrays_only: bool) -> Vec<FieldDescriptor> {
    let mut fields = Vec::new();
    walk(value, prefix, arrays_only, &mut fields);
    fields
}

/// [`discover`] from the document root.
pub fn discover_fields(value: &Value, arrays_only: bool) -> Vec<FieldDescriptor> {
    discover(value, "", arrays_only)
}

fn walk(value: &Value, prefix: &str, arrays_only: bool, out: &mut Vec<FieldDescriptor>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            if !arrays_only {
                out.push(array_summary(prefix, items, None));
            }
            if let Some(first) = sampled_container(items) {
                walk(first, &format!("{}[0]", prefix), arrays_only, out);
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() { key.clone() } else { format!("{}.{}", prefix, key) };
                out.push(describe_member(child, path, arrays_only));
            }
        }
        scalar => out.push(leaf(prefix.to_string(), scalar)),
    }
}

fn describe_member(value: &Value, path: String, arrays_only: bool) -> FieldDescriptor {
    match value {
        Value::Array(items) => {
            let children = sampled_container(items).map(|first| discover(first, &format!("{}[0]", path), arrays_only));
            array_summary(&path, items, children)
        }
        Value::Object(_) => {
            let children = discover(value, &path, arrays_only);
            FieldDescriptor {
                path,
                structural_type: StructuralType::Object,
                sample_value: "Object".to_string(),
                children: Some(children),
            }
        }
        scalar => leaf(path, scalar),
    }
}

/// First element when it is worth recursing into (object or array).
fn sampled_container(items: &[Value]) -> Option<&Value> {
    items.first().filter(|v| v.is_object() || v.is_array())
}

fn array_summary(path: &str, items: &[Value], children: Option<Vec<FieldDescriptor>>) -> FieldDescriptor {
    FieldDescriptor {
        path: path.to_string(),
        structural_type: StructuralType::Array,
        sample_value: format!("Array({} items)", items.len()),
        children,
    }
}

fn leaf(path: String, value: &Value) -> FieldDescriptor {
    FieldDescriptor {
        path,
        structural_type: StructuralType::of(value),
        sample_value: sample_preview(value),
        children: None,
    }
}

/// Stringified scalar, truncated on a char boundary.
pub fn sample_preview(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() <= SAMPLE_PREVIEW_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(SAMPLE_PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(fields: &[FieldDescriptor]) -> Vec<&str> {
        FieldDescriptor::flatten(fields).into_iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn test_flat_quote_object() {
        let fields = discover_fields(&json!({"c": 101.5, "d": 1.2, "dp": 0.012}), false);
        assert_eq!(paths(&fields), vec!["c", "d", "dp"]);
        assert!(fields.iter().all(|f| f.is_leaf() && f.structural_type == StructuralType::Number));
        assert_eq!(fields[0].sample_value, "101.5");
    }

    #[test]
    fn test_array_of_objects_samples_first_element() {
        let payload = json!({"items": [{"ticker": "AAA", "price": 10}, {"ticker": "BBB", "price": 20}]});
        let fields = discover_fields(&payload, false);

        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].sample_value, "Array(2 items)");
        assert_eq!(paths(&fields), vec!["items", "items[0].ticker", "items[0].price"]);
    }

    #[test]
    fn test_null_root_yields_nothing() {
        assert!(discover_fields(&Value::Null, false).is_empty());
    }

    #[test]
    fn test_null_member_is_a_leaf() {
        let fields = discover_fields(&json!({"note": null}), false);
        assert_eq!(fields[0].structural_type, StructuralType::Null);
        assert_eq!(fields[0].sample_value, "null");
    }

    #[test]
    fn test_root_array_and_arrays_only() {
        let payload = json!([{"symbol": "AAPL", "quote": {"price": 1}}]);
        assert_eq!(paths(&discover_fields(&payload, false)), vec!["", "[0].symbol", "[0].quote", "[0].quote.price"]);
        assert_eq!(paths(&discover_fields(&payload, true)), vec!["[0].symbol", "[0].quote", "[0].quote.price"]);
    }

    #[test]
    fn test_array_of_scalars_has_no_children() {
        let fields = discover_fields(&json!({"closes": [1, 2, 3], "empty": []}), false);
        assert_eq!(fields[0].children, None);
        assert_eq!(fields[1].sample_value, "Array(0 items)");
        assert_eq!(fields[1].children, None);
    }

    #[test]
    fn test_nested_arrays_use_repeated_index() {
        let fields = discover_fields(&json!({"grid": [[{"v": 1}]]}), false);
        assert_eq!(paths(&fields), vec!["grid", "grid[0]", "grid[0][0].v"]);
    }

    #[test]
    fn test_key_order_is_preserved() {
        let payload: Value = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap_or_default();
        assert_eq!(paths(&discover_fields(&payload, false)), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_prefix_and_scalar_root() {
        let fields = discover(&json!({"open": "1.0"}), "Time Series", false);
        assert_eq!(fields[0].path, "Time Series.open");

        let root = discover_fields(&json!(true), false);
        assert_eq!(root[0].path, "");
        assert_eq!(root[0].structural_type, StructuralType::Boolean);
    }

    #[test]
    fn test_sample_preview_truncates() {
        let long = "x".repeat(250);
        let preview = sample_preview(&json!(long));
        assert_eq!(preview.chars().count(), SAMPLE_PREVIEW_CHARS + 3);
        assert!(preview.ends_with("..."));
        assert_eq!(sample_preview(&json!("short")), "short");
    }
}
