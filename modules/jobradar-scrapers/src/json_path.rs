//! Dotted-path lookups into JSON responses, shared by the ATS descriptors
//! and the generic API adapter. An empty path means the value itself.

use serde_json::Value;

pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Stringify a leaf: strings pass through, numbers/bools are formatted,
/// nulls and containers yield `None`.
pub fn lookup_string(value: &Value, path: &str) -> Option<String> {
    match lookup(value, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn walks_nested_objects() {
        let value = json!({"location": {"name": "Remote"}});
        assert_eq!(lookup_string(&value, "location.name").unwrap(), "Remote");
    }

    #[test]
    fn empty_path_is_identity() {
        let value = json!([1, 2, 3]);
        assert_eq!(lookup(&value, ""), Some(&value));
    }

    #[test]
    fn array_indices() {
        let value = json!({"items": [{"title": "a"}, {"title": "b"}]});
        assert_eq!(lookup_string(&value, "items.1.title").unwrap(), "b");
    }

    #[test]
    fn missing_segment_yields_none() {
        let value = json!({"a": 1});
        assert!(lookup(&value, "a.b").is_none());
        assert!(lookup_string(&value, "b").is_none());
    }

    #[test]
    fn numbers_stringify() {
        let value = json!({"createdAt": 1700000000000i64});
        assert_eq!(lookup_string(&value, "createdAt").unwrap(), "1700000000000");
    }
}
