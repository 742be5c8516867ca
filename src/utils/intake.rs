use crate::error::AppError;
use serde_json::{Map, Value};

const MAX_DEPTH: usize = 2;
const MAX_STRING_CHARS: usize = 2000;
const MAX_LIST_ITEMS: usize = 100;
const MAX_SERIALIZED_BYTES: usize = 10 * 1024;

/// 清洗报名表单里的自由 JSON
///
/// Keys starting with `_` or `$` are dropped, strings are cut to 2000
/// characters, lists to 100 items and anything nested deeper than two levels
/// becomes `null`. The cleaned document must serialize to at most 10 KB.
pub fn sanitize_intake_data(data: Option<&Value>) -> Result<Value, AppError> {
    let cleaned = match data {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => sanitize(value, 0),
    };

    let size = serde_json::to_vec(&cleaned)
        .map_err(|e| AppError::internal(format!("intake serialization failed: {}", e)))?
        .len();
    if size > MAX_SERIALIZED_BYTES {
        return Err(AppError::validation("intake_data exceeds 10KB limit"));
    }
    Ok(cleaned)
}

fn sanitize(value: &Value, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return Value::Null;
    }
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !k.starts_with('_') && !k.starts_with('$'))
                .map(|(k, v)| (k.clone(), sanitize(v, depth + 1)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .take(MAX_LIST_ITEMS)
                .map(|v| sanitize(v, depth + 1))
                .collect(),
        ),
        Value::String(s) => Value::String(s.chars().take(MAX_STRING_CHARS).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_drops_private_keys() {
        let input = json!({"name": "Ann", "_internal": 1, "$where": "x"});
        let out = sanitize_intake_data(Some(&input)).unwrap();
        assert_eq!(out, json!({"name": "Ann"}));
    }

    #[test]
    fn test_depth_limit() {
        let input = json!({"a": {"b": {"c": "too deep"}}, "list": [[["x"]]]});
        let out = sanitize_intake_data(Some(&input)).unwrap();
        assert_eq!(out["a"], json!({"b": {"c": null}}));
        assert_eq!(out["list"], json!([[null]]));
    }

    #[test]
    fn test_truncates_strings_and_lists() {
        let long = "x".repeat(2500);
        let list: Vec<i32> = (0..150).collect();
        let input = json!({"bio": long, "items": list});
        let out = sanitize_intake_data(Some(&input)).unwrap();
        assert_eq!(out["bio"].as_str().unwrap().len(), 2000);
        assert_eq!(out["items"].as_array().unwrap().len(), 100);
    }

    #[test]
    fn test_missing_becomes_empty_object() {
        assert_eq!(sanitize_intake_data(None).unwrap(), json!({}));
    }

    #[test]
    fn test_rejects_oversized() {
        let mut map = Map::new();
        for i in 0..10 {
            map.insert(format!("field_{}", i), Value::String("y".repeat(1500)));
        }
        let err = sanitize_intake_data(Some(&Value::Object(map))).unwrap_err();
        assert!(err.to_string().contains("10KB"));
    }
}
