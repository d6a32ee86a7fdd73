//! Readers for untyped object trees
//!
//! Numbers in dynamic objects arrive as integers or floats depending on the
//! serializer that produced them; every numeric reader here accepts both.

use serde_json::Value;

/// Walk `path` through nested objects
pub fn field<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(*key))
}

/// Integer from an integer or float encoding
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

pub fn int_at(value: &Value, path: &[&str]) -> Option<i64> {
    field(value, path).and_then(as_int)
}

pub fn i32_at(value: &Value, path: &[&str]) -> Option<i32> {
    int_at(value, path).and_then(|n| i32::try_from(n).ok())
}

pub fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    field(value, path).and_then(Value::as_str)
}

/// String entries of an array, skipping non-strings
pub fn strings_at(value: &Value, path: &[&str]) -> Vec<String> {
    field(value, path)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Array entries, or an empty slice
pub fn array_at<'a>(value: &'a Value, path: &[&str]) -> &'a [Value] {
    field(value, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// String-to-string map, skipping non-string values
pub fn string_map_at(
    value: &Value,
    path: &[&str],
) -> std::collections::BTreeMap<String, String> {
    field(value, path)
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_ints_from_both_encodings() {
        let v = json!({"spec": {"replicas": 3}, "status": {"readyReplicas": 2.0}});
        assert_eq!(i32_at(&v, &["spec", "replicas"]), Some(3));
        assert_eq!(i32_at(&v, &["status", "readyReplicas"]), Some(2));
        assert_eq!(i32_at(&v, &["status", "missing"]), None);
    }

    #[test]
    fn rejects_non_numbers() {
        let v = json!({"port": "80"});
        assert_eq!(int_at(&v, &["port"]), None);
    }

    #[test]
    fn collects_strings_and_maps() {
        let v = json!({
            "hosts": ["a", 1, "b"],
            "selector": {"matchLabels": {"app": "web", "n": 1}}
        });
        assert_eq!(strings_at(&v, &["hosts"]), vec!["a", "b"]);
        let labels = string_map_at(&v, &["selector", "matchLabels"]);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels["app"], "web");
        assert!(array_at(&v, &["nope"]).is_empty());
    }
}
