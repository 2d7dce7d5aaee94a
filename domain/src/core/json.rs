//! Lenient extraction of JSON objects from free-form model output.
//!
//! Providers answer with a JSON object that may be wrapped in a fenced code
//! block or surrounded by prose. These helpers never fail; callers decide
//! the fallback when nothing usable is found.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Locate the most plausible JSON object in `response`.
///
/// Tries, in order: a ```json fenced block, any fenced block, then the span
/// from the first `{` to the last `}`.
pub fn extract_json_object(response: &str) -> Option<Value> {
    for candidate in fenced_blocks(response) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate.trim())
            && value.is_object()
        {
            return Some(value);
        }
    }

    if let Some(start) = response.find('{')
        && let Some(end) = response.rfind('}')
        && end > start
        && let Ok(value) = serde_json::from_str::<Value>(&response[start..=end])
        && value.is_object()
    {
        return Some(value);
    }

    None
}

/// Same as [`extract_json_object`] but decodes into `T`.
pub fn extract_json<T: DeserializeOwned>(response: &str) -> Option<T> {
    extract_json_object(response).and_then(|v| serde_json::from_value(v).ok())
}

/// Read a numeric field that models sometimes emit as a string.
pub fn lenient_f64(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
    .filter(|x: &f64| x.is_finite())
}

/// Read a string field, trimming whitespace; empty strings count as absent.
pub fn lenient_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn fenced_blocks(response: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = response;
    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        // skip the language tag line
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        match body.find("```") {
            Some(close) => {
                blocks.push(&body[..close]);
                rest = &body[close + 3..];
            }
            None => break,
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_object() {
        let v = extract_json_object(r#"{"action": "decide"}"#).unwrap();
        assert_eq!(v["action"], "decide");
    }

    #[test]
    fn test_extract_fenced_object() {
        let response = "Here you go:\n```json\n{\"action\": \"recall_memory\"}\n```\nThanks";
        let v = extract_json_object(response).unwrap();
        assert_eq!(v["action"], "recall_memory");
    }

    #[test]
    fn test_extract_object_in_prose() {
        let response = "I think {\"score\": 0.7, \"x\": {\"y\": 1}} is right";
        let v = extract_json_object(response).unwrap();
        assert_eq!(v["x"]["y"], 1);
    }

    #[test]
    fn test_extract_garbage() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("} backwards {").is_none());
        assert!(extract_json_object("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_lenient_fields() {
        let v: Value = serde_json::json!({"a": "0.5", "b": 0.25, "c": "70%", "d": "  ", "e": "nan"});
        assert_eq!(lenient_f64(&v, "a"), Some(0.5));
        assert_eq!(lenient_f64(&v, "b"), Some(0.25));
        assert_eq!(lenient_f64(&v, "c"), Some(70.0));
        assert_eq!(lenient_f64(&v, "e"), None);
        assert_eq!(lenient_str(&v, "d"), None);
    }
}
