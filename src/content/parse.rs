//! Helpers for pulling usable data out of free-form model output.

use crate::technique::{dedup_techniques, Technique};
use serde_json::Value;

/// Phrases that show up when a model (or our own last resort) returns a
/// generic sentence instead of a real rewrite
const PLACEHOLDER_MARKERS: &[&str] = &[
    "neutral version of the content",
    "balanced, fact-based discussion about",
];

/// Drop Markdown code fences such as ```json ... ```
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Slice from the first `{` to the last `}`, if there is one
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Parse the JSON object embedded in a model response
pub fn parse_json_response(text: &str) -> Result<Value, String> {
    let stripped = strip_code_fences(text);
    let candidate = extract_json_object(&stripped).unwrap_or(&stripped);

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(_) => Err("response is not a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON in response: {}", e)),
    }
}

/// Read an integer from a number or from the leading digits of a string
/// ("70", "70%", " 85 points")
pub fn parse_leading_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s),
            };
            let digits: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}

/// Non-empty string field of a JSON object
pub fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Known techniques in a JSON array field; unknown entries are dropped
pub fn technique_list(value: &Value, key: &str) -> Vec<Technique> {
    let parsed: Vec<Technique> = value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|s| s.parse().ok())
                .collect()
        })
        .unwrap_or_default();

    dedup_techniques(&parsed)
}

/// Remove wrapping quotes, code fences and a leading "Neutral version:" label
pub fn clean_rewrite(text: &str) -> String {
    let stripped = strip_code_fences(text);
    let mut cleaned = trim_quotes(&stripped);

    for prefix in ["neutral version:", "neutral version", "rewrite:"] {
        let matches = cleaned
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches {
            cleaned = cleaned[prefix.len()..].trim();
            break;
        }
    }

    trim_quotes(cleaned).to_string()
}

fn trim_quotes(text: &str) -> &str {
    text.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '“' | '”'))
        .trim()
}

pub fn looks_like_placeholder(text: &str) -> bool {
    let lower = text.to_lowercase();
    PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_inside_fences_and_prose() {
        let raw = "Sure! Here you go:\n```json\n{\"explanation\": \"x\", \"manipulationLevel\": 70}\n```\nHope that helps";
        let value = parse_json_response(raw).unwrap();
        assert_eq!(value["explanation"], "x");
        assert_eq!(value["manipulationLevel"], 70);
    }

    #[test]
    fn test_parse_json_rejects_garbage() {
        assert!(parse_json_response("no json here").is_err());
        assert!(parse_json_response("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int(&json!(70)), Some(70));
        assert_eq!(parse_leading_int(&json!(72.9)), Some(72));
        assert_eq!(parse_leading_int(&json!("85%")), Some(85));
        assert_eq!(parse_leading_int(&json!("-5")), Some(-5));
        assert_eq!(parse_leading_int(&json!("high")), None);
        assert_eq!(parse_leading_int(&json!(null)), None);
    }

    #[test]
    fn test_technique_list_filters_unknown() {
        let value = json!({"techniques": ["bandwagon", "strawman", "Ad hominem", "bandwagon", 3]});
        assert_eq!(
            technique_list(&value, "techniques"),
            vec![Technique::Bandwagon, Technique::AdHominem]
        );
        assert!(technique_list(&value, "missing").is_empty());
    }

    #[test]
    fn test_clean_rewrite() {
        assert_eq!(
            clean_rewrite("\"Neutral version: Coffee can be enjoyed in moderation.\""),
            "Coffee can be enjoyed in moderation."
        );
        assert_eq!(
            clean_rewrite("```\nRegular study habits help.\n```"),
            "Regular study habits help."
        );
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(looks_like_placeholder(
            "A balanced, fact-based discussion about coffee."
        ));
        assert!(!looks_like_placeholder("Coffee is popular in the morning."));
    }
}
