//! Tolerant decoding of model replies into the canonical result shapes.
//!
//! Each stage is tried in order: the whole reply as JSON, a fenced code block,
//! the first embedded JSON object, and finally a line-based heuristic. Missing
//! fields are filled with defaults rather than failing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{RefineError, Result};
use crate::model::{OptionsResult, RefinementResult, GENERIC_FALLBACK};
use crate::util::extract_json_object;

const SUGGESTION_KEYS: &[&str] = &[
    "suggestion",
    "suggestionA",
    "refined_prompt",
    "refinedPrompt",
    "improved_prompt",
    "prompt",
];

const SUGGESTION_LIST_KEYS: &[&str] = &["suggestions", "improved_versions"];

const OPTION_KEYS: &[&str] = &["options", "implementation_options", "choices"];

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("valid regex"));

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*•]|\d+[.)])\s+").expect("valid regex"));

static LABEL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:suggestion|refined prompt|improved prompt)\s*:\s*").expect("valid regex")
});

/// Decode a refinement reply. Never fails.
pub fn decode_refinement(raw: &str) -> RefinementResult {
    match parse_refinement(raw) {
        Ok(result) => result,
        Err(err) => {
            debug!("{}; using line heuristic", err);
            heuristic_refinement(raw)
        }
    }
}

/// Decode an options reply. Malformed replies yield no options.
pub fn decode_options(raw: &str) -> OptionsResult {
    match parse_json_value(raw) {
        Ok(value) => OptionsResult {
            options: options_from_value(&value),
        },
        Err(err) => {
            debug!("{}; returning no options", err);
            OptionsResult::default()
        }
    }
}

/// Structured stage only: a typed failure when the reply holds no JSON at all.
pub fn parse_refinement(raw: &str) -> Result<RefinementResult> {
    let value = parse_json_value(raw)?;
    refinement_from_value(&value).ok_or_else(|| {
        RefineError::MalformedResponse(format!("unexpected JSON shape: {}", value_kind(&value)))
    })
}

fn parse_json_value(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RefineError::MalformedResponse("empty reply".to_string()));
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(block) = CODE_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        if let Ok(value) = serde_json::from_str::<Value>(block.as_str().trim()) {
            return Ok(value);
        }
    }

    if let Some(object) = extract_json_object(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(object) {
            return Ok(value);
        }
    }

    Err(RefineError::MalformedResponse(
        "reply contains no parseable JSON".to_string(),
    ))
}

fn refinement_from_value(value: &Value) -> Option<RefinementResult> {
    match value {
        Value::Object(map) => Some(refinement_from_object(map)),
        Value::Array(items) => match items.first() {
            // An array reply carries the result in its first element
            Some(first) => refinement_from_value(first),
            None => Some(RefinementResult::generic_fallback()),
        },
        Value::String(text) => Some(RefinementResult::new(non_empty_or_fallback(text))),
        _ => None,
    }
}

fn refinement_from_object(map: &Map<String, Value>) -> RefinementResult {
    let suggestion = SUGGESTION_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(text_of))
        .or_else(|| {
            SUGGESTION_LIST_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(|list| list.as_array()?.first().and_then(first_suggestion))
        })
        .unwrap_or_else(|| GENERIC_FALLBACK.to_string());

    RefinementResult {
        suggestion,
        options: options_from_object(map),
    }
}

fn first_suggestion(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => SUGGESTION_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(text_of)),
        other => text_of(other),
    }
}

fn options_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => options_from_object(map),
        Value::Array(items) => match items.first() {
            Some(Value::Object(map)) => options_from_object(map),
            // A bare list of phrases
            Some(Value::String(_)) => strings_of(items),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn options_from_object(map: &Map<String, Value>) -> Vec<String> {
    OPTION_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_array))
        .map(|items| strings_of(items))
        .unwrap_or_default()
}

fn strings_of(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(map) => map.get("text").and_then(text_of),
            other => text_of(other),
        })
        .collect()
}

fn text_of(value: &Value) -> Option<String> {
    let text = value.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn non_empty_or_fallback(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        GENERIC_FALLBACK.to_string()
    } else {
        text.to_string()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Split free text by line: the first plain line is the suggestion, list items
/// become options.
pub fn heuristic_refinement(raw: &str) -> RefinementResult {
    let mut suggestion: Option<String> = None;
    let mut options = Vec::new();

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("```") {
            continue;
        }
        if let Some(marker) = LIST_MARKER.find(line) {
            let item = clean_line(&line[marker.end()..]);
            if !item.is_empty() {
                options.push(item);
            }
            continue;
        }
        if suggestion.is_none() {
            let text = clean_line(&LABEL_PREFIX.replace(line, ""));
            if !text.is_empty() {
                suggestion = Some(text);
            }
        }
    }

    let suggestion = match suggestion {
        Some(text) => text,
        None if !options.is_empty() => options.remove(0),
        None => GENERIC_FALLBACK.to_string(),
    };

    RefinementResult {
        suggestion,
        options,
    }
}

fn clean_line(line: &str) -> String {
    line.trim()
        .trim_matches(|c| c == '"' || c == '“' || c == '”')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_object() {
        let result = decode_refinement(
            r#"{"suggestion": "Add a smooth hover scale", "options": ["with 0.3s ease-out", "with a soft shadow"]}"#,
        );
        assert_eq!(result.suggestion, "Add a smooth hover scale");
        assert_eq!(result.options, vec!["with 0.3s ease-out", "with a soft shadow"]);
    }

    #[test]
    fn test_missing_options_defaults_to_empty() {
        let result = decode_refinement(r#"{"suggestion": "Make the header sticky"}"#);
        assert_eq!(result.suggestion, "Make the header sticky");
        assert!(result.options.is_empty());
    }

    #[test]
    fn test_missing_suggestion_uses_generic_fallback() {
        let result = decode_refinement(r#"{"options": ["with 24px gap"]}"#);
        assert_eq!(result.suggestion, GENERIC_FALLBACK);
        assert_eq!(result.options, vec!["with 24px gap"]);
    }

    #[test]
    fn test_array_uses_first_element() {
        let result = decode_refinement(
            r#"[{"suggestion": "first"}, {"suggestion": "second"}]"#,
        );
        assert_eq!(result.suggestion, "first");
    }

    #[test]
    fn test_array_of_strings_uses_first_string() {
        let result = decode_refinement(r#"["Build a pricing table", "ignored"]"#);
        assert_eq!(result.suggestion, "Build a pricing table");
    }

    #[test]
    fn test_empty_array_uses_generic_fallback() {
        assert_eq!(decode_refinement("[]").suggestion, GENERIC_FALLBACK);
    }

    #[test]
    fn test_alias_fields() {
        assert_eq!(
            decode_refinement(r#"{"suggestionA": "Variant A", "suggestionB": "Variant B"}"#)
                .suggestion,
            "Variant A"
        );
        assert_eq!(
            decode_refinement(r#"{"refined_prompt": "Refined"}"#).suggestion,
            "Refined"
        );
        assert_eq!(
            decode_refinement(r#"{"suggestions": [{"suggestion": "Nested"}]}"#).suggestion,
            "Nested"
        );
        assert_eq!(
            decode_refinement(r#"{"suggestions": ["Listed"]}"#).suggestion,
            "Listed"
        );
    }

    #[test]
    fn test_embedded_object_in_prose() {
        let raw = "Here you go:\n{\"suggestion\": \"Create a dark mode toggle\"}\nLet me know!";
        assert_eq!(decode_refinement(raw).suggestion, "Create a dark mode toggle");
    }

    #[test]
    fn test_fenced_code_block() {
        let raw = "```json\n{\"suggestion\": \"Fenced\", \"options\": [\"a\"]}\n```";
        let result = decode_refinement(raw);
        assert_eq!(result.suggestion, "Fenced");
        assert_eq!(result.options, vec!["a"]);
    }

    #[test]
    fn test_plain_text_falls_back_to_lines() {
        let raw = "Suggestion: Build a responsive navbar with a collapsible menu\n\n- with 0.2s slide animation\n2. supporting keyboard navigation";
        let result = decode_refinement(raw);
        assert_eq!(
            result.suggestion,
            "Build a responsive navbar with a collapsible menu"
        );
        assert_eq!(
            result.options,
            vec!["with 0.2s slide animation", "supporting keyboard navigation"]
        );
    }

    #[test]
    fn test_only_bullets_promotes_first() {
        let result = heuristic_refinement("- first idea\n- second idea");
        assert_eq!(result.suggestion, "first idea");
        assert_eq!(result.options, vec!["second idea"]);
    }

    #[test]
    fn test_empty_reply_uses_generic_fallback() {
        let result = decode_refinement("   ");
        assert_eq!(result.suggestion, GENERIC_FALLBACK);
        assert!(result.options.is_empty());
    }

    #[test]
    fn test_parse_refinement_reports_malformed() {
        let err = parse_refinement("not json at all").unwrap_err();
        assert!(matches!(err, RefineError::MalformedResponse(_)));
        let err = parse_refinement("42").unwrap_err();
        assert!(err.to_string().contains("number"));
    }

    #[test]
    fn test_decode_options_shapes() {
        assert_eq!(
            decode_options(r#"{"options": ["a", "b"]}"#).options,
            vec!["a", "b"]
        );
        assert_eq!(
            decode_options(r#"[{"options": ["from array"]}]"#).options,
            vec!["from array"]
        );
        assert_eq!(decode_options(r#"["x", "y"]"#).options, vec!["x", "y"]);
        assert_eq!(
            decode_options(r#"{"implementation_options": [{"text": "t"}]}"#).options,
            vec!["t"]
        );
    }

    #[test]
    fn test_decode_options_malformed_is_empty() {
        assert!(decode_options("sorry, I can't help").options.is_empty());
        assert!(decode_options(r#"{"options": "not a list"}"#).options.is_empty());
    }
}
