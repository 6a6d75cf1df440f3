//! Recover a JSON value from free-form model output.
//!
//! Models wrap JSON in prose or markdown fences even when asked not to. The
//! layers below run in order and the first one that yields valid JSON wins.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

const PREVIEW_CHARS: usize = 300;

static FENCED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced block pattern is valid")
});

static BRACED_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("brace span pattern is valid"));

/// A single extraction strategy.
pub type ExtractionLayer = fn(&str) -> Option<Value>;

/// Strategies in the order they are tried.
pub const EXTRACTION_LAYERS: &[(&str, ExtractionLayer)] = &[
    ("whole_text", parse_whole),
    ("fenced_block", parse_fenced),
    ("braced_span", parse_braced),
];

#[derive(Debug, Clone, thiserror::Error)]
#[error("Could not extract valid JSON from model response: {preview}")]
pub struct ExtractJsonError {
    pub preview: String,
}

/// Run every layer against `text` and return the first parsed value.
pub fn extract_json(text: &str) -> Result<Value, ExtractJsonError> {
    let text = text.trim();
    for (name, layer) in EXTRACTION_LAYERS {
        if let Some(value) = layer(text) {
            tracing::debug!(layer = name, "Recovered JSON from model output");
            return Ok(value);
        }
    }

    Err(ExtractJsonError {
        preview: text.chars().take(PREVIEW_CHARS).collect(),
    })
}

/// The whole text is a JSON document.
pub fn parse_whole(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

/// A fenced code block, optionally tagged `json`, holding an object.
pub fn parse_fenced(text: &str) -> Option<Value> {
    let captures = FENCED_OBJECT.captures(text)?;
    serde_json::from_str(captures.get(1)?.as_str()).ok()
}

/// Everything from the first `{` to the last `}`.
pub fn parse_braced(text: &str) -> Option<Value> {
    let span = BRACED_SPAN.find(text)?;
    serde_json::from_str(span.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FENCED_REPLY: &str = "Sure! Here's the analysis:\n```json\n{\"match_score\": 62, \"matched_skills\": [\"Python\"], \"missing_skills\": [\"Docker\"], \"suggestions\": [\"Add Docker experience\",\"Mention AWS\",\"Quantify impact\"]}\n```";

    #[test]
    fn test_whole_text_layer() {
        assert_eq!(parse_whole("  {\"a\": 1}\n"), Some(json!({"a": 1})));
        assert_eq!(parse_whole("120"), Some(json!(120)));
        assert_eq!(parse_whole("Here you go: {\"a\": 1}"), None);
    }

    #[test]
    fn test_fenced_layer_with_and_without_tag() {
        assert_eq!(parse_fenced(FENCED_REPLY).unwrap()["match_score"], json!(62));
        assert_eq!(
            parse_fenced("text\n```\n{\"b\": [1, 2]}\n```\nmore"),
            Some(json!({"b": [1, 2]}))
        );
        assert_eq!(parse_fenced("```json\nnot json\n```"), None);
        assert_eq!(parse_fenced("{\"a\": 1}"), None);
    }

    #[test]
    fn test_braced_layer_spans_newlines() {
        let text = "The result is\n{\n  \"a\": {\"nested\": true}\n}\nHope this helps.";
        assert_eq!(parse_braced(text), Some(json!({"a": {"nested": true}})));
    }

    #[test]
    fn test_braced_layer_is_greedy() {
        // Two objects separated by prose form one invalid span.
        assert_eq!(parse_braced("{\"a\": 1} and {\"b\": 2}"), None);
        assert_eq!(parse_braced("no braces at all"), None);
    }

    #[test]
    fn test_chain_prefers_earlier_layers() {
        // The whole text parses, so the fenced layer is never consulted.
        let value = extract_json("{\"note\": \"```json {\\\"x\\\": 1} ```\"}").unwrap();
        assert!(value.get("note").is_some());

        let value = extract_json(FENCED_REPLY).unwrap();
        assert_eq!(value["matched_skills"], json!(["Python"]));
    }

    #[test]
    fn test_chain_falls_through_to_braced_span() {
        let value = extract_json("Analysis follows {\"match_score\": 10} end").unwrap();
        assert_eq!(value, json!({"match_score": 10}));
    }

    #[test]
    fn test_failure_reports_truncated_preview() {
        let garbage = "I cannot help with that. ".repeat(40);
        let err = extract_json(&garbage).unwrap_err();
        assert_eq!(err.preview.chars().count(), 300);
        assert!(err
            .to_string()
            .starts_with("Could not extract valid JSON from model response: "));
    }

    #[test]
    fn test_empty_text_fails() {
        assert!(extract_json("").is_err());
        assert!(extract_json("   ").is_err());
    }
}
