//! Helpers for pulling structured content out of free-form model replies.
//!
//! Chat models are instructed to answer with a single JSON object, but in
//! practice replies arrive fenced, prefixed with prose, or as a bare quoted
//! sentence wrapped in braces. These helpers recover the payload without
//! ever panicking on garbage.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").unwrap());
static FIRST_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)(\{.*?\})").unwrap());
static QUOTED_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)^\{\s*"?(.*?)"?\s*\}$"#).unwrap());

/// Extract a JSON object from a ```json fenced block.
pub fn extract_json_from_string(text: &str) -> Option<Value> {
    let captures = FENCED_JSON.captures(text)?;
    serde_json::from_str(captures.get(1)?.as_str()).ok()
}

/// Recover the structured speech payload from a model reply.
///
/// Tries, in order:
/// 1. the first `{...}` block parsed as JSON,
/// 2. the `{"just a sentence"}` shape some models emit, rewritten to a
///    proper `{"SampleSpeech": ...}` object.
///
/// Returns `None` when no object can be recovered.
pub fn extract_speech_payload(response: &str) -> Option<Value> {
    let captures = FIRST_OBJECT.captures(response)?;
    let extracted = captures.get(1)?.as_str();

    if let Ok(value) = serde_json::from_str::<Value>(extracted) {
        return Some(value);
    }

    let fallback = QUOTED_SENTENCE.captures(extracted)?;
    let sentence = fallback.get(1)?.as_str().trim_matches('"').trim();
    if sentence.is_empty() {
        return None;
    }
    Some(json!({ "SampleSpeech": sentence }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_parses() {
        let text = "Here you go:\n```json\n{\"SampleSpeech\": \"Hello!\"}\n```";
        let value = extract_json_from_string(text).unwrap();
        assert_eq!(value["SampleSpeech"], "Hello!");
    }

    #[test]
    fn bare_object_parses() {
        let value = extract_speech_payload("{\"SampleSpeech\": \"Good day.\"}").unwrap();
        assert_eq!(value["SampleSpeech"], "Good day.");
    }

    #[test]
    fn object_with_leading_prose_parses() {
        let value =
            extract_speech_payload("Sure! {\"SampleSpeech\": \"Meow! Hello!\"} Enjoy.").unwrap();
        assert_eq!(value["SampleSpeech"], "Meow! Hello!");
    }

    #[test]
    fn quoted_sentence_fallback() {
        let value = extract_speech_payload("{\"Good afternoon, Senpai.\"}").unwrap();
        assert_eq!(value["SampleSpeech"], "Good afternoon, Senpai.");
    }

    #[test]
    fn garbage_yields_none() {
        assert!(extract_speech_payload("no json here").is_none());
        assert!(extract_speech_payload("").is_none());
    }
}
