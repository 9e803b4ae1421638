//! Canonical character descriptions and attribute extraction.
//!
//! A description is an ordered sequence of single-key JSON objects such as
//! `[{"Name": "Airi"}, {"Gender": "Female"}]`. Order is insertion order and
//! is meaningful for prompt assembly, so nothing here ever re-sorts or
//! rewrites a description. Persona identity is the trimmed string value
//! under `"Name"`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

/// An ordered sequence of single-key attribute records.
pub type Description = Vec<Value>;

/// The attribute key that defines persona identity.
pub const NAME_KEY: &str = "Name";

/// Literal placeholder returned when a named attribute cannot be found.
///
/// Downstream callers compare against this string, so it is part of the
/// public contract and must not change.
pub const UNKNOWN_VALUE: &str = "unknown";

/// Find the first non-blank string value stored under `key`.
///
/// Walks the records in order and returns the trimmed value of the first
/// entry whose key matches exactly and whose value is a non-blank string.
/// Records that are not objects, and values that are not strings, are
/// skipped without error.
pub fn extract_value(description: &[Value], key: &str) -> Option<String> {
    for item in description {
        if let Some(value) = item.as_object().and_then(|obj| obj.get(key)) {
            if let Some(s) = value.as_str() {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

/// [`extract_value`] with the [`UNKNOWN_VALUE`] sentinel on failure.
///
/// This is the outer-edge form used for logging, file naming, and record
/// lookups; callers that need to branch on absence should prefer
/// [`extract_value`].
pub fn extract_value_from_description(description: &[Value], key: &str) -> String {
    extract_value(description, key).unwrap_or_else(|| UNKNOWN_VALUE.to_string())
}

/// Shorthand for the common `"Name"` lookup.
pub fn extract_name(description: &[Value]) -> String {
    extract_value_from_description(description, NAME_KEY)
}

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:her|his|my)?\s*name\s*is\s*([A-Z][a-z]+)").unwrap());
static GENDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(she|her|female|girl|woman|he|his|male|boy|man)\b").unwrap());
static PERSONALITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(gentle|kind|shy|cheerful|calm|serious|brave|cute|elegant|sweet|cool|happy|moody)\b",
    )
    .unwrap()
});

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Parse a character description out of free text.
///
/// Recognizes phrases like "Her name is Jessica. She's a gentle female
/// character." and produces `[{"Name": "Jessica"}, {"Gender": "Female"},
/// {"Personality": "Gentle"}]`. Attributes that cannot be found are simply
/// omitted; unrecognizable input yields an empty description, which the
/// normalizer then routes to default rotation.
pub fn parse_description_from_text(input: &str) -> Description {
    let mut description = Description::new();

    if let Some(captures) = NAME_PATTERN.captures(input) {
        description.push(json!({ NAME_KEY: &captures[1] }));
    }

    if let Some(captures) = GENDER_PATTERN.captures(input) {
        let gender = match captures[1].to_lowercase().as_str() {
            "she" | "her" | "female" | "girl" | "woman" => "Female",
            _ => "Male",
        };
        description.push(json!({ "Gender": gender }));
    }

    if let Some(captures) = PERSONALITY_PATTERN.captures(input) {
        description.push(json!({ "Personality": capitalize(&captures[1]) }));
    }

    description
}
