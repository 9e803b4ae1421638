//! Usability verdicts over raw description input.
//!
//! Inbound requests carry descriptions of unknown shape: absent, a bare
//! string, an empty list, or a list whose values are all blank. The
//! normalizer decides whether the input is usable as-is; it never repairs,
//! reorders, or rewrites anything. Unusable input is not an error — the
//! manager routes it to default-persona rotation instead.

use serde_json::Value;

use crate::character::description::Description;

/// True when the record holds at least one present value.
///
/// A string value counts when it is non-blank after trimming. Non-string
/// values (numbers, lists, nested objects) always count as present.
/// Records that are not objects hold nothing.
fn has_present_value(item: &Value) -> bool {
    match item.as_object() {
        Some(obj) => obj.values().any(|value| match value.as_str() {
            Some(s) => !s.trim().is_empty(),
            None => true,
        }),
        None => false,
    }
}

/// Decide whether raw description input can be used as-is.
///
/// Not a sequence, an empty sequence, or a sequence with no present value
/// anywhere is unusable. One present value anywhere makes the whole input
/// usable, even when sibling records are blank.
pub fn is_usable(raw: &Value) -> bool {
    match raw.as_array() {
        Some(items) if !items.is_empty() => items.iter().any(has_present_value),
        _ => false,
    }
}

/// Return the input unchanged when usable, `None` otherwise.
pub fn normalize(raw: Value) -> Option<Description> {
    if !is_usable(&raw) {
        return None;
    }
    match raw {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_sequence_input_is_unusable() {
        assert!(!is_usable(&json!("0")));
        assert!(!is_usable(&json!(42)));
        assert!(!is_usable(&json!({"Name": "Airi"})));
        assert!(!is_usable(&Value::Null));
    }

    #[test]
    fn empty_sequence_is_unusable() {
        assert!(!is_usable(&json!([])));
    }

    #[test]
    fn all_blank_values_are_unusable() {
        assert!(!is_usable(&json!([{"Name": "   "}, {"Gender": ""}])));
    }

    #[test]
    fn one_present_value_makes_the_input_usable() {
        assert!(is_usable(&json!([{"Name": "   "}, {"Personality": "Brave"}])));
    }

    #[test]
    fn non_string_values_count_as_present() {
        assert!(is_usable(&json!([{"Traits": ["calm", "shy"]}])));
        assert!(is_usable(&json!([{"Age": 17}])));
    }

    #[test]
    fn non_object_items_hold_nothing_but_do_not_crash() {
        assert!(!is_usable(&json!(["stray", 3, null])));
        assert!(is_usable(&json!(["stray", {"Name": "Airi"}])));
    }

    #[test]
    fn normalize_passes_usable_input_through_unchanged() {
        let raw = json!([{"Name": "Airi"}, {"Gender": "Female"}]);
        let normalized = normalize(raw.clone()).unwrap();
        assert_eq!(Value::Array(normalized), raw);
    }

    #[test]
    fn normalize_rejects_unusable_input() {
        assert!(normalize(json!([])).is_none());
        assert!(normalize(json!("0")).is_none());
    }
}
