//! Best-effort extraction of a JSON object from free completion text.
//!
//! Models asked for "strictly JSON" still wrap their answer in code
//! fences, prose, or both. This module finds the outermost balanced
//! `{...}` span (ignoring braces inside string literals) and hands it
//! to serde for strict parsing. All three completion-consuming roles
//! share it; each applies its own fallback when extraction fails.

use serde::de::DeserializeOwned;

/// Find the outermost balanced JSON object in `text`, if any.
pub fn find_json_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if depth > 0 && in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let s = start?;
                    return Some(&text[s..i + c.len_utf8()]);
                }
            }
            '"' if depth > 0 => in_string = true,
            _ => {}
        }
    }

    None
}

/// Extract and deserialize a decision object from completion text.
///
/// Returns `None` when no balanced object exists or when the object
/// does not deserialize into `T`; callers apply their role-specific
/// fallback policy.
pub fn extract_decision<T: DeserializeOwned>(text: &str) -> Option<T> {
    let candidate = find_json_object(text)?;
    match serde_json::from_str(candidate) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("decision JSON failed to deserialize: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Decision {
        mode: String,
    }

    #[test]
    fn bare_object() {
        let found = find_json_object(r#"{"mode": "chat"}"#).unwrap();
        assert_eq!(found, r#"{"mode": "chat"}"#);
    }

    #[test]
    fn object_inside_code_fence() {
        let text = "Here you go:\n```json\n{\"mode\": \"task\"}\n```\nDone.";
        let decision: Decision = extract_decision(text).unwrap();
        assert_eq!(decision.mode, "task");
    }

    #[test]
    fn object_surrounded_by_prose() {
        let text = "I think this is a task. {\"mode\": \"task\"} Hope that helps!";
        let decision: Decision = extract_decision(text).unwrap();
        assert_eq!(decision.mode, "task");
    }

    #[test]
    fn nested_objects_balance() {
        let text = r#"{"a": {"b": {"c": 1}}, "mode": "chat"}"#;
        assert_eq!(find_json_object(text).unwrap(), text);
    }

    #[test]
    fn braces_inside_strings_ignored() {
        let text = r#"{"mode": "task", "note": "use {braces} and \"quotes\" freely }{"}"#;
        assert_eq!(find_json_object(text).unwrap(), text);
        let decision: Decision = extract_decision(text).unwrap();
        assert_eq!(decision.mode, "task");
    }

    #[test]
    fn no_object_returns_none() {
        assert!(find_json_object("just plain prose").is_none());
        assert!(extract_decision::<Decision>("nothing here").is_none());
    }

    #[test]
    fn unbalanced_object_returns_none() {
        assert!(find_json_object(r#"{"mode": "chat""#).is_none());
    }

    #[test]
    fn wrong_shape_returns_none() {
        // Balanced JSON that doesn't match the target type.
        assert!(extract_decision::<Decision>(r#"{"other": 1}"#).is_none());
    }
}
