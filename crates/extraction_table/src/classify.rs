use serde_json::Value;

use crate::lines::{json_fragment, key_value, pipe_cells, prepare_text};

/// Cheap check for whether an extraction result is worth offering as a
/// table. Never fails; unrecognized input is simply `false`.
pub fn is_extraction_response(raw: &str) -> bool {
    let text = prepare_text(raw);
    if text.is_empty() {
        return false;
    }

    if let Ok(value) = serde_json::from_str::<Value>(&text) {
        return match value {
            Value::Array(items) => items
                .iter()
                .any(|item| item.as_object().is_some_and(|object| !object.is_empty())),
            Value::Object(object) => object.values().filter(|v| !v.is_null()).count() > 1,
            _ => false,
        };
    }

    let mut key_values = 0usize;
    let mut pipe_lines = 0usize;
    for line in text.lines() {
        if json_fragment(line).is_some() {
            return true;
        }
        if key_value(line).is_some() {
            key_values += 1;
        }
        if pipe_cells(line).is_some() {
            pipe_lines += 1;
        }
        if key_values >= 2 || pipe_lines >= 2 {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_json_arrays_with_fields() {
        assert!(is_extraction_response(r#"[{"a":1}]"#));
        assert!(is_extraction_response(r#"[{}, {"a":1}]"#));
        assert!(!is_extraction_response(r#"[{}]"#));
        assert!(!is_extraction_response(r#"[]"#));
        assert!(!is_extraction_response(r#"["a","b"]"#));
    }

    #[test]
    fn single_object_needs_two_defined_fields() {
        assert!(is_extraction_response(r#"{"a":1,"b":"x"}"#));
        assert!(!is_extraction_response(r#"{"a":1,"b":null}"#));
        assert!(!is_extraction_response(r#"{"a":1}"#));
    }

    #[test]
    fn accepts_text_conventions() {
        assert!(is_extraction_response("Court: High Court\nBench: Single"));
        assert!(is_extraction_response("| a | b |\n| 1 | 2 |"));
        assert!(is_extraction_response("Result follows\n{\"a\": 1}"));
        assert!(is_extraction_response("Court: High [[C:1]]\nJudge: Rao [[C:2]]"));
    }

    #[test]
    fn rejects_prose() {
        assert!(!is_extraction_response("Just one line: here"));
        assert!(!is_extraction_response("The agreement is valid."));
        assert!(!is_extraction_response("   "));
    }
}
