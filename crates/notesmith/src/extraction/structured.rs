//! JSON flattening.
//!
//! Parses JSON and renders it as one `path: value` line per scalar, in document
//! order. Nested keys are joined with `.`, array items use `key[i]`, and items of
//! a top-level array use `item_i`. String values are trimmed; nulls and blank
//! strings are dropped.
//!
//! The rendering only depends on the parsed value, so the same payload always
//! yields byte-identical text.
//!
//! # Example
//!
//! ```rust
//! use notesmith::extraction::structured::extract_json;
//!
//! # fn example() -> notesmith::Result<()> {
//! let json = br#"{"changes": ["Fixed bug A", "Added feature B"]}"#;
//! let text = extract_json(json, "changes.json")?;
//!
//! assert_eq!(text, "changes[0]: Fixed bug A\nchanges[1]: Added feature B");
//! # Ok(())
//! # }
//! ```
use crate::error::ExtractionError;
use crate::types::{MediaKind, StructuredFormat};
use crate::Result;
use serde_json::Value;

pub fn extract_json(bytes: &[u8], filename: &str) -> Result<String> {
    let payload = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);

    let value: Value = serde_json::from_slice(payload).map_err(|e| ExtractionError::Malformed {
        filename: filename.to_string(),
        byte_len: bytes.len(),
        reason: format!("invalid JSON: {}", e),
    })?;

    let mut lines = Vec::new();
    flatten_value(&value, "", &mut lines);

    if lines.is_empty() {
        return Err(ExtractionError::Empty {
            filename: filename.to_string(),
            byte_len: bytes.len(),
            kind: MediaKind::Structured(StructuredFormat::Json),
        }
        .into());
    }

    Ok(lines.join("\n"))
}

fn flatten_value(value: &Value, prefix: &str, lines: &mut Vec<String>) {
    match value {
        Value::Object(obj) => {
            for (key, val) in obj {
                let full_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_value(val, &full_key, lines);
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                let item_key = if prefix.is_empty() {
                    format!("item_{}", i)
                } else {
                    format!("{}[{}]", prefix, i)
                };
                flatten_value(item, &item_key, lines);
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() {
                lines.push(scalar_line(prefix, s));
            }
        }
        Value::Number(n) => lines.push(scalar_line(prefix, &n.to_string())),
        Value::Bool(b) => lines.push(scalar_line(prefix, &b.to_string())),
        Value::Null => {}
    }
}

fn scalar_line(prefix: &str, value: &str) -> String {
    if prefix.is_empty() {
        value.to_string()
    } else {
        format!("{}: {}", prefix, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotesmithError;

    #[test]
    fn test_changes_array() {
        let text = extract_json(br#"{"changes":["Fixed bug A","Added feature B"]}"#, "c.json").unwrap();
        assert_eq!(text, "changes[0]: Fixed bug A\nchanges[1]: Added feature B");
    }

    #[test]
    fn test_document_order_is_preserved() {
        let text = extract_json(br#"{"zeta": 1, "alpha": {"beta": true, "gamma": "x"}}"#, "o.json").unwrap();
        assert_eq!(text, "zeta: 1\nalpha.beta: true\nalpha.gamma: x");
    }

    #[test]
    fn test_top_level_array() {
        let text = extract_json(br#"[{"title": "Login fix"}, "Plain entry"]"#, "a.json").unwrap();
        assert_eq!(text, "item_0.title: Login fix\nitem_1: Plain entry");
    }

    #[test]
    fn test_nulls_and_blank_strings_skipped() {
        let text = extract_json(br#"{"a": null, "b": "  ", "c": "kept", "d": []}"#, "n.json").unwrap();
        assert_eq!(text, "c: kept");
    }

    #[test]
    fn test_string_values_are_trimmed() {
        let text = extract_json(br#"{"note": "   Fixed bug A  ", "top": "\n\tAdded B"}"#, "t.json").unwrap();
        assert_eq!(text, "note: Fixed bug A\ntop: Added B");
        assert_eq!(extract_json(br#""          Fixed bug A""#, "s.json").unwrap(), "Fixed bug A");
    }

    #[test]
    fn test_top_level_scalar() {
        assert_eq!(extract_json(br#""just a note""#, "s.json").unwrap(), "just a note");
        assert_eq!(extract_json(b"42", "n.json").unwrap(), "42");
    }

    #[test]
    fn test_deterministic_output() {
        let payload = br#"{"release": "2.0", "items": [{"id": 1, "note": "A"}, {"id": 2, "note": "B"}], "ok": false}"#;
        let first = extract_json(payload, "r.json").unwrap();
        let second = extract_json(payload, "r.json").unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_bom_is_tolerated() {
        let text = extract_json(b"\xef\xbb\xbf{\"k\": \"v\"}", "bom.json").unwrap();
        assert_eq!(text, "k: v");
    }

    #[test]
    fn test_malformed_json() {
        let err = extract_json(br#"{"changes": ["unterminated"#, "bad.json").unwrap_err();
        match err {
            NotesmithError::Extraction(ExtractionError::Malformed { filename, reason, .. }) => {
                assert_eq!(filename, "bad.json");
                assert!(reason.contains("invalid JSON"));
            }
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_structures_are_empty() {
        for payload in [&b"{}"[..], b"[]", b"null", br#"{"a": {"b": null}}"#] {
            assert!(matches!(
                extract_json(payload, "e.json"),
                Err(NotesmithError::Extraction(ExtractionError::Empty { .. }))
            ));
        }
    }
}
