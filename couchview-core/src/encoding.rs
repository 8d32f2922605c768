//! JSON text encoding for view keys (`key`, `startkey`, `endkey`).
//!
//! CouchDB expects these query parameters as JSON text. Structured values
//! (arrays, objects) go through as compact JSON. Scalars are serialized and
//! then wrapped in double quotes unless the text already starts with `[` or
//! is already quoted, so `"a string"` stays `"a string"` and `12` becomes
//! `"12"`. A top-level `null` is the literal `null`.

use crate::error::{CouchError, CouchResult};
use serde::Serialize;
use serde_json::Value;

/// Encode a single key value.
pub fn encode_key(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
        scalar => check_quoting(scalar.to_string()),
    }
}

/// Encode several values as one compound (array) key: `[a, b, ...]`.
///
/// `null` elements are kept inside the array; only a top-level null
/// short-circuits in [`encode_key`].
pub fn encode_compound_key(values: &[Value]) -> String {
    Value::Array(values.to_vec()).to_string()
}

/// Serialize any value first, then encode it as a key.
pub fn try_encode_key<T: Serialize + ?Sized>(value: &T) -> CouchResult<String> {
    let value = serde_json::to_value(value)
        .map_err(|e| CouchError::encoding_with("key is not representable as JSON", e))?;
    Ok(encode_key(&value))
}

fn check_quoting(text: String) -> String {
    if text.starts_with('[') || is_quoted(&text) {
        text
    } else {
        format!("\"{}\"", text)
    }
}

fn is_quoted(text: &str) -> bool {
    text.len() >= 2 && text.starts_with('"') && text.ends_with('"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_null_is_bare() {
        assert_eq!(encode_key(&Value::Null), "null");
    }

    #[test]
    fn test_string_is_quoted_once() {
        assert_eq!(encode_key(&json!("a string")), "\"a string\"");
    }

    #[test]
    fn test_numbers_and_booleans_are_quoted() {
        assert_eq!(encode_key(&json!(12)), "\"12\"");
        assert_eq!(encode_key(&json!(-12.5)), "\"-12.5\"");
        assert_eq!(encode_key(&json!(true)), "\"true\"");
        assert_eq!(encode_key(&json!(false)), "\"false\"");
    }

    #[test]
    fn test_structures_pass_through_compact() {
        assert_eq!(encode_key(&json!(["one", "two"])), r#"["one","two"]"#);
        assert_eq!(
            encode_key(&json!({"one": "two", "three": "four"})),
            r#"{"one":"two","three":"four"}"#
        );
    }

    #[test]
    fn test_compound_key_keeps_null_elements() {
        let key = encode_compound_key(&[json!("one"), Value::Null, json!(2)]);
        assert_eq!(key, r#"["one",null,2]"#);
    }

    #[test]
    fn test_string_escapes_survive() {
        assert_eq!(encode_key(&json!("say \"hi\"")), r#""say \"hi\"""#);
    }

    #[test]
    fn test_try_encode_serializable() {
        let mut map = BTreeMap::new();
        map.insert("make", "Yugo");
        assert_eq!(try_encode_key(&map).unwrap(), r#"{"make":"Yugo"}"#);
        assert_eq!(try_encode_key("Intel").unwrap(), "\"Intel\"");
        assert_eq!(try_encode_key(&None::<u32>).unwrap(), "null");
    }

    #[test]
    fn test_try_encode_rejects_unrepresentable() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], "non-string key");
        let err = try_encode_key(&map).unwrap_err();
        assert!(matches!(err, CouchError::EncodingFailure { .. }));
    }
}
