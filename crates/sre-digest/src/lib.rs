// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical JSON serialization and result digests.
//!
//! This is the single point of truth for inter-component agreement: the
//! executor, the verifier and any independent watcher must all hash the
//! same bytes for the same logical result, or every order diverges. The
//! canonical form is:
//!
//! - object keys sorted in lexicographic byte order
//! - no insignificant whitespace between tokens
//! - strings as UTF-8 with the minimal JSON escape set
//! - integers without leading zeros, floats in shortest round-trip form
//! - no trailing commas
//!
//! The digest is SHA-256 over the UTF-8 encoding of that serialization.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Produce the canonical serialization of a JSON value.
///
/// Scalar tokens are delegated to `serde_json`, whose integer and float
/// formatting is already shortest-round-trip; object key ordering and
/// token layout are enforced here explicitly rather than inherited from
/// map internals.
#[must_use]
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Compute the 32-byte SHA-256 digest of the canonical form.
#[must_use]
pub fn digest(value: &Value) -> [u8; 32] {
    let canonical = canonicalize(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher.finalize().into()
}

/// Hex-encoded form of [`digest`].
#[must_use]
pub fn digest_hex(value: &Value) -> String {
    to_hex(&digest(value))
}

/// Lowercase hex encoding of arbitrary bytes.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Parse a hex string into a 32-byte digest.
///
/// Returns `None` for strings that are not exactly 64 hex characters.
#[must_use]
pub fn from_hex(hex: &str) -> Option<[u8; 32]> {
    if hex.len() != 64 {
        return None;
    }
    let mut out = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let hi = (chunk[0] as char).to_digit(16)?;
        let lo = (chunk[1] as char).to_digit(16)?;
        out[i] = (hi as u8) << 4 | lo as u8;
    }
    Some(out)
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        // serde_json renders integers via itoa and floats via ryu, which is
        // the shortest form that round-trips.
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_escaped(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_escaped(key, out);
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
    }
}

/// Minimal escape set: `"`, `\`, and control characters; everything else
/// passes through as UTF-8.
fn write_escaped(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_sorted_lexicographically() {
        let v = json!({"b": 1, "a": 2, "aa": 3});
        assert_eq!(canonicalize(&v), r#"{"a":2,"aa":3,"b":1}"#);
    }

    #[test]
    fn nested_objects_sorted_recursively() {
        let v = json!({"outer": {"z": 1, "a": {"y": 2, "x": 3}}});
        assert_eq!(canonicalize(&v), r#"{"outer":{"a":{"x":3,"y":2},"z":1}}"#);
    }

    #[test]
    fn no_insignificant_whitespace() {
        let v: Value = serde_json::from_str("{ \"a\" : [ 1 , 2 ] ,\n \"b\" : null }").unwrap();
        assert_eq!(canonicalize(&v), r#"{"a":[1,2],"b":null}"#);
    }

    #[test]
    fn scalars_render_shortest() {
        assert_eq!(canonicalize(&json!(0)), "0");
        assert_eq!(canonicalize(&json!(-7)), "-7");
        assert_eq!(canonicalize(&json!(1.5)), "1.5");
        assert_eq!(canonicalize(&json!(true)), "true");
        assert_eq!(canonicalize(&json!(null)), "null");
    }

    #[test]
    fn strings_use_minimal_escapes() {
        assert_eq!(canonicalize(&json!("a\"b")), r#""a\"b""#);
        assert_eq!(canonicalize(&json!("back\\slash")), r#""back\\slash""#);
        assert_eq!(canonicalize(&json!("line\nbreak")), r#""line\nbreak""#);
        assert_eq!(canonicalize(&json!("\u{1}")), "\"\\u0001\"");
        // Non-ASCII passes through unescaped.
        assert_eq!(canonicalize(&json!("héllo")), "\"héllo\"");
    }

    #[test]
    fn digest_is_deterministic_over_key_order() {
        let a: Value = serde_json::from_str(r#"{"x": 1, "y": [2, 3], "z": {"k": "v"}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"z": {"k": "v"}, "y": [2, 3], "x": 1}"#).unwrap();
        assert_eq!(digest(&a), digest(&b));
    }

    #[test]
    fn distinct_values_get_distinct_digests() {
        assert_ne!(digest(&json!({"a": 1})), digest(&json!({"a": 2})));
        assert_ne!(digest(&json!([])), digest(&json!({})));
    }

    #[test]
    fn hex_roundtrip() {
        let d = digest(&json!({"issues": [], "summary": "ok"}));
        let hex = to_hex(&d);
        assert_eq!(hex.len(), 64);
        assert_eq!(from_hex(&hex), Some(d));
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(from_hex("abc").is_none());
        assert!(from_hex(&"g".repeat(64)).is_none());
    }

    #[test]
    fn known_vector_matches_sorted_compact_serialization() {
        // SHA-256 of `{"issues":[],"summary":"ok"}` computed independently.
        let v = json!({"summary": "ok", "issues": []});
        assert_eq!(canonicalize(&v), r#"{"issues":[],"summary":"ok"}"#);
        let mut hasher = Sha256::new();
        hasher.update(br#"{"issues":[],"summary":"ok"}"#);
        let expected: [u8; 32] = hasher.finalize().into();
        assert_eq!(digest(&v), expected);
    }

    #[test]
    fn array_order_is_significant() {
        assert_ne!(digest(&json!([1, 2])), digest(&json!([2, 1])));
    }
}
