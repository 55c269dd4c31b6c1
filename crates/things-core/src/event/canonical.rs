//! Canonical JSON serialization.
//!
//! Compact JSON with object keys sorted at every nesting level, so that the
//! same payload always hashes to the same bytes regardless of how
//! `serde_json` was configured by other crates in the build.

use serde_json::Value;

/// Produce a canonical JSON string from a [`serde_json::Value`].
///
/// ```
/// use serde_json::json;
/// use things_core::event::canonical::canonicalize_json;
///
/// let val = json!({"taskId": "t1", "contextId": "c1"});
/// assert_eq!(canonicalize_json(&val), r#"{"contextId":"c1","taskId":"t1"}"#);
/// ```
#[must_use]
pub fn canonicalize_json(value: &Value) -> String {
    let mut buf = String::new();
    write_canonical(value, &mut buf);
    buf
}

fn write_canonical(value: &Value, buf: &mut String) {
    match value {
        Value::Array(arr) => {
            buf.push('[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_canonical(item, buf);
            }
            buf.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            buf.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                // Value's Display escapes strings exactly like the serializer.
                buf.push_str(&Value::String(key.clone()).to_string());
                buf.push(':');
                write_canonical(&map[key], buf);
            }
            buf.push('}');
        }
        scalar => buf.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_nested_keys() {
        let val = json!({"z": {"b": 1, "a": [3, {"y": 0, "x": 1}]}, "a": null});
        assert_eq!(
            canonicalize_json(&val),
            r#"{"a":null,"z":{"a":[3,{"x":1,"y":0}],"b":1}}"#
        );
    }

    #[test]
    fn escapes_strings() {
        let val = json!({"name": "tab\there \"quoted\"\nnewline"});
        let out = canonicalize_json(&val);
        assert!(!out.contains('\n'));
        assert!(!out.contains('\t'));
        let back: Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(back, val);
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(canonicalize_json(&json!(true)), "true");
        assert_eq!(canonicalize_json(&json!(42)), "42");
        assert_eq!(canonicalize_json(&json!("s")), "\"s\"");
    }
}
