//! Runtime value representation.
//!
//! Block inputs, outputs, slot primitives and edge `case` filters are all
//! represented as [`serde_json::Value`]. This keeps the wire format (DAG
//! JSON) and the runtime representation identical — there is no
//! separate "decoded" form — and sidesteps the need for per-type Rust
//! generics at every port, matching the Design Note "Null as sentinel":
//! `Value::Null` is both "absent" and "computed to null", a single case the
//! scheduler treats as a short-circuit.

pub use serde_json::Value;

/// Canonicalizes a [`Value`] for use as a memoization or cache key: object
/// keys are sorted recursively so that two structurally-equal JSON values
/// with differently-ordered maps produce identical strings. Array order is
/// preserved (arrays are ordered data, unlike Python's `sort()`-based
/// `HashableList` — array order is meaningful and must not be permuted).
pub fn canonicalize(value: &Value) -> String {
    let sorted = sort_keys(value);
    serde_json::to_string(&sorted).expect("Value always serializes")
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = serde_json::Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), sort_keys(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// The registry-builtin type name a raw [`Value`] structurally belongs to,
/// used when checking an application's declared input type against the
/// value the caller actually supplied.
pub fn builtin_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "text",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonicalize_ignores_object_key_order() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn canonicalize_preserves_array_order() {
        let a = json!(["x", "y"]);
        let b = json!(["y", "x"]);
        assert_ne!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn canonicalize_is_stable_nested() {
        let a = json!({"outer": {"z": 1, "a": [1, {"q": 1, "p": 2}]}});
        let b = json!({"outer": {"a": [1, {"p": 2, "q": 1}], "z": 1}});
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }
}
