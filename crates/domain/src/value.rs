//! Dynamic values for call arguments and results.
//!
//! Arguments travel as CBOR, so the CBOR data model is the value model:
//! maps, arrays, integers, floats, text, and byte strings that stay byte
//! strings end to end. JSON is only used for diagnostics and for callers
//! that prefer to build arguments from `serde_json::Value`.

use serde_json::{Map, Number};

use crate::error::{Error, Result};

pub use ciborium::value::{Integer, Value};

/// Render a value as JSON. Byte strings become `0x`-prefixed hex.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Integer(i) => {
            let n = i128::from(*i);
            if let Ok(v) = i64::try_from(n) {
                serde_json::Value::from(v)
            } else if let Ok(v) = u64::try_from(n) {
                serde_json::Value::from(v)
            } else {
                serde_json::Value::String(n.to_string())
            }
        }
        Value::Bytes(b) => serde_json::Value::String(to_hex(b)),
        Value::Float(f) => Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Null => serde_json::Value::Null,
        Value::Tag(_, inner) => to_json(inner),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => {
            let mut obj = Map::new();
            for (k, v) in entries {
                let key = match k {
                    Value::Text(s) => s.clone(),
                    other => to_json(other).to_string(),
                };
                obj.insert(key, to_json(v));
            }
            serde_json::Value::Object(obj)
        }
        _ => serde_json::Value::Null,
    }
}

/// Convert a JSON value into a CBOR value.
///
/// Strings stay text; there is no way to express a byte string in JSON, so
/// use [`Value::Bytes`] directly when a parameter is `bytes`.
pub fn from_json(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Value::Integer(u.into())
            } else if let Some(i) = n.as_i64() {
                Value::Integer(i.into())
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(obj) => Value::Map(
            obj.iter()
                .map(|(k, v)| (Value::Text(k.clone()), from_json(v)))
                .collect(),
        ),
    }
}

/// JSON rendering of an argument list, e.g. `[{"f1":1},"0x1234"]`.
pub fn args_json(args: &[Value]) -> String {
    serde_json::Value::Array(args.iter().map(to_json).collect()).to_string()
}

/// `0x`-prefixed lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse hex with or without a `0x` prefix.
pub fn from_hex(s: &str) -> Result<Vec<u8>> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(trimmed).map_err(|e| Error::Format(format!("invalid hex {s:?}: {e}")))
}
