//! Translation between plain JSON payloads and Firestore typed values
//!
//! The REST API wraps every field in a type tag, e.g.
//! `{"amount": {"doubleValue": 12.5}}`. The rest of the crate works with
//! plain JSON maps; only the Firestore client goes through this module.

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Map, Value};

/// Wrap a plain JSON map as a Firestore `fields` object
pub fn to_firestore_fields(fields: &Map<String, Value>) -> Value {
    let wrapped: Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), to_firestore_value(v)))
        .collect();
    Value::Object(wrapped)
}

/// Wrap a single plain JSON value as a Firestore typed value
pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // Firestore transmits integers as decimal strings
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(to_firestore_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": to_firestore_fields(map) } }),
    }
}

/// Unwrap a Firestore `fields` object into a plain JSON map
pub fn from_firestore_fields(fields: &Value) -> Result<Map<String, Value>> {
    let object = fields
        .as_object()
        .ok_or_else(|| anyhow!("Firestore fields is not an object"))?;
    object
        .iter()
        .map(|(k, v)| Ok((k.clone(), from_firestore_value(v)?)))
        .collect()
}

/// Unwrap a single Firestore typed value into plain JSON
pub fn from_firestore_value(value: &Value) -> Result<Value> {
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("Firestore value is not an object"))?;
    let (tag, inner) = object
        .iter()
        .next()
        .ok_or_else(|| anyhow!("Firestore value has no type tag"))?;

    match tag.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(inner.clone()),
        "integerValue" => {
            let text = inner
                .as_str()
                .ok_or_else(|| anyhow!("integerValue is not a string"))?;
            let parsed: i64 = text
                .parse()
                .map_err(|e| anyhow!("Invalid integerValue '{}': {}", text, e))?;
            Ok(json!(parsed))
        }
        "doubleValue" => Ok(inner.clone()),
        // Timestamps come back as RFC 3339 text, which is how the record
        // models expect instants anyway
        "stringValue" | "timestampValue" => Ok(inner.clone()),
        "arrayValue" => {
            let items = inner.get("values").and_then(Value::as_array);
            let unwrapped: Result<Vec<Value>> = items
                .map(|values| values.iter().map(from_firestore_value).collect())
                .unwrap_or_else(|| Ok(Vec::new()));
            Ok(Value::Array(unwrapped?))
        }
        "mapValue" => {
            let fields = inner
                .get("fields")
                .cloned()
                .unwrap_or_else(|| json!({}));
            Ok(Value::Object(from_firestore_fields(&fields)?))
        }
        other => bail!("Unsupported Firestore value type '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Map<String, Value> {
        json!({
            "amount": 12.5,
            "category_id": 3,
            "note": "coffee",
            "is_active": true,
            "missing": null,
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn test_roundtrip() {
        let wrapped = to_firestore_fields(&plain());
        assert_eq!(wrapped["amount"], json!({ "doubleValue": 12.5 }));
        assert_eq!(wrapped["category_id"], json!({ "integerValue": "3" }));
        assert_eq!(wrapped["note"], json!({ "stringValue": "coffee" }));

        let back = from_firestore_fields(&wrapped).unwrap();
        assert_eq!(back, plain());
    }

    #[test]
    fn test_timestamp_unwraps_to_string() {
        let value = json!({ "timestampValue": "2025-06-01T10:00:00Z" });
        assert_eq!(
            from_firestore_value(&value).unwrap(),
            json!("2025-06-01T10:00:00Z")
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let value = json!({ "geoPointValue": { "latitude": 0.0 } });
        assert!(from_firestore_value(&value).is_err());
    }

    #[test]
    fn test_nested_map_roundtrip() {
        let nested = json!({ "outer": { "inner": [1, "two"] } })
            .as_object()
            .unwrap()
            .clone();
        let back = from_firestore_fields(&to_firestore_fields(&nested)).unwrap();
        assert_eq!(back, nested);
    }
}
