//! Conversion between plain JSON and Firestore's typed value encoding.
//!
//! Firestore REST wraps every value in a single-key object naming its type,
//! e.g. `{"stringValue": "x"}` or `{"mapValue": {"fields": {...}}}`.

use serde_json::{Map, Value, json};

/// Encodes a plain JSON value as a Firestore value.
pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // Firestore transports 64-bit integers as strings.
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encodes each entry of a JSON object, producing a Firestore `fields` map.
pub fn encode_fields(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), encode(value)))
            .collect(),
    )
}

/// Decodes a Firestore value into plain JSON.
pub fn decode(value: &Value) -> Result<Value, String> {
    let Some(object) = value.as_object() else {
        return Err(format!("expected a typed value object, got {value}"));
    };
    let Some((kind, inner)) = object.iter().next() else {
        return Err("empty typed value".to_string());
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| format!("bad booleanValue: {inner}")),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| format!("bad integerValue: {inner}"))
        }
        "doubleValue" => inner
            .as_f64()
            .map(Value::from)
            .ok_or_else(|| format!("bad doubleValue: {inner}")),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(Value::from)
            .ok_or_else(|| format!("bad {kind}: {inner}")),
        "geoPointValue" => Ok(inner.clone()),
        "mapValue" => match inner.get("fields") {
            Some(fields) => decode_fields(fields),
            None => Ok(Value::Object(Map::new())),
        },
        "arrayValue" => match inner.get("values").and_then(Value::as_array) {
            Some(values) => values.iter().map(decode).collect::<Result<Vec<_>, _>>().map(Value::Array),
            None => Ok(Value::Array(Vec::new())),
        },
        other => Err(format!("unsupported Firestore value type: {other}")),
    }
}

/// Decodes a Firestore `fields` map into a JSON object.
pub fn decode_fields(fields: &Value) -> Result<Value, String> {
    let Some(map) = fields.as_object() else {
        return Err(format!("expected fields object, got {fields}"));
    };
    map.iter()
        .map(|(key, value)| decode(value).map(|decoded| (key.clone(), decoded)))
        .collect::<Result<Map<_, _>, _>>()
        .map(Value::Object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_nested_file_tree() {
        let plain = json!({
            "f1": { "id": "f1", "name": "a.js", "type": "file", "content": "x" }
        });
        let encoded = encode(&plain);
        assert_eq!(
            encoded["mapValue"]["fields"]["f1"]["mapValue"]["fields"]["name"],
            json!({ "stringValue": "a.js" })
        );
        assert_eq!(decode(&encoded).unwrap(), plain);
    }

    #[test]
    fn integers_travel_as_strings() {
        assert_eq!(encode(&json!(42)), json!({ "integerValue": "42" }));
        assert_eq!(decode(&json!({ "integerValue": "42" })).unwrap(), json!(42));
        assert_eq!(encode(&json!(1.5)), json!({ "doubleValue": 1.5 }));
    }

    #[test]
    fn decodes_timestamps_and_empty_containers() {
        assert_eq!(
            decode(&json!({ "timestampValue": "2025-01-02T03:04:05.123456Z" })).unwrap(),
            json!("2025-01-02T03:04:05.123456Z")
        );
        assert_eq!(decode(&json!({ "mapValue": {} })).unwrap(), json!({}));
        assert_eq!(decode(&json!({ "arrayValue": {} })).unwrap(), json!([]));
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(decode(&json!({ "mysteryValue": 1 })).is_err());
        assert!(decode(&json!("bare")).is_err());
        assert!(decode(&json!({ "booleanValue": "yes" })).is_err());
    }
}
