//! Conversion between plain JSON and the typed value encoding used by
//! Firestore-compatible document APIs.
//!
//! Every field on the wire is wrapped in a single-key object naming its type,
//! e.g. `{"stringValue": "Ada"}` or `{"integerValue": "42"}`. Integers travel
//! as decimal strings so they survive JavaScript number precision.

use serde_json::{json, Map, Number, Value};

use super::Error;

/// Encode a JSON object into a `fields` map.
pub fn encode_fields(map: &Map<String, Value>) -> Value {
	Value::Object(
		map.iter()
			.map(|(key, value)| (key.clone(), encode_value(value)))
			.collect(),
	)
}

pub fn encode_value(value: &Value) -> Value {
	match value {
		Value::Null => json!({ "nullValue": null }),
		Value::Bool(b) => json!({ "booleanValue": b }),
		Value::Number(n) => {
			if let Some(i) = n.as_i64() {
				json!({ "integerValue": i.to_string() })
			} else {
				// u64 beyond i64::MAX and every float end up here
				json!({ "doubleValue": n.as_f64().unwrap_or_default() })
			}
		}
		Value::String(s) => json!({ "stringValue": s }),
		Value::Array(values) => json!({
			"arrayValue": {
				"values": values.iter().map(encode_value).collect::<Vec<_>>()
			}
		}),
		Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
	}
}

/// Decode a `fields` map (as found on a document) back into a JSON object.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, Error> {
	fields
		.iter()
		.map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
		.collect()
}

pub fn decode_value(value: &Value) -> Result<Value, Error> {
	let Some(obj) = value.as_object() else {
		return Err(Error(format!("expected a typed value object, got {value}")));
	};

	let Some((kind, inner)) = obj.iter().next() else {
		return Err(Error("empty typed value".to_string()));
	};

	match kind.as_str() {
		"nullValue" => Ok(Value::Null),
		"booleanValue" => inner
			.as_bool()
			.map(Value::Bool)
			.ok_or_else(|| Error(format!("invalid booleanValue: {inner}"))),
		"integerValue" => decode_integer(inner),
		"doubleValue" => decode_double(inner),
		"stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
			.as_str()
			.map(|s| Value::String(s.to_string()))
			.ok_or_else(|| Error(format!("invalid {kind}: {inner}"))),
		"geoPointValue" => Ok(inner.clone()),
		"arrayValue" => inner
			.get("values")
			.and_then(Value::as_array)
			.map(|values| values.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
			.transpose()
			.map(|values| Value::Array(values.unwrap_or_default())),
		"mapValue" => inner
			.get("fields")
			.and_then(Value::as_object)
			.map(decode_fields)
			.transpose()
			.map(|fields| Value::Object(fields.unwrap_or_default())),
		other => Err(Error(format!("unsupported value type: {other}"))),
	}
}

fn decode_integer(inner: &Value) -> Result<Value, Error> {
	match inner {
		Value::String(s) => s
			.parse::<i64>()
			.map(|i| Value::Number(i.into()))
			.map_err(|e| Error(format!("invalid integerValue {s:?}: {e}"))),
		Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::Number(n.clone())),
		_ => Err(Error(format!("invalid integerValue: {inner}"))),
	}
}

fn decode_double(inner: &Value) -> Result<Value, Error> {
	match inner {
		Value::Number(n) => Ok(n
			.as_f64()
			.and_then(Number::from_f64)
			.map_or(Value::Null, Value::Number)),
		// "NaN" and "Infinity" have no JSON representation
		Value::String(_) => Ok(Value::Null),
		_ => Err(Error(format!("invalid doubleValue: {inner}"))),
	}
}
