//! Query parameter encoding
//!
//! Flattens a filter object into repeated `key=value` pairs. The object is
//! serialized to JSON first, so any field skipped by its serde attributes
//! (`skip_serializing_if`) never reaches the query string.

use serde::Serialize;
use serde_json::Value;

use crate::error::MapboxError;

/// Encode `value` as a flat, multi-valued list of query parameters
///
/// Keys come out in sorted order. Per JSON value:
/// - strings, booleans and unsigned integers produce one parameter;
/// - arrays produce one parameter per element, numbers in fixed-point
///   notation (`-118.243900`) and strings verbatim;
/// - `null`, objects, signed or fractional scalars are dropped.
///
/// A coordinate pair is an array like any other, so it yields one
/// parameter per coordinate and nothing more.
pub fn to_query_params<T>(value: &T) -> Result<Vec<(String, String)>, MapboxError>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_value(value).map_err(|e| MapboxError::Encoding(e.to_string()))?;
    let map = match json {
        Value::Object(map) => map,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(MapboxError::Encoding(format!(
                "query parameters must be an object, got {}",
                kind_of(&other)
            )));
        },
    };

    let mut params = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::String(s) => params.push((key, s)),
            Value::Bool(b) => params.push((key, b.to_string())),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    params.push((key, u.to_string()));
                }
            },
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(s) => params.push((key.clone(), s)),
                        Value::Number(n) => {
                            if let Some(f) = n.as_f64() {
                                params.push((key.clone(), format!("{f:.6}")));
                            }
                        },
                        _ => {},
                    }
                }
            },
            Value::Null | Value::Object(_) => {},
        }
    }

    // Stable: repeated keys keep their element order.
    params.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(params)
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
