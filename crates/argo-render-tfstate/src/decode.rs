//! Conversion of raw output values into their declared types
//!
//! Null is valid for every type. Primitive values convert the way
//! Terraform converts them: numbers and bools become strings for a
//! `string` type, numeric strings become numbers, and `"true"`/`"false"`
//! (or `"1"`/`"0"`) become bools.

use std::cmp::Ordering;

use serde_json::{Map, Number, Value as JsonValue};

use crate::error::DecodeError;
use crate::types::TypeDescriptor;

/// Decode `raw` against `ty`; `path` prefixes locations in errors
pub fn decode_value(
    ty: &TypeDescriptor,
    raw: &JsonValue,
    path: &str,
) -> Result<JsonValue, DecodeError> {
    if raw.is_null() {
        return Ok(JsonValue::Null);
    }

    match ty {
        TypeDescriptor::String => decode_string(raw, path),
        TypeDescriptor::Number => decode_number(raw, path),
        TypeDescriptor::Bool => decode_bool(raw, path),
        TypeDescriptor::Dynamic => decode_dynamic(raw, path),
        TypeDescriptor::List(element) => {
            decode_sequence(ty, element, raw, path).map(JsonValue::Array)
        }
        TypeDescriptor::Set(element) => {
            let items = decode_sequence(ty, element, raw, path)?;
            Ok(JsonValue::Array(canonical_set(items)))
        }
        TypeDescriptor::Map(element) => {
            let entries = raw
                .as_object()
                .ok_or_else(|| DecodeError::at(path, format!("{ty} value must be an object")))?;
            let mut out = Map::new();
            for (key, value) in entries {
                out.insert(key.clone(), decode_value(element, value, &format!("{path}.{key}"))?);
            }
            Ok(JsonValue::Object(out))
        }
        TypeDescriptor::Tuple(elements) => {
            let items = raw
                .as_array()
                .ok_or_else(|| DecodeError::at(path, "tuple value must be an array"))?;
            if items.len() != elements.len() {
                return Err(DecodeError::at(
                    path,
                    format!("tuple needs {} elements, got {}", elements.len(), items.len()),
                ));
            }
            elements
                .iter()
                .zip(items)
                .enumerate()
                .map(|(i, (ty, item))| decode_value(ty, item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array)
        }
        TypeDescriptor::Object { attributes, .. } => {
            let entries = raw
                .as_object()
                .ok_or_else(|| DecodeError::at(path, "object value must be an object"))?;
            if let Some(unknown) = entries.keys().find(|k| !attributes.contains_key(*k)) {
                return Err(DecodeError::at(
                    path,
                    format!("unsupported attribute {unknown:?}"),
                ));
            }

            // Absent attributes decode as null
            let mut out = Map::new();
            for (name, attr_ty) in attributes {
                let value = entries.get(name).unwrap_or(&JsonValue::Null);
                out.insert(name.clone(), decode_value(attr_ty, value, &format!("{path}.{name}"))?);
            }
            Ok(JsonValue::Object(out))
        }
    }
}

fn decode_sequence(
    ty: &TypeDescriptor,
    element: &TypeDescriptor,
    raw: &JsonValue,
    path: &str,
) -> Result<Vec<JsonValue>, DecodeError> {
    let items = raw
        .as_array()
        .ok_or_else(|| DecodeError::at(path, format!("{ty} value must be an array")))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| decode_value(element, item, &format!("{path}[{i}]")))
        .collect()
}

/// Drop duplicates and put elements in Terraform's set order
///
/// Strings sort lexically, numbers numerically and `false` before `true`.
/// Elements of structural types keep their first-seen order.
fn canonical_set(items: Vec<JsonValue>) -> Vec<JsonValue> {
    let mut unique: Vec<JsonValue> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique.sort_by(set_order);
    unique
}

fn set_order(a: &JsonValue, b: &JsonValue) -> Ordering {
    fn rank(v: &JsonValue) -> u8 {
        match v {
            JsonValue::Bool(_) => 0,
            JsonValue::Number(_) => 1,
            JsonValue::String(_) => 2,
            JsonValue::Array(_) | JsonValue::Object(_) => 3,
            JsonValue::Null => 4,
        }
    }

    match (a, b) {
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn decode_string(raw: &JsonValue, path: &str) -> Result<JsonValue, DecodeError> {
    match raw {
        JsonValue::String(_) => Ok(raw.clone()),
        JsonValue::Number(n) => Ok(JsonValue::String(normalize(n).to_string())),
        JsonValue::Bool(b) => Ok(JsonValue::String(b.to_string())),
        _ => Err(DecodeError::at(path, "string required")),
    }
}

fn decode_number(raw: &JsonValue, path: &str) -> Result<JsonValue, DecodeError> {
    match raw {
        JsonValue::Number(n) => Ok(JsonValue::Number(normalize(n))),
        JsonValue::String(s) => parse_number(s)
            .map(JsonValue::Number)
            .ok_or_else(|| DecodeError::at(path, format!("a number is required, got {s:?}"))),
        _ => Err(DecodeError::at(path, "number required")),
    }
}

fn decode_bool(raw: &JsonValue, path: &str) -> Result<JsonValue, DecodeError> {
    match raw {
        JsonValue::Bool(_) => Ok(raw.clone()),
        JsonValue::String(s) => match s.as_str() {
            "true" | "1" => Ok(JsonValue::Bool(true)),
            "false" | "0" => Ok(JsonValue::Bool(false)),
            _ => Err(DecodeError::at(path, format!("a bool is required, got {s:?}"))),
        },
        _ => Err(DecodeError::at(path, "bool required")),
    }
}

/// Values typed `dynamic` may wrap their concrete type as `{"value", "type"}`
fn decode_dynamic(raw: &JsonValue, path: &str) -> Result<JsonValue, DecodeError> {
    if let JsonValue::Object(map) = raw {
        if let (2, Some(value), Some(ty)) = (map.len(), map.get("value"), map.get("type")) {
            let ty = TypeDescriptor::from_json(ty).map_err(|e| DecodeError::at(path, e))?;
            return decode_value(&ty, value, path);
        }
    }
    Ok(raw.clone())
}

/// Integral floats become integers so `6443.0` and `"6443"` render alike
fn normalize(n: &Number) -> Number {
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
            Number::from(f as i64)
        }
        _ => n.clone(),
    }
}

fn parse_number(s: &str) -> Option<Number> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::from(i));
    }
    if let Ok(u) = s.parse::<u64>() {
        return Some(Number::from(u));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(|n| normalize(&n))
}
