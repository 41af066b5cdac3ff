//! Helper functions callable from templates
//!
//! `datasource` itself is registered by the engine since it needs the registry.

use minijinja::value::Rest;
use minijinja::{Error, ErrorKind, Value};

fn invalid(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidOperation, message.into())
}

/// Abort rendering with a message
///
/// Usage: @<< fail("cluster output missing") >>@
pub fn fail(message: String) -> Result<Value, Error> {
    Err(invalid(message))
}

/// Build a mapping from alternating keys and values
///
/// Usage: @<< dict("name", "web", "port", 80) | tojson >>@
pub fn dict(args: Rest<Value>) -> Result<Value, Error> {
    if args.len() % 2 != 0 {
        return Err(invalid("dict requires an even number of arguments"));
    }

    let mut map = indexmap::IndexMap::new();
    for pair in args.chunks(2) {
        let key = pair[0]
            .as_str()
            .ok_or_else(|| invalid("dict keys must be strings"))?;
        map.insert(key.to_string(), pair[1].clone());
    }
    Ok(Value::from_iter(map))
}

pub fn list(args: Rest<Value>) -> Value {
    Value::from(args.0)
}

/// Attribute lookup with a fallback
///
/// Usage: @<< get(outputs, "endpoint", "https://localhost") >>@
pub fn get(obj: Value, key: String, default: Option<Value>) -> Value {
    match obj.get_attr(&key) {
        Ok(v) if !v.is_undefined() => v,
        _ => default.unwrap_or(Value::UNDEFINED),
    }
}

/// Walk a path of keys (or list indexes); the last argument is the fallback
///
/// Usage: @<< dig(outputs, "kubeconfig_data", "port", 443) >>@
pub fn dig(obj: Value, path_and_default: Rest<Value>) -> Result<Value, Error> {
    let Some((default, path)) = path_and_default.split_last() else {
        return Err(invalid("dig requires at least a default value"));
    };

    let mut current = obj;
    for segment in path {
        let next = match segment.as_str() {
            Some(key) => current.get_attr(key),
            None => current.get_item(segment),
        };
        match next {
            Ok(v) if !v.is_undefined() && !v.is_none() => current = v,
            _ => return Ok(default.clone()),
        }
    }
    Ok(current)
}

/// First argument that is neither undefined, none nor an empty string
pub fn coalesce(args: Rest<Value>) -> Value {
    args.0
        .into_iter()
        .find(|v| !v.is_undefined() && !v.is_none() && v.as_str() != Some(""))
        .unwrap_or(Value::UNDEFINED)
}

/// Usage: @<< ternary("enabled", "disabled", outputs.ha) >>@
pub fn ternary(when_true: Value, when_false: Value, condition: Value) -> Value {
    if condition.is_true() {
        when_true
    } else {
        when_false
    }
}

pub fn tostring(value: Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

pub fn toint(value: Value) -> Result<i64, Error> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    if let Some(s) = value.as_str() {
        return s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(format!("cannot convert '{s}' to int")));
    }
    f64::try_from(value.clone())
        .map(|f| f as i64)
        .map_err(|_| invalid(format!("cannot convert {value} to int")))
}

pub fn tofloat(value: Value) -> Result<f64, Error> {
    if let Some(s) = value.as_str() {
        return s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("cannot convert '{s}' to float")));
    }
    f64::try_from(value.clone()).map_err(|_| invalid(format!("cannot convert {value} to float")))
}

/// Current UTC time, RFC 3339 unless a strftime format is given
///
/// Usage: @<< now("%Y%m%d") >>@
pub fn now(format: Option<String>) -> String {
    let ts = chrono::Utc::now();
    match format {
        Some(fmt) => ts.format(&fmt).to_string(),
        None => ts.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    }
}

/// Printf-style formatting with `%s`, `%d`, `%f`, `%v` and `%%`
///
/// Usage: @<< printf("%s:%d", outputs.host, outputs.port) >>@
pub fn printf(format: String, args: Rest<Value>) -> Result<String, Error> {
    let mut out = String::with_capacity(format.len() + args.len() * 8);
    let mut args = args.0.into_iter();
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(spec) = chars.next() else {
            out.push('%');
            break;
        };
        if spec == '%' {
            out.push('%');
            continue;
        }

        let arg = args
            .next()
            .ok_or_else(|| invalid("not enough arguments for format string"))?;
        match spec {
            'd' => match arg.as_i64() {
                Some(n) => out.push_str(&n.to_string()),
                None => out.push_str(&tostring(arg)),
            },
            'f' => match f64::try_from(arg.clone()) {
                Ok(f) => out.push_str(&f.to_string()),
                Err(_) => out.push_str(&tostring(arg)),
            },
            _ => out.push_str(&tostring(arg)),
        }
    }

    Ok(out)
}
