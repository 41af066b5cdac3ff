//! Helper filters for manifest templates
//!
//! These sit on top of MiniJinja's builtins (`default`, `upper`, `join`,
//! `replace`, ...) and cover the Sprig-style helpers manifests usually need.

use base64::Engine as _;
use minijinja::value::ValueKind;
use minijinja::{Error, ErrorKind, Value};
use semver::{Version, VersionReq};

fn invalid(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidOperation, message.into())
}

fn to_json(value: &Value) -> Result<serde_json::Value, Error> {
    serde_json::to_value(value).map_err(|e| invalid(e.to_string()))
}

/// Serialize a value (typically a datasource result) as YAML
///
/// Usage: @<< datasource("file", "/env.yaml") | toyaml | nindent(4) >>@
pub fn toyaml(value: Value) -> Result<String, Error> {
    let yaml = serde_yaml::to_string(&to_json(&value)?).map_err(|e| invalid(e.to_string()))?;
    Ok(yaml.trim_start_matches("---\n").trim_end().to_string())
}

/// Serialize a value as compact JSON
///
/// Usage: @<< outputs.kubeconfig_data | tojson >>@
pub fn tojson(value: Value) -> Result<String, Error> {
    serde_json::to_string(&to_json(&value)?).map_err(|e| invalid(e.to_string()))
}

/// Serialize a value as indented JSON
pub fn tojson_pretty(value: Value) -> Result<String, Error> {
    serde_json::to_string_pretty(&to_json(&value)?).map_err(|e| invalid(e.to_string()))
}

/// Usage: @<< outputs.client_key | b64encode >>@
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

pub fn b64decode(value: String) -> Result<String, Error> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(value.as_bytes())
        .map_err(|e| invalid(format!("base64 decode error: {e}")))?;
    String::from_utf8(bytes).map_err(|e| invalid(format!("decoded value is not UTF-8: {e}")))
}

pub fn sha256sum(value: String) -> String {
    use sha2::{Digest, Sha256};
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

fn plain_string(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// Double-quote a value, escaping backslashes and quotes
pub fn quote(value: Value) -> String {
    let s = plain_string(&value);
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Single-quote a value YAML style
pub fn squote(value: Value) -> String {
    format!("'{}'", plain_string(&value).replace('\'', "''"))
}

/// Prefix every non-empty line with `spaces` spaces
pub fn indent(value: String, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    value
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Like `indent` with a leading newline, for nesting under a YAML key
///
/// Usage:
/// ```text
/// data:@<< datasource("file", "cfg.yaml") | toyaml | nindent(2) >>@
/// ```
pub fn nindent(value: String, spaces: usize) -> String {
    format!("\n{}", indent(value, spaces))
}

/// Fail rendering when the value is missing or empty
pub fn required(value: Value, message: Option<String>) -> Result<Value, Error> {
    let missing = value.is_undefined()
        || value.is_none()
        || value.as_str().is_some_and(str::is_empty);
    if missing {
        Err(invalid(message.unwrap_or_else(|| "required value is missing".to_string())))
    } else {
        Ok(value)
    }
}

/// True for undefined, none, and empty strings or collections
pub fn empty(value: Value) -> bool {
    if value.is_undefined() || value.is_none() {
        return true;
    }
    match value.as_str() {
        Some(s) => s.is_empty(),
        None => value.len() == Some(0),
    }
}

pub fn haskey(value: Value, key: String) -> bool {
    value.get_attr(&key).is_ok_and(|v| !v.is_undefined())
}

/// Keys of a mapping, in iteration order
pub fn keys(value: Value) -> Result<Vec<String>, Error> {
    if value.kind() != ValueKind::Map {
        return Err(invalid(format!("keys requires a mapping, got {}", value.kind())));
    }
    Ok(value
        .try_iter()?
        .filter_map(|k| k.as_str().map(str::to_string))
        .collect())
}

/// Recursively merge `overlay` into `base`; scalars and lists from `overlay` win
pub fn merge(base: Value, overlay: Value) -> Result<Value, Error> {
    let mut merged = to_json(&base)?;
    deep_merge(&mut merged, to_json(&overlay)?);
    Ok(Value::from_serialize(&merged))
}

fn deep_merge(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Keep at most `length` characters
pub fn trunc(value: String, length: usize) -> String {
    value.chars().take(length).collect()
}

pub fn trimprefix(value: String, prefix: String) -> String {
    value.strip_prefix(prefix.as_str()).unwrap_or(&value).to_string()
}

pub fn trimsuffix(value: String, suffix: String) -> String {
    value.strip_suffix(suffix.as_str()).unwrap_or(&value).to_string()
}

pub fn snakecase(value: String) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let mut prev_lower = false;
    for c in value.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else if c == '-' || c == ' ' {
            out.push('_');
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

pub fn kebabcase(value: String) -> String {
    snakecase(value).replace('_', "-")
}

/// Format a timestamp
///
/// Accepts RFC 3339 strings and unix seconds; the format uses strftime syntax.
///
/// Usage: @<< "2024-05-01T10:00:00Z" | date("%Y-%m-%d") >>@
pub fn date(value: Value, format: String) -> Result<String, Error> {
    let ts = if let Some(s) = value.as_str() {
        chrono::DateTime::parse_from_rfc3339(s)
            .map_err(|e| invalid(format!("cannot parse '{s}' as a timestamp: {e}")))?
            .with_timezone(&chrono::Utc)
    } else if let Some(secs) = value.as_i64() {
        chrono::DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| invalid(format!("timestamp {secs} is out of range")))?
    } else {
        return Err(invalid(format!("date requires a string or number, got {}", value.kind())));
    };
    Ok(ts.format(&format).to_string())
}

/// Check a version against a semver constraint
///
/// Usage: @<% if outputs.k8s_version | semver_match(">=1.30") %>@
pub fn semver_match(version: String, constraint: String) -> Result<bool, Error> {
    // Pre-release and build suffixes are ignored ("1.30.2-eks-1234" is 1.30.2)
    let cleaned = version.trim().trim_start_matches('v');
    let core = cleaned.split(['-', '+']).next().unwrap_or(cleaned);
    let mut parts = core.split('.').map(str::parse::<u64>);
    let parsed = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(Ok(major)), Some(Ok(minor)), None, None) => Version::new(major, minor, 0),
        (Some(Ok(major)), Some(Ok(minor)), Some(Ok(patch)), None) => {
            Version::new(major, minor, patch)
        }
        _ => return Err(invalid(format!("invalid version: {version}"))),
    };

    let req = VersionReq::parse(constraint.trim())
        .map_err(|e| invalid(format!("invalid constraint '{constraint}': {e}")))?;
    Ok(req.matches(&parsed))
}
