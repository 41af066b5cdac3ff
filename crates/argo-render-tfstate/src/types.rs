//! Output type descriptors
//!
//! Every output in a state document carries its type as JSON:
//!
//! ```text
//! "string"
//! ["list", "number"]
//! ["map", ["set", "string"]]
//! ["tuple", ["string", "bool"]]
//! ["object", {"host": "string", "port": "number"}]
//! ["object", {"host": "string", "port": "number"}, ["port"]]
//! "dynamic"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    String,
    Number,
    Bool,
    Dynamic,
    List(Box<TypeDescriptor>),
    Set(Box<TypeDescriptor>),
    Map(Box<TypeDescriptor>),
    Tuple(Vec<TypeDescriptor>),
    Object {
        attributes: BTreeMap<String, TypeDescriptor>,
        optional: BTreeSet<String>,
    },
}

impl TypeDescriptor {
    pub fn from_json(value: &JsonValue) -> Result<Self, String> {
        match value {
            JsonValue::String(name) => match name.as_str() {
                "string" => Ok(Self::String),
                "number" => Ok(Self::Number),
                "bool" => Ok(Self::Bool),
                "dynamic" => Ok(Self::Dynamic),
                other => Err(format!("unknown primitive type {other:?}")),
            },
            JsonValue::Array(parts) => Self::from_parts(parts),
            other => Err(format!("expected a type name or array, got {other}")),
        }
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        let value: JsonValue = serde_json::from_str(text).map_err(|e| e.to_string())?;
        Self::from_json(&value)
    }

    fn from_parts(parts: &[JsonValue]) -> Result<Self, String> {
        let Some(kind) = parts.first().and_then(JsonValue::as_str) else {
            return Err("type array must start with a kind".to_string());
        };

        match (kind, &parts[1..]) {
            ("list", [element]) => Ok(Self::List(Box::new(Self::from_json(element)?))),
            ("set", [element]) => Ok(Self::Set(Box::new(Self::from_json(element)?))),
            ("map", [element]) => Ok(Self::Map(Box::new(Self::from_json(element)?))),
            ("tuple", [JsonValue::Array(elements)]) => Ok(Self::Tuple(
                elements.iter().map(Self::from_json).collect::<Result<_, _>>()?,
            )),
            ("object", [JsonValue::Object(attrs)]) => Self::object(attrs, &[]),
            ("object", [JsonValue::Object(attrs), JsonValue::Array(optional)]) => {
                Self::object(attrs, optional)
            }
            (kind, _) => Err(format!("malformed {kind} type")),
        }
    }

    fn object(
        attrs: &serde_json::Map<String, JsonValue>,
        optional: &[JsonValue],
    ) -> Result<Self, String> {
        let attributes = attrs
            .iter()
            .map(|(name, ty)| Ok((name.clone(), Self::from_json(ty)?)))
            .collect::<Result<BTreeMap<_, _>, String>>()?;

        let mut names = BTreeSet::new();
        for entry in optional {
            let name = entry
                .as_str()
                .ok_or_else(|| "optional attribute names must be strings".to_string())?;
            if !attributes.contains_key(name) {
                return Err(format!("optional attribute {name:?} is not declared"));
            }
            names.insert(name.to_string());
        }

        Ok(Self::Object {
            attributes,
            optional: names,
        })
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Number => f.write_str("number"),
            Self::Bool => f.write_str("bool"),
            Self::Dynamic => f.write_str("dynamic"),
            Self::List(e) => write!(f, "list({e})"),
            Self::Set(e) => write!(f, "set({e})"),
            Self::Map(e) => write!(f, "map({e})"),
            Self::Tuple(_) => f.write_str("tuple"),
            Self::Object { .. } => f.write_str("object"),
        }
    }
}
