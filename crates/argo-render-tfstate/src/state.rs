//! The `terraform` datasource

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use argo_render_engine::{Datasource, DatasourceError};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::decode::decode_value;
use crate::error::{Result, StateError};
use crate::fetcher::StateFetcher;
use crate::types::TypeDescriptor;

/// The part of a state document this datasource reads
#[derive(Debug, Deserialize)]
struct StateDocument {
    #[serde(default)]
    outputs: BTreeMap<String, RawOutput>,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    #[serde(default)]
    value: JsonValue,

    /// Missing for very old states; those values pass through untouched
    #[serde(rename = "type")]
    ty: Option<JsonValue>,
}

/// Decode every output of a state document into a plain mapping
///
/// Either all outputs decode or none are returned.
pub fn decode_outputs(key: &str, data: &[u8]) -> Result<Map<String, JsonValue>> {
    let document: StateDocument =
        serde_json::from_slice(data).map_err(|source| StateError::Document {
            key: key.to_string(),
            source,
        })?;

    let mut outputs = Map::new();
    for (name, raw) in document.outputs {
        let ty = match &raw.ty {
            Some(ty) => TypeDescriptor::from_json(ty).map_err(|message| StateError::Type {
                output: name.clone(),
                message,
            })?,
            None => TypeDescriptor::Dynamic,
        };
        let value = decode_value(&ty, &raw.value, "").map_err(|e| StateError::Decode {
            key: key.to_string(),
            source: e.in_output(&name),
        })?;
        outputs.insert(name, value);
    }
    Ok(outputs)
}

/// Serves the outputs of Terraform states addressed as `<bucket>/<path>`
///
/// Each key is fetched and decoded at most once per instance.
#[derive(Debug)]
pub struct TerraformState<F> {
    fetcher: F,
    decoded: Mutex<HashMap<String, Map<String, JsonValue>>>,
}

impl<F: StateFetcher> TerraformState<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            decoded: Mutex::new(HashMap::new()),
        }
    }

    /// Decoded outputs of the state stored under `key`
    pub fn outputs(&self, key: &str) -> Result<Map<String, JsonValue>> {
        if let Some(hit) = self
            .decoded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(hit.clone());
        }

        let data = self.fetcher.fetch(key)?;
        let outputs = decode_outputs(key, &data)?;
        tracing::debug!(key, outputs = outputs.len(), "state decoded");

        self.decoded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), outputs.clone());
        Ok(outputs)
    }
}

impl<F: StateFetcher> Datasource for TerraformState<F> {
    fn get(&self, key: &str) -> std::result::Result<JsonValue, DatasourceError> {
        self.outputs(key)
            .map(JsonValue::Object)
            .map_err(|e| DatasourceError::backend(key, e))
    }
}
