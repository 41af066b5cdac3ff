//! Named key-value sources that templates read from
//!
//! ```text
//! @<< datasource("file", "/env/prod.yaml").replicas >>@
//! @<< datasource("terraform", "tf-state/prod/cluster.tfstate").cluster_name >>@
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::DatasourceError;

/// A source of structured values addressed by string key
///
/// The same key must yield the same value for the lifetime of a registry.
pub trait Datasource: Send + Sync {
    fn get(&self, key: &str) -> Result<JsonValue, DatasourceError>;
}

impl<T: Datasource + ?Sized> Datasource for Arc<T> {
    fn get(&self, key: &str) -> Result<JsonValue, DatasourceError> {
        (**self).get(key)
    }
}

/// Datasources available to one render job, by name
///
/// Built once per job and read-only afterwards.
#[derive(Clone, Default)]
pub struct DatasourceRegistry {
    sources: BTreeMap<String, Arc<dyn Datasource>>,
}

impl DatasourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under `name`, replacing any previous registration
    pub fn register(&mut self, name: impl Into<String>, source: impl Datasource + 'static) {
        self.sources.insert(name.into(), Arc::new(source));
    }

    pub fn register_arc(&mut self, name: impl Into<String>, source: Arc<dyn Datasource>) {
        self.sources.insert(name.into(), source);
    }

    pub fn with(mut self, name: impl Into<String>, source: impl Datasource + 'static) -> Self {
        self.register(name, source);
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    /// Look up `name` and delegate `key` to it
    pub fn resolve(&self, name: &str, key: &str) -> Result<JsonValue, DatasourceError> {
        let source = self
            .sources
            .get(name)
            .ok_or_else(|| DatasourceError::NotFound {
                name: name.to_string(),
                available: self.names(),
            })?;

        tracing::debug!(datasource = name, key, "resolving");
        source.get(key)
    }
}

impl fmt::Debug for DatasourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasourceRegistry")
            .field("names", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// In-memory datasource, mostly for tests
#[derive(Debug, Clone, Default)]
pub struct StaticDatasource {
    entries: BTreeMap<String, JsonValue>,
}

impl StaticDatasource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.entries.insert(key.into(), value);
        self
    }
}

impl Datasource for StaticDatasource {
    fn get(&self, key: &str) -> Result<JsonValue, DatasourceError> {
        self.entries.get(key).cloned().ok_or_else(|| DatasourceError::Read {
            key: key.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such key"),
        })
    }
}
