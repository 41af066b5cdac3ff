//! Datasource backed by YAML/JSON files in the render workspace

use std::path::{Path, PathBuf};

use argo_render_core::resolve_path;
use serde_json::Value as JsonValue;

use crate::datasource::Datasource;
use crate::error::DatasourceError;
use crate::overlay::StagedFiles;

/// Reads and parses a file on every call
///
/// Nothing is cached: earlier stages may have rewritten the file (templated
/// value files, for instance) and the latest content must win. Content
/// expanded but not yet written to disk is read from the shared stage.
#[derive(Debug, Clone)]
pub struct FileDatasource {
    /// Target of `/`-prefixed keys
    root: PathBuf,
    /// Base for every other key
    base: PathBuf,
    staged: StagedFiles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl FileDatasource {
    pub fn new(root: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base: base.into(),
            staged: StagedFiles::new(),
        }
    }

    /// Read pending expansions from `staged` before falling back to disk
    pub fn with_staged(mut self, staged: StagedFiles) -> Self {
        self.staged = staged;
        self
    }

    pub fn resolve(&self, key: &str) -> PathBuf {
        resolve_path(key, &self.root, &self.base)
    }
}

impl Datasource for FileDatasource {
    fn get(&self, key: &str) -> Result<JsonValue, DatasourceError> {
        // Check the format first so an unsupported file is never read at all
        let format = Format::detect(Path::new(key)).ok_or_else(|| {
            DatasourceError::UnsupportedFormat {
                key: key.to_string(),
            }
        })?;

        let path = self.resolve(key);
        let content = match self.staged.get(&path) {
            Some(content) => content,
            None => std::fs::read_to_string(&path).map_err(|source| DatasourceError::Read {
                key: key.to_string(),
                source,
            })?,
        };

        match format {
            Format::Yaml => serde_yaml::from_str(&content).map_err(|source| DatasourceError::Yaml {
                key: key.to_string(),
                source,
            }),
            Format::Json => serde_json::from_str(&content).map_err(|source| DatasourceError::Json {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileDatasource) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("apps/web")).unwrap();
        std::fs::write(root.join("common.yaml"), "region: eu-west-1\nzones: [a, b]\n").unwrap();
        std::fs::write(root.join("apps/web/local.json"), r#"{"replicas": 3}"#).unwrap();
        std::fs::write(root.join("apps/web/local.YML"), "debug: true\n").unwrap();
        std::fs::write(root.join("apps/web/notes.txt"), "region: nope\n").unwrap();
        std::fs::write(root.join("apps/web/broken.json"), "{").unwrap();

        let ds = FileDatasource::new(root, root.join("apps/web"));
        (dir, ds)
    }

    #[test]
    fn test_rooted_key_reads_from_workspace_root() {
        let (_dir, ds) = setup();
        let value = ds.get("/common.yaml").unwrap();
        assert_eq!(value, json!({"region": "eu-west-1", "zones": ["a", "b"]}));
    }

    #[test]
    fn test_relative_key_reads_from_base() {
        let (_dir, ds) = setup();
        assert_eq!(ds.get("local.json").unwrap(), json!({"replicas": 3}));
        assert_eq!(ds.get("../../common.yaml").unwrap()["region"], "eu-west-1");
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let (_dir, ds) = setup();
        assert_eq!(ds.get("local.YML").unwrap(), json!({"debug": true}));
    }

    #[test]
    fn test_unsupported_extension_fails() {
        let (_dir, ds) = setup();
        for key in ["notes.txt", "/common", "missing.toml"] {
            let err = ds.get(key).unwrap_err();
            assert!(
                matches!(err, DatasourceError::UnsupportedFormat { .. }),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let (_dir, ds) = setup();
        assert!(matches!(ds.get("absent.yaml").unwrap_err(), DatasourceError::Read { .. }));
        assert!(matches!(ds.get("broken.json").unwrap_err(), DatasourceError::Json { .. }));
    }

    #[test]
    fn test_staged_content_wins_over_disk() {
        let (dir, ds) = setup();
        let staged = StagedFiles::new();
        let ds = ds.with_staged(staged.clone());
        let engine = crate::engine::Engine::new(crate::datasource::DatasourceRegistry::new())
            .unwrap();

        let local = dir.path().join("apps/web/local.json");
        std::fs::write(&local, r#"{"replicas": @<< 2 + 2 >>@}"#).unwrap();
        staged.expand(&engine, &local).unwrap();

        assert_eq!(ds.get("local.json").unwrap(), json!({"replicas": 4}));
        assert_eq!(ds.get("/apps/web/./local.json").unwrap(), json!({"replicas": 4}));

        staged.materialize().unwrap();
        assert!(staged.is_empty());
        assert_eq!(ds.get("local.json").unwrap(), json!({"replicas": 4}));
    }

    #[test]
    fn test_rereads_after_rewrite() {
        let (dir, ds) = setup();
        assert_eq!(ds.get("local.json").unwrap()["replicas"], 3);

        std::fs::write(dir.path().join("apps/web/local.json"), r#"{"replicas": 5}"#).unwrap();
        assert_eq!(ds.get("local.json").unwrap()["replicas"], 5);
    }
}
