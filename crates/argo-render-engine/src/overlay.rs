//! Expansion of `*.tmpl.yaml` files before the overlay build
//!
//! Expanded content is staged in memory first and only written back once
//! every file has rendered, right before the external tool reads the tree.
//! The stage is shared with the `file` datasource, so a template can read a
//! sibling that was expanded earlier in the same pass.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use walkdir::WalkDir;

use crate::engine::Engine;
use crate::error::{EngineError, Result};

/// File name endings that mark a file for expansion
pub const TEMPLATE_SUFFIXES: &[&str] = &[".tmpl.yaml", ".tmpl.yml"];

pub fn is_template_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| TEMPLATE_SUFFIXES.iter().any(|s| name.ends_with(s)))
}

/// Expanded file contents waiting to be written, keyed by path
///
/// Clones share the same stage.
#[derive(Debug, Clone, Default)]
pub struct StagedFiles {
    files: Arc<RwLock<BTreeMap<PathBuf, String>>>,
}

impl StagedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand `path` with `engine` and stage the result
    pub fn expand(&self, engine: &Engine, path: &Path) -> Result<()> {
        let rendered = engine.render_file(path)?;
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize(path), rendered);
        Ok(())
    }

    /// Staged content for `path`, if it was expanded and not yet written
    pub fn get(&self, path: &Path) -> Option<String> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize(path))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.files.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write every staged file to disk and empty the stage
    ///
    /// Returns how many files were written.
    pub fn materialize(&self) -> Result<usize> {
        let files =
            std::mem::take(&mut *self.files.write().unwrap_or_else(PoisonError::into_inner));

        for (path, content) in &files {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| EngineError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            std::fs::write(path, content).map_err(|source| EngineError::Write {
                path: path.clone(),
                source,
            })?;
        }
        Ok(files.len())
    }
}

/// Lexically drop `.` and fold `..` so `a/../b` and `b` name the same entry
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out
}

/// Expands every template file below a directory
#[derive(Debug)]
pub struct OverlayPreprocessor<'a> {
    engine: &'a Engine,
    staged: StagedFiles,
}

impl<'a> OverlayPreprocessor<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self {
            engine,
            staged: StagedFiles::new(),
        }
    }

    /// Stage into `staged` instead of a private stage
    pub fn with_staged(mut self, staged: StagedFiles) -> Self {
        self.staged = staged;
        self
    }

    /// Render every template file under `dir` without touching the disk
    ///
    /// Stops at the first file that fails.
    pub fn stage(&self, dir: &Path) -> Result<StagedFiles> {
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|source| EngineError::Walk {
                path: dir.to_path_buf(),
                source,
            })?;

            // Symlinks are skipped: writing through one could escape the workspace
            if entry.file_type().is_file() && is_template_file(entry.path()) {
                self.staged.expand(self.engine, entry.path())?;
            }
        }

        tracing::debug!(dir = %dir.display(), templates = self.staged.len(), "overlay staged");
        Ok(self.staged.clone())
    }

    /// Expand every template file under `dir` in place
    pub fn preprocess(&self, dir: &Path) -> Result<usize> {
        self.stage(dir)?.materialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{DatasourceRegistry, StaticDatasource};
    use crate::error::TemplateErrorKind;
    use crate::file::FileDatasource;
    use serde_json::json;
    use tempfile::TempDir;

    fn engine() -> Engine {
        let registry = DatasourceRegistry::new().with(
            "static",
            StaticDatasource::new().with_entry("app", json!({"replicas": 3, "host": "web.local"})),
        );
        Engine::new(registry).unwrap()
    }

    fn overlay() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("patches")).unwrap();
        std::fs::write(root.join("kustomization.yaml"), "resources:\n  - deploy.tmpl.yaml\n")
            .unwrap();
        std::fs::write(
            root.join("deploy.tmpl.yaml"),
            "replicas: @<< datasource(\"static\", \"app\").replicas >>@\n",
        )
        .unwrap();
        std::fs::write(
            root.join("patches/ingress.tmpl.yml"),
            "host: @<< datasource(\"static\", \"app\").host >>@\n",
        )
        .unwrap();
        std::fs::write(root.join("patches/raw.yaml"), "host: @<< untouched >>@\n").unwrap();
        dir
    }

    #[test]
    fn test_normalize_folds_dot_segments() {
        assert_eq!(normalize(Path::new("/ws/a/./b/../c.yaml")), PathBuf::from("/ws/a/c.yaml"));
        assert_eq!(normalize(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize(Path::new("../../x")), PathBuf::from("../../x"));
    }

    #[test]
    fn test_is_template_file() {
        assert!(is_template_file(Path::new("a/b.tmpl.yaml")));
        assert!(is_template_file(Path::new("b.tmpl.yml")));
        assert!(!is_template_file(Path::new("b.yaml")));
        assert!(!is_template_file(Path::new("b.tmpl.json")));
        assert!(!is_template_file(Path::new("tmpl.yaml")));
    }

    #[test]
    fn test_preprocess_expands_only_templates() {
        let dir = overlay();
        let engine = engine();

        let count = OverlayPreprocessor::new(&engine).preprocess(dir.path()).unwrap();
        assert_eq!(count, 2);

        let read = |p: &str| std::fs::read_to_string(dir.path().join(p)).unwrap();
        assert_eq!(read("deploy.tmpl.yaml"), "replicas: 3\n");
        assert_eq!(read("patches/ingress.tmpl.yml"), "host: web.local\n");
        assert_eq!(read("patches/raw.yaml"), "host: @<< untouched >>@\n");
    }

    #[test]
    fn test_stage_leaves_disk_untouched() {
        let dir = overlay();
        let engine = engine();

        let staged = OverlayPreprocessor::new(&engine).stage(dir.path()).unwrap();
        let deploy = dir.path().join("deploy.tmpl.yaml");
        assert_eq!(staged.get(&deploy).as_deref(), Some("replicas: 3\n"));
        assert!(std::fs::read_to_string(&deploy).unwrap().contains("@<<"));
    }

    #[test]
    fn test_template_reads_sibling_expanded_earlier() {
        let dir = overlay();
        std::fs::write(
            dir.path().join("patches/scale.tmpl.yaml"),
            "replicas: @<< datasource(\"file\", \"deploy.tmpl.yaml\").replicas * 2 >>@\n",
        )
        .unwrap();

        let staged = StagedFiles::new();
        let registry = DatasourceRegistry::new()
            .with(
                "static",
                StaticDatasource::new().with_entry("app", json!({"replicas": 3, "host": "h"})),
            )
            .with(
                "file",
                FileDatasource::new(dir.path(), dir.path()).with_staged(staged.clone()),
            );
        let engine = Engine::new(registry).unwrap();

        let count = OverlayPreprocessor::new(&engine)
            .with_staged(staged.clone())
            .preprocess(dir.path())
            .unwrap();
        assert_eq!(count, 3);
        assert!(staged.is_empty());

        let scale = std::fs::read_to_string(dir.path().join("patches/scale.tmpl.yaml")).unwrap();
        assert_eq!(scale, "replicas: 6\n");
    }

    #[test]
    fn test_second_pass_is_identical() {
        let dir = overlay();
        let engine = engine();
        let pre = OverlayPreprocessor::new(&engine);

        pre.preprocess(dir.path()).unwrap();
        let first = std::fs::read_to_string(dir.path().join("deploy.tmpl.yaml")).unwrap();
        pre.preprocess(dir.path()).unwrap();
        let second = std::fs::read_to_string(dir.path().join("deploy.tmpl.yaml")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_failure_aborts_without_writing() {
        let dir = overlay();
        std::fs::write(
            dir.path().join("patches/bad.tmpl.yaml"),
            "x: @<< datasource(\"vault\", \"k\") >>@\n",
        )
        .unwrap();
        let engine = engine();

        let err = OverlayPreprocessor::new(&engine).preprocess(dir.path()).unwrap_err();
        match err {
            EngineError::Template(te) => {
                assert_eq!(te.kind(), TemplateErrorKind::Datasource);
                assert!(te.name.ends_with("bad.tmpl.yaml"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let deploy = std::fs::read_to_string(dir.path().join("deploy.tmpl.yaml")).unwrap();
        assert!(deploy.contains("@<<"));
    }

    #[test]
    fn test_missing_directory() {
        let engine = engine();
        let err = OverlayPreprocessor::new(&engine)
            .preprocess(Path::new("/nonexistent/overlay"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Walk { .. }));
    }
}
