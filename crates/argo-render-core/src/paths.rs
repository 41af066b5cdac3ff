//! Path resolution shared by datasources and pipeline stages

use std::path::{Path, PathBuf};

/// Resolve a config or template path
///
/// A path with a leading `/` is rooted at `root` (the workspace), anything
/// else is taken relative to `base` (the directory holding `app.yaml`).
pub fn resolve_path(path: &str, root: &Path, base: &Path) -> PathBuf {
    match path.strip_prefix('/') {
        Some(rooted) => root.join(rooted.trim_start_matches('/')),
        None => base.join(path),
    }
}
