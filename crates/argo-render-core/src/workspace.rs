//! Isolated per-job copy of the source repository
//!
//! Templates are expanded in place and the external tools write into the
//! tree, so every job works on its own copy. The copy lives in a fresh
//! temporary directory that is removed when the `Workspace` is dropped,
//! whichever way the job ends.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::{CoreError, Result};
use crate::paths::resolve_path;

const TEMP_PREFIX: &str = "argo-render-";

/// Version-control metadata directories are never copied
///
/// A submodule's `.git` *file* is ordinary content and is kept.
const SKIPPED: &str = ".git";

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    app_dir: PathBuf,
}

impl Workspace {
    /// Copy `repo_root` into a new temporary directory under the system temp dir
    ///
    /// `app_file` is the config file path relative to `repo_root`; its
    /// directory inside the copy becomes the base for relative paths.
    pub fn prepare(repo_root: &Path, app_file: &Path) -> Result<Self> {
        Self::prepare_in(&std::env::temp_dir(), repo_root, app_file)
    }

    /// Like [`Workspace::prepare`] but creates the temporary directory under `parent`
    pub fn prepare_in(parent: &Path, repo_root: &Path, app_file: &Path) -> Result<Self> {
        if app_file.is_absolute() {
            return Err(CoreError::OutsideRoot {
                path: app_file.to_path_buf(),
                root: repo_root.to_path_buf(),
            });
        }

        let dir = tempfile::Builder::new().prefix(TEMP_PREFIX).tempdir_in(parent)?;
        copy_tree(repo_root, dir.path())?;

        let app_dir = dir
            .path()
            .join(app_file)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dir.path().to_path_buf());

        tracing::debug!(
            workspace = %dir.path().display(),
            app_dir = %app_dir.display(),
            "workspace prepared"
        );

        Ok(Self { dir, app_dir })
    }

    /// Workspace root, the target of `/`-prefixed paths
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Directory of the job config inside the copy
    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Resolve a config path against this workspace
    pub fn resolve(&self, path: &str) -> PathBuf {
        resolve_path(path, self.root(), &self.app_dir)
    }

    /// Remove the workspace now, reporting any failure
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

/// Recursively copy `src` into `dst`, skipping `.git` directories
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let walker = WalkDir::new(src)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == SKIPPED));

    for entry in walker {
        let entry = entry.map_err(|e| CoreError::WorkspaceCopy {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| src.to_path_buf()),
            source: e.into(),
        })?;

        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| CoreError::OutsideRoot {
                path: entry.path().to_path_buf(),
                root: src.to_path_buf(),
            })?;
        let target = dst.join(rel);
        let copy_err = |source| CoreError::WorkspaceCopy {
            path: entry.path().to_path_buf(),
            source,
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&target).map_err(copy_err)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target).map_err(copy_err)?;
        } else if file_type.is_file() {
            std::fs::copy(entry.path(), &target).map_err(copy_err)?;
        } else {
            tracing::warn!(path = %entry.path().display(), "skipping special file");
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    let target = std::fs::read_link(src)?;
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::copy(src, dst).map(|_| ())
}
