//! Git checkout discovery

use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Walk upward from `start` to the first directory containing `.git`
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    let start = std::path::absolute(start)?;

    let mut dir = start.as_path();
    loop {
        if dir.join(".git").exists() {
            return Ok(dir.to_path_buf());
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => return Err(CoreError::RepositoryRootNotFound { start }),
        }
    }
}
