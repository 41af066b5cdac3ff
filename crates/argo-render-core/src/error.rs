//! Core error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid config: {field}: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Git repository root not found above {start}")]
    RepositoryRootNotFound { start: PathBuf },

    #[error("Failed to copy {path} into workspace: {source}")]
    WorkspaceCopy {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Path {path} is outside of {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn invalid_config(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
