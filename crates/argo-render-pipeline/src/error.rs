//! Pipeline error types

use std::path::PathBuf;
use std::process::ExitStatus;

use argo_render_core::CoreError;
use argo_render_engine::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid config or workspace preparation failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Template expansion failure, datasource failures included
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("release name is required: set helm.releaseName or ARGOCD_APP_NAME")]
    MissingReleaseName,

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{command}` failed with {status}")]
    ToolFailed { command: String, status: ExitStatus },

    #[error("`{command}` produced output that is not UTF-8")]
    ToolOutput { command: String },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
