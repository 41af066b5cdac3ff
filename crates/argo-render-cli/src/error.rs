//! CLI error type and its exit codes

use argo_render_core::CoreError;
use argo_render_engine::{EngineError, TemplateError, TemplateErrorKind};
use argo_render_pipeline::PipelineError;
use argo_render_tfstate::StateError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Invalid config: {message}")]
    #[diagnostic(code(argo_render::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Keeps the template source and span for rendering
    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(TemplateError),

    #[error("Datasource error: {message}")]
    #[diagnostic(code(argo_render::cli::datasource))]
    Datasource { message: String },

    #[error("External tool failed: {message}")]
    #[diagnostic(code(argo_render::cli::tool))]
    Tool {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO error: {message}")]
    #[diagnostic(code(argo_render::cli::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(argo_render::cli::error))]
    Other { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Template(te) if te.kind() == TemplateErrorKind::Datasource => {
                exit_codes::DATASOURCE_ERROR
            }
            CliError::Template(_) => exit_codes::TEMPLATE_ERROR,
            CliError::Datasource { .. } => exit_codes::DATASOURCE_ERROR,
            CliError::Tool { .. } => exit_codes::TOOL_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidConfig { .. }
            | CoreError::ConfigParse { .. }
            | CoreError::OutsideRoot { .. } => CliError::config(err.to_string()),
            CoreError::RepositoryRootNotFound { .. } => CliError::config_with_help(
                err.to_string(),
                "the config file must live inside a git checkout",
            ),
            CoreError::ConfigRead { .. } | CoreError::WorkspaceCopy { .. } | CoreError::Io(_) => {
                CliError::Io {
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Template(te) => CliError::Template(te),
            EngineError::Syntax(_) => CliError::Other {
                message: err.to_string(),
            },
            EngineError::Read { .. } | EngineError::Write { .. } | EngineError::Walk { .. } => {
                CliError::Io {
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Core(e) => e.into(),
            PipelineError::Engine(e) => e.into(),
            PipelineError::MissingReleaseName => CliError::config_with_help(
                err.to_string(),
                "pass --release-name when running outside Argo CD",
            ),
            PipelineError::Spawn { ref program, .. } => CliError::Tool {
                help: Some(format!(
                    "install {program} or point --helm-bin / --kustomize-bin at it"
                )),
                message: err.to_string(),
            },
            PipelineError::ToolFailed { .. } | PipelineError::ToolOutput { .. } => {
                CliError::Tool {
                    message: err.to_string(),
                    help: None,
                }
            }
            PipelineError::Write { .. } => CliError::Io {
                message: err.to_string(),
            },
        }
    }
}

impl From<StateError> for CliError {
    fn from(err: StateError) -> Self {
        CliError::Datasource {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_exit_code() {
        let err: CliError = CoreError::InvalidConfig {
            field: "kustomize.path".to_string(),
            message: "is required".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
        assert!(err.to_string().contains("kustomize.path"));
    }

    #[test]
    fn test_pipeline_errors_map_to_codes() {
        let err: CliError = PipelineError::MissingReleaseName.into();
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);

        let err: CliError = PipelineError::Spawn {
            program: "helm".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::TOOL_ERROR);

        let err: CliError = PipelineError::Core(CoreError::Io(std::io::Error::other("disk"))).into();
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);
    }

    #[test]
    fn test_state_error_is_datasource_error() {
        let err: CliError = StateError::InvalidKey {
            key: "bucket".to_string(),
            reason: "expected <bucket>/<path>".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::DATASOURCE_ERROR);
    }
}
