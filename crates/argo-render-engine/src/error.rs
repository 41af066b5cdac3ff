//! Engine error types

use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Main engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Invalid template syntax configuration: {0}")]
    Syntax(#[source] minijinja::Error),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// Failure of a single `Datasource::get` call
#[derive(Error, Debug)]
pub enum DatasourceError {
    #[error("datasource not found: {name}")]
    NotFound { name: String, available: Vec<String> },

    #[error("read file {key}: {source}")]
    Read {
        key: String,
        source: std::io::Error,
    },

    #[error("unsupported file format {key}: use .json, .yaml, or .yml")]
    UnsupportedFormat { key: String },

    #[error("parse yaml {key}: {source}")]
    Yaml {
        key: String,
        source: serde_yaml::Error,
    },

    #[error("parse json {key}: {source}")]
    Json {
        key: String,
        source: serde_json::Error,
    },

    /// Failure inside a datasource implemented outside this crate
    #[error("{source}")]
    Backend {
        key: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl DatasourceError {
    pub fn backend(
        key: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Hint shown under the diagnostic, if any
    pub fn help(&self) -> Option<String> {
        match self {
            Self::NotFound { name, available } => {
                if available.is_empty() {
                    return Some("no datasources are registered for this job".to_string());
                }
                let listed = available.join(", ");
                match closest(name, available) {
                    Some(best) => Some(format!("Did you mean `{best}`? Registered: {listed}")),
                    None => Some(format!("Registered datasources: {listed}")),
                }
            }
            Self::UnsupportedFormat { .. } => {
                Some("rename the file to .yaml, .yml or .json".to_string())
            }
            _ => None,
        }
    }
}

/// Names within this edit distance count as likely typos
const MAX_SUGGESTION_DISTANCE: usize = 3;

fn closest<'a>(input: &str, candidates: &'a [String]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (strsim::levenshtein(input, c), c))
        .filter(|(d, _)| *d <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(d, _)| *d)
        .map(|(_, c)| c.as_str())
}

/// Error kind for categorizing template errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateErrorKind {
    SyntaxError,
    UndefinedVariable,
    UnknownFunction,
    UnknownFilter,
    Datasource,
    Other,
}

/// Template failure with the offending source attached
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{name}: {message}")]
#[diagnostic(code(argo_render::template))]
pub struct TemplateError {
    /// Template identity (file path or `postrender`)
    pub name: String,

    pub message: String,

    pub kind: TemplateErrorKind,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    #[help]
    pub suggestion: Option<String>,
}

impl TemplateError {
    pub fn from_minijinja(err: minijinja::Error, name: &str, source: &str) -> Self {
        let datasource = find_datasource_error(&err);

        let kind = match (datasource, err.kind()) {
            (Some(_), _) => TemplateErrorKind::Datasource,
            (None, minijinja::ErrorKind::SyntaxError) => TemplateErrorKind::SyntaxError,
            (None, minijinja::ErrorKind::UndefinedError) => TemplateErrorKind::UndefinedVariable,
            (None, minijinja::ErrorKind::UnknownFunction) => TemplateErrorKind::UnknownFunction,
            (None, minijinja::ErrorKind::UnknownFilter) => TemplateErrorKind::UnknownFilter,
            _ => TemplateErrorKind::Other,
        };

        let message = match datasource {
            Some(ds) => ds.to_string(),
            None => err
                .detail()
                .map(|d| format!("{}: {}", err.kind(), d))
                .unwrap_or_else(|| err.kind().to_string()),
        };

        let suggestion = match (datasource, kind) {
            (Some(ds), _) => ds.help(),
            (None, TemplateErrorKind::UnknownFunction) => Some(
                "only `datasource(name, key)` and the helper functions are available".to_string(),
            ),
            (None, TemplateErrorKind::UndefinedVariable) => Some(
                "templates have no context object; read values with `datasource(name, key)`"
                    .to_string(),
            ),
            _ => None,
        };

        Self {
            name: name.to_string(),
            message,
            kind,
            src: NamedSource::new(name, source.to_string()),
            span: err.line().and_then(|line| calculate_span(source, line)),
            suggestion,
        }
    }

    pub fn kind(&self) -> TemplateErrorKind {
        self.kind
    }
}

/// Walk the source chain looking for the datasource failure that aborted rendering
fn find_datasource_error(err: &minijinja::Error) -> Option<&DatasourceError> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(err);
    while let Some(e) = current {
        if let Some(ds) = e.downcast_ref::<DatasourceError>() {
            return Some(ds);
        }
        current = e.source();
    }
    None
}

/// Span covering the whole of a 1-based line
fn calculate_span(source: &str, line_num: usize) -> Option<SourceSpan> {
    let mut offset = 0;

    for (idx, line) in source.split('\n').enumerate() {
        if idx + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len()));
        }
        offset += line.len() + 1;
    }

    None
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_span() {
        let span = calculate_span("a: 1\nbb: 2\n", 2).unwrap();
        assert_eq!(span.offset(), 5);
        assert_eq!(span.len(), 5);
        assert!(calculate_span("a: 1", 3).is_none());
    }

    #[test]
    fn test_not_found_suggests_closest() {
        let err = DatasourceError::NotFound {
            name: "terafrom".to_string(),
            available: vec!["file".to_string(), "terraform".to_string()],
        };
        let help = err.help().unwrap();
        assert!(help.contains("`terraform`"));
        assert!(help.contains("file, terraform"));
    }

    #[test]
    fn test_not_found_without_close_match() {
        let err = DatasourceError::NotFound {
            name: "vault".to_string(),
            available: vec!["terraform".to_string()],
        };
        assert_eq!(err.help().unwrap(), "Registered datasources: terraform");
    }
}
