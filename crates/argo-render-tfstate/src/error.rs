//! Terraform state errors

use thiserror::Error;

/// A value that does not fit its declared type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("output {output}{path}: {message}")]
pub struct DecodeError {
    /// Output name
    pub output: String,

    /// Location inside the output value, e.g. `.kubeconfig_data.port` or `[2]`
    pub path: String,

    pub message: String,
}

impl DecodeError {
    pub(crate) fn at(path: &str, message: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn in_output(mut self, output: &str) -> Self {
        self.output = output.to_string();
        self
    }
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("invalid state key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("failed to configure object store client for bucket {bucket}: {source}")]
    Client {
        bucket: String,
        source: object_store::Error,
    },

    #[error("failed to start object store runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to fetch {key}: {source}")]
    Fetch {
        key: String,
        source: object_store::Error,
    },

    #[error("{key} is not a terraform state document: {source}")]
    Document {
        key: String,
        source: serde_json::Error,
    },

    #[error("invalid type descriptor for output {output}: {message}")]
    Type { output: String, message: String },

    #[error("failed to decode {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },
}

pub type Result<T> = std::result::Result<T, StateError>;
