//! State object addressing

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StateError};

/// `<bucket>/<object path>`, split at the first `/`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub bucket: String,
    pub object: String,
}

impl StateKey {
    pub fn parse(key: &str) -> Result<Self> {
        let invalid = |reason: &str| StateError::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let (bucket, object) = key
            .split_once('/')
            .ok_or_else(|| invalid("expected <bucket>/<path>"))?;
        if bucket.is_empty() {
            return Err(invalid("bucket name is empty"));
        }
        if object.is_empty() {
            return Err(invalid("object path is empty"));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            object: object.to_string(),
        })
    }
}

impl FromStr for StateKey {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.object)
    }
}
