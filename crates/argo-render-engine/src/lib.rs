//! argo-render Engine - template expansion over pluggable datasources
//!
//! This crate provides:
//! - `Datasource`: the key -> structured value capability, plus the registry
//!   templates resolve names against
//! - `FileDatasource`: YAML/JSON files from the render workspace
//! - `Engine`: MiniJinja with `@<< >>@` delimiters, helper filters/functions
//!   and the `datasource(name, key)` function
//! - `OverlayPreprocessor`: in-place expansion of `*.tmpl.yaml` files

pub mod datasource;
pub mod engine;
pub mod error;
pub mod file;
pub mod filters;
pub mod functions;
pub mod overlay;

pub use datasource::{Datasource, DatasourceRegistry, StaticDatasource};
pub use engine::{Engine, EngineBuilder};
pub use error::{DatasourceError, EngineError, Result, TemplateError, TemplateErrorKind};
pub use file::FileDatasource;
pub use overlay::{OverlayPreprocessor, StagedFiles, is_template_file};
