//! argo-render Core - shared types for the render pipeline
//!
//! This crate provides the foundational pieces used by every stage:
//! - `Config`: the declarative `app.yaml` job description
//! - `resolve_path`: the workspace-rooted path rule
//! - `Workspace`: an isolated, self-deleting copy of the repository
//! - `find_repo_root`: locate the enclosing git checkout

pub mod config;
pub mod error;
pub mod paths;
pub mod repo;
pub mod workspace;

pub use config::{Config, HelmConfig, KustomizeConfig};
pub use error::{CoreError, Result};
pub use paths::resolve_path;
pub use repo::find_repo_root;
pub use workspace::Workspace;
