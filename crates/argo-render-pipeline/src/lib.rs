//! argo-render Pipeline - turns one `app.yaml` into manifest text
//!
//! ```text
//! Init → WorkspacePrepared → DatasourcesRegistered
//!      → (ValuesTemplated → ChartRendered)?
//!      → OverlayPreprocessed → OverlayBuilt → (PostRendered)? → Done
//! ```
//!
//! Every job gets its own workspace copy, datasource registry and engine.
//! External tools go through [`ToolRunner`] so tests can stand in for
//! `helm` and `kustomize`.

pub mod error;
pub mod pipeline;
pub mod stage;
pub mod tools;

pub use error::{PipelineError, Result};
pub use pipeline::{POST_RENDER_TEMPLATE, Pipeline, PipelineOptions};
pub use stage::Stage;
pub use tools::helm::{ChartRender, ReleaseDefaults};
pub use tools::kustomize::OverlayBuild;
pub use tools::{Invocation, ProcessRunner, ToolRunner};
