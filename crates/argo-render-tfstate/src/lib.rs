//! Terraform remote state as an argo-render datasource
//!
//! A key such as `tf-states/prod/cluster.tfstate` names an object in a
//! bucket. The state document is fetched once per job, its `outputs` are
//! decoded against their type descriptors, and templates receive a plain
//! mapping of output name to value:
//!
//! ```text
//! server: @<< datasource("terraform", "tf-states/prod/cluster.tfstate").kubeconfig_data.endpoint >>@
//! ```
//!
//! ## Layers
//!
//! - [`StateFetcher`]: raw bytes for a key ([`S3Fetcher`] in production)
//! - [`CachedFetcher`]: fetch-once wrapper, one per job
//! - [`TerraformState`]: decodes outputs and implements `Datasource`

pub mod cache;
pub mod decode;
pub mod error;
pub mod fetcher;
pub mod key;
pub mod s3;
pub mod state;
pub mod types;

pub use cache::CachedFetcher;
pub use decode::decode_value;
pub use error::{DecodeError, Result, StateError};
pub use fetcher::StateFetcher;
pub use key::StateKey;
pub use s3::{S3Fetcher, S3Options};
pub use state::{TerraformState, decode_outputs};
pub use types::TypeDescriptor;
