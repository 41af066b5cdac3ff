//! S3-compatible object storage fetcher

use bytes::Bytes;
use object_store::ObjectStore;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use tokio::runtime::Runtime;

use crate::error::{Result, StateError};
use crate::fetcher::StateFetcher;
use crate::key::StateKey;

/// Client settings on top of the standard AWS environment
///
/// Credentials always come from the environment (`AWS_ACCESS_KEY_ID`,
/// `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`, web identity, ...).
#[derive(Debug, Clone, Default)]
pub struct S3Options {
    pub region: Option<String>,

    /// Custom endpoint for MinIO, Ceph and friends
    pub endpoint: Option<String>,
}

/// Fetches state objects from S3, one bucket client per call
///
/// Owns a single-threaded runtime so callers can stay synchronous.
pub struct S3Fetcher {
    options: S3Options,
    runtime: Runtime,
}

impl S3Fetcher {
    pub fn new(options: S3Options) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(StateError::Runtime)?;
        Ok(Self { options, runtime })
    }

    fn store(&self, bucket: &str) -> Result<AmazonS3> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if let Some(region) = &self.options.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &self.options.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"))
                .with_virtual_hosted_style_request(false);
        }
        builder.build().map_err(|source| StateError::Client {
            bucket: bucket.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for S3Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Fetcher")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl StateFetcher for S3Fetcher {
    fn fetch(&self, key: &str) -> Result<Bytes> {
        let parsed = StateKey::parse(key)?;
        let store = self.store(&parsed.bucket)?;
        let location = ObjectPath::parse(&parsed.object).map_err(|e| StateError::InvalidKey {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!(bucket = %parsed.bucket, object = %parsed.object, "fetching state");
        self.runtime
            .block_on(async {
                let result = store.get(&location).await?;
                result.bytes().await
            })
            .map_err(|source| StateError::Fetch {
                key: key.to_string(),
                source,
            })
    }
}
