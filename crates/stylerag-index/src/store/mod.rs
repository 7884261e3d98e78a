//! Object store backends holding the published index artifacts.
//!
//! `s3` goes through the AWS SDK and its credential chain; `http` issues
//! plain `HEAD`/`GET` against an S3-compatible base URL; `local` treats a
//! directory as the bucket and is what development setups and tests use.
use std::sync::Arc;

use stylerag_core::config::{StorageBackend, StorageConfig};
use stylerag_core::error::{Error, Result};
use stylerag_core::traits::ObjectStore;

pub mod http;
pub mod local;
pub mod s3;

pub use http::HttpObjectStore;
pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;

pub fn build_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.backend {
        StorageBackend::S3 => {
            Ok(Arc::new(S3ObjectStore::new(config.bucket()?, &config.region, config.endpoint.clone())))
        }
        StorageBackend::Local => Ok(Arc::new(LocalObjectStore::new(config.local_root()?))),
        StorageBackend::Http => {
            let store = HttpObjectStore::new(
                &config.endpoint_url()?,
                config.bucket()?,
                config.auth_token.clone(),
                config.fetch_timeout(),
            )
            .map_err(Error::config)?;
            Ok(Arc::new(store))
        }
    }
}
