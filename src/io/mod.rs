mod http;
mod local;

pub use http::HttpObjectStore;
pub use local::LocalObjectStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Failure to fetch one object.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object is stored under the key
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// The store could not be reached or answered with an unexpected error
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

/// Trait for fetching whole objects from a storage backend by key
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read the complete object stored under `key`
    async fn get_object_bytes(&self, key: &str) -> Result<Bytes, StorageError>;
}
