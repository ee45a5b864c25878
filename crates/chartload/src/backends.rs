//! 🔌 Backends: where the bytes actually live.
//!
//! 🪣 Collectors drop files in, the consolidation engine reads them back out,
//! and the watermark quietly rewrites itself at the end of a good day.
//! All of it goes through one tiny trait: [`ObjectStore`].
//!
//! 🎭 This module is the casting agency. Need a bucket in RAM for a test?
//! A directory on disk for local runs? A real S3 bucket for production?
//! Same trait, same contract, different origin story.

use async_trait::async_trait;

use crate::error::ChartError;

pub(crate) mod file;
pub(crate) mod in_mem;
pub(crate) mod s3;

pub use file::FileStoreConfig;
pub use s3::S3StoreConfig;

/// 🪣 A bucket-like store of named, immutable-ish byte objects.
///
/// # Contract 📜
/// - `list_keys` returns every key in the store. Order is whatever the store feels like.
/// - `get` returns `Ok(None)` when the key is absent. Absence is information, not failure.
/// - `put` replaces the whole object. Readers never observe half a write.
/// - Every failure is `ChartError::StorageUnavailable`, naming the key that hurt.
#[async_trait]
pub(crate) trait ObjectStore: std::fmt::Debug + Send + Sync {
    /// 📋 Every key in the store.
    async fn list_keys(&self) -> Result<Vec<String>, ChartError>;
    /// 📥 The object's bytes, or `None` if it doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ChartError>;
    /// 📤 Write (or atomically replace) an object.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ChartError>;
}

/// 🎭 The many faces of an object store.
///
/// Dispatches via `impl ObjectStore for StorageBackend`, so callers never need
/// to know whether the bucket is a `BTreeMap`, a folder, or somebody's AWS bill.
#[derive(Debug)]
pub(crate) enum StorageBackend {
    InMemory(in_mem::InMemoryStore),
    File(file::FileStore),
    S3(s3::S3Store),
}

#[async_trait]
impl ObjectStore for StorageBackend {
    async fn list_keys(&self) -> Result<Vec<String>, ChartError> {
        match self {
            StorageBackend::InMemory(store) => store.list_keys().await,
            StorageBackend::File(store) => store.list_keys().await,
            StorageBackend::S3(store) => store.list_keys().await,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ChartError> {
        match self {
            StorageBackend::InMemory(store) => store.get(key).await,
            StorageBackend::File(store) => store.get(key).await,
            StorageBackend::S3(store) => store.get(key).await,
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ChartError> {
        match self {
            StorageBackend::InMemory(store) => store.put(key, bytes).await,
            StorageBackend::File(store) => store.put(key, bytes).await,
            StorageBackend::S3(store) => store.put(key, bytes).await,
        }
    }
}
