//! 📦 The bucket that lives in RAM and dies with the process.
//!
//! For tests and local experiments. No network calls, no disk I/O, no AWS
//! invoice. Clone it, hand one copy to the pipeline, keep the other to peek
//! at what got written. The `Arc` means everyone shares the same map.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backends::ObjectStore;
use crate::error::ChartError;

/// 🔒 The vault: key → bytes, behind an async mutex.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemoryStore {
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    /// 💀 When set, every operation fails. For rehearsing bad days.
    unavailable: bool,
}

impl InMemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 🧪 Seed an object directly, skipping the trait. Test helper energy.
    #[cfg(test)]
    pub(crate) async fn insert(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.objects.lock().await.insert(key.into(), bytes.into());
    }

    /// 💀 A store that refuses everything.
    #[cfg(test)]
    pub(crate) fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    fn check(&self, key: &str) -> Result<(), ChartError> {
        if self.unavailable {
            return Err(ChartError::storage(key, "in-memory store is marked unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn list_keys(&self) -> Result<Vec<String>, ChartError> {
        self.check("<listing>")?;
        Ok(self.objects.lock().await.keys().cloned().collect())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ChartError> {
        self.check(key)?;
        Ok(self.objects.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ChartError> {
        self.check(key)?;
        self.objects.lock().await.insert(key.to_string(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn the_one_where_what_goes_in_comes_back_out() -> anyhow::Result<()> {
        let store = InMemoryStore::new();
        store.put("2024/1/8/shazam_2024-01-08.csv", b"rank\n1".to_vec()).await?;

        assert_eq!(
            store.get("2024/1/8/shazam_2024-01-08.csv").await?,
            Some(b"rank\n1".to_vec())
        );
        assert_eq!(store.get("nope").await?, None);
        assert_eq!(store.list_keys().await?, vec!["2024/1/8/shazam_2024-01-08.csv"]);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_clones_share_the_same_bucket() -> anyhow::Result<()> {
        let store = InMemoryStore::new();
        let the_spy = store.clone();
        store.put("k", b"v".to_vec()).await?;
        assert_eq!(the_spy.get("k").await?, Some(b"v".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_an_unavailable_store_names_the_key() {
        let store = InMemoryStore::unavailable();
        match store.get("metadata/watermark.txt").await {
            Err(ChartError::StorageUnavailable { key, .. }) => {
                assert_eq!(key, "metadata/watermark.txt")
            }
            other => panic!("💀 expected StorageUnavailable, got {other:?}"),
        }
    }
}
