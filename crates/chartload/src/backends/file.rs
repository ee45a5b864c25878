//! 📁 A directory pretending to be a bucket.
//!
//! Keys map to relative paths under `root` (`2024/1/8/shazam_2024-01-08.csv`
//! becomes `<root>/2024/1/8/shazam_2024-01-08.csv`). Writes go to a temp file
//! first and get renamed over the target, so a reader either sees the old
//! object or the new one. Never a torn half. 🦆

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::trace;

use crate::backends::ObjectStore;
use crate::error::ChartError;

// -- 🏷️ half-written objects wear this suffix until the rename, and listing skips them
const TEMP_SUFFIX: &str = ".chartload-tmp";

/// 🔧 Where the pretend bucket lives on disk.
#[derive(Debug, Deserialize, Clone)]
pub struct FileStoreConfig {
    pub root: PathBuf,
}

#[derive(Debug)]
pub(crate) struct FileStore {
    config: FileStoreConfig,
}

impl FileStore {
    pub(crate) fn new(config: FileStoreConfig) -> Self {
        Self { config }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ChartError> {
        // 🔒 keys are relative and stay inside root. No `..` tourism.
        if key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|segment| segment == ".." || segment.is_empty())
        {
            return Err(ChartError::storage(key, "key is not a clean relative path"));
        }
        Ok(self.config.root.join(key))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.config.root).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }
}

/// 🧵 Recursive directory walk. Boxed because async recursion needs a fixed-size future.
fn walk(dir: PathBuf) -> BoxFuture<'static, std::io::Result<Vec<PathBuf>>> {
    Box::pin(async move {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                files.extend(walk(entry.path()).await?);
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    })
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn list_keys(&self) -> Result<Vec<String>, ChartError> {
        let root = self.config.root.clone();
        let paths = match walk(root.clone()).await {
            Ok(paths) => paths,
            // -- 🌱 a root that doesn't exist yet is just an empty bucket
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(ChartError::storage(root.display().to_string(), e)),
        };
        let keys: Vec<String> = paths
            .iter()
            .filter_map(|p| self.key_for(p))
            .filter(|k| !k.ends_with(TEMP_SUFFIX))
            .collect();
        trace!("📁 listed {} objects under {}", keys.len(), root.display());
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ChartError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ChartError::storage(key, e)),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ChartError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ChartError::storage(key, e))?;
        }
        let mut temp_name = path.clone().into_os_string();
        temp_name.push(TEMP_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        tokio::fs::write(&temp_path, &bytes)
            .await
            .map_err(|e| ChartError::storage(key, e))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| ChartError::storage(key, e))?;
        trace!("📁 wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}
