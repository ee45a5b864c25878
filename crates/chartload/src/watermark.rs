//! 🔖 Watermark: the sticky note that says "you already ate these".
//!
//! The watermark is the only durable state this crate owns. It is a sorted,
//! newline-joined list of every landed file key that has already been
//! consolidated into the warehouse, stored as one object at a well-known key
//! (`metadata/watermark.txt` by default).
//!
//! 🧠 Knowledge graph:
//! - Read once at the start of a data load. Absent object = first run = empty set.
//! - Grown once at the end, and only if the caller decides to commit.
//! - Replaced whole, never patched. Monotonic: the new set always contains the old one.
//! - Membership is exact string match on the key. No prefixes, no patterns, no vibes.
//! - ⚠️ Two overlapping runs race: last writer wins and a file can be loaded twice.
//!   Runs are expected not to overlap.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::backends::ObjectStore;
use crate::error::ChartError;

/// 📋 The set of file keys already consolidated. Sorted, distinct, grows only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watermark {
    keys: BTreeSet<String>,
}

impl Watermark {
    /// 🏗️ Build from any pile of keys. Duplicates collapse, blanks are dropped.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(Into::into)
                .filter(|k: &String| !k.trim().is_empty())
                .collect(),
        }
    }

    /// 📄 Parse the persisted form: one key per line.
    pub(crate) fn parse(content: &str) -> Self {
        Self::from_keys(content.lines().map(str::trim))
    }

    /// 📄 The persisted form: sorted keys joined with `\n`, no trailing newline.
    pub(crate) fn render(&self) -> String {
        self.keys.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// ➕ A new watermark containing everything here plus `newly_processed`.
    /// `self` is untouched, so the caller can still diff old against new.
    pub fn advanced_with<I, S>(&self, newly_processed: I) -> Watermark
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut grown = self.clone();
        grown.keys.extend(
            newly_processed
                .into_iter()
                .map(Into::into)
                .filter(|k: &String| !k.trim().is_empty()),
        );
        grown
    }
}

/// 🗄️ Reads and writes the watermark object in an [`ObjectStore`].
#[derive(Debug, Clone)]
pub(crate) struct WatermarkStore {
    key: String,
}

impl WatermarkStore {
    pub(crate) fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    /// 📥 Load the watermark. First-ever run (object absent) yields an empty set.
    ///
    /// 💀 `StorageUnavailable` if the object exists but cannot be read, or
    /// if its bytes are not UTF-8.
    pub(crate) async fn load<S>(&self, store: &S) -> Result<Watermark, ChartError>
    where
        S: ObjectStore + ?Sized,
    {
        let Some(bytes) = store.get(&self.key).await? else {
            info!("🔖 no watermark at '{}' yet, treating this as the first run", self.key);
            return Ok(Watermark::default());
        };
        let content = String::from_utf8(bytes).map_err(|e| ChartError::storage(&self.key, e))?;
        let watermark = Watermark::parse(&content);
        debug!("🔖 loaded watermark with {} keys", watermark.len());
        Ok(watermark)
    }

    /// 📤 Persist `previous ∪ newly_processed`, replacing the stored object.
    /// Returns what was written so the caller can log or report it.
    pub(crate) async fn save<S, I, K>(
        &self,
        store: &S,
        previous: &Watermark,
        newly_processed: I,
    ) -> Result<Watermark, ChartError>
    where
        S: ObjectStore + ?Sized,
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let grown = previous.advanced_with(newly_processed);
        store.put(&self.key, grown.render().into_bytes()).await?;
        info!(
            "🔖 watermark advanced from {} to {} keys",
            previous.len(),
            grown.len()
        );
        Ok(grown)
    }
}
