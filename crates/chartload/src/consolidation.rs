//! 🧩 The consolidation engine: new landed files in, one table per source out.
//!
//! 🎬 COLD OPEN: INT. SORTING OFFICE, MONDAY MORNING
//!
//! The bucket is a mailroom floor. Some envelopes were opened last week
//! (the watermark knows which), some are junk mail for a different
//! department (unrecognized keys), and the rest need to be opened, read,
//! and stapled together by sender. That's this module.
//!
//! ```text
//!   all keys ──▶ minus watermark ──▶ classify ──▶ group by source
//!                                                       │
//!              ┌────────────────────────────────────────┘
//!              ▼  (per source, sequential)
//!        download each ──▶ gunzip? ──▶ normalize_source ──▶ SourceBatch
//!              │                                              or
//!              └──────────── any failure ──────────────▶ SourceFailure
//! ```
//!
//! 🧠 Knowledge graph:
//! - The watermark is passed in, never fetched here. Callers own commit timing.
//! - A source with zero new files is absent from both maps. No empty writes downstream.
//! - A failure inside one source poisons only that source. The other two still ship.
//! - The engine never writes. Not to storage, not to the warehouse, not to the watermark.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;

use flate2::read::GzDecoder;
use tracing::{debug, info, trace, warn};

use crate::backends::ObjectStore;
use crate::classifier::{SourceTag, classify};
use crate::common::Table;
use crate::error::ChartError;
use crate::normalizers::{NormalizeOptions, normalize_source};
use crate::progress::SourceProgress;
use crate::watermark::Watermark;

// -- 🗜️ collectors may land gzipped payloads; the name says so
const GZIP_SUFFIX: &str = ".gz";

/// ✅ One source, fully consolidated.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SourceBatch {
    /// The landed keys this table was built from, in listing order.
    pub(crate) keys: Vec<String>,
    pub(crate) table: Table,
}

/// 💀 One source that didn't make it, and the keys it was trying to eat.
#[derive(Debug)]
pub(crate) struct SourceFailure {
    pub(crate) keys: Vec<String>,
    pub(crate) error: ChartError,
}

/// 📦 What a consolidation pass produced.
#[derive(Debug, Default)]
pub(crate) struct Consolidation {
    pub(crate) batches: BTreeMap<SourceTag, SourceBatch>,
    pub(crate) failures: BTreeMap<SourceTag, SourceFailure>,
}

impl Consolidation {
    /// 🔖 Every key that ended up in a table. Feed these to the watermark.
    pub(crate) fn consolidated_keys(&self) -> Vec<String> {
        self.batches
            .values()
            .flat_map(|batch| batch.keys.iter().cloned())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.batches.is_empty() && self.failures.is_empty()
    }
}

/// ➖ `all_keys - watermark`, exact match, listing order kept, duplicates collapsed.
pub(crate) fn unprocessed_keys(all_keys: &[String], watermark: &Watermark) -> Vec<String> {
    let mut seen = HashSet::new();
    all_keys
        .iter()
        .filter(|key| !watermark.contains(key))
        .filter(|key| seen.insert(key.as_str()))
        .cloned()
        .collect()
}

/// 🗂️ Bucket keys by source. Unrecognized keys are dropped without ceremony.
pub(crate) fn group_by_source(keys: Vec<String>) -> BTreeMap<SourceTag, Vec<String>> {
    let mut groups: BTreeMap<SourceTag, Vec<String>> = BTreeMap::new();
    for key in keys {
        match classify(&key) {
            Some(source) => groups.entry(source).or_default().push(key),
            None => trace!("🙈 ignoring unrecognized key '{}'", key),
        }
    }
    groups
}

/// 📥 Fetch one landed file as text, gunzipping `.gz` keys.
///
/// A key that was listed but is now gone counts as a storage failure: landed
/// files are immutable, so a vanishing one means the store is misbehaving.
pub(crate) async fn read_landed<S>(store: &S, key: &str) -> Result<String, ChartError>
where
    S: ObjectStore + ?Sized,
{
    let bytes = store
        .get(key)
        .await?
        .ok_or_else(|| ChartError::storage(key, "listed object disappeared before it could be read"))?;
    trace!("📥 read {} bytes from '{}'", bytes.len(), key);

    let bytes = if key.ends_with(GZIP_SUFFIX) {
        let mut inflated = Vec::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut inflated)
            .map_err(|e| ChartError::malformed(key, format!("not a valid gzip stream: {e}")))?;
        inflated
    } else {
        bytes
    };

    String::from_utf8(bytes).map_err(|e| ChartError::malformed(key, format!("not UTF-8: {e}")))
}

/// 🔄 Download and normalize every file of one source. First failure wins.
async fn consolidate_source<S>(
    store: &S,
    source: SourceTag,
    keys: &[String],
    options: NormalizeOptions,
) -> Result<Table, ChartError>
where
    S: ObjectStore + ?Sized,
{
    let mut progress = SourceProgress::new(source, keys.len());
    let mut files = Vec::with_capacity(keys.len());
    for key in keys {
        let content = read_landed(store, key).await?;
        progress.advance(content.len());
        files.push((key.clone(), content));
    }
    debug!("📥 {}: {}", source, progress.finish());
    normalize_source(source, &files, options)
}

/// 🧩 Turn every new landed file into one table per source.
///
/// Storage and parse failures are caught per source and parked in
/// [`Consolidation::failures`]. Nothing here is fatal for the run.
pub(crate) async fn consolidate<S>(
    store: &S,
    all_keys: &[String],
    watermark: &Watermark,
    options: NormalizeOptions,
) -> Consolidation
where
    S: ObjectStore + ?Sized,
{
    let fresh = unprocessed_keys(all_keys, watermark);
    info!(
        "🧩 {} keys listed, {} in the watermark, {} new",
        all_keys.len(),
        watermark.len(),
        fresh.len()
    );

    let mut outcome = Consolidation::default();
    for (source, keys) in group_by_source(fresh) {
        debug!("🧩 consolidating {} files for {}", keys.len(), source);
        match consolidate_source(store, source, &keys, options).await {
            Ok(table) => {
                info!(
                    "✅ {} consolidated: {} files, {} rows",
                    source,
                    keys.len(),
                    table.row_count()
                );
                outcome.batches.insert(source, SourceBatch { keys, table });
            }
            Err(error) => {
                warn!("⚠️ {} failed to consolidate, carrying on without it: {}", source, error);
                outcome.failures.insert(source, SourceFailure { keys, error });
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;
    use crate::backends::in_mem::InMemoryStore;

    const SHAZAM_OLD: &str = "2024/1/1/shazam_2024-01-01.csv";
    const SHAZAM_NEW: &str = "2024/1/8/shazam_2024-01-08.csv";
    const SPOTIFY_NEW: &str = "2024/1/8/spotify_2024-01-08.csv";
    const LASTFM_NEW: &str = "2024/1/8/lastfm_2024-01-08.json";

    async fn bucket_with(files: &[(&str, &str)]) -> InMemoryStore {
        let store = InMemoryStore::new();
        for (key, body) in files {
            store.insert(*key, body.as_bytes().to_vec()).await;
        }
        store
    }

    #[test]
    fn the_one_where_watermarked_keys_never_come_back() {
        let all = vec![
            SHAZAM_OLD.to_string(),
            SHAZAM_NEW.to_string(),
            SHAZAM_NEW.to_string(),
        ];
        let watermark = Watermark::from_keys([SHAZAM_OLD]);
        assert_eq!(unprocessed_keys(&all, &watermark), vec![SHAZAM_NEW.to_string()]);
    }

    #[test]
    fn the_one_where_junk_mail_is_dropped_on_the_floor() {
        let groups = group_by_source(vec![
            SHAZAM_NEW.to_string(),
            "metadata/watermark.txt".to_string(),
            "2024/1/8/README.md".to_string(),
            LASTFM_NEW.to_string(),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&SourceTag::Shazam], vec![SHAZAM_NEW.to_string()]);
        assert_eq!(groups[&SourceTag::LastFm], vec![LASTFM_NEW.to_string()]);
    }

    #[tokio::test]
    async fn the_one_where_only_last_weeks_shazam_is_old_news() -> anyhow::Result<()> {
        let store = bucket_with(&[
            (SHAZAM_OLD, "Rank,Artist,Title\n1,Old,Song\n"),
            (SHAZAM_NEW, "Rank,Artist,Title\n1,SZA,Snooze\n2,Drake,Passionfruit\n"),
            (SPOTIFY_NEW, "track_id,track_popularity\nabc,90\n"),
        ])
        .await;
        let all = store.list_keys().await?;
        let watermark = Watermark::from_keys([SHAZAM_OLD]);

        let outcome = consolidate(&store, &all, &watermark, NormalizeOptions::default()).await;

        assert!(outcome.failures.is_empty());
        let shazam = &outcome.batches[&SourceTag::Shazam];
        assert_eq!(shazam.keys, vec![SHAZAM_NEW.to_string()]);
        assert_eq!(
            shazam.table.column("Artist").unwrap_or_default(),
            vec![Some("SZA"), Some("Drake")]
        );
        assert_eq!(outcome.batches[&SourceTag::Spotify].table.row_count(), 1);
        assert!(!outcome.batches.contains_key(&SourceTag::LastFm));

        let advanced = watermark.advanced_with(outcome.consolidated_keys());
        assert_eq!(
            advanced.keys().collect::<Vec<_>>(),
            vec![SHAZAM_OLD, SHAZAM_NEW, SPOTIFY_NEW]
        );
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_broken_lastfm_file_does_not_take_the_others_down() -> anyhow::Result<()>
    {
        let store = bucket_with(&[
            (LASTFM_NEW, r#"{"tracks": {"track": [ oops"#),
            (SHAZAM_NEW, "Rank,Artist,Title\n1,SZA,Snooze\n"),
            (SPOTIFY_NEW, "track_id,track_popularity\nabc,90\n"),
        ])
        .await;
        let all = store.list_keys().await?;

        let outcome = consolidate(&store, &all, &Watermark::default(), NormalizeOptions::default()).await;

        let failure = &outcome.failures[&SourceTag::LastFm];
        assert_eq!(failure.keys, vec![LASTFM_NEW.to_string()]);
        assert!(matches!(failure.error, ChartError::MalformedRecord { .. }));
        assert!(outcome.batches.contains_key(&SourceTag::Shazam));
        assert!(outcome.batches.contains_key(&SourceTag::Spotify));

        let mut keys = outcome.consolidated_keys();
        keys.sort();
        assert_eq!(keys, vec![SHAZAM_NEW.to_string(), SPOTIFY_NEW.to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_nothing_new_means_nothing_at_all() -> anyhow::Result<()> {
        let store = bucket_with(&[(SHAZAM_OLD, "Rank\n1\n")]).await;
        let all = store.list_keys().await?;
        let outcome =
            consolidate(&store, &all, &Watermark::from_keys([SHAZAM_OLD]), NormalizeOptions::default())
                .await;
        assert!(outcome.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_two_weeks_of_shazam_are_stapled_together() -> anyhow::Result<()> {
        let store = bucket_with(&[
            (SHAZAM_OLD, "Rank,Artist\n1,A\n"),
            (SHAZAM_NEW, "Rank,Artist\n1,B\n2,C\n"),
        ])
        .await;
        let all = store.list_keys().await?;
        let outcome = consolidate(&store, &all, &Watermark::default(), NormalizeOptions::default()).await;
        let batch = &outcome.batches[&SourceTag::Shazam];
        assert_eq!(batch.keys.len(), 2);
        assert_eq!(batch.table.row_count(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_gzipped_landing_is_inflated_on_read() -> anyhow::Result<()> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"Rank,Artist\n1,SZA\n")?;
        let store = InMemoryStore::new();
        store.insert("2024/1/8/shazam_2024-01-08.csv.gz", encoder.finish()?).await;

        let content = read_landed(&store, "2024/1/8/shazam_2024-01-08.csv.gz").await?;
        assert_eq!(content, "Rank,Artist\n1,SZA\n");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_vanished_file_is_a_storage_problem() {
        let store = InMemoryStore::new();
        let outcome = read_landed(&store, SHAZAM_NEW).await;
        assert!(matches!(outcome, Err(ChartError::StorageUnavailable { .. })));
    }

    #[tokio::test]
    async fn the_one_where_an_unreachable_store_fails_every_source_separately() {
        let store = InMemoryStore::unavailable();
        let all = vec![SHAZAM_NEW.to_string(), SPOTIFY_NEW.to_string()];
        let outcome = consolidate(&store, &all, &Watermark::default(), NormalizeOptions::default()).await;
        assert!(outcome.batches.is_empty());
        assert_eq!(outcome.failures.len(), 2);
    }
}
