//! 🛰️ Collectors: go to the internet, bring back one chart, drop it in the bucket.
//!
//! 🎬 COLD OPEN: EXT. THE INTERNET, EVERY MONDAY
//!
//! Three errand runners. One scrapes a CSV, one asks a JSON API nicely, one
//! fills out forty forms at the Spotify DMV. Each comes home with exactly one
//! file and leaves it on the shelf with a dated label. None of them remember
//! anything about last week. That's the consolidation engine's problem.
//!
//! 🧠 Knowledge graph:
//! - Landing key: `<year>/<month>/<day>/<source>_<YYYY-MM-DD>.<ext>`, date parts unpadded.
//! - `compress = true` gzips the payload and tacks `.gz` on the key. The engine inflates on read.
//! - Network trouble is `SourceUnavailable`. Shelf trouble is `StorageUnavailable`.
//! - One shot, no retries. The scheduler that woke us can wake us again.

use std::io::Write;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Deserialize;
use tracing::{debug, info};

use crate::backends::ObjectStore;
use crate::classifier::SourceTag;
use crate::error::ChartError;

pub(crate) mod lastfm;
pub(crate) mod shazam;
pub(crate) mod spotify;

pub use lastfm::LastFmCollectorConfig;
pub use shazam::ShazamCollectorConfig;
pub use spotify::SpotifyCollectorConfig;

/// 🛰️ Where each collector goes and what it says when it gets there.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CollectorsConfig {
    #[serde(default)]
    pub shazam: ShazamCollectorConfig,
    #[serde(default)]
    pub lastfm: LastFmCollectorConfig,
    #[serde(default)]
    pub spotify: SpotifyCollectorConfig,
    /// 🗜️ Gzip landed payloads.
    #[serde(default)]
    pub compress: bool,
}

/// 📦 One file, landed.
#[derive(Debug, Clone, PartialEq)]
pub struct LandedFile {
    pub key: String,
    pub bytes: usize,
}

/// 🏷️ `2024/1/8/shazam_2024-01-08.csv`, or with `.gz` when compressing.
pub(crate) fn landing_key(source: SourceTag, date: NaiveDate, compress: bool) -> String {
    let key = format!(
        "{}/{}/{}/{}_{}.{}",
        date.year(),
        date.month(),
        date.day(),
        source.as_str(),
        date.format("%Y-%m-%d"),
        source.extension()
    );
    if compress { format!("{key}.gz") } else { key }
}

/// 🔧 One HTTP client per collection run. Patient, but not forever.
pub(crate) fn http_client(source: SourceTag) -> Result<reqwest::Client, ChartError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| ChartError::source_unavailable(source.as_str(), e))
}

/// 📡 Send, insist on a 2xx, hand back the body as text.
pub(crate) async fn fetch_text(
    source: SourceTag,
    request: reqwest::RequestBuilder,
) -> Result<String, ChartError> {
    let response = request
        .send()
        .await
        .map_err(|e| ChartError::source_unavailable(source.as_str(), e))?;
    let status = response.status();
    if !status.is_success() {
        // -- 🕵️ the body usually says why. usually.
        let body = response.text().await.unwrap_or_default();
        return Err(ChartError::source_unavailable(
            source.as_str(),
            format!("HTTP {status}: {}", body.trim()),
        ));
    }
    response
        .text()
        .await
        .map_err(|e| ChartError::source_unavailable(source.as_str(), e))
}

fn gzip(key: &str, payload: &[u8]) -> Result<Vec<u8>, ChartError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(payload)
        .and_then(|_| encoder.finish())
        .map_err(|e| ChartError::storage(key, format!("gzip failed: {e}")))
}

/// 📤 Put one payload on the shelf under today's label.
pub(crate) async fn land<S>(
    store: &S,
    source: SourceTag,
    date: NaiveDate,
    payload: Vec<u8>,
    compress: bool,
) -> Result<LandedFile, ChartError>
where
    S: ObjectStore + ?Sized,
{
    let key = landing_key(source, date, compress);
    let bytes = if compress { gzip(&key, &payload)? } else { payload };
    let size = bytes.len();
    store.put(&key, bytes).await?;
    info!("🛰️ landed {} ({} bytes)", key, size);
    Ok(LandedFile { key, bytes: size })
}

/// 🚀 Run one collector end to end: fetch, then land.
pub(crate) async fn collect<S>(
    source: SourceTag,
    config: &CollectorsConfig,
    store: &S,
    date: NaiveDate,
) -> Result<LandedFile, ChartError>
where
    S: ObjectStore + ?Sized,
{
    let client = http_client(source)?;
    debug!("🛰️ collecting {} for {}", source, date);
    let payload = match source {
        SourceTag::Shazam => shazam::fetch(&client, &config.shazam).await?,
        SourceTag::LastFm => lastfm::fetch(&client, &config.lastfm).await?,
        SourceTag::Spotify => spotify::fetch(&client, &config.spotify).await?,
    };
    land(store, source, date, payload, config.compress).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::in_mem::InMemoryStore;
    use crate::classifier::classify;
    use crate::consolidation::read_landed;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 8).expect("💀 2024-01-08 stopped existing")
    }

    #[test]
    fn the_one_where_the_label_has_no_leading_zeros_in_the_path() {
        assert_eq!(
            landing_key(SourceTag::Shazam, monday(), false),
            "2024/1/8/shazam_2024-01-08.csv"
        );
        assert_eq!(
            landing_key(SourceTag::LastFm, monday(), true),
            "2024/1/8/lastfm_2024-01-08.json.gz"
        );
    }

    #[test]
    fn the_one_where_every_label_we_write_is_one_we_can_read() {
        for source in SourceTag::ALL {
            for compress in [false, true] {
                let key = landing_key(source, monday(), compress);
                assert_eq!(classify(&key), Some(source), "key {key}");
            }
        }
    }

    #[tokio::test]
    async fn the_one_where_a_compressed_landing_comes_back_out_intact() -> anyhow::Result<()> {
        let store = InMemoryStore::new();
        let landed = land(
            &store,
            SourceTag::Spotify,
            monday(),
            b"track_id\nabc\n".to_vec(),
            true,
        )
        .await?;
        assert_eq!(landed.key, "2024/1/8/spotify_2024-01-08.csv.gz");
        assert_eq!(read_landed(&store, &landed.key).await?, "track_id\nabc\n");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_full_shelf_is_a_storage_problem() {
        let store = InMemoryStore::unavailable();
        let outcome = land(&store, SourceTag::Shazam, monday(), b"x".to_vec(), false).await;
        assert!(matches!(outcome, Err(ChartError::StorageUnavailable { .. })));
    }
}
