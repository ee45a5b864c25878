//! 🔄 Normalizers: three dialects in, one flat table out.
//!
//! 🎬 COLD OPEN: INT. UNITED NATIONS, SIMULTANEOUS TRANSLATION BOOTH, 2:47 AM
//!
//! Shazam speaks CSV. Spotify speaks CSV with forty extra columns. Last.fm
//! speaks nested JSON with keys like `@attr` and `#text`, because someone
//! once thought that was a good idea. The warehouse speaks only flat tables.
//! This module is the booth.
//!
//! ## Architecture 📐
//!
//! ```text
//!   landed file bytes ──▶ parse_file ──▶ Parsed ─┐
//!   landed file bytes ──▶ parse_file ──▶ Parsed ─┼─▶ concat ──▶ normalize ──▶ Table
//!   landed file bytes ──▶ parse_file ──▶ Parsed ─┘
//! ```
//!
//! Every source is a zero-sized marker type implementing [`Normalizer`].
//! No vtables. The engine picks the marker with one `match` on [`SourceTag`]
//! in [`normalize_source`], and the compiler does the rest.

use tracing::debug;

use crate::classifier::SourceTag;
use crate::common::Table;
use crate::error::ChartError;

pub(crate) mod csv_table;
pub(crate) mod lastfm;
pub(crate) mod shazam;
pub(crate) mod spotify;

pub(crate) use lastfm::LastFmJson;
pub(crate) use shazam::ShazamCsv;
pub(crate) use spotify::SpotifyCsv;

/// 🎛️ Knobs that change how strict normalization is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    /// 🩹 Drop a record that is missing an expected nested field instead of
    /// failing the whole source. Never fabricates a default for it.
    pub skip_malformed_records: bool,
}

/// 📥 One source's file format and its path to a flat [`Table`].
///
/// # Contract 📜
/// - `parse_file` understands one landed file. `origin` is the storage key, for error messages.
/// - `concat` glues per-file results in listing order. All rows, each exactly once.
/// - `normalize` turns the glued result into the warehouse shape. Pure: same input, same table.
pub(crate) trait Normalizer {
    const SOURCE: SourceTag;
    type Parsed: Default;

    fn parse_file(origin: &str, content: &str) -> Result<Self::Parsed, ChartError>;
    fn concat(acc: Self::Parsed, next: Self::Parsed) -> Self::Parsed;
    fn normalize(parsed: Self::Parsed, options: NormalizeOptions) -> Result<Table, ChartError>;
}

/// 🧵 Parse every file, glue, normalize. The generic half of the engine.
pub(crate) fn normalize_files<N: Normalizer>(
    files: &[(String, String)],
    options: NormalizeOptions,
) -> Result<Table, ChartError> {
    let mut parsed = N::Parsed::default();
    for (origin, content) in files {
        debug!("🔄 parsing {} as {}", origin, N::SOURCE);
        parsed = N::concat(parsed, N::parse_file(origin, content)?);
    }
    N::normalize(parsed, options)
}

/// 🎯 Runtime dispatch from a tag to its marker type.
///
/// `files` are `(storage key, content)` pairs in listing order.
pub fn normalize_source(
    source: SourceTag,
    files: &[(String, String)],
    options: NormalizeOptions,
) -> Result<Table, ChartError> {
    match source {
        SourceTag::Shazam => normalize_files::<ShazamCsv>(files, options),
        SourceTag::LastFm => normalize_files::<LastFmJson>(files, options),
        SourceTag::Spotify => normalize_files::<SpotifyCsv>(files, options),
    }
}
