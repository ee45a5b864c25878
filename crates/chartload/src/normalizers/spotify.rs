//! 🟢 Spotify: flat CSV, just wider.
//!
//! The collector already did the hard part upstream (search, artist lookups,
//! audio features, one big join), so every landed row is one track with its
//! danceability, its popularity, and its artist's follower count side by side.
//! Parsing is the same as Shazam. Concatenation is the same as Shazam.

use crate::classifier::SourceTag;
use crate::common::Table;
use crate::error::ChartError;
use crate::normalizers::csv_table::parse_csv;
use crate::normalizers::{NormalizeOptions, Normalizer};

/// 🟢 Marker type for the Spotify track+features CSV.
pub(crate) struct SpotifyCsv;

impl Normalizer for SpotifyCsv {
    const SOURCE: SourceTag = SourceTag::Spotify;
    type Parsed = Table;

    fn parse_file(origin: &str, content: &str) -> Result<Table, ChartError> {
        parse_csv(origin, content)
    }

    fn concat(acc: Table, next: Table) -> Table {
        acc.concat(next)
    }

    fn normalize(parsed: Table, _options: NormalizeOptions) -> Result<Table, ChartError> {
        Ok(parsed)
    }
}
