//! 🎤 Shazam: flat CSV, fixed header, zero drama.
//!
//! The collector already trimmed the two-line preamble the chart export opens
//! with, so what lands is `Rank,Artist,Title` and two hundred rows of whatever
//! America couldn't stop asking its phone about this week.

use crate::classifier::SourceTag;
use crate::common::Table;
use crate::error::ChartError;
use crate::normalizers::csv_table::parse_csv;
use crate::normalizers::{NormalizeOptions, Normalizer};

/// 🎤 Marker type for the Shazam top-200 CSV.
pub(crate) struct ShazamCsv;

impl Normalizer for ShazamCsv {
    const SOURCE: SourceTag = SourceTag::Shazam;
    type Parsed = Table;

    fn parse_file(origin: &str, content: &str) -> Result<Table, ChartError> {
        parse_csv(origin, content)
    }

    fn concat(acc: Table, next: Table) -> Table {
        acc.concat(next)
    }

    /// ✅ Already flat. The identity function, wearing a tie.
    fn normalize(parsed: Table, _options: NormalizeOptions) -> Result<Table, ChartError> {
        Ok(parsed)
    }
}
