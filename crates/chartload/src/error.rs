//! 🏷️ The named ways a chart run can go sideways.
//!
//! Every component boundary (object store, watermark, normalizers, warehouse,
//! collectors) speaks `ChartError`. The orchestration layer wraps these in
//! `anyhow` context on the way out to the CLI, so the 3am reader gets both
//! the category and the story. 🦆

use thiserror::Error;

/// 💀 Everything that can fail, sorted by who to blame.
///
/// 🧠 Knowledge graph:
/// - `StorageUnavailable`: fatal for the run. Nothing partial is committed.
/// - `MalformedRecord`: isolated to one source group, the others carry on.
/// - `WarehouseUnavailable` / `SchemaMismatch`: surfaced, never retried here.
/// - `UnrecognizedMode`: config typo, rejected before any I/O.
/// - `SourceUnavailable`: a collector could not reach its chart API.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("💀 object store unavailable while touching '{key}': {reason}")]
    StorageUnavailable { key: String, reason: String },

    #[error("💀 malformed record in {origin}: {reason}")]
    MalformedRecord { origin: String, reason: String },

    #[error("💀 warehouse unavailable for table '{table}': {reason}")]
    WarehouseUnavailable { table: String, reason: String },

    #[error("💀 schema mismatch for table '{table}': {reason}")]
    SchemaMismatch { table: String, reason: String },

    #[error("💀 unrecognized mode '{0}', expected one of: shazam, lastfm, spotify, data_load")]
    UnrecognizedMode(String),

    #[error("💀 chart source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },
}

impl ChartError {
    /// 🪣 Shorthand for the most common sadness in this crate.
    pub(crate) fn storage(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(origin: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::MalformedRecord {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn source_unavailable(
        source_name: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}
