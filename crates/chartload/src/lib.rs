//! 🎵 chartload: weekly music charts in, warehouse tables out.
//!
//! Three collectors land dated chart snapshots in a bucket. A data load picks
//! up every landed file the watermark hasn't seen, normalizes each source into
//! one flat table, appends it to that source's warehouse table, and (when told
//! to) advances the watermark.
//!
//! The CLI crate is a thin shell around [`run`].

pub mod app_config;
pub(crate) mod backends;
pub mod classifier;
pub(crate) mod collectors;
pub(crate) mod common;
pub(crate) mod consolidation;
pub mod error;
pub mod normalizers;
pub(crate) mod progress;
pub mod report;
pub(crate) mod supervisors;
pub(crate) mod warehouse;
pub mod watermark;

use anyhow::Result;
use tracing::info;

use crate::app_config::{AppConfig, Mode};
use crate::report::RunReport;
use crate::supervisors::Supervisor;

pub use backends::{FileStoreConfig, S3StoreConfig};
pub use collectors::{CollectorsConfig, LastFmCollectorConfig, ShazamCollectorConfig, SpotifyCollectorConfig};
pub use common::Table;
pub use warehouse::PostgresWarehouseConfig;

/// 🚀 One run, start to finish, as configured.
///
/// The mode is resolved first. A mode we don't recognize is an
/// `UnrecognizedMode` error before any backend is built or any byte moves.
pub async fn run(app_config: AppConfig) -> Result<RunReport> {
    let mode = Mode::parse(&app_config.runtime.mode)?;
    info!("🚀 chartload starting in '{}' mode", mode);
    let supervisor = Supervisor::from_config(app_config).await;
    let report = supervisor.run(mode).await?;
    info!("🏁 chartload '{}' finished", mode);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChartError;

    #[tokio::test]
    async fn the_one_where_a_typo_stops_the_show_before_it_starts() {
        let mut app_config = AppConfig::default();
        app_config.runtime.mode = "aggregate_everything".into();
        let outcome = run(app_config).await;
        let error = match outcome {
            Ok(report) => panic!("💀 a bad mode should not run, got {report:?}"),
            Err(error) => error,
        };
        assert!(matches!(
            error.downcast_ref::<ChartError>(),
            Some(ChartError::UnrecognizedMode(mode)) if mode == "aggregate_everything"
        ));
    }

    #[tokio::test]
    async fn the_one_where_an_empty_bucket_is_a_quiet_monday() -> anyhow::Result<()> {
        let mut app_config = AppConfig::default();
        app_config.runtime.mode = "data_load".into();
        let report = run(app_config).await?;
        assert!(!report.has_failures());
        assert_eq!(report.outcomes.len(), 3);
        Ok(())
    }
}
