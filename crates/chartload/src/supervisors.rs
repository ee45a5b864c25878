//! 🎬 *[camera pans across a dimly lit data warehouse]*
//! 🎬 "In a world where charts drop every Monday..."
//! 🎬 "One supervisor dared to load them all. Exactly once."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor: part middle manager, part accountant. It owns the
//! backends, decides what kind of run this is, and keeps the books on which
//! files made it into the warehouse.
//!
//! ```text
//!   data_load:
//!     watermark.load ──▶ store.list_keys ──▶ consolidate ──▶ warehouse.append (per source)
//!          │ fatal            │ fatal            │ per-source failures      │ per-source failures
//!          ▼                  ▼                  ▼                          ▼
//!                                        RunReport ◀── watermark.save(previous ∪ completed)
//!                                                            (only if commit_watermark)
//!   shazam | lastfm | spotify:
//!     collect ──▶ land one file ──▶ RunReport
//! ```
//!
//! 🧠 Knowledge graph:
//! - Watermark and listing failures abort the run. Nothing is loaded, nothing is committed.
//! - Consolidation and warehouse failures are per source. The report carries them.
//! - "Completed" means appended when loading is on, and consolidated when it is off.
//!   Only completed sources' keys join the watermark.
//! - Runs are sequential. Sources are loaded one after another, in tag order.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::app_config::{AppConfig, Mode, StorageConfig, WarehouseConfig};
use crate::backends::file::FileStore;
use crate::backends::in_mem::InMemoryStore;
use crate::backends::s3::S3Store;
use crate::backends::{ObjectStore, StorageBackend};
use crate::classifier::SourceTag;
use crate::collectors::collect;
use crate::consolidation::consolidate;
use crate::normalizers::NormalizeOptions;
use crate::report::{RunReport, SourceOutcome};
use crate::warehouse::in_mem::InMemoryWarehouse;
use crate::warehouse::postgres::PostgresWarehouse;
use crate::warehouse::{Warehouse, WarehouseBackend};
use crate::watermark::WatermarkStore;

/// 📦 Holds the backends and the config for exactly one run.
#[derive(Debug)]
pub(crate) struct Supervisor {
    app_config: AppConfig,
    store: StorageBackend,
    warehouse: WarehouseBackend,
}

impl Supervisor {
    pub(crate) fn new(app_config: AppConfig, store: StorageBackend, warehouse: WarehouseBackend) -> Self {
        Self {
            app_config,
            store,
            warehouse,
        }
    }

    /// 🏗️ Build the configured backends. No network traffic yet.
    pub(crate) async fn from_config(app_config: AppConfig) -> Self {
        let store = match &app_config.storage {
            StorageConfig::InMemory => {
                warn!("🪣 in-memory storage selected: nothing landed or committed will outlive this process");
                StorageBackend::InMemory(InMemoryStore::new())
            }
            StorageConfig::File(config) => StorageBackend::File(FileStore::new(config.clone())),
            StorageConfig::S3(config) => StorageBackend::S3(S3Store::new(config.clone()).await),
        };
        let warehouse = match &app_config.warehouse {
            WarehouseConfig::InMemory => WarehouseBackend::InMemory(InMemoryWarehouse::new()),
            WarehouseConfig::Postgres(config) => {
                WarehouseBackend::Postgres(PostgresWarehouse::new(config.clone()))
            }
        };
        Self::new(app_config, store, warehouse)
    }

    /// 🚀 Do whatever this run was configured to do.
    pub(crate) async fn run(&self, mode: Mode) -> Result<RunReport> {
        match mode {
            Mode::Collect(source) => {
                self.run_collector(source, chrono::Utc::now().date_naive())
                    .await
            }
            Mode::DataLoad => self.run_data_load().await,
        }
    }

    /// 🛰️ Fetch one chart and land it under `date`.
    pub(crate) async fn run_collector(&self, source: SourceTag, date: NaiveDate) -> Result<RunReport> {
        let landed = collect(source, &self.app_config.collectors, &self.store, date)
            .await
            .with_context(|| format!("💀 The {source} collector came home empty-handed."))?;
        let mut report = RunReport::new(Mode::Collect(source));
        report.outcomes.insert(
            source,
            SourceOutcome::Landed {
                key: landed.key,
                bytes: landed.bytes,
            },
        );
        Ok(report)
    }

    /// 🧩 Consolidate every new landed file, load it, and maybe advance the watermark.
    pub(crate) async fn run_data_load(&self) -> Result<RunReport> {
        let runtime = &self.app_config.runtime;
        let marks = WatermarkStore::new(runtime.watermark_key.as_str());

        if runtime.commit_watermark && !runtime.load_warehouse {
            warn!(
                "🔖 commit_watermark is on while load_warehouse is off: files consolidated now \
                 join the watermark without ever reaching the warehouse"
            );
        }

        let previous = marks.load(&self.store).await.with_context(|| {
            format!(
                "💀 Could not read the watermark at '{}'. Refusing to consolidate blind, \
                 because that is how files get loaded twice.",
                marks.key()
            )
        })?;
        let all_keys = self
            .store
            .list_keys()
            .await
            .context("💀 Could not list the landed files. No listing, no run.")?;

        let options = NormalizeOptions {
            skip_malformed_records: runtime.skip_malformed_records,
        };
        let consolidation = consolidate(&self.store, &all_keys, &previous, options).await;

        let mut report = RunReport::new(Mode::DataLoad);
        for source in SourceTag::ALL {
            report.outcomes.insert(source, SourceOutcome::NothingNew);
        }
        for (source, failure) in consolidation.failures {
            report.outcomes.insert(
                source,
                SourceOutcome::Failed {
                    files: failure.keys.len(),
                    reason: failure.error.to_string(),
                },
            );
        }

        let mut completed_keys = Vec::new();
        for (source, batch) in consolidation.batches {
            let files = batch.keys.len();
            if !runtime.load_warehouse {
                info!("🧩 {} consolidated, warehouse loading is off", source);
                report.outcomes.insert(
                    source,
                    SourceOutcome::Consolidated {
                        files,
                        rows: batch.table.row_count(),
                    },
                );
                completed_keys.extend(batch.keys);
                continue;
            }
            match self.warehouse.append(source, &batch.table).await {
                Ok(rows) => {
                    report.outcomes.insert(source, SourceOutcome::Loaded { files, rows });
                    completed_keys.extend(batch.keys);
                }
                Err(error) => {
                    warn!("⚠️ loading {} into '{}' failed: {}", source, source.table_name(), error);
                    report.outcomes.insert(
                        source,
                        SourceOutcome::Failed {
                            files,
                            reason: error.to_string(),
                        },
                    );
                }
            }
        }

        if !runtime.commit_watermark {
            info!(
                "🔖 commit_watermark is off: {} completed files will be reconsidered next run",
                completed_keys.len()
            );
        } else if completed_keys.is_empty() {
            info!("🔖 nothing completed, the watermark stays as it was");
        } else {
            let grown = marks
                .save(&self.store, &previous, completed_keys)
                .await
                .context("💀 Loaded the data but could not advance the watermark. The next run will load these files again.")?;
            report.watermark_committed = Some(grown.len());
        }

        Ok(report)
    }
}
