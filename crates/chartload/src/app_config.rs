//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every developer at 3am) 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! 🧠 Knowledge graph:
//! - Env vars `CHARTLOAD_*` are the base layer, nested keys split on `__`
//!   (`CHARTLOAD_RUNTIME__MODE=data_load`, `CHARTLOAD_STORAGE__S3__BUCKET=charts`).
//! - An optional TOML file goes on top. TOML wins on conflicts.
//! - `runtime.mode` stays a string here and is resolved by [`Mode::parse`] at run
//!   time, so a typo fails fast with `UnrecognizedMode` before anything touches I/O.

use std::path::Path;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::backends::{FileStoreConfig, S3StoreConfig};
use crate::classifier::SourceTag;
use crate::collectors::CollectorsConfig;
use crate::error::ChartError;
use crate::warehouse::PostgresWarehouseConfig;

/// 📦 One struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub collectors: CollectorsConfig,
}

/// 🪣 Where landed files and the watermark live.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageConfig {
    /// RAM. Gone when the process is. Dry runs and tests.
    #[default]
    InMemory,
    File(FileStoreConfig),
    S3(S3StoreConfig),
}

/// 🏛️ Where normalized tables get appended.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseConfig {
    #[default]
    InMemory,
    /// Postgres, or Redshift pretending to be Postgres.
    Postgres(PostgresWarehouseConfig),
}

/// 🎛️ Knobs for a single run.
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// `shazam`, `lastfm`, `spotify`, or `data_load`.
    #[serde(default)]
    pub mode: String,
    #[serde(default = "default_watermark_key")]
    pub watermark_key: String,
    /// 🏛️ Append consolidated tables to the warehouse.
    ///
    /// ⚠️ Turning this off while `commit_watermark` is on still advances the
    /// watermark past every consolidated file. Those files are then never
    /// loaded by a later run. A dry run wants both off.
    #[serde(default = "default_true")]
    pub load_warehouse: bool,
    /// 🔖 Advance the watermark at the end of a data load. Off unless asked for.
    #[serde(default)]
    pub commit_watermark: bool,
    /// 🩹 Skip individual malformed records instead of failing their whole source.
    #[serde(default)]
    pub skip_malformed_records: bool,
}

fn default_watermark_key() -> String {
    "metadata/watermark.txt".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: String::new(),
            watermark_key: default_watermark_key(),
            load_warehouse: true,
            commit_watermark: false,
            skip_malformed_records: false,
        }
    }
}

/// 🎯 What a run is for: collect one source, or consolidate everything new.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Collect(SourceTag),
    DataLoad,
}

impl Mode {
    /// 🧐 The only mode names we answer to. Everything else is a config typo.
    pub fn parse(raw: &str) -> Result<Mode, ChartError> {
        match raw.trim() {
            "shazam" => Ok(Mode::Collect(SourceTag::Shazam)),
            "lastfm" => Ok(Mode::Collect(SourceTag::LastFm)),
            "spotify" => Ok(Mode::Collect(SourceTag::Spotify)),
            "data_load" => Ok(Mode::DataLoad),
            other => Err(ChartError::UnrecognizedMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Collect(source) => write!(f, "{source}"),
            Mode::DataLoad => f.write_str("data_load"),
        }
    }
}

/// 🚀 Load the config: from env vars, plus a TOML file if you hand us one.
///
/// 📐 No file means env only. We never go looking for a `config.toml` nobody asked for.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {}",
        config_file_name
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<environment only>".to_string())
    );

    let config = Figment::new().merge(Env::prefixed("CHARTLOAD_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (CHARTLOAD_*). \
             The file exists in our hearts, but the schema disagrees.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (CHARTLOAD_*). \
                 No file was provided, so this one's all on the environment."
            .to_string(),
    };
    config.extract().context(context_msg)
}
