//! 🚀 chartload-cli: the front door, the bouncer, the maitre d' of chartload.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary is the thin wrapper that parses args, loads config, sets up
//! logging, and then lets the library do the heavy lifting. Like a manager. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 🎵 Land weekly music charts and load them into the warehouse.
#[derive(Debug, Parser)]
#[command(name = "chartload", version, about)]
struct Args {
    /// TOML config file. Without one, configuration comes from CHARTLOAD_* env vars only.
    config: Option<PathBuf>,

    /// Override `runtime.mode`: shazam, lastfm, spotify, or data_load.
    #[arg(long)]
    mode: Option<String>,
}

/// 🕵️ Does any layer of this error smell like an unreachable service?
fn looks_like_connection_trouble(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        let cause_str = cause.to_string();
        cause_str.contains("error sending request")
            || cause_str.contains("connection refused")
            || cause_str.contains("Connection refused")
            || cause_str.contains("tcp connect error")
            || cause_str.contains("dns error")
            || cause_str.contains("dispatch failure")
    })
}

/// 🚀 main(): parse, configure, run, report.
///
/// Exit code 1 when the run aborts or when any source reports a failure.
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 Set up tracing. Default to info so a cron log actually says something.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // 🔒 Validate the config file exists before we get too emotionally attached
    if let Some(config_file) = &args.config {
        let exists = config_file.try_exists().with_context(|| {
            format!(
                "💀 Couldn't check whether the configuration file exists. Was checking here: '{}'",
                config_file.display()
            )
        })?;
        if !exists {
            anyhow::bail!(
                "💀 Configuration file '{}' does not exist. If it's a relative path, \
                 remember it's relative to where you ran this, not where the binary lives.",
                config_file.display()
            );
        }
    }

    let mut app_config = chartload::app_config::load_config(args.config.as_deref())
        .context("💀 Couldn't load the configuration. Check the file and the CHARTLOAD_* env vars.")?;
    if let Some(mode) = args.mode {
        app_config.runtime.mode = mode;
    }

    match chartload::run(app_config).await {
        Ok(report) => {
            println!("{}", report.render());
            if report.has_failures() {
                error!("💀 at least one source failed; its files were not committed");
                std::process::exit(1);
            }
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            // -- 🧅 peel the onion of sadness, one layer at a time
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
            }
            if looks_like_connection_trouble(&err) {
                error!(
                    "🔧 hint: looks like a service isn't reachable. \
                     Double-check the warehouse URL, the bucket region, and your network. \
                     Even servers need a nudge sometimes. ☕"
                );
            }
            std::process::exit(1);
        }
    }
}
