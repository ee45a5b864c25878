//! 🧾 What happened, per source, in one glance.
//!
//! Every run ends with a [`RunReport`]. The CLI prints it as a table and picks
//! its exit code from [`RunReport::has_failures`].

use std::collections::BTreeMap;

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL};

use crate::app_config::Mode;
use crate::classifier::SourceTag;
use crate::progress::format_bytes;

/// 🎯 How one source fared.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    /// 🛰️ A collector landed a file.
    Landed { key: String, bytes: usize },
    /// 🏛️ Consolidated and appended to the warehouse.
    Loaded { files: usize, rows: usize },
    /// 🧩 Consolidated, but warehouse loading was switched off.
    Consolidated { files: usize, rows: usize },
    /// 💀 Didn't make it. Its files stay out of the watermark.
    Failed { files: usize, reason: String },
    /// 😴 No new files this run.
    NothingNew,
}

impl SourceOutcome {
    fn label(&self) -> &'static str {
        match self {
            SourceOutcome::Landed { .. } => "landed",
            SourceOutcome::Loaded { .. } => "loaded",
            SourceOutcome::Consolidated { .. } => "consolidated",
            SourceOutcome::Failed { .. } => "FAILED",
            SourceOutcome::NothingNew => "nothing new",
        }
    }

    fn details(&self) -> String {
        match self {
            SourceOutcome::Landed { key, bytes } => format!("{key} ({})", format_bytes(*bytes as u64)),
            SourceOutcome::Loaded { files, rows } | SourceOutcome::Consolidated { files, rows } => {
                format!("{files} files, {rows} rows")
            }
            SourceOutcome::Failed { files, reason } => format!("{files} files: {reason}"),
            SourceOutcome::NothingNew => String::new(),
        }
    }
}

/// 🧾 The end-of-run receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub mode: Mode,
    pub outcomes: BTreeMap<SourceTag, SourceOutcome>,
    /// 🔖 `Some(size)` when the watermark was rewritten, with its new key count.
    pub watermark_committed: Option<usize>,
}

impl RunReport {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            outcomes: BTreeMap::new(),
            watermark_committed: None,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes
            .values()
            .any(|outcome| matches!(outcome, SourceOutcome::Failed { .. }))
    }

    pub fn outcome(&self, source: SourceTag) -> Option<&SourceOutcome> {
        self.outcomes.get(&source)
    }

    /// 🎨 A table a human can read at 3am.
    pub fn render(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        // -- 📜 reports end up in log files; wrapping there helps nobody
        table.set_content_arrangement(ContentArrangement::Disabled);
        table.set_header(vec!["source", "outcome", "details"]);
        for (source, outcome) in &self.outcomes {
            table.add_row(vec![
                Cell::new(source.as_str()),
                Cell::new(outcome.label()),
                Cell::new(outcome.details()),
            ]);
        }
        if self.mode == Mode::DataLoad {
            let watermark = match self.watermark_committed {
                Some(size) => format!("advanced to {size} keys"),
                None => "not advanced".to_string(),
            };
            table.add_row(vec![
                Cell::new("watermark"),
                Cell::new(watermark),
                Cell::new(""),
            ]);
        }
        format!("🎵 chartload {}\n{table}", self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_load_report() -> RunReport {
        let mut report = RunReport::new(Mode::DataLoad);
        report
            .outcomes
            .insert(SourceTag::Shazam, SourceOutcome::Loaded { files: 1, rows: 200 });
        report.outcomes.insert(
            SourceTag::LastFm,
            SourceOutcome::Failed {
                files: 1,
                reason: "malformed record".into(),
            },
        );
        report.outcomes.insert(SourceTag::Spotify, SourceOutcome::NothingNew);
        report
    }

    #[test]
    fn the_one_where_one_failure_spoils_the_exit_code() {
        assert!(data_load_report().has_failures());
        assert!(!RunReport::new(Mode::DataLoad).has_failures());
    }

    #[test]
    fn the_one_where_the_table_says_who_did_what() {
        let rendered = data_load_report().render();
        assert!(rendered.contains("chartload data_load"));
        assert!(rendered.contains("1 files, 200 rows"));
        assert!(rendered.contains("FAILED"));
        assert!(rendered.contains("nothing new"));
        assert!(rendered.contains("not advanced"));
    }

    #[test]
    fn the_one_where_a_collector_run_skips_the_watermark_line() {
        let mut report = RunReport::new(Mode::Collect(SourceTag::Shazam));
        report.outcomes.insert(
            SourceTag::Shazam,
            SourceOutcome::Landed {
                key: "2024/1/8/shazam_2024-01-08.csv".into(),
                bytes: 2048,
            },
        );
        let rendered = report.render();
        assert!(rendered.contains("2024/1/8/shazam_2024-01-08.csv (2.00 KiB)"));
        assert!(!rendered.contains("watermark"));
    }
}
