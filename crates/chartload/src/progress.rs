//! 📊 progress.rs: "Are we there yet?" for a data load.
//!
//! One bar per source group while its landed files are downloaded, counting
//! files and bytes. When stderr is not a terminal (cron, Lambda, CI) indicatif
//! hides the bar on its own, so the logs stay clean.
//!
//! ⚠️ Watching this progress bar will not make it go faster. Science says no.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::classifier::SourceTag;

// -- 📏 one mebibyte. not a megabyte, pedants. there's a difference and I will die on this hill.
const MIB: u64 = 1024 * 1024;

/// 📦 Human-readable bytes. Because "1073741824 bytes" is a war crime in a UI.
pub(crate) fn format_bytes(bytes: u64) -> String {
    if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= 1024 {
        format!("{:.2} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} bytes", bytes)
    }
}

/// ⏱️ MM:SS, or HH:MM:SS if you should probably call your mom.
pub(crate) fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📊 Download progress for one source group.
pub(crate) struct SourceProgress {
    source: SourceTag,
    total_bytes: u64,
    progress_bar: ProgressBar,
    start_time: Instant,
}

impl std::fmt::Debug for SourceProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("SourceProgress")
            .field("source", &self.source)
            .field("total_bytes", &self.total_bytes)
            .finish()
    }
}

impl SourceProgress {
    /// 🚀 A bar for `file_count` files of one source.
    pub(crate) fn new(source: SourceTag, file_count: usize) -> Self {
        let progress_bar = ProgressBar::new(file_count as u64);
        // -- 🐛 a bad template falls back to the default style instead of panicking
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg:>10} [{bar:30.cyan/blue}] {pos}/{len} files")
        {
            progress_bar.set_style(style.progress_chars("=>-"));
        }
        progress_bar.set_message(source.as_str());
        Self {
            source,
            total_bytes: 0,
            progress_bar,
            start_time: Instant::now(),
        }
    }

    /// 🔄 One more file downloaded.
    pub(crate) fn advance(&mut self, bytes: usize) {
        self.total_bytes += bytes as u64;
        self.progress_bar.inc(1);
    }

    /// ✅ Done with this source. Returns a one-line summary for the logs.
    pub(crate) fn finish(self) -> String {
        self.progress_bar.finish_and_clear();
        format!(
            "{} files, {} in {}",
            self.progress_bar.position(),
            format_bytes(self.total_bytes),
            format_duration(self.start_time.elapsed())
        )
    }
}
