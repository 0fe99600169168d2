//! Progress bar and logging utilities.
//!
//! The reporter shows an indicatif bar, or in log-only mode hides it and
//! prints periodic progress lines for tail-friendly output.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}h", secs / 3600.0)
    }
}

pub struct Progress {
    bar: ProgressBar,
    log_only: bool,
    total: u64,
    interval: u64,
}

impl Progress {
    /// Progress for `len` catalog entries.
    pub fn new(len: u64, msg: &str, log_only: bool) -> Self {
        let bar = ProgressBar::new(len);
        if log_only {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(msg.to_string());
        Self {
            bar,
            log_only,
            total: len,
            interval: (len / 20).max(1),
        }
    }

    /// Hidden reporter for tests and library callers.
    pub fn hidden() -> Self {
        Self::new(0, "", true)
    }

    pub fn set_message(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    /// Advance by one entry; in log-only mode print every `interval` entries.
    pub fn inc(&self, phase: &str) {
        self.bar.inc(1);
        if self.log_only && self.total > 0 {
            let current = self.bar.position();
            if current % self.interval == 0 || current == self.total {
                let pct = 100.0 * current as f64 / self.total as f64;
                eprintln!("[{}] {}/{} ({:.1}%)", phase, current, self.total, pct);
            }
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self, msg: &str) {
        self.bar.finish_with_message(msg.to_string());
    }
}
