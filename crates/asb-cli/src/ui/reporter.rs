//! Console reporter
//!
//! Prints one status line per download key to stderr. Byte-level progress
//! updates are collapsed so a key is announced once when it starts.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use asb_core::Reporter;
use crossterm::style::Stylize;

/// [`Reporter`] writing styled status lines to stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    quiet: bool,
    started: Mutex<HashSet<String>>,
}

impl ConsoleReporter {
    /// Reporter that prints progress unless `quiet`. Warnings and failures
    /// are always printed.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            started: Mutex::default(),
        }
    }

    fn first_update(&self, key: &str) -> bool {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string())
    }
}

impl Reporter for ConsoleReporter {
    fn downloading(&self, key: &str, current: u64, total: Option<u64>) {
        if self.quiet || !self.first_update(key) {
            return;
        }
        let size = total.map(format_size).unwrap_or_default();
        eprintln!(
            "  {} {} {}",
            format_progress_status(current, total).cyan(),
            key,
            size.dark_grey()
        );
    }

    fn done(&self, key: &str, detail: &str, size: Option<u64>) {
        if self.quiet {
            return;
        }
        let size = size.map(format_size).unwrap_or_default();
        eprintln!(
            "  {} {} {} {}",
            format!("{:<10}", "done").green(),
            key,
            detail.dark_grey(),
            size.dark_grey()
        );
    }

    fn failed(&self, key: &str, reason: &str) {
        eprintln!(
            "  {} {} {}",
            format!("{:<10}", "failed").red(),
            key,
            reason.red()
        );
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{msg}");
        }
    }

    fn warning(&self, msg: &str) {
        eprintln!("{} {msg}", "warning:".yellow());
    }
}

/// Format progress status as a bare, padded status word.
pub fn format_progress_status(current: u64, total: Option<u64>) -> String {
    let status_word = match total.filter(|&t| t > 0) {
        _ if current == 0 => "queued",
        Some(t) if current >= t => "fetched",
        _ => "fetching",
    };

    format!("{status_word:<10}")
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}
