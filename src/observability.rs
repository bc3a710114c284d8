// SPDX-License-Identifier: Apache-2.0

//! Logging and observability helpers.

pub mod sensitive;

pub use sensitive::{redact_url, Sensitive};

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_PREFIX: &str = "qore-catalog.log";
const DEFAULT_FILTER: &str = "qore_catalog=info";

/// Installs the global JSON subscriber writing to a daily rolling file in
/// `log_dir`, after pruning log files older than `retention_days`.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_tracing(log_dir: &Path, retention_days: u64) {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("Failed to create log directory {}: {}", log_dir.display(), e);
        return;
    }

    let removed = match cleanup_old_logs(log_dir, retention_days) {
        Ok(removed) => removed,
        Err(e) => {
            eprintln!("Failed to clean up old logs: {}", e);
            0
        }
    };

    let file_appender: RollingFileAppender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(file_appender)
        .json()
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();

    install_panic_hook();

    tracing::info!(log_dir = %log_dir.display(), removed_logs = removed, "Tracing initialized");
}

fn install_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let payload = panic_info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown cause".to_string());

        tracing::error!(target: "panic", location = %location, message = %message, "Catalog engine panicked");
        previous_hook(panic_info);
    }));
}

/// Deletes rolled log files in `log_dir` last modified more than
/// `retention_days` ago. Returns how many were removed.
pub fn cleanup_old_logs(log_dir: &Path, retention_days: u64) -> io::Result<usize> {
    let now = SystemTime::now();
    let retention = Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60));
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();

        let is_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(LOG_FILE_PREFIX))
            .unwrap_or(false);
        if !is_log {
            continue;
        }

        let age = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());

        if matches!(age, Some(age) if age > retention) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!("Failed to remove old log file {}: {}", path.display(), e),
            }
        }
    }

    Ok(removed)
}
