// SPDX-License-Identifier: Apache-2.0

//! Lightweight in-memory counters for catalog extraction and storage.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::Serialize;

#[derive(Default)]
struct CatalogMetrics {
    tables_extracted: AtomicU64,
    tables_skipped: AtomicU64,
    retries: AtomicU64,
    tables_saved: AtomicU64,
    save_failures: AtomicU64,
}

static CATALOG_METRICS: OnceLock<CatalogMetrics> = OnceLock::new();

fn metrics() -> &'static CatalogMetrics {
    CATALOG_METRICS.get_or_init(CatalogMetrics::default)
}

pub fn record_table_extracted() {
    metrics().tables_extracted.fetch_add(1, Ordering::Relaxed);
}

pub fn record_table_skipped() {
    metrics().tables_skipped.fetch_add(1, Ordering::Relaxed);
}

pub fn record_retry() {
    metrics().retries.fetch_add(1, Ordering::Relaxed);
}

pub fn record_save(success: bool) {
    let metrics = metrics();
    if success {
        metrics.tables_saved.fetch_add(1, Ordering::Relaxed);
    } else {
        metrics.save_failures.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CatalogMetricsSnapshot {
    pub tables_extracted: u64,
    pub tables_skipped: u64,
    pub retries: u64,
    pub tables_saved: u64,
    pub save_failures: u64,
}

pub fn snapshot() -> CatalogMetricsSnapshot {
    let metrics = metrics();
    CatalogMetricsSnapshot {
        tables_extracted: metrics.tables_extracted.load(Ordering::Relaxed),
        tables_skipped: metrics.tables_skipped.load(Ordering::Relaxed),
        retries: metrics.retries.load(Ordering::Relaxed),
        tables_saved: metrics.tables_saved.load(Ordering::Relaxed),
        save_failures: metrics.save_failures.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_only_grow() {
        let before = snapshot();
        record_table_extracted();
        record_table_skipped();
        record_retry();
        record_save(true);
        record_save(false);
        let after = snapshot();

        assert!(after.tables_extracted > before.tables_extracted);
        assert!(after.tables_skipped > before.tables_skipped);
        assert!(after.retries > before.retries);
        assert!(after.tables_saved > before.tables_saved);
        assert!(after.save_failures > before.save_failures);
    }
}
