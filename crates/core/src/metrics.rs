//! Prometheus metrics for the upload and cleanup passes.
//!
//! Counters live in lazily-initialized statics. A run-to-completion process
//! has no scrape endpoint, so [`render_text`] gathers them into the text
//! exposition format for a node-exporter textfile collector.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

// =============================================================================
// Upload
// =============================================================================

/// Upload attempts by result.
pub static UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("seedvault_uploads_total", "Total upload attempts"),
        &["result"], // "success", "failed", "skipped"
    )
    .unwrap()
});

/// Wall time spent in the storage upload command.
pub static UPLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "seedvault_upload_duration_seconds",
            "Duration of remote uploads",
        )
        .buckets(vec![
            1.0, 10.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0, 21600.0, 86400.0,
        ]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Cleanup
// =============================================================================

/// Client tasks that satisfied the policy and had a confirmed upload.
pub static RECONCILE_CANDIDATES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "seedvault_reconcile_candidates_total",
        "Total cleanup candidates considered",
    )
    .unwrap()
});

pub static TASKS_ARCHIVED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("seedvault_tasks_archived_total", "Total tasks archived").unwrap()
});

/// Candidates left alone, by reason.
pub static TASKS_SKIPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("seedvault_tasks_skipped_total", "Total candidates skipped"),
        &["reason"], // "unsafe_path", "verify_failed", "remote_missing", "local_delete_failed", "ledger_failed"
    )
    .unwrap()
});

pub static LEDGER_PRUNED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "seedvault_ledger_pruned_total",
        "Total archived ledger rows pruned",
    )
    .unwrap()
});

/// Batched torrent client removals by result.
pub static CLIENT_REMOVALS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "seedvault_client_removals_total",
            "Total batched torrent removals",
        ),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(UPLOADS_TOTAL.clone()),
        Box::new(UPLOAD_DURATION.clone()),
        Box::new(RECONCILE_CANDIDATES.clone()),
        Box::new(TASKS_ARCHIVED.clone()),
        Box::new(TASKS_SKIPPED.clone()),
        Box::new(LEDGER_PRUNED.clone()),
        Box::new(CLIENT_REMOVALS.clone()),
    ]
}

/// Encode all metrics in the Prometheus text format.
pub fn render_text() -> Result<String, prometheus::Error> {
    let registry = Registry::new();
    for metric in all_metrics() {
        registry.register(metric)?;
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_touched_metrics() {
        UPLOADS_TOTAL.with_label_values(&["success"]).inc();
        TASKS_SKIPPED.with_label_values(&["remote_missing"]).inc();

        let text = render_text().unwrap();
        assert!(text.contains("seedvault_uploads_total{result=\"success\"}"));
        assert!(text.contains("seedvault_tasks_skipped_total{reason=\"remote_missing\"}"));
        assert!(text.contains("seedvault_tasks_archived_total"));
    }

    #[test]
    fn test_render_twice_uses_fresh_registry() {
        assert!(render_text().is_ok());
        assert!(render_text().is_ok());
    }
}
