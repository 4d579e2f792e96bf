//! Observability infrastructure for the exporter
//!
//! Provides:
//! - Prometheus metrics about the exporter itself (scrape latency, errors,
//!   summary fetch latency, size of the last scrape), served on `/metrics`
//! - Structured JSON logging of lifecycle and scrape events with tracing
//!
//! These live in the process-wide default registry and never mix with the
//! per-request scrape registries.

use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for scrape and fetch latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ExporterMetricsInner> = OnceLock::new();

struct ExporterMetricsInner {
    scrape_duration_seconds: HistogramVec,
    scrape_errors: IntCounterVec,
    fetch_duration_seconds: Histogram,
    last_scrape_nodes: IntGauge,
    last_scrape_series: IntGauge,
}

impl ExporterMetricsInner {
    fn new() -> Self {
        Self {
            scrape_duration_seconds: register_histogram_vec!(
                "kube_summary_exporter_scrape_duration_seconds",
                "Time spent serving a scrape, from request to rendered body",
                &["target"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register scrape_duration_seconds"),

            scrape_errors: register_int_counter_vec!(
                "kube_summary_exporter_scrape_errors_total",
                "Total number of failed scrapes by error kind",
                &["kind"]
            )
            .expect("Failed to register scrape_errors_total"),

            fetch_duration_seconds: register_histogram!(
                "kube_summary_exporter_summary_fetch_duration_seconds",
                "Time spent fetching one node's /stats/summary",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register summary_fetch_duration_seconds"),

            last_scrape_nodes: register_int_gauge!(
                "kube_summary_exporter_last_scrape_nodes",
                "Number of nodes covered by the last successful scrape"
            )
            .expect("Failed to register last_scrape_nodes"),

            last_scrape_series: register_int_gauge!(
                "kube_summary_exporter_last_scrape_series",
                "Number of series rendered by the last successful scrape"
            )
            .expect("Failed to register last_scrape_series"),
        }
    }
}

/// Exporter metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ExporterMetrics {
    _private: (),
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ExporterMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ExporterMetricsInner {
        GLOBAL_METRICS.get_or_init(ExporterMetricsInner::new)
    }

    /// Record the duration of a scrape of `target` ("nodes" or "node")
    pub fn observe_scrape_latency(&self, target: &str, duration_secs: f64) {
        self.inner()
            .scrape_duration_seconds
            .with_label_values(&[target])
            .observe(duration_secs);
    }

    /// Record the duration of one summary fetch
    pub fn observe_fetch_latency(&self, duration_secs: f64) {
        self.inner().fetch_duration_seconds.observe(duration_secs);
    }

    /// Count a failed scrape
    pub fn inc_scrape_errors(&self, kind: &str) {
        self.inner().scrape_errors.with_label_values(&[kind]).inc();
    }

    /// Update the size of the last successful scrape
    pub fn set_last_scrape(&self, nodes: usize, series: usize) {
        self.inner().last_scrape_nodes.set(nodes as i64);
        self.inner().last_scrape_series.set(series as i64);
    }

    /// Render the default registry, process metrics included
    pub fn render(&self) -> Result<Vec<u8>, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Structured logger for exporter events
#[derive(Clone)]
pub struct StructuredLogger {
    listen_address: String,
}

impl StructuredLogger {
    pub fn new(listen_address: impl Into<String>) -> Self {
        Self {
            listen_address: listen_address.into(),
        }
    }

    /// Log exporter startup
    pub fn log_startup(&self, version: &str, max_concurrent_fetches: usize) {
        info!(
            event = "exporter_started",
            listen_address = %self.listen_address,
            version = %version,
            max_concurrent_fetches = max_concurrent_fetches,
            "Kube summary exporter started"
        );
    }

    /// Log exporter shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "exporter_shutdown",
            listen_address = %self.listen_address,
            reason = %reason,
            "Kube summary exporter shutting down"
        );
    }

    /// Log a served scrape
    pub fn log_scrape_completed(&self, target: &str, nodes: usize, series: usize, duration_secs: f64) {
        info!(
            event = "scrape_completed",
            target = %target,
            nodes = nodes,
            series = series,
            duration_secs = duration_secs,
            "Scrape completed"
        );
    }

    /// Log a failed scrape
    pub fn log_scrape_failed(&self, target: &str, kind: &str, error: &str) {
        warn!(
            event = "scrape_failed",
            target = %target,
            kind = %kind,
            error = %error,
            "Scrape failed"
        );
    }
}
