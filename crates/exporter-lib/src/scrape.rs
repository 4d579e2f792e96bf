//! Per-request scrape orchestration
//!
//! A scrape moves through `received -> resolving-nodes -> fetching-summaries
//! -> flattening -> rendering -> responded`, or fails before rendering. Node
//! resolution and summary fetching run under the request deadline; once a
//! registry is populated, rendering no longer depends on upstream data.

use crate::error::ScrapeError;
use crate::flatten::{flatten, ScrapeRegistry};
use crate::observability::{ExporterMetrics, StructuredLogger};
use crate::selector::{NodeSelector, ScrapeTarget};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Header Prometheus sets to the scrape timeout of the job
pub const SCRAPE_TIMEOUT_HEADER: &str = "X-Prometheus-Scrape-Timeout-Seconds";

/// Interpret a scrape timeout header value.
///
/// Returns `None` (no deadline) for values that are not numbers, NaN or
/// infinite. Zero and negative values give an already-expired deadline.
pub fn parse_scrape_timeout(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    if !secs.is_finite() {
        return None;
    }
    if secs <= 0.0 {
        return Some(Duration::ZERO);
    }
    Duration::try_from_secs_f64(secs).ok()
}

/// Stage of one scrape request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapePhase {
    Received,
    ResolvingNodes,
    FetchingSummaries,
    Flattening,
    Rendering,
    Responded,
}

impl ScrapePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapePhase::Received => "received",
            ScrapePhase::ResolvingNodes => "resolving-nodes",
            ScrapePhase::FetchingSummaries => "fetching-summaries",
            ScrapePhase::Flattening => "flattening",
            ScrapePhase::Rendering => "rendering",
            ScrapePhase::Responded => "responded",
        }
    }
}

impl fmt::Display for ScrapePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendered result of a successful scrape
#[derive(Debug, Clone)]
pub struct ScrapeOutput {
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub nodes: usize,
    pub series: usize,
}

/// Runs scrapes end to end
#[derive(Clone)]
pub struct Scraper {
    selector: NodeSelector,
    metrics: ExporterMetrics,
    logger: StructuredLogger,
}

impl Scraper {
    pub fn new(selector: NodeSelector, logger: StructuredLogger) -> Self {
        Self {
            selector,
            metrics: ExporterMetrics::new(),
            logger,
        }
    }

    /// Scrape `target`, bounding remote work by `timeout` when given.
    ///
    /// Dropping the returned future cancels every outstanding remote call.
    pub async fn scrape(
        &self,
        target: &ScrapeTarget,
        timeout: Option<Duration>,
    ) -> Result<ScrapeOutput, ScrapeError> {
        let started = Instant::now();
        let result = self.run(target, timeout).await;
        let elapsed = started.elapsed().as_secs_f64();

        self.metrics.observe_scrape_latency(target.kind(), elapsed);
        match &result {
            Ok(output) => {
                self.metrics.set_last_scrape(output.nodes, output.series);
                self.logger
                    .log_scrape_completed(&target.to_string(), output.nodes, output.series, elapsed);
            }
            Err(e) => {
                self.metrics.inc_scrape_errors(e.kind());
                self.logger
                    .log_scrape_failed(&target.to_string(), e.kind(), &e.to_string());
            }
        }

        result
    }

    async fn run(
        &self,
        target: &ScrapeTarget,
        timeout: Option<Duration>,
    ) -> Result<ScrapeOutput, ScrapeError> {
        trace_phase(target, ScrapePhase::Received);

        let fetch = async {
            trace_phase(target, ScrapePhase::ResolvingNodes);
            let nodes = self.selector.resolve(target).await?;
            trace_phase(target, ScrapePhase::FetchingSummaries);
            self.selector.collect_node_stats(nodes).await
        };

        let results = match timeout {
            Some(limit) if limit.is_zero() => return Err(ScrapeError::DeadlineExceeded(limit)),
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| ScrapeError::DeadlineExceeded(limit))??,
            None => fetch.await?,
        };

        trace_phase(target, ScrapePhase::Flattening);
        let registry = ScrapeRegistry::new()?;
        let stats = flatten(&results, &registry)?;
        debug!(
            target = %target,
            nodes = stats.nodes,
            pods = stats.pods,
            containers = stats.containers,
            observations = stats.observations,
            "Flattened summaries"
        );

        trace_phase(target, ScrapePhase::Rendering);
        let body = registry.render()?;
        let output = ScrapeOutput {
            body,
            content_type: registry.content_type(),
            nodes: stats.nodes,
            series: registry.series_count(),
        };

        trace_phase(target, ScrapePhase::Responded);
        Ok(output)
    }
}

fn trace_phase(target: &ScrapeTarget, phase: ScrapePhase) {
    debug!(target = %target, phase = %phase, "Scrape phase");
}
