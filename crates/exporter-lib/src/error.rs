//! Error types for scrape handling
//!
//! Every error here is terminal for the request that produced it: nothing is
//! retried inside the exporter, the scraper retries on its next interval.

use std::time::Duration;
use thiserror::Error;

/// Opaque error raised by a remote collaborator
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a cluster inventory lookup
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("node {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(#[source] BoxError),
}

/// Failure to obtain a node's summary
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("error querying /stats/summary: {0}")]
    Request(#[source] BoxError),

    #[error("error unmarshaling /stats/summary response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Error kinds surfaced for a failed scrape
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("error querying node inventory: {0}")]
    InventoryUnavailable(#[source] BoxError),

    #[error("error getting node {0}: not found")]
    NodeNotFound(String),

    #[error("error fetching stats for {node}: {source}")]
    StatsFetchFailed {
        node: String,
        #[source]
        source: FetchError,
    },

    #[error("scrape deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("error building scrape registry: {0}")]
    Registry(#[from] prometheus::Error),

    #[error("summary fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ScrapeError {
    /// Short machine-readable kind, used as a metric label
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::InventoryUnavailable(_) => "inventory_unavailable",
            ScrapeError::NodeNotFound(_) => "node_not_found",
            ScrapeError::StatsFetchFailed { .. } => "stats_fetch_failed",
            ScrapeError::DeadlineExceeded(_) => "deadline_exceeded",
            ScrapeError::Registry(_) => "registry",
            ScrapeError::Task(_) => "task",
        }
    }

    pub(crate) fn from_lookup(error: InventoryError) -> Self {
        match error {
            InventoryError::NotFound(node) => ScrapeError::NodeNotFound(node),
            InventoryError::Unavailable(source) => ScrapeError::InventoryUnavailable(source),
        }
    }
}
