//! Exporter library for kubelet summary metrics
//!
//! This crate provides the core functionality for:
//! - Decoding kubelet `/stats/summary` documents
//! - Resolving scrape targets against the cluster and fetching summaries
//! - Flattening summaries into per-request Prometheus registries
//! - Serving scrapes over HTTP, with observability of the exporter itself

pub mod api;
pub mod error;
pub mod flatten;
pub mod models;
pub mod observability;
pub mod scrape;
pub mod selector;
pub mod source;

pub use error::{BoxError, FetchError, InventoryError, ScrapeError};
pub use flatten::{flatten, FlattenStats, ScrapeRegistry};
pub use models::*;
pub use observability::{ExporterMetrics, StructuredLogger};
pub use scrape::{ScrapeOutput, Scraper};
pub use selector::{NodeSelector, ScrapeTarget};
