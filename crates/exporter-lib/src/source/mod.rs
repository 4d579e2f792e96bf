//! Remote collaborators that feed a scrape
//!
//! The cluster inventory answers which nodes exist; the stats source returns
//! a node's kubelet summary. Both are shared by every in-flight request, so
//! implementations must be safe for concurrent use.

mod kubernetes;
pub mod memory;

pub use kubernetes::KubeCluster;
pub use memory::InMemoryCluster;

use crate::error::{FetchError, InventoryError};
use crate::models::Summary;

pub use async_trait::async_trait;

/// Lookup of the nodes known to the cluster
#[async_trait]
pub trait ClusterInventory: Send + Sync {
    /// List the names of every node in the cluster
    async fn list_nodes(&self) -> Result<Vec<String>, InventoryError>;

    /// Resolve a node by name, failing with `NotFound` when it does not exist
    async fn get_node(&self, name: &str) -> Result<String, InventoryError>;
}

/// Source of per-node kubelet summaries
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Fetch and decode the `/stats/summary` document of one node
    async fn fetch_summary(&self, node: &str) -> Result<Summary, FetchError>;
}
