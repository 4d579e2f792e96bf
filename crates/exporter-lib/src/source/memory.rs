//! In-memory cluster for tests and offline runs
//!
//! Serves canned summaries per node and can be told to fail, return a
//! malformed payload, or stall, so selector and orchestrator behaviour can be
//! exercised without an API server.

use super::{async_trait, ClusterInventory, StatsSource};
use crate::error::{FetchError, InventoryError};
use crate::models::Summary;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
enum NodeBehavior {
    Summary(Summary),
    Fail(String),
    Malformed(String),
}

/// Canned cluster implementing both the inventory and the stats source
#[derive(Debug, Default)]
pub struct InMemoryCluster {
    nodes: Vec<String>,
    behaviors: HashMap<String, NodeBehavior>,
    delays: HashMap<String, Duration>,
    list_error: Option<String>,
    fetches_started: AtomicUsize,
    fetches_completed: AtomicUsize,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_node(mut self, name: &str, behavior: NodeBehavior) -> Self {
        if !self.nodes.iter().any(|n| n == name) {
            self.nodes.push(name.to_string());
        }
        self.behaviors.insert(name.to_string(), behavior);
        self
    }

    /// Add a node that serves `summary`
    pub fn with_node(self, name: &str, summary: Summary) -> Self {
        self.add_node(name, NodeBehavior::Summary(summary))
    }

    /// Add a node whose summary request fails with `message`
    pub fn with_failing_node(self, name: &str, message: &str) -> Self {
        self.add_node(name, NodeBehavior::Fail(message.to_string()))
    }

    /// Add a node that answers with a raw, possibly unparseable, body
    pub fn with_malformed_node(self, name: &str, body: &str) -> Self {
        self.add_node(name, NodeBehavior::Malformed(body.to_string()))
    }

    /// Delay every summary fetch for `name`
    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    /// Make node listing and lookup fail
    pub fn with_list_error(mut self, message: &str) -> Self {
        self.list_error = Some(message.to_string());
        self
    }

    /// Number of summary fetches that were started
    pub fn fetches_started(&self) -> usize {
        self.fetches_started.load(Ordering::SeqCst)
    }

    /// Number of summary fetches that ran to completion
    pub fn fetches_completed(&self) -> usize {
        self.fetches_completed.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), InventoryError> {
        match &self.list_error {
            Some(message) => Err(InventoryError::Unavailable(message.clone().into())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClusterInventory for InMemoryCluster {
    async fn list_nodes(&self) -> Result<Vec<String>, InventoryError> {
        self.check_available()?;
        Ok(self.nodes.clone())
    }

    async fn get_node(&self, name: &str) -> Result<String, InventoryError> {
        self.check_available()?;
        self.nodes
            .iter()
            .find(|n| n.as_str() == name)
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(name.to_string()))
    }
}

#[async_trait]
impl StatsSource for InMemoryCluster {
    async fn fetch_summary(&self, node: &str) -> Result<Summary, FetchError> {
        self.fetches_started.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(node) {
            tokio::time::sleep(*delay).await;
        }

        let result = match self.behaviors.get(node) {
            Some(NodeBehavior::Summary(summary)) => Ok(summary.clone()),
            Some(NodeBehavior::Fail(message)) => Err(FetchError::Request(message.clone().into())),
            Some(NodeBehavior::Malformed(body)) => {
                serde_json::from_str(body).map_err(FetchError::Decode)
            }
            None => Err(FetchError::Request(
                format!("no summary registered for node {}", node).into(),
            )),
        };

        self.fetches_completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_nodes_listed_in_insertion_order() {
        let cluster = InMemoryCluster::new()
            .with_node("b", Summary::default())
            .with_node("a", Summary::default())
            .with_failing_node("c", "boom");

        assert_eq!(cluster.list_nodes().await.unwrap(), vec!["b", "a", "c"]);
        assert_eq!(cluster.get_node("a").await.unwrap(), "a");
        assert!(matches!(
            cluster.get_node("zzz").await,
            Err(InventoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let cluster = InMemoryCluster::new().with_malformed_node("n1", "{not json");
        let err = cluster.fetch_summary("n1").await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert_eq!(cluster.fetches_completed(), 1);
    }
}
