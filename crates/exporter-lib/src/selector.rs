//! Node selection and summary fetching
//!
//! Resolves a scrape target into the nodes to query and fetches each node's
//! summary. The policy is all-or-nothing: a partial scrape silently
//! under-reports, so one failed node fails the whole selection.

use crate::error::ScrapeError;
use crate::models::PerNodeResult;
use crate::observability::ExporterMetrics;
use crate::source::{ClusterInventory, StatsSource};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Default number of summaries fetched concurrently per scrape
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// Which nodes a scrape covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeTarget {
    AllNodes,
    Node(String),
}

impl ScrapeTarget {
    /// Label value used in operational metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeTarget::AllNodes => "nodes",
            ScrapeTarget::Node(_) => "node",
        }
    }
}

impl fmt::Display for ScrapeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeTarget::AllNodes => write!(f, "all nodes"),
            ScrapeTarget::Node(name) => write!(f, "node {}", name),
        }
    }
}

/// Resolves targets against the inventory and fetches their summaries
#[derive(Clone)]
pub struct NodeSelector {
    inventory: Arc<dyn ClusterInventory>,
    stats: Arc<dyn StatsSource>,
    max_concurrent_fetches: usize,
    metrics: ExporterMetrics,
}

impl NodeSelector {
    pub fn new(inventory: Arc<dyn ClusterInventory>, stats: Arc<dyn StatsSource>) -> Self {
        Self {
            inventory,
            stats,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            metrics: ExporterMetrics::new(),
        }
    }

    /// Bound the number of in-flight summary fetches; 1 fetches sequentially
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit.max(1);
        self
    }

    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_concurrent_fetches
    }

    /// Resolve the nodes of `target`
    pub async fn resolve(&self, target: &ScrapeTarget) -> Result<Vec<String>, ScrapeError> {
        match target {
            ScrapeTarget::AllNodes => self
                .inventory
                .list_nodes()
                .await
                .map_err(|e| ScrapeError::InventoryUnavailable(Box::new(e))),
            ScrapeTarget::Node(name) => {
                let node = self
                    .inventory
                    .get_node(name)
                    .await
                    .map_err(ScrapeError::from_lookup)?;
                Ok(vec![node])
            }
        }
    }

    /// Resolve `target` and fetch the summary of every selected node
    pub async fn select(&self, target: &ScrapeTarget) -> Result<Vec<PerNodeResult>, ScrapeError> {
        let nodes = self.resolve(target).await?;
        debug!(target = %target, nodes = nodes.len(), "Resolved scrape target");
        self.collect_node_stats(nodes).await
    }

    /// Fetch summaries for `nodes`, preserving their order.
    ///
    /// The first failure aborts every fetch still in flight. Dropping the
    /// returned future has the same effect, so a deadline or client
    /// disconnect cancels all outstanding requests.
    pub async fn collect_node_stats(
        &self,
        nodes: Vec<String>,
    ) -> Result<Vec<PerNodeResult>, ScrapeError> {
        let permits = Arc::new(Semaphore::new(self.max_concurrent_fetches));
        let mut tasks = JoinSet::new();

        for (index, node) in nodes.iter().cloned().enumerate() {
            let stats = Arc::clone(&self.stats);
            let permits = Arc::clone(&permits);
            let metrics = self.metrics.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let started = Instant::now();
                let result = stats.fetch_summary(&node).await;
                metrics.observe_fetch_latency(started.elapsed().as_secs_f64());
                (index, node, result)
            });
        }

        let mut slots: Vec<Option<PerNodeResult>> = vec![None; nodes.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, node, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tasks.abort_all();
                    return Err(ScrapeError::Task(e));
                }
            };

            match result {
                Ok(summary) => slots[index] = Some(PerNodeResult::new(node, summary)),
                Err(source) => {
                    warn!(node = %node, error = %source, "Summary fetch failed, aborting scrape");
                    tasks.abort_all();
                    return Err(ScrapeError::StatsFetchFailed { node, source });
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::{NodeStats, Summary};
    use crate::source::InMemoryCluster;
    use std::time::Duration;

    fn named_summary(name: &str) -> Summary {
        Summary {
            node: NodeStats {
                node_name: name.to_string(),
                runtime: None,
            },
            pods: Vec::new(),
        }
    }

    fn selector(cluster: InMemoryCluster) -> (NodeSelector, Arc<InMemoryCluster>) {
        let cluster = Arc::new(cluster);
        let selector = NodeSelector::new(cluster.clone(), cluster.clone());
        (selector, cluster)
    }

    #[tokio::test]
    async fn test_all_nodes_in_inventory_order() {
        let (selector, _) = selector(
            InMemoryCluster::new()
                .with_node("n1", named_summary("n1"))
                .with_delay("n1", Duration::from_millis(50))
                .with_node("n2", named_summary("n2"))
                .with_node("n3", named_summary("n3")),
        );

        let results = selector.select(&ScrapeTarget::AllNodes).await.unwrap();

        let names: Vec<_> = results.iter().map(|r| r.node_name.as_str()).collect();
        assert_eq!(names, vec!["n1", "n2", "n3"]);
        assert_eq!(results[0].summary.node.node_name, "n1");
    }

    #[tokio::test]
    async fn test_empty_cluster_selects_nothing() {
        let (selector, _) = selector(InMemoryCluster::new());
        let results = selector.select(&ScrapeTarget::AllNodes).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_fails_selection() {
        let (selector, cluster) = selector(
            InMemoryCluster::new()
                .with_node("n1", named_summary("n1"))
                .with_list_error("apiserver unreachable"),
        );

        let err = selector.select(&ScrapeTarget::AllNodes).await.unwrap_err();

        assert!(matches!(err, ScrapeError::InventoryUnavailable(_)));
        assert!(err.to_string().contains("apiserver unreachable"));
        assert_eq!(cluster.fetches_started(), 0);
    }

    #[tokio::test]
    async fn test_one_failed_node_fails_everything() {
        let (selector, _) = selector(
            InMemoryCluster::new()
                .with_node("n1", named_summary("n1"))
                .with_failing_node("n2", "connection reset")
                .with_node("n3", named_summary("n3")),
        );

        let err = selector.select(&ScrapeTarget::AllNodes).await.unwrap_err();

        match err {
            ScrapeError::StatsFetchFailed { node, source } => {
                assert_eq!(node, "n2");
                assert!(matches!(source, FetchError::Request(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_summary_is_a_fetch_failure() {
        let (selector, _) = selector(
            InMemoryCluster::new().with_malformed_node("n1", r#"{"pods": "nope"}"#),
        );

        let err = selector
            .select(&ScrapeTarget::Node("n1".into()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScrapeError::StatsFetchFailed {
                source: FetchError::Decode(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_first_failure_cancels_in_flight_fetches() {
        let (selector, cluster) = selector(
            InMemoryCluster::new()
                .with_node("slow", named_summary("slow"))
                .with_delay("slow", Duration::from_secs(30))
                .with_failing_node("broken", "boom"),
        );

        let started = Instant::now();
        let err = selector.select(&ScrapeTarget::AllNodes).await.unwrap_err();

        assert!(matches!(err, ScrapeError::StatsFetchFailed { ref node, .. } if node == "broken"));
        assert!(started.elapsed() < Duration::from_secs(5));
        // Give the runtime a moment to tear the aborted task down
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cluster.fetches_completed(), 1);
    }

    #[tokio::test]
    async fn test_sequential_fetching_with_limit_one() {
        let (selector, cluster) = selector(
            InMemoryCluster::new()
                .with_node("n1", named_summary("n1"))
                .with_node("n2", named_summary("n2")),
        );
        let selector = selector.with_max_concurrent_fetches(0);
        assert_eq!(selector.max_concurrent_fetches(), 1);

        let results = selector.select(&ScrapeTarget::AllNodes).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(cluster.fetches_completed(), 2);
    }

    #[tokio::test]
    async fn test_single_node_lookup() {
        let (selector, cluster) = selector(
            InMemoryCluster::new()
                .with_node("n1", named_summary("n1"))
                .with_node("n2", named_summary("n2")),
        );

        let results = selector
            .select(&ScrapeTarget::Node("n2".into()))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node_name, "n2");
        assert_eq!(cluster.fetches_started(), 1);
    }

    #[tokio::test]
    async fn test_missing_node_is_not_found() {
        let (selector, cluster) = selector(InMemoryCluster::new().with_node("n1", named_summary("n1")));

        let err = selector
            .select(&ScrapeTarget::Node("missing-node".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::NodeNotFound(ref n) if n == "missing-node"));
        assert_eq!(cluster.fetches_started(), 0);
    }

    #[test]
    fn test_target_kind_and_display() {
        assert_eq!(ScrapeTarget::AllNodes.kind(), "nodes");
        assert_eq!(ScrapeTarget::Node("n1".into()).kind(), "node");
        assert_eq!(ScrapeTarget::Node("n1".into()).to_string(), "node n1");
    }
}
