//! Kubernetes API server backed inventory and stats source
//!
//! Summaries are read through the API server's node proxy, so the exporter
//! only needs RBAC access to `nodes` and `nodes/proxy`, not direct kubelet
//! connectivity.

use super::{async_trait, ClusterInventory, StatsSource};
use crate::error::{BoxError, FetchError, InventoryError};
use crate::models::Summary;
use http::Request;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, ResourceExt};
use std::path::Path;
use tracing::{debug, info};

/// Cluster access through a shared `kube::Client`
///
/// `kube::Client` is a cheap handle over a pooled connection, so one instance
/// serves all concurrent scrapes.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from an explicit kubeconfig path, or infer one from
    /// `KUBECONFIG`, `$HOME/.kube/config` or the in-cluster service account
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, BoxError> {
        let config = match kubeconfig {
            Some(path) => {
                info!(path = %path.display(), "Loading kubeconfig");
                let kubeconfig = Kubeconfig::read_from(path)?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
            }
            None => Config::infer().await?,
        };
        info!(cluster_url = %config.cluster_url, "Kubernetes client configured");

        let client = Client::try_from(config)?;
        Ok(Self::new(client))
    }

    fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }
}

/// Path of the summary endpoint behind the API server node proxy
fn summary_path(node: &str) -> String {
    format!("/api/v1/nodes/{}/proxy/stats/summary", node)
}

fn summary_request(node: &str) -> Result<Request<Vec<u8>>, http::Error> {
    Request::get(summary_path(node)).body(Vec::new())
}

#[async_trait]
impl ClusterInventory for KubeCluster {
    async fn list_nodes(&self) -> Result<Vec<String>, InventoryError> {
        let nodes = self
            .nodes()
            .list(&ListParams::default())
            .await
            .map_err(|e| InventoryError::Unavailable(Box::new(e)))?;

        Ok(nodes.items.iter().map(|node| node.name_any()).collect())
    }

    async fn get_node(&self, name: &str) -> Result<String, InventoryError> {
        match self.nodes().get_opt(name).await {
            Ok(Some(node)) => Ok(node.name_any()),
            Ok(None) => Err(InventoryError::NotFound(name.to_string())),
            Err(e) => Err(InventoryError::Unavailable(Box::new(e))),
        }
    }
}

#[async_trait]
impl StatsSource for KubeCluster {
    async fn fetch_summary(&self, node: &str) -> Result<Summary, FetchError> {
        let request = summary_request(node).map_err(|e| FetchError::Request(Box::new(e)))?;

        let body = self
            .client
            .request_text(request)
            .await
            .map_err(|e| FetchError::Request(Box::new(e)))?;
        debug!(node = %node, bytes = body.len(), "Fetched stats summary");

        Ok(serde_json::from_str(&body)?)
    }
}
