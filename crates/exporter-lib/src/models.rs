//! Kubelet `/stats/summary` data model
//!
//! Only the parts of the `stats/v1alpha1` summary that the exporter turns into
//! metrics are modelled. Every numeric field is optional: the kubelet omits
//! values the container runtime does not report, and absence is kept distinct
//! from zero all the way to exposition.

use serde::{Deserialize, Deserializer, Serialize};

/// One node's complete statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(default)]
    pub node: NodeStats,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pods: Vec<PodStats>,
}

/// Node-level statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStats {
    #[serde(default)]
    pub node_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeStats>,
}

/// Container runtime statistics shared across the node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStats {
    /// Storage used by the runtime for container images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_fs: Option<FilesystemStats>,
}

/// Per-pod statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStats {
    pub pod_ref: PodReference,
    #[serde(default, deserialize_with = "null_as_default")]
    pub containers: Vec<ContainerStats>,
    #[serde(
        rename = "ephemeral-storage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ephemeral_storage: Option<FilesystemStats>,
}

/// Identifies a pod within a node's summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodReference {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
}

/// Per-container statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerStats {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<FilesystemStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rootfs: Option<FilesystemStats>,
}

/// Bytes and inodes usage of one filesystem
///
/// The six fields are independent of each other; any subset may be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inodes_free: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inodes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inodes_used: Option<u64>,
}

/// A node paired with the summary fetched for it
#[derive(Debug, Clone, PartialEq)]
pub struct PerNodeResult {
    pub node_name: String,
    pub summary: Summary,
}

impl PerNodeResult {
    pub fn new(node_name: impl Into<String>, summary: Summary) -> Self {
        Self {
            node_name: node_name.into(),
            summary,
        }
    }
}

/// Kubelet encodes empty slices as `null`
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
