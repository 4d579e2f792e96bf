//! Metric family schema
//!
//! The 24 exported families are the cross product of four filesystem scopes
//! and the six fields of a filesystem record. Names, help texts and label
//! schemas are fixed for the life of the process; only values are per scrape.

use crate::models::FilesystemStats;

/// Namespace prepended to every exported family name
pub const METRICS_NAMESPACE: &str = "kube_summary";

/// Label names, in label-tuple order
pub mod labels {
    pub const NODE: &str = "node";
    pub const POD: &str = "pod";
    pub const NAMESPACE: &str = "namespace";
    pub const CONTAINER: &str = "name";
}

const CONTAINER_LABELS: &[&str] = &[
    labels::NODE,
    labels::POD,
    labels::NAMESPACE,
    labels::CONTAINER,
];
const POD_LABELS: &[&str] = &[labels::NODE, labels::POD, labels::NAMESPACE];
const NODE_LABELS: &[&str] = &[labels::NODE];

/// Which filesystem of the summary tree a family describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    ContainerLogs,
    ContainerRootfs,
    PodEphemeralStorage,
    NodeRuntimeImageFs,
}

impl Scope {
    pub const ALL: [Scope; 4] = [
        Scope::ContainerLogs,
        Scope::ContainerRootfs,
        Scope::PodEphemeralStorage,
        Scope::NodeRuntimeImageFs,
    ];

    /// Family name prefix, before the field suffix
    pub fn prefix(&self) -> &'static str {
        match self {
            Scope::ContainerLogs => "container_logs",
            Scope::ContainerRootfs => "container_rootfs",
            Scope::PodEphemeralStorage => "pod_ephemeral_storage",
            Scope::NodeRuntimeImageFs => "node_runtime_imagefs",
        }
    }

    /// Label names of every series in this scope
    pub fn label_names(&self) -> &'static [&'static str] {
        match self {
            Scope::ContainerLogs | Scope::ContainerRootfs => CONTAINER_LABELS,
            Scope::PodEphemeralStorage => POD_LABELS,
            Scope::NodeRuntimeImageFs => NODE_LABELS,
        }
    }
}

/// One field of a filesystem record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsField {
    AvailableBytes,
    CapacityBytes,
    UsedBytes,
    InodesFree,
    Inodes,
    InodesUsed,
}

impl FsField {
    pub const ALL: [FsField; 6] = [
        FsField::AvailableBytes,
        FsField::CapacityBytes,
        FsField::UsedBytes,
        FsField::InodesFree,
        FsField::Inodes,
        FsField::InodesUsed,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            FsField::AvailableBytes => "available_bytes",
            FsField::CapacityBytes => "capacity_bytes",
            FsField::UsedBytes => "used_bytes",
            FsField::InodesFree => "inodes_free",
            FsField::Inodes => "inodes",
            FsField::InodesUsed => "inodes_used",
        }
    }

    /// Read this field from a record; `None` when the runtime did not report it
    pub fn read(&self, fs: &FilesystemStats) -> Option<u64> {
        match self {
            FsField::AvailableBytes => fs.available_bytes,
            FsField::CapacityBytes => fs.capacity_bytes,
            FsField::UsedBytes => fs.used_bytes,
            FsField::InodesFree => fs.inodes_free,
            FsField::Inodes => fs.inodes,
            FsField::InodesUsed => fs.inodes_used,
        }
    }
}

/// Static description of one exported gauge family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilySpec {
    pub scope: Scope,
    pub field: FsField,
    pub help: &'static str,
}

impl FamilySpec {
    /// Name without the namespace prefix, e.g. `container_logs_used_bytes`
    pub fn name(&self) -> String {
        format!("{}_{}", self.scope.prefix(), self.field.suffix())
    }

    /// Fully qualified name as rendered, e.g. `kube_summary_container_logs_used_bytes`
    pub fn full_name(&self) -> String {
        format!("{}_{}", METRICS_NAMESPACE, self.name())
    }

    pub fn label_names(&self) -> &'static [&'static str] {
        self.scope.label_names()
    }
}

const fn family(scope: Scope, field: FsField, help: &'static str) -> FamilySpec {
    FamilySpec { scope, field, help }
}

/// Every family declared into a scrape registry
pub static FAMILIES: [FamilySpec; 24] = [
    family(Scope::ContainerLogs, FsField::InodesFree, "Number of available Inodes for logs"),
    family(Scope::ContainerLogs, FsField::Inodes, "Number of Inodes for logs"),
    family(Scope::ContainerLogs, FsField::InodesUsed, "Number of used Inodes for logs"),
    family(
        Scope::ContainerLogs,
        FsField::AvailableBytes,
        "Number of bytes that aren't consumed by the container logs",
    ),
    family(
        Scope::ContainerLogs,
        FsField::CapacityBytes,
        "Number of bytes that can be consumed by the container logs",
    ),
    family(
        Scope::ContainerLogs,
        FsField::UsedBytes,
        "Number of bytes that are consumed by the container logs",
    ),
    family(Scope::ContainerRootfs, FsField::InodesFree, "Number of available Inodes"),
    family(Scope::ContainerRootfs, FsField::Inodes, "Number of Inodes"),
    family(Scope::ContainerRootfs, FsField::InodesUsed, "Number of used Inodes"),
    family(
        Scope::ContainerRootfs,
        FsField::AvailableBytes,
        "Number of bytes that aren't consumed by the container",
    ),
    family(
        Scope::ContainerRootfs,
        FsField::CapacityBytes,
        "Number of bytes that can be consumed by the container",
    ),
    family(
        Scope::ContainerRootfs,
        FsField::UsedBytes,
        "Number of bytes that are consumed by the container",
    ),
    family(
        Scope::PodEphemeralStorage,
        FsField::AvailableBytes,
        "Number of bytes of Ephemeral storage that aren't consumed by the pod",
    ),
    family(
        Scope::PodEphemeralStorage,
        FsField::CapacityBytes,
        "Number of bytes of Ephemeral storage that can be consumed by the pod",
    ),
    family(
        Scope::PodEphemeralStorage,
        FsField::UsedBytes,
        "Number of bytes of Ephemeral storage that are consumed by the pod",
    ),
    family(
        Scope::PodEphemeralStorage,
        FsField::InodesFree,
        "Number of available Inodes for pod Ephemeral storage",
    ),
    family(
        Scope::PodEphemeralStorage,
        FsField::Inodes,
        "Number of Inodes for pod Ephemeral storage",
    ),
    family(
        Scope::PodEphemeralStorage,
        FsField::InodesUsed,
        "Number of used Inodes for pod Ephemeral storage",
    ),
    family(
        Scope::NodeRuntimeImageFs,
        FsField::AvailableBytes,
        "Number of bytes of node Runtime ImageFS that aren't consumed",
    ),
    family(
        Scope::NodeRuntimeImageFs,
        FsField::CapacityBytes,
        "Number of bytes of node Runtime ImageFS that can be consumed",
    ),
    family(
        Scope::NodeRuntimeImageFs,
        FsField::UsedBytes,
        "Number of bytes of node Runtime ImageFS that are consumed",
    ),
    family(
        Scope::NodeRuntimeImageFs,
        FsField::InodesFree,
        "Number of available Inodes for node Runtime ImageFS",
    ),
    family(
        Scope::NodeRuntimeImageFs,
        FsField::Inodes,
        "Number of Inodes for node Runtime ImageFS",
    ),
    family(
        Scope::NodeRuntimeImageFs,
        FsField::InodesUsed,
        "Number of used Inodes for node Runtime ImageFS",
    ),
];
