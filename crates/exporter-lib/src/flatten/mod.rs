//! Summary-to-metrics flattening
//!
//! Walks node -> pod -> container summaries and sets one gauge per present
//! filesystem field. Absent fields produce no series at all; they are never
//! exported as zero.

mod families;
mod registry;


pub use families::{labels, FamilySpec, FsField, Scope, FAMILIES, METRICS_NAMESPACE};
pub use registry::{widen, ScrapeRegistry, Series, MAX_EXACT_F64_INTEGER};

use crate::models::{FilesystemStats, PerNodeResult};

/// Counts of what one flattening pass visited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenStats {
    pub nodes: usize,
    pub pods: usize,
    pub containers: usize,
    /// Gauge values written
    pub observations: usize,
}

/// Populate `registry` from the summaries of every node in `results`
pub fn flatten(
    results: &[PerNodeResult],
    registry: &ScrapeRegistry,
) -> Result<FlattenStats, prometheus::Error> {
    let mut stats = FlattenStats::default();

    for entry in results {
        let node = entry.node_name.as_str();
        stats.nodes += 1;

        for pod in &entry.summary.pods {
            let pod_name = pod.pod_ref.name.as_str();
            let namespace = pod.pod_ref.namespace.as_str();
            stats.pods += 1;

            for container in &pod.containers {
                let labels = [node, pod_name, namespace, container.name.as_str()];
                stats.containers += 1;

                if let Some(logs) = &container.logs {
                    stats.observations += emit(registry, Scope::ContainerLogs, &labels, logs)?;
                }
                if let Some(rootfs) = &container.rootfs {
                    stats.observations +=
                        emit(registry, Scope::ContainerRootfs, &labels, rootfs)?;
                }
            }

            if let Some(ephemeral) = &pod.ephemeral_storage {
                let labels = [node, pod_name, namespace];
                stats.observations +=
                    emit(registry, Scope::PodEphemeralStorage, &labels, ephemeral)?;
            }
        }

        let image_fs = entry
            .summary
            .node
            .runtime
            .as_ref()
            .and_then(|runtime| runtime.image_fs.as_ref());
        if let Some(image_fs) = image_fs {
            stats.observations += emit(registry, Scope::NodeRuntimeImageFs, &[node], image_fs)?;
        }
    }

    Ok(stats)
}

/// Set one series per present field of `fs`, returning how many were set
fn emit(
    registry: &ScrapeRegistry,
    scope: Scope,
    labels: &[&str],
    fs: &FilesystemStats,
) -> Result<usize, prometheus::Error> {
    let mut emitted = 0;
    for field in FsField::ALL {
        if let Some(value) = field.read(fs) {
            registry.set(scope, field, labels, value)?;
            emitted += 1;
        }
    }
    Ok(emitted)
}
