//! Serialization of the final resolved cluster configuration.

use crate::cluster::{ClusterSpec, DatacenterConfig, MachineConfig};
use crate::filewriter::FileWriter;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct ClusterConfigDocument<'a> {
    cluster: ClusterSpec,
    datacenter: DatacenterConfig,
    machines: &'a [MachineConfig],
}

pub fn cluster_config_file_name(cluster_name: &str) -> String {
    format!("{cluster_name}-eks-a-cluster.json")
}

/// Persist cluster, datacenter and machine configs as one document.
///
/// Reconcile-pause annotations only matter while the run is creating resources and are left
/// out of the persisted copy.
pub fn write_cluster_config(
    spec: &ClusterSpec,
    datacenter: &DatacenterConfig,
    machines: &[MachineConfig],
    writer: &dyn FileWriter,
) -> Result<PathBuf> {
    let mut cluster = spec.clone();
    cluster.resume_reconcile();
    let mut datacenter = datacenter.clone();
    datacenter.resume_reconcile();

    let doc = ClusterConfigDocument {
        cluster,
        datacenter,
        machines,
    };
    let payload =
        serde_json::to_vec_pretty(&doc).context("Failed to serialize cluster config")?;
    writer
        .write(&cluster_config_file_name(&spec.name), &payload)
        .with_context(|| format!("Failed to write cluster config for {}", spec.name))
}
