//! Cluster specification model.
//!
//! `ClusterSpec` is the immutable input to a create run. Manifests are pre-rendered files;
//! this crate only points at them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const PAUSED_ANNOTATION: &str = "anywhere.capstan.io/paused";
pub const SYSTEM_NAMESPACE: &str = "eksa-system";
const BOOTSTRAP_SUFFIX: &str = "-eks-a-cluster";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeGroup {
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_config: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ref {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GitOpsConfig {
    pub owner: String,
    pub repository: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_cluster_config_path")]
    pub cluster_config_path: String,
    #[serde(default)]
    pub personal: bool,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_cluster_config_path() -> String {
    "clusters".to_string()
}

/// Component versions the lifecycle controllers are installed from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionsBundle {
    pub cluster_api: String,
    pub bootstrap: String,
    pub control_plane: String,
    pub infrastructure: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etcdadm_bootstrap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etcdadm_controller: Option<String>,
}

/// Pre-rendered manifests applied during the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Manifests {
    pub workload: PathBuf,
    pub networking: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_health_checks: Option<PathBuf>,
    pub custom_components: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub name: String,
    pub kubernetes_version: String,
    pub control_plane: NodeGroup,
    pub workers: NodeGroup,
    pub datacenter_ref: Ref,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_etcd: Option<NodeGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitops: Option<GitOpsConfig>,
    pub bundle: VersionsBundle,
    pub manifests: Manifests,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ClusterSpec {
    /// Name of the temporary kind cluster used to bootstrap this cluster.
    pub fn bootstrap_cluster_name(&self) -> String {
        bootstrap_cluster_name(&self.name)
    }

    pub fn pause_reconcile(&mut self) {
        self.annotations
            .insert(PAUSED_ANNOTATION.to_string(), "true".to_string());
    }

    pub fn resume_reconcile(&mut self) {
        self.annotations.remove(PAUSED_ANNOTATION);
    }

    pub fn is_paused(&self) -> bool {
        self.annotations.get(PAUSED_ANNOTATION).map(String::as_str) == Some("true")
    }
}

pub fn bootstrap_cluster_name(cluster_name: &str) -> String {
    format!("{cluster_name}{BOOTSTRAP_SUFFIX}")
}

/// Handle to a running cluster (bootstrap or workload).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cluster {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,
}

impl Cluster {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kubeconfig: None,
        }
    }

    pub fn with_kubeconfig(mut self, kubeconfig: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(kubeconfig.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatacenterConfig {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub spec: serde_json::Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl DatacenterConfig {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, spec: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            spec,
            annotations: BTreeMap::new(),
        }
    }

    pub fn pause_reconcile(&mut self) {
        self.annotations
            .insert(PAUSED_ANNOTATION.to_string(), "true".to_string());
    }

    pub fn resume_reconcile(&mut self) {
        self.annotations.remove(PAUSED_ANNOTATION);
    }

    pub fn is_paused(&self) -> bool {
        self.annotations.get(PAUSED_ANNOTATION).map(String::as_str) == Some("true")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MachineConfig {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub spec: serde_json::Value,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn spec(name: &str) -> ClusterSpec {
        ClusterSpec {
            name: name.to_string(),
            kubernetes_version: "1.21".to_string(),
            control_plane: NodeGroup {
                count: 1,
                machine_config: None,
            },
            workers: NodeGroup {
                count: 2,
                machine_config: None,
            },
            datacenter_ref: Ref {
                kind: "DockerDatacenterConfig".to_string(),
                name: name.to_string(),
            },
            external_etcd: None,
            gitops: None,
            bundle: VersionsBundle {
                cluster_api: "v0.3.19".to_string(),
                bootstrap: "v0.3.19".to_string(),
                control_plane: "v0.3.19".to_string(),
                infrastructure: "v0.3.19".to_string(),
                etcdadm_bootstrap: None,
                etcdadm_controller: None,
            },
            manifests: Manifests {
                workload: PathBuf::from("manifests/workload.yaml"),
                networking: PathBuf::from("manifests/cilium.yaml"),
                storage_class: None,
                machine_health_checks: None,
                custom_components: PathBuf::from("manifests/eksa-components.yaml"),
            },
            annotations: BTreeMap::new(),
        }
    }
}
