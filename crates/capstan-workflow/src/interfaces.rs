//! Capability sets the workflows call into.
//!
//! Production implementations drive kind/clusterctl/kubectl; tests use the recording fakes in
//! `crate::testing`. Every call blocks until the remote operation finishes; deadlines and
//! retries are the implementation's business.

use crate::validations::Validation;
use anyhow::Result;
use capstan_core::executables::BootstrapClusterOption;
use capstan_core::{Cluster, ClusterSpec, DatacenterConfig, MachineConfig};

/// Infrastructure-specific plugin (docker, vsphere, ...).
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    fn bootstrap_cluster_options(&self) -> Result<Vec<BootstrapClusterOption>>;
    fn bootstrap_setup(&self, spec: &ClusterSpec, bootstrap: &Cluster) -> Result<()>;
    fn setup_and_validate_create_cluster(&self, spec: &ClusterSpec) -> Result<()>;
    fn datacenter_config(&self) -> DatacenterConfig;
    fn machine_configs(&self) -> Vec<MachineConfig>;
}

pub trait Bootstrapper: Send + Sync {
    fn create_bootstrap_cluster(
        &self,
        spec: &ClusterSpec,
        options: &[BootstrapClusterOption],
    ) -> Result<Cluster>;
    fn delete_bootstrap_cluster(&self, cluster: &Cluster, force: bool) -> Result<()>;
}

pub trait ClusterManager: Send + Sync {
    fn install_capi(&self, spec: &ClusterSpec, cluster: &Cluster, provider: &dyn Provider) -> Result<()>;
    fn create_workload_cluster(
        &self,
        bootstrap: &Cluster,
        spec: &ClusterSpec,
        provider: &dyn Provider,
    ) -> Result<Cluster>;
    fn install_networking(&self, cluster: &Cluster, spec: &ClusterSpec) -> Result<()>;
    fn install_storage_class(&self, cluster: &Cluster, spec: &ClusterSpec, provider: &dyn Provider) -> Result<()>;
    fn install_machine_health_checks(
        &self,
        bootstrap: &Cluster,
        spec: &ClusterSpec,
        provider: &dyn Provider,
    ) -> Result<()>;
    fn move_capi(&self, from: &Cluster, to: &Cluster) -> Result<()>;
    fn install_custom_components(&self, spec: &ClusterSpec, cluster: &Cluster) -> Result<()>;
    fn create_eksa_resources(
        &self,
        cluster: &Cluster,
        spec: &ClusterSpec,
        datacenter: &DatacenterConfig,
        machines: &[MachineConfig],
    ) -> Result<()>;
    fn resume_eksa_controller_reconcile(
        &self,
        cluster: &Cluster,
        spec: &ClusterSpec,
        provider: &dyn Provider,
    ) -> Result<()>;
    /// Collect diagnostic logs; `bootstrap` is absent when no bootstrap cluster is running.
    fn save_logs(&self, bootstrap: Option<&Cluster>) -> Result<()>;
}

pub trait AddonManager: Send + Sync {
    fn install_gitops(
        &self,
        cluster: &Cluster,
        spec: &ClusterSpec,
        datacenter: &DatacenterConfig,
        machines: &[MachineConfig],
    ) -> Result<()>;
    fn validations<'a>(&'a self, spec: &'a ClusterSpec) -> Vec<Validation<'a>>;
}
