use anyhow::Result;
use capstan_core::executables::{BootstrapClusterOption, Kind};
use capstan_core::{Cluster, ClusterSpec};
use capstan_workflow::interfaces::Bootstrapper;

/// Bootstrap clusters backed by kind.
#[derive(Debug, Clone)]
pub struct KindBootstrapper {
    kind: Kind,
}

impl KindBootstrapper {
    pub fn new(kind: Kind) -> Self {
        Self { kind }
    }
}

impl Bootstrapper for KindBootstrapper {
    fn create_bootstrap_cluster(
        &self,
        spec: &ClusterSpec,
        options: &[BootstrapClusterOption],
    ) -> Result<Cluster> {
        let cluster = self.kind.create_bootstrap_cluster(spec, options)?;
        log::info!("✅ Bootstrap cluster {} is up", cluster.name);
        Ok(cluster)
    }

    // kind deletion is idempotent, so `force` only changes what gets logged.
    fn delete_bootstrap_cluster(&self, cluster: &Cluster, force: bool) -> Result<()> {
        if force {
            log::info!("Force deleting bootstrap cluster {}", cluster.name);
        }
        self.kind.delete_bootstrap_cluster(cluster)
    }
}
