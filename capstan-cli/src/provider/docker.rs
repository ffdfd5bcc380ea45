//! Docker provider: cluster nodes run as containers on the local docker daemon.

use anyhow::{bail, Context, Result};
use capstan_core::executables::{BootstrapClusterOption, Docker};
use capstan_core::{Cluster, ClusterSpec, DatacenterConfig, MachineConfig};
use capstan_hal::ProcessOps;
use capstan_workflow::interfaces::Provider;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const PROVIDER_NAME: &str = "docker";
pub const DATACENTER_KIND: &str = "DockerDatacenterConfig";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

#[derive(Debug, Clone)]
pub struct DockerProvider {
    docker: Docker,
    datacenter_name: String,
}

impl DockerProvider {
    pub fn new(hal: Arc<dyn ProcessOps>, spec: &ClusterSpec) -> Self {
        Self {
            docker: Docker::new(hal),
            datacenter_name: spec.datacenter_ref.name.clone(),
        }
    }
}

impl Provider for DockerProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    /// The bootstrap cluster creates workload nodes through the host daemon.
    fn bootstrap_cluster_options(&self) -> Result<Vec<BootstrapClusterOption>> {
        let mounts = BTreeMap::from([(DOCKER_SOCKET.to_string(), DOCKER_SOCKET.to_string())]);
        Ok(vec![BootstrapClusterOption::ExtraDockerMounts(mounts)])
    }

    fn bootstrap_setup(&self, _spec: &ClusterSpec, bootstrap: &Cluster) -> Result<()> {
        log::debug!("No docker specific setup needed on {}", bootstrap.name);
        Ok(())
    }

    fn setup_and_validate_create_cluster(&self, spec: &ClusterSpec) -> Result<()> {
        if spec.datacenter_ref.kind != DATACENTER_KIND {
            bail!(
                "datacenter kind {} is not supported by the {} provider",
                spec.datacenter_ref.kind,
                PROVIDER_NAME
            );
        }
        let version = self
            .docker
            .server_version()
            .context("docker provider requires a running docker daemon")?;
        log::info!("🐳 docker server {}", version);
        Ok(())
    }

    fn datacenter_config(&self) -> DatacenterConfig {
        DatacenterConfig::new(DATACENTER_KIND, self.datacenter_name.clone(), json!({}))
    }

    fn machine_configs(&self) -> Vec<MachineConfig> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_hal::FakeHal;
    use capstan_workflow::testing::spec;

    #[test]
    fn validation_checks_daemon() {
        let hal = FakeHal::new();
        hal.respond("docker", Some("version"), "20.10.7\n");
        let provider = DockerProvider::new(Arc::new(hal.clone()), &spec("prod"));
        provider.setup_and_validate_create_cluster(&spec("prod")).unwrap();
        assert_eq!(hal.invocations("docker").len(), 1);
    }

    #[test]
    fn validation_fails_without_daemon() {
        let hal = FakeHal::new();
        hal.fail("docker", None, 1, "Cannot connect to the Docker daemon");
        let provider = DockerProvider::new(Arc::new(hal), &spec("prod"));
        let err = provider
            .setup_and_validate_create_cluster(&spec("prod"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("Cannot connect to the Docker daemon"));
    }

    #[test]
    fn validation_rejects_foreign_datacenter_kind() {
        let hal = FakeHal::new();
        let mut spec = spec("prod");
        spec.datacenter_ref.kind = "VSphereDatacenterConfig".to_string();
        let provider = DockerProvider::new(Arc::new(hal.clone()), &spec);
        assert!(provider.setup_and_validate_create_cluster(&spec).is_err());
        assert_eq!(hal.operation_count(), 0);
    }

    #[test]
    fn bootstrap_mounts_docker_socket() {
        let provider = DockerProvider::new(Arc::new(FakeHal::new()), &spec("prod"));
        let options = provider.bootstrap_cluster_options().unwrap();
        match &options[..] {
            [BootstrapClusterOption::ExtraDockerMounts(m)] => {
                assert_eq!(m.get(DOCKER_SOCKET).map(String::as_str), Some(DOCKER_SOCKET));
            }
            other => panic!("unexpected options: {other:?}"),
        }
    }
}
