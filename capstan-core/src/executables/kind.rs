//! kind: the temporary bootstrap cluster.

use super::Executable;
use crate::cluster::{bootstrap_cluster_name, Cluster, ClusterSpec};
use crate::filewriter::write_atomic;
use anyhow::{Context, Result};
use capstan_hal::ProcessOps;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const KIND_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Provider-requested tweaks to the bootstrap cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapClusterOption {
    /// host path -> container path
    ExtraDockerMounts(BTreeMap<String, String>),
    Env(String, String),
    DisableDefaultCni,
}

#[derive(Debug, Clone)]
pub struct Kind {
    exe: Executable,
    kubeconfig_dir: PathBuf,
}

impl Kind {
    pub fn new(hal: Arc<dyn ProcessOps>, kubeconfig_dir: impl Into<PathBuf>) -> Self {
        Self {
            exe: Executable::new("kind", KIND_TIMEOUT, hal),
            kubeconfig_dir: kubeconfig_dir.into(),
        }
    }

    pub fn create_bootstrap_cluster(
        &self,
        spec: &ClusterSpec,
        options: &[BootstrapClusterOption],
    ) -> Result<Cluster> {
        let name = spec.bootstrap_cluster_name();
        let kubeconfig = self.kubeconfig_dir.join(format!("{name}.kind.kubeconfig"));
        let config_path = self.kubeconfig_dir.join(format!("{name}.kind.json"));

        let config = render_kind_config(options);
        let payload = serde_json::to_vec_pretty(&config).context("Failed to render kind config")?;
        write_atomic(&config_path, &payload)?;

        let env: Vec<(&str, &str)> = options
            .iter()
            .filter_map(|opt| match opt {
                BootstrapClusterOption::Env(k, v) => Some((k.as_str(), v.as_str())),
                _ => None,
            })
            .collect();
        let kubeconfig_arg = kubeconfig.display().to_string();
        let config_arg = config_path.display().to_string();
        let args = [
            "create",
            "cluster",
            "--name",
            name.as_str(),
            "--kubeconfig",
            kubeconfig_arg.as_str(),
            "--config",
            config_arg.as_str(),
        ];
        self.exe
            .execute_with_env(&env, &args)
            .with_context(|| format!("Failed to create bootstrap cluster {}", name))?;

        Ok(Cluster::new(name).with_kubeconfig(kubeconfig))
    }

    pub fn cluster_exists(&self, name: &str) -> Result<bool> {
        let stdout = self
            .exe
            .execute(&["get", "clusters"])
            .context("Failed to list kind clusters")?;
        Ok(stdout.lines().any(|line| line.trim() == name))
    }

    /// Delete the bootstrap cluster. A cluster that does not exist is already deleted.
    pub fn delete_bootstrap_cluster(&self, cluster: &Cluster) -> Result<()> {
        let name = if cluster.name.ends_with("-eks-a-cluster") {
            cluster.name.clone()
        } else {
            bootstrap_cluster_name(&cluster.name)
        };
        if !self.cluster_exists(&name)? {
            log::info!("Bootstrap cluster {} not found; nothing to delete", name);
            return Ok(());
        }
        self.exe
            .execute(&["delete", "cluster", "--name", name.as_str()])
            .with_context(|| format!("Failed to delete bootstrap cluster {}", name))?;
        Ok(())
    }
}

fn render_kind_config(options: &[BootstrapClusterOption]) -> serde_json::Value {
    let mut mounts = Vec::new();
    let mut disable_default_cni = false;
    for opt in options {
        match opt {
            BootstrapClusterOption::ExtraDockerMounts(m) => {
                for (host, container) in m {
                    mounts.push(json!({"hostPath": host, "containerPath": container}));
                }
            }
            BootstrapClusterOption::DisableDefaultCni => disable_default_cni = true,
            BootstrapClusterOption::Env(..) => {}
        }
    }
    json!({
        "kind": "Cluster",
        "apiVersion": "kind.x-k8s.io/v1alpha4",
        "networking": {"disableDefaultCNI": disable_default_cni},
        "nodes": [{"role": "control-plane", "extraMounts": mounts}],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::fixtures;
    use capstan_hal::FakeHal;
    use tempfile::tempdir;

    #[test]
    fn create_passes_name_kubeconfig_and_env() {
        let dir = tempdir().unwrap();
        let hal = FakeHal::new();
        let kind = Kind::new(Arc::new(hal.clone()), dir.path());
        let mounts = BTreeMap::from([(
            "/var/run/docker.sock".to_string(),
            "/var/run/docker.sock".to_string(),
        )]);

        let cluster = kind
            .create_bootstrap_cluster(
                &fixtures::spec("prod"),
                &[
                    BootstrapClusterOption::ExtraDockerMounts(mounts),
                    BootstrapClusterOption::Env("KIND_EXPERIMENTAL_DOCKER_NETWORK".into(), "capstan".into()),
                ],
            )
            .unwrap();

        assert_eq!(cluster.name, "prod-eks-a-cluster");
        let kubeconfig = dir.path().join("prod-eks-a-cluster.kind.kubeconfig");
        assert_eq!(cluster.kubeconfig.as_deref(), Some(kubeconfig.as_path()));

        let ops = hal.operations();
        let capstan_hal::Operation::Command { args, env, .. } = &ops[0];
        assert_eq!(&args[..4], ["create", "cluster", "--name", "prod-eks-a-cluster"]);
        assert_eq!(env, &vec![("KIND_EXPERIMENTAL_DOCKER_NETWORK".to_string(), "capstan".to_string())]);

        let config: serde_json::Value = serde_json::from_slice(
            &std::fs::read(dir.path().join("prod-eks-a-cluster.kind.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(config["nodes"][0]["extraMounts"][0]["hostPath"], "/var/run/docker.sock");
    }

    #[test]
    fn delete_skips_missing_cluster() {
        let dir = tempdir().unwrap();
        let hal = FakeHal::new();
        hal.respond("kind", Some("get"), "other-eks-a-cluster\n");
        let kind = Kind::new(Arc::new(hal.clone()), dir.path());

        kind.delete_bootstrap_cluster(&Cluster::new("prod")).unwrap();
        assert!(!hal.has_operation(|op| op.args().first().map(String::as_str) == Some("delete")));
    }

    #[test]
    fn delete_accepts_plain_or_bootstrap_name() {
        let dir = tempdir().unwrap();
        let hal = FakeHal::new();
        hal.respond("kind", Some("get"), "prod-eks-a-cluster\n");
        let kind = Kind::new(Arc::new(hal.clone()), dir.path());

        kind.delete_bootstrap_cluster(&Cluster::new("prod")).unwrap();
        kind.delete_bootstrap_cluster(&Cluster::new("prod-eks-a-cluster")).unwrap();
        let deletes: Vec<_> = hal
            .invocations("kind")
            .into_iter()
            .filter(|args| args[0] == "delete")
            .collect();
        assert_eq!(deletes.len(), 2);
        assert!(deletes.iter().all(|a| a[3] == "prod-eks-a-cluster"));
    }

    #[test]
    fn delete_failure_is_reported() {
        let dir = tempdir().unwrap();
        let hal = FakeHal::new();
        hal.respond("kind", Some("get"), "prod-eks-a-cluster\n");
        hal.fail("kind", Some("delete"), 1, "docker daemon not running");
        let kind = Kind::new(Arc::new(hal), dir.path());

        let err = kind.delete_bootstrap_cluster(&Cluster::new("prod")).unwrap_err();
        assert!(format!("{err:#}").contains("docker daemon not running"));
    }
}
