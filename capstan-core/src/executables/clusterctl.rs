//! clusterctl: lifecycle-controller installation and management move.

use super::{kubeconfig_args, Executable};
use crate::cluster::{Cluster, ClusterSpec, SYSTEM_NAMESPACE};
use anyhow::{Context, Result};
use capstan_hal::{ExecError, ProcessOps};
use std::sync::Arc;
use std::time::Duration;

pub const CLUSTERCTL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
pub struct Clusterctl {
    exe: Executable,
}

impl Clusterctl {
    pub fn new(hal: Arc<dyn ProcessOps>) -> Self {
        Self {
            exe: Executable::new("clusterctl", CLUSTERCTL_TIMEOUT, hal),
        }
    }

    pub fn init_infrastructure(
        &self,
        spec: &ClusterSpec,
        cluster: &Cluster,
        provider_name: &str,
        env: &[(&str, &str)],
    ) -> Result<()> {
        validate_cluster(cluster)?;
        let args = init_args(spec, cluster, provider_name);
        self.exe
            .execute_with_env(env, &args)
            .with_context(|| format!("error executing init on {}", cluster.name))?;
        Ok(())
    }

    pub fn move_management(&self, from: &Cluster, to: &Cluster) -> Result<()> {
        validate_cluster(from)?;
        validate_cluster(to)?;
        let to_kubeconfig = to.kubeconfig.as_ref().ok_or_else(|| {
            ExecError::InvalidCluster(format!("cluster {} has no kubeconfig", to.name))
        })?;
        let mut args = vec![
            "move".to_string(),
            "--to-kubeconfig".to_string(),
            to_kubeconfig.display().to_string(),
            "--namespace".to_string(),
            SYSTEM_NAMESPACE.to_string(),
        ];
        args.extend(kubeconfig_args(from));
        self.exe
            .execute(&args)
            .context("failed moving management cluster")?;
        Ok(())
    }

    pub fn get_workload_kubeconfig(&self, cluster_name: &str, management: &Cluster) -> Result<String> {
        validate_cluster(management)?;
        let mut args = vec![
            "get".to_string(),
            "kubeconfig".to_string(),
            cluster_name.to_string(),
            "--namespace".to_string(),
            SYSTEM_NAMESPACE.to_string(),
        ];
        args.extend(kubeconfig_args(management));
        let kubeconfig = self
            .exe
            .execute(&args)
            .context("error executing get kubeconfig")?;
        Ok(kubeconfig)
    }
}

fn validate_cluster(cluster: &Cluster) -> Result<(), ExecError> {
    if cluster.name.trim().is_empty() {
        return Err(ExecError::InvalidCluster(format!(
            "invalid cluster name '{}'",
            cluster.name
        )));
    }
    Ok(())
}

fn init_args(spec: &ClusterSpec, cluster: &Cluster, provider_name: &str) -> Vec<String> {
    let bundle = &spec.bundle;
    let mut args = vec![
        "init".to_string(),
        "--core".to_string(),
        format!("cluster-api:{}", bundle.cluster_api),
        "--bootstrap".to_string(),
        format!("kubeadm:{}", bundle.bootstrap),
        "--control-plane".to_string(),
        format!("kubeadm:{}", bundle.control_plane),
        "--infrastructure".to_string(),
        format!("{}:{}", provider_name, bundle.infrastructure),
    ];
    if spec.external_etcd.is_some() {
        if let (Some(etcd_bootstrap), Some(etcd_controller)) =
            (&bundle.etcdadm_bootstrap, &bundle.etcdadm_controller)
        {
            args.extend([
                "--bootstrap".to_string(),
                format!("etcdadm-bootstrap:{}", etcd_bootstrap),
                "--bootstrap".to_string(),
                format!("etcdadm-controller:{}", etcd_controller),
            ]);
        }
    }
    args.extend(kubeconfig_args(cluster));
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{fixtures, NodeGroup};
    use capstan_hal::FakeHal;

    fn clusterctl() -> (Clusterctl, FakeHal) {
        let hal = FakeHal::new();
        (Clusterctl::new(Arc::new(hal.clone())), hal)
    }

    #[test]
    fn init_builds_versioned_provider_args() {
        let (ctl, hal) = clusterctl();
        let cluster = Cluster::new("prod-eks-a-cluster").with_kubeconfig("/k/boot.kubeconfig");
        ctl.init_infrastructure(&fixtures::spec("prod"), &cluster, "docker", &[])
            .unwrap();

        assert_eq!(
            hal.invocations("clusterctl")[0],
            vec![
                "init",
                "--core",
                "cluster-api:v0.3.19",
                "--bootstrap",
                "kubeadm:v0.3.19",
                "--control-plane",
                "kubeadm:v0.3.19",
                "--infrastructure",
                "docker:v0.3.19",
                "--kubeconfig",
                "/k/boot.kubeconfig",
            ]
        );
    }

    #[test]
    fn init_adds_etcdadm_providers_for_external_etcd() {
        let (ctl, hal) = clusterctl();
        let mut spec = fixtures::spec("prod");
        spec.external_etcd = Some(NodeGroup {
            count: 3,
            machine_config: None,
        });
        spec.bundle.etcdadm_bootstrap = Some("v0.1.0".to_string());
        spec.bundle.etcdadm_controller = Some("v0.1.1".to_string());

        ctl.init_infrastructure(&spec, &Cluster::new("prod"), "docker", &[])
            .unwrap();
        let args = &hal.invocations("clusterctl")[0];
        assert!(args.contains(&"etcdadm-bootstrap:v0.1.0".to_string()));
        assert!(args.contains(&"etcdadm-controller:v0.1.1".to_string()));
        assert!(!args.contains(&"--kubeconfig".to_string()));
    }

    #[test]
    fn init_rejects_unnamed_cluster_without_running() {
        let (ctl, hal) = clusterctl();
        let err = ctl
            .init_infrastructure(&fixtures::spec("prod"), &Cluster::new(""), "docker", &[])
            .unwrap_err();
        assert!(err.to_string().contains("invalid cluster name"));
        assert_eq!(hal.operation_count(), 0);
    }

    #[test]
    fn move_targets_workload_kubeconfig() {
        let (ctl, hal) = clusterctl();
        let from = Cluster::new("prod-eks-a-cluster").with_kubeconfig("/k/boot");
        let to = Cluster::new("prod").with_kubeconfig("/k/prod");
        ctl.move_management(&from, &to).unwrap();
        assert_eq!(
            hal.invocations("clusterctl")[0],
            vec!["move", "--to-kubeconfig", "/k/prod", "--namespace", "eksa-system", "--kubeconfig", "/k/boot"]
        );
    }

    #[test]
    fn move_requires_target_kubeconfig() {
        let (ctl, _hal) = clusterctl();
        let err = ctl
            .move_management(&Cluster::new("boot"), &Cluster::new("prod"))
            .unwrap_err();
        assert!(err.to_string().contains("has no kubeconfig"));
    }

    #[test]
    fn move_failure_is_wrapped() {
        let (ctl, hal) = clusterctl();
        hal.fail("clusterctl", Some("move"), 1, "timed out waiting for objects");
        let err = ctl
            .move_management(&Cluster::new("boot"), &Cluster::new("prod").with_kubeconfig("/k/prod"))
            .unwrap_err();
        assert_eq!(err.to_string(), "failed moving management cluster");
        assert!(format!("{err:#}").contains("timed out waiting for objects"));
    }

    #[test]
    fn get_kubeconfig_returns_stdout() {
        let (ctl, hal) = clusterctl();
        hal.respond("clusterctl", Some("get"), "apiVersion: v1\n");
        let out = ctl
            .get_workload_kubeconfig("prod", &Cluster::new("boot").with_kubeconfig("/k/boot"))
            .unwrap();
        assert_eq!(out, "apiVersion: v1\n");
    }
}
