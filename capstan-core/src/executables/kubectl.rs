//! kubectl: manifest application, readiness waits, annotations and diagnostics.

use super::{kubeconfig_args, Executable};
use crate::cluster::Cluster;
use anyhow::{Context, Result};
use capstan_hal::ProcessOps;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const KUBECTL_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Upper bound for waits delegated to `kubectl wait`; the process timeout sits above it.
const READY_WAIT: &str = "30m";
const WAIT_PROCESS_TIMEOUT: Duration = Duration::from_secs(31 * 60);

#[derive(Debug, Clone)]
pub struct Kubectl {
    exe: Executable,
    waiter: Executable,
}

impl Kubectl {
    pub fn new(hal: Arc<dyn ProcessOps>) -> Self {
        Self {
            exe: Executable::new("kubectl", KUBECTL_TIMEOUT, Arc::clone(&hal)),
            waiter: Executable::new("kubectl", WAIT_PROCESS_TIMEOUT, hal),
        }
    }

    pub fn apply_file(&self, cluster: &Cluster, manifest: &Path) -> Result<()> {
        let mut args = vec![
            "apply".to_string(),
            "-f".to_string(),
            manifest.display().to_string(),
        ];
        args.extend(kubeconfig_args(cluster));
        self.exe.execute(&args).with_context(|| {
            format!(
                "error applying {} to cluster {}",
                manifest.display(),
                cluster.name
            )
        })?;
        Ok(())
    }

    pub fn wait_for_control_plane_ready(&self, cluster: &Cluster, name: &str, namespace: &str) -> Result<()> {
        let mut args = vec![
            "wait".to_string(),
            "--for=condition=Ready".to_string(),
            format!("--timeout={READY_WAIT}"),
            format!("clusters.cluster.x-k8s.io/{name}"),
            "--namespace".to_string(),
            namespace.to_string(),
        ];
        args.extend(kubeconfig_args(cluster));
        self.waiter
            .execute(&args)
            .with_context(|| format!("control plane of {} did not become ready", name))?;
        Ok(())
    }

    pub fn remove_annotation(
        &self,
        cluster: &Cluster,
        resource: &str,
        annotation: &str,
        namespace: &str,
    ) -> Result<()> {
        let mut args = vec![
            "annotate".to_string(),
            resource.to_string(),
            format!("{annotation}-"),
            "--overwrite".to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
        ];
        args.extend(kubeconfig_args(cluster));
        self.exe
            .execute(&args)
            .with_context(|| format!("error removing {} from {}", annotation, resource))?;
        Ok(())
    }

    pub fn dump_cluster_info(&self, cluster: &Cluster, output_dir: &Path) -> Result<()> {
        let mut args = vec![
            "cluster-info".to_string(),
            "dump".to_string(),
            "--all-namespaces".to_string(),
            "--output-directory".to_string(),
            output_dir.display().to_string(),
        ];
        args.extend(kubeconfig_args(cluster));
        self.waiter
            .execute(&args)
            .with_context(|| format!("error dumping cluster info for {}", cluster.name))?;
        Ok(())
    }
}
