//! flux: GitOps toolkit bootstrap.

use super::{kubeconfig_args, Executable};
use crate::cluster::{Cluster, GitOpsConfig};
use anyhow::{Context, Result};
use capstan_hal::ProcessOps;
use std::sync::Arc;
use std::time::Duration;

pub const FLUX_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct Flux {
    exe: Executable,
}

impl Flux {
    pub fn new(hal: Arc<dyn ProcessOps>) -> Self {
        Self {
            exe: Executable::new("flux", FLUX_TIMEOUT, hal),
        }
    }

    pub fn bootstrap_github(&self, cluster: &Cluster, cluster_name: &str, gitops: &GitOpsConfig) -> Result<()> {
        let mut args = vec![
            "bootstrap".to_string(),
            "github".to_string(),
            "--owner".to_string(),
            gitops.owner.clone(),
            "--repository".to_string(),
            gitops.repository.clone(),
            "--branch".to_string(),
            gitops.branch.clone(),
            "--path".to_string(),
            format!("{}/{}", gitops.cluster_config_path.trim_end_matches('/'), cluster_name),
        ];
        if gitops.personal {
            args.push("--personal".to_string());
        }
        args.extend(kubeconfig_args(cluster));
        self.exe
            .execute(&args)
            .with_context(|| format!("error bootstrapping flux on {}", cluster.name))?;
        Ok(())
    }
}
