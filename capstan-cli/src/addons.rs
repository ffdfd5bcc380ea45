//! GitOps addon manager backed by flux.

use anyhow::{bail, Result};
use capstan_core::cluster::GitOpsConfig;
use capstan_core::executables::Flux;
use capstan_core::{Cluster, ClusterSpec, DatacenterConfig, MachineConfig};
use capstan_hal::ProcessOps;
use capstan_workflow::interfaces::AddonManager;
use capstan_workflow::Validation;
use std::sync::Arc;

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug, Clone)]
pub struct FluxAddonManager {
    flux: Flux,
    github_token: Option<String>,
}

impl FluxAddonManager {
    /// `github_token` is the value of `GITHUB_TOKEN`, which flux reads at bootstrap time.
    pub fn new(hal: Arc<dyn ProcessOps>, github_token: Option<String>) -> Self {
        Self {
            flux: Flux::new(hal),
            github_token,
        }
    }
}

fn non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("gitops {} is empty", field);
    }
    Ok(())
}

fn validate_branch(gitops: &GitOpsConfig) -> Result<()> {
    non_empty("branch", &gitops.branch)?;
    if gitops.branch.contains(char::is_whitespace) || gitops.branch.contains("..") {
        bail!("gitops branch '{}' is not a valid git ref", gitops.branch);
    }
    Ok(())
}

impl AddonManager for FluxAddonManager {
    fn install_gitops(
        &self,
        cluster: &Cluster,
        spec: &ClusterSpec,
        _datacenter: &DatacenterConfig,
        _machines: &[MachineConfig],
    ) -> Result<()> {
        let Some(gitops) = &spec.gitops else {
            log::info!("GitOps not configured, skipping flux bootstrap");
            return Ok(());
        };
        self.flux.bootstrap_github(cluster, &spec.name, gitops)?;
        log::info!("✅ Flux bootstrapped from {}/{}", gitops.owner, gitops.repository);
        Ok(())
    }

    fn validations<'a>(&'a self, spec: &'a ClusterSpec) -> Vec<Validation<'a>> {
        let Some(gitops) = &spec.gitops else {
            return Vec::new();
        };
        vec![
            Validation::new("gitops owner is set", move || non_empty("owner", &gitops.owner)),
            Validation::new("gitops repository is set", move || {
                non_empty("repository", &gitops.repository)
            }),
            Validation::new("gitops branch is valid", move || validate_branch(gitops)),
            Validation::new("github token is set", move || {
                match self.github_token.as_deref().map(str::trim) {
                    Some(token) if !token.is_empty() => Ok(()),
                    _ => bail!("{} must be set to bootstrap flux", GITHUB_TOKEN_ENV),
                }
            }),
        ]
    }
}
