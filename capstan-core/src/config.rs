//! Loading and static validation of cluster spec files.

use crate::cluster::ClusterSpec;
use crate::config_states::{UnvalidatedConfig, ValidateConfig, ValidatedConfig};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

const MAX_NAME_LEN: usize = 63;

/// Read a spec file; the extension picks the format (`.toml` or `.json`).
pub fn load_spec(path: &Path) -> Result<UnvalidatedConfig<ClusterSpec>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read cluster spec: {}", path.display()))?;
    let spec: ClusterSpec = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML cluster spec: {}", path.display()))?,
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON cluster spec: {}", path.display()))?,
        other => bail!(
            "Unsupported cluster spec format {:?} for {}; use .toml or .json",
            other.unwrap_or(""),
            path.display()
        ),
    };
    Ok(UnvalidatedConfig::new(spec))
}

pub fn load_validated_spec(path: &Path) -> Result<ValidatedConfig<ClusterSpec>> {
    load_spec(path)?.validate()
}

impl ValidateConfig for ClusterSpec {
    fn validate_cfg(&self) -> Result<()> {
        validate_name(&self.name)?;
        if self.kubernetes_version.trim().is_empty() {
            bail!("kubernetesVersion is required");
        }
        if self.control_plane.count == 0 {
            bail!("controlPlane.count must be at least 1");
        }
        if self.control_plane.count % 2 == 0 {
            bail!(
                "controlPlane.count must be odd to keep etcd quorum, got {}",
                self.control_plane.count
            );
        }
        if let Some(etcd) = &self.external_etcd {
            if etcd.count == 0 || etcd.count % 2 == 0 {
                bail!("externalEtcd.count must be odd and at least 1, got {}", etcd.count);
            }
            if self.bundle.etcdadm_bootstrap.is_none() || self.bundle.etcdadm_controller.is_none() {
                bail!("externalEtcd requires bundle.etcdadmBootstrap and bundle.etcdadmController");
            }
        }
        let versions = [
            ("clusterApi", &self.bundle.cluster_api),
            ("bootstrap", &self.bundle.bootstrap),
            ("controlPlane", &self.bundle.control_plane),
            ("infrastructure", &self.bundle.infrastructure),
        ];
        for (field, version) in versions {
            if version.trim().is_empty() {
                bail!("bundle.{} version is required", field);
            }
        }
        if self.datacenter_ref.kind.trim().is_empty() || self.datacenter_ref.name.trim().is_empty() {
            bail!("datacenterRef requires both kind and name");
        }
        if let Some(gitops) = &self.gitops {
            if gitops.owner.trim().is_empty() || gitops.repository.trim().is_empty() {
                bail!("gitops requires both owner and repository");
            }
        }
        Ok(())
    }
}

/// DNS-1123 label: lowercase alphanumerics and '-', starting and ending alphanumeric.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("cluster name is required");
    }
    if name.len() > MAX_NAME_LEN {
        bail!("cluster name {} exceeds {} characters", name, MAX_NAME_LEN);
    }
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_edges = !name.starts_with('-') && !name.ends_with('-');
    if !valid_chars || !valid_edges {
        bail!(
            "cluster name {} is not a valid DNS-1123 label (lowercase alphanumerics and '-')",
            name
        );
    }
    Ok(())
}
