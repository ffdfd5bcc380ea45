use super::Executable;
use anyhow::{bail, Context, Result};
use capstan_hal::ProcessOps;
use std::sync::Arc;
use std::time::Duration;

pub const DOCKER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Docker {
    exe: Executable,
}

impl Docker {
    pub fn new(hal: Arc<dyn ProcessOps>) -> Self {
        Self {
            exe: Executable::new("docker", DOCKER_TIMEOUT, hal),
        }
    }

    /// Server version reported by the daemon; fails when the daemon is unreachable.
    pub fn server_version(&self) -> Result<String> {
        let out = self
            .exe
            .execute(&["version", "--format", "{{.Server.Version}}"])
            .context("docker daemon is not reachable")?;
        let version = out.trim().to_string();
        if version.is_empty() {
            bail!("docker did not report a server version");
        }
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_hal::FakeHal;

    #[test]
    fn server_version_is_trimmed() {
        let hal = FakeHal::new();
        hal.respond("docker", Some("version"), "20.10.7\n");
        assert_eq!(Docker::new(Arc::new(hal)).server_version().unwrap(), "20.10.7");
    }

    #[test]
    fn empty_version_is_an_error() {
        let hal = FakeHal::new();
        assert!(Docker::new(Arc::new(hal)).server_version().is_err());
    }
}
