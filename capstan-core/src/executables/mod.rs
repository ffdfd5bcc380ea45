//! Wrappers around the external binaries the orchestrator drives.
//!
//! Each wrapper owns an [`Executable`] (program + timeout + process backend) and only knows
//! how to build argument lists; spawning goes through [`capstan_hal::ProcessOps`].

pub mod clusterctl;
pub mod docker;
pub mod flux;
pub mod kind;
pub mod kubectl;

pub use clusterctl::Clusterctl;
pub use docker::Docker;
pub use flux::Flux;
pub use kind::{BootstrapClusterOption, Kind};
pub use kubectl::Kubectl;

use crate::cluster::Cluster;
use capstan_hal::{ensure_success, ExecResult, ProcessOps};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct Executable {
    program: String,
    timeout: Duration,
    hal: Arc<dyn ProcessOps>,
}

impl Executable {
    pub fn new(program: impl Into<String>, timeout: Duration, hal: Arc<dyn ProcessOps>) -> Self {
        Self {
            program: program.into(),
            timeout,
            hal,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run with `args`; returns stdout on a zero exit status.
    pub fn execute<S: AsRef<str>>(&self, args: &[S]) -> ExecResult<String> {
        self.execute_with_env(&[], args)
    }

    pub fn execute_with_env<S: AsRef<str>>(
        &self,
        env: &[(&str, &str)],
        args: &[S],
    ) -> ExecResult<String> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        let output = self
            .hal
            .command_output_with_env(&self.program, &args, env, self.timeout)?;
        ensure_success(&self.program, &output)?;
        Ok(String::from_utf8(output.stdout)?)
    }
}

impl std::fmt::Debug for Executable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executable")
            .field("program", &self.program)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// `--kubeconfig <path>` when the cluster carries one, nothing otherwise.
pub(crate) fn kubeconfig_args(cluster: &Cluster) -> Vec<String> {
    match &cluster.kubeconfig {
        Some(path) => vec!["--kubeconfig".to_string(), path.display().to_string()],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_hal::{ExecError, FakeHal};

    #[test]
    fn execute_returns_stdout() {
        let hal = FakeHal::new();
        hal.respond("kubectl", Some("version"), "v1.21.2");
        let exe = Executable::new("kubectl", Duration::from_secs(5), Arc::new(hal.clone()));
        assert_eq!(exe.execute(&["version"]).unwrap(), "v1.21.2");
        assert_eq!(hal.operation_count(), 1);
    }

    #[test]
    fn execute_maps_non_zero_exit() {
        let hal = FakeHal::new();
        hal.fail("kubectl", None, 1, "connection refused");
        let exe = Executable::new("kubectl", Duration::from_secs(5), Arc::new(hal));
        let err = exe.execute(&["get", "nodes"]).unwrap_err();
        assert!(matches!(err, ExecError::CommandFailed { ref stderr, .. } if stderr == "connection refused"));
    }

    #[test]
    fn kubeconfig_args_only_when_present() {
        assert!(kubeconfig_args(&Cluster::new("a")).is_empty());
        assert_eq!(
            kubeconfig_args(&Cluster::new("a").with_kubeconfig("/tmp/a.kubeconfig")),
            vec!["--kubeconfig", "/tmp/a.kubeconfig"]
        );
    }
}
