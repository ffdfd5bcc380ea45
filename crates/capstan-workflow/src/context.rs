//! Per-run execution context.

use crate::interfaces::{AddonManager, Bootstrapper, ClusterManager, Provider};
use crate::task::WorkflowContext;
use anyhow::Result;
use capstan_core::filewriter::FileWriter;
use capstan_core::{Cluster, ClusterSpec};
use capstan_error::WorkflowError;

/// Borrowed collaborator handles, injected once at workflow start.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub bootstrapper: &'a dyn Bootstrapper,
    pub provider: &'a dyn Provider,
    pub cluster_manager: &'a dyn ClusterManager,
    pub addon_manager: &'a dyn AddonManager,
    pub writer: &'a dyn FileWriter,
}

/// State shared by every task of one workflow run.
///
/// The context is owned exclusively by the run. Cluster handles are set at most once and the
/// first captured error is never replaced; later failures land in `secondary_errors`.
pub struct CommandContext<'a> {
    pub collaborators: Collaborators<'a>,
    pub cluster_spec: &'a ClusterSpec,
    pub rollback: bool,
    bootstrap_cluster: Option<Cluster>,
    bootstrap_assigned: bool,
    workload_cluster: Option<Cluster>,
    original_error: Option<anyhow::Error>,
    secondary_errors: Vec<String>,
    current_task: Option<&'static str>,
    completed_tasks: Vec<&'static str>,
}

impl<'a> CommandContext<'a> {
    pub fn new(collaborators: Collaborators<'a>, cluster_spec: &'a ClusterSpec) -> Self {
        Self {
            collaborators,
            cluster_spec,
            rollback: false,
            bootstrap_cluster: None,
            bootstrap_assigned: false,
            workload_cluster: None,
            original_error: None,
            secondary_errors: Vec::new(),
            current_task: None,
            completed_tasks: Vec::new(),
        }
    }

    pub fn with_rollback(mut self, rollback: bool) -> Self {
        self.rollback = rollback;
        self
    }

    /// Record a failure. The first one becomes the run's original error.
    pub fn set_error(&mut self, err: impl Into<anyhow::Error>) {
        let err = err.into();
        if self.original_error.is_none() {
            log::debug!(
                "Captured error in {}: {:#}",
                self.current_task.unwrap_or("<none>"),
                err
            );
            self.original_error = Some(err);
            return;
        }
        log::warn!(
            "Additional error in {} (original error kept): {:#}",
            self.current_task.unwrap_or("<none>"),
            err
        );
        self.secondary_errors.push(format!("{:#}", err));
    }

    pub fn original_error(&self) -> Option<&anyhow::Error> {
        self.original_error.as_ref()
    }

    pub fn secondary_errors(&self) -> &[String] {
        &self.secondary_errors
    }

    pub fn bootstrap_cluster(&self) -> Option<&Cluster> {
        self.bootstrap_cluster.as_ref()
    }

    pub fn workload_cluster(&self) -> Option<&Cluster> {
        self.workload_cluster.as_ref()
    }

    pub fn set_bootstrap_cluster(&mut self, cluster: Cluster) -> Result<(), WorkflowError> {
        if self.bootstrap_assigned {
            return Err(WorkflowError::BootstrapClusterAlreadySet);
        }
        self.bootstrap_assigned = true;
        self.bootstrap_cluster = Some(cluster);
        Ok(())
    }

    /// Requires the bootstrap cluster to have been set earlier in the run.
    pub fn set_workload_cluster(&mut self, cluster: Cluster) -> Result<(), WorkflowError> {
        if self.workload_cluster.is_some() {
            return Err(WorkflowError::WorkloadClusterAlreadySet);
        }
        if !self.bootstrap_assigned {
            return Err(WorkflowError::BootstrapClusterMissing);
        }
        self.workload_cluster = Some(cluster);
        Ok(())
    }

    /// Clear the bootstrap handle once the cluster is gone. It cannot be set again.
    pub fn take_bootstrap_cluster(&mut self) -> Option<Cluster> {
        self.bootstrap_cluster.take()
    }

    pub fn current_task(&self) -> Option<&'static str> {
        self.current_task
    }

    /// Names of the tasks that ran, in order.
    pub fn history(&self) -> &[&'static str] {
        &self.completed_tasks
    }

    pub(crate) fn into_parts(self) -> (Vec<&'static str>, Option<Cluster>, Option<Cluster>, Vec<String>) {
        (
            self.completed_tasks,
            self.bootstrap_cluster,
            self.workload_cluster,
            self.secondary_errors,
        )
    }
}

impl WorkflowContext for CommandContext<'_> {
    fn set_current(&mut self, task: &'static str) {
        self.current_task = Some(task);
    }

    fn mark_completed(&mut self, task: &'static str) {
        self.completed_tasks.push(task);
        self.current_task = None;
    }

    fn has_error(&self) -> bool {
        self.original_error.is_some()
    }

    fn take_original_error(&mut self) -> Option<anyhow::Error> {
        self.original_error.take()
    }

    fn collect_diagnostics(&mut self) -> Result<()> {
        self.collaborators
            .cluster_manager
            .save_logs(self.bootstrap_cluster.as_ref())
    }
}
