//! The create-cluster workflow.
//!
//! Stages and their successors:
//!
//! | task                       | success                   | failure                        |
//! |----------------------------|---------------------------|--------------------------------|
//! | `setup-validate`           | `bootstrap-cluster-init`  | end                            |
//! | `bootstrap-cluster-init`   | `workload-cluster-init`   | `delete-kind-cluster`, or end when no cluster was created |
//! | `workload-cluster-init`    | `capi-management-move`    | end                            |
//! | `capi-management-move`     | `eksa-components-install` | end                            |
//! | `eksa-components-install`  | `addon-manager-install`   | end                            |
//! | `addon-manager-install`    | `write-cluster-config`    | `write-cluster-config` (warning only) |
//! | `write-cluster-config`     | `delete-bootstrap-cluster`| `delete-bootstrap-cluster`     |
//! | `delete-bootstrap-cluster` | end                       | end                            |
//!
//! Every successor sits further down the table than its predecessor, so a run ends after at
//! most eight tasks.

use crate::context::{Collaborators, CommandContext};
use crate::interfaces::{AddonManager, Bootstrapper, ClusterManager, Provider};
use crate::task::{Task, TaskRunner};
use crate::validations::{Runner, Validation};
use anyhow::{Context, Result};
use capstan_core::filewriter::FileWriter;
use capstan_core::marshaller::write_cluster_config;
use capstan_core::{Cluster, ClusterSpec};
use capstan_error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateTask {
    SetupAndValidate,
    CreateBootstrapCluster,
    /// Failure-path teardown of a bootstrap cluster whose setup did not finish.
    DeleteKindCluster,
    CreateWorkloadCluster,
    MoveClusterManagement,
    InstallEksaComponents,
    InstallAddonManager,
    WriteClusterConfig,
    DeleteBootstrapCluster,
}

impl<'a> Task<CommandContext<'a>> for CreateTask {
    fn name(&self) -> &'static str {
        match self {
            CreateTask::SetupAndValidate => "setup-validate",
            CreateTask::CreateBootstrapCluster => "bootstrap-cluster-init",
            CreateTask::DeleteKindCluster => "delete-kind-cluster",
            CreateTask::CreateWorkloadCluster => "workload-cluster-init",
            CreateTask::MoveClusterManagement => "capi-management-move",
            CreateTask::InstallEksaComponents => "eksa-components-install",
            CreateTask::InstallAddonManager => "addon-manager-install",
            CreateTask::WriteClusterConfig => "write-cluster-config",
            CreateTask::DeleteBootstrapCluster => "delete-bootstrap-cluster",
        }
    }

    fn run(&self, ctx: &mut CommandContext<'a>) -> Option<Self> {
        match self {
            CreateTask::SetupAndValidate => setup_and_validate(ctx),
            CreateTask::CreateBootstrapCluster => create_bootstrap_cluster(ctx),
            CreateTask::DeleteKindCluster => delete_kind_cluster(ctx),
            CreateTask::CreateWorkloadCluster => create_workload_cluster(ctx),
            CreateTask::MoveClusterManagement => move_cluster_management(ctx),
            CreateTask::InstallEksaComponents => install_eksa_components(ctx),
            CreateTask::InstallAddonManager => install_addon_manager(ctx),
            CreateTask::WriteClusterConfig => write_config(ctx),
            CreateTask::DeleteBootstrapCluster => delete_bootstrap_cluster(ctx),
        }
    }
}

/// Move a collaborator result into the context: `None` means the error was captured.
fn record<T>(ctx: &mut CommandContext<'_>, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            ctx.set_error(err);
            None
        }
    }
}

fn provider_validation<'v>(provider: &'v dyn Provider, spec: &'v ClusterSpec) -> Validation<'v> {
    Validation::new(format!("{} Provider setup is valid", provider.name()), move || {
        provider.setup_and_validate_create_cluster(spec)
    })
}

fn setup_and_validate(ctx: &mut CommandContext<'_>) -> Option<CreateTask> {
    log::info!("🧪 Performing setup and validations");
    let c = ctx.collaborators;
    let spec = ctx.cluster_spec;

    let mut runner = Runner::new();
    runner.register([provider_validation(c.provider, spec)]);
    runner.register(c.addon_manager.validations(spec));
    if let Err(err) = runner.run() {
        ctx.set_error(err);
        return None;
    }
    Some(CreateTask::CreateBootstrapCluster)
}

fn create_bootstrap_cluster(ctx: &mut CommandContext<'_>) -> Option<CreateTask> {
    log::info!("Creating new bootstrap cluster");
    let c = ctx.collaborators;
    let spec = ctx.cluster_spec;

    let options = record(ctx, c.provider.bootstrap_cluster_options())?;
    let bootstrap = record(ctx, c.bootstrapper.create_bootstrap_cluster(spec, &options))?;
    if let Err(err) = ctx.set_bootstrap_cluster(bootstrap.clone()) {
        ctx.set_error(err);
        return Some(CreateTask::DeleteKindCluster);
    }

    log::info!("Installing cluster-api providers on bootstrap cluster");
    if record(ctx, c.cluster_manager.install_capi(spec, &bootstrap, c.provider)).is_none() {
        return Some(CreateTask::DeleteKindCluster);
    }

    log::info!("Provider specific setup");
    if record(ctx, c.provider.bootstrap_setup(spec, &bootstrap)).is_none() {
        return Some(CreateTask::DeleteKindCluster);
    }

    Some(CreateTask::CreateWorkloadCluster)
}

fn delete_kind_cluster(ctx: &mut CommandContext<'_>) -> Option<CreateTask> {
    let Some(bootstrap) = ctx.bootstrap_cluster().cloned() else {
        log::debug!("No bootstrap cluster to delete");
        return None;
    };
    log::info!("Deleting bootstrap cluster {} after failed setup", bootstrap.name);
    let bootstrapper = ctx.collaborators.bootstrapper;
    if record(ctx, bootstrapper.delete_bootstrap_cluster(&bootstrap, false)).is_some() {
        ctx.take_bootstrap_cluster();
    }
    None
}

fn create_workload_cluster(ctx: &mut CommandContext<'_>) -> Option<CreateTask> {
    log::info!("Creating new workload cluster");
    let c = ctx.collaborators;
    let spec = ctx.cluster_spec;

    let Some(bootstrap) = ctx.bootstrap_cluster().cloned() else {
        ctx.set_error(WorkflowError::BootstrapClusterMissing);
        return None;
    };
    let workload = record(ctx, c.cluster_manager.create_workload_cluster(&bootstrap, spec, c.provider))?;
    if let Err(err) = ctx.set_workload_cluster(workload.clone()) {
        ctx.set_error(err);
        return None;
    }

    log::info!("Installing networking on workload cluster");
    record(ctx, c.cluster_manager.install_networking(&workload, spec))?;

    log::info!("Installing storage class on workload cluster");
    record(ctx, c.cluster_manager.install_storage_class(&workload, spec, c.provider))?;

    log::info!("Installing cluster-api providers on workload cluster");
    record(ctx, c.cluster_manager.install_capi(spec, &workload, c.provider))?;

    log::debug!("Installing machine health checks on bootstrap cluster");
    record(ctx, c.cluster_manager.install_machine_health_checks(&bootstrap, spec, c.provider))?;

    Some(CreateTask::MoveClusterManagement)
}

fn move_cluster_management(ctx: &mut CommandContext<'_>) -> Option<CreateTask> {
    log::info!("Moving cluster management from bootstrap to workload cluster");
    let Some(bootstrap) = ctx.bootstrap_cluster().cloned() else {
        ctx.set_error(WorkflowError::BootstrapClusterMissing);
        return None;
    };
    let Some(workload) = ctx.workload_cluster().cloned() else {
        ctx.set_error(WorkflowError::WorkloadClusterMissing);
        return None;
    };
    let manager = ctx.collaborators.cluster_manager;
    record(ctx, manager.move_capi(&bootstrap, &workload))?;
    Some(CreateTask::InstallEksaComponents)
}

fn install_eksa_components(ctx: &mut CommandContext<'_>) -> Option<CreateTask> {
    log::info!("Installing custom components (CRD and controller) on workload cluster");
    let c = ctx.collaborators;
    let input = ctx.cluster_spec;
    let Some(workload) = ctx.workload_cluster().cloned() else {
        ctx.set_error(WorkflowError::WorkloadClusterMissing);
        return None;
    };
    record(ctx, c.cluster_manager.install_custom_components(input, &workload))?;

    log::info!("Creating cluster resources on workload cluster");
    let mut datacenter = c.provider.datacenter_config();
    let machines = c.provider.machine_configs();

    // Resources are created paused so the controller does not act on a half-created set.
    let mut spec = input.clone();
    spec.pause_reconcile();
    datacenter.pause_reconcile();

    record(
        ctx,
        c.cluster_manager
            .create_eksa_resources(&workload, &spec, &datacenter, &machines),
    )?;
    record(
        ctx,
        c.cluster_manager
            .resume_eksa_controller_reconcile(&workload, &spec, c.provider),
    )?;
    Some(CreateTask::InstallAddonManager)
}

fn install_addon_manager(ctx: &mut CommandContext<'_>) -> Option<CreateTask> {
    log::info!("Installing addon manager and GitOps toolkit on workload cluster");
    let c = ctx.collaborators;
    let result = match ctx.workload_cluster() {
        Some(workload) => c.addon_manager.install_gitops(
            workload,
            ctx.cluster_spec,
            &c.provider.datacenter_config(),
            &c.provider.machine_configs(),
        ),
        None => Err(WorkflowError::WorkloadClusterMissing.into()),
    };
    if let Err(err) = result {
        log::warn!(
            "Error when installing GitOps toolkits on workload cluster; cluster creation will continue, but GitOps will not be enabled: {:#}",
            err
        );
    }
    Some(CreateTask::WriteClusterConfig)
}

fn write_config(ctx: &mut CommandContext<'_>) -> Option<CreateTask> {
    log::info!("Writing cluster config file");
    let c = ctx.collaborators;
    let result = write_cluster_config(
        ctx.cluster_spec,
        &c.provider.datacenter_config(),
        &c.provider.machine_configs(),
        c.writer,
    );
    match result {
        Ok(path) => log::info!("💾 Cluster config written to {}", path.display()),
        Err(err) => ctx.set_error(err),
    }
    Some(CreateTask::DeleteBootstrapCluster)
}

fn delete_bootstrap_cluster(ctx: &mut CommandContext<'_>) -> Option<CreateTask> {
    log::info!("Deleting bootstrap cluster");
    let bootstrapper = ctx.collaborators.bootstrapper;
    match ctx.bootstrap_cluster().cloned() {
        Some(bootstrap) => {
            if record(ctx, bootstrapper.delete_bootstrap_cluster(&bootstrap, false)).is_some() {
                ctx.take_bootstrap_cluster();
            }
        }
        None => log::debug!("No bootstrap cluster to delete"),
    }
    if ctx.original_error().is_none() {
        log::info!("🎉 Cluster created!");
    }
    None
}

/// Outcome of a create run plus what the run left behind.
#[derive(Debug)]
pub struct RunReport {
    pub result: Result<()>,
    /// Task names in execution order.
    pub tasks: Vec<&'static str>,
    /// Still set when the bootstrap cluster was not torn down.
    pub bootstrap_cluster: Option<Cluster>,
    pub workload_cluster: Option<Cluster>,
    pub secondary_errors: Vec<String>,
}

/// Entry point of the create-cluster workflow.
pub struct Create<'a> {
    collaborators: Collaborators<'a>,
}

impl<'a> Create<'a> {
    pub fn new(
        bootstrapper: &'a dyn Bootstrapper,
        provider: &'a dyn Provider,
        cluster_manager: &'a dyn ClusterManager,
        addon_manager: &'a dyn AddonManager,
        writer: &'a dyn FileWriter,
    ) -> Self {
        Self {
            collaborators: Collaborators {
                bootstrapper,
                provider,
                cluster_manager,
                addon_manager,
                writer,
            },
        }
    }

    pub fn from_collaborators(collaborators: Collaborators<'a>) -> Self {
        Self { collaborators }
    }

    /// Create the cluster described by `spec`.
    ///
    /// With `force_cleanup`, a bootstrap cluster left over from an earlier run is deleted first;
    /// failing to delete it aborts before any task runs.
    pub fn run(&self, spec: &ClusterSpec, force_cleanup: bool) -> Result<()> {
        self.run_with_report(spec, force_cleanup).result
    }

    pub fn run_with_report(&self, spec: &ClusterSpec, force_cleanup: bool) -> RunReport {
        if force_cleanup {
            let stale = Cluster::new(spec.bootstrap_cluster_name());
            log::info!("Force cleanup: deleting bootstrap cluster {}", stale.name);
            if let Err(err) = self
                .collaborators
                .bootstrapper
                .delete_bootstrap_cluster(&stale, false)
                .with_context(|| format!("Failed to delete bootstrap cluster {}", stale.name))
            {
                return RunReport {
                    result: Err(err),
                    tasks: Vec::new(),
                    bootstrap_cluster: None,
                    workload_cluster: None,
                    secondary_errors: Vec::new(),
                };
            }
        }

        let mut ctx = CommandContext::new(self.collaborators, spec).with_rollback(force_cleanup);
        let result = TaskRunner::new(CreateTask::SetupAndValidate).run(&mut ctx);
        let (tasks, bootstrap_cluster, workload_cluster, secondary_errors) = ctx.into_parts();
        RunReport {
            result,
            tasks,
            bootstrap_cluster,
            workload_cluster,
            secondary_errors,
        }
    }
}
