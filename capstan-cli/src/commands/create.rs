//! `capstan create cluster`

use crate::{ClusterctlManager, DockerProvider, FluxAddonManager, KindBootstrapper};
use anyhow::Result;
use capstan_core::cli::CreateClusterArgs;
use capstan_core::config;
use capstan_core::executables::Kind;
use capstan_core::filewriter::{DirWriter, FileWriter};
use capstan_core::ClusterSpec;
use capstan_hal::{LinuxHal, ProcessOps};
use capstan_workflow::Create;
use std::sync::Arc;

pub fn run(args: &CreateClusterArgs) -> Result<()> {
    let spec = config::load_validated_spec(&args.filename)?.into_inner();
    log::info!("Creating cluster {} from {}", spec.name, args.filename.display());

    let writer = DirWriter::for_cluster(&args.output_dir, &spec.name)?;
    let github_token = std::env::var(crate::addons::GITHUB_TOKEN_ENV).ok();
    run_with(&spec, args.force_cleanup, writer, Arc::new(LinuxHal::new()), github_token)
}

/// Wire the concrete collaborators over `hal` and run the create workflow.
pub fn run_with(
    spec: &ClusterSpec,
    force_cleanup: bool,
    writer: DirWriter,
    hal: Arc<dyn ProcessOps>,
    github_token: Option<String>,
) -> Result<()> {
    let provider = DockerProvider::new(Arc::clone(&hal), spec);
    let bootstrapper = KindBootstrapper::new(Kind::new(Arc::clone(&hal), writer.dir()));
    let cluster_manager = ClusterctlManager::new(Arc::clone(&hal), Arc::new(writer.clone()));
    let addon_manager = FluxAddonManager::new(hal, github_token);

    let create = Create::new(
        &bootstrapper,
        &provider,
        &cluster_manager,
        &addon_manager,
        &writer,
    );
    let report = create.run_with_report(spec, force_cleanup);

    log::debug!("Tasks run: {}", report.tasks.join(" -> "));
    for err in &report.secondary_errors {
        log::debug!("Suppressed error: {}", err);
    }
    if report.result.is_err() {
        if let Some(bootstrap) = &report.bootstrap_cluster {
            log::warn!(
                "Bootstrap cluster {} is still running; rerun with --force-cleanup to remove it",
                bootstrap.name
            );
        }
    }
    report.result
}
