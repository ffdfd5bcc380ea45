//! CLI argument parsing for capstan.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "capstan")]
#[command(about = "Create managed Kubernetes clusters through a temporary bootstrap cluster")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create resources
    Create {
        #[command(subcommand)]
        resource: CreateResource,
    },
}

#[derive(Subcommand, Debug)]
pub enum CreateResource {
    /// Create a workload cluster
    Cluster(CreateClusterArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct CreateClusterArgs {
    /// Cluster spec file (.toml or .json)
    #[arg(short, long)]
    pub filename: PathBuf,

    /// Delete a leftover bootstrap cluster for this cluster name before starting
    #[arg(long)]
    pub force_cleanup: bool,

    /// Directory that receives kubeconfigs, generated manifests and the final cluster config
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}
