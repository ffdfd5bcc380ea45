//! Concrete collaborators behind the `capstan` binary.
//!
//! The workflow crate only knows the collaborator traits; this crate implements them on top of
//! docker, kind, clusterctl, kubectl and flux and wires them into commands.

pub mod addons;
pub mod bootstrapper;
pub mod cluster_manager;
pub mod commands;
pub mod provider;

pub use addons::FluxAddonManager;
pub use bootstrapper::KindBootstrapper;
pub use cluster_manager::ClusterctlManager;
pub use provider::DockerProvider;
