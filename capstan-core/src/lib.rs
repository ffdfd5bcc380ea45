//! capstan core library.
//!
//! `capstan-core` holds the cluster specification model, config loading, artifact writing and
//! the wrappers around external binaries used by the workflow's collaborators.

pub mod cli;
pub mod cluster;
pub mod config;
pub mod config_states;
pub mod executables;
pub mod filewriter;
pub mod logging;
pub mod marshaller;

pub use cluster::{Cluster, ClusterSpec, DatacenterConfig, MachineConfig};
