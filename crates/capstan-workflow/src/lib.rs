//! capstan workflow orchestration.
//!
//! This crate holds the generic task-chain executor (each task picks its successor), the
//! execution context threaded through a run, the pre-flight validation runner, and the
//! create-cluster workflow built on top of them. Concrete collaborators (providers, kind,
//! clusterctl) are supplied by higher-level crates through the traits in [`interfaces`].

pub mod context;
pub mod create;
pub mod interfaces;
pub mod task;
pub mod validations;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::{Collaborators, CommandContext};
pub use create::{Create, CreateTask, RunReport};
pub use task::{Task, TaskRunner, WorkflowContext};
pub use validations::{Validation, ValidationResult};
