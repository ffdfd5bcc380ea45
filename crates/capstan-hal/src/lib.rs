//! capstan host abstraction layer.
//!
//! Every external program the orchestrator drives (kind, clusterctl, kubectl, flux, docker)
//! is spawned through [`ProcessOps`], so workflows can be exercised against [`FakeHal`]
//! without touching a real host.

pub mod hal;

pub use capstan_error::{ExecError, ExecResult};
pub use hal::{ensure_success, FakeHal, LinuxHal, Operation, ProcessOps};
