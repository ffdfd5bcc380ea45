//! HAL trait definitions and implementations.
//!
//! This module defines the process execution trait and provides both a real
//! (LinuxHal) and a fake (FakeHal) implementation.

pub mod fake_hal;
pub mod linux_hal;
pub mod process_ops;

pub use fake_hal::{FakeHal, Operation};
pub use linux_hal::LinuxHal;
pub use process_ops::{ensure_success, ProcessOps};
