//! Process execution helpers.
//!
//! External commands are considered "world-touching" and must go through the HAL so we can
//! test workflows without spawning real processes.

use crate::{ExecError, ExecResult};
use std::process::Output;
use std::time::Duration;

/// Process execution trait (external command runner).
pub trait ProcessOps: Send + Sync {
    /// Run `program` with extra environment variables and capture its output.
    ///
    /// A non-zero exit status is NOT an error here; callers decide via [`ensure_success`].
    fn command_output_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
        timeout: Duration,
    ) -> ExecResult<Output>;

    fn command_output(&self, program: &str, args: &[&str], timeout: Duration) -> ExecResult<Output> {
        self.command_output_with_env(program, args, &[], timeout)
    }

    fn command_status(&self, program: &str, args: &[&str], timeout: Duration) -> ExecResult<()> {
        let output = self.command_output(program, args, timeout)?;
        ensure_success(program, &output)
    }
}

/// Map a non-zero exit status into [`ExecError::CommandFailed`].
pub fn ensure_success(program: &str, output: &Output) -> ExecResult<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(ExecError::CommandFailed {
        program: program.to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
