//! Fake HAL implementation for testing.
//!
//! Records every command without executing it. Responses can be scripted per program
//! (and optionally per subcommand) so executables can be tested for both success and failure.

use super::ProcessOps;
use crate::ExecResult;
#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Operation records for testing and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Command {
        program: String,
        args: Vec<String>,
        env: Vec<(String, String)>,
        timeout_secs: u64,
    },
}

impl Operation {
    pub fn program(&self) -> &str {
        match self {
            Operation::Command { program, .. } => program,
        }
    }

    pub fn args(&self) -> &[String] {
        match self {
            Operation::Command { args, .. } => args,
        }
    }
}

#[derive(Debug, Clone)]
struct Scripted {
    program: String,
    /// Matches when the first argument equals this value; `None` matches any invocation.
    subcommand: Option<String>,
    code: i32,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Shared state for FakeHal operations.
#[derive(Debug, Clone, Default)]
struct FakeHalState {
    operations: Vec<Operation>,
    scripted: Vec<Scripted>,
}

/// Fake HAL implementation that records operations without executing them.
#[derive(Debug, Clone, Default)]
pub struct FakeHal {
    state: Arc<Mutex<FakeHalState>>,
}

impl FakeHal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    /// Get the number of operations recorded.
    pub fn operation_count(&self) -> usize {
        self.lock().operations.len()
    }

    /// Check if a specific operation was recorded.
    pub fn has_operation(&self, check: impl Fn(&Operation) -> bool) -> bool {
        self.lock().operations.iter().any(check)
    }

    /// Arguments of every recorded invocation of `program`, in order.
    pub fn invocations(&self, program: &str) -> Vec<Vec<String>> {
        self.lock()
            .operations
            .iter()
            .filter(|op| op.program() == program)
            .map(|op| op.args().to_vec())
            .collect()
    }

    /// Clear all recorded operations (scripted responses are kept).
    pub fn clear(&self) {
        self.lock().operations.clear();
    }

    /// Make every invocation of `program` (or of `program <subcommand>`) exit with `code`.
    pub fn fail(&self, program: &str, subcommand: Option<&str>, code: i32, stderr: &str) {
        self.script(program, subcommand, code, "", stderr);
    }

    /// Make `program` (or `program <subcommand>`) succeed and print `stdout`.
    pub fn respond(&self, program: &str, subcommand: Option<&str>, stdout: &str) {
        self.script(program, subcommand, 0, stdout, "");
    }

    fn script(&self, program: &str, subcommand: Option<&str>, code: i32, stdout: &str, stderr: &str) {
        self.lock().scripted.push(Scripted {
            program: program.to_string(),
            subcommand: subcommand.map(String::from),
            code,
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeHalState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(unix)]
fn exit_status(code: i32) -> ExitStatus {
    ExitStatus::from_raw(code << 8)
}

#[cfg(not(unix))]
fn exit_status(code: i32) -> ExitStatus {
    let program = if code == 0 { "true" } else { "false" };
    std::process::Command::new(program)
        .status()
        .unwrap_or_else(|_| panic!("FakeHal needs `{program}` on non-unix hosts"))
}

impl ProcessOps for FakeHal {
    fn command_output_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
        timeout: Duration,
    ) -> ExecResult<Output> {
        log::info!("FAKE HAL: {} {}", program, args.join(" "));
        let mut state = self.lock();
        state.operations.push(Operation::Command {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            timeout_secs: timeout.as_secs(),
        });

        // Later scripts override earlier ones; a subcommand match wins over a catch-all.
        let first = args.first().copied();
        let scripted = state
            .scripted
            .iter()
            .rev()
            .filter(|s| s.program == program)
            .find(|s| s.subcommand.is_some() && s.subcommand.as_deref() == first)
            .or_else(|| {
                state
                    .scripted
                    .iter()
                    .rev()
                    .find(|s| s.program == program && s.subcommand.is_none())
            })
            .cloned();

        Ok(match scripted {
            Some(s) => Output {
                status: exit_status(s.code),
                stdout: s.stdout,
                stderr: s.stderr,
            },
            None => Output {
                status: exit_status(0),
                stdout: Vec::new(),
                stderr: Vec::new(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ensure_success, ExecError};

    const T: Duration = Duration::from_secs(30);

    #[test]
    fn records_commands_in_order() {
        let hal = FakeHal::new();
        hal.command_status("kind", &["create", "cluster"], T).unwrap();
        hal.command_output_with_env("clusterctl", &["init"], &[("EXP_CLUSTER_RESOURCE_SET", "true")], T)
            .unwrap();

        let ops = hal.operations();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].program(), "kind");
        assert_eq!(
            ops[1],
            Operation::Command {
                program: "clusterctl".to_string(),
                args: vec!["init".to_string()],
                env: vec![("EXP_CLUSTER_RESOURCE_SET".to_string(), "true".to_string())],
                timeout_secs: 30,
            }
        );
    }

    #[test]
    fn scripted_failure_only_hits_matching_subcommand() {
        let hal = FakeHal::new();
        hal.fail("kind", Some("delete"), 1, "no such cluster");

        assert!(hal.command_status("kind", &["create", "cluster"], T).is_ok());
        let output = hal.command_output("kind", &["delete", "cluster"], T).unwrap();
        let err = ensure_success("kind", &output).unwrap_err();
        assert!(matches!(err, ExecError::CommandFailed { code: Some(1), .. }));
        assert!(err.to_string().contains("no such cluster"));
    }

    #[test]
    fn respond_sets_stdout() {
        let hal = FakeHal::new();
        hal.respond("kind", Some("get"), "bootstrap-a\nbootstrap-b\n");
        let out = hal.command_output("kind", &["get", "clusters"], T).unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout), "bootstrap-a\nbootstrap-b\n");
        assert_eq!(hal.invocations("kind"), vec![vec!["get".to_string(), "clusters".to_string()]]);
    }
}
