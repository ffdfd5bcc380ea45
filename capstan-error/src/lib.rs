use std::fmt;
use std::io;
use thiserror::Error;

pub type ExecResult<T> = Result<T, ExecError>;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command failed: {program} (exit={code:?}): {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command timed out: {program} after {timeout_secs}s")]
    CommandTimeout { program: String, timeout_secs: u64 },

    #[error("Invalid cluster: {0}")]
    InvalidCluster(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("UTF-8 decode error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

/// One failed pre-flight check, as reported by the validation runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub name: String,
    pub cause: String,
}

impl ValidationFailure {
    pub fn new(name: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cause: cause.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.cause)
    }
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("validation failed ({} of {total}): {}", .failures.len(), join_failures(.failures))]
    ValidationFailed {
        total: usize,
        failures: Vec<ValidationFailure>,
    },

    #[error("bootstrap cluster is already set for this run")]
    BootstrapClusterAlreadySet,

    #[error("workload cluster is already set for this run")]
    WorkloadClusterAlreadySet,

    #[error("bootstrap cluster is not available")]
    BootstrapClusterMissing,

    #[error("workload cluster is not available")]
    WorkloadClusterMissing,
}

impl WorkflowError {
    /// Names of the failed validations, empty for every other variant.
    pub fn failed_validations(&self) -> Vec<&str> {
        match self {
            WorkflowError::ValidationFailed { failures, .. } => {
                failures.iter().map(|f| f.name.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn join_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
