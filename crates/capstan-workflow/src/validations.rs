//! Pre-flight validation runner.
//!
//! Every registered validation runs (no short-circuit) and all failures are reported together.
//! Checks are independent, so they run concurrently on scoped threads; `run` returns only after
//! all of them finished.

use anyhow::anyhow;
use capstan_error::{ValidationFailure, WorkflowError};
use std::thread;

type Check<'a> = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'a>;

/// A named, deferred pre-flight check.
pub struct Validation<'a> {
    name: String,
    check: Check<'a>,
}

impl<'a> Validation<'a> {
    pub fn new(
        name: impl Into<String>,
        check: impl FnOnce() -> anyhow::Result<()> + Send + 'a,
    ) -> Self {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(self) -> ValidationResult {
        let err = (self.check)().err();
        ValidationResult {
            name: self.name,
            err,
        }
    }
}

impl std::fmt::Debug for Validation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validation").field("name", &self.name).finish()
    }
}

#[derive(Debug)]
pub struct ValidationResult {
    pub name: String,
    pub err: Option<anyhow::Error>,
}

impl ValidationResult {
    pub fn passed(&self) -> bool {
        self.err.is_none()
    }
}

#[derive(Debug, Default)]
pub struct Runner<'a> {
    validations: Vec<Validation<'a>>,
}

impl<'a> Runner<'a> {
    pub fn new() -> Self {
        Self {
            validations: Vec::new(),
        }
    }

    pub fn register(&mut self, validations: impl IntoIterator<Item = Validation<'a>>) {
        self.validations.extend(validations);
    }

    pub fn len(&self) -> usize {
        self.validations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validations.is_empty()
    }

    /// Run every validation; results come back in registration order.
    pub fn run_all(self) -> Vec<ValidationResult> {
        thread::scope(|scope| {
            let handles: Vec<_> = self
                .validations
                .into_iter()
                .map(|validation| {
                    let name = validation.name.clone();
                    (name, scope.spawn(move || validation.run()))
                })
                .collect();

            handles
                .into_iter()
                .map(|(name, handle)| {
                    handle.join().unwrap_or_else(|_| ValidationResult {
                        name,
                        err: Some(anyhow!("validation panicked")),
                    })
                })
                .collect()
        })
    }

    /// Run every validation and fold the outcome into a single error naming each failure.
    pub fn run(self) -> Result<(), WorkflowError> {
        let total = self.len();
        let mut failures = Vec::new();
        for result in self.run_all() {
            match result.err {
                None => log::info!("✅ {}", result.name),
                Some(err) => {
                    log::warn!("❌ {}: {:#}", result.name, err);
                    failures.push(ValidationFailure::new(result.name, format!("{:#}", err)));
                }
            }
        }
        if failures.is_empty() {
            return Ok(());
        }
        Err(WorkflowError::ValidationFailed { total, failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    fn passing(name: &str) -> Validation<'static> {
        Validation::new(name, || Ok(()))
    }

    fn failing(name: &str, msg: &'static str) -> Validation<'static> {
        Validation::new(name, move || Err(anyhow!(msg)))
    }

    #[test]
    fn all_passing_returns_ok() {
        let mut runner = Runner::new();
        runner.register([passing("a"), passing("b"), passing("c")]);
        assert_eq!(runner.len(), 3);
        runner.run().unwrap();
    }

    #[test]
    fn empty_runner_passes() {
        assert!(Runner::new().run().is_ok());
    }

    #[test]
    fn names_exactly_the_failing_validations() {
        let mut runner = Runner::new();
        runner.register([
            failing("provider", "invalid template"),
            passing("network"),
            failing("gitops", "repository missing"),
            passing("binaries"),
        ]);
        let err = runner.run().unwrap_err();
        assert_eq!(err.failed_validations(), vec!["provider", "gitops"]);
        match err {
            WorkflowError::ValidationFailed { total, failures } => {
                assert_eq!(total, 4);
                assert_eq!(failures[0].cause, "invalid template");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn outcome_does_not_depend_on_registration_order() {
        let names = |order: &[usize]| {
            let all = [
                ("a", true),
                ("b", false),
                ("c", true),
                ("d", false),
            ];
            let mut runner = Runner::new();
            runner.register(order.iter().map(|&i| {
                let (name, ok) = all[i];
                if ok {
                    passing(name)
                } else {
                    failing(name, "nope")
                }
            }));
            let err = runner.run().unwrap_err();
            let mut failed: Vec<String> = err
                .failed_validations()
                .into_iter()
                .map(String::from)
                .collect();
            failed.sort();
            failed
        };
        assert_eq!(names(&[0, 1, 2, 3]), vec!["b", "d"]);
        assert_eq!(names(&[3, 2, 1, 0]), vec!["b", "d"]);
        assert_eq!(names(&[1, 3, 0, 2]), vec!["b", "d"]);
    }

    #[test]
    fn every_validation_runs_even_after_failures() {
        let ran = AtomicUsize::new(0);
        let mut runner = Runner::new();
        for i in 0..5 {
            let ran = &ran;
            runner.register([Validation::new(format!("check-{i}"), move || {
                ran.fetch_add(1, Ordering::SeqCst);
                if i % 2 == 0 {
                    anyhow::bail!("check {i} failed");
                }
                Ok(())
            })]);
        }
        let err = runner.run().unwrap_err();
        assert_eq!(ran.load(Ordering::SeqCst), 5);
        assert_eq!(err.failed_validations(), vec!["check-0", "check-2", "check-4"]);
    }

    #[test]
    fn validations_run_concurrently() {
        // Each check waits for all others; this only completes if they run at the same time.
        let barrier = Barrier::new(3);
        let mut runner = Runner::new();
        for i in 0..3 {
            let barrier = &barrier;
            runner.register([Validation::new(format!("v{i}"), move || {
                barrier.wait();
                Ok(())
            })]);
        }
        runner.run().unwrap();
    }

    #[test]
    fn panicking_validation_is_reported_as_failure() {
        let mut runner = Runner::new();
        runner.register([
            passing("fine"),
            Validation::new("explodes", || panic!("boom")),
        ]);
        let err = runner.run().unwrap_err();
        assert_eq!(err.failed_validations(), vec!["explodes"]);
        assert!(err.to_string().contains("validation panicked"));
    }
}
