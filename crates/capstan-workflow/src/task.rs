use anyhow::Result;

/// One stage of a workflow. Tasks are values of a workflow-specific enum: running a task
/// mutates the context and returns the next task, or `None` to end the chain.
///
/// Transition knowledge lives entirely in the tasks, so the runner below can host any
/// workflow (create, delete, upgrade) unchanged.
pub trait Task<C>: Sized {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &mut C) -> Option<Self>;
}

/// What the runner needs from an execution context.
pub trait WorkflowContext {
    fn set_current(&mut self, task: &'static str);
    fn mark_completed(&mut self, task: &'static str);
    fn has_error(&self) -> bool;
    /// Move the first captured error out of the context.
    fn take_original_error(&mut self) -> Option<anyhow::Error>;
    /// Best-effort diagnostic log collection after a failed run.
    fn collect_diagnostics(&mut self) -> Result<()>;
}

pub struct TaskRunner<T> {
    initial: T,
}

impl<T> TaskRunner<T> {
    pub fn new(initial: T) -> Self {
        Self { initial }
    }

    /// Run the chain to its terminal task and return the run's original error, if any.
    ///
    /// Tasks run strictly one after another on the calling thread. Timeouts and retries belong
    /// to the collaborators the tasks call.
    pub fn run<C>(self, ctx: &mut C) -> Result<()>
    where
        T: Task<C>,
        C: WorkflowContext,
    {
        let mut current = Some(self.initial);
        while let Some(task) = current {
            let name = task.name();
            log::debug!("Task start: {}", name);
            ctx.set_current(name);

            current = task.run(ctx);

            ctx.mark_completed(name);
            log::debug!(
                "Task finished: {} -> {}",
                name,
                current.as_ref().map(|next| next.name()).unwrap_or("<end>")
            );
        }

        if ctx.has_error() {
            // Never let a log-collection failure mask the original error.
            if let Err(err) = ctx.collect_diagnostics() {
                log::warn!("Failed to collect diagnostic logs: {:#}", err);
            }
        }

        match ctx.take_original_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[derive(Debug, Default)]
    struct TestContext {
        current: Option<&'static str>,
        completed: Vec<&'static str>,
        error: Option<anyhow::Error>,
        fail_at: Option<&'static str>,
        diagnostics_calls: usize,
        diagnostics_fail: bool,
    }

    impl WorkflowContext for TestContext {
        fn set_current(&mut self, task: &'static str) {
            self.current = Some(task);
        }

        fn mark_completed(&mut self, task: &'static str) {
            self.completed.push(task);
            self.current = None;
        }

        fn has_error(&self) -> bool {
            self.error.is_some()
        }

        fn take_original_error(&mut self) -> Option<anyhow::Error> {
            self.error.take()
        }

        fn collect_diagnostics(&mut self) -> Result<()> {
            self.diagnostics_calls += 1;
            if self.diagnostics_fail {
                anyhow::bail!("log collection failed");
            }
            Ok(())
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Step {
        First,
        Second,
        Cleanup,
    }

    impl Task<TestContext> for Step {
        fn name(&self) -> &'static str {
            match self {
                Step::First => "first",
                Step::Second => "second",
                Step::Cleanup => "cleanup",
            }
        }

        fn run(&self, ctx: &mut TestContext) -> Option<Self> {
            assert_eq!(ctx.current, Some(self.name()));
            if ctx.fail_at == Some(self.name()) && ctx.error.is_none() {
                ctx.error = Some(anyhow!("{} failed", self.name()));
                return match self {
                    Step::First => None,
                    _ => Some(Step::Cleanup),
                };
            }
            match self {
                Step::First => Some(Step::Second),
                Step::Second => Some(Step::Cleanup),
                Step::Cleanup => None,
            }
        }
    }

    #[test]
    fn runner_follows_successors_until_none() {
        let mut ctx = TestContext::default();
        TaskRunner::new(Step::First).run(&mut ctx).unwrap();
        assert_eq!(ctx.completed, vec!["first", "second", "cleanup"]);
        assert_eq!(ctx.diagnostics_calls, 0);
        assert!(ctx.current.is_none());
    }

    #[test]
    fn runner_returns_original_error_and_collects_diagnostics() {
        let mut ctx = TestContext {
            fail_at: Some("second"),
            ..Default::default()
        };
        let err = TaskRunner::new(Step::First).run(&mut ctx).unwrap_err();
        assert_eq!(err.to_string(), "second failed");
        assert_eq!(ctx.completed, vec!["first", "second", "cleanup"]);
        assert_eq!(ctx.diagnostics_calls, 1);
    }

    #[test]
    fn diagnostics_failure_does_not_mask_error() {
        let mut ctx = TestContext {
            fail_at: Some("first"),
            diagnostics_fail: true,
            ..Default::default()
        };
        let err = TaskRunner::new(Step::First).run(&mut ctx).unwrap_err();
        assert_eq!(err.to_string(), "first failed");
        assert_eq!(ctx.completed, vec!["first"]);
    }

    #[test]
    fn runner_can_start_mid_chain() {
        let mut ctx = TestContext::default();
        TaskRunner::new(Step::Cleanup).run(&mut ctx).unwrap();
        assert_eq!(ctx.completed, vec!["cleanup"]);
    }
}
