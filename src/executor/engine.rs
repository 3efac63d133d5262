//! Execution engines
//!
//! The runner delegates the actual running of a suite to an
//! [`ExecutionEngine`]. [`SequentialEngine`] is the default.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, info};

use super::context::TestContext;
use crate::models::{RunResult, TestCase, TestOutcome, TestStatus, TestSuite};
use crate::utils::Timer;

/// Runs every case of a suite and reports pass/fail
pub trait ExecutionEngine: Send + Sync {
    fn run(&self, suite: &TestSuite, ctx: &TestContext) -> anyhow::Result<RunResult>;
}

/// Run one case, turning panics into failures and returned errors into errors
pub fn execute_case(case: &TestCase, ctx: &TestContext) -> TestOutcome {
    let timer = Timer::start();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| case.run(ctx)));
    let elapsed = timer.elapsed_ms();

    match outcome {
        Ok(Ok(())) => TestOutcome::pass(case.id(), elapsed),
        Ok(Err(e)) => {
            error!("Test {} raised an error: {:#}", case, e);
            TestOutcome::error(case.id(), elapsed, format!("{e:#}"))
        }
        Err(payload) => TestOutcome::fail(case.id(), elapsed, panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "test panicked".to_string()
    }
}

/// Runs cases one after another, writing progress to stderr.
///
/// Verbosity 0 is silent, 1 prints one character per test, 2 prints one
/// line per test.
pub struct SequentialEngine {
    verbosity: u8,
}

impl SequentialEngine {
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }

    fn progress(&self, case: &TestCase, outcome: &TestOutcome) {
        let mut stderr = std::io::stderr().lock();
        let _ = match self.verbosity {
            0 => Ok(()),
            1 => write!(
                stderr,
                "{}",
                match outcome.status {
                    TestStatus::Pass => ".",
                    TestStatus::Fail => "F",
                    TestStatus::Error => "E",
                }
            ),
            _ => writeln!(stderr, "{} ... {}", case, outcome.status),
        };
    }
}

impl Default for SequentialEngine {
    fn default() -> Self {
        Self::new(2)
    }
}

impl ExecutionEngine for SequentialEngine {
    fn run(&self, suite: &TestSuite, ctx: &TestContext) -> anyhow::Result<RunResult> {
        let timer = Timer::start();
        let mut result = RunResult::new();

        for case in suite.cases() {
            let outcome = execute_case(case, ctx);
            info!("  {}", outcome);
            self.progress(case, &outcome);
            result.record(outcome);
        }

        result.duration_ms = timer.elapsed_ms();
        if self.verbosity > 0 {
            eprintln!("\n{result}");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{RunState, RunnerContext};
    use std::sync::Arc;

    fn context() -> TestContext {
        TestContext::new(RunnerContext::new(), Arc::new(RunState::new()))
    }

    #[test]
    fn test_execute_case_statuses() {
        let ctx = context();

        let pass = TestCase::new("p", "pass", |_| Ok(()));
        let fail = TestCase::new("p", "fail", |_| {
            assert_eq!(1 + 1, 3, "arithmetic is broken");
            Ok(())
        });
        let error = TestCase::new("p", "error", |_| Err(anyhow::anyhow!("backend unavailable")));

        assert_eq!(execute_case(&pass, &ctx).status, TestStatus::Pass);

        let failed = execute_case(&fail, &ctx);
        assert_eq!(failed.status, TestStatus::Fail);
        assert!(failed.message.unwrap().contains("arithmetic is broken"));

        let errored = execute_case(&error, &ctx);
        assert_eq!(errored.status, TestStatus::Error);
        assert_eq!(errored.message.as_deref(), Some("backend unavailable"));
    }

    #[test]
    fn test_sequential_engine_runs_in_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let suite: TestSuite = ["b", "a", "c"]
            .into_iter()
            .map(|name| {
                let order = order.clone();
                TestCase::new("seq", name, move |_| {
                    order.lock().unwrap().push(name);
                    Ok(())
                })
            })
            .collect();

        let result = SequentialEngine::new(0).run(&suite, &context()).unwrap();
        assert_eq!(result.tests_run, 3);
        assert!(result.was_successful());
        assert_eq!(*order.lock().unwrap(), vec!["b", "a", "c"]);
    }
}
