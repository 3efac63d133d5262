//! Parallel test execution
//!
//! Runs the cases of a suite concurrently on a tokio worker pool. Results
//! keep suite order regardless of completion order.

use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::context::TestContext;
use super::engine::{execute_case, ExecutionEngine};
use crate::models::{RunResult, TestOutcome, TestSuite};
use crate::utils::Timer;

/// Parallel execution engine
pub struct ParallelEngine {
    max_concurrent: usize,
}

impl ParallelEngine {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    async fn run_cases(&self, suite: &TestSuite, ctx: &TestContext) -> Vec<TestOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::new();

        for case in suite.cases().iter().cloned() {
            let semaphore = semaphore.clone();
            let ctx = ctx.clone();
            let id = case.id();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                debug!("Starting parallel execution of {}", case);
                tokio::task::spawn_blocking(move || execute_case(&case, &ctx)).await
            });
            handles.push((id, handle));
        }

        let (ids, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        join_all(handles)
            .await
            .into_iter()
            .zip(ids)
            .map(|(joined, id)| match joined {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) | Err(e) => TestOutcome::error(id, 0, format!("worker failed: {e}")),
            })
            .collect()
    }

    fn block_on_cases(&self, suite: &TestSuite, ctx: &TestContext) -> Result<Vec<TestOutcome>> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.max_concurrent)
            .enable_all()
            .build()
            .context("Failed to start worker runtime")?;

        Ok(runtime.block_on(self.run_cases(suite, ctx)))
    }
}

impl ExecutionEngine for ParallelEngine {
    /// Safe to call from inside a tokio runtime: the worker runtime is then
    /// driven from a separate thread, since runtimes cannot nest.
    fn run(&self, suite: &TestSuite, ctx: &TestContext) -> Result<RunResult> {
        info!(
            "Running {} tests with up to {} in parallel",
            suite.len(),
            self.max_concurrent
        );

        let timer = Timer::start();
        let outcomes = if Handle::try_current().is_ok() {
            debug!("Already inside a runtime; running workers on a separate thread");
            std::thread::scope(|scope| scope.spawn(|| self.block_on_cases(suite, ctx)).join())
                .map_err(|_| anyhow!("worker runtime thread panicked"))??
        } else {
            self.block_on_cases(suite, ctx)?
        };

        let mut result = RunResult::new();
        for outcome in outcomes {
            info!("  {}", outcome);
            result.record(outcome);
        }
        result.duration_ms = timer.elapsed_ms();
        Ok(result)
    }
}
