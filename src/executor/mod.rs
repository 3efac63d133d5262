//! Test execution
//!
//! [`TestRunner`] prepares the run context and hands the suite to an
//! [`ExecutionEngine`], either sequential or parallel.

mod context;
mod engine;
mod parallel;
mod runner;
mod shared;

pub use context::{RunState, RunnerContext, TestContext};
pub use engine::{execute_case, ExecutionEngine, SequentialEngine};
pub use parallel::ParallelEngine;
pub use runner::TestRunner;
pub use shared::{SharedRegistry, SharedScenario};
