//! journal-runner - journal-backed test execution coordinator
//!
//! Runs suites of tests assembled from independent providers, with:
//!
//! - Run-wide bindings resolved from command-line flags, extensible by the
//!   embedding program
//! - Logging configured from a `$KEY`-substituted template
//! - A reporting journal that tests append structured snapshots to
//! - Scenario state built once per run and shared across tests
//! - An HTML report rendered from the journal after the run
//!
//! ## Usage
//!
//! ```no_run
//! use journal_runner::executor::{RunnerContext, TestRunner};
//! use journal_runner::models::{TestCase, TestSuiteProvider};
//!
//! struct Smoke;
//!
//! impl TestSuiteProvider for Smoke {
//!     fn name(&self) -> &str {
//!         "smoke"
//!     }
//!
//!     fn produce_test_cases(&self) -> Vec<TestCase> {
//!         vec![TestCase::new("smoke", "alive", |_| Ok(()))]
//!     }
//! }
//!
//! let providers: Vec<Box<dyn TestSuiteProvider>> = vec![Box::new(Smoke)];
//! let failures = TestRunner::main(RunnerContext::new(), None, vec![], None, &providers)?;
//! std::process::exit(failures.min(255) as i32);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod journal;
pub mod models;
pub mod results;
pub mod utils;

pub use error::{RunnerError, RunnerResult};
pub use executor::{RunnerContext, SharedScenario, TestContext, TestRunner};
pub use journal::{JsonSnapshot, Snapshot};
pub use models::{TestCase, TestSuiteProvider};
