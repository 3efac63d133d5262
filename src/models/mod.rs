//! Data models for test execution
//!
//! Test cases, suites, providers and results.

mod suite;
mod test_result;

pub use suite::{build_suite, TestCase, TestFn, TestSuite, TestSuiteProvider};
pub use test_result::{RunResult, TestOutcome, TestStatus};
