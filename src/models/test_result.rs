//! Test result models
//!
//! Outcome of each executed test and the aggregate result an engine returns.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::journal::Snapshot;

/// Test execution status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    /// The test panicked, typically a failed assertion
    Fail,
    /// The test body returned an error
    Error,
}

impl TestStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestStatus::Pass => "✓",
            TestStatus::Fail => "✗",
            TestStatus::Error => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Pass)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "ok"),
            TestStatus::Fail => write!(f, "FAIL"),
            TestStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of a single test execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestOutcome {
    pub test: String,
    pub status: TestStatus,
    pub duration_ms: u64,
    pub message: Option<String>,
}

impl TestOutcome {
    pub fn pass(test: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            test: test.into(),
            status: TestStatus::Pass,
            duration_ms,
            message: None,
        }
    }

    pub fn fail(test: impl Into<String>, duration_ms: u64, message: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            status: TestStatus::Fail,
            duration_ms,
            message: Some(message.into()),
        }
    }

    pub fn error(test: impl Into<String>, duration_ms: u64, message: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            status: TestStatus::Error,
            duration_ms,
            message: Some(message.into()),
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ... {} [{}ms]",
            self.status.symbol(),
            self.test,
            self.status,
            self.duration_ms
        )?;
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

impl Snapshot for TestOutcome {
    fn snapshot_title(&self) -> String {
        self.test.clone()
    }

    fn to_snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Aggregate result of running a suite
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunResult {
    pub tests_run: usize,
    pub passed: Vec<TestOutcome>,
    pub failures: Vec<TestOutcome>,
    pub errors: Vec<TestOutcome>,
    pub duration_ms: u64,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// File an outcome under its status
    pub fn record(&mut self, outcome: TestOutcome) {
        self.tests_run += 1;
        match outcome.status {
            TestStatus::Pass => self.passed.push(outcome),
            TestStatus::Fail => self.failures.push(outcome),
            TestStatus::Error => self.errors.push(outcome),
        }
    }

    /// Process exit code contract: failures plus errors, 0 on full success
    pub fn exit_code(&self) -> usize {
        self.failures.len() + self.errors.len()
    }

    pub fn was_successful(&self) -> bool {
        self.exit_code() == 0
    }
}

impl FromIterator<TestOutcome> for RunResult {
    fn from_iter<I: IntoIterator<Item = TestOutcome>>(iter: I) -> Self {
        let mut result = RunResult::new();
        for outcome in iter {
            result.record(outcome);
        }
        result
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in self.failures.iter().chain(&self.errors) {
            writeln!(f, "{outcome}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "Ran {} tests in {}ms", self.tests_run, self.duration_ms)?;
        if self.was_successful() {
            write!(f, "OK")
        } else {
            write!(
                f,
                "FAILED (failures={}, errors={})",
                self.failures.len(),
                self.errors.len()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_counts_failures_and_errors() {
        let result: RunResult = vec![
            TestOutcome::fail("a", 1, "assertion failed"),
            TestOutcome::fail("b", 1, "assertion failed"),
            TestOutcome::error("c", 1, "connection refused"),
            TestOutcome::pass("d", 1),
        ]
        .into_iter()
        .collect();

        assert_eq!(result.tests_run, 4);
        assert_eq!(result.failures.len(), 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.exit_code(), 3);
        assert!(!result.was_successful());
    }

    #[test]
    fn test_summary_display() {
        let result: RunResult = vec![TestOutcome::pass("only", 5)].into_iter().collect();
        assert!(result.to_string().ends_with("OK"));

        let result: RunResult = vec![TestOutcome::error("x", 0, "boom")].into_iter().collect();
        assert!(result.to_string().contains("FAILED (failures=0, errors=1)"));
    }

    #[test]
    fn test_outcome_snapshot() {
        let outcome = TestOutcome::fail("suite::check", 7, "mismatch");
        assert_eq!(outcome.snapshot_title(), "suite::check");
        assert_eq!(outcome.to_snapshot()["status"], "fail");
    }
}
