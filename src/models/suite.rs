//! Test suites
//!
//! Test cases come from registered providers; the builder flattens them into
//! one suite without reordering.

use std::fmt;
use std::sync::Arc;

use crate::error::{RunnerError, RunnerResult};
use crate::executor::TestContext;

/// Body of a test. A panic counts as a failure, a returned error as an error.
pub type TestFn = Arc<dyn Fn(&TestContext) -> anyhow::Result<()> + Send + Sync>;

/// A single runnable test
#[derive(Clone)]
pub struct TestCase {
    provider: String,
    name: String,
    body: TestFn,
}

impl TestCase {
    pub fn new(
        provider: impl Into<String>,
        name: impl Into<String>,
        body: impl Fn(&TestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            provider: provider.into(),
            name: name.into(),
            body: Arc::new(body),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `provider::name`
    pub fn id(&self) -> String {
        format!("{}::{}", self.provider, self.name)
    }

    pub fn run(&self, ctx: &TestContext) -> anyhow::Result<()> {
        (self.body)(ctx)
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("provider", &self.provider)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.provider, self.name)
    }
}

/// Source of test cases, the unit callers hand to the runner
pub trait TestSuiteProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Cases in the order they should run
    fn produce_test_cases(&self) -> Vec<TestCase>;
}

/// Flat, ordered collection of test cases
#[derive(Clone, Debug, Default)]
pub struct TestSuite {
    cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tests(&mut self, cases: impl IntoIterator<Item = TestCase>) {
        self.cases.extend(cases);
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl From<TestCase> for TestSuite {
    fn from(case: TestCase) -> Self {
        Self { cases: vec![case] }
    }
}

impl FromIterator<TestCase> for TestSuite {
    fn from_iter<I: IntoIterator<Item = TestCase>>(iter: I) -> Self {
        Self {
            cases: iter.into_iter().collect(),
        }
    }
}

/// Build the suite from providers, keeping provider order and each
/// provider's own case order.
pub fn build_suite(providers: &[Box<dyn TestSuiteProvider>]) -> RunnerResult<TestSuite> {
    if providers.is_empty() {
        return Err(RunnerError::InvalidArgument(
            "No test cases provided.".to_string(),
        ));
    }

    let mut suite = TestSuite::new();
    for provider in providers {
        suite.add_tests(provider.produce_test_cases());
    }
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        name: &'static str,
        tests: &'static [&'static str],
    }

    impl TestSuiteProvider for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn produce_test_cases(&self) -> Vec<TestCase> {
            self.tests
                .iter()
                .map(|t| TestCase::new(self.name, *t, |_| Ok(())))
                .collect()
        }
    }

    #[test]
    fn test_build_preserves_order() {
        let providers: Vec<Box<dyn TestSuiteProvider>> = vec![
            Box::new(Named {
                name: "zeta",
                tests: &["c_last", "a_first", "b_middle"],
            }),
            Box::new(Named {
                name: "alpha",
                tests: &["z", "y"],
            }),
        ];

        let suite = build_suite(&providers).unwrap();
        let ids: Vec<String> = suite.cases().iter().map(TestCase::id).collect();
        assert_eq!(
            ids,
            vec![
                "zeta::c_last",
                "zeta::a_first",
                "zeta::b_middle",
                "alpha::z",
                "alpha::y"
            ]
        );
    }

    #[test]
    fn test_build_keeps_duplicates() {
        let providers: Vec<Box<dyn TestSuiteProvider>> = vec![
            Box::new(Named {
                name: "same",
                tests: &["t"],
            }),
            Box::new(Named {
                name: "same",
                tests: &["t"],
            }),
        ];
        assert_eq!(build_suite(&providers).unwrap().len(), 2);
    }

    #[test]
    fn test_build_empty_is_invalid() {
        let err = build_suite(&[]).unwrap_err();
        assert!(matches!(err, RunnerError::InvalidArgument(_)));
    }

    #[test]
    fn test_single_case_suite() {
        let suite = TestSuite::from(TestCase::new("p", "one", |_| Ok(())));
        assert_eq!(suite.len(), 1);
        assert_eq!(suite.cases()[0].to_string(), "p::one");
    }
}
