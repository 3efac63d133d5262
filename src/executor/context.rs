//! Run context
//!
//! Explicit context objects standing in for process-wide singletons. A
//! [`RunnerContext`] is created once per process (or per test) and passed to
//! every runner; constructing a runner makes it the context's current one.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::shared::{SharedRegistry, SharedScenario};
use crate::config::{Bindings, ParsedOptions};
use crate::error::{RunnerError, RunnerResult};
use crate::journal::{Journal, JournalRegistry, Snapshot};

/// Mutable state of one runner, shared with the tests it runs
#[derive(Debug, Default)]
pub struct RunState {
    bindings: RwLock<Bindings>,
    options: RwLock<Option<ParsedOptions>>,
    journal: Mutex<Option<Arc<Journal>>>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bindings(&self) -> Bindings {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_binding(&self, key: &str, value: impl Into<String>) {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    pub(crate) fn extend_bindings(&self, other: Bindings) {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(other);
    }

    pub fn options(&self) -> Option<ParsedOptions> {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_options(&self, options: ParsedOptions) {
        *self.options.write().unwrap_or_else(PoisonError::into_inner) = Some(options);
    }

    pub fn journal(&self) -> Option<Arc<Journal>> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_journal(&self, journal: Arc<Journal>) {
        *self.journal.lock().unwrap_or_else(PoisonError::into_inner) = Some(journal);
    }

    pub(crate) fn take_journal(&self) -> Option<Arc<Journal>> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Store `obj` in this runner's journal
    pub fn report(&self, obj: &dyn Snapshot) -> RunnerResult<u64> {
        let journal = self.journal().ok_or(RunnerError::JournalNotStarted)?;
        journal.store(obj)
    }
}

/// Context holder for the current runner, the active journal and the
/// shared scenario instances
#[derive(Debug, Default)]
pub struct RunnerContext {
    current: RwLock<Option<Arc<RunState>>>,
    journals: Arc<JournalRegistry>,
    shared: SharedRegistry,
}

impl RunnerContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn journals(&self) -> &Arc<JournalRegistry> {
        &self.journals
    }

    pub fn shared(&self) -> &SharedRegistry {
        &self.shared
    }

    /// Make `state` the current runner; the last registration wins
    pub(crate) fn register(&self, state: Arc<RunState>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(state);
    }

    /// The current runner's state
    pub fn global_runner(&self) -> RunnerResult<Arc<RunState>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(RunnerError::RunnerNotInitialized)
    }

    /// Shared instance of `T`, built from the current runner's bindings on
    /// first use and reused afterwards
    pub fn get_shared<T: SharedScenario>(&self) -> anyhow::Result<Arc<T>> {
        self.shared.get_or_create(|| {
            let runner = self.global_runner()?;
            T::from_bindings(&runner.bindings())
        })
    }
}

/// What a running test can reach: bindings, the journal and shared data
#[derive(Clone, Debug)]
pub struct TestContext {
    ctx: Arc<RunnerContext>,
    state: Arc<RunState>,
}

impl TestContext {
    pub fn new(ctx: Arc<RunnerContext>, state: Arc<RunState>) -> Self {
        Self { ctx, state }
    }

    pub fn bindings(&self) -> Bindings {
        self.state.bindings()
    }

    /// Lookup one binding
    pub fn binding(&self, key: &str) -> Option<String> {
        self.state.bindings().get(key).map(str::to_string)
    }

    pub fn report(&self, obj: &dyn Snapshot) -> RunnerResult<u64> {
        self.state.report(obj)
    }

    pub fn get_shared<T: SharedScenario>(&self) -> anyhow::Result<Arc<T>> {
        self.ctx.get_shared::<T>()
    }

    pub fn runner_context(&self) -> &Arc<RunnerContext> {
        &self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JsonSnapshot;
    use serde_json::json;
    use tempfile::tempdir;

    #[derive(Debug)]
    struct Endpoint {
        url: String,
    }

    impl SharedScenario for Endpoint {
        fn from_bindings(bindings: &Bindings) -> anyhow::Result<Self> {
            Ok(Self {
                url: bindings.get_or("URL", "none").to_string(),
            })
        }
    }

    #[test]
    fn test_shared_requires_runner() {
        let ctx = RunnerContext::new();
        let err = ctx.get_shared::<Endpoint>().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::RunnerNotInitialized)
        ));
    }

    #[test]
    fn test_shared_built_from_current_bindings() {
        let ctx = RunnerContext::new();
        let state = Arc::new(RunState::new());
        state.set_binding("url", "http://first");
        ctx.register(state.clone());

        let endpoint = ctx.get_shared::<Endpoint>().unwrap();
        assert_eq!(endpoint.url, "http://first");

        // later binding changes are not seen by the existing instance
        state.set_binding("URL", "http://second");
        assert_eq!(ctx.get_shared::<Endpoint>().unwrap().url, "http://first");
    }

    #[test]
    fn test_last_registration_wins() {
        let ctx = RunnerContext::new();
        let first = Arc::new(RunState::new());
        let second = Arc::new(RunState::new());
        ctx.register(first);
        ctx.register(second.clone());
        assert!(Arc::ptr_eq(&ctx.global_runner().unwrap(), &second));
    }

    #[test]
    fn test_report_without_journal() {
        let state = RunState::new();
        let err = state.report(&JsonSnapshot::new("x", json!(1))).unwrap_err();
        assert!(matches!(err, RunnerError::JournalNotStarted));
    }

    #[test]
    fn test_context_report_goes_to_journal() {
        let dir = tempdir().unwrap();
        let ctx = RunnerContext::new();
        let state = Arc::new(RunState::new());
        let journal = ctx
            .journals()
            .new_global_journal_with_path(dir.path().join("t.journal"))
            .unwrap();
        state.set_journal(journal.clone());

        let test_ctx = TestContext::new(ctx, state);
        assert_eq!(test_ctx.report(&JsonSnapshot::new("x", json!(1))).unwrap(), 0);
        assert_eq!(journal.record_count(), 1);
    }
}
