//! Test execution runner
//!
//! The [`TestRunner`] sets up and tears down the run-wide environment and
//! delegates the actual running of tests to an injected
//! [`ExecutionEngine`]. It resolves the bindings from the command line,
//! configures logging from a template, keeps the reporting journal and
//! finally asks an external process to render the journal as HTML.
//!
//! Where effects are not meant to be shared, a test either undoes them
//! itself or a provider contributes a test that undoes them and runs first.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::context::{RunState, RunnerContext, TestContext};
use super::engine::{ExecutionEngine, SequentialEngine};
use crate::config::{
    parse_options, resolve, substitute, Bindings, DefaultBindingOverrides, ParsedOptions,
    ParserInit,
};
use crate::error::{RunnerError, RunnerResult};
use crate::journal::{Journal, Snapshot};
use crate::models::{build_suite, RunResult, TestSuite, TestSuiteProvider};
use crate::results::{html_path_for, ReportCommand};
use crate::utils::{install_logging, LoggingConfig, PhaseTimer, DEFAULT_LOG_CONFIG};

/// Runs cleanup when `run` leaves, on every path including unwinding
struct CleanupGuard<'a> {
    state: &'a RunState,
    completed: bool,
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            eprintln!("Terminated early due to an exception");
        }
        cleanup(self.state);
    }
}

fn cleanup(state: &RunState) {
    if let Some(journal) = state.journal() {
        if let Err(e) = journal.flush() {
            error!("Failed to flush journal: {}", e);
        }
    }
    debug!("Cleaned up run context");
}

/// Journal-backed test execution coordinator
pub struct TestRunner {
    ctx: Arc<RunnerContext>,
    state: Arc<RunState>,
    delegate: Box<dyn ExecutionEngine>,
    args: Vec<OsString>,
    parser_inits: Vec<ParserInit>,
    default_binding_overrides: DefaultBindingOverrides,
    report_command: Option<ReportCommand>,
    install_subscriber: bool,
    phases: PhaseTimer,
}

impl TestRunner {
    /// Create a runner and make it the context's current one
    pub fn new(ctx: Arc<RunnerContext>, delegate: Option<Box<dyn ExecutionEngine>>) -> Self {
        let state = Arc::new(RunState::new());
        ctx.register(state.clone());

        Self {
            ctx,
            state,
            delegate: delegate.unwrap_or_else(|| Box::new(SequentialEngine::new(2))),
            args: std::env::args_os().collect(),
            parser_inits: Vec::new(),
            default_binding_overrides: DefaultBindingOverrides::new(),
            report_command: None,
            install_subscriber: true,
            phases: PhaseTimer::new(),
        }
    }

    /// Entry point: build a runner, apply the inits and overrides, then run
    /// `test_case_list`. Returns the number of failures plus errors.
    pub fn main(
        ctx: Arc<RunnerContext>,
        delegate: Option<Box<dyn ExecutionEngine>>,
        parser_inits: Vec<ParserInit>,
        default_binding_overrides: Option<DefaultBindingOverrides>,
        test_case_list: &[Box<dyn TestSuiteProvider>],
    ) -> Result<usize> {
        TestRunner::new(ctx, delegate).run_main(
            parser_inits,
            default_binding_overrides,
            test_case_list,
        )
    }

    /// [`TestRunner::main`] for a runner already set up through the builder
    /// knobs, e.g. with explicit arguments
    pub fn run_main(
        mut self,
        parser_inits: Vec<ParserInit>,
        default_binding_overrides: Option<DefaultBindingOverrides>,
        test_case_list: &[Box<dyn TestSuiteProvider>],
    ) -> Result<usize> {
        self.set_default_binding_overrides(default_binding_overrides);
        self.set_parser_inits(parser_inits);
        self.do_main(test_case_list)
    }

    /// Command line to parse instead of the process arguments
    pub fn with_args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_report_command(mut self, command: ReportCommand) -> Self {
        self.report_command = Some(command);
        self
    }

    /// Whether `start_logging` installs the process-wide subscriber
    pub fn with_global_subscriber(mut self, install: bool) -> Self {
        self.install_subscriber = install;
        self
    }

    pub fn set_default_binding_overrides(&mut self, overrides: Option<DefaultBindingOverrides>) {
        self.default_binding_overrides = overrides.unwrap_or_default();
    }

    pub fn set_parser_inits(&mut self, inits: Vec<ParserInit>) {
        self.parser_inits = inits;
    }

    /// Options from the last parse, for values not promoted to bindings
    pub fn options(&self) -> Option<ParsedOptions> {
        self.state.options()
    }

    pub fn bindings(&self) -> Bindings {
        self.state.bindings()
    }

    /// Inject a hard-coded binding
    pub fn set_binding(&self, key: &str, value: impl Into<String>) {
        self.state.set_binding(key, value);
    }

    pub fn default_binding_overrides(&self) -> &DefaultBindingOverrides {
        &self.default_binding_overrides
    }

    pub fn journal(&self) -> Option<Arc<Journal>> {
        self.state.journal()
    }

    pub fn context(&self) -> &Arc<RunnerContext> {
        &self.ctx
    }

    /// Build the suite, run it and finish the journal and report
    pub fn do_main(&mut self, test_case_list: &[Box<dyn TestSuiteProvider>]) -> Result<usize> {
        info!("Building test suite");
        let suite = build_suite(test_case_list)?;

        info!("Finished Setup. Start Tests\n---------------------------");
        let outcome = self.run(suite);

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                self.finish_report_journal();
                if let Some(RunnerError::HelpRequested(text)) = e.downcast_ref::<RunnerError>() {
                    print!("{text}");
                    return Ok(0);
                }
                return Err(e);
            }
        };
        self.phases.finish("tests");

        if let Some(journal) = self.state.journal() {
            self.ctx.journals().unset_global(&journal);
            if let Err(e) = journal.terminate() {
                error!("Failed to close journal {}: {}", journal.path().display(), e);
            }
            self.generate_report(journal.path().to_path_buf());
            self.phases.finish("report");
        }

        debug!("Run phases:\n{}", self.phases.format());
        Ok(result.exit_code())
    }

    fn generate_report(&self, journal_path: PathBuf) {
        let command = self
            .report_command
            .clone()
            .unwrap_or_else(ReportCommand::default_generator);

        info!("Running {}", command.command_line(&journal_path).join(" "));
        match command.run(&journal_path) {
            Ok(status) if status.success() => {
                println!("Wrote {}", html_path_for(&journal_path).display());
            }
            Ok(status) => {
                error!(
                    "Could not write {} ({})",
                    html_path_for(&journal_path).display(),
                    status
                );
            }
            Err(e) => {
                error!(
                    "Could not write {}: {:#}",
                    html_path_for(&journal_path).display(),
                    e
                );
            }
        }
    }

    /// Prepare the run context, delegate, and always clean up afterwards
    pub fn run(&mut self, suite: impl Into<TestSuite>) -> Result<RunResult> {
        let suite = suite.into();
        self.prepare()?;
        self.phases.finish("setup");

        info!("Running tests");
        let test_ctx = TestContext::new(self.ctx.clone(), self.state.clone());

        let mut guard = CleanupGuard {
            state: &self.state,
            completed: false,
        };
        let result = self.delegate.run(&suite, &test_ctx);
        guard.completed = result.is_ok();
        drop(guard);

        result
    }

    /// Resolve the bindings from the command line and start logging
    fn prepare(&mut self) -> Result<()> {
        let options = parse_options(
            &self.args,
            &self.parser_inits,
            &self.default_binding_overrides,
        )?;
        self.state.extend_bindings(resolve(&options));
        self.state.set_options(options);

        self.start_logging().map_err(|e| {
            eprintln!("ERROR setting up logging: {e:#}");
            e
        })
    }

    /// Configure logging from `LOG_CONFIG` (or the built-in template) and
    /// start the reporting journal
    fn start_logging(&self) -> Result<()> {
        let bindings = self.state.bindings();

        let text = match bindings.get("LOG_CONFIG").filter(|path| !path.is_empty()) {
            Some(path) => fs::read_to_string(path)
                .map_err(|e| RunnerError::io(path, e))
                .with_context(|| format!("ERROR reading LOG_CONFIG from {path}"))?,
            None => DEFAULT_LOG_CONFIG.to_string(),
        };

        let config = LoggingConfig::parse(&substitute(&text, &bindings)?)?;
        let setup = install_logging(&config, self.ctx.journals(), self.install_subscriber)?;
        debug!(
            "Logging to {:?} (global subscriber installed: {})",
            setup.log_files, setup.installed
        );

        let journal = match self.ctx.journals().get_global() {
            Some(journal) => journal,
            None => {
                let path = PathBuf::from(bindings.get_or("LOG_DIR", "."))
                    .join(format!("{}.journal", bindings.get_or("LOG_FILEBASE", "debug")));
                self.ctx
                    .journals()
                    .new_global_journal_with_path(path)?
            }
        };
        self.state.set_journal(journal);
        Ok(())
    }

    /// Store `obj` in the reporting journal
    pub fn report(&self, obj: &dyn Snapshot) -> RunnerResult<u64> {
        self.state.report(obj)
    }

    /// Close the reporting journal. Safe to call more than once.
    pub fn finish_report_journal(&self) {
        let Some(journal) = self.state.take_journal() else {
            return;
        };
        self.ctx.journals().unset_global(&journal);
        if let Err(e) = journal.terminate() {
            error!("Failed to close journal {}: {}", journal.path().display(), e);
        }
    }
}
