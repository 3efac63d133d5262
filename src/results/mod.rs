//! Report generation
//!
//! The HTML report is produced by a separate process (`journal-report`) run
//! against the finished journal, keeping the runner decoupled from the
//! renderer.

mod report;

pub use report::{html_path_for, render_journal_html, write_html_report, write_index};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Name of the report generator binary shipped with this crate
pub const REPORT_BINARY: &str = "journal-report";

/// External command that turns a journal into HTML
#[derive(Clone, Debug)]
pub struct ReportCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ReportCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Extra argument placed before `--noindex <journal>`
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `journal-report` next to the current executable, else from `PATH`
    pub fn default_generator() -> Self {
        let sibling = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(REPORT_BINARY)))
            .filter(|path| path.exists());

        Self::new(sibling.unwrap_or_else(|| PathBuf::from(REPORT_BINARY)))
    }

    /// Full command line for `journal`, for logging
    pub fn command_line(&self, journal: &Path) -> Vec<String> {
        let mut line = vec![self.program.display().to_string()];
        line.extend(self.args.iter().cloned());
        line.push("--noindex".to_string());
        line.push(journal.display().to_string());
        line
    }

    /// Run synchronously and wait for completion
    pub fn run(&self, journal: &Path) -> Result<ExitStatus> {
        Command::new(&self.program)
            .args(&self.args)
            .arg("--noindex")
            .arg(journal)
            .status()
            .with_context(|| format!("Failed to start {}", self.program.display()))
    }
}

impl Default for ReportCommand {
    fn default() -> Self {
        Self::default_generator()
    }
}
