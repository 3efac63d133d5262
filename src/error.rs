//! Runner error types
//!
//! Typed failures raised by the binding, journal, suite and coordinator layers.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up or running a test suite
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unresolved variable ${0}")]
    UnresolvedVariable(String),

    #[error("TestRunner not yet instantiated")]
    RunnerNotInitialized,

    /// `--help` or `--version` was requested; holds the rendered text
    #[error("{0}")]
    HelpRequested(String),

    #[error("Flag '{0}' is registered more than once")]
    DuplicateFlag(String),

    #[error("Invalid logging configuration: {0}")]
    InvalidLogConfig(String),

    #[error("Journal {} is already terminated", .0.display())]
    JournalTerminated(PathBuf),

    #[error("No reporting journal has been started")]
    JournalNotStarted,

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RunnerError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for the leaf layers
pub type RunnerResult<T> = std::result::Result<T, RunnerError>;
