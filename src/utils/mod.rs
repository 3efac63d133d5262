//! Utility modules
//!
//! Logging setup and run timing.

pub mod logger;
pub mod timer;

pub use logger::{
    init_logger, install_logging, LogLevel, LoggingConfig, LoggingSetup, DEFAULT_LOG_CONFIG,
};
pub use timer::{PhaseTimer, Timer};
