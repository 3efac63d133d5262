//! Logging utilities
//!
//! Typed logging configuration (the template a run is configured from) and
//! its installation into `tracing-subscriber`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{RunnerError, RunnerResult};
use crate::journal::{JournalLayer, JournalRegistry};

/// Template used when no `--log_config` is given. `$KEY` references are
/// resolved against the run's bindings before parsing.
pub const DEFAULT_LOG_CONFIG: &str = r#"
version: 1
disable_existing_loggers: true
formatters:
  timestamped:
    datefmt: '%H:%M:%S'
handlers:
  console:
    level: WARNING
    class: console
    formatter: timestamped
  file:
    level: DEBUG
    class: file
    formatter: timestamped
    filename: '$LOG_DIR/$LOG_FILEBASE.log'
    mode: w
  journal:
    level: DEBUG
    class: journal
    path: '$LOG_DIR/$LOG_FILEBASE.journal'
loggers:
  '':
    level: DEBUG
    handlers: [console, file, journal]
"#;

/// Log level configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    #[default]
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn to_level_filter(self) -> LevelFilter {
        LevelFilter::from_level(self.to_tracing_level())
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" | "notset" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" | "critical" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, String> {
        LogLevel::from_str(&value).ok_or_else(|| format!("unknown log level '{value}'"))
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.to_tracing_level().as_str().to_string()
    }
}

/// Timestamp and layout options shared by handlers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormatterConfig {
    #[serde(default = "default_datefmt")]
    pub datefmt: String,

    /// Include the event target in each line
    #[serde(default)]
    pub target: bool,
}

fn default_datefmt() -> String {
    "%H:%M:%S".to_string()
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            datefmt: default_datefmt(),
            target: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Console,
    File,
    Journal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileMode {
    #[default]
    #[serde(rename = "w")]
    Truncate,
    #[serde(rename = "a")]
    Append,
}

/// One output destination
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandlerConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(rename = "class")]
    pub kind: HandlerKind,

    #[serde(default)]
    pub formatter: Option<String>,

    /// Log file for `file` handlers
    #[serde(default)]
    pub filename: Option<String>,

    /// Journal file for `journal` handlers
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub mode: FileMode,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub handlers: Vec<String>,
}

/// Logging configuration parsed from a substituted template
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub disable_existing_loggers: bool,

    #[serde(default)]
    pub formatters: BTreeMap<String, FormatterConfig>,

    pub handlers: BTreeMap<String, HandlerConfig>,

    #[serde(default)]
    pub loggers: BTreeMap<String, LoggerConfig>,
}

fn default_version() -> u32 {
    1
}

impl LoggingConfig {
    /// Parse YAML (or JSON) text and validate it
    pub fn parse(text: &str) -> RunnerResult<Self> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| RunnerError::InvalidLogConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RunnerResult<()> {
        if self.version != 1 {
            return Err(RunnerError::InvalidLogConfig(format!(
                "unsupported version {}",
                self.version
            )));
        }

        for (name, handler) in &self.handlers {
            match handler.kind {
                HandlerKind::File if handler.filename.is_none() => {
                    return Err(RunnerError::InvalidLogConfig(format!(
                        "file handler '{name}' has no filename"
                    )));
                }
                HandlerKind::Journal if handler.path.is_none() => {
                    return Err(RunnerError::InvalidLogConfig(format!(
                        "journal handler '{name}' has no path"
                    )));
                }
                _ => {}
            }
            if let Some(formatter) = &handler.formatter {
                if !self.formatters.contains_key(formatter) {
                    return Err(RunnerError::InvalidLogConfig(format!(
                        "handler '{name}' references unknown formatter '{formatter}'"
                    )));
                }
            }
        }

        if self.journal_path().is_none() {
            return Err(RunnerError::InvalidLogConfig(
                "a journal handler is required".to_string(),
            ));
        }

        for (name, logger) in &self.loggers {
            if let Some(missing) = logger
                .handlers
                .iter()
                .find(|h| !self.handlers.contains_key(h.as_str()))
            {
                return Err(RunnerError::InvalidLogConfig(format!(
                    "logger '{name}' references unknown handler '{missing}'"
                )));
            }
        }

        Ok(())
    }

    /// Root logger, keyed by `""` or `root`
    pub fn root(&self) -> Option<&LoggerConfig> {
        self.loggers.get("").or_else(|| self.loggers.get("root"))
    }

    pub fn journal_path(&self) -> Option<PathBuf> {
        self.handlers
            .values()
            .find(|h| h.kind == HandlerKind::Journal)
            .and_then(|h| h.path.as_deref())
            .map(PathBuf::from)
    }

    /// Handlers the root logger writes to; every handler when there is no root
    fn active_handlers(&self) -> Vec<&HandlerConfig> {
        match self.root() {
            Some(root) => root
                .handlers
                .iter()
                .filter_map(|name| self.handlers.get(name))
                .collect(),
            None => self.handlers.values().collect(),
        }
    }

    fn formatter_for(&self, handler: &HandlerConfig) -> FormatterConfig {
        handler
            .formatter
            .as_ref()
            .and_then(|name| self.formatters.get(name))
            .cloned()
            .unwrap_or_default()
    }
}

/// What installing a logging configuration produced
#[derive(Debug)]
pub struct LoggingSetup {
    /// Log files opened by `file` handlers
    pub log_files: Vec<PathBuf>,
    /// Whether the global subscriber was installed by this call
    pub installed: bool,
}

/// Open the configured destinations and, when `install_subscriber` is set,
/// make them the process-wide `tracing` subscriber.
///
/// The journal named by the `journal` handler becomes the registry's active
/// journal unless another one is already active. It is opened after the log
/// files, so an error leaves the registry untouched.
pub fn install_logging(
    config: &LoggingConfig,
    journals: &Arc<JournalRegistry>,
    install_subscriber: bool,
) -> Result<LoggingSetup> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut log_files = Vec::new();

    for handler in config.active_handlers() {
        let formatter = config.formatter_for(handler);
        let filter = handler.level.to_level_filter();

        match handler.kind {
            HandlerKind::Console => layers.push(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_timer(ChronoLocal::new(formatter.datefmt))
                    .with_target(formatter.target)
                    .compact()
                    .with_filter(filter)
                    .boxed(),
            ),
            HandlerKind::File => {
                let path = PathBuf::from(handler.filename.as_deref().unwrap_or_default());
                let file = open_log_file(&path, handler.mode)?;
                log_files.push(path);
                layers.push(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_timer(ChronoLocal::new(formatter.datefmt))
                        .with_target(formatter.target)
                        .with_filter(filter)
                        .boxed(),
                );
            }
            HandlerKind::Journal => {
                layers.push(JournalLayer::new(journals.clone()).with_filter(filter).boxed())
            }
        }
    }

    // Registered only once every log file is open, so a failed open leaves
    // no journal behind
    if journals.get_global().is_none() {
        if let Some(path) = config.journal_path() {
            journals
                .new_global_journal_with_path(&path)
                .with_context(|| format!("Failed to open journal {}", path.display()))?;
        }
    }

    let root_level = config.root().map(|r| r.level).unwrap_or_default();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(root_level.to_level_filter().to_string()));

    let installed = install_subscriber
        && tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init()
            .is_ok();

    if install_subscriber && !installed {
        debug!("A global subscriber is already installed; keeping it");
    }

    Ok(LoggingSetup {
        log_files,
        installed,
    })
}

fn open_log_file(path: &Path, mode: FileMode) -> Result<File> {
    let file = match mode {
        FileMode::Truncate => File::create(path),
        FileMode::Append => OpenOptions::new().create(true).append(true).open(path),
    }
    .with_context(|| format!("Failed to open log file {}", path.display()))?;

    restrict_permissions(path)?;
    Ok(file)
}

/// Limit a log file to owner read/write
#[cfg(unix)]
pub fn restrict_permissions(path: &Path) -> RunnerResult<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| RunnerError::io(path, e))
}

#[cfg(not(unix))]
pub fn restrict_permissions(_path: &Path) -> RunnerResult<()> {
    Ok(())
}

/// Initialize a plain compact logger for the command-line tools
pub fn init_logger(level: LogLevel) {
    let filter = EnvFilter::new(format!("journal_runner={}", level.to_tracing_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{substitute, Bindings};
    use tempfile::tempdir;

    fn bindings_for(dir: &Path) -> Bindings {
        [
            ("LOG_DIR", dir.to_string_lossy().into_owned()),
            ("LOG_FILEBASE", "run1".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("unknown"), None);
    }

    #[test]
    fn test_default_template_parses() {
        let text = substitute(DEFAULT_LOG_CONFIG, &bindings_for(Path::new("/tmp/x"))).unwrap();
        let config = LoggingConfig::parse(&text).unwrap();

        assert_eq!(
            config.journal_path(),
            Some(PathBuf::from("/tmp/x/run1.journal"))
        );
        assert_eq!(
            config.handlers["file"].filename.as_deref(),
            Some("/tmp/x/run1.log")
        );
        assert_eq!(config.handlers["console"].level, LogLevel::Warn);
        assert_eq!(config.root().unwrap().handlers.len(), 3);
    }

    #[test]
    fn test_json_config_accepted() {
        let text = r#"{
            "version": 1,
            "handlers": {"journal": {"class": "journal", "path": "/tmp/a.journal"}}
        }"#;
        let config = LoggingConfig::parse(text).unwrap();
        assert!(config.root().is_none());
        assert_eq!(config.handlers["journal"].level, LogLevel::Trace);
    }

    #[test]
    fn test_journal_handler_required() {
        let text = "handlers:\n  console:\n    class: console\n";
        let err = LoggingConfig::parse(text).unwrap_err();
        assert!(matches!(err, RunnerError::InvalidLogConfig(_)));
    }

    #[test]
    fn test_unknown_handler_reference() {
        let text = "handlers:\n  journal:\n    class: journal\n    path: /tmp/a.journal\n\
                    loggers:\n  '':\n    handlers: [journal, syslog]\n";
        assert!(LoggingConfig::parse(text).is_err());
    }

    #[test]
    fn test_malformed_template() {
        assert!(matches!(
            LoggingConfig::parse("handlers: [unclosed"),
            Err(RunnerError::InvalidLogConfig(_))
        ));
    }

    #[test]
    fn test_install_opens_files() {
        let dir = tempdir().unwrap();
        let text = substitute(DEFAULT_LOG_CONFIG, &bindings_for(dir.path())).unwrap();
        let config = LoggingConfig::parse(&text).unwrap();
        let journals = Arc::new(JournalRegistry::new());

        let setup = install_logging(&config, &journals, false).unwrap();

        assert!(!setup.installed);
        assert_eq!(setup.log_files, vec![dir.path().join("run1.log")]);
        assert!(dir.path().join("run1.log").exists());
        let journal = journals.get_global().unwrap();
        assert_eq!(journal.path(), dir.path().join("run1.journal"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(dir.path().join("run1.log"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
