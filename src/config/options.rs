//! Command-line surface
//!
//! Builds the clap command from the base logging flags plus caller-supplied
//! parser inits, and flattens the matches into `ParsedOptions`.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Arg, ArgMatches, Command};
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::bindings::DefaultBindingOverrides;
use crate::error::{RunnerError, RunnerResult};

/// Callback that augments the command line with additional flags, using the
/// overrides to pick per-program defaults.
pub type ParserInit = Box<dyn Fn(Command, &DefaultBindingOverrides) -> Command + Send + Sync>;

/// Resolved command-line option values keyed by argument id
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedOptions {
    values: BTreeMap<String, String>,
}

impl ParsedOptions {
    /// Flatten clap matches; multiple values are joined with `,`
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let mut values = BTreeMap::new();
        for id in matches.ids() {
            let Ok(Some(raw)) = matches.try_get_raw(id.as_str()) else {
                continue;
            };
            let joined = raw
                .map(|v| v.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(",");
            values.insert(id.as_str().to_string(), joined);
        }
        Self { values }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Program name without directory or extension, or `debug` when unavailable
pub fn program_stem(args: &[OsString]) -> String {
    args.first()
        .and_then(|arg0| Path::new(arg0).file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "debug".to_string())
}

/// Command carrying the flags every run understands
pub fn base_command(program: &str, defaults: &DefaultBindingOverrides) -> Command {
    Command::new(program.to_string())
        .arg(
            Arg::new("log_dir")
                .long("log_dir")
                .default_value(defaults.get_or("LOG_DIR", "."))
                .help("Directory for the log and journal files"),
        )
        .arg(
            Arg::new("log_filebase")
                .long("log_filebase")
                .default_value(defaults.get_or("LOG_FILEBASE", program))
                .help("Base name of the log and journal files"),
        )
        .arg(
            Arg::new("log_config")
                .long("log_config")
                .default_value(defaults.get_or("LOG_CONFIG", ""))
                .help(
                    "Path to a logging configuration template. The contents may \
                     reference $KEY variables where --KEY is a command-line argument \
                     whose value should be substituted",
                ),
        )
}

/// Reject commands where two registrations share an id or long flag
fn check_duplicates(command: &Command) -> RunnerResult<()> {
    let mut ids = HashSet::new();
    let mut longs = HashSet::new();

    for arg in command.get_arguments() {
        let id = arg.get_id().as_str().to_string();
        if !ids.insert(id.clone()) {
            return Err(RunnerError::DuplicateFlag(id));
        }
        if let Some(long) = arg.get_long() {
            if !longs.insert(long.to_string()) {
                return Err(RunnerError::DuplicateFlag(format!("--{long}")));
            }
        }
    }
    Ok(())
}

/// Build the full command surface and parse `args` against it
pub fn parse_options(
    args: &[OsString],
    parser_inits: &[ParserInit],
    defaults: &DefaultBindingOverrides,
) -> Result<ParsedOptions> {
    let program = program_stem(args);
    let mut command = base_command(&program, defaults);
    for init in parser_inits {
        command = init(command, defaults);
    }
    check_duplicates(&command)?;

    let matches = match command.try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return Err(RunnerError::HelpRequested(e.render().to_string()).into());
        }
        Err(e) => {
            return Err(anyhow::Error::new(e).context("Failed to parse command-line arguments"))
        }
    };

    let mut options = ParsedOptions::from_matches(&matches);
    for key in ["log_dir", "log_config"] {
        if let Some(value) = options.values.get_mut(key) {
            if !value.is_empty() {
                *value = expand_path(value).to_string_lossy().into_owned();
            }
        }
    }
    Ok(options)
}

/// Expand ~ to home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_program_stem() {
        assert_eq!(program_stem(&args(&["/usr/bin/smoke_test.py"])), "smoke_test");
        assert_eq!(program_stem(&[]), "debug");
    }

    #[test]
    fn test_base_defaults() {
        let options =
            parse_options(&args(&["suite"]), &[], &DefaultBindingOverrides::new()).unwrap();
        assert_eq!(options.get("log_dir"), Some("."));
        assert_eq!(options.get("log_filebase"), Some("suite"));
        assert_eq!(options.get("log_config"), Some(""));
    }

    #[test]
    fn test_overrides_change_defaults() {
        let defaults = DefaultBindingOverrides::new().with("LOG_FILEBASE", "nightly");
        let options = parse_options(&args(&["suite"]), &[], &defaults).unwrap();
        assert_eq!(options.get("log_filebase"), Some("nightly"));
    }

    #[test]
    fn test_parser_init_adds_flag() {
        let init: ParserInit = Box::new(|cmd, defaults| {
            cmd.arg(
                Arg::new("project")
                    .long("project")
                    .default_value(defaults.get_or("PROJECT", "sandbox")),
            )
        });
        let options = parse_options(
            &args(&["suite", "--project", "prod", "--log_dir", "/tmp/logs"]),
            &[init],
            &DefaultBindingOverrides::new(),
        )
        .unwrap();
        assert_eq!(options.get("project"), Some("prod"));
        assert_eq!(options.get("log_dir"), Some("/tmp/logs"));
    }

    #[test]
    fn test_duplicate_flag_rejected() {
        let init: ParserInit = Box::new(|cmd, _| cmd.arg(Arg::new("log_dir").long("log_dir")));
        let err = parse_options(&args(&["suite"]), &[init], &DefaultBindingOverrides::new())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::DuplicateFlag(_))
        ));
    }

    #[test]
    fn test_duplicate_long_rejected() {
        let init: ParserInit = Box::new(|cmd, _| cmd.arg(Arg::new("dir").long("log_dir")));
        let err = parse_options(&args(&["suite"]), &[init], &DefaultBindingOverrides::new())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::DuplicateFlag(flag)) if flag == "--log_dir"
        ));
    }

    #[test]
    fn test_help_is_not_a_parse_failure() {
        let err = parse_options(&args(&["suite", "--help"]), &[], &DefaultBindingOverrides::new())
            .unwrap_err();
        match err.downcast_ref::<RunnerError>() {
            Some(RunnerError::HelpRequested(text)) => assert!(text.contains("--log_dir")),
            other => panic!("expected help text, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_flag_is_parse_failure() {
        let err = parse_options(&args(&["suite", "--bogus"]), &[], &DefaultBindingOverrides::new())
            .unwrap_err();
        assert!(err.downcast_ref::<clap::Error>().is_some());
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
    }
}
