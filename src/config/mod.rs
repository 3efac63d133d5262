//! Configuration module
//!
//! Binding context for a test run: parsed command-line options, default
//! overrides and the `$KEY` substitution used by logging templates.

mod bindings;
mod options;

pub use bindings::{resolve, substitute, Bindings, DefaultBindingOverrides};
pub use options::{base_command, expand_path, parse_options, program_stem, ParsedOptions, ParserInit};
