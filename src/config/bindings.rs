//! Binding resolution
//!
//! Converts parsed options into uppercase-keyed bindings and resolves `$KEY`
//! references in text templates.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::options::ParsedOptions;
use crate::error::{RunnerError, RunnerResult};

static VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("variable pattern is valid")
});

/// Name/value bindings available to every test in a run.
///
/// Keys are upper case by convention. The default bindings are derived from
/// the command-line options, but programs may add hard-coded values too.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings {
    values: BTreeMap<String, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup a binding, normalizing the key to upper case
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_uppercase()).map(String::as_str)
    }

    /// Lookup a binding with fallback
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.values.insert(key.as_ref().to_uppercase(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Merge another set of bindings; `other` takes precedence
    pub fn extend(&mut self, other: Bindings) {
        self.values.extend(other.values);
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

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        for (key, value) in iter {
            bindings.insert(key, value);
        }
        bindings
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.values {
            writeln!(f, "  {key}={value}")?;
        }
        Ok(())
    }
}

/// Default values for bindings, consulted when the command-line surface is
/// built so each program can inject its own defaults.
#[derive(Clone, Debug, Default)]
pub struct DefaultBindingOverrides {
    values: BTreeMap<String, String>,
}

impl DefaultBindingOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.values.insert(key.as_ref().to_uppercase(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_uppercase()).map(String::as_str)
    }

    /// Override for `key`, or `default` when none was supplied
    pub fn get_or(&self, key: &str, default: impl Into<String>) -> String {
        self.get(key)
            .map(str::to_string)
            .unwrap_or_else(|| default.into())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Turn each parsed option into one binding keyed by its upper-cased id
pub fn resolve(options: &ParsedOptions) -> Bindings {
    options.iter().collect()
}

/// Replace every `$KEY` in `text` with the binding for `KEY`.
///
/// A `$` that is not followed by an identifier is copied through unchanged.
pub fn substitute(text: &str, bindings: &Bindings) -> RunnerResult<String> {
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for captures in VARIABLE.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let key = &captures[1];
        let value = bindings
            .get(key)
            .ok_or_else(|| RunnerError::UnresolvedVariable(key.to_uppercase()))?;

        output.push_str(&text[last..whole.start()]);
        output.push_str(value);
        last = whole.end();
    }

    output.push_str(&text[last..]);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_bindings() -> Bindings {
        [("LOG_DIR", "/tmp/x"), ("LOG_FILEBASE", "run1")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_substitute_journal_path() {
        let text = substitute("$LOG_DIR/$LOG_FILEBASE.journal", &log_bindings()).unwrap();
        assert_eq!(text, "/tmp/x/run1.journal");
    }

    #[test]
    fn test_substitute_unresolved() {
        let err = substitute("$LOG_DIR/$MISSING.log", &log_bindings()).unwrap_err();
        assert!(matches!(err, RunnerError::UnresolvedVariable(ref k) if k == "MISSING"));
    }

    #[test]
    fn test_substitute_is_word_bounded() {
        // $LOG_DIRX is a different variable, not $LOG_DIR followed by X
        let err = substitute("$LOG_DIRX", &log_bindings()).unwrap_err();
        assert!(matches!(err, RunnerError::UnresolvedVariable(ref k) if k == "LOG_DIRX"));
    }

    #[test]
    fn test_substitute_leaves_bare_dollar() {
        let text = substitute("cost: $5 in $LOG_DIR", &log_bindings()).unwrap();
        assert_eq!(text, "cost: $5 in /tmp/x");
    }

    #[test]
    fn test_bindings_uppercase_keys() {
        let mut bindings = Bindings::new();
        bindings.insert("log_dir", "/var/log");
        assert_eq!(bindings.get("LOG_DIR"), Some("/var/log"));
        assert_eq!(bindings.get("log_dir"), Some("/var/log"));
        assert_eq!(bindings.get_or("missing", "x"), "x");
    }

    #[test]
    fn test_bindings_extend_overwrites() {
        let mut bindings: Bindings = [("A", "1"), ("B", "2")].into_iter().collect();
        bindings.extend([("B", "3")].into_iter().collect());
        assert_eq!(bindings.get("A"), Some("1"));
        assert_eq!(bindings.get("B"), Some("3"));
    }

    #[test]
    fn test_default_overrides() {
        let overrides = DefaultBindingOverrides::new().with("log_dir", "/data");
        assert_eq!(overrides.get_or("LOG_DIR", "."), "/data");
        assert_eq!(overrides.get_or("LOG_CONFIG", ""), "");
    }
}
