//! Snapshot capability
//!
//! Anything written into a journal implements [`Snapshot`]. The check happens
//! at compile time: passing a value that cannot snapshot itself does not
//! type-check.

use serde::Serialize;
use serde_json::Value;

/// Ability to serialize into the journal's structured record format
pub trait Snapshot {
    /// Short title shown for the record in reports
    fn snapshot_title(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Structured representation stored as the record's `data`
    fn to_snapshot(&self) -> Value;
}

impl<T: Snapshot + ?Sized> Snapshot for &T {
    fn snapshot_title(&self) -> String {
        (**self).snapshot_title()
    }

    fn to_snapshot(&self) -> Value {
        (**self).to_snapshot()
    }
}

/// A titled JSON value, for reporting ad-hoc data
#[derive(Clone, Debug, PartialEq)]
pub struct JsonSnapshot {
    pub title: String,
    pub value: Value,
}

impl JsonSnapshot {
    pub fn new(title: impl Into<String>, value: Value) -> Self {
        Self {
            title: title.into(),
            value,
        }
    }

    /// Capture any serializable value
    pub fn of<T: Serialize>(title: impl Into<String>, value: &T) -> serde_json::Result<Self> {
        Ok(Self::new(title, serde_json::to_value(value)?))
    }
}

impl Snapshot for JsonSnapshot {
    fn snapshot_title(&self) -> String {
        self.title.clone()
    }

    fn to_snapshot(&self) -> Value {
        self.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Probe;

    impl Snapshot for Probe {
        fn to_snapshot(&self) -> Value {
            json!({ "probe": true })
        }
    }

    #[test]
    fn test_default_title_is_type_name() {
        assert!(Probe.snapshot_title().ends_with("Probe"));
    }

    #[test]
    fn test_json_snapshot_of() {
        let snapshot = JsonSnapshot::of("ports", &vec![80, 443]).unwrap();
        assert_eq!(snapshot.snapshot_title(), "ports");
        assert_eq!(snapshot.to_snapshot(), json!([80, 443]));
    }
}
