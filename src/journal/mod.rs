//! Reporting journal
//!
//! An append-only JSON-lines log of structured snapshot events captured
//! during a run, later rendered into an HTML report.
//!
//! ## Lifecycle
//!
//! A [`Journal`] is active from the moment its file is opened until
//! [`Journal::terminate`] flushes and closes it. A terminated journal rejects
//! further snapshots. At most one journal is the active one within a
//! [`JournalRegistry`]; unregistering is compare-and-clear so a stale owner
//! cannot remove a newer journal.

mod layer;
mod registry;
mod snapshot;
mod writer;

pub use layer::JournalLayer;
pub use registry::JournalRegistry;
pub use snapshot::{JsonSnapshot, Snapshot};
pub use writer::{read_journal, Journal, JournalRecord, RecordKind};
