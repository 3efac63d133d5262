//! Journal file writer and reader

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::snapshot::Snapshot;
use crate::error::{RunnerError, RunnerResult};

/// Kind of a journal record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Stored through `Journal::store`
    Snapshot,
    /// Mirrored log event
    Message,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Snapshot => write!(f, "snapshot"),
            RecordKind::Message => write!(f, "message"),
        }
    }
}

/// One line of the journal file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JournalRecord {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: RecordKind,
    pub title: String,
    pub data: Value,
}

struct JournalState {
    writer: Option<BufWriter<File>>,
    next_sequence: u64,
}

/// Append-only journal bound to a single file.
///
/// Appends are serialized by an internal mutex so tests running on several
/// threads never interleave partial records.
pub struct Journal {
    path: PathBuf,
    state: Mutex<JournalState>,
}

impl Journal {
    /// Open `path` for writing, truncating any previous journal
    pub fn new_with_path(path: impl Into<PathBuf>) -> RunnerResult<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(|e| RunnerError::io(&path, e))?;

        Ok(Self {
            path,
            state: Mutex::new(JournalState {
                writer: Some(BufWriter::new(file)),
                next_sequence: 0,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, JournalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a snapshot record; returns its sequence number
    pub fn store(&self, snapshot: &dyn Snapshot) -> RunnerResult<u64> {
        self.append(
            RecordKind::Snapshot,
            snapshot.snapshot_title(),
            snapshot.to_snapshot(),
        )
    }

    /// Append a log message record. Messages arriving after termination
    /// are dropped.
    pub fn store_message(&self, level: &str, target: &str, message: &str, fields: Value) {
        let data = serde_json::json!({
            "level": level,
            "target": target,
            "message": message,
            "fields": fields,
        });
        let _ = self.append(RecordKind::Message, target.to_string(), data);
    }

    fn append(&self, kind: RecordKind, title: String, data: Value) -> RunnerResult<u64> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(writer) = state.writer.as_mut() else {
            return Err(RunnerError::JournalTerminated(self.path.clone()));
        };

        let record = JournalRecord {
            sequence: state.next_sequence,
            timestamp: Utc::now(),
            kind,
            title,
            data,
        };
        serde_json::to_writer(&mut *writer, &record)
            .map_err(|e| RunnerError::io(&self.path, e.into()))?;
        writer
            .write_all(b"\n")
            .map_err(|e| RunnerError::io(&self.path, e))?;

        state.next_sequence += 1;
        Ok(record.sequence)
    }

    /// Push buffered records to disk without closing
    pub fn flush(&self) -> RunnerResult<()> {
        let mut state = self.lock();
        match state.writer.as_mut() {
            Some(writer) => writer.flush().map_err(|e| RunnerError::io(&self.path, e)),
            None => Ok(()),
        }
    }

    /// Flush and close the file. Calling again is a no-op.
    pub fn terminate(&self) -> RunnerResult<()> {
        let writer = self.lock().writer.take();
        match writer {
            Some(mut writer) => writer.flush().map_err(|e| RunnerError::io(&self.path, e)),
            None => Ok(()),
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.lock().writer.is_none()
    }

    /// Number of records written so far
    pub fn record_count(&self) -> u64 {
        self.lock().next_sequence
    }
}

impl fmt::Debug for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Journal")
            .field("path", &self.path)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// Load every record from a journal file
pub fn read_journal(path: impl AsRef<Path>) -> RunnerResult<Vec<JournalRecord>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| RunnerError::io(path, e))?;

    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| RunnerError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| RunnerError::io(path, e.into()))?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JsonSnapshot;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_store_in_call_order() {
        let dir = tempdir().unwrap();
        let journal = Journal::new_with_path(dir.path().join("run.journal")).unwrap();

        assert_eq!(journal.store(&JsonSnapshot::new("first", json!(1))).unwrap(), 0);
        assert_eq!(journal.store(&JsonSnapshot::new("second", json!(2))).unwrap(), 1);
        journal.terminate().unwrap();

        let records = read_journal(journal.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "first");
        assert_eq!(records[1].data, json!(2));
        assert_eq!(records[1].kind, RecordKind::Snapshot);
    }

    #[test]
    fn test_store_after_terminate_rejected() {
        let dir = tempdir().unwrap();
        let journal = Journal::new_with_path(dir.path().join("run.journal")).unwrap();
        journal.terminate().unwrap();

        let err = journal
            .store(&JsonSnapshot::new("late", json!(null)))
            .unwrap_err();
        assert!(matches!(err, RunnerError::JournalTerminated(_)));
        assert!(journal.is_terminated());
    }

    #[test]
    fn test_terminate_twice() {
        let dir = tempdir().unwrap();
        let journal = Journal::new_with_path(dir.path().join("run.journal")).unwrap();
        journal.store(&JsonSnapshot::new("only", json!("x"))).unwrap();

        journal.terminate().unwrap();
        journal.terminate().unwrap();

        assert_eq!(read_journal(journal.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_messages_after_terminate_dropped() {
        let dir = tempdir().unwrap();
        let journal = Journal::new_with_path(dir.path().join("run.journal")).unwrap();
        journal.store_message("INFO", "suite", "hello", json!({}));
        journal.terminate().unwrap();
        journal.store_message("INFO", "suite", "ignored", json!({}));

        let records = read_journal(journal.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RecordKind::Message);
        assert_eq!(records[0].data["message"], "hello");
    }

    #[test]
    fn test_unopenable_path() {
        let dir = tempdir().unwrap();
        let result = Journal::new_with_path(dir.path().join("missing").join("run.journal"));
        assert!(matches!(result, Err(RunnerError::Io { .. })));
    }
}
