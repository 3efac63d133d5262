//! Active journal holder
//!
//! Explicit context object that tracks the one journal currently receiving
//! run-wide records.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::writer::Journal;
use crate::error::RunnerResult;

/// Holds at most one active journal
#[derive(Debug, Default)]
pub struct JournalRegistry {
    active: Mutex<Option<Arc<Journal>>>,
}

impl JournalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<Journal>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_global(&self) -> Option<Arc<Journal>> {
        self.lock().clone()
    }

    /// Make `journal` the active one, returning the journal it replaced
    pub fn set_global(&self, journal: Arc<Journal>) -> Option<Arc<Journal>> {
        self.lock().replace(journal)
    }

    /// Clear the active journal only if it is `journal`
    pub fn unset_global(&self, journal: &Arc<Journal>) -> bool {
        let mut active = self.lock();
        match active.as_ref() {
            Some(current) if Arc::ptr_eq(current, journal) => {
                *active = None;
                true
            }
            _ => false,
        }
    }

    /// Open a journal at `path` and register it. Nothing is registered when
    /// the file cannot be opened.
    pub fn new_global_journal_with_path(&self, path: impl Into<PathBuf>) -> RunnerResult<Arc<Journal>> {
        let journal = Arc::new(Journal::new_with_path(path)?);
        self.set_global(journal.clone());
        Ok(journal)
    }
}
