use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::history::store::HistoryStore;
use crate::types::HistoryEntry;

/// In-process history for tests. Scans come back newest-first to make sure
/// callers never rely on physical order.
#[derive(Default)]
pub struct MemoryHistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
    fail_appends: bool,
    fail_scans: bool,
}

impl MemoryHistoryStore {
    pub fn seeded(entries: Vec<HistoryEntry>) -> Self {
        Self { entries: Mutex::new(entries), ..Self::default() }
    }

    /// A store whose writes always fail.
    pub fn read_only(entries: Vec<HistoryEntry>) -> Self {
        Self { entries: Mutex::new(entries), fail_appends: true, ..Self::default() }
    }

    /// A store that cannot be read (writes still succeed).
    pub fn unreadable() -> Self {
        Self { fail_scans: true, ..Self::default() }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        if self.fail_appends {
            return Err(AppError::Persistence("store is read-only".to_string()));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<HistoryEntry>> {
        if self.fail_scans {
            return Err(AppError::Persistence("history table is locked".to_string()));
        }
        let mut entries = self.entries.lock().unwrap().clone();
        entries.reverse();
        Ok(entries)
    }
}
