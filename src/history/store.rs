use async_trait::async_trait;

use crate::error::Result;
use crate::types::HistoryEntry;

/// Append-only log of past runs.
///
/// Backends only need `append` and `scan`; `scan` may return rows in any
/// physical order. Ordering and windowing happen in `read_recent`.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, entry: &HistoryEntry) -> Result<()>;

    /// Every stored entry, unordered.
    async fn scan(&self) -> Result<Vec<HistoryEntry>>;

    /// The `k` entries with the largest ids, oldest first.
    async fn read_recent(&self, k: usize) -> Result<Vec<HistoryEntry>> {
        Ok(window_recent(self.scan().await?, k))
    }
}

/// Sort by id ascending and keep only the newest `k`.
///
/// The sort is stable, so entries sharing an id keep their scan order.
pub fn window_recent(mut entries: Vec<HistoryEntry>, k: usize) -> Vec<HistoryEntry> {
    entries.sort_by_key(|e| e.id);
    let drop = entries.len().saturating_sub(k);
    entries.drain(..drop);
    entries
}
