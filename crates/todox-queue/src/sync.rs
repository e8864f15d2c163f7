//! Reconciling the queue with a remote store.
//!
//! Delivery is at-least-once: records are removed only after the push
//! function reports success, so a crash between push and removal re-sends
//! them on the next sync. The remote side must treat pushes as idempotent
//! per record id.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};

use tracing::{info, info_span, warn};

use crate::error::{PushError, QueueError, Result};
use crate::queue::{OfflineQueue, decode_row};
use crate::record::QueueRecord;
use crate::store::StoredRow;

/// Stores with a sync currently running in this process.
static IN_FLIGHT: LazyLock<Mutex<HashSet<PathBuf>>> = LazyLock::new(Default::default);

/// Result of a successful sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing was queued; the push function was not called.
    Empty,
    /// `count` records were pushed and removed from the queue.
    Synced { count: usize },
}

/// Marks a store as syncing until dropped.
struct SyncGuard {
    key: PathBuf,
}

impl SyncGuard {
    fn acquire(path: &Path) -> Result<Self> {
        let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let mut in_flight = IN_FLIGHT.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(key.clone()) {
            return Err(QueueError::SyncInProgress { path: key });
        }
        Ok(Self { key })
    }
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        IN_FLIGHT
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl<T: QueueRecord> OfflineQueue<T> {
    /// Push every queued record, then remove what was pushed.
    ///
    /// On push failure the queue is left as it was and the error is
    /// returned as [`QueueError::SyncRejected`]. Records rewritten while the
    /// push was running are kept for the next sync.
    pub fn sync_to_server<F, E>(&self, push: F) -> Result<SyncOutcome>
    where
        F: FnOnce(&[T]) -> std::result::Result<(), E>,
        E: Into<PushError>,
    {
        let _guard = SyncGuard::acquire(self.path())?;
        let _span = info_span!("sync", path = %self.path().display()).entered();

        let (rows, records) = split_decodable::<T>(self.store()?.load_all()?);
        if records.is_empty() {
            return Ok(SyncOutcome::Empty);
        }

        let count = records.len();
        if let Err(err) = push(&records) {
            let source = err.into();
            warn!(count, "sync rejected, keeping queue: {source}");
            return Err(QueueError::SyncRejected { count, source });
        }

        self.finish_sync(&rows, count)
    }

    /// [`sync_to_server`](Self::sync_to_server) with an async push function.
    ///
    /// Store access runs on the blocking thread pool.
    pub async fn sync_to_server_async<F, Fut, E>(&self, push: F) -> Result<SyncOutcome>
    where
        T: Send + 'static,
        F: FnOnce(Vec<T>) -> Fut,
        Fut: Future<Output = std::result::Result<(), E>>,
        E: Into<PushError>,
    {
        let _guard = SyncGuard::acquire(self.path())?;

        let queue = self.clone();
        let stored = tokio::task::spawn_blocking(move || queue.store()?.load_all())
            .await
            .map_err(|e| QueueError::Join(e.to_string()))??;
        let (rows, records) = split_decodable::<T>(stored);
        if records.is_empty() {
            return Ok(SyncOutcome::Empty);
        }

        let count = records.len();
        if let Err(err) = push(records).await {
            let source = err.into();
            warn!(count, "sync rejected, keeping queue: {source}");
            return Err(QueueError::SyncRejected { count, source });
        }

        let queue = self.clone();
        tokio::task::spawn_blocking(move || queue.finish_sync(&rows, count))
            .await
            .map_err(|e| QueueError::Join(e.to_string()))?
    }

    /// Remove pushed rows that were not rewritten in the meantime.
    fn finish_sync(&self, pushed: &[StoredRow], count: usize) -> Result<SyncOutcome> {
        let removed = self.store()?.delete_unchanged(pushed)?;
        if removed < pushed.len() {
            info!(
                kept = pushed.len() - removed,
                "records changed during sync were kept"
            );
        }
        info!(count, "offline queue synced");
        Ok(SyncOutcome::Synced { count })
    }
}

/// Pair each decodable row with its record. Undecodable rows are neither
/// pushed nor removed.
fn split_decodable<T: QueueRecord>(rows: Vec<StoredRow>) -> (Vec<StoredRow>, Vec<T>) {
    rows.into_iter()
        .filter_map(|row| decode_row(&row).map(|record| (row, record)))
        .unzip()
}
