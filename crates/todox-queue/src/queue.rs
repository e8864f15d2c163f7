//! The offline write-ahead queue.

use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::error::{QueueError, Result};
use crate::record::QueueRecord;
use crate::store::{Store, StoredRow};

/// Durable mapping from record id to the latest version of that record.
///
/// Cloning is cheap: a queue only holds its configuration. Every operation
/// opens its own connection and closes it before returning.
pub struct OfflineQueue<T> {
    config: QueueConfig,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for OfflineQueue<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for OfflineQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("config", &self.config)
            .finish()
    }
}

impl<T: QueueRecord> OfflineQueue<T> {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            _record: PhantomData,
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::new(QueueConfig::new(path.as_ref()))
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub(crate) fn store(&self) -> Result<Store> {
        Store::open(&self.config)
    }

    /// Upsert `records` in one transaction and return the full snapshot.
    ///
    /// Nothing is written if any record fails to serialize or has an empty
    /// id.
    pub fn save_offline_update(&self, records: &[T]) -> Result<Vec<T>> {
        let rows = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let id = record.record_id();
                if id.is_empty() {
                    return Err(QueueError::InvalidRecord { index });
                }
                Ok(StoredRow {
                    id: id.to_string(),
                    payload: serde_json::to_string(record)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut store = self.store()?;
        store.upsert_all(&rows, chrono::Utc::now().timestamp_millis())?;
        let snapshot = decode_rows(&store.load_all()?);
        debug!(
            saved = rows.len(),
            queued = snapshot.len(),
            "saved offline update"
        );
        Ok(snapshot)
    }

    /// Full snapshot, ascending by id.
    ///
    /// Read failures are logged and yield an empty snapshot.
    pub fn get_offline_updates(&self) -> Vec<T> {
        self.try_get_offline_updates().unwrap_or_else(|err| {
            warn!(path = %self.path().display(), "offline queue unreadable: {err}");
            Vec::new()
        })
    }

    /// Full snapshot, propagating store errors.
    pub fn try_get_offline_updates(&self) -> Result<Vec<T>> {
        Ok(decode_rows(&self.store()?.load_all()?))
    }

    /// Latest queued version of one record.
    pub fn get(&self, id: &str) -> Result<Option<T>> {
        self.store()?
            .get(id)?
            .map(|payload| serde_json::from_str(&payload).map_err(QueueError::from))
            .transpose()
    }

    /// Remove one record; `false` when it was not queued.
    pub fn remove_offline_item(&self, id: &str) -> Result<bool> {
        let removed = self.store()?.delete(id)?;
        debug!(id, removed, "removed offline item");
        Ok(removed)
    }

    /// Remove every record; returns how many were dropped.
    pub fn clear_offline_updates(&self) -> Result<usize> {
        let cleared = self.store()?.clear()?;
        debug!(cleared, "cleared offline queue");
        Ok(cleared)
    }

    pub fn len(&self) -> Result<usize> {
        self.store()?.count()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Decode stored rows, skipping any that no longer parse as `T`.
pub(crate) fn decode_rows<T: QueueRecord>(rows: &[StoredRow]) -> Vec<T> {
    rows.iter().filter_map(decode_row).collect()
}

pub(crate) fn decode_row<T: QueueRecord>(row: &StoredRow) -> Option<T> {
    match serde_json::from_str(&row.payload) {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(id = %row.id, "skipping undecodable offline record: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::tempdir;

    #[test]
    fn test_save_rejects_empty_id_atomically() {
        let dir = tempdir().unwrap();
        let queue: OfflineQueue<Value> = OfflineQueue::open(dir.path().join("q.db"));
        let result = queue.save_offline_update(&[json!({"id": "a"}), json!({"name": "x"})]);
        assert!(matches!(result, Err(QueueError::InvalidRecord { index: 1 })));
        assert!(queue.get_offline_updates().is_empty());
    }

    #[test]
    fn test_undecodable_rows_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("q.db");
        let raw: OfflineQueue<Value> = OfflineQueue::open(&path);
        raw.save_offline_update(&[json!({"id": "a", "title": "ok"}), json!({"id": "b"})])
            .unwrap();

        #[derive(Debug, serde::Serialize, serde::Deserialize)]
        struct Titled {
            id: String,
            title: String,
        }
        impl QueueRecord for Titled {
            fn record_id(&self) -> &str {
                &self.id
            }
        }

        let typed: OfflineQueue<Titled> = OfflineQueue::open(&path);
        let snapshot = typed.get_offline_updates();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "ok");
    }

    #[test]
    fn test_get_single_record() {
        let dir = tempdir().unwrap();
        let queue: OfflineQueue<Value> = OfflineQueue::open(dir.path().join("q.db"));
        queue.save_offline_update(&[json!({"id": "a", "n": 1})]).unwrap();
        assert_eq!(queue.get("a").unwrap(), Some(json!({"id": "a", "n": 1})));
        assert_eq!(queue.get("z").unwrap(), None);
    }
}
