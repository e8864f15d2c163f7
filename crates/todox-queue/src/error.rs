//! Queue error types.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by a push function.
pub type PushError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the offline queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The store could not be opened or migrated.
    #[error("offline store unavailable at {}", .path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// File system error while preparing the store location.
    #[error("failed to {operation} {}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A statement failed on an open store.
    #[error("offline store error")]
    Store(#[from] rusqlite::Error),

    /// A record could not be encoded or decoded.
    #[error("failed to serialize record")]
    Serialization(#[from] serde_json::Error),

    /// A record in a batch has an empty id.
    #[error("record at position {index} has an empty id")]
    InvalidRecord { index: usize },

    /// The push function failed; nothing was removed from the queue.
    #[error("sync of {count} record(s) rejected")]
    SyncRejected {
        count: usize,
        #[source]
        source: PushError,
    },

    /// Another sync for the same store is still running.
    #[error("a sync is already in progress for {}", .path.display())]
    SyncInProgress { path: PathBuf },

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    Join(String),
}

impl QueueError {
    /// Whether a later retry may succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SyncRejected { .. } | Self::SyncInProgress { .. } | Self::StoreUnavailable { .. }
        )
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::StoreUnavailable { .. } | Self::Io { .. } => {
                "Offline storage is not available.".to_string()
            }
            Self::Store(_) => "Offline storage failed. Your changes were not saved.".to_string(),
            Self::Serialization(_) => "A pending change could not be stored.".to_string(),
            Self::InvalidRecord { .. } => "A pending change has no identifier.".to_string(),
            Self::SyncRejected { count, .. } => format!(
                "Sync failed. {count} pending change(s) were kept and will be retried."
            ),
            Self::SyncInProgress { .. } => "A sync is already running.".to_string(),
            Self::Join(_) => "An unexpected error occurred.".to_string(),
        }
    }
}

/// Result type alias for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
