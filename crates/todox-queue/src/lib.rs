//! Offline write-ahead queue.
//!
//! Edits made while offline are kept in a local SQLite database, one row per
//! record id, until [`OfflineQueue::sync_to_server`] hands them to a push
//! function that succeeds.
//!
//! ```no_run
//! use todox_model::TodoDocument;
//! use todox_queue::{OfflineQueue, SyncOutcome};
//!
//! let queue: OfflineQueue<TodoDocument> = OfflineQueue::open("offline.db");
//! queue.save_offline_update(&[TodoDocument::new("1", "Groceries")])?;
//! let outcome = queue.sync_to_server(|docs| -> Result<(), std::io::Error> {
//!     println!("pushing {} document(s)", docs.len());
//!     Ok(())
//! })?;
//! assert_eq!(outcome, SyncOutcome::Synced { count: 1 });
//! # Ok::<(), todox_queue::QueueError>(())
//! ```

pub mod config;
pub mod error;
pub mod queue;
pub mod record;
pub mod store;
pub mod sync;

pub use config::{DEFAULT_DB_FILE, QueueConfig};
pub use error::{PushError, QueueError, Result};
pub use queue::OfflineQueue;
pub use record::QueueRecord;
pub use store::SCHEMA_VERSION;
pub use sync::SyncOutcome;
