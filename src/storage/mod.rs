//! Crowding Event Storage
//!
//! Append-only log of per-tick occupancy events with a range query by bus.
//! Backends implement [`EventLog`]:
//! - `SqliteEventLog`: the `crowding_data` table in a SQLite file
//! - `InMemoryEventLog`: non-durable store for tests and dry runs

mod memory;
mod sqlite;

pub use memory::InMemoryEventLog;
pub use sqlite::SqliteEventLog;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{CrowdingEvent, CrowdingRecord, RowId};

/// Storage errors. Never fatal to the processing loop.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row {id}: {reason}")]
    CorruptRow { id: RowId, reason: String },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable, append-mostly event log.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append one event and return its row id.
    async fn log(&self, event: &CrowdingEvent) -> Result<RowId, StorageError>;

    /// Events for `bus_id` with `start <= timestamp <= end` (bounds optional),
    /// in insertion order.
    async fn query(
        &self,
        bus_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<CrowdingRecord>, StorageError>;

    /// Total number of stored events.
    async fn count(&self) -> Result<u64, StorageError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

pub(crate) fn within_bounds(
    ts: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    start.map_or(true, |s| ts >= s) && end.map_or(true, |e| ts <= e)
}
