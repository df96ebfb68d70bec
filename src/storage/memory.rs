//! In-memory event log for tests and dry runs.
//!
//! Thread-safe via `RwLock`. Not durable: data is lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::RwLock;

use super::{within_bounds, EventLog, StorageError};
use crate::types::{CrowdingEvent, CrowdingRecord, RowId};

#[derive(Default)]
pub struct InMemoryEventLog {
    records: RwLock<Vec<CrowdingRecord>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn records(&self) -> Vec<CrowdingRecord> {
        self.records
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn log(&self, event: &CrowdingEvent) -> Result<RowId, StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let id = RowId::try_from(records.len()).unwrap_or(RowId::MAX - 1) + 1;
        records.push(CrowdingRecord {
            id,
            event: event.clone(),
        });
        Ok(id)
    }

    async fn query(
        &self,
        bus_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<CrowdingRecord>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(records
            .iter()
            .filter(|r| r.event.bus_id == bus_id && within_bounds(r.event.timestamp, start, end))
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(records.len() as u64)
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}
