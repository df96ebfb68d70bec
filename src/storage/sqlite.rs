//! SQLite-backed event log (`crowding_data` table).
//!
//! Timestamps are stored as fixed-width UTC text (`YYYY-MM-DD HH:MM:SS.ffffff`)
//! so the range filter can compare them as strings.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use tracing::info;

use super::{EventLog, StorageError};
use crate::types::{CrowdingEvent, CrowdingRecord, RowId};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS crowding_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bus_id TEXT NOT NULL,
        passenger_count INTEGER NOT NULL,
        occupancy_rate REAL NOT NULL,
        timestamp DATETIME NOT NULL
    )";

const CREATE_INDEX_SQL: &str = "
    CREATE INDEX IF NOT EXISTS idx_crowding_bus_time
        ON crowding_data (bus_id, timestamp)";

/// Event log in a SQLite file.
#[derive(Clone)]
pub struct SqliteEventLog {
    pool: SqlitePool,
}

impl SqliteEventLog {
    /// Open (or create) the database at `path` and make sure the schema exists.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        // One connection: writes happen from the single processing loop.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let log = Self { pool };
        log.init_schema().await?;
        info!(path = %path.display(), "Crowding event log opened");
        Ok(log)
    }

    /// Open an existing database for reading. A missing file is an error
    /// rather than a fresh empty log, and the schema is left untouched.
    pub async fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StorageError::Unavailable(format!(
                "no event log at {}",
                path.display()
            )));
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        info!(path = %path.display(), "Crowding event log opened for reading");
        Ok(Self { pool })
    }

    /// Create the table and index if absent. Safe to call repeatedly.
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX_SQL).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl EventLog for SqliteEventLog {
    async fn log(&self, event: &CrowdingEvent) -> Result<RowId, StorageError> {
        let result = sqlx::query(
            "INSERT INTO crowding_data (bus_id, passenger_count, occupancy_rate, timestamp)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&event.bus_id)
        .bind(i64::from(event.passenger_count))
        .bind(event.occupancy_rate)
        .bind(format_timestamp(event.timestamp))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn query(
        &self,
        bus_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<CrowdingRecord>, StorageError> {
        let mut sql = String::from(
            "SELECT id, bus_id, passenger_count, occupancy_rate, timestamp
             FROM crowding_data WHERE bus_id = ?",
        );
        if start.is_some() {
            sql.push_str(" AND timestamp >= ?");
        }
        if end.is_some() {
            sql.push_str(" AND timestamp <= ?");
        }
        sql.push_str(" ORDER BY id ASC");

        let mut query = sqlx::query(&sql).bind(bus_id);
        if let Some(s) = start {
            query = query.bind(format_lower_bound(s));
        }
        if let Some(e) = end {
            query = query.bind(format_timestamp(e));
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) FROM crowding_data")
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get(0)?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Stored text has microsecond precision, so a start bound with leftover
/// nanoseconds rounds up to the next microsecond instead of truncating below it.
fn format_lower_bound(ts: DateTime<Utc>) -> String {
    let sub_micro = ts.timestamp_subsec_nanos() % 1_000;
    if sub_micro == 0 {
        return format_timestamp(ts);
    }
    let rounded = ts
        .checked_add_signed(Duration::nanoseconds(i64::from(1_000 - sub_micro)))
        .unwrap_or(ts);
    format_timestamp(rounded)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn record_from_row(row: &SqliteRow) -> Result<CrowdingRecord, StorageError> {
    let id: i64 = row.try_get("id")?;
    let corrupt = |reason: String| StorageError::CorruptRow { id, reason };

    let count: i64 = row.try_get("passenger_count")?;
    let passenger_count =
        u32::try_from(count).map_err(|_| corrupt(format!("passenger_count {count} out of range")))?;

    let raw_ts: String = row.try_get("timestamp")?;
    let timestamp =
        parse_timestamp(&raw_ts).ok_or_else(|| corrupt(format!("unparseable timestamp '{raw_ts}'")))?;

    Ok(CrowdingRecord {
        id,
        event: CrowdingEvent {
            bus_id: row.try_get("bus_id")?,
            passenger_count,
            occupancy_rate: row.try_get("occupancy_rate")?,
            timestamp,
        },
    })
}
