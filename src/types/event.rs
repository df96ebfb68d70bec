//! Crowding events and the capacity invariant behind the occupancy rate.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Auto-assigned storage identity of a logged event.
pub type RowId = i64;

/// Capacity must be a positive passenger count.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("bus capacity must be > 0 (got {0})")]
pub struct CapacityError(pub u32);

/// Fixed per-vehicle passenger capacity, guaranteed non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Capacity(u32);

impl Capacity {
    pub fn new(value: u32) -> Result<Self, CapacityError> {
        if value == 0 {
            return Err(CapacityError(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self(crate::config::defaults::DEFAULT_BUS_CAPACITY)
    }
}

impl TryFrom<u32> for Capacity {
    type Error = CapacityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Capacity> for u32 {
    fn from(capacity: Capacity) -> Self {
        capacity.0
    }
}

/// `passenger_count / capacity`. Never divides by zero: `Capacity` cannot hold 0.
pub fn occupancy_rate(passenger_count: u32, capacity: Capacity) -> f64 {
    f64::from(passenger_count) / f64::from(capacity.get())
}

/// One detection tick worth of occupancy data for a bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrowdingEvent {
    pub bus_id: String,
    pub passenger_count: u32,
    pub occupancy_rate: f64,
    pub timestamp: DateTime<Utc>,
}

impl CrowdingEvent {
    /// Build an event, deriving the occupancy rate from `capacity`.
    ///
    /// The timestamp is truncated to microseconds, the resolution of the event log.
    pub fn new(
        bus_id: impl Into<String>,
        passenger_count: u32,
        capacity: Capacity,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            bus_id: bus_id.into(),
            passenger_count,
            occupancy_rate: occupancy_rate(passenger_count, capacity),
            timestamp: timestamp.trunc_subsecs(6),
        }
    }
}

/// A persisted event together with its row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrowdingRecord {
    pub id: RowId,
    #[serde(flatten)]
    pub event: CrowdingEvent,
}
