//! crowdwatch: bus occupancy monitoring
//!
//! Watches a camera feed on board a bus, counts the people in each frame,
//! e-mails an alert when someone is detected (at most once per cooldown
//! window) and logs every observation to SQLite.
//!
//! ## Architecture
//!
//! - **Detection**: [`detection::PersonDetector`] adapters turn frames into person counts
//! - **Alerting**: [`alerting::AlertThrottler`] cooldown plus the retrying [`alerting::Notifier`]
//! - **Storage**: [`storage::EventLog`] backends for the `crowding_data` table
//! - **Pipeline**: [`pipeline::ProcessingLoop`] sequences capture, detection, alerting, logging and rendering

pub mod alerting;
pub mod clock;
pub mod config;
pub mod detection;
pub mod pipeline;
pub mod storage;
pub mod types;

pub use config::MonitorConfig;

pub use types::{
    occupancy_rate, BoundingBox, Capacity, CapacityError, CrowdingEvent, CrowdingRecord,
    DetectionResult, Frame, PersonBox, RowId,
};

pub use alerting::{AlertThrottler, Notifier, NotifyError};
pub use pipeline::{LoopState, LoopStats, ProcessingLoop};
pub use storage::{EventLog, SqliteEventLog, StorageError};
