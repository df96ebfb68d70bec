//! Core domain types shared by the detector, alerting and storage paths.

mod event;
mod frame;

pub use event::{occupancy_rate, Capacity, CapacityError, CrowdingEvent, CrowdingRecord, RowId};
pub use frame::{BoundingBox, DetectionResult, Frame, PersonBox};
