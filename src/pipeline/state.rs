//! Loop lifecycle and per-tick reporting types.

use std::fmt;

use super::source::CaptureError;
use crate::alerting::NotifyError;
use crate::detection::DetectionError;
use crate::types::RowId;

/// Processing loop lifecycle. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Stopping => write!(f, "STOPPING"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// What the alert step did this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertOutcome {
    /// Nobody in frame
    NoPeople,
    /// Inside the cooldown window
    Suppressed { remaining_secs: i64 },
    Sent { attempts: u32 },
    Failed(NotifyError),
}

/// Summary of a tick that got past detection.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub frame_index: u64,
    pub person_count: u32,
    pub occupancy_rate: f64,
    pub alert: AlertOutcome,
    /// Row id of the logged event, `None` if storage failed
    pub logged: Option<RowId>,
    pub rendered: bool,
}

/// Result of a single [`tick`](super::ProcessingLoop::tick).
#[derive(Debug)]
pub enum TickOutcome {
    /// Source exhausted. The loop is now stopping.
    EndOfStream,
    /// Source failed. The loop is now stopping.
    CaptureFailed(CaptureError),
    /// Frame skipped; the loop keeps running.
    DetectionFailed(DetectionError),
    Processed(TickReport),
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub detection_failures: u64,
    pub alerts_sent: u64,
    pub alerts_suppressed: u64,
    pub alerts_failed: u64,
    pub events_logged: u64,
    pub storage_failures: u64,
    pub render_failures: u64,
}
