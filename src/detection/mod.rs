//! Person detection.
//!
//! The loop talks to a [`PersonDetector`]; how boxes are produced (a neural net,
//! a replayed sidecar file) is the adapter's business. Adapters return the frame
//! with their boxes already drawn on it.

pub mod overlay;
mod sidecar;

pub use sidecar::{non_max_suppression, RawDetection, SidecarDetector};

use std::path::PathBuf;

use crate::types::{DetectionResult, Frame};

#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("frame {0} has no source path to locate detections for")]
    NoSourcePath(u64),
    #[error("no detection sidecar at {}", .0.display())]
    MissingSidecar(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed detections in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Counts people in a frame.
pub trait PersonDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, DetectionError>;

    /// Detector name for logging
    fn name(&self) -> &str;
}
