//! Frames and detector output.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A captured video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Zero-based position in the stream
    pub index: u64,
    /// Where the frame came from, when the source is file-backed
    pub source: Option<PathBuf>,
    pub image: RgbImage,
}

/// Axis-aligned box in pixel coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// A person-class detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonBox {
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// Output of one detector pass. Lives for a single tick.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub person_count: u32,
    pub annotated_frame: RgbImage,
    pub boxes: Vec<PersonBox>,
}

impl DetectionResult {
    /// Result whose count is taken from the detected boxes.
    pub fn from_boxes(annotated_frame: RgbImage, boxes: Vec<PersonBox>) -> Self {
        Self {
            person_count: u32::try_from(boxes.len()).unwrap_or(u32::MAX),
            annotated_frame,
            boxes,
        }
    }
}
