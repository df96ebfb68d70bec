//! Detector adapter that replays pre-computed detections.
//!
//! For `frames/frame_0001.png` the raw detector output is read from
//! `frames/frame_0001.json`: an array of
//! `{"class_id": 0, "confidence": 0.91, "x": 12, "y": 40, "width": 60, "height": 150}`.
//! Raw output is filtered to the person class above the confidence threshold and
//! de-duplicated with greedy non-maximum suppression.

use serde::Deserialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::trace;

use super::overlay::draw_detections;
use super::{DetectionError, PersonDetector};
use crate::config::DetectorConfig;
use crate::types::{BoundingBox, DetectionResult, Frame, PersonBox};

/// One raw box as emitted by the upstream detector.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RawDetection {
    pub class_id: u32,
    pub confidence: f32,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

pub struct SidecarDetector {
    confidence_threshold: f32,
    person_class_id: u32,
    nms_iou_threshold: f32,
}

impl SidecarDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            person_class_id: config.person_class_id,
            nms_iou_threshold: config.nms_iou_threshold,
        }
    }

    /// Sidecar location for a frame file.
    pub fn sidecar_path(frame_path: &Path) -> PathBuf {
        frame_path.with_extension("json")
    }

    fn read_sidecar(path: &Path) -> Result<Vec<RawDetection>, DetectionError> {
        let raw = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                DetectionError::MissingSidecar(path.to_path_buf())
            } else {
                DetectionError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        serde_json::from_str(&raw).map_err(|source| DetectionError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Person-class boxes above the confidence threshold, after NMS.
    pub fn select_people(&self, raw: &[RawDetection]) -> Vec<PersonBox> {
        let candidates: Vec<PersonBox> = raw
            .iter()
            .filter(|d| d.class_id == self.person_class_id && d.confidence > self.confidence_threshold)
            .map(|d| PersonBox {
                bbox: BoundingBox {
                    x: d.x,
                    y: d.y,
                    width: d.width,
                    height: d.height,
                },
                confidence: d.confidence,
            })
            .collect();
        non_max_suppression(candidates, self.nms_iou_threshold)
    }
}

impl PersonDetector for SidecarDetector {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, DetectionError> {
        let source = frame
            .source
            .as_deref()
            .ok_or(DetectionError::NoSourcePath(frame.index))?;
        let sidecar = Self::sidecar_path(source);
        let raw = Self::read_sidecar(&sidecar)?;
        let people = self.select_people(&raw);

        trace!(
            frame = frame.index,
            raw = raw.len(),
            kept = people.len(),
            "Sidecar detections filtered"
        );

        let mut annotated = frame.image.clone();
        draw_detections(&mut annotated, &people);
        Ok(DetectionResult::from_boxes(annotated, people))
    }

    fn name(&self) -> &str {
        "sidecar"
    }
}

fn area(b: &BoundingBox) -> f64 {
    f64::from(b.width) * f64::from(b.height)
}

/// Intersection over union of two boxes; 0 when the union is empty.
pub(crate) fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let right = |r: &BoundingBox| i64::from(r.x) + i64::from(r.width);
    let bottom = |r: &BoundingBox| i64::from(r.y) + i64::from(r.height);

    let inter_w = (right(a).min(right(b)) - i64::from(a.x.max(b.x))).max(0);
    let inter_h = (bottom(a).min(bottom(b)) - i64::from(a.y.max(b.y))).max(0);
    let inter = inter_w as f64 * inter_h as f64;

    let union = area(a) + area(b) - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Greedy NMS: highest confidence first, drop anything overlapping a kept box
/// by more than `iou_threshold`.
pub fn non_max_suppression(mut boxes: Vec<PersonBox>, iou_threshold: f32) -> Vec<PersonBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<PersonBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if keep
            .iter()
            .all(|kept| iou(&candidate.bbox, &kept.bbox) <= f64::from(iou_threshold))
        {
            keep.push(candidate);
        }
    }
    keep
}
