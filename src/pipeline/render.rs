//! Where annotated frames go after each tick.

use image::{ImageFormat, RgbImage};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to write snapshot {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to replace snapshot {}: {source}", path.display())]
    Rename {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Display surface for the debug overlay.
pub trait FrameSink: Send {
    fn show(&mut self, frame: &RgbImage) -> Result<(), RenderError>;
}

/// Discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn show(&mut self, _frame: &RgbImage) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Keeps the most recent annotated frame as a PNG on disk.
///
/// The image is written next to the target and renamed over it, so readers
/// never see a half-written file.
#[derive(Debug)]
pub struct SnapshotSink {
    path: PathBuf,
    staging: PathBuf,
    written: u64,
}

impl SnapshotSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut staging = path.clone().into_os_string();
        staging.push(".partial");
        Self {
            path,
            staging: PathBuf::from(staging),
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshots written so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for SnapshotSink {
    fn show(&mut self, frame: &RgbImage) -> Result<(), RenderError> {
        frame
            .save_with_format(&self.staging, ImageFormat::Png)
            .map_err(|source| RenderError::Write {
                path: self.staging.clone(),
                source,
            })?;
        std::fs::rename(&self.staging, &self.path).map_err(|source| RenderError::Rename {
            path: self.path.clone(),
            source,
        })?;
        self.written += 1;
        Ok(())
    }
}
