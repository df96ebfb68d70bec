//! Frame source abstraction.
//!
//! Provides a unified trait for pulling frames from different capture backends:
//! a directory of still images (replay) or frames pre-loaded in memory.

use async_trait::async_trait;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::Frame;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Events produced by a frame source.
pub enum FrameEvent {
    /// A frame was captured.
    Frame(Frame),
    /// The source has nothing more to give (end of replay, camera closed).
    Eof,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("capture device failure: {0}")]
    Device(String),
}

/// Trait abstracting where frames come from.
///
/// The processing loop awaits [`next_frame`](FrameSource::next_frame) once per
/// tick and calls [`release`](FrameSource::release) exactly once when stopping.
#[async_trait]
pub trait FrameSource: Send {
    /// Capture the next frame, or `FrameEvent::Eof` when exhausted.
    ///
    /// An `Err` means the device is unusable; the loop stops.
    async fn next_frame(&mut self) -> Result<FrameEvent, CaptureError>;

    /// Human-readable name for logging (e.g. "image-dir", "replay").
    fn source_name(&self) -> &str;

    /// Free the capture device.
    async fn release(&mut self) {}
}

// ============================================================================
// Image directory source
// ============================================================================

/// Replays the image files of a directory in file-name order.
pub struct ImageDirSource {
    dir: PathBuf,
    files: std::vec::IntoIter<PathBuf>,
    index: u64,
}

impl ImageDirSource {
    /// Scan `dir` for image files. Fails if the directory cannot be read.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let dir = dir.as_ref().to_path_buf();
        let io_err = |source| CaptureError::Io {
            path: dir.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && is_image(&path) {
                files.push(path);
            }
        }
        files.sort();

        info!(dir = %dir.display(), frames = files.len(), "Image directory source opened");
        Ok(Self {
            dir,
            files: files.into_iter(),
            index: 0,
        })
    }

    /// Frames not yet replayed.
    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

#[async_trait]
impl FrameSource for ImageDirSource {
    async fn next_frame(&mut self) -> Result<FrameEvent, CaptureError> {
        let Some(path) = self.files.next() else {
            return Ok(FrameEvent::Eof);
        };

        let bytes = tokio::fs::read(&path).await.map_err(|source| CaptureError::Io {
            path: path.clone(),
            source,
        })?;
        let image = image::load_from_memory(&bytes)
            .map_err(|source| CaptureError::Decode {
                path: path.clone(),
                source,
            })?
            .to_rgb8();

        let frame = Frame {
            index: self.index,
            source: Some(path),
            image,
        };
        self.index += 1;
        Ok(FrameEvent::Frame(frame))
    }

    fn source_name(&self) -> &str {
        "image-dir"
    }

    async fn release(&mut self) {
        let skipped = self.files.len();
        self.files = Vec::new().into_iter();
        debug!(dir = %self.dir.display(), skipped, "Image directory source released");
    }
}

// ============================================================================
// Replay source (pre-loaded frames)
// ============================================================================

/// Replays frames already held in memory, optionally ending with a capture error.
pub struct ReplaySource {
    frames: std::vec::IntoIter<Frame>,
    failure: Option<CaptureError>,
    released: bool,
}

impl ReplaySource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into_iter(),
            failure: None,
            released: false,
        }
    }

    /// Frames at the given file paths, each a blank `width x height` image.
    pub fn blank_frames(paths: &[PathBuf], width: u32, height: u32) -> Self {
        let frames = paths
            .iter()
            .enumerate()
            .map(|(i, p)| Frame {
                index: i as u64,
                source: Some(p.clone()),
                image: RgbImage::new(width, height),
            })
            .collect();
        Self::new(frames)
    }

    /// Report `err` once the frames run out instead of `Eof`.
    pub fn failing_with(mut self, err: CaptureError) -> Self {
        self.failure = Some(err);
        self
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

#[async_trait]
impl FrameSource for ReplaySource {
    async fn next_frame(&mut self) -> Result<FrameEvent, CaptureError> {
        if let Some(frame) = self.frames.next() {
            return Ok(FrameEvent::Frame(frame));
        }
        match self.failure.take() {
            Some(err) => Err(err),
            None => Ok(FrameEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "replay"
    }

    async fn release(&mut self) {
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, shade: u8) {
        let img = RgbImage::from_pixel(4, 3, image::Rgb([shade, shade, shade]));
        img.save(path).expect("save png");
    }

    #[tokio::test]
    async fn replays_images_in_name_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_png(&dir.path().join("frame_0002.png"), 20);
        write_png(&dir.path().join("frame_0001.png"), 10);
        std::fs::write(dir.path().join("frame_0001.json"), "[]").expect("sidecar");
        std::fs::write(dir.path().join("notes.txt"), "ignored").expect("notes");

        let mut source = ImageDirSource::open(dir.path()).expect("open");
        assert_eq!(source.remaining(), 2);

        let FrameEvent::Frame(first) = source.next_frame().await.expect("frame") else {
            panic!("expected a frame");
        };
        assert_eq!(first.index, 0);
        assert_eq!(first.image.dimensions(), (4, 3));
        assert_eq!(first.image.get_pixel(0, 0).0, [10, 10, 10]);
        assert!(first.source.as_deref().is_some_and(|p| p.ends_with("frame_0001.png")));

        assert!(matches!(source.next_frame().await, Ok(FrameEvent::Frame(f)) if f.index == 1));
        assert!(matches!(source.next_frame().await, Ok(FrameEvent::Eof)));
    }

    #[tokio::test]
    async fn undecodable_image_is_capture_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("broken.png"), b"not a png").expect("write");
        let mut source = ImageDirSource::open(dir.path()).expect("open");
        assert!(matches!(
            source.next_frame().await,
            Err(CaptureError::Decode { .. })
        ));
    }

    #[test]
    fn missing_directory_fails_to_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = ImageDirSource::open(dir.path().join("absent"));
        assert!(matches!(result, Err(CaptureError::Io { .. })));
    }

    #[tokio::test]
    async fn release_drops_pending_frames() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_png(&dir.path().join("a.png"), 1);
        write_png(&dir.path().join("b.png"), 2);
        let mut source = ImageDirSource::open(dir.path()).expect("open");
        source.release().await;
        assert!(matches!(source.next_frame().await, Ok(FrameEvent::Eof)));
    }

    #[tokio::test]
    async fn replay_source_can_end_with_failure() {
        let mut source = ReplaySource::blank_frames(&[PathBuf::from("f.png")], 2, 2)
            .failing_with(CaptureError::Device("unplugged".into()));
        assert!(matches!(source.next_frame().await, Ok(FrameEvent::Frame(_))));
        assert!(matches!(source.next_frame().await, Err(CaptureError::Device(_))));
        assert!(matches!(source.next_frame().await, Ok(FrameEvent::Eof)));
    }
}
