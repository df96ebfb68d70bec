//! Processing Pipeline Module
//!
//! ```text
//! capture ──► detect ──► alert (count >= 1, outside cooldown) ──► log ──► render
//!    │           │                                                  │
//!  Eof/err    failure: skip rest of tick                  always, even on alert failure
//!    ▼
//! Stopping ──► release source ──► Stopped
//! ```

pub mod processing_loop;
pub mod render;
pub mod source;
mod state;

pub use processing_loop::{BusIdentity, ProcessingLoop};
pub use render::{FrameSink, NullSink, RenderError, SnapshotSink};
pub use source::{CaptureError, FrameEvent, FrameSource, ImageDirSource, ReplaySource};
pub use state::*;
