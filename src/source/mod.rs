// SPDX-License-Identifier: GPL-3.0-only

//! Frame source abstraction
//!
//! A frame source supplies a continuous sequence of frames in two
//! representations (color and grayscale) at a negotiated resolution. The
//! scan loop pulls frames one at a time, so a source never sees overlapping
//! requests.
//!
//! Implementations:
//! - [`file::FileSource`]: still images or a directory of images, looped
//! - `gst::GstCameraSource`: live webcam via GStreamer (feature `gst`)

pub mod file;
#[cfg(feature = "gst")]
pub mod gst;
pub mod types;

use self::types::{FramePair, StreamInfo};

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Error types for frame source operations
#[derive(Debug, Clone)]
pub enum SourceError {
    /// Input file or device does not exist
    NotFound(String),
    /// Input exists but is not a supported format
    Unsupported(String),
    /// Source failed to initialize
    InitializationFailed(String),
    /// Backend error while streaming (decoder fault, device lost)
    Backend(String),
    /// General I/O error
    Io(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::NotFound(msg) => write!(f, "Input not found: {}", msg),
            SourceError::Unsupported(msg) => write!(f, "Unsupported input: {}", msg),
            SourceError::InitializationFailed(msg) => {
                write!(f, "Source initialization failed: {}", msg)
            }
            SourceError::Backend(msg) => write!(f, "Source backend error: {}", msg),
            SourceError::Io(msg) => write!(f, "Source I/O error: {}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err.to_string())
    }
}

/// A source of camera-style frames
///
/// Lifecycle: `open` negotiates the stream, `next_frame` is called
/// repeatedly from a single thread, `close` releases backend resources.
/// `close` must be safe to call more than once.
pub trait FrameSource {
    /// Open the source and negotiate the stream resolution
    fn open(&mut self) -> SourceResult<StreamInfo>;

    /// Pull the next frame pair; `Ok(None)` signals end of stream
    fn next_frame(&mut self) -> SourceResult<Option<FramePair>>;

    /// Release backend resources
    fn close(&mut self);
}
