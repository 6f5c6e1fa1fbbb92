// SPDX-License-Identifier: GPL-3.0-only

//! Display sinks
//!
//! After the pipeline has normalized and annotated a frame, the scanner
//! hands it to a sink for display. Headless runs either discard frames
//! ([`NullSink`]) or write them as numbered PNGs to a directory
//! ([`PngDirSink`]) for inspection.

use crate::errors::{AppError, AppResult};
use crate::source::types::{Frame, PixelFormat};
use image::RgbaImage;
use std::path::PathBuf;
use tracing::{debug, info};

/// Receives processed frames for display
pub trait FrameSink {
    /// Present one frame; `index` counts frames from stream start
    fn present(&mut self, frame: &Frame, index: u64) -> AppResult<()>;
}

/// Discards frames
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _frame: &Frame, _index: u64) -> AppResult<()> {
        Ok(())
    }
}

/// Writes each frame as `frame_NNNNN.png` under a directory
pub struct PngDirSink {
    dir: PathBuf,
    created: bool,
}

impl PngDirSink {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            created: false,
        }
    }
}

impl FrameSink for PngDirSink {
    fn present(&mut self, frame: &Frame, index: u64) -> AppResult<()> {
        if frame.format != PixelFormat::Rgba {
            return Err(AppError::Storage(format!(
                "cannot save {} frame as PNG",
                frame.format
            )));
        }

        if !self.created {
            std::fs::create_dir_all(&self.dir)?;
            self.created = true;
            info!(dir = %self.dir.display(), "Writing annotated frames");
        }

        let path = self.dir.join(format!("frame_{:05}.png", index));
        let image = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| AppError::Storage("frame buffer does not match geometry".into()))?;
        image
            .save(&path)
            .map_err(|e| AppError::Storage(format!("saving '{}': {}", path.display(), e)))?;

        debug!(path = %path.display(), "Frame saved");
        Ok(())
    }
}
