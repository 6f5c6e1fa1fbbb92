// SPDX-License-Identifier: GPL-3.0-only

//! File-backed frame source
//!
//! Streams still images (a single file or every image in a directory) as
//! camera-style frames, optionally looping forever. Frames are paced at a
//! configurable interval so the pipeline sees a realistic frame rate, and
//! every frame is resized to the resolution negotiated from the first
//! image so the stream keeps a constant geometry.

use crate::constants::file_formats;
use crate::source::types::{Frame, FramePair, StreamInfo};
use crate::source::{FrameSource, SourceError, SourceResult};
use image::RgbaImage;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Frame source backed by image files
pub struct FileSource {
    input: PathBuf,
    frame_interval: Duration,
    loop_frames: bool,
    paths: Vec<PathBuf>,
    next_index: usize,
    /// Negotiated stream geometry, set by `open`
    geometry: Option<(u32, u32)>,
    last_frame_at: Option<Instant>,
}

impl FileSource {
    /// Create a source for an image file or a directory of images
    pub fn new(input: PathBuf, frame_interval: Duration, loop_frames: bool) -> Self {
        Self {
            input,
            frame_interval,
            loop_frames,
            paths: Vec::new(),
            next_index: 0,
            geometry: None,
            last_frame_at: None,
        }
    }

    /// Collect the image paths behind `input`, sorted for a stable order
    fn collect_paths(input: &Path) -> SourceResult<Vec<PathBuf>> {
        if !input.exists() {
            return Err(SourceError::NotFound(input.display().to_string()));
        }

        if input.is_file() {
            if !has_image_extension(input) {
                return Err(SourceError::Unsupported(input.display().to_string()));
            }
            return Ok(vec![input.to_path_buf()]);
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(input)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(SourceError::Unsupported(format!(
                "no image files in {}",
                input.display()
            )));
        }
        Ok(paths)
    }

    /// Load one image and convert it to a frame pair at the stream geometry
    fn load_pair(&self, path: &Path) -> SourceResult<FramePair> {
        let (width, height) = self
            .geometry
            .ok_or_else(|| SourceError::Backend("source not opened".into()))?;

        let img = image::open(path).map_err(|e| {
            SourceError::Backend(format!("failed to load '{}': {}", path.display(), e))
        })?;

        let mut rgba = img.to_rgba8();
        if rgba.width() != width || rgba.height() != height {
            debug!(
                path = %path.display(),
                from_width = rgba.width(),
                from_height = rgba.height(),
                width,
                height,
                "Resizing frame to stream geometry"
            );
            rgba = image::imageops::resize(&rgba, width, height, FilterType::Triangle);
        }

        Ok(pair_from_rgba(rgba))
    }
}

impl FrameSource for FileSource {
    fn open(&mut self) -> SourceResult<StreamInfo> {
        self.paths = Self::collect_paths(&self.input)?;
        self.next_index = 0;
        self.last_frame_at = None;

        // The first image fixes the stream resolution
        let first = &self.paths[0];
        let (width, height) = image::image_dimensions(first).map_err(|e| {
            SourceError::InitializationFailed(format!(
                "failed to read '{}': {}",
                first.display(),
                e
            ))
        })?;
        self.geometry = Some((width, height));

        let info = StreamInfo {
            name: self.input.display().to_string(),
            width,
            height,
        };
        info!(
            source = %info,
            frames = self.paths.len(),
            looped = self.loop_frames,
            "File source opened"
        );
        Ok(info)
    }

    fn next_frame(&mut self) -> SourceResult<Option<FramePair>> {
        // Pace the stream so consumers see a steady frame interval
        if let Some(last) = self.last_frame_at {
            let elapsed = last.elapsed();
            if elapsed < self.frame_interval {
                std::thread::sleep(self.frame_interval - elapsed);
            }
        }
        self.last_frame_at = Some(Instant::now());

        // One unreadable file should not end a directory stream; give up
        // only after every remaining path failed in a row.
        for _ in 0..self.paths.len() {
            if self.next_index >= self.paths.len() {
                if !self.loop_frames {
                    return Ok(None);
                }
                self.next_index = 0;
            }

            let path = self.paths[self.next_index].clone();
            self.next_index += 1;

            match self.load_pair(&path) {
                Ok(pair) => return Ok(Some(pair)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable frame");
                }
            }
        }

        if self.next_index >= self.paths.len() && !self.loop_frames {
            return Ok(None);
        }
        Err(SourceError::Backend("no readable frames left".into()))
    }

    fn close(&mut self) {
        if self.geometry.take().is_some() {
            info!(input = %self.input.display(), "File source closed");
        }
        self.paths.clear();
        self.next_index = 0;
        self.last_frame_at = None;
    }
}

/// Build the color + grayscale pair from a packed RGBA image
pub(crate) fn pair_from_rgba(rgba: RgbaImage) -> FramePair {
    let width = rgba.width();
    let height = rgba.height();
    let gray = image::imageops::grayscale(&rgba);

    FramePair {
        rgba: Frame::rgba(width, height, rgba.into_raw()),
        gray: Frame::gray(width, height, gray.into_raw()),
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| file_formats::is_image_extension(&e.to_lowercase()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::types::PixelFormat;

    #[test]
    fn pair_from_rgba_builds_both_representations() {
        let rgba = RgbaImage::from_pixel(4, 2, image::Rgba([255, 0, 0, 255]));
        let pair = pair_from_rgba(rgba);

        assert_eq!(pair.rgba.format, PixelFormat::Rgba);
        assert_eq!(pair.gray.format, PixelFormat::Gray8);
        assert_eq!(pair.rgba.data.len(), 4 * 2 * 4);
        assert_eq!(pair.gray.data.len(), 4 * 2);
        assert!(pair.rgba.is_well_formed());
        assert!(pair.gray.is_well_formed());
    }

    #[test]
    fn missing_input_is_reported() {
        let mut source = FileSource::new(
            PathBuf::from("/nonexistent/qrview-test"),
            Duration::from_millis(0),
            false,
        );
        assert!(matches!(source.open(), Err(SourceError::NotFound(_))));
    }
}
