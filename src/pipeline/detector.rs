// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection
//!
//! Wraps the rqrr detector behind a small trait so the pipeline can be
//! exercised with a fake detector in tests. Detection reads the grayscale
//! frame, writes decoded payloads and corner points into caller-supplied
//! scratch buffers, and reports failures as values rather than panics.
//!
//! Large frames are downscaled before detection and the corner coordinates
//! scaled back to full-frame space; QR finder patterns survive the
//! resolution loss and detection cost drops sharply.

use crate::overlay::CornerPoint;
use crate::source::types::{Frame, PixelFormat};
use image::GrayImage;
use image::imageops::FilterType;
use std::time::Instant;
use tracing::{debug, trace};

/// Errors produced while analyzing one frame
#[derive(Debug, Clone)]
pub enum DetectError {
    /// The frame buffer does not match its declared geometry
    BadFrame(String),
    /// The frame is not in the format the detector consumes
    WrongFormat(String),
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectError::BadFrame(msg) => write!(f, "Malformed frame: {}", msg),
            DetectError::WrongFormat(msg) => write!(f, "Wrong frame format: {}", msg),
        }
    }
}

impl std::error::Error for DetectError {}

/// Frame analyzer that locates and decodes codes
///
/// Decoded payloads go to `texts`, bounding corners to `corners` (four per
/// located code, flat). Both buffers are cleared first. A code that is
/// located but fails to decode still contributes its corners, so the two
/// outputs are parallel in spirit but not length-matched.
pub trait Detect {
    fn detect(
        &self,
        gray: &Frame,
        texts: &mut Vec<String>,
        corners: &mut Vec<CornerPoint>,
    ) -> Result<(), DetectError>;
}

/// QR code detector backed by rqrr
pub struct QrDetector {
    /// Maximum dimension for processing (larger frames are downscaled)
    max_dimension: u32,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    /// Create a detector with the default processing resolution
    pub fn new() -> Self {
        Self {
            max_dimension: crate::constants::detector::MAX_DIMENSION,
        }
    }

    /// Create a detector with a custom max dimension (0 disables downscaling)
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension }
    }
}

impl Detect for QrDetector {
    fn detect(
        &self,
        gray: &Frame,
        texts: &mut Vec<String>,
        corners: &mut Vec<CornerPoint>,
    ) -> Result<(), DetectError> {
        texts.clear();
        corners.clear();

        if gray.format != PixelFormat::Gray8 {
            return Err(DetectError::WrongFormat(format!(
                "expected GRAY8, got {}",
                gray.format
            )));
        }
        if !gray.is_well_formed() {
            return Err(DetectError::BadFrame(format!(
                "{} bytes for {}x{}",
                gray.data.len(),
                gray.width,
                gray.height
            )));
        }
        if gray.width == 0 || gray.height == 0 {
            return Err(DetectError::BadFrame("empty frame".into()));
        }

        let start = Instant::now();

        // Downscale oversized frames; corners are mapped back afterwards
        let (image, scale) = prepare_input(gray, self.max_dimension);
        let (proc_width, proc_height) = image.dimensions();

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            proc_width as usize,
            proc_height as usize,
            |x, y| image.get_pixel(x as u32, y as u32).0[0],
        );

        let grids = prepared.detect_grids();
        trace!(
            count = grids.len(),
            proc_width,
            proc_height,
            scale,
            elapsed_ms = start.elapsed().as_millis(),
            "Grid detection complete"
        );

        for grid in grids {
            for point in &grid.bounds {
                corners.push(CornerPoint::new(
                    point.x as f32 * scale,
                    point.y as f32 * scale,
                ));
            }

            match grid.decode() {
                Ok((_meta, content)) => {
                    debug!(content = %content, "Decoded QR code");
                    texts.push(content);
                }
                Err(e) => {
                    // Located but undecodable; keep the quadrangle anyway
                    debug!(error = %e, "Failed to decode located code");
                }
            }
        }

        Ok(())
    }
}

/// Build the detection input, downscaling when the frame exceeds `max_dimension`
///
/// Returns the grayscale image to scan and the factor that maps detection
/// coordinates back to full-frame coordinates.
fn prepare_input(gray: &Frame, max_dimension: u32) -> (GrayImage, f32) {
    let width = gray.width;
    let height = gray.height;

    // from_raw only fails on a size mismatch, which is_well_formed rules out
    let image = GrayImage::from_raw(width, height, gray.data.clone())
        .unwrap_or_else(|| GrayImage::new(width, height));

    if max_dimension == 0 || (width <= max_dimension && height <= max_dimension) {
        return (image, 1.0);
    }

    let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
    let new_width = ((width as f32 / scale) as u32).max(1);
    let new_height = ((height as f32 / scale) as u32).max(1);
    let resized = image::imageops::resize(&image, new_width, new_height, FilterType::Triangle);
    (resized, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_frame_finds_nothing() {
        let gray = Frame::gray(64, 64, vec![255u8; 64 * 64]);
        let detector = QrDetector::new();
        let mut texts = Vec::new();
        let mut corners = Vec::new();

        detector
            .detect(&gray, &mut texts, &mut corners)
            .expect("blank frame should be processable");
        assert!(texts.is_empty());
        assert!(corners.is_empty());
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let gray = Frame::gray(64, 64, vec![0u8; 100]);
        let detector = QrDetector::new();
        let mut texts = Vec::new();
        let mut corners = Vec::new();

        let result = detector.detect(&gray, &mut texts, &mut corners);
        assert!(matches!(result, Err(DetectError::BadFrame(_))));
    }

    #[test]
    fn rgba_frame_is_rejected() {
        let rgba = Frame::rgba(8, 8, vec![0u8; 8 * 8 * 4]);
        let detector = QrDetector::new();
        let mut texts = Vec::new();
        let mut corners = Vec::new();

        let result = detector.detect(&rgba, &mut texts, &mut corners);
        assert!(matches!(result, Err(DetectError::WrongFormat(_))));
    }

    #[test]
    fn detect_clears_stale_scratch() {
        let gray = Frame::gray(32, 32, vec![128u8; 32 * 32]);
        let detector = QrDetector::new();
        let mut texts = vec!["stale".to_string()];
        let mut corners = vec![CornerPoint::new(1.0, 1.0)];

        detector
            .detect(&gray, &mut texts, &mut corners)
            .expect("frame should be processable");
        assert!(texts.is_empty());
        assert!(corners.is_empty());
    }

    #[test]
    fn downscale_keeps_aspect() {
        let gray = Frame::gray(1280, 720, vec![0u8; 1280 * 720]);
        let (image, scale) = prepare_input(&gray, 640);
        assert_eq!(image.width(), 640);
        assert_eq!(image.height(), 360);
        assert!((scale - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn small_frames_are_not_downscaled() {
        let gray = Frame::gray(320, 240, vec![0u8; 320 * 240]);
        let (image, scale) = prepare_input(&gray, 640);
        assert_eq!(image.dimensions(), (320, 240));
        assert_eq!(scale, 1.0);
    }
}
