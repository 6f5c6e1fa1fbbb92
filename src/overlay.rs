// SPDX-License-Identifier: MPL-2.0

//! Quadrangle overlay rendering
//!
//! Draws the bounding quadrangle of every detected code onto the color
//! frame. Corner points arrive as one flat list, four per code; the edge
//! pairing below connects each block of four into a closed cycle. Malformed
//! point counts (zero, or not a multiple of four) are a defined no-op, not
//! an error.

use crate::constants::overlay as defaults;
use crate::source::types::{Frame, PixelFormat};
use image::{ImageBuffer, Rgba};
use imageproc::drawing::draw_line_segment_mut;
use tracing::{debug, trace};

/// One corner of a detected code's bounding quadrangle, in frame pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerPoint {
    pub x: f32,
    pub y: f32,
}

impl CornerPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Stroke settings for quadrangle outlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStyle {
    /// RGBA line color
    pub color: [u8; 4],
    /// Stroke width in pixels
    pub thickness: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: defaults::LINE_COLOR,
            thickness: defaults::LINE_THICKNESS,
        }
    }
}

/// Index of the corner that `i` connects to.
///
/// The arithmetic runs on the global index across the whole flat list:
/// `i + 1`, except that any index landing on a multiple of four is pulled
/// back to the start of its block, which closes each 4-point cycle.
fn paired_index(i: usize) -> usize {
    let mut i2 = i + 1;
    let diff = if i2 < 4 { 4 - i2 } else { i2 % 4 };
    if diff == 0 {
        i2 -= 4;
    }
    i2
}

/// Draw the outline of every 4-point group onto the frame.
///
/// Mutates `frame` in place and returns the number of edges drawn. Returns
/// without touching the frame when the point count is zero or not a
/// multiple of four, or when the frame is not RGBA.
pub fn draw_quadrangles(frame: &mut Frame, points: &[CornerPoint], style: &OverlayStyle) -> usize {
    let length = points.len();
    if length == 0 || length % 4 != 0 {
        trace!(length, "Skipping overlay for malformed corner set");
        return 0;
    }
    if frame.format != PixelFormat::Rgba {
        debug!(format = %frame.format, "Overlay target is not RGBA, skipping");
        return 0;
    }

    let mut segments = Vec::with_capacity(length);
    for i in 0..length {
        let i2 = paired_index(i);
        segments.push((points[i], points[i2]));
    }

    let width = frame.width;
    let height = frame.height;
    let Some(mut canvas) =
        ImageBuffer::<Rgba<u8>, &mut [u8]>::from_raw(width, height, frame.data.as_mut_slice())
    else {
        debug!(width, height, "Frame buffer does not match geometry, skipping overlay");
        return 0;
    };

    let color = Rgba(style.color);
    for (a, b) in &segments {
        draw_thick_segment(&mut canvas, (a.x, a.y), (b.x, b.y), color, style.thickness);
    }
    segments.len()
}

/// Rasterize one segment with the requested stroke width.
///
/// `draw_line_segment_mut` draws single-pixel lines, so wider strokes are
/// built from parallel lines offset along the segment's normal.
fn draw_thick_segment(
    canvas: &mut ImageBuffer<Rgba<u8>, &mut [u8]>,
    start: (f32, f32),
    end: (f32, f32),
    color: Rgba<u8>,
    thickness: u32,
) {
    let thickness = thickness.max(1);
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let len = (dx * dx + dy * dy).sqrt();

    if len == 0.0 || thickness == 1 {
        draw_line_segment_mut(canvas, start, end, color);
        return;
    }

    let nx = -dy / len;
    let ny = dx / len;
    for k in 0..thickness {
        let offset = k as f32 - (thickness as f32 - 1.0) / 2.0;
        draw_line_segment_mut(
            canvas,
            (start.0 + nx * offset, start.1 + ny * offset),
            (end.0 + nx * offset, end.1 + ny * offset),
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn black_frame(width: u32, height: u32) -> Frame {
        Frame::rgba(width, height, vec![0u8; (width * height * 4) as usize])
    }

    fn unit_quad(offset: f32) -> Vec<CornerPoint> {
        vec![
            CornerPoint::new(offset + 2.0, 2.0),
            CornerPoint::new(offset + 2.0, 12.0),
            CornerPoint::new(offset + 12.0, 12.0),
            CornerPoint::new(offset + 12.0, 2.0),
        ]
    }

    #[test]
    fn pairing_closes_first_block() {
        let pairs: Vec<usize> = (0..4).map(paired_index).collect();
        assert_eq!(pairs, vec![1, 2, 3, 0]);
    }

    #[test]
    fn pairing_closes_second_block() {
        let pairs: Vec<usize> = (4..8).map(paired_index).collect();
        assert_eq!(pairs, vec![5, 6, 7, 4]);
    }

    #[test]
    fn single_quad_draws_four_edges() {
        let mut frame = black_frame(16, 16);
        let before = frame.data.clone();
        let edges = draw_quadrangles(&mut frame, &unit_quad(0.0), &OverlayStyle::default());
        assert_eq!(edges, 4);
        assert_ne!(frame.data, before, "overlay must mutate the frame");
    }

    #[test]
    fn two_quads_draw_eight_edges() {
        let mut frame = black_frame(48, 16);
        let mut points = unit_quad(0.0);
        points.extend(unit_quad(20.0));
        let edges = draw_quadrangles(&mut frame, &points, &OverlayStyle::default());
        assert_eq!(edges, 8);
    }

    #[test]
    fn empty_points_are_a_no_op() {
        let mut frame = black_frame(8, 8);
        let before = frame.data.clone();
        assert_eq!(draw_quadrangles(&mut frame, &[], &OverlayStyle::default()), 0);
        assert_eq!(frame.data, before);
    }

    #[test]
    fn non_multiple_of_four_is_a_no_op() {
        let mut frame = black_frame(8, 8);
        let before = frame.data.clone();
        let points = vec![
            CornerPoint::new(1.0, 1.0),
            CornerPoint::new(5.0, 1.0),
            CornerPoint::new(5.0, 5.0),
        ];
        assert_eq!(
            draw_quadrangles(&mut frame, &points, &OverlayStyle::default()),
            0
        );
        assert_eq!(frame.data, before);
    }

    #[test]
    fn drawing_is_idempotent() {
        let points = unit_quad(0.0);
        let style = OverlayStyle::default();

        let mut once = black_frame(16, 16);
        draw_quadrangles(&mut once, &points, &style);

        let mut twice = black_frame(16, 16);
        draw_quadrangles(&mut twice, &points, &style);
        draw_quadrangles(&mut twice, &points, &style);

        assert_eq!(once.data, twice.data);
    }

    #[test]
    fn stroke_color_lands_on_the_edge() {
        let mut frame = black_frame(16, 16);
        let style = OverlayStyle {
            color: [255, 0, 0, 255],
            thickness: 1,
        };
        draw_quadrangles(&mut frame, &unit_quad(0.0), &style);

        // Top edge of the quad runs through (7, 2)
        let idx = ((2 * 16 + 7) * 4) as usize;
        assert_eq!(&frame.data[idx..idx + 4], &[255, 0, 0, 255]);
    }
}
