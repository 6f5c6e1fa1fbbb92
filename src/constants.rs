// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Overlay stroke defaults
pub mod overlay {
    /// Line color for quadrangle outlines (RGBA, green)
    pub const LINE_COLOR: [u8; 4] = [0, 255, 0, 255];

    /// Stroke width in pixels
    pub const LINE_THICKNESS: u32 = 3;
}

/// Detector defaults
pub mod detector {
    /// Frames larger than this are downscaled before detection.
    /// QR codes are typically large enough to be found at this resolution.
    pub const MAX_DIMENSION: u32 = 640;
}

/// Notification defaults
pub mod notify {
    use std::time::Duration;

    /// How long a desktop notification stays on screen
    pub const TIMEOUT: Duration = Duration::from_millis(3500);

    /// Cooldown between notifications for an identical payload.
    /// Zero keeps the per-frame behavior (notify on every frame).
    pub const COOLDOWN: Duration = Duration::from_millis(0);

    /// Pending notifications the dispatch channel can hold before
    /// further sends are dropped
    pub const CHANNEL_CAPACITY: usize = 8;
}

/// Default interval between frames for paced file sources (~30 fps)
pub const FILE_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Supported input file formats
pub mod file_formats {
    /// Image extensions the file source accepts (lowercase)
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp", "tiff"];

    /// Check if an extension (lowercase, no dot) is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_extension_matching() {
        assert!(file_formats::is_image_extension("png"));
        assert!(file_formats::is_image_extension("jpeg"));
        assert!(!file_formats::is_image_extension("mp4"));
        assert!(!file_formats::is_image_extension(""));
    }
}
