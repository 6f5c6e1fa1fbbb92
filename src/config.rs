// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON under the platform config directory
//! (`~/.config/qrview/config.json` on Linux). Unknown or missing fields
//! fall back to defaults so older config files keep loading.

use crate::constants;
use crate::errors::{AppError, AppResult};
use crate::overlay::OverlayStyle;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overlay line color (RGBA)
    pub overlay_color: [u8; 4],
    /// Overlay stroke width in pixels
    pub overlay_thickness: u32,
    /// Frames larger than this are downscaled before detection
    pub max_detect_dimension: u32,
    /// Interval between frames for paced file sources (milliseconds)
    pub frame_interval_ms: u64,
    /// How long a notification stays on screen (milliseconds)
    pub notify_timeout_ms: u64,
    /// Repeat-payload notification cooldown (milliseconds, 0 = off)
    pub notify_cooldown_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            overlay_color: constants::overlay::LINE_COLOR,
            overlay_thickness: constants::overlay::LINE_THICKNESS,
            max_detect_dimension: constants::detector::MAX_DIMENSION,
            frame_interval_ms: constants::FILE_FRAME_INTERVAL.as_millis() as u64,
            notify_timeout_ms: constants::notify::TIMEOUT.as_millis() as u64,
            notify_cooldown_ms: constants::notify::COOLDOWN.as_millis() as u64,
        }
    }
}

impl Config {
    /// Platform path of the config file
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qrview").join("config.json"))
    }

    /// Load the config file, falling back to defaults when it is missing
    /// or unreadable
    pub fn load_or_default() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist the config file, creating the directory if needed
    pub fn save(&self) -> AppResult<()> {
        let path =
            Self::path().ok_or_else(|| AppError::Config("no config directory".to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(&path, contents)?;
        Ok(())
    }

    pub fn overlay_style(&self) -> OverlayStyle {
        OverlayStyle {
            color: self.overlay_color,
            thickness: self.overlay_thickness,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }

    pub fn notify_cooldown(&self) -> Duration {
        Duration::from_millis(self.notify_cooldown_ms)
    }
}
