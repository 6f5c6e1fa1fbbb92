// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer webcam source (feature `gst`)
//!
//! Captures live frames from a camera through a GStreamer pipeline that
//! converts to RGBA before handing buffers to an appsink. PipeWire is the
//! default capture element; a `/dev/video*` path selects v4l2src instead.

use crate::source::file::pair_from_rgba;
use crate::source::types::{FramePair, StreamInfo};
use crate::source::{FrameSource, SourceError, SourceResult};
use gstreamer::prelude::*;
use image::RgbaImage;
use tracing::{debug, info, warn};

/// Timeout waiting for a single camera frame
const SAMPLE_TIMEOUT_SECS: u64 = 3;

/// Live camera source backed by a GStreamer appsink pipeline
pub struct GstCameraSource {
    /// Optional `/dev/video*` device path; PipeWire default when `None`
    device: Option<String>,
    pipeline: Option<gstreamer::Pipeline>,
    appsink: Option<gstreamer_app::AppSink>,
    width: u32,
    height: u32,
}

impl GstCameraSource {
    /// Create a camera source; `device` selects a V4L2 device path
    pub fn new(device: Option<String>) -> Self {
        Self {
            device,
            pipeline: None,
            appsink: None,
            width: 0,
            height: 0,
        }
    }

    fn capture_element(&self) -> String {
        match &self.device {
            Some(path) => format!("v4l2src device=\"{}\"", path),
            None => "pipewiresrc".to_string(),
        }
    }

    /// Wait for the pipeline to negotiate caps and report the frame size
    fn wait_for_caps(&self) -> SourceResult<(u32, u32)> {
        let appsink = self
            .appsink
            .as_ref()
            .ok_or_else(|| SourceError::Backend("appsink missing".into()))?;

        let deadline =
            std::time::Instant::now() + std::time::Duration::from_secs(SAMPLE_TIMEOUT_SECS * 2);
        while std::time::Instant::now() < deadline {
            if let Some(pad) = appsink.static_pad("sink")
                && let Some(caps) = pad.current_caps()
                && let Some(s) = caps.structure(0)
            {
                let width = s.get::<i32>("width").unwrap_or(0) as u32;
                let height = s.get::<i32>("height").unwrap_or(0) as u32;
                if width > 0 && height > 0 {
                    return Ok((width, height));
                }
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        Err(SourceError::InitializationFailed(
            "timed out negotiating camera caps".into(),
        ))
    }
}

impl FrameSource for GstCameraSource {
    fn open(&mut self) -> SourceResult<StreamInfo> {
        gstreamer::init()
            .map_err(|e| SourceError::InitializationFailed(format!("GStreamer init: {}", e)))?;

        let pipeline_str = format!(
            "{} ! videoconvert ! video/x-raw,format=RGBA ! \
             appsink name=sink max-buffers=1 drop=true sync=false",
            self.capture_element()
        );
        debug!(pipeline = %pipeline_str, "Creating camera pipeline");

        let pipeline = gstreamer::parse::launch(&pipeline_str)
            .map_err(|e| SourceError::InitializationFailed(format!("pipeline: {}", e)))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| SourceError::InitializationFailed("not a pipeline".into()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| SourceError::InitializationFailed("appsink not found".into()))?
            .downcast::<gstreamer_app::AppSink>()
            .map_err(|_| SourceError::InitializationFailed("appsink downcast".into()))?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| SourceError::InitializationFailed(format!("start: {:?}", e)))?;

        self.pipeline = Some(pipeline);
        self.appsink = Some(appsink);

        let (width, height) = match self.wait_for_caps() {
            Ok(dims) => dims,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };
        self.width = width;
        self.height = height;

        let info = StreamInfo {
            name: self
                .device
                .clone()
                .unwrap_or_else(|| "pipewire camera".to_string()),
            width,
            height,
        };
        info!(source = %info, "Camera source opened");
        Ok(info)
    }

    fn next_frame(&mut self) -> SourceResult<Option<FramePair>> {
        let appsink = self
            .appsink
            .as_ref()
            .ok_or_else(|| SourceError::Backend("source not opened".into()))?;

        let Some(sample) =
            appsink.try_pull_sample(gstreamer::ClockTime::from_seconds(SAMPLE_TIMEOUT_SECS))
        else {
            // EOS or a stalled device; either way the stream is over
            warn!("Camera produced no frame within timeout");
            return Ok(None);
        };

        let buffer = sample
            .buffer()
            .ok_or_else(|| SourceError::Backend("sample without buffer".into()))?;
        let map = buffer
            .map_readable()
            .map_err(|_| SourceError::Backend("failed to map buffer".into()))?;

        let rgba = copy_rgba_without_stride(map.as_slice(), self.width, self.height)
            .ok_or_else(|| SourceError::Backend("undersized camera buffer".into()))?;

        Ok(Some(pair_from_rgba(rgba)))
    }

    fn close(&mut self) {
        self.appsink = None;
        if let Some(pipeline) = self.pipeline.take() {
            let _ = pipeline.set_state(gstreamer::State::Null);
            info!("Camera source closed");
        }
    }
}

impl Drop for GstCameraSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Repack an RGBA buffer that may carry row padding into a tight image
fn copy_rgba_without_stride(data: &[u8], width: u32, height: u32) -> Option<RgbaImage> {
    let width = width as usize;
    let height = height as usize;
    let row_bytes = width * 4;
    if height == 0 || data.len() < row_bytes * height {
        return None;
    }
    let stride = data.len() / height;

    let mut packed = Vec::with_capacity(row_bytes * height);
    for y in 0..height {
        let start = y * stride;
        packed.extend_from_slice(&data[start..start + row_bytes]);
    }
    RgbaImage::from_raw(width as u32, height as u32, packed)
}
