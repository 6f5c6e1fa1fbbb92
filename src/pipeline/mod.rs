// SPDX-License-Identifier: MPL-2.0

//! Per-frame scan pipeline
//!
//! [`ScanSession`] owns everything with active-stream lifetime: the
//! detector, the overlay style, the notification dispatcher and the
//! scratch buffers that are reused across frames. A session is inert until
//! `on_stream_started` and releases its buffers exactly once on
//! `on_stream_stopped`.
//!
//! Per frame: detect on the grayscale buffer, normalize the color buffer,
//! draw the detected quadrangles, and dispatch a notification when any
//! payload decoded. A detector failure is confined to that frame; the
//! color buffer is handed back untouched and the session keeps going.

pub mod detector;
pub mod normalize;
pub mod payload;

use crate::notify::NotifyDispatcher;
use crate::overlay::{CornerPoint, OverlayStyle, draw_quadrangles};
use crate::source::types::FramePair;
use self::detector::Detect;
use self::payload::PayloadKind;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What one frame produced, for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Payloads decoded this frame
    pub decoded: usize,
    /// Overlay edges drawn this frame
    pub edges_drawn: usize,
    /// Whether a notification was dispatched
    pub notified: bool,
}

/// Scratch state allocated while a stream is active
struct StreamState {
    width: u32,
    height: u32,
    /// Decoded payload scratch, overwritten every frame
    texts: Vec<String>,
    /// Corner point scratch, overwritten every frame
    corners: Vec<CornerPoint>,
}

/// Scan pipeline session
///
/// Created around a detector and destroyed when scanning ends; all
/// stream-scoped state lives here rather than in globals.
pub struct ScanSession {
    detector: Box<dyn Detect>,
    style: OverlayStyle,
    notify: Option<NotifyDispatcher>,
    /// Suppress repeat notifications of an identical payload inside this
    /// window; zero disables suppression
    notify_cooldown: Duration,
    last_notified: Option<(String, Instant)>,
    stream: Option<StreamState>,
}

impl ScanSession {
    /// Create a session; `notify` is `None` for fully silent runs
    pub fn new(
        detector: Box<dyn Detect>,
        style: OverlayStyle,
        notify: Option<NotifyDispatcher>,
        notify_cooldown: Duration,
    ) -> Self {
        Self {
            detector,
            style,
            notify,
            notify_cooldown,
            last_notified: None,
            stream: None,
        }
    }

    /// Whether a stream is currently active
    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Allocate per-stream scratch for the negotiated resolution
    pub fn on_stream_started(&mut self, width: u32, height: u32) {
        if self.stream.is_some() {
            warn!("Stream started twice without a stop, resetting scratch");
        }
        info!(width, height, "Scan stream started");
        self.stream = Some(StreamState {
            width,
            height,
            texts: Vec::new(),
            corners: Vec::new(),
        });
    }

    /// Release per-stream scratch; safe to call more than once
    pub fn on_stream_stopped(&mut self) {
        if self.stream.take().is_some() {
            info!("Scan stream stopped");
        }
        self.last_notified = None;
    }

    /// Process one frame in place and report what happened.
    ///
    /// The color buffer in `frame` is the display output: normalized and
    /// annotated on success, untouched when detection fails or the session
    /// is inactive.
    pub fn on_frame(&mut self, frame: &mut FramePair) -> FrameReport {
        let Some(stream) = self.stream.as_mut() else {
            warn!("Frame received while inactive, passing through");
            return FrameReport::default();
        };

        if frame.rgba.width != stream.width || frame.rgba.height != stream.height {
            debug!(
                width = frame.rgba.width,
                height = frame.rgba.height,
                stream_width = stream.width,
                stream_height = stream.height,
                "Frame geometry differs from negotiated stream"
            );
        }

        // A failing detector degrades this frame only
        if let Err(e) =
            self.detector
                .detect(&frame.gray, &mut stream.texts, &mut stream.corners)
        {
            warn!(error = %e, "Detection failed, returning frame unmodified");
            return FrameReport::default();
        }

        normalize::normalize_minmax(&mut frame.rgba.data);

        let edges_drawn = draw_quadrangles(&mut frame.rgba, &stream.corners, &self.style);

        let decoded = stream.texts.len();
        let mut notified = false;
        if decoded > 0 {
            let body = format_payloads(&stream.texts);
            let kind = PayloadKind::classify(&stream.texts[0]);
            info!(count = decoded, kind = %kind, payloads = %body, "Decoded");

            if self.should_notify(&body) {
                if let Some(dispatcher) = &self.notify {
                    dispatcher.dispatch(format!("QR code ({})", kind.label()), body.clone());
                    notified = true;
                }
                self.last_notified = Some((body, Instant::now()));
            }
        }

        FrameReport {
            decoded,
            edges_drawn,
            notified,
        }
    }

    /// Apply the repeat-payload cooldown
    fn should_notify(&self, body: &str) -> bool {
        if self.notify_cooldown.is_zero() {
            return true;
        }
        match &self.last_notified {
            Some((last, at)) => last != body || at.elapsed() >= self.notify_cooldown,
            None => true,
        }
    }
}

/// Bracketed sequence form of the decoded payloads, e.g. `[HELLO]`
pub fn format_payloads(texts: &[String]) -> String {
    format!("[{}]", texts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_formatting_matches_sequence_form() {
        assert_eq!(format_payloads(&["HELLO".to_string()]), "[HELLO]");
        assert_eq!(
            format_payloads(&["A".to_string(), "B".to_string()]),
            "[A, B]"
        );
        assert_eq!(format_payloads(&[]), "[]");
    }
}
