// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the scan pipeline

use qrview::notify::{Notifier, NotifyDispatcher, NotifyError};
use qrview::pipeline::detector::{Detect, DetectError};
use qrview::pipeline::format_payloads;
use qrview::{CornerPoint, Frame, FramePair, OverlayStyle, QrDetector, ScanSession};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::Duration;

/// Notifier that records every delivery with the thread it arrived on
struct RecordingNotifier {
    log: Arc<Mutex<Vec<(String, String, ThreadId)>>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, summary: &str, body: &str, _timeout: Duration) -> Result<(), NotifyError> {
        self.log.lock().unwrap().push((
            summary.to_string(),
            body.to_string(),
            std::thread::current().id(),
        ));
        Ok(())
    }
}

/// Detector stub that returns fixed payloads and corners
struct FixedDetector {
    texts: Vec<String>,
    corners: Vec<CornerPoint>,
}

impl Detect for FixedDetector {
    fn detect(
        &self,
        _gray: &Frame,
        texts: &mut Vec<String>,
        corners: &mut Vec<CornerPoint>,
    ) -> Result<(), DetectError> {
        texts.clear();
        corners.clear();
        texts.extend(self.texts.iter().cloned());
        corners.extend(self.corners.iter().copied());
        Ok(())
    }
}

/// Detector stub that always fails
struct FailingDetector;

impl Detect for FailingDetector {
    fn detect(
        &self,
        _gray: &Frame,
        texts: &mut Vec<String>,
        corners: &mut Vec<CornerPoint>,
    ) -> Result<(), DetectError> {
        texts.clear();
        corners.clear();
        Err(DetectError::BadFrame("simulated fault".into()))
    }
}

/// A frame pair with a mid-gray gradient so normalization has work to do
fn gradient_pair(width: u32, height: u32) -> FramePair {
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    let mut gray = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let value = 60 + (((x + y) * 120) / (width + height)) as u8;
            rgba.extend_from_slice(&[value, value, value, 255]);
            gray.push(value);
        }
    }
    FramePair {
        rgba: Frame::rgba(width, height, rgba),
        gray: Frame::gray(width, height, gray),
    }
}

fn one_quad() -> Vec<CornerPoint> {
    vec![
        CornerPoint::new(4.0, 4.0),
        CornerPoint::new(4.0, 20.0),
        CornerPoint::new(20.0, 20.0),
        CornerPoint::new(20.0, 4.0),
    ]
}

#[test]
fn decoded_payload_notifies_exactly_once_off_thread() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = NotifyDispatcher::spawn(
        Box::new(RecordingNotifier { log: log.clone() }),
        Duration::from_millis(10),
    );

    let detector = FixedDetector {
        texts: vec!["HELLO".to_string()],
        corners: one_quad(),
    };
    let mut session = ScanSession::new(
        Box::new(detector),
        OverlayStyle::default(),
        Some(dispatcher),
        Duration::ZERO,
    );

    session.on_stream_started(32, 32);
    let mut pair = gradient_pair(32, 32);
    let report = session.on_frame(&mut pair);
    session.on_stream_stopped();
    drop(session); // joins the dispatcher thread, draining the queue

    assert_eq!(report.decoded, 1);
    assert_eq!(report.edges_drawn, 4);
    assert!(report.notified);

    let entries = log.lock().unwrap();
    assert_eq!(entries.len(), 1, "exactly one notification per frame");
    assert_eq!(entries[0].1, "[HELLO]");
    assert_ne!(
        entries[0].2,
        std::thread::current().id(),
        "notification must run on the dispatcher thread"
    );
}

#[test]
fn failing_detector_returns_frame_unmodified_and_keeps_running() {
    let mut session = ScanSession::new(
        Box::new(FailingDetector),
        OverlayStyle::default(),
        None,
        Duration::ZERO,
    );
    session.on_stream_started(16, 16);

    let mut pair = gradient_pair(16, 16);
    let before = pair.rgba.data.clone();
    let report = session.on_frame(&mut pair);
    assert_eq!(report, qrview::FrameReport::default());
    assert_eq!(pair.rgba.data, before, "failed frame must pass through untouched");

    // The session keeps accepting frames after a failure
    let mut next = gradient_pair(16, 16);
    let report = session.on_frame(&mut next);
    assert_eq!(report.decoded, 0);
    session.on_stream_stopped();
}

#[test]
fn malformed_corner_count_skips_drawing_but_not_normalization() {
    let detector = FixedDetector {
        texts: Vec::new(),
        corners: vec![
            CornerPoint::new(1.0, 1.0),
            CornerPoint::new(5.0, 1.0),
            CornerPoint::new(5.0, 5.0),
        ],
    };
    let mut session = ScanSession::new(
        Box::new(detector),
        OverlayStyle::default(),
        None,
        Duration::ZERO,
    );
    session.on_stream_started(16, 16);

    let mut pair = gradient_pair(16, 16);
    let before = pair.rgba.data.clone();
    let report = session.on_frame(&mut pair);

    assert_eq!(report.edges_drawn, 0);
    assert_ne!(pair.rgba.data, before, "normalization still runs");
    session.on_stream_stopped();
}

#[test]
fn inactive_session_passes_frames_through() {
    let mut session = ScanSession::new(
        Box::new(FailingDetector),
        OverlayStyle::default(),
        None,
        Duration::ZERO,
    );

    let mut pair = gradient_pair(8, 8);
    let before = pair.rgba.data.clone();
    let report = session.on_frame(&mut pair);
    assert_eq!(report, qrview::FrameReport::default());
    assert_eq!(pair.rgba.data, before);
}

#[test]
fn stream_stop_is_idempotent() {
    let mut session = ScanSession::new(
        Box::new(FailingDetector),
        OverlayStyle::default(),
        None,
        Duration::ZERO,
    );
    session.on_stream_started(8, 8);
    assert!(session.is_active());

    session.on_stream_stopped();
    assert!(!session.is_active());
    // A second stop must be safe
    session.on_stream_stopped();
    assert!(!session.is_active());
}

#[test]
fn cooldown_suppresses_repeat_payloads() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = NotifyDispatcher::spawn(
        Box::new(RecordingNotifier { log: log.clone() }),
        Duration::from_millis(10),
    );

    let detector = FixedDetector {
        texts: vec!["SAME".to_string()],
        corners: one_quad(),
    };
    let mut session = ScanSession::new(
        Box::new(detector),
        OverlayStyle::default(),
        Some(dispatcher),
        Duration::from_secs(60),
    );
    session.on_stream_started(32, 32);

    let first = session.on_frame(&mut gradient_pair(32, 32));
    let second = session.on_frame(&mut gradient_pair(32, 32));
    session.on_stream_stopped();
    drop(session);

    assert!(first.notified);
    assert!(!second.notified);
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn payload_sequence_form_is_bracketed() {
    assert_eq!(format_payloads(&["HELLO".to_string()]), "[HELLO]");
}

/// Render a QR code into a grayscale frame with a quiet zone
fn synthetic_qr_pair(payload: &str) -> FramePair {
    let code = qrcode::QrCode::new(payload.as_bytes()).expect("encodable payload");
    let modules = code.width();
    let colors = code.to_colors();

    const SCALE: usize = 8;
    const QUIET: usize = 4;
    let side = (modules + 2 * QUIET) * SCALE;

    let mut gray = vec![255u8; side * side];
    for (index, color) in colors.iter().enumerate() {
        if *color == qrcode::Color::Dark {
            let mx = index % modules;
            let my = index / modules;
            for dy in 0..SCALE {
                for dx in 0..SCALE {
                    let x = (QUIET + mx) * SCALE + dx;
                    let y = (QUIET + my) * SCALE + dy;
                    gray[y * side + x] = 0;
                }
            }
        }
    }

    let mut rgba = Vec::with_capacity(side * side * 4);
    for &value in &gray {
        rgba.extend_from_slice(&[value, value, value, 255]);
    }

    let side = side as u32;
    FramePair {
        rgba: Frame::rgba(side, side, rgba),
        gray: Frame::gray(side, side, gray),
    }
}

#[test]
fn real_detector_decodes_and_annotates_a_generated_code() {
    let mut pair = synthetic_qr_pair("HELLO");
    let (width, height) = (pair.gray.width, pair.gray.height);

    let mut session = ScanSession::new(
        Box::new(QrDetector::new()),
        OverlayStyle::default(),
        None,
        Duration::ZERO,
    );
    session.on_stream_started(width, height);
    let report = session.on_frame(&mut pair);
    session.on_stream_stopped();

    assert_eq!(report.decoded, 1);
    assert_eq!(report.edges_drawn, 4, "one closed quadrangle");
}

#[test]
fn real_detector_reports_corners_inside_the_frame() {
    let pair = synthetic_qr_pair("https://example.com");
    let detector = QrDetector::new();
    let mut texts = Vec::new();
    let mut corners = Vec::new();

    detector
        .detect(&pair.gray, &mut texts, &mut corners)
        .expect("synthetic frame should be processable");

    assert_eq!(texts, vec!["https://example.com".to_string()]);
    assert_eq!(corners.len(), 4);
    for corner in &corners {
        assert!(corner.x >= 0.0 && corner.x <= pair.gray.width as f32);
        assert!(corner.y >= 0.0 && corner.y <= pair.gray.height as f32);
    }
}
