// SPDX-License-Identifier: GPL-3.0-only

//! Scan loop
//!
//! [`Scanner`] wires a frame source, a scan session and a display sink
//! together and runs the synchronous frame loop: one frame in flight at a
//! time, pulled from the source, pushed through the session, handed to the
//! sink. The loop stops on end of stream, on the frame limit, or when the
//! stop flag is raised (normally from a Ctrl-C handler).

use crate::errors::AppResult;
use crate::pipeline::ScanSession;
use crate::sink::FrameSink;
use crate::source::FrameSource;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Aggregate counters for one scan run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Frames pulled from the source
    pub frames: u64,
    /// Total payloads decoded across the run
    pub decoded: u64,
    /// Frames on which at least one code was decoded
    pub frames_with_codes: u64,
}

/// Drives the per-frame pipeline against a source
pub struct Scanner {
    source: Box<dyn FrameSource>,
    session: ScanSession,
    sink: Box<dyn FrameSink>,
    /// Stop after this many frames; `None` runs until the stream ends
    max_frames: Option<u64>,
}

impl Scanner {
    pub fn new(
        source: Box<dyn FrameSource>,
        session: ScanSession,
        sink: Box<dyn FrameSink>,
        max_frames: Option<u64>,
    ) -> Self {
        Self {
            source,
            session,
            sink,
            max_frames,
        }
    }

    /// Run the scan loop until the stream ends or `stop` is raised
    pub fn run(&mut self, stop: Arc<AtomicBool>) -> AppResult<ScanStats> {
        let info = self.source.open()?;
        self.session.on_stream_started(info.width, info.height);

        let mut stats = ScanStats::default();
        loop {
            if stop.load(Ordering::SeqCst) {
                info!("Stop requested");
                break;
            }
            if let Some(max) = self.max_frames
                && stats.frames >= max
            {
                info!(max, "Frame limit reached");
                break;
            }

            let Some(mut pair) = self.source.next_frame()? else {
                info!("End of stream");
                break;
            };

            let report = self.session.on_frame(&mut pair);
            stats.frames += 1;
            stats.decoded += report.decoded as u64;
            if report.decoded > 0 {
                stats.frames_with_codes += 1;
            }

            // Hand the processed color frame back for display; a sink
            // failure degrades display only, never the scan
            if let Err(e) = self.sink.present(&pair.rgba, stats.frames - 1) {
                warn!(error = %e, "Failed to present frame");
            }
        }

        self.session.on_stream_stopped();
        self.source.close();
        info!(
            frames = stats.frames,
            decoded = stats.decoded,
            frames_with_codes = stats.frames_with_codes,
            "Scan finished"
        );
        Ok(stats)
    }
}
