// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use qrview::pipeline::detector::Detect;
use qrview::source::FrameSource;
use qrview::{Config, QrDetector, ScanSession, Scanner};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Parser)]
#[command(name = "qrview")]
#[command(about = "Live QR code scanner with quadrangle overlays")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a frame stream and annotate detected codes
    Scan {
        /// Image file or directory of images to stream as frames
        #[arg(short, long, conflicts_with = "camera")]
        input: Option<PathBuf>,

        /// Capture from a live camera (requires the 'gst' build feature)
        #[arg(long)]
        camera: bool,

        /// V4L2 device path for --camera (default: PipeWire)
        #[arg(long, requires = "camera")]
        device: Option<String>,

        /// Directory to write annotated frames into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop after this many frames
        #[arg(long)]
        max_frames: Option<u64>,

        /// Play file input once instead of looping
        #[arg(long)]
        no_loop: bool,

        /// Log decoded payloads instead of showing desktop notifications
        #[arg(long)]
        no_notify: bool,
    },

    /// Detect and print the codes in a single image
    Decode {
        /// Image file to analyze
        image: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=qrview=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default();

    match cli.command {
        Commands::Scan {
            input,
            camera,
            device,
            output,
            max_frames,
            no_loop,
            no_notify,
        } => run_scan(
            &config, input, camera, device, output, max_frames, no_loop, no_notify,
        ),
        Commands::Decode { image } => run_decode(&config, &image),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_scan(
    config: &Config,
    input: Option<PathBuf>,
    camera: bool,
    device: Option<String>,
    output: Option<PathBuf>,
    max_frames: Option<u64>,
    no_loop: bool,
    no_notify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = build_source(config, input, camera, device, no_loop)?;

    let notifier: Box<dyn qrview::notify::Notifier> = if no_notify {
        Box::new(qrview::notify::LogNotifier)
    } else {
        Box::new(qrview::notify::DesktopNotifier)
    };
    let dispatcher = qrview::notify::NotifyDispatcher::spawn(notifier, config.notify_timeout());

    let session = ScanSession::new(
        Box::new(QrDetector::with_max_dimension(config.max_detect_dimension)),
        config.overlay_style(),
        Some(dispatcher),
        config.notify_cooldown(),
    );

    let sink: Box<dyn qrview::sink::FrameSink> = match output {
        Some(dir) => Box::new(qrview::sink::PngDirSink::new(dir)),
        None => Box::new(qrview::sink::NullSink),
    };

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    })?;

    let mut scanner = Scanner::new(source, session, sink, max_frames);
    let stats = scanner.run(stop)?;

    println!(
        "Processed {} frames, decoded {} payloads ({} frames with codes)",
        stats.frames, stats.decoded, stats.frames_with_codes
    );
    Ok(())
}

fn build_source(
    config: &Config,
    input: Option<PathBuf>,
    camera: bool,
    device: Option<String>,
    no_loop: bool,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    if camera {
        return build_camera_source(device);
    }

    let Some(input) = input else {
        return Err("either --input or --camera is required".into());
    };
    Ok(Box::new(qrview::source::file::FileSource::new(
        input,
        config.frame_interval(),
        !no_loop,
    )))
}

#[cfg(feature = "gst")]
fn build_camera_source(
    device: Option<String>,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    Ok(Box::new(qrview::source::gst::GstCameraSource::new(device)))
}

#[cfg(not(feature = "gst"))]
fn build_camera_source(
    _device: Option<String>,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    Err("camera capture not available; rebuild with --features gst".into())
}

fn run_decode(config: &Config, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let img = image::open(path)?;
    let gray = img.to_luma8();
    let frame = qrview::Frame::gray(gray.width(), gray.height(), gray.into_raw());

    let detector = QrDetector::with_max_dimension(config.max_detect_dimension);
    let mut texts = Vec::new();
    let mut corners = Vec::new();
    detector.detect(&frame, &mut texts, &mut corners)?;

    if texts.is_empty() && corners.is_empty() {
        println!("No QR codes found.");
        return Ok(());
    }

    for (index, text) in texts.iter().enumerate() {
        let kind = qrview::pipeline::payload::PayloadKind::classify(text);
        println!("[{}] {} ({})", index, text, kind.label());
    }
    for (index, quad) in corners.chunks(4).enumerate() {
        let formatted: Vec<String> = quad
            .iter()
            .map(|p| format!("({:.0}, {:.0})", p.x, p.y))
            .collect();
        println!("  quad {}: {}", index, formatted.join(" "));
    }
    Ok(())
}
