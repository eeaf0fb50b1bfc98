//! Webcam face capture: live filters, face boxes, save-on-keypress

use color_eyre::{eyre::WrapErr, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use facecam::capture::V4l2Capture;
use facecam::detect::SeetaDetector;
use facecam::display::{DisplayError, Sdl2Display};
use facecam::session::Session;
use facecam::{Config, DisplayLoop};

fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("facecam=info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("Facecam launching...");

    // Load configuration
    let config = Config::load().wrap_err("Invalid configuration")?;

    // Windowing library first: nothing else is worth starting without it
    let sdl_context = sdl2::init()
        .map_err(DisplayError::Init)
        .wrap_err("Failed to load SDL2")?;

    let detector = SeetaDetector::load(&config.detector)?;

    let capture = V4l2Capture::open(&config.capture).wrap_err("Error: Camera not accessible")?;
    let (width, height) = capture.resolution();
    info!("Capturing {}x{} {:?}", width, height, capture.format());

    // Key commands are queued here and drained between frames
    let (tx, rx) = flume::unbounded();
    let display = Sdl2Display::new(&sdl_context, &config.display, tx)?;

    let session = Session::new(config.filter, &config.output);
    info!(
        "Saving to {} (space: frame, f: faces, 1-4: filter)",
        session.output_dir().display()
    );

    let mut app = DisplayLoop::new(capture, detector, display, session, rx);
    let exit = app.run()?;
    let metrics = app.metrics();

    // Releases the camera and closes the window
    drop(app);

    info!(
        "Facecam shutting down ({:?}, {} frames, {} faces)",
        exit, metrics.frames_processed, metrics.faces_detected
    );
    Ok(())
}
