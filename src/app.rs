//! The capture-process-display loop

use flume::Receiver;
use tracing::{debug, info, instrument};

use crate::annotate;
use crate::capture::Frame;
use crate::detect::FaceDetector;
use crate::display::{DisplayError, Surface};
use crate::filter;
use crate::session::{Command, CommandOutcome, Session};
use crate::Metrics;

/// Why the loop stopped; both are clean shutdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    EndOfStream,
    Closed,
}

/// Drives one session: source -> filter -> detect -> annotate -> present,
/// then drains queued commands against the frame just shown.
///
/// The loop owns the source, so the camera is released when the loop is
/// dropped no matter how [`DisplayLoop::run`] returned.
pub struct DisplayLoop<S, D, W> {
    source: S,
    detector: D,
    surface: W,
    session: Session,
    commands: Receiver<Command>,
    current: Option<Frame>,
    metrics: Metrics,
}

impl<S, D, W> DisplayLoop<S, D, W>
where
    S: Iterator<Item = Frame>,
    D: FaceDetector,
    W: Surface,
{
    pub fn new(
        source: S,
        detector: D,
        surface: W,
        session: Session,
        commands: Receiver<Command>,
    ) -> Self {
        Self {
            source,
            detector,
            surface,
            session,
            commands,
            current: None,
            metrics: Metrics::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    /// The last completed frame, as shown and as a save would see it
    pub fn current_frame(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    /// Run until the source ends or the window is closed
    pub fn run(&mut self) -> Result<LoopExit, DisplayError> {
        info!("Entering display loop with filter {}", self.session.filter());

        let exit = loop {
            // Commands queued before the first frame still apply to it
            if self.drain_commands() {
                break LoopExit::Closed;
            }

            if !self.step()? {
                info!("Frame source exhausted");
                break LoopExit::EndOfStream;
            }

            self.surface.pump_events();
            if self.drain_commands() {
                break LoopExit::Closed;
            }
        };

        info!(
            "Display loop finished ({:?}) after {} frames",
            exit, self.metrics.frames_processed
        );
        Ok(exit)
    }

    /// Process and show one frame. Returns `false` at end of stream.
    #[instrument(skip(self))]
    pub fn step(&mut self) -> Result<bool, DisplayError> {
        // Drop the previous frame before pulling the next one
        self.current = None;

        let Some(frame) = self.source.next() else {
            return Ok(false);
        };

        let mut frame = filter::apply(self.session.filter(), frame);
        let rects = self.detector.detect(&frame);
        annotate::draw(&mut frame, &rects);

        self.surface.present(&frame)?;

        metrics::histogram!("frame_latency_ms")
            .record(frame.timestamp.elapsed().as_secs_f64() * 1000.0);
        metrics::counter!("frames_processed").increment(1);
        metrics::counter!("faces_detected").increment(rects.len() as u64);
        self.metrics.frames_processed += 1;
        self.metrics.faces_detected += rects.len() as u64;
        debug!(
            "Frame {} shown with {} faces",
            frame.meta.sequence,
            rects.len()
        );

        self.current = Some(frame);
        Ok(true)
    }

    /// Handle every queued command in arrival order. Returns `true` on quit.
    pub fn drain_commands(&mut self) -> bool {
        while let Ok(command) = self.commands.try_recv() {
            self.metrics.commands_handled += 1;
            let outcome =
                self.session
                    .handle(command, self.current.as_ref(), &mut self.detector);
            if outcome == CommandOutcome::Quit {
                return true;
            }
        }
        false
    }
}
