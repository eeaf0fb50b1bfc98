//! Per-run state and keyboard command handling

pub mod command;

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::capture::Frame;
use crate::detect::FaceDetector;
use crate::filter::FilterMode;
use crate::OutputConfig;

pub use command::Command;

/// Filename timestamp pattern, second granularity
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to write {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// What a handled command did, for the caller and for tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Saved(Vec<PathBuf>),
    FilterChanged(FilterMode),
    /// A save was requested before any frame was captured
    NoFrame,
    /// A save failed; already logged
    Failed,
    Quit,
}

/// Explicit session context: the active filter and where saves go.
///
/// Passed to every loop iteration and every command, replacing process-wide
/// state. The frame is borrowed per call and never retained.
#[derive(Debug, Clone)]
pub struct Session {
    filter: FilterMode,
    output_dir: PathBuf,
    jpeg_quality: u8,
}

impl Session {
    pub fn new(filter: FilterMode, output: &OutputConfig) -> Self {
        Self {
            filter,
            output_dir: output.directory.clone(),
            jpeg_quality: output.jpeg_quality,
        }
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn handle<D: FaceDetector + ?Sized>(
        &mut self,
        command: Command,
        frame: Option<&Frame>,
        detector: &mut D,
    ) -> CommandOutcome {
        self.handle_at(command, frame, detector, Local::now().naive_local())
    }

    /// Handle `command` as if issued at `now`
    pub fn handle_at<D: FaceDetector + ?Sized>(
        &mut self,
        command: Command,
        frame: Option<&Frame>,
        detector: &mut D,
        now: NaiveDateTime,
    ) -> CommandOutcome {
        let stamp = timestamp(now);

        match command {
            Command::Quit => CommandOutcome::Quit,
            Command::SelectFilter(mode) => {
                self.filter = mode;
                info!("Filter changed to: {}", mode);
                CommandOutcome::FilterChanged(mode)
            }
            Command::SaveFull | Command::SaveFaces => {
                let Some(frame) = frame else {
                    warn!("No frame captured yet, ignoring {:?}", command);
                    return CommandOutcome::NoFrame;
                };

                let result = if command == Command::SaveFull {
                    self.save_full(frame, &stamp).map(|path| vec![path])
                } else {
                    self.save_faces(frame, detector, &stamp)
                };

                match result {
                    Ok(paths) => CommandOutcome::Saved(paths),
                    Err(e) => {
                        metrics::counter!("save_failures").increment(1);
                        error!("Save abandoned: {}", e);
                        CommandOutcome::Failed
                    }
                }
            }
        }
    }

    /// Write the whole frame as it currently is, annotations and filter included
    pub fn save_full(&self, frame: &Frame, stamp: &str) -> Result<PathBuf, SaveError> {
        let path = self.output_dir.join(format!("capture_{}.jpg", stamp));
        frame
            .save_jpeg(&path, self.jpeg_quality)
            .map_err(|source| SaveError::Encode {
                path: path.clone(),
                source,
            })?;

        metrics::counter!("frames_saved").increment(1);
        info!("Full image saved as: {}", path.display());
        Ok(path)
    }

    /// Run a fresh detection on `frame` and write one crop per face,
    /// numbered from 1 in detection order
    pub fn save_faces<D: FaceDetector + ?Sized>(
        &self,
        frame: &Frame,
        detector: &mut D,
        stamp: &str,
    ) -> Result<Vec<PathBuf>, SaveError> {
        let faces = detector.detect(frame);
        if faces.is_empty() {
            info!("No faces to save");
        }

        let mut saved = Vec::with_capacity(faces.len());
        for (i, rect) in faces.iter().enumerate() {
            let index = i + 1;
            let Some(crop) = frame.crop(rect) else {
                warn!("Face {} at {:?} lies outside the frame, skipped", index, rect);
                continue;
            };

            let path = self
                .output_dir
                .join(format!("face_{}_{}.jpg", stamp, index));
            crop.save_jpeg(&path, self.jpeg_quality)
                .map_err(|source| SaveError::Encode {
                    path: path.clone(),
                    source,
                })?;

            metrics::counter!("faces_saved").increment(1);
            info!("Face {} saved as: {}", index, path.display());
            saved.push(path);
        }

        Ok(saved)
    }
}

pub fn timestamp(now: NaiveDateTime) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}
