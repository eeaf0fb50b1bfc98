//! SeetaFace frontal-face cascade via `rustface`

use std::path::Path;
use std::time::Instant;

use rustface::{Detector, ImageData};
use tracing::{debug, info, instrument};

use super::{DetectError, DetectionRect, FaceDetector};
use crate::capture::Frame;
use crate::DetectorConfig;

pub struct SeetaDetector {
    detector: Box<dyn Detector>,
}

impl SeetaDetector {
    /// Load the cascade model once at startup
    pub fn load(config: &DetectorConfig) -> Result<Self, DetectError> {
        let path = Path::new(&config.model_path);
        info!("Loading face model from {}", path.display());

        let mut detector =
            rustface::create_detector(&config.model_path).map_err(|source| {
                DetectError::ModelLoad {
                    path: config.model_path.clone(),
                    source,
                }
            })?;

        detector.set_min_face_size(config.min_face_size);
        detector.set_score_thresh(config.score_thresh);
        detector.set_pyramid_scale_factor(config.pyramid_scale_factor);
        detector.set_slide_window_step(config.slide_window_step, config.slide_window_step);

        Ok(Self { detector })
    }
}

impl FaceDetector for SeetaDetector {
    #[instrument(skip_all, fields(seq = frame.meta.sequence))]
    fn detect(&mut self, frame: &Frame) -> Vec<DetectionRect> {
        if frame.is_empty() {
            return Vec::new();
        }

        let start = Instant::now();
        let (width, height) = (frame.width(), frame.height());
        let luma = frame.to_luma();
        let faces = self.detector.detect(&ImageData::new(luma.as_raw(), width, height));

        let rects: Vec<DetectionRect> = faces
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                DetectionRect::from_signed(
                    bbox.x(),
                    bbox.y(),
                    bbox.width(),
                    bbox.height(),
                    width,
                    height,
                )
            })
            .collect();

        metrics::histogram!("detect_time_us").record(start.elapsed().as_micros() as f64);
        debug!("Detected {} faces", rects.len());
        rects
    }
}
