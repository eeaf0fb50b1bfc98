//! Face detection behind a narrow trait so the loop never sees the engine

pub mod seeta;

use thiserror::Error;

use crate::capture::Frame;

pub use seeta::SeetaDetector;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("failed to load face model from {path}")]
    ModelLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Axis-aligned face bounding box in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DetectionRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from signed detector output, clipping to a `frame_w` x `frame_h`
    /// frame. Returns `None` when nothing of the box lies inside the frame.
    pub fn from_signed(
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        frame_w: u32,
        frame_h: u32,
    ) -> Option<Self> {
        let left = i64::from(x).max(0);
        let top = i64::from(y).max(0);
        let right = (i64::from(x) + i64::from(width)).min(i64::from(frame_w));
        let bottom = (i64::from(y) + i64::from(height)).min(i64::from(frame_h));

        if right <= left || bottom <= top {
            return None;
        }

        Some(Self::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }

    pub fn clip_to(&self, frame_w: u32, frame_h: u32) -> Option<Self> {
        Self::from_signed(
            i32::try_from(self.x).unwrap_or(i32::MAX),
            i32::try_from(self.y).unwrap_or(i32::MAX),
            self.width,
            self.height,
            frame_w,
            frame_h,
        )
    }

    pub fn is_within(&self, frame_w: u32, frame_h: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(frame_w)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(frame_h)
    }
}

/// Anything that can propose face rectangles for a frame.
///
/// Implementations must return rectangles inside the frame bounds, in the
/// engine's own order. `&mut self` because engines keep scratch buffers.
pub trait FaceDetector {
    fn detect(&mut self, frame: &Frame) -> Vec<DetectionRect>;
}

impl<D: FaceDetector + ?Sized> FaceDetector for Box<D> {
    fn detect(&mut self, frame: &Frame) -> Vec<DetectionRect> {
        (**self).detect(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::inside(50, 50, 100, 100, Some(DetectionRect::new(50, 50, 100, 100)))]
    #[case::negative_origin(-10, -5, 30, 30, Some(DetectionRect::new(0, 0, 20, 25)))]
    #[case::past_right_edge(600, 400, 100, 100, Some(DetectionRect::new(600, 400, 40, 80)))]
    #[case::fully_outside(700, 10, 20, 20, None)]
    #[case::zero_area(10, 10, 0, 5, None)]
    fn signed_boxes_are_clipped(
        #[case] x: i32,
        #[case] y: i32,
        #[case] w: u32,
        #[case] h: u32,
        #[case] expected: Option<DetectionRect>,
    ) {
        let rect = DetectionRect::from_signed(x, y, w, h, 640, 480);
        assert_eq!(rect, expected);
        if let Some(rect) = rect {
            assert!(rect.is_within(640, 480));
        }
    }

    #[test]
    fn clip_to_keeps_inbound_rect() {
        let rect = DetectionRect::new(0, 0, 640, 480);
        assert_eq!(rect.clip_to(640, 480), Some(rect));
        assert_eq!(
            DetectionRect::new(630, 470, 20, 20).clip_to(640, 480),
            Some(DetectionRect::new(630, 470, 10, 10))
        );
    }
}
