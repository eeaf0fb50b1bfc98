pub mod decoder;
pub mod frame;
pub mod v4l2;

use thiserror::Error;

pub use frame::{Frame, Pixels, PixelFormat};
pub use v4l2::V4l2Capture;

/// Camera acquisition and decoding failures
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera {path} is not accessible")]
    DeviceUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} ({card}) does not support video capture")]
    NotACaptureDevice { path: String, card: String },

    #[error("{path} offers no supported pixel format")]
    UnsupportedFormat { path: String },

    #[error("capture stream failed")]
    Stream(#[from] std::io::Error),

    #[error("failed to decode frame: {0}")]
    Decode(String),
}
