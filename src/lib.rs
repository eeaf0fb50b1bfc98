pub mod annotate;
pub mod app;
pub mod capture;
pub mod detect;
pub mod display;
pub mod filter;
pub mod session;
pub mod utils;

use std::path::PathBuf;

use capture::frame::PixelFormat;
use config::{Environment, File};
use serde::{Deserialize, Serialize};

use crate::filter::FilterMode;

pub use app::{DisplayLoop, LoopExit};
pub use capture::Frame;

/// Config file looked up in the working directory when `FACECAM_CONFIG` is unset
pub const DEFAULT_CONFIG_NAME: &str = "facecam";

/// System configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
    pub detector: DetectorConfig,
    pub output: OutputConfig,
    /// Filter active when the window opens
    pub filter: FilterMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub device_index: usize,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: PixelFormat,
    pub buffer_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub model_path: String,
    pub min_face_size: u32,
    pub score_thresh: f64,
    pub pyramid_scale_factor: f32,
    pub slide_window_step: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            display: DisplayConfig::default(),
            detector: DetectorConfig::default(),
            output: OutputConfig::default(),
            filter: FilterMode::None,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: 640,
            height: 480,
            fps: 30,
            format: PixelFormat::Mjpeg,
            buffer_count: 4,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: "Facial Recognition".into(),
            width: 640,
            height: 480,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "model/seeta_fd_frontal_v1.0.bin".into(),
            min_face_size: 20,
            score_thresh: 2.0,
            pyramid_scale_factor: 0.8,
            slide_window_step: 4,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            jpeg_quality: 90,
        }
    }
}

impl Config {
    /// Defaults, then the optional config file, then `FACECAM_*` variables
    /// (`__` separates nested keys, e.g. `FACECAM_CAPTURE__DEVICE_INDEX`)
    pub fn load() -> Result<Self, config::ConfigError> {
        let file = std::env::var("FACECAM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_NAME.into());
        let env = Environment::with_prefix("FACECAM")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        Self::load_from(&file, env)
    }

    fn load_from(file: &str, env: Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(File::with_name(file).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}

/// Performance counters kept by the display loop
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub frames_processed: u64,
    pub faces_detected: u64,
    pub commands_handled: u64,
}
