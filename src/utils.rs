use tracing::{debug, info};
use v4l::{capability::Flags, Device, FourCC};

use crate::capture::{CaptureError, PixelFormat};

// Resolved capture device info
#[derive(Debug, Clone)]
pub struct FoundDevice {
    pub path: String,
    pub format: PixelFormat,
}

impl FoundDevice {
    pub fn new(path: String, format: PixelFormat) -> Self {
        Self { path, format }
    }
}

pub fn device_path(index: usize) -> String {
    format!("/dev/video{}", index)
}

pub fn fourcc(format: PixelFormat) -> FourCC {
    match format {
        PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
        PixelFormat::Yuyv4 => FourCC::new(b"YUYV"),
        PixelFormat::Rgb24 => FourCC::new(b"RGB3"),
    }
}

/// Open camera `index` and pick the pixel format to stream in.
///
/// `preferred` wins when the device advertises it, then MJPEG, then YUYV.
pub fn find_device(index: usize, preferred: PixelFormat) -> Result<(Device, FoundDevice), CaptureError> {
    let path = device_path(index);
    info!("Probing capture device {}", path);

    let dev = Device::with_path(&path).map_err(|source| CaptureError::DeviceUnavailable {
        path: path.clone(),
        source,
    })?;

    let caps = dev
        .query_caps()
        .map_err(|source| CaptureError::DeviceUnavailable {
            path: path.clone(),
            source,
        })?;

    if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
        return Err(CaptureError::NotACaptureDevice {
            path,
            card: caps.card,
        });
    }

    let offered: Vec<FourCC> = dev.enum_formats()?.into_iter().map(|f| f.fourcc).collect();
    debug!("{} offers {:?}", path, offered);

    let format = pick_format(&offered, preferred)
        .ok_or_else(|| CaptureError::UnsupportedFormat { path: path.clone() })?;

    info!("Found {:?} device: {} - {}", format, path, caps.card);
    Ok((dev, FoundDevice::new(path, format)))
}

fn pick_format(offered: &[FourCC], preferred: PixelFormat) -> Option<PixelFormat> {
    [preferred, PixelFormat::Mjpeg, PixelFormat::Yuyv4]
        .into_iter()
        .find(|format| offered.contains(&fourcc(*format)))
}
