use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, GrayImage, Pixel, RgbImage};
use serde::{Deserialize, Serialize};

use crate::detect::DetectionRect;

/// One captured image, the unit of per-iteration processing.
///
/// Only the current frame exists at any time. Filters may replace the pixel
/// data outright (edge detection turns a colour frame into a single-channel
/// one), so consumers must check [`Frame::channels`] rather than assume RGB.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: Pixels,

    /// Frame metadata
    pub meta: FrameMetadata,

    /// Capture timestamp for latency tracking
    pub timestamp: Instant,
}

/// Pixel storage: 8-bit luminance or 8-bit RGB
#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    Gray(GrayImage),
    Rgb(RgbImage),
}

/// Frame metadata
#[derive(Debug, Clone, Copy)]
pub struct FrameMetadata {
    pub sequence: u64,
    /// Wire format the frame was decoded from; `None` for frames built in
    /// memory rather than read from a camera
    pub source_format: Option<PixelFormat>,
}

/// Pixel formats we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Yuyv4,
    Mjpeg,
}

impl Frame {
    /// A frame decoded from camera buffer `sequence`
    pub fn new(pixels: Pixels, sequence: u64, source_format: PixelFormat) -> Self {
        Self::with_meta(pixels, sequence, Some(source_format))
    }

    /// Wrap an RGB image captured outside a camera (tests, stills)
    pub fn from_rgb(image: RgbImage) -> Self {
        Self::with_meta(Pixels::Rgb(image), 0, None)
    }

    pub fn from_gray(image: GrayImage) -> Self {
        Self::with_meta(Pixels::Gray(image), 0, None)
    }

    fn with_meta(pixels: Pixels, sequence: u64, source_format: Option<PixelFormat>) -> Self {
        Self {
            pixels,
            meta: FrameMetadata {
                sequence,
                source_format,
            },
            timestamp: Instant::now(),
        }
    }

    pub fn channels(&self) -> u8 {
        match &self.pixels {
            Pixels::Gray(_) => 1,
            Pixels::Rgb(_) => 3,
        }
    }

    pub fn width(&self) -> u32 {
        match &self.pixels {
            Pixels::Gray(img) => img.width(),
            Pixels::Rgb(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match &self.pixels {
            Pixels::Gray(img) => img.height(),
            Pixels::Rgb(img) => img.height(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Luminance view, converting colour frames with Rec. 709 weights
    pub fn to_luma(&self) -> GrayImage {
        self.pixels.to_luma()
    }

    /// RGB view for display; grey frames are expanded with R = G = B
    pub fn to_rgb(&self) -> RgbImage {
        match &self.pixels {
            Pixels::Rgb(img) => img.clone(),
            Pixels::Gray(img) => gray_to_rgb(img),
        }
    }

    /// Copy out a sub-region. The rectangle is clipped to the frame first, so
    /// an out-of-bounds detection never panics; `None` if nothing is left.
    pub fn crop(&self, rect: &DetectionRect) -> Option<Pixels> {
        let rect = rect.clip_to(self.width(), self.height())?;
        let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);
        Some(match &self.pixels {
            Pixels::Gray(img) => Pixels::Gray(imageops::crop_imm(img, x, y, w, h).to_image()),
            Pixels::Rgb(img) => Pixels::Rgb(imageops::crop_imm(img, x, y, w, h).to_image()),
        })
    }

    pub fn save_jpeg(&self, path: &Path, quality: u8) -> image::ImageResult<()> {
        self.pixels.save_jpeg(path, quality)
    }
}

impl Pixels {
    pub fn to_luma(&self) -> GrayImage {
        match self {
            Pixels::Gray(img) => img.clone(),
            Pixels::Rgb(img) => imageops::grayscale(img),
        }
    }

    /// Encode as JPEG, keeping the channel count (greyscale stays L8)
    pub fn save_jpeg(&self, path: &Path, quality: u8) -> image::ImageResult<()> {
        let file = std::fs::File::create(path).map_err(image::ImageError::IoError)?;
        let mut writer = BufWriter::new(file);
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            match self {
                Pixels::Gray(img) => encoder.encode_image(img)?,
                Pixels::Rgb(img) => encoder.encode_image(img)?,
            }
        }
        writer.flush().map_err(image::ImageError::IoError)
    }
}

pub(crate) fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        gray.get_pixel(x, y).to_rgb()
    })
}
