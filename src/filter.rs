//! Per-frame image filters, selectable at runtime

use std::fmt;

use imageproc::edges::canny;
use imageproc::filter::separable_filter_equal;
use serde::{Deserialize, Serialize};

use crate::capture::frame::gray_to_rgb;
use crate::capture::{Frame, Pixels};

/// Side length of the square blur kernel
pub const BLUR_KERNEL_SIZE: usize = 15;
pub const CANNY_LOW_THRESHOLD: f32 = 100.0;
pub const CANNY_HIGH_THRESHOLD: f32 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterMode {
    #[default]
    None,
    Grayscale,
    Blur,
    EdgeDetect,
}

impl FilterMode {
    pub const ALL: [FilterMode; 4] = [
        FilterMode::None,
        FilterMode::Grayscale,
        FilterMode::Blur,
        FilterMode::EdgeDetect,
    ];

    /// Digit keys 1-4 select the modes in declaration order
    pub fn from_digit(digit: char) -> Option<Self> {
        let index = digit.to_digit(10)?.checked_sub(1)?;
        Self::ALL.get(index as usize).copied()
    }

    /// Zero-based index, as reported when the mode changes
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterMode::None => "none",
            FilterMode::Grayscale => "grayscale",
            FilterMode::Blur => "blur",
            FilterMode::EdgeDetect => "edge detection",
        };
        write!(f, "{} ({})", self.index(), name)
    }
}

/// Apply `mode` to `frame`, keeping its metadata.
///
/// Grayscale keeps three channels with R = G = B. Edge detection replaces
/// the pixels with a single-channel edge map.
pub fn apply(mode: FilterMode, mut frame: Frame) -> Frame {
    frame.pixels = match (mode, frame.pixels) {
        (FilterMode::None, pixels) => pixels,
        (FilterMode::Grayscale, pixels) => Pixels::Rgb(gray_to_rgb(&pixels.to_luma())),
        (FilterMode::Blur, Pixels::Rgb(img)) => {
            Pixels::Rgb(separable_filter_equal(&img, gaussian_kernel(BLUR_KERNEL_SIZE).as_slice()))
        }
        (FilterMode::Blur, Pixels::Gray(img)) => {
            Pixels::Gray(separable_filter_equal(&img, gaussian_kernel(BLUR_KERNEL_SIZE).as_slice()))
        }
        (FilterMode::EdgeDetect, pixels) => Pixels::Gray(canny(
            &pixels.to_luma(),
            CANNY_LOW_THRESHOLD,
            CANNY_HIGH_THRESHOLD,
        )),
    };
    frame
}

/// Normalised 1-D Gaussian taps for an odd `size`, with the spread derived
/// from the size the same way common vision libraries do when sigma is 0
fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let taps: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = taps.iter().sum();
    taps.into_iter().map(|t| t / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};
    use rstest::rstest;

    fn gradient_frame() -> Frame {
        Frame::from_rgb(RgbImage::from_fn(64, 48, |x, y| {
            Rgb([(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8])
        }))
    }

    /// Left half black, right half white: one strong vertical edge
    fn step_frame() -> Frame {
        Frame::from_rgb(RgbImage::from_fn(64, 48, |x, _| {
            if x < 32 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        }))
    }

    #[rstest]
    #[case('1', Some(FilterMode::None))]
    #[case('2', Some(FilterMode::Grayscale))]
    #[case('3', Some(FilterMode::Blur))]
    #[case('4', Some(FilterMode::EdgeDetect))]
    #[case('0', None)]
    #[case('5', None)]
    #[case('x', None)]
    fn digits_map_to_modes(#[case] key: char, #[case] expected: Option<FilterMode>) {
        assert_eq!(FilterMode::from_digit(key), expected);
    }

    #[test]
    fn none_leaves_frame_untouched() {
        let frame = gradient_frame();
        let before = frame.pixels.clone();
        assert_eq!(apply(FilterMode::None, frame).pixels, before);
    }

    #[test]
    fn grayscale_keeps_three_equal_channels() {
        let out = apply(FilterMode::Grayscale, gradient_frame());
        assert_eq!(out.channels(), 3);
        let Pixels::Rgb(img) = &out.pixels else {
            panic!("grayscale must stay RGB");
        };
        assert!(img.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
    }

    #[test]
    fn blur_keeps_shape_and_softens_edges() {
        let out = apply(FilterMode::Blur, step_frame());
        assert_eq!(out.channels(), 3);
        assert_eq!((out.width(), out.height()), (64, 48));

        let Pixels::Rgb(img) = &out.pixels else {
            panic!("blur must keep RGB");
        };
        let near_edge = img.get_pixel(31, 24)[0];
        assert!(near_edge > 0 && near_edge < 255, "got {near_edge}");
        // Far from the edge nothing changes
        assert_eq!(img.get_pixel(0, 24)[0], 0);
        assert!(img.get_pixel(63, 24)[0] >= 254);
    }

    #[test]
    fn edge_detect_yields_single_channel_binary_map() {
        let out = apply(FilterMode::EdgeDetect, step_frame());
        assert_eq!(out.channels(), 1);

        let Pixels::Gray(img) = &out.pixels else {
            panic!("edge detection must produce a grey frame");
        };
        assert!(img.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert!(img.pixels().any(|p| *p == Luma([255])));
        // Flat regions carry no edges
        assert_eq!(img.get_pixel(5, 24)[0], 0);
    }

    #[test]
    fn edge_detect_on_flat_frame_is_empty() {
        let flat = Frame::from_rgb(RgbImage::from_pixel(32, 32, Rgb([90, 90, 90])));
        let out = apply(FilterMode::EdgeDetect, flat);
        let Pixels::Gray(img) = &out.pixels else {
            panic!("expected grey output");
        };
        assert!(img.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn kernel_is_normalised_and_symmetric() {
        let k = gaussian_kernel(BLUR_KERNEL_SIZE);
        assert_eq!(k.len(), 15);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((k[0] - k[14]).abs() < 1e-7);
        assert!(k[7] > k[6]);
    }

    #[test]
    fn display_names_mode_index() {
        assert_eq!(FilterMode::EdgeDetect.to_string(), "3 (edge detection)");
    }
}
