use image::RgbImage;
use jpeg_decoder::Decoder;

use super::frame::PixelFormat;
use super::CaptureError;

/// Decode one raw device buffer into packed RGB24
pub fn decode_frame(
    data: &[u8],
    format: PixelFormat,
    width: u32,
    height: u32,
) -> Result<RgbImage, CaptureError> {
    let pixels = match format {
        PixelFormat::Mjpeg => {
            let mut decoder = Decoder::new(data);
            let pixels = decoder
                .decode()
                .map_err(|e| CaptureError::Decode(e.to_string()))?;
            let info = decoder
                .info()
                .ok_or_else(|| CaptureError::Decode("missing JPEG header".into()))?;
            return match info.pixel_format {
                jpeg_decoder::PixelFormat::RGB24 => {
                    RgbImage::from_raw(info.width as u32, info.height as u32, pixels)
                        .ok_or_else(|| CaptureError::Decode("truncated JPEG payload".into()))
                }
                jpeg_decoder::PixelFormat::L8 => {
                    let gray = image::GrayImage::from_raw(
                        info.width as u32,
                        info.height as u32,
                        pixels,
                    )
                    .ok_or_else(|| CaptureError::Decode("truncated JPEG payload".into()))?;
                    Ok(super::frame::gray_to_rgb(&gray))
                }
                other => Err(CaptureError::Decode(format!(
                    "unsupported JPEG pixel format {other:?}"
                ))),
            };
        }
        // Already in RGB format
        PixelFormat::Rgb24 => data.to_vec(),
        PixelFormat::Yuyv4 => yuyv_to_rgb(data, width, height)?,
    };

    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| CaptureError::Decode(format!("buffer too small for {width}x{height}")))
}

/// YUYV 4:2:2 to RGB24 with BT.601 coefficients
fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CaptureError> {
    let expected = (width * height * 2) as usize;
    if data.len() < expected {
        return Err(CaptureError::Decode(format!(
            "YUYV buffer has {} bytes, expected {expected}",
            data.len()
        )));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in data[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }
    Ok(rgb)
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as f32 - 16.0;
    let d = u as f32 - 128.0;
    let e = v as f32 - 128.0;

    let r = 1.164 * c + 1.596 * e;
    let g = 1.164 * c - 0.392 * d - 0.813 * e;
    let b = 1.164 * c + 2.017 * d;

    [clamp(r), clamp(g), clamp(b)]
}

fn clamp(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yuyv_black_and_white() {
        // Two macropixels: black pair, then white pair, both chroma-neutral
        let data = [16, 128, 16, 128, 235, 128, 235, 128];
        let img = decode_frame(&data, PixelFormat::Yuyv4, 4, 1).unwrap();

        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(2, 0).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(3, 0).0, [255, 255, 255]);
    }

    #[test]
    fn short_yuyv_buffer_is_rejected() {
        let err = decode_frame(&[0; 6], PixelFormat::Yuyv4, 2, 2).unwrap_err();
        assert!(matches!(err, CaptureError::Decode(_)));
    }

    #[test]
    fn rgb24_is_passed_through() {
        let data: Vec<u8> = (0..12).collect();
        let img = decode_frame(&data, PixelFormat::Rgb24, 2, 2).unwrap();
        assert_eq!(img.into_raw(), data);
    }

    #[test]
    fn mjpeg_round_trips_through_decoder() {
        let src = RgbImage::from_pixel(8, 8, image::Rgb([120, 120, 120]));
        let mut encoded = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut encoded, 95)
            .encode_image(&src)
            .unwrap();

        let img = decode_frame(&encoded, PixelFormat::Mjpeg, 8, 8).unwrap();
        assert_eq!(img.dimensions(), (8, 8));
        let p = img.get_pixel(4, 4).0;
        assert!(p.iter().all(|c| (*c as i32 - 120).abs() <= 3));
    }
}
