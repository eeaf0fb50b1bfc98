use image::{Pixel, Rgb};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::capture::{Frame, Pixels};
use crate::detect::DetectionRect;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_THICKNESS: u32 = 2;

/// Outline every detection in place. Grey frames get the luminance of
/// [`BOX_COLOR`] since they have no green to draw with.
pub fn draw(frame: &mut Frame, rects: &[DetectionRect]) {
    let gray_color = BOX_COLOR.to_luma();

    for rect in rects {
        for inset in 0..BOX_THICKNESS {
            let Some(outline) = inset_rect(rect, inset) else {
                break;
            };
            match &mut frame.pixels {
                Pixels::Rgb(img) => draw_hollow_rect_mut(img, outline, BOX_COLOR),
                Pixels::Gray(img) => draw_hollow_rect_mut(img, outline, gray_color),
            }
        }
    }
}

fn inset_rect(rect: &DetectionRect, inset: u32) -> Option<Rect> {
    let width = rect.width.checked_sub(2 * inset).filter(|w| *w > 0)?;
    let height = rect.height.checked_sub(2 * inset).filter(|h| *h > 0)?;
    Some(Rect::at((rect.x + inset) as i32, (rect.y + inset) as i32).of_size(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};

    #[test]
    fn draws_two_pixel_green_outline() {
        let mut frame = Frame::from_rgb(RgbImage::new(40, 40));
        draw(&mut frame, &[DetectionRect::new(10, 10, 20, 20)]);

        let Pixels::Rgb(img) = &frame.pixels else {
            panic!("frame should stay RGB");
        };
        assert_eq!(*img.get_pixel(10, 10), BOX_COLOR);
        assert_eq!(*img.get_pixel(11, 15), BOX_COLOR);
        assert_eq!(*img.get_pixel(29, 29), BOX_COLOR);
        assert_eq!(*img.get_pixel(28, 20), BOX_COLOR);
        // Unfilled inside, untouched outside
        assert_eq!(*img.get_pixel(12, 15), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(20, 20), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(9, 9), Rgb([0, 0, 0]));
    }

    #[test]
    fn grey_frame_stays_single_channel() {
        let mut frame = Frame::from_gray(GrayImage::new(20, 20));
        draw(&mut frame, &[DetectionRect::new(2, 2, 10, 10)]);

        assert_eq!(frame.channels(), 1);
        let Pixels::Gray(img) = &frame.pixels else {
            panic!("frame should stay grey");
        };
        assert_eq!(*img.get_pixel(2, 2), BOX_COLOR.to_luma());
        assert_ne!(*img.get_pixel(2, 2), Luma([0]));
    }

    #[test]
    fn no_detections_no_change() {
        let mut frame = Frame::from_rgb(RgbImage::new(8, 8));
        let before = frame.pixels.clone();
        draw(&mut frame, &[]);
        assert_eq!(frame.pixels, before);
    }

    #[test]
    fn tiny_box_does_not_panic() {
        let mut frame = Frame::from_rgb(RgbImage::new(8, 8));
        draw(&mut frame, &[DetectionRect::new(3, 3, 1, 1)]);
        let Pixels::Rgb(img) = &frame.pixels else {
            panic!("frame should stay RGB");
        };
        assert_eq!(*img.get_pixel(3, 3), BOX_COLOR);
    }
}
