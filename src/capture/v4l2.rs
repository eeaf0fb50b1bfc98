//! V4L2 webcam capture exposed as a lazy frame iterator

use image::RgbImage;
use tracing::{debug, error, info, instrument, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::capture::decoder;
use crate::capture::frame::{Frame, Pixels, PixelFormat};
use crate::capture::CaptureError;
use crate::utils::{self, FoundDevice};
use crate::CaptureConfig;

/// Undecodable buffers tolerated in a row before the stream is given up
pub const MAX_CONSECUTIVE_DECODE_FAILURES: u32 = 30;

/// Camera frame source.
///
/// Holds the device exclusively until dropped. Iterating yields decoded frames
/// until the device stops delivering data, after which it stays exhausted.
pub struct V4l2Capture {
    // Field order matters: the stream must drop before the device handle
    stream: Option<MmapStream<'static>>,
    _device: Box<Device>,
    found: FoundDevice,
    width: u32,
    height: u32,
    sequence: u64,
}

impl V4l2Capture {
    /// Open the camera and start streaming at the requested resolution
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let (device, found) = utils::find_device(config.device_index, config.format)?;

        // Set format
        let mut fmt = device.format()?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = utils::fourcc(found.format);
        let fmt = device.set_format(&fmt)?;
        check_negotiated(&found, fmt.fourcc)?;

        if fmt.width != config.width || fmt.height != config.height {
            warn!(
                "Requested {}x{}, device settled on {}x{}",
                config.width, config.height, fmt.width, fmt.height
            );
        }

        if let Err(e) = device.set_params(&v4l::video::capture::Parameters::with_fps(config.fps)) {
            warn!("Could not set {} fps: {}", config.fps, e);
        }

        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, config.buffer_count)?;
        info!(
            "Capture stream started on {} with {} buffers",
            found.path, config.buffer_count
        );

        Ok(Self {
            stream: Some(stream),
            _device: Box::new(device),
            found,
            width: fmt.width,
            height: fmt.height,
            sequence: 0,
        })
    }

    pub fn format(&self) -> PixelFormat {
        self.found.format
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Dequeue and decode one frame; `None` marks end of stream
    #[instrument(skip(self), fields(seq = self.sequence))]
    fn read_next(&mut self) -> Option<Frame> {
        let stream = self.stream.as_mut()?;

        let (format, width, height) = (self.found.format, self.width, self.height);

        let buffers = std::iter::from_fn(|| {
            let (buf, meta) = match stream.next() {
                Ok(next) => next,
                Err(e) => {
                    info!("Camera read failed, treating as end of stream: {}", e);
                    return None;
                }
            };

            let used = (meta.bytesused as usize).min(buf.len());
            if used == 0 {
                info!("Empty frame from camera, end of stream");
                return None;
            }

            Some(decoder::decode_frame(&buf[..used], format, width, height))
        });

        let rgb = first_decoded(buffers, MAX_CONSECUTIVE_DECODE_FAILURES)?;
        self.sequence += 1;
        Some(Frame::new(Pixels::Rgb(rgb), self.sequence, format))
    }
}

/// The driver may substitute another fourcc in S_FMT; every buffer would then
/// be decoded with the wrong codec
fn check_negotiated(found: &FoundDevice, actual: FourCC) -> Result<(), CaptureError> {
    let requested = utils::fourcc(found.format);
    if actual != requested {
        error!(
            "{} accepted {} instead of the requested {}",
            found.path, actual, requested
        );
        return Err(CaptureError::UnsupportedFormat {
            path: found.path.clone(),
        });
    }
    Ok(())
}

/// Take the first buffer that decodes. Corrupt MJPEG buffers are common right
/// after stream-on, so a few are skipped; `limit` failures in a row end the
/// stream instead of spinning without ever returning to the event loop.
fn first_decoded<I>(attempts: I, limit: u32) -> Option<RgbImage>
where
    I: Iterator<Item = Result<RgbImage, CaptureError>>,
{
    let mut failures = 0;
    for attempt in attempts {
        match attempt {
            Ok(rgb) => return Some(rgb),
            Err(e) => {
                failures += 1;
                warn!("Skipping undecodable frame: {}", e);
                if failures >= limit {
                    error!("{} undecodable frames in a row, ending stream", failures);
                    return None;
                }
            }
        }
    }
    None
}

impl Iterator for V4l2Capture {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let frame = self.read_next();
        if frame.is_none() {
            // Non-restartable: stop streaming for good
            self.stream = None;
        }
        frame
    }
}

impl Drop for V4l2Capture {
    fn drop(&mut self) {
        self.stream.take();
        debug!("Dropped capture stream after {} frames", self.sequence);
        info!("Released camera {}", self.found.path);
    }
}
