use anyhow::{Context, Result};
use image::{Rgb32FImage, RgbImage};
use tracing::{debug, info};

use crate::error::SceneError;

use super::frame::Frame;
use super::source::{FrameSource, SeekTarget};

/// Rate assumed for in-memory batches that carry no timing information.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Frame source over a caller-owned batch of normalized float RGB frames.
///
/// The batch is only ever read, so several sources may share one batch as
/// long as each keeps its own cursor.
pub struct BufferFrameSource<'a> {
    frames: &'a [Rgb32FImage],
    fps: f64,
    width: u32,
    height: u32,
    /// Index reported by `current_index`. Updated before `cursor` advances.
    current: u32,
    /// Position of the next frame `read` will hand out.
    cursor: u32,
}

impl<'a> BufferFrameSource<'a> {
    pub fn new(frames: &'a [Rgb32FImage]) -> Result<Self, SceneError> {
        Self::with_frame_rate(frames, DEFAULT_FRAME_RATE)
    }

    /// Wrap a batch, rejecting empty batches and mixed frame dimensions.
    pub fn with_frame_rate(frames: &'a [Rgb32FImage], fps: f64) -> Result<Self, SceneError> {
        let Some(first) = frames.first() else {
            return Err(SceneError::InvalidInput(
                "frame batch is empty".to_string(),
            ));
        };
        let (width, height) = first.dimensions();
        if width == 0 || height == 0 {
            return Err(SceneError::InvalidInput(format!(
                "frame batch has zero-sized frames ({width}x{height})"
            )));
        }
        if let Some((i, f)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.dimensions() != (width, height))
        {
            return Err(SceneError::InvalidInput(format!(
                "frame {i} is {}x{}, expected {width}x{height} like frame 0",
                f.width(),
                f.height()
            )));
        }
        if fps.is_nan() || fps <= 0.0 {
            return Err(SceneError::InvalidInput(format!(
                "frame rate must be positive, got {fps}"
            )));
        }
        let len = u32::try_from(frames.len()).map_err(|_| {
            SceneError::InvalidInput(format!("frame batch too long: {} frames", frames.len()))
        })?;

        info!(frames = len, width, height, fps, "buffer frame source opened");

        Ok(Self {
            frames,
            fps,
            width,
            height,
            current: 0,
            cursor: 0,
        })
    }
}

impl FrameSource for BufferFrameSource<'_> {
    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn total_frames(&self) -> Option<u32> {
        Some(self.frames.len() as u32)
    }

    fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn current_index(&self) -> u32 {
        self.current
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        let Some(source) = self.frames.get(self.cursor as usize) else {
            return Ok(None);
        };

        // Order matters: detectors ask for current_index() while handling the
        // returned frame, so it must already name that frame.
        self.current = self.cursor;
        let image = to_rgb8(source)?;
        self.cursor += 1;

        debug!(frame_number = self.current, "read buffered frame");
        Ok(Some(Frame::new(image, self.current, self.fps)))
    }

    fn seek(&mut self, target: SeekTarget) -> Result<()> {
        let index = target.resolve(self.fps);
        debug!(index, "seek buffered source");
        self.cursor = index;
        self.current = index;
        Ok(())
    }
}

/// Convert normalized float channels to 8-bit, clamping out-of-range values.
fn to_rgb8(src: &Rgb32FImage) -> Result<RgbImage> {
    let raw = src
        .as_raw()
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    RgbImage::from_raw(src.width(), src.height(), raw)
        .context("failed to create RgbImage from buffered frame")
}
