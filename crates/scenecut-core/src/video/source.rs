use anyhow::Result;

use super::frame::Frame;
use super::timecode::Timecode;

/// Where to reposition a frame source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    Frame(u32),
    Timecode(Timecode),
}

impl SeekTarget {
    /// Resolve to a frame index at the given source rate.
    pub fn resolve(self, fps: f64) -> u32 {
        match self {
            SeekTarget::Frame(index) => index,
            SeekTarget::Timecode(tc) => tc.frame_at(fps),
        }
    }
}

impl From<u32> for SeekTarget {
    fn from(index: u32) -> Self {
        SeekTarget::Frame(index)
    }
}

impl From<Timecode> for SeekTarget {
    fn from(tc: Timecode) -> Self {
        SeekTarget::Timecode(tc)
    }
}

/// Pull-based access to a sequence of decoded frames, whatever their origin.
///
/// A source is driven by one caller at a time. `current_index` reports the
/// frame most recently handed out by `read`, never the next read position.
pub trait FrameSource {
    fn frame_rate(&self) -> f64;

    /// Total number of frames, or None when the source cannot tell up front.
    fn total_frames(&self) -> Option<u32>;

    /// `(width, height)` of every frame in this source.
    fn frame_size(&self) -> (u32, u32);

    /// Index of the frame returned by the last successful `read`.
    fn current_index(&self) -> u32;

    fn current_timecode(&self) -> Timecode {
        Timecode::new(self.current_index(), self.frame_rate())
    }

    /// Pixel aspect ratio of the stored frames.
    fn aspect_ratio(&self) -> f64 {
        1.0
    }

    /// Next frame, or `None` at end of stream.
    fn read(&mut self) -> Result<Option<Frame>>;

    fn seek(&mut self, target: SeekTarget) -> Result<()>;

    fn reset(&mut self) -> Result<()> {
        self.seek(SeekTarget::Frame(0))
    }
}
