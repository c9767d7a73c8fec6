pub mod common;
pub mod content;

use anyhow::Result;

use crate::video::{Frame, Timecode};

pub use content::{ContentDetector, ContentDetectorConfig};

/// Decides where scenes start while being fed frames in order.
///
/// Implementations keep whatever running state they need between calls.
/// After an error the detector is not expected to be resumable.
pub trait ChangeDetector {
    /// Feed the frame the source just returned. `position` is the source's
    /// current timecode for that frame. Returns the index of a new scene
    /// start, if this frame begins one.
    fn process_frame(&mut self, position: Timecode, frame: &Frame) -> Result<Option<u32>>;

    /// Called once at end of stream with the position of the last frame read.
    /// Returns scene starts the detector held back.
    fn finish(&mut self, _last: Timecode) -> Result<Vec<u32>> {
        Ok(Vec::new())
    }
}
