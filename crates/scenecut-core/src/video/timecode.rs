use std::fmt;

/// A frame index paired with the frame rate it was counted at.
///
/// Always derived from `(frame, fps)`; there is no way to set the time directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timecode {
    frame: u32,
    fps: f64,
}

impl Timecode {
    pub fn new(frame: u32, fps: f64) -> Self {
        Self { frame, fps }
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Elapsed seconds, or 0.0 when the rate is unknown.
    pub fn seconds(&self) -> f64 {
        if self.fps > 0.0 {
            self.frame as f64 / self.fps
        } else {
            0.0
        }
    }

    /// Re-express this position as a frame index at another rate.
    pub fn frame_at(&self, fps: f64) -> u32 {
        if self.fps == fps || self.fps <= 0.0 || fps <= 0.0 {
            return self.frame;
        }
        (self.seconds() * fps).round() as u32
    }
}

/// Formats as `HH:MM:SS.mmm`.
impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_ms = (self.seconds() * 1000.0).round() as u64;
        let ms = total_ms % 1000;
        let secs = (total_ms / 1000) % 60;
        let mins = (total_ms / 60_000) % 60;
        let hours = total_ms / 3_600_000;
        write!(f, "{hours:02}:{mins:02}:{secs:02}.{ms:03}")
    }
}
