use image::RgbImage;

use super::timecode::Timecode;

/// A single decoded video frame with metadata.
pub struct Frame {
    /// 8-bit RGB pixels, the layout every change detector consumes.
    pub image: RgbImage,
    /// Absolute frame number from the start of the source (0-based).
    pub frame_number: u32,
    /// Elapsed seconds from the start of the source.
    pub timestamp_seconds: f64,
}

impl Frame {
    pub fn new(image: RgbImage, frame_number: u32, fps: f64) -> Self {
        let timestamp_seconds = Timecode::new(frame_number, fps).seconds();
        Self {
            image,
            frame_number,
            timestamp_seconds,
        }
    }
}
