use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::decoder::VideoDecoder;
use super::frame::Frame;
use super::source::{FrameSource, SeekTarget};

/// Frame source backed by an ffmpeg decoder process.
///
/// Seeking restarts the decoder at the requested frame.
pub struct FileFrameSource {
    path: PathBuf,
    decoder: VideoDecoder,
    current: u32,
}

impl FileFrameSource {
    pub fn open(path: &Path) -> Result<Self> {
        let decoder = VideoDecoder::open(path)
            .with_context(|| format!("failed to open video {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            decoder,
            current: 0,
        })
    }
}

impl FrameSource for FileFrameSource {
    fn frame_rate(&self) -> f64 {
        self.decoder.fps()
    }

    fn total_frames(&self) -> Option<u32> {
        self.decoder.info().frame_count
    }

    fn frame_size(&self) -> (u32, u32) {
        (self.decoder.width(), self.decoder.height())
    }

    fn current_index(&self) -> u32 {
        self.current
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        let frame = self.decoder.next_frame()?;
        if let Some(f) = &frame {
            self.current = f.frame_number;
        }
        Ok(frame)
    }

    fn seek(&mut self, target: SeekTarget) -> Result<()> {
        let index = target.resolve(self.decoder.fps());
        info!(path = ?self.path, index, "seeking video by restarting decoder");
        // The old decoder stays in place if the restart fails.
        let decoder = VideoDecoder::spawn(&self.path, self.decoder.info(), index)?;
        self.decoder = decoder;
        self.current = index;
        Ok(())
    }
}
