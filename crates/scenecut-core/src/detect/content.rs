use anyhow::{bail, Result};
use image::imageops::{self, FilterType};
use tracing::{debug, info};

use super::common::{mean_abs_diff, HsvPlanes};
use super::ChangeDetector;
use crate::video::{Frame, Timecode};

/// Frames wider than this are shrunk before scoring when downscale is automatic.
const AUTO_DOWNSCALE_WIDTH: u32 = 256;

/// Parameters for [`ContentDetector`].
#[derive(Debug, Clone)]
pub struct ContentDetectorConfig {
    /// Score at or above which a frame starts a new scene.
    pub threshold: f64,
    /// Minimum number of frames between two scene starts.
    pub min_scene_len: u32,
    /// Integer shrink factor applied before scoring. None picks one from the frame width.
    pub downscale: Option<u32>,
}

impl Default for ContentDetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 27.0,
            min_scene_len: 15,
            downscale: None,
        }
    }
}

impl ContentDetectorConfig {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    fn downscale_factor(&self, width: u32) -> u32 {
        match self.downscale {
            Some(factor) => factor.max(1),
            None => (width / AUTO_DOWNSCALE_WIDTH).max(1),
        }
    }
}

/// Scores each frame by its average HSV difference from the previous frame.
pub struct ContentDetector {
    config: ContentDetectorConfig,
    previous: Option<HsvPlanes>,
    /// Start of the current scene, or the first frame seen.
    last_cut: Option<u32>,
}

impl ContentDetector {
    pub fn new(config: ContentDetectorConfig) -> Self {
        info!(
            threshold = config.threshold,
            min_scene_len = config.min_scene_len,
            downscale = ?config.downscale,
            "content detector created"
        );
        Self {
            config,
            previous: None,
            last_cut: None,
        }
    }

    fn planes(&self, frame: &Frame) -> HsvPlanes {
        let (w, h) = frame.image.dimensions();
        let factor = self.config.downscale_factor(w);
        if factor == 1 {
            return HsvPlanes::from_image(&frame.image);
        }
        let small = imageops::resize(
            &frame.image,
            (w / factor).max(1),
            (h / factor).max(1),
            FilterType::Nearest,
        );
        HsvPlanes::from_image(&small)
    }
}

impl ChangeDetector for ContentDetector {
    fn process_frame(&mut self, position: Timecode, frame: &Frame) -> Result<Option<u32>> {
        let index = position.frame();
        let current = self.planes(frame);

        let Some(previous) = self.previous.take() else {
            self.last_cut = Some(index);
            self.previous = Some(current);
            return Ok(None);
        };
        if previous.len() != current.len() {
            bail!(
                "frame {index} has {} pixels after downscale, previous frame had {}",
                current.len(),
                previous.len()
            );
        }

        let delta_h = mean_abs_diff(&previous.h, &current.h);
        let delta_s = mean_abs_diff(&previous.s, &current.s);
        let delta_v = mean_abs_diff(&previous.v, &current.v);
        let score = (delta_h + delta_s + delta_v) / 3.0;

        debug!(frame_number = index, score, delta_h, delta_s, delta_v, "content score");
        self.previous = Some(current);

        let last_cut = *self.last_cut.get_or_insert(index);
        let far_enough = index.saturating_sub(last_cut) >= self.config.min_scene_len;
        if score >= self.config.threshold && far_enough {
            info!(frame_number = index, score, "scene change detected");
            self.last_cut = Some(index);
            return Ok(Some(index));
        }

        Ok(None)
    }
}
