use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{debug, info, warn};

use crate::scenes::SceneStarts;
use crate::video::{Frame, FrameSource, SeekTarget};

/// Fonts tried in order when no explicit font is given.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "C:\\Windows\\Fonts\\consola.ttf",
];

const TEXT_SCALE: f32 = 28.0;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
const TEXT_LINE_HEIGHT: i32 = 30;

/// Writes the first frame of each scene as a PNG with a frame/time overlay.
pub struct DebugRenderer {
    font: Option<FontVec>,
}

impl DebugRenderer {
    pub fn new() -> Self {
        Self::with_font(None)
    }

    /// Use `font_path` if given, otherwise the first system font that loads.
    pub fn with_font(font_path: Option<&Path>) -> Self {
        let font = match font_path {
            Some(path) => load_font(path),
            None => FONT_CANDIDATES
                .iter()
                .find_map(|p| load_font(Path::new(p))),
        };
        if font.is_none() {
            warn!("no debug font available, thumbnails will have no text overlay");
        }
        Self { font }
    }

    /// Seek to every scene start, save that frame into `dir`, then rewind the source.
    pub fn save_scene_starts(
        &self,
        source: &mut dyn FrameSource,
        starts: &SceneStarts,
        dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        info!(?dir, scene_count = starts.count(), "saving scene start frames");

        let mut saved = Vec::with_capacity(starts.count());
        for (scene, &index) in starts.indices().iter().enumerate() {
            source.seek(SeekTarget::Frame(index))?;
            let Some(frame) = source.read()? else {
                warn!(index, "scene start is past the end of the source");
                continue;
            };
            saved.push(self.save_frame(&frame, scene as u32 + 1, dir)?);
        }
        source.reset()?;
        Ok(saved)
    }

    pub fn save_frame(&self, frame: &Frame, scene_number: u32, dir: &Path) -> Result<PathBuf> {
        let mut img = frame.image.clone();
        self.draw_text_overlay(&mut img, frame, scene_number);

        let path = dir.join(format!("scene_{:03}_frame_{:08}.png", scene_number, frame.frame_number));
        img.save(&path)
            .with_context(|| format!("failed to save debug frame to {}", path.display()))?;

        debug!(?path, "saved debug frame");
        Ok(path)
    }

    fn draw_text_overlay(&self, img: &mut RgbImage, frame: &Frame, scene_number: u32) {
        let Some(font) = &self.font else { return };
        let scale = PxScale::from(TEXT_SCALE);
        let x = 10;
        let mut y = 10;

        let lines = [
            format!("Scene:{scene_number}"),
            format!("F:{}", frame.frame_number),
            format!("T:{:.3}s", frame.timestamp_seconds),
        ];
        let box_height = (TEXT_LINE_HEIGHT * lines.len() as i32 + 10) as u32;
        draw_filled_rect_mut(
            img,
            Rect::at(0, 0).of_size(img.width().min(220), img.height().min(box_height)),
            TEXT_BACKGROUND,
        );

        for line in &lines {
            draw_text_mut(img, TEXT_COLOR, x, y, scale, font, line);
            y += TEXT_LINE_HEIGHT;
        }
    }
}

impl Default for DebugRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn load_font(path: &Path) -> Option<FontVec> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            debug!(?path, error = %e, "failed to read font file");
            return None;
        }
    };
    match FontVec::try_from_vec(data) {
        Ok(font) => {
            info!(?path, "loaded debug font");
            Some(font)
        }
        Err(e) => {
            warn!(?path, error = %e, "failed to parse font file");
            None
        }
    }
}
