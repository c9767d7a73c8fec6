use std::fmt;
use std::path::{Path, PathBuf};

use image::Rgb32FImage;
use tracing::{error, info, warn};

use crate::debug::DebugRenderer;
use crate::detect::{ChangeDetector, ContentDetector, ContentDetectorConfig};
use crate::error::{Result, SceneError};
use crate::scan::{ScanOptions, ScanProgress, SceneScanner};
use crate::scenes::{extract_scene_starts, SceneStarts};
use crate::split::{FfmpegSegmenter, SceneSplitter, SegmentationTool};
use crate::video::{BufferFrameSource, FileFrameSource, FrameSource, DEFAULT_FRAME_RATE};

/// Parameters shared by both entry points.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub detector: ContentDetectorConfig,
    pub scan: ScanOptions,
    /// Directory to write scene start thumbnails, or None to skip.
    pub debug_frames_dir: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            detector: ContentDetectorConfig::with_threshold(threshold),
            ..Self::default()
        }
    }
}

/// Where frames come from: an in-memory batch or a video file.
pub enum SourceDescriptor<'a> {
    Batch { frames: &'a [Rgb32FImage], fps: f64 },
    File(&'a Path),
}

impl<'a> SourceDescriptor<'a> {
    /// Pick whichever input is usable, preferring a non-empty batch over a path.
    pub fn resolve(
        frames: Option<&'a [Rgb32FImage]>,
        fps: Option<f64>,
        video_path: Option<&'a Path>,
    ) -> Result<Self> {
        if let Some(frames) = frames.filter(|f| !f.is_empty()) {
            return Ok(SourceDescriptor::Batch {
                frames,
                fps: fps.unwrap_or(DEFAULT_FRAME_RATE),
            });
        }
        if let Some(path) = video_path.filter(|p| !p.as_os_str().is_empty()) {
            return Ok(SourceDescriptor::File(path));
        }
        error!("neither a frame batch nor a video path was supplied");
        Err(SceneError::InvalidInput(
            "expected either a non-empty frame batch or a video file path".to_string(),
        ))
    }

    /// Construct the concrete frame source for this descriptor.
    pub fn open(&self) -> Result<Box<dyn FrameSource + 'a>> {
        match *self {
            SourceDescriptor::Batch { frames, fps } => {
                Ok(Box::new(BufferFrameSource::with_frame_rate(frames, fps)?))
            }
            SourceDescriptor::File(path) => Ok(Box::new(open_video(path)?)),
        }
    }
}

/// Generated scene files. Displays as one path per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutput(Vec<PathBuf>);

impl SplitOutput {
    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.0
    }
}

impl fmt::Display for SplitOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, path) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", path.display())?;
        }
        Ok(())
    }
}

/// Detect scene start frames in a batch or a video file.
pub fn get_scene_start_frames(
    source: SourceDescriptor<'_>,
    config: &PipelineConfig,
    progress: Option<&mut dyn FnMut(ScanProgress)>,
) -> Result<SceneStarts> {
    let mut frames = source.open()?;
    let mut detector = ContentDetector::new(config.detector.clone());
    let mut scanner = build_scanner(config, progress);

    let starts = get_scene_start_frames_with(frames.as_mut(), &mut detector, &mut scanner)?;

    if let Some(dir) = &config.debug_frames_dir {
        DebugRenderer::new()
            .save_scene_starts(frames.as_mut(), &starts, dir)
            .map_err(SceneError::DebugOutput)?;
    }
    Ok(starts)
}

/// Scan `source` with `detector` and canonicalize the result.
pub fn get_scene_start_frames_with(
    source: &mut dyn FrameSource,
    detector: &mut dyn ChangeDetector,
    scanner: &mut SceneScanner<'_>,
) -> Result<SceneStarts> {
    let boundaries = scanner.scan(source, detector)?;
    if boundaries.is_empty() {
        info!("no scene changes detected, returning frame 0");
    }
    let starts = extract_scene_starts(&boundaries);
    info!(
        scene_count = starts.count(),
        start_frames = %starts,
        "scene start frames detected"
    );
    Ok(starts)
}

/// Detect scenes in `video_path` and cut it into one file per scene with ffmpeg.
pub fn split_video_into_scenes(
    video_path: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
    progress: Option<&mut dyn FnMut(ScanProgress)>,
) -> Result<SplitOutput> {
    let splitter = SceneSplitter::new(FfmpegSegmenter);
    let mut detector = ContentDetector::new(config.detector.clone());
    let mut scanner = build_scanner(config, progress);
    split_video_into_scenes_with(
        video_path,
        output_dir,
        |path| Ok(Box::new(open_video(path)?)),
        &mut detector,
        &mut scanner,
        &splitter,
    )
}

/// Like [`split_video_into_scenes`] with every collaborator injected.
///
/// Checks run in order: the video must exist, then the tool must be
/// available; only then is `output_dir` created and the video scanned.
pub fn split_video_into_scenes_with<'s, T: SegmentationTool>(
    video_path: &Path,
    output_dir: &Path,
    open: impl FnOnce(&Path) -> Result<Box<dyn FrameSource + 's>>,
    detector: &mut dyn ChangeDetector,
    scanner: &mut SceneScanner<'_>,
    splitter: &SceneSplitter<T>,
) -> Result<SplitOutput> {
    splitter.preflight(video_path, output_dir)?;

    info!(?video_path, "analyzing video");
    let mut source = open(video_path)?;
    let boundaries = scanner.scan(source.as_mut(), detector)?;
    info!(scene_count = boundaries.len(), "scenes detected");
    drop(source);

    let files = splitter.segment(video_path, output_dir, &boundaries)?;
    if files.is_empty() {
        warn!(?output_dir, "no scene files were generated");
    }
    info!(clip_count = files.len(), "done");
    Ok(SplitOutput(files))
}

fn open_video(path: &Path) -> Result<FileFrameSource> {
    if !path.exists() {
        error!(?path, "video file not found");
        return Err(SceneError::NotFound {
            path: path.to_path_buf(),
        });
    }
    FileFrameSource::open(path).map_err(|e| {
        error!(?path, error = %e, "failed to open video");
        SceneError::Decode(e)
    })
}

fn build_scanner<'p>(
    config: &PipelineConfig,
    progress: Option<&'p mut dyn FnMut(ScanProgress)>,
) -> SceneScanner<'p> {
    let scanner = SceneScanner::new(config.scan.clone());
    match progress {
        Some(callback) => scanner.with_progress(callback),
        None => scanner,
    }
}
