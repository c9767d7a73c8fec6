pub mod ffmpeg;

use std::path::{Path, PathBuf};

use anyhow::Result as AnyResult;
use tracing::{error, info, warn};

use crate::error::{Result, SceneError};
use crate::scan::SceneBoundary;

pub use ffmpeg::FfmpegSegmenter;

/// Infix between the source stem and the scene number in generated file names.
pub const SCENE_FILE_INFIX: &str = "-Scene-";

/// External tool that physically cuts a video into per-scene files.
pub trait SegmentationTool {
    /// Name used in error messages.
    fn name(&self) -> &'static str;

    /// Remediation shown when the tool is missing.
    fn remediation(&self) -> &'static str;

    fn is_available(&self) -> bool;

    /// Cut `video` at every scene start in one run, writing
    /// `<stem>-Scene-<N><ext>` files (N from 1) into `output_dir`.
    fn split(&self, video: &Path, scenes: &[SceneBoundary], output_dir: &Path) -> AnyResult<()>;
}

/// Turns scene boundaries into segment files using a [`SegmentationTool`].
pub struct SceneSplitter<T> {
    tool: T,
}

impl<T: SegmentationTool> SceneSplitter<T> {
    pub fn new(tool: T) -> Self {
        Self { tool }
    }

    /// Fail with `UnavailableTool` unless the segmentation tool can run.
    fn ensure_available(&self) -> Result<()> {
        if self.tool.is_available() {
            return Ok(());
        }
        error!(tool = self.tool.name(), "segmentation tool is not available");
        Err(SceneError::UnavailableTool {
            tool: self.tool.name(),
            remediation: self.tool.remediation(),
        })
    }

    /// Checks run in order: the video must exist, then the tool must be
    /// available; only then is `output_dir` created.
    pub fn preflight(&self, video_path: &Path, output_dir: &Path) -> Result<()> {
        if !video_path.exists() {
            error!(?video_path, "video file not found");
            return Err(SceneError::NotFound {
                path: video_path.to_path_buf(),
            });
        }
        self.ensure_available()?;
        std::fs::create_dir_all(output_dir)?;
        Ok(())
    }

    /// Split `video_path` into one file per boundary inside `output_dir`.
    ///
    /// An empty boundary list is a single scene: the input path is returned
    /// as-is and the tool is not run. Otherwise returns the generated files,
    /// sorted and absolute; this may be empty if the tool wrote nothing.
    pub fn split(
        &self,
        video_path: &Path,
        output_dir: &Path,
        boundaries: &[SceneBoundary],
    ) -> Result<Vec<PathBuf>> {
        self.preflight(video_path, output_dir)?;
        self.segment(video_path, output_dir, boundaries)
    }

    /// [`split`](Self::split) without the checks, for callers that already
    /// ran [`preflight`](Self::preflight).
    pub fn segment(
        &self,
        video_path: &Path,
        output_dir: &Path,
        boundaries: &[SceneBoundary],
    ) -> Result<Vec<PathBuf>> {
        if boundaries.is_empty() {
            info!(?video_path, "no scene changes detected, using full video");
            return Ok(vec![video_path.to_path_buf()]);
        }

        info!(
            ?video_path,
            ?output_dir,
            scene_count = boundaries.len(),
            tool = self.tool.name(),
            "splitting video into scenes"
        );
        self.tool
            .split(video_path, boundaries, output_dir)
            .map_err(|e| {
                error!(error = %e, "segmentation tool failed");
                SceneError::SegmentationFailed(e)
            })?;

        let files = discover_scene_files(video_path, output_dir)?;
        if files.is_empty() {
            warn!(?output_dir, "segmentation produced no matching files");
        }
        info!(clip_count = files.len(), "split complete");
        Ok(files)
    }
}

/// File name the segmentation tool writes for scene `number` (1-based).
pub fn scene_file_name(video_path: &Path, number: u32) -> String {
    let (stem, ext) = stem_and_extension(video_path);
    format!("{stem}{SCENE_FILE_INFIX}{number:03}{ext}")
}

/// Find `<stem>-Scene-*<ext>` files in `output_dir`, sorted, as absolute paths.
pub fn discover_scene_files(video_path: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let (stem, ext) = stem_and_extension(video_path);
    let prefix = format!("{stem}{SCENE_FILE_INFIX}");

    let mut files = Vec::new();
    for entry in std::fs::read_dir(output_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.len() >= prefix.len() + ext.len()
            && name.starts_with(&prefix)
            && name.ends_with(&ext)
        {
            files.push(std::path::absolute(entry.path())?);
        }
    }
    files.sort();
    Ok(files)
}

/// Source stem and extension including the leading dot (empty if none).
pub(crate) fn stem_and_extension(video_path: &Path) -> (String, String) {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = video_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::{Cell, RefCell};
    use std::fs;

    use anyhow::bail;
    use tracing_test::traced_test;

    use super::*;
    use crate::video::Timecode;

    /// Writes `<stem>-Scene-NNN<ext>` files like the real tool, or fails.
    pub(crate) struct FakeTool {
        pub available: bool,
        pub fail: bool,
        pub calls: Cell<u32>,
        pub availability_checks: Cell<u32>,
        pub last_scene_count: RefCell<Option<usize>>,
        pub write_files: bool,
    }

    impl FakeTool {
        pub(crate) fn working() -> Self {
            Self {
                available: true,
                fail: false,
                calls: Cell::new(0),
                availability_checks: Cell::new(0),
                last_scene_count: RefCell::new(None),
                write_files: true,
            }
        }
    }

    impl SegmentationTool for &FakeTool {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn remediation(&self) -> &'static str {
            "install the fake tool"
        }

        fn is_available(&self) -> bool {
            self.availability_checks.set(self.availability_checks.get() + 1);
            self.available
        }

        fn split(&self, video: &Path, scenes: &[SceneBoundary], output_dir: &Path) -> AnyResult<()> {
            self.calls.set(self.calls.get() + 1);
            *self.last_scene_count.borrow_mut() = Some(scenes.len());
            if self.fail {
                bail!("fake tool crashed");
            }
            if self.write_files {
                for n in 1..=scenes.len() as u32 {
                    fs::write(output_dir.join(scene_file_name(video, n)), b"clip")?;
                }
            }
            Ok(())
        }
    }

    fn boundaries(starts: &[u32], end: u32) -> Vec<SceneBoundary> {
        starts
            .iter()
            .zip(starts.iter().skip(1).chain(std::iter::once(&end)))
            .map(|(&s, &e)| SceneBoundary {
                start: Timecode::new(s, 30.0),
                end: Timecode::new(e, 30.0),
            })
            .collect()
    }

    fn touch_video(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"not really a video").unwrap();
        path
    }

    #[test]
    fn scene_file_names() {
        assert_eq!(scene_file_name(Path::new("/v/clip.mp4"), 1), "clip-Scene-001.mp4");
        assert_eq!(scene_file_name(Path::new("raw"), 12), "raw-Scene-012");
    }

    #[test]
    fn discovery_matches_stem_and_extension_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "clip-Scene-003.mp4",
            "clip-Scene-001.mp4",
            "clip-Scene-002.mp4",
            "clip-Scene-001.mkv",
            "other-Scene-001.mp4",
            "clip.mp4",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("clip-Scene-999.mp4")).unwrap();

        let files = discover_scene_files(Path::new("videos/clip.mp4"), dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["clip-Scene-001.mp4", "clip-Scene-002.mp4", "clip-Scene-003.mp4"]
        );
        assert!(files.iter().all(|p| p.is_absolute()));
    }

    #[test]
    #[traced_test]
    fn missing_video_fails_before_anything_else() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let tool = FakeTool::working();
        let splitter = SceneSplitter::new(&tool);

        let err = splitter
            .split(&dir.path().join("missing.mp4"), &out, &boundaries(&[0, 10], 20))
            .unwrap_err();

        assert!(matches!(err, SceneError::NotFound { .. }));
        assert!(!out.exists());
        assert_eq!(tool.calls.get(), 0);
    }

    #[test]
    fn unavailable_tool_is_reported_with_remediation() {
        let dir = tempfile::tempdir().unwrap();
        let video = touch_video(dir.path(), "clip.mp4");
        let tool = FakeTool {
            available: false,
            ..FakeTool::working()
        };

        let err = SceneSplitter::new(&tool)
            .split(&video, &dir.path().join("out"), &boundaries(&[0, 10], 20))
            .unwrap_err();

        match err {
            SceneError::UnavailableTool { tool, remediation } => {
                assert_eq!(tool, "fake");
                assert_eq!(remediation, "install the fake tool");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(tool.calls.get(), 0);
    }

    #[test]
    fn no_boundaries_returns_input_without_running_tool() {
        let dir = tempfile::tempdir().unwrap();
        let video = touch_video(dir.path(), "clip.mp4");
        let out = dir.path().join("nested/out");
        let tool = FakeTool::working();

        let files = SceneSplitter::new(&tool).split(&video, &out, &[]).unwrap();

        assert_eq!(files, vec![video]);
        assert_eq!(tool.calls.get(), 0);
        assert!(out.is_dir());
    }

    #[test]
    fn tool_runs_once_and_outputs_are_discovered() {
        let dir = tempfile::tempdir().unwrap();
        let video = touch_video(dir.path(), "clip.mp4");
        let out = dir.path().join("out");
        let tool = FakeTool::working();

        let files = SceneSplitter::new(&tool)
            .split(&video, &out, &boundaries(&[0, 50, 90], 120))
            .unwrap();

        assert_eq!(tool.calls.get(), 1);
        assert_eq!(tool.availability_checks.get(), 1);
        assert_eq!(*tool.last_scene_count.borrow(), Some(3));
        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("clip-Scene-001.mp4"));
        assert!(files[2].ends_with("clip-Scene-003.mp4"));
    }

    #[test]
    fn tool_writing_nothing_is_an_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let video = touch_video(dir.path(), "clip.mp4");
        let tool = FakeTool {
            write_files: false,
            ..FakeTool::working()
        };

        let files = SceneSplitter::new(&tool)
            .split(&video, &dir.path().join("out"), &boundaries(&[0, 5], 10))
            .unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn tool_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let video = touch_video(dir.path(), "clip.mp4");
        let tool = FakeTool {
            fail: true,
            ..FakeTool::working()
        };

        let err = SceneSplitter::new(&tool)
            .split(&video, &dir.path().join("out"), &boundaries(&[0, 5], 10))
            .unwrap_err();
        assert!(matches!(err, SceneError::SegmentationFailed(_)));
    }
}
