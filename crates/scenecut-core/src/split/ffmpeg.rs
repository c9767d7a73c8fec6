use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use super::{stem_and_extension, SegmentationTool, SCENE_FILE_INFIX};
use crate::scan::SceneBoundary;
use crate::video::decoder::ffmpeg_available;
use crate::video::Timecode;

/// x264 quality used when re-encoding segments.
const CRF: u32 = 22;
const PRESET: &str = "veryfast";

/// Cut time for a scene starting at `start`: half a frame early, so the first
/// frame at or after it is `start` itself even after rounding to microseconds.
fn cut_seconds(start: Timecode) -> f64 {
    if start.fps() <= 0.0 {
        return start.seconds();
    }
    ((f64::from(start.frame()) - 0.5) / start.fps()).max(0.0)
}

/// Splits a video with a single ffmpeg run using the segment muxer.
///
/// Segments are re-encoded with forced keyframes at each scene start so cuts
/// land on exact frames rather than the nearest source keyframe.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegSegmenter;

impl FfmpegSegmenter {
    fn build_args(video: &Path, scenes: &[SceneBoundary], output_dir: &Path) -> Vec<String> {
        let (stem, ext) = stem_and_extension(video);
        let pattern = output_dir.join(format!("{stem}{SCENE_FILE_INFIX}%03d{ext}"));

        let cut_times = scenes
            .iter()
            .skip(1)
            .map(|s| format!("{:.6}", cut_seconds(s.start)))
            .collect::<Vec<_>>()
            .join(",");

        let crf = CRF.to_string();

        let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-v", "error", "-y", "-i"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(video.to_string_lossy().into_owned());
        args.extend(
            [
                "-map", "0:v:0",
                "-map", "0:a?",
                "-c:v", "libx264",
                "-preset", PRESET,
                "-crf", crf.as_str(),
                "-c:a", "aac",
                "-force_key_frames", cut_times.as_str(),
                "-f", "segment",
                "-segment_times", cut_times.as_str(),
                "-segment_start_number", "1",
                "-reset_timestamps", "1",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push(pattern.to_string_lossy().into_owned());
        args
    }
}

impl SegmentationTool for FfmpegSegmenter {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn remediation(&self) -> &'static str {
        "install FFmpeg and make sure it is on PATH"
    }

    fn is_available(&self) -> bool {
        ffmpeg_available()
    }

    fn split(&self, video: &Path, scenes: &[SceneBoundary], output_dir: &Path) -> Result<()> {
        let args = Self::build_args(video, scenes, output_dir);
        info!(?video, ?output_dir, scene_count = scenes.len(), "running ffmpeg segmenter");

        let output = Command::new("ffmpeg")
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .context("failed to run ffmpeg, is ffmpeg installed?")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(%stderr, ?video, "ffmpeg segmenter failed");
            bail!("ffmpeg segmenter failed: {stderr}");
        }

        info!(?output_dir, "ffmpeg segmenter finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_cut_at_every_scene_start_after_the_first() {
        let scenes = [
            SceneBoundary {
                start: Timecode::new(0, 25.0),
                end: Timecode::new(50, 25.0),
            },
            SceneBoundary {
                start: Timecode::new(50, 25.0),
                end: Timecode::new(110, 25.0),
            },
            SceneBoundary {
                start: Timecode::new(110, 25.0),
                end: Timecode::new(200, 25.0),
            },
        ];
        let args = FfmpegSegmenter::build_args(Path::new("in/clip.mkv"), &scenes, Path::new("out"));

        let value_of = |flag: &str| {
            let i = args.iter().position(|a| a == flag).unwrap();
            args[i + 1].clone()
        };
        assert_eq!(value_of("-i"), "in/clip.mkv");
        assert_eq!(value_of("-segment_times"), "1.980000,4.380000");
        assert_eq!(value_of("-force_key_frames"), "1.980000,4.380000");
        assert_eq!(value_of("-segment_start_number"), "1");

        let expected = Path::new("out").join("clip-Scene-%03d.mkv");
        assert_eq!(Path::new(args.last().unwrap()), expected.as_path());
    }

    #[test]
    fn cut_times_never_fall_after_the_scene_start_frame() {
        let fps = 30000.0 / 1001.0;
        for n in 1..200u32 {
            let scenes = [
                SceneBoundary {
                    start: Timecode::new(0, fps),
                    end: Timecode::new(n, fps),
                },
                SceneBoundary {
                    start: Timecode::new(n, fps),
                    end: Timecode::new(n + 10, fps),
                },
            ];
            let args = FfmpegSegmenter::build_args(Path::new("clip.mp4"), &scenes, Path::new("out"));
            let i = args.iter().position(|a| a == "-segment_times").unwrap();
            let cut: f64 = args[i + 1].parse().unwrap();

            let start = f64::from(n) / fps;
            let previous = f64::from(n - 1) / fps;
            assert!(cut <= start, "frame {n}: cut {cut} is after {start}");
            assert!(cut > previous, "frame {n}: cut {cut} is not after frame {}", n - 1);
        }
    }

    #[test]
    fn cut_time_is_clamped_at_zero() {
        assert_eq!(cut_seconds(Timecode::new(0, 25.0)), 0.0);
        assert_eq!(cut_seconds(Timecode::new(4, 0.0)), 0.0);
    }
}
