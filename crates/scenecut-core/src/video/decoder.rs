use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::{bail, Context, Result};
use image::RgbImage;
use tracing::{debug, error, info, warn};

use super::frame::Frame;

/// Video metadata obtained by probing with ffprobe.
#[derive(Debug, Clone, Copy)]
pub struct ProbeResult {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Container frame count; many formats leave this unset.
    pub frame_count: Option<u32>,
}

/// Returns true when `ffmpeg` can be launched from PATH.
pub fn ffmpeg_available() -> bool {
    let available = Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    debug!(available, "checked ffmpeg availability");
    available
}

pub fn probe(path: &Path) -> Result<ProbeResult> {
    info!(?path, "probing video metadata with ffprobe");

    let output = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height,r_frame_rate,nb_frames",
            "-of", "csv=p=0",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .context("failed to run ffprobe, is ffmpeg installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(%stderr, ?path, "ffprobe failed");
        bail!("ffprobe failed: {stderr}");
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&stdout)
}

/// Parse `width,height,num/den[,nb_frames]` as printed by ffprobe.
fn parse_probe_output(stdout: &str) -> Result<ProbeResult> {
    let line = stdout.lines().next().unwrap_or("").trim();
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 3 {
        error!(%stdout, "unexpected ffprobe output format, expected width,height,fps");
        bail!("unexpected ffprobe output: {stdout}");
    }

    let width: u32 = parts[0].parse().context("failed to parse width")?;
    let height: u32 = parts[1].parse().context("failed to parse height")?;

    let fps = if let Some((num, den)) = parts[2].split_once('/') {
        let num: f64 = num.parse().context("failed to parse fps numerator")?;
        let den: f64 = den.parse().context("failed to parse fps denominator")?;
        if den > 0.0 { num / den } else { 0.0 }
    } else {
        parts[2].parse().context("failed to parse fps")?
    };

    if fps <= 0.0 {
        warn!(fps, "video has non-positive fps, timestamps will be 0.0");
    }

    // "N/A" for streams without a container frame count.
    let frame_count = parts.get(3).and_then(|s| s.trim().parse().ok());

    info!(width, height, fps, ?frame_count, "probe completed");
    Ok(ProbeResult {
        width,
        height,
        fps,
        frame_count,
    })
}

/// ffmpeg arguments that decode `path` to raw RGB24 on stdout, starting at
/// decoded frame `start_frame`.
///
/// Frames pass through untouched on every path, so index `n` names the same
/// picture whether decoding started at 0 or at `n`. Indices map to
/// `n / fps` seconds only for constant frame rate input.
fn decode_args(path: &Path, start_frame: u32) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into(), path.into()];
    if start_frame > 0 {
        // Frame-exact: drop everything before the target instead of seeking by time.
        args.push("-vf".into());
        args.push(format!("select=gte(n\\,{start_frame})").into());
    }
    args.extend(
        [
            "-fps_mode", "passthrough",
            "-an",
            "-f", "rawvideo",
            "-pix_fmt", "rgb24",
            "-v", "error",
            "pipe:1",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args
}

/// Decodes video frames by piping raw RGB24 data from the ffmpeg CLI.
///
/// Frame numbers count decoded frames; see [`decode_args`] for how they
/// relate to timestamps.
pub struct VideoDecoder {
    child: Child,
    info: ProbeResult,
    next_frame_number: u32,
    frame_bytes: usize,
}

impl VideoDecoder {
    /// Open a video file for decoding from the first frame.
    pub fn open(path: &Path) -> Result<Self> {
        let info = probe(path)?;
        Self::spawn(path, info, 0)
    }

    /// Spawn a decoder whose first decoded frame is `start_frame`, reusing
    /// metadata from an earlier probe.
    pub fn spawn(path: &Path, info: ProbeResult, start_frame: u32) -> Result<Self> {
        if !path.exists() {
            bail!("video file does not exist: {}", path.display());
        }
        if info.width == 0 || info.height == 0 {
            bail!("invalid video dimensions: {}x{}", info.width, info.height);
        }

        info!(?path, start_frame, "spawning ffmpeg decoder process");

        let child = Command::new("ffmpeg")
            .args(decode_args(path, start_frame))
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to spawn ffmpeg, is ffmpeg installed?")?;

        let frame_bytes = (info.width as usize) * (info.height as usize) * 3;

        info!(
            width = info.width,
            height = info.height,
            fps = info.fps,
            frame_bytes,
            "video decoder opened"
        );

        Ok(Self {
            child,
            info,
            next_frame_number: start_frame,
            frame_bytes,
        })
    }

    pub fn info(&self) -> ProbeResult {
        self.info
    }

    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    pub fn fps(&self) -> f64 {
        self.info.fps
    }

    /// Read the next frame from the ffmpeg pipe, or `None` if the video is finished.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let stdout = self
            .child
            .stdout
            .as_mut()
            .context("ffmpeg stdout not available")?;

        let mut buf = vec![0u8; self.frame_bytes];
        let mut read = 0;

        while read < self.frame_bytes {
            match stdout.read(&mut buf[read..]) {
                Ok(0) => {
                    if read == 0 {
                        info!(next_frame = self.next_frame_number, "video stream ended");
                        return Ok(None);
                    }
                    error!(
                        read_bytes = read,
                        expected_bytes = self.frame_bytes,
                        frame = self.next_frame_number,
                        "ffmpeg stream ended mid-frame"
                    );
                    bail!(
                        "ffmpeg stream ended mid-frame (read {read}/{} bytes)",
                        self.frame_bytes,
                    );
                }
                Ok(n) => read += n,
                Err(e) => {
                    error!(frame = self.next_frame_number, %e, "failed to read from ffmpeg pipe");
                    return Err(e).context("failed to read from ffmpeg pipe");
                }
            }
        }

        let image = RgbImage::from_raw(self.info.width, self.info.height, buf)
            .context("failed to create RgbImage from raw frame data")?;

        let frame = Frame::new(image, self.next_frame_number, self.info.fps);
        self.next_frame_number += 1;

        debug!(
            frame_number = frame.frame_number,
            timestamp_seconds = frame.timestamp_seconds,
            "decoded frame"
        );

        Ok(Some(frame))
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        info!(next_frame = self.next_frame_number, "closing video decoder");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
