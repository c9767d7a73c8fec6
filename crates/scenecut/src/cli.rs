use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "scenecut", about = "Scene change detection and video splitting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Detector settings shared by every subcommand.
#[derive(Args)]
pub struct DetectorArgs {
    /// Content change score that starts a new scene (lower is more sensitive).
    #[arg(short, long, default_value_t = 27.0)]
    pub threshold: f64,

    /// Minimum scene length in frames.
    #[arg(long, default_value_t = 15)]
    pub min_scene_len: u32,

    /// Shrink frames by this factor before scoring (default: picked from the width).
    #[arg(long)]
    pub downscale: Option<u32>,

    /// Show a progress bar while scanning.
    #[arg(long)]
    pub progress: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the frame index where each scene starts.
    Frames {
        /// Path to the input video file (MP4, etc.).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory of images to scan as an in-memory frame batch, in file name order.
        #[arg(long)]
        images: Option<PathBuf>,

        /// Frame rate of the image batch (default: 30).
        #[arg(long)]
        fps: Option<f64>,

        /// Directory to save the first frame of each scene as PNG.
        #[arg(long)]
        debug_frames: Option<PathBuf>,

        #[command(flatten)]
        detector: DetectorArgs,
    },
    /// Split a video into one file per scene using ffmpeg.
    Split {
        /// Path to the input video file.
        #[arg(short, long)]
        input: PathBuf,

        /// Directory to write the scene files into.
        #[arg(short, long, default_value = "output_scenes")]
        output_dir: PathBuf,

        #[command(flatten)]
        detector: DetectorArgs,
    },
}
