mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use image::Rgb32FImage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use scenecut_core::detect::ContentDetectorConfig;
use scenecut_core::pipeline::{self, PipelineConfig, SourceDescriptor};
use scenecut_core::scan::ScanProgress;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Frames {
            input,
            images,
            fps,
            debug_frames,
            detector,
        } => {
            info!(?input, ?images, threshold = detector.threshold, "detecting scene start frames");

            let batch = images.as_deref().map(load_image_batch).transpose()?;
            let source = SourceDescriptor::resolve(batch.as_deref(), fps, input.as_deref())?;

            let config = PipelineConfig {
                debug_frames_dir: debug_frames,
                ..pipeline_config(&detector)
            };

            let bar = detector.progress.then(progress_bar).transpose()?;
            let mut on_progress = bar.as_ref().map(|bar| move |p: ScanProgress| update_bar(bar, p));
            let starts = pipeline::get_scene_start_frames(
                source,
                &config,
                on_progress
                    .as_mut()
                    .map(|f| f as &mut dyn FnMut(ScanProgress)),
            )
            .context("scene detection failed")?;
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }

            println!("start_frames: {:?}", starts.indices());
            println!("start_frames_str: {starts}");
            println!("count: {}", starts.count());

            info!(scene_count = starts.count(), "scene detection complete");
            Ok(())
        }
        cli::Command::Split {
            input,
            output_dir,
            detector,
        } => {
            info!(?input, ?output_dir, threshold = detector.threshold, "splitting video into scenes");

            let config = pipeline_config(&detector);
            let bar = detector.progress.then(progress_bar).transpose()?;
            let mut on_progress = bar.as_ref().map(|bar| move |p: ScanProgress| update_bar(bar, p));
            let output = pipeline::split_video_into_scenes(
                &input,
                &output_dir,
                &config,
                on_progress
                    .as_mut()
                    .map(|f| f as &mut dyn FnMut(ScanProgress)),
            )
            .context("video split failed")?;
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }

            if output.paths().is_empty() {
                warn!(?output_dir, "no scene files were generated");
            }
            println!("{output}");

            info!(clip_count = output.paths().len(), "split complete");
            Ok(())
        }
    }
}

fn pipeline_config(args: &cli::DetectorArgs) -> PipelineConfig {
    PipelineConfig {
        detector: ContentDetectorConfig {
            threshold: args.threshold,
            min_scene_len: args.min_scene_len,
            downscale: args.downscale,
        },
        ..PipelineConfig::default()
    }
}

/// Load every image in `dir`, sorted by file name, as normalized float RGB.
fn load_image_batch(dir: &Path) -> Result<Vec<Rgb32FImage>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read image directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    paths.sort();

    info!(?dir, image_count = paths.len(), "loading image batch");

    paths
        .iter()
        .map(|p| {
            image::open(p)
                .map(|img| img.to_rgb32f())
                .with_context(|| format!("failed to load image {}", p.display()))
        })
        .collect()
}

fn progress_bar() -> Result<ProgressBar> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} frames ({eta})")
            .context("invalid progress bar template")?,
    );
    Ok(bar)
}

fn update_bar(bar: &ProgressBar, progress: ScanProgress) {
    if let Some(total) = progress.total_frames {
        bar.set_length(total as u64);
    }
    bar.set_position(progress.frames_read as u64);
}
