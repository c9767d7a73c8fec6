use tracing::{debug, error, info, warn};

use crate::detect::ChangeDetector;
use crate::error::{Result, SceneError};
use crate::video::{FrameSource, Timecode};

/// One scene as a half-open frame range: `start` up to but not including `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneBoundary {
    pub start: Timecode,
    pub end: Timecode,
}

impl SceneBoundary {
    pub fn start_frame(&self) -> u32 {
        self.start.frame()
    }

    pub fn end_frame(&self) -> u32 {
        self.end.frame()
    }

    pub fn frame_count(&self) -> u32 {
        self.end_frame().saturating_sub(self.start_frame())
    }
}

/// Snapshot handed to the progress callback.
#[derive(Debug, Clone, Copy)]
pub struct ScanProgress {
    pub frames_read: u32,
    pub total_frames: Option<u32>,
    pub position: Timecode,
}

/// Parameters for a scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Report progress every Nth frame (1 = every frame).
    pub progress_interval: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            progress_interval: 1,
        }
    }
}

/// Drives a frame source through a change detector until end of stream.
pub struct SceneScanner<'p> {
    options: ScanOptions,
    progress: Option<Box<dyn FnMut(ScanProgress) + 'p>>,
}

impl<'p> SceneScanner<'p> {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            progress: None,
        }
    }

    /// Install a callback invoked every `progress_interval` frames and once at the end.
    pub fn with_progress(mut self, callback: impl FnMut(ScanProgress) + 'p) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Read every frame, feed it to `detector`, and return contiguous scene
    /// boundaries. A source with no cuts (or no frames) yields an empty list.
    pub fn scan(
        &mut self,
        source: &mut dyn FrameSource,
        detector: &mut dyn ChangeDetector,
    ) -> Result<Vec<SceneBoundary>> {
        let fps = source.frame_rate();
        let total_frames = source.total_frames();
        let interval = self.options.progress_interval.max(1);
        info!(fps, ?total_frames, "scene scan starting");

        let mut cuts: Vec<u32> = Vec::new();
        let mut first: Option<u32> = None;
        let mut frames_read: u32 = 0;

        loop {
            let frame = source.read().map_err(|e| {
                error!(frames_read, error = %e, "failed to read frame");
                SceneError::Decode(e)
            })?;
            let Some(frame) = frame else {
                break;
            };

            let position = source.current_timecode();
            first.get_or_insert(position.frame());
            frames_read += 1;

            let cut = detector.process_frame(position, &frame).map_err(|e| {
                error!(frame_number = position.frame(), error = %e, "change detector failed");
                SceneError::DetectionFailure(e)
            })?;
            if let Some(cut) = cut {
                debug!(cut, "detector reported scene start");
                cuts.push(cut);
            }

            if frames_read % interval == 0 {
                self.report(frames_read, total_frames, position);
            }
        }

        let Some(first) = first else {
            warn!("frame source produced no frames");
            return Ok(Vec::new());
        };

        let last = Timecode::new(source.current_index(), fps);
        let held = detector.finish(last).map_err(|e| {
            error!(error = %e, "change detector failed to finish");
            SceneError::DetectionFailure(e)
        })?;
        cuts.extend(held);
        self.report(frames_read, total_frames, last);

        let boundaries = boundaries_from_cuts(&cuts, first, last.frame() + 1, fps);
        info!(
            frames_read,
            scene_count = boundaries.len(),
            "scene scan complete"
        );
        Ok(boundaries)
    }

    fn report(&mut self, frames_read: u32, total_frames: Option<u32>, position: Timecode) {
        if let Some(callback) = self.progress.as_mut() {
            callback(ScanProgress {
                frames_read,
                total_frames,
                position,
            });
        }
    }
}

/// Build contiguous scenes covering `[first, end)` split at `cuts`.
///
/// Cuts outside the open range `(first, end)` are ignored. No usable cuts
/// yields an empty list.
pub fn boundaries_from_cuts(cuts: &[u32], first: u32, end: u32, fps: f64) -> Vec<SceneBoundary> {
    let mut starts: Vec<u32> = cuts
        .iter()
        .copied()
        .filter(|&c| c > first && c < end)
        .collect();
    starts.sort_unstable();
    starts.dedup();
    if starts.is_empty() {
        return Vec::new();
    }
    starts.insert(0, first);

    let ends = starts.iter().skip(1).copied().chain(std::iter::once(end));
    starts
        .iter()
        .zip(ends)
        .map(|(&s, e)| SceneBoundary {
            start: Timecode::new(s, fps),
            end: Timecode::new(e, fps),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use anyhow::bail;
    use image::{Rgb, Rgb32FImage};
    use tracing_test::traced_test;

    use super::*;
    use crate::video::{BufferFrameSource, Frame};

    /// Reports a scene start at each listed frame index.
    pub(crate) struct ScriptedDetector {
        pub cuts: Vec<u32>,
        pub seen: Vec<u32>,
    }

    impl ScriptedDetector {
        pub(crate) fn new(cuts: &[u32]) -> Self {
            Self {
                cuts: cuts.to_vec(),
                seen: Vec::new(),
            }
        }
    }

    impl ChangeDetector for ScriptedDetector {
        fn process_frame(&mut self, position: Timecode, frame: &Frame) -> anyhow::Result<Option<u32>> {
            assert_eq!(position.frame(), frame.frame_number);
            self.seen.push(position.frame());
            Ok(self.cuts.contains(&position.frame()).then_some(position.frame()))
        }
    }

    struct FailingDetector;

    impl ChangeDetector for FailingDetector {
        fn process_frame(&mut self, position: Timecode, _frame: &Frame) -> anyhow::Result<Option<u32>> {
            if position.frame() == 2 {
                bail!("detector blew up");
            }
            Ok(None)
        }
    }

    pub(crate) fn batch(n: usize) -> Vec<Rgb32FImage> {
        (0..n)
            .map(|_| Rgb32FImage::from_pixel(2, 2, Rgb([0.5, 0.5, 0.5])))
            .collect()
    }

    #[test]
    fn boundaries_are_contiguous_half_open() {
        let b = boundaries_from_cuts(&[50], 0, 120, 30.0);
        assert_eq!(b.len(), 2);
        assert_eq!((b[0].start_frame(), b[0].end_frame()), (0, 50));
        assert_eq!((b[1].start_frame(), b[1].end_frame()), (50, 120));
        assert_eq!(b[1].frame_count(), 70);
    }

    #[test]
    fn no_cuts_means_no_boundaries() {
        assert!(boundaries_from_cuts(&[], 0, 120, 30.0).is_empty());
        assert!(boundaries_from_cuts(&[0, 120, 300], 0, 120, 30.0).is_empty());
    }

    #[test]
    fn unordered_duplicate_cuts_are_normalized() {
        let b = boundaries_from_cuts(&[80, 20, 80], 0, 100, 25.0);
        let ranges: Vec<_> = b.iter().map(|s| (s.start_frame(), s.end_frame())).collect();
        assert_eq!(ranges, vec![(0, 20), (20, 80), (80, 100)]);
        for pair in b.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    #[traced_test]
    fn scan_feeds_every_frame_with_its_index() {
        let frames = batch(120);
        let mut source = BufferFrameSource::new(&frames).unwrap();
        let mut detector = ScriptedDetector::new(&[50]);

        let boundaries = SceneScanner::new(ScanOptions::default())
            .scan(&mut source, &mut detector)
            .unwrap();

        assert_eq!(detector.seen, (0..120).collect::<Vec<u32>>());
        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].start_frame(), 0);
        assert_eq!(boundaries[1].start_frame(), 50);
        assert_eq!(boundaries[1].end_frame(), 120);
        assert!(logs_contain("scene scan complete"));
    }

    #[test]
    fn scan_after_seek_starts_at_seek_position() {
        let frames = batch(40);
        let mut source = BufferFrameSource::new(&frames).unwrap();
        source.seek(10u32.into()).unwrap();
        let mut detector = ScriptedDetector::new(&[25]);

        let boundaries = SceneScanner::new(ScanOptions::default())
            .scan(&mut source, &mut detector)
            .unwrap();

        let ranges: Vec<_> = boundaries
            .iter()
            .map(|s| (s.start_frame(), s.end_frame()))
            .collect();
        assert_eq!(ranges, vec![(10, 25), (25, 40)]);
    }

    #[test]
    fn progress_is_reported_at_interval() {
        let frames = batch(10);
        let mut source = BufferFrameSource::new(&frames).unwrap();
        let mut detector = ScriptedDetector::new(&[]);
        let mut reports = Vec::new();

        let boundaries = SceneScanner::new(ScanOptions {
            progress_interval: 4,
        })
        .with_progress(|p| reports.push((p.frames_read, p.total_frames)))
        .scan(&mut source, &mut detector)
        .unwrap();

        assert!(boundaries.is_empty());
        assert_eq!(reports, vec![(4, Some(10)), (8, Some(10)), (10, Some(10))]);
    }

    #[test]
    #[traced_test]
    fn detector_failure_is_logged_and_propagated() {
        let frames = batch(5);
        let mut source = BufferFrameSource::new(&frames).unwrap();

        let err = SceneScanner::new(ScanOptions::default())
            .scan(&mut source, &mut FailingDetector)
            .unwrap_err();

        match err {
            SceneError::DetectionFailure(e) => assert_eq!(e.to_string(), "detector blew up"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(logs_contain("change detector failed"));
    }
}
