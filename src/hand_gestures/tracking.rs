//! Frame loop feeding the dispatcher.
//!
//! Capture and pose estimation stay behind [`FrameSource`] and
//! [`PoseEstimator`]; the loop only extracts signatures and paces itself to
//! the configured frame interval.

use crate::hand_gestures::engine::{extract, HandLandmarks};
use crate::hand_gestures::service::{DispatchOutcome, GestureDispatcher};
use anyhow::Context;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait FrameSource {
    type Frame;

    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> anyhow::Result<Option<Self::Frame>>;
}

/// Hand-pose model: at most one hand per frame.
pub trait PoseEstimator<F> {
    fn detect(&mut self, frame: &F) -> Option<HandLandmarks>;
}

pub struct TrackingLoop {
    frame_interval: Duration,
    stop: Arc<AtomicBool>,
}

impl TrackingLoop {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            frame_interval,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that ends [`run`](Self::run) after the current frame.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Handle one frame. `None` when no hand was detected.
    pub fn process_frame<F, E>(
        dispatcher: &mut GestureDispatcher,
        estimator: &mut E,
        frame: &F,
    ) -> Option<DispatchOutcome>
    where
        E: PoseEstimator<F>,
    {
        let hand = estimator.detect(frame)?;
        let signature = extract(&hand);
        let outcome = dispatcher.on_signature(&signature);
        tracing::trace!(gesture = %signature, outcome = ?outcome, "frame processed");
        Some(outcome)
    }

    /// Pull frames until the source ends or the stop flag is raised.
    /// Returns the number of frames processed.
    pub fn run<S, E, C>(
        &self,
        source: &mut S,
        estimator: &mut E,
        dispatcher: &mut GestureDispatcher,
        mut on_outcome: C,
    ) -> anyhow::Result<usize>
    where
        S: FrameSource,
        E: PoseEstimator<S::Frame>,
        C: FnMut(&DispatchOutcome),
    {
        let mut frames = 0;
        while !self.stop.load(Ordering::SeqCst) {
            let started = Instant::now();
            let Some(frame) = source.next_frame()? else {
                break;
            };
            frames += 1;
            if let Some(outcome) = Self::process_frame(dispatcher, estimator, &frame) {
                on_outcome(&outcome);
            }
            let elapsed = started.elapsed();
            if elapsed < self.frame_interval {
                std::thread::sleep(self.frame_interval - elapsed);
            }
        }
        tracing::debug!(frames, "tracking loop stopped");
        Ok(frames)
    }
}

/// Recorded session: one JSON value per line, either `null` (no hand) or
/// an array of 21 `[x, y, z]` points.
pub struct JsonLinesLandmarks<R> {
    reader: R,
    line_no: usize,
}

impl<R: BufRead> JsonLinesLandmarks<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line_no: 0 }
    }
}

impl<R: BufRead> FrameSource for JsonLinesLandmarks<R> {
    type Frame = Option<HandLandmarks>;

    fn next_frame(&mut self) -> anyhow::Result<Option<Self::Frame>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if !line.trim().is_empty() {
                break;
            }
        }
        let raw: Option<Vec<[f32; 3]>> = serde_json::from_str(line.trim())
            .with_context(|| format!("line {}: invalid landmark frame", self.line_no))?;
        let hand = raw
            .map(HandLandmarks::try_from)
            .transpose()
            .with_context(|| format!("line {}", self.line_no))?;
        Ok(Some(hand))
    }
}

/// Estimator for sources that already carry landmarks.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordedPose;

impl PoseEstimator<Option<HandLandmarks>> for RecordedPose {
    fn detect(&mut self, frame: &Option<HandLandmarks>) -> Option<HandLandmarks> {
        frame.clone()
    }
}
