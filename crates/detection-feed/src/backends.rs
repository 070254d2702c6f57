//! Detector and frame source implementations.
//!
//! None of these touch a camera: they either play a script, replay a
//! recorded detection stream, or synthesize frames. A hardware-backed
//! recognizer plugs in through the same traits.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use handwave_common::error::{HandwaveError, HandwaveResult};
use handwave_response_model::detection::parse_stream;
use handwave_response_model::{
    GestureCandidate, Landmark, RecognizerOutput, StreamEntry, TimestampNs,
};

use crate::{FrameSource, GestureDetector, ReadyState, VideoFrame};

/// One scripted detector result.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Output(RecognizerOutput),
    Fail(String),
}

impl ScriptStep {
    /// One hand showing `category`.
    pub fn gesture(category: &str, score: f32) -> Self {
        ScriptStep::Output(RecognizerOutput {
            gestures: vec![vec![GestureCandidate {
                category: category.to_string(),
                score,
            }]],
            landmarks: vec![vec![Landmark {
                x: 0.5,
                y: 0.5,
                z: 0.0,
            }]],
        })
    }

    /// Nobody in frame.
    pub fn empty() -> Self {
        ScriptStep::Output(RecognizerOutput::default())
    }

    pub fn fail(reason: &str) -> Self {
        ScriptStep::Fail(reason.to_string())
    }
}

/// Detector that returns pre-scripted results, one per call.
///
/// Once the script runs out, every further call returns an empty output.
pub struct ScriptedDetector {
    steps: VecDeque<ScriptStep>,
    calls: Arc<AtomicU64>,
}

impl ScriptedDetector {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps: steps.into(),
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A detector that never sees anyone.
    pub fn repeating_empty() -> Self {
        Self::new(vec![])
    }

    /// Shared counter of `detect` calls, readable after the detector has
    /// been boxed into a feed.
    pub fn calls(&self) -> Arc<AtomicU64> {
        self.calls.clone()
    }
}

impl GestureDetector for ScriptedDetector {
    fn detect(
        &mut self,
        _frame: &VideoFrame,
        _timestamp_ns: TimestampNs,
    ) -> HandwaveResult<RecognizerOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(ScriptStep::Output(output)) => Ok(output),
            Some(ScriptStep::Fail(reason)) => Err(HandwaveError::detector(reason)),
            None => Ok(RecognizerOutput::default()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Detector that plays back a recorded stream in real time.
///
/// Recorded timestamps are taken relative to the first entry and lined up
/// with the first `detect` call. Each call returns the most recent recorded
/// output at or before the elapsed time, so a recording sampled at a low
/// rate still looks like a continuous scene. A failure marker makes the one
/// call that reaches it fail, as the recorded detector did.
pub struct ReplayDetector {
    recorded: Vec<StreamEntry>,
    cursor: usize,
    origin_ns: Option<TimestampNs>,
    held: RecognizerOutput,
}

impl ReplayDetector {
    pub fn new(mut recorded: Vec<StreamEntry>) -> Self {
        recorded.sort_by_key(StreamEntry::timestamp_ns);
        Self {
            recorded,
            cursor: 0,
            origin_ns: None,
            held: RecognizerOutput::default(),
        }
    }

    /// Parse a JSONL recording.
    pub fn from_jsonl(jsonl: &str) -> HandwaveResult<Self> {
        Ok(Self::new(parse_stream(jsonl)?))
    }

    /// Load a JSONL recording from disk.
    pub fn load(path: &Path) -> HandwaveResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let detector = Self::from_jsonl(&content)?;
        tracing::debug!(
            path = %path.display(),
            entries = detector.recorded.len(),
            failures = detector.failures(),
            "Loaded detection recording"
        );
        Ok(detector)
    }

    /// Time between the first and last recorded entry.
    pub fn span_ns(&self) -> u64 {
        match (self.recorded.first(), self.recorded.last()) {
            (Some(first), Some(last)) => last.timestamp_ns() - first.timestamp_ns(),
            _ => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }

    /// Number of recorded failure markers.
    pub fn failures(&self) -> usize {
        self.recorded
            .iter()
            .filter(|entry| matches!(entry, StreamEntry::Failure(_)))
            .count()
    }

    /// Every recorded entry has been reached.
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.recorded.len()
    }
}

impl GestureDetector for ReplayDetector {
    fn initialize(&mut self) -> HandwaveResult<()> {
        if self.failures() == self.recorded.len() {
            return Err(HandwaveError::initialization(
                "Replay recording contains no detections",
            ));
        }
        Ok(())
    }

    fn detect(
        &mut self,
        _frame: &VideoFrame,
        timestamp_ns: TimestampNs,
    ) -> HandwaveResult<RecognizerOutput> {
        let origin = *self.origin_ns.get_or_insert(timestamp_ns);
        let elapsed = timestamp_ns.saturating_sub(origin);
        let Some(first) = self.recorded.first().map(StreamEntry::timestamp_ns) else {
            return Ok(RecognizerOutput::default());
        };

        let mut failure = None;
        while let Some(entry) = self
            .recorded
            .get(self.cursor)
            .filter(|entry| entry.timestamp_ns() - first <= elapsed)
        {
            match entry {
                StreamEntry::Detection(detection) => {
                    self.held = RecognizerOutput {
                        gestures: detection.gestures.clone(),
                        landmarks: detection.landmarks.clone(),
                    };
                    failure = None;
                }
                StreamEntry::Failure(marker) => failure = Some(marker.failed.clone()),
            }
            self.cursor += 1;
        }

        match failure {
            Some(reason) => Err(HandwaveError::detector(reason)),
            None => Ok(self.held.clone()),
        }
    }

    fn name(&self) -> &str {
        "replay"
    }
}

/// Detector whose model never loads.
pub struct FailingDetector {
    reason: String,
}

impl FailingDetector {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl GestureDetector for FailingDetector {
    fn initialize(&mut self) -> HandwaveResult<()> {
        Err(HandwaveError::initialization(self.reason.clone()))
    }

    fn detect(
        &mut self,
        _frame: &VideoFrame,
        _timestamp_ns: TimestampNs,
    ) -> HandwaveResult<RecognizerOutput> {
        Err(HandwaveError::detector(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Frame source that synthesizes blank frames.
///
/// Reports `HaveNothing` for the first `ready_after` readiness polls, then
/// `HaveEnoughData`; every poll counts. Each new frame is returned `repeat_each` times before
/// the sequence advances, which models a camera slower than the pump.
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
    frame_time_ns: u64,
    ready_after: u32,
    polls: u32,
    repeat_each: u32,
    served: u64,
}

impl SyntheticFrameSource {
    /// 640x480 at 30 fps, ready immediately.
    pub fn new() -> Self {
        Self {
            width: 640,
            height: 480,
            frame_time_ns: 33_333_333,
            ready_after: 0,
            polls: 0,
            repeat_each: 1,
            served: 0,
        }
    }

    pub fn ready_after(mut self, polls: u32) -> Self {
        self.ready_after = polls;
        self
    }

    pub fn repeat_each(mut self, times: u32) -> Self {
        self.repeat_each = times.max(1);
        self
    }
}

impl Default for SyntheticFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for SyntheticFrameSource {
    fn ready_state(&mut self) -> ReadyState {
        if self.polls < self.ready_after {
            self.polls += 1;
            ReadyState::HaveNothing
        } else {
            ReadyState::HaveEnoughData
        }
    }

    fn current_frame(&mut self) -> Option<VideoFrame> {
        let sequence = self.served / self.repeat_each as u64;
        self.served += 1;
        Some(VideoFrame {
            sequence,
            media_time_ns: sequence * self.frame_time_ns,
            width: self.width,
            height: self.height,
        })
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> VideoFrame {
        VideoFrame {
            sequence: 0,
            media_time_ns: 0,
            width: 640,
            height: 480,
        }
    }

    #[test]
    fn test_scripted_detector_plays_steps_then_empties() {
        let mut detector = ScriptedDetector::new(vec![
            ScriptStep::gesture("Victory", 0.8),
            ScriptStep::fail("boom"),
        ]);
        let first = detector.detect(&frame(), 0).unwrap();
        assert_eq!(first.gestures[0][0].category, "Victory");
        assert!(detector.detect(&frame(), 1).is_err());
        assert_eq!(detector.detect(&frame(), 2).unwrap(), RecognizerOutput::default());
        assert_eq!(detector.calls().load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_replay_follows_elapsed_time() {
        let jsonl = "{\"t\":5000000000}\n\
                     {\"t\":6000000000,\"gestures\":[[{\"category\":\"OK\",\"score\":0.9}]],\"landmarks\":[[{\"x\":0.5,\"y\":0.5}]]}\n\
                     {\"t\":7000000000}\n";
        let mut detector = ReplayDetector::from_jsonl(jsonl).unwrap();
        assert_eq!(detector.span_ns(), 2_000_000_000);
        detector.initialize().unwrap();

        // Live clock starts somewhere unrelated.
        let base = 100_000_000_000;
        assert!(detector.detect(&frame(), base).unwrap().gestures.is_empty());
        assert!(detector.detect(&frame(), base + 999_000_000).unwrap().gestures.is_empty());
        let ok = detector.detect(&frame(), base + 1_000_000_000).unwrap();
        assert_eq!(ok.gestures[0][0].category, "OK");
        // Held between samples.
        let held = detector.detect(&frame(), base + 1_500_000_000).unwrap();
        assert_eq!(held, ok);
        assert!(!detector.is_finished());
        assert!(detector.detect(&frame(), base + 2_000_000_000).unwrap().gestures.is_empty());
        assert!(detector.is_finished());
    }

    #[test]
    fn test_replay_reproduces_failure_once() {
        let jsonl = "{\"t\":0,\"gestures\":[[{\"category\":\"Victory\",\"score\":0.9}]],\"landmarks\":[[{\"x\":0.5,\"y\":0.5}]]}\n\
                     {\"t\":50000000,\"failed\":\"frame decode error\"}\n\
                     {\"t\":100000000,\"gestures\":[[{\"category\":\"OK\",\"score\":0.9}]],\"landmarks\":[[{\"x\":0.5,\"y\":0.5}]]}\n";
        let mut detector = ReplayDetector::from_jsonl(jsonl).unwrap();
        assert_eq!(detector.len(), 3);
        assert_eq!(detector.failures(), 1);
        detector.initialize().unwrap();

        let victory = detector.detect(&frame(), 0).unwrap();
        assert_eq!(victory.gestures[0][0].category, "Victory");

        let err = detector.detect(&frame(), 50_000_000).unwrap_err();
        assert!(err.to_string().contains("frame decode error"));
        assert!(!err.is_fatal());

        // The failed frame is not repeated; the last good output holds.
        assert_eq!(detector.detect(&frame(), 75_000_000).unwrap(), victory);
        let ok = detector.detect(&frame(), 100_000_000).unwrap();
        assert_eq!(ok.gestures[0][0].category, "OK");
    }

    #[test]
    fn test_replay_without_detections_fails_to_initialize() {
        let mut detector = ReplayDetector::new(vec![]);
        assert!(detector.initialize().unwrap_err().is_fatal());

        let mut only_failures =
            ReplayDetector::from_jsonl("{\"t\":0,\"failed\":\"no camera\"}\n").unwrap();
        assert!(only_failures.initialize().is_err());
    }

    #[test]
    fn test_failing_detector() {
        let mut detector = FailingDetector::new("no model");
        assert!(detector.initialize().is_err());
        assert!(detector.detect(&frame(), 0).is_err());
    }

    #[test]
    fn test_synthetic_source_readiness_and_repeats() {
        let mut source = SyntheticFrameSource::new().ready_after(2).repeat_each(2);
        assert_eq!(source.ready_state(), ReadyState::HaveNothing);
        assert_eq!(source.ready_state(), ReadyState::HaveNothing);
        assert_eq!(source.ready_state(), ReadyState::HaveEnoughData);

        let sequences: Vec<_> = (0..5)
            .map(|_| source.current_frame().unwrap().sequence)
            .collect();
        assert_eq!(sequences, vec![0, 0, 1, 1, 2]);
    }
}
