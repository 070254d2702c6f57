//! Handwave Detection Feed
//!
//! Pumps frames from a video source through a gesture detector and pushes
//! one [`Detection`] per processed frame to a single registered consumer.
//! Both ends are pluggable:
//!
//! - **FrameSource:** anything that reports a media ready state and hands
//!   out the latest decoded frame
//! - **GestureDetector:** the black-box recognizer that turns a frame into
//!   gesture candidates and hand landmarks
//!
//! A feed can record what it saw, detector failures included, to a JSONL
//! stream that [`backends::ReplayDetector`] plays back.

pub mod backends;
pub mod recorder;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use handwave_common::clock::MonotonicClock;
use handwave_common::config::FeedConfig;
use handwave_common::error::{HandwaveError, HandwaveResult};
use handwave_response_model::{Detection, DetectionStreamHeader, RecognizerOutput, TimestampNs};
use serde::{Deserialize, Serialize};

use crate::recorder::FeedRecorder;

/// How much media a source has buffered, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

impl ReadyState {
    /// The current frame can be decoded and handed to a detector.
    pub fn can_detect(self) -> bool {
        self >= ReadyState::HaveCurrentData
    }
}

/// A decoded video frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Increases by one for every new frame the source decodes.
    pub sequence: u64,
    /// Presentation time of the frame within the media.
    pub media_time_ns: u64,
    pub width: u32,
    pub height: u32,
}

/// A source of video frames, typically a camera stream.
pub trait FrameSource: Send {
    /// Poll how much media is buffered. Called once per pump iteration,
    /// before any frame is read; a source may advance its own state here.
    fn ready_state(&mut self) -> ReadyState;

    /// Latest decoded frame. May return the same frame on consecutive calls.
    fn current_frame(&mut self) -> Option<VideoFrame>;

    /// Source name for logging.
    fn name(&self) -> &str;
}

/// A gesture and landmark recognizer.
pub trait GestureDetector: Send {
    /// Load models or other resources. Failure here is fatal to the session.
    fn initialize(&mut self) -> HandwaveResult<()> {
        Ok(())
    }

    /// Recognize gestures in one frame.
    fn detect(&mut self, frame: &VideoFrame, timestamp_ns: TimestampNs)
        -> HandwaveResult<RecognizerOutput>;

    /// Detector name for logging and stream headers.
    fn name(&self) -> &str;
}

/// The single downstream consumer of detections.
pub type DetectionCallback = Box<dyn FnMut(Detection) + Send>;

/// Result of one pump iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// The source cannot be decoded yet; the detector was not called.
    SourceNotReady,
    /// The source has no frame newer than the last one processed.
    NoNewFrame,
    /// A detection was produced at this timestamp.
    Delivered(TimestampNs),
    /// The detector failed on this frame; it was skipped.
    Failed,
    /// The clock did not move past the last delivered detection.
    OutOfOrder,
}

/// Counters reported when the pump stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedStats {
    pub frames_processed: u64,
    pub detections_delivered: u64,
    pub detector_failures: u64,
    pub not_ready_polls: u64,
    pub out_of_order_dropped: u64,
}

/// Couples a detector with a frame source and a consumer.
pub struct DetectionFeed {
    detector: Box<dyn GestureDetector>,
    source: Box<dyn FrameSource>,
    clock: Arc<dyn MonotonicClock>,
    config: FeedConfig,
    consumer: Option<DetectionCallback>,
    recorder: Option<FeedRecorder>,
    stop_flag: Arc<AtomicBool>,
    last_sequence: Option<u64>,
    last_timestamp_ns: Option<TimestampNs>,
    stats: FeedStats,
}

impl DetectionFeed {
    pub fn new(
        detector: Box<dyn GestureDetector>,
        source: Box<dyn FrameSource>,
        clock: Arc<dyn MonotonicClock>,
        config: FeedConfig,
    ) -> Self {
        Self {
            detector,
            source,
            clock,
            config,
            consumer: None,
            recorder: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            last_sequence: None,
            last_timestamp_ns: None,
            stats: FeedStats::default(),
        }
    }

    /// Register the consumer. Only one may ever be registered.
    pub fn on_detection<F>(&mut self, callback: F) -> HandwaveResult<()>
    where
        F: FnMut(Detection) + Send + 'static,
    {
        if self.consumer.is_some() {
            return Err(HandwaveError::feed("A detection consumer is already registered"));
        }
        self.consumer = Some(Box::new(callback));
        Ok(())
    }

    /// Record delivered detections and detector failures to `path`.
    pub fn record_to(&mut self, path: PathBuf, epoch_wall: &str) -> HandwaveResult<()> {
        let header = DetectionStreamHeader {
            schema_version: "1.0".to_string(),
            epoch_wall: epoch_wall.to_string(),
            detector: self.detector.name().to_string(),
        };
        self.recorder = Some(FeedRecorder::create(path, &header)?);
        Ok(())
    }

    /// Initialize the detector.
    pub fn initialize(&mut self) -> HandwaveResult<()> {
        tracing::info!(
            detector = %self.detector.name(),
            source = %self.source.name(),
            "Initializing gesture detector"
        );
        self.detector.initialize().map_err(|e| match e {
            HandwaveError::Initialization { .. } => e,
            other => HandwaveError::initialization(format!(
                "{} failed to initialize: {other}",
                self.detector.name()
            )),
        })
    }

    /// Run one iteration: gate on readiness, detect, deliver.
    pub fn pump_once(&mut self) -> PumpOutcome {
        if !self.source.ready_state().can_detect() {
            self.stats.not_ready_polls += 1;
            return PumpOutcome::SourceNotReady;
        }

        let frame = match self.source.current_frame() {
            Some(frame) if self.last_sequence.map_or(true, |last| frame.sequence > last) => frame,
            _ => return PumpOutcome::NoNewFrame,
        };
        self.last_sequence = Some(frame.sequence);
        self.stats.frames_processed += 1;

        let timestamp_ns = self.clock.now_ns();
        if self.last_timestamp_ns.is_some_and(|last| timestamp_ns <= last) {
            tracing::warn!(
                timestamp_ns,
                last_timestamp_ns = self.last_timestamp_ns,
                sequence = frame.sequence,
                "Dropping detection with non-increasing timestamp"
            );
            self.stats.out_of_order_dropped += 1;
            return PumpOutcome::OutOfOrder;
        }

        let output = match self.detector.detect(&frame, timestamp_ns) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    detector = %self.detector.name(),
                    sequence = frame.sequence,
                    "Gesture detection failed, skipping frame"
                );
                self.stats.detector_failures += 1;
                let reason = match &e {
                    HandwaveError::Detector { message } => message.clone(),
                    other => other.to_string(),
                };
                self.record(|recorder| recorder.record_failure(timestamp_ns, &reason));
                return PumpOutcome::Failed;
            }
        };

        let detection = Detection::from_output(timestamp_ns, output);
        self.last_timestamp_ns = Some(timestamp_ns);

        self.record(|recorder| recorder.record_detection(&detection));

        match self.consumer.as_mut() {
            Some(consumer) => consumer(detection),
            None => tracing::trace!(timestamp_ns, "No detection consumer registered"),
        }
        self.stats.detections_delivered += 1;

        PumpOutcome::Delivered(timestamp_ns)
    }

    fn record(&mut self, write: impl FnOnce(&mut FeedRecorder) -> HandwaveResult<()>) {
        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = write(recorder) {
                tracing::warn!(error = %e, "Feed recording failed, disabling recorder");
                self.recorder = None;
            }
        }
    }

    /// Run the pump loop until the stop flag is set.
    pub async fn run(&mut self) -> HandwaveResult<FeedStats> {
        if self.consumer.is_none() {
            return Err(HandwaveError::feed("No detection consumer registered"));
        }

        tracing::info!(
            detector = %self.detector.name(),
            source = %self.source.name(),
            frame_rate_hz = self.config.frame_rate_hz,
            "Detection feed started"
        );

        let frame_interval = self.config.frame_interval();
        let poll_interval = self.config.readiness_poll_interval();
        let mut was_ready = false;

        while !self.stop_flag.load(Ordering::Relaxed) {
            let outcome = self.pump_once();
            let ready = outcome != PumpOutcome::SourceNotReady;
            if ready != was_ready {
                tracing::debug!(ready, source = %self.source.name(), "Source readiness changed");
                was_ready = ready;
            }

            let pause = if ready { frame_interval } else { poll_interval };
            tokio::time::sleep(pause).await;
        }

        if let Some(recorder) = self.recorder.take() {
            recorder.finish(&self.stats)?;
        }

        tracing::info!(
            frames = self.stats.frames_processed,
            delivered = self.stats.detections_delivered,
            failures = self.stats.detector_failures,
            "Detection feed stopped"
        );
        Ok(self.stats)
    }

    /// Set the stop flag.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Get the stop flag for external coordination.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn stats(&self) -> FeedStats {
        self.stats
    }
}
