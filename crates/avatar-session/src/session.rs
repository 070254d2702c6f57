//! Live avatar session management.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use handwave_common::clock::{duration_to_ns, MonotonicClock, SessionClock};
use handwave_common::config::{AppConfig, BehaviorTable, FeedConfig, ResponseConfig};
use handwave_common::error::{HandwaveError, HandwaveResult};
use handwave_detection_feed::{DetectionFeed, FeedStats, FrameSource, GestureDetector};
use handwave_orchestrator_core::{
    CrossfadeTick, DetectionOutcome, GestureClassifier, ResponseOrchestrator, TransitionCause,
};
use handwave_response_model::Detection;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::presentation::{PresentationFrame, SessionStatus};

/// Configuration for starting a new avatar session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub response: ResponseConfig,
    pub feed: FeedConfig,
    pub behaviors: BehaviorTable,

    /// Record every delivered detection to this JSONL file.
    pub record_path: Option<PathBuf>,
}

impl SessionConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            response: config.response.clone(),
            feed: config.feed.clone(),
            behaviors: config.behaviors.clone(),
            record_path: None,
        }
    }
}

/// State of an avatar session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session created but not started.
    Idle,
    /// Feed and orchestrator tasks are running.
    Running,
    /// Session stopped, tasks joined.
    Stopped,
    /// The detector failed to initialize.
    Error,
}

/// Monotonic clock on tokio's time source, so paused-time tests stay
/// deterministic.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// The instant `ns` after the clock's origin.
    pub fn instant_at(&self, ns: u64) -> Instant {
        self.origin + Duration::from_nanos(ns)
    }
}

impl MonotonicClock for TokioClock {
    fn now_ns(&self) -> u64 {
        duration_to_ns(self.origin.elapsed())
    }
}

/// Totals reported by [`AvatarSession::stop`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub elapsed_secs: f64,
    pub feed: FeedStats,
    pub detections_handled: u64,
    pub transitions_started: u64,
    pub reverts_fired: u64,
}

#[derive(Debug, Default)]
struct DriveReport {
    detections_handled: u64,
    transitions_started: u64,
    reverts_fired: u64,
}

/// A live session that coordinates the feed and the orchestrator.
pub struct AvatarSession {
    config: SessionConfig,
    state: SessionState,
    clock: Arc<TokioClock>,
    orchestrator: Option<ResponseOrchestrator>,
    frames: Arc<watch::Sender<PresentationFrame>>,
    shutdown: Option<watch::Sender<bool>>,
    feed_stop_flag: Option<Arc<AtomicBool>>,
    feed_task: Option<JoinHandle<HandwaveResult<FeedStats>>>,
    drive_task: Option<JoinHandle<DriveReport>>,
}

impl AvatarSession {
    /// Create a new session. Subscribers see a `Starting` frame until
    /// [`start`](Self::start) completes.
    pub fn new(config: SessionConfig) -> Self {
        let classifier = GestureClassifier::new(config.behaviors.clone(), &config.response);
        let orchestrator = ResponseOrchestrator::new(classifier, &config.response);
        let (frames, _) = watch::channel(PresentationFrame {
            status: SessionStatus::Starting,
            view: orchestrator.view(),
            at_ns: 0,
        });

        Self {
            config,
            state: SessionState::Idle,
            clock: Arc::new(TokioClock::start()),
            orchestrator: Some(orchestrator),
            frames: Arc::new(frames),
            shutdown: None,
            feed_stop_flag: None,
            feed_task: None,
            drive_task: None,
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Receive every published frame.
    pub fn subscribe(&self) -> watch::Receiver<PresentationFrame> {
        self.frames.subscribe()
    }

    /// The most recently published frame.
    pub fn current_frame(&self) -> PresentationFrame {
        self.frames.borrow().clone()
    }

    /// Initialize the detector and start the feed and orchestrator tasks.
    ///
    /// If the detector fails to load, the session enters
    /// [`SessionState::Error`], publishes a persistent `Failed` frame and
    /// never starts pumping.
    pub async fn start(
        &mut self,
        detector: Box<dyn GestureDetector>,
        source: Box<dyn FrameSource>,
    ) -> HandwaveResult<()> {
        if self.state != SessionState::Idle {
            return Err(HandwaveError::session("Session already started"));
        }

        tracing::info!(
            detector = %detector.name(),
            source = %source.name(),
            crossfade_ms = self.config.response.crossfade_ms,
            auto_revert_ms = self.config.response.auto_revert_ms,
            "Starting avatar session"
        );

        let clock: Arc<dyn MonotonicClock> = self.clock.clone();
        let mut feed = DetectionFeed::new(detector, source, clock, self.config.feed.clone());

        if let Err(e) = feed.initialize() {
            tracing::error!(error = %e, "Detector initialization failed, session will not start");
            self.state = SessionState::Error;
            let reason = e.to_string();
            let now = self.clock.now_ns();
            self.frames.send_modify(|frame| {
                frame.status = SessionStatus::Failed { reason };
                frame.at_ns = now;
            });
            return Err(e);
        }

        if let Some(path) = self.config.record_path.clone() {
            let wall = SessionClock::start();
            feed.record_to(path.clone(), wall.epoch_wall())?;
            tracing::info!(path = %path.display(), "Recording detections");
        }

        // Latest detection only: a newer one overwrites anything the
        // orchestrator has not picked up yet.
        let (detections_tx, detections_rx) = watch::channel(None);
        feed.on_detection(move |detection| {
            detections_tx.send_replace(Some(detection));
        })?;

        let orchestrator = self
            .orchestrator
            .take()
            .ok_or_else(|| HandwaveError::session("Session has no orchestrator"))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.feed_stop_flag = Some(feed.stop_flag());
        self.feed_task = Some(tokio::spawn(async move { feed.run().await }));
        self.drive_task = Some(tokio::spawn(drive(
            orchestrator,
            detections_rx,
            shutdown_rx,
            self.frames.clone(),
            self.clock.clone(),
            self.config.feed.frame_interval(),
        )));
        self.shutdown = Some(shutdown_tx);
        self.state = SessionState::Running;

        Ok(())
    }

    /// Stop both tasks and publish a `Stopped` frame.
    pub async fn stop(&mut self) -> HandwaveResult<SessionSummary> {
        if self.state != SessionState::Running {
            return Err(HandwaveError::session("Session not running"));
        }

        tracing::info!("Stopping avatar session");
        self.signal_shutdown();

        let mut summary = SessionSummary::default();

        if let Some(handle) = self.feed_task.take() {
            match handle.await {
                Ok(Ok(stats)) => summary.feed = stats,
                Ok(Err(e)) => tracing::warn!(error = %e, "Detection feed exited with error"),
                Err(e) => tracing::warn!(error = %e, "Detection feed join failed"),
            }
        }

        if let Some(handle) = self.drive_task.take() {
            match handle.await {
                Ok(report) => {
                    summary.detections_handled = report.detections_handled;
                    summary.transitions_started = report.transitions_started;
                    summary.reverts_fired = report.reverts_fired;
                }
                Err(e) => tracing::warn!(error = %e, "Orchestrator task join failed"),
            }
        }

        let now = self.clock.now_ns();
        summary.elapsed_secs = now as f64 / 1_000_000_000.0;
        self.frames.send_modify(|frame| {
            frame.status = SessionStatus::Stopped;
            frame.at_ns = now;
        });
        self.state = SessionState::Stopped;

        tracing::info!(
            duration_secs = summary.elapsed_secs,
            detections = summary.detections_handled,
            transitions = summary.transitions_started,
            reverts = summary.reverts_fired,
            "Avatar session stopped"
        );
        Ok(summary)
    }

    fn signal_shutdown(&mut self) {
        if let Some(flag) = self.feed_stop_flag.as_ref() {
            flag.store(true, Ordering::SeqCst);
        }
        if let Some(shutdown) = self.shutdown.as_ref() {
            let _ = shutdown.send(true);
        }
    }
}

impl Drop for AvatarSession {
    fn drop(&mut self) {
        if self.state != SessionState::Running {
            return;
        }
        self.signal_shutdown();
        if let Some(handle) = self.feed_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.drive_task.take() {
            handle.abort();
        }
    }
}

/// The orchestrator task. Sole owner of the orchestrator; every mutation
/// happens between two awaits of this loop.
async fn drive(
    mut orchestrator: ResponseOrchestrator,
    mut detections: watch::Receiver<Option<Detection>>,
    mut shutdown: watch::Receiver<bool>,
    frames: Arc<watch::Sender<PresentationFrame>>,
    clock: Arc<TokioClock>,
    tick_interval: Duration,
) -> DriveReport {
    let mut report = DriveReport::default();
    let mut feed_open = true;
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    publish(&frames, &orchestrator, SessionStatus::Ready, clock.now_ns());

    loop {
        // `sleep_until` is built even when its branch is disabled.
        let revert_armed = orchestrator.revert_deadline_ns().is_some();
        let revert_at = match orchestrator.revert_deadline_ns() {
            Some(ns) => clock.instant_at(ns),
            None => Instant::now() + Duration::from_secs(86_400),
        };

        let changed = tokio::select! {
            biased;

            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    break;
                }
                false
            }

            received = detections.changed(), if feed_open => {
                let latest = match received {
                    Ok(()) => detections.borrow_and_update().clone(),
                    Err(_) => {
                        tracing::debug!("Detection feed closed");
                        feed_open = false;
                        None
                    }
                };
                match latest {
                    Some(detection) => {
                        let now = clock.now_ns();
                        report.detections_handled += 1;
                        let ticked = orchestrator.tick(now);
                        let mut changed = ticked.crossfade != CrossfadeTick::Idle;
                        if let Some(started) = ticked.reverted {
                            record_started(&mut report, started.cause);
                            changed = true;
                        }
                        if let DetectionOutcome::Started(started) =
                            orchestrator.on_detection(&detection, now)
                        {
                            record_started(&mut report, started.cause);
                            ticker.reset();
                            changed = true;
                        }
                        changed
                    }
                    None => false,
                }
            }

            _ = ticker.tick(), if orchestrator.is_transitioning() => {
                let ticked = orchestrator.tick(clock.now_ns());
                if let Some(started) = ticked.reverted {
                    record_started(&mut report, started.cause);
                }
                true
            }

            _ = tokio::time::sleep_until(revert_at), if revert_armed => {
                let ticked = orchestrator.tick(clock.now_ns());
                if let Some(started) = ticked.reverted {
                    record_started(&mut report, started.cause);
                    ticker.reset();
                }
                true
            }
        };

        if changed {
            publish(&frames, &orchestrator, SessionStatus::Ready, clock.now_ns());
        }
    }

    tracing::debug!(
        detections = report.detections_handled,
        transitions = report.transitions_started,
        "Orchestrator task finished"
    );
    report
}

fn record_started(report: &mut DriveReport, cause: TransitionCause) {
    report.transitions_started += 1;
    if cause == TransitionCause::Revert {
        report.reverts_fired += 1;
    }
}

fn publish(
    frames: &watch::Sender<PresentationFrame>,
    orchestrator: &ResponseOrchestrator,
    status: SessionStatus,
    at_ns: u64,
) {
    frames.send_replace(PresentationFrame {
        status,
        view: orchestrator.view(),
        at_ns,
    });
}
