//! Response orchestrator: the avatar's state machine.
//!
//! Consumes one detection at a time, decides whether the avatar should move
//! to a new behavior, and owns both the crossfade and the auto-revert slot.
//!
//! # States
//!
//! ```text
//!             new target                 progress == 1
//!  Resting ─────────────▶ Transitioning ───────────────▶ ActiveSteady
//!     ▲                      │    ▲                          │
//!     │  progress == 1       │    └──── new target ──────────┤
//!     └──────────────────────┘                               │
//!                  ▲          revert deadline passes         │
//!                  └─────────── (transition to resting) ◀────┘
//! ```
//!
//! Every method takes `now_ns` from the caller's monotonic clock. Nothing in
//! here sleeps, spawns, or reads a clock, so a driver can replay any timing
//! it likes.

use std::time::Duration;

use handwave_common::clock::duration_to_ns;
use handwave_common::config::ResponseConfig;
use handwave_response_model::{
    BehaviorId, BehaviorWeight, Detection, Mood, ResponseDescriptor, TransitionState,
};
use serde::Serialize;

use crate::classifier::GestureClassifier;
use crate::crossfade::{CrossfadeEngine, CrossfadeTick};
use crate::revert::RevertSlot;

/// Coarse state of the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorPhase {
    /// Settled on the resting behavior.
    Resting,
    /// A crossfade is in flight.
    Transitioning,
    /// Settled on a non-resting behavior, possibly waiting for a revert.
    ActiveSteady,
}

/// What started a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    Detection,
    Revert,
}

/// A transition that has just begun.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionStarted {
    pub from: BehaviorId,
    pub to: BehaviorId,
    pub cause: TransitionCause,
    /// Revert deadline armed alongside this transition.
    pub revert_deadline_ns: Option<u64>,
}

/// Result of feeding one detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// The target is already shown or already fading in.
    Unchanged,
    Started(TransitionStarted),
}

/// Result of one animation tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub crossfade: CrossfadeTick,
    /// Set when the revert deadline fired on this tick.
    pub reverted: Option<TransitionStarted>,
}

/// Read-only view handed to the presentation surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvatarView {
    pub phase: OrchestratorPhase,
    pub transition: TransitionState,
    pub weights: Vec<BehaviorWeight>,
    pub mood: Mood,
    pub message: String,
    pub revert_deadline_ns: Option<u64>,
}

/// Owner of the avatar's transition state and revert deadline.
#[derive(Debug, Clone)]
pub struct ResponseOrchestrator {
    classifier: GestureClassifier,
    crossfade: CrossfadeEngine,
    revert: RevertSlot,
    crossfade_duration: Duration,
    resting: BehaviorId,
    /// Response whose behavior is currently shown or fading in.
    active: ResponseDescriptor,
    transitions_started: u64,
    reverts_fired: u64,
}

impl ResponseOrchestrator {
    pub fn new(classifier: GestureClassifier, response: &ResponseConfig) -> Self {
        let resting = classifier.resting_behavior();
        let active = classifier.resting();
        Self {
            crossfade: CrossfadeEngine::new(resting.clone(), response.easing),
            revert: RevertSlot::new(),
            crossfade_duration: response.crossfade_duration(),
            resting,
            active,
            transitions_started: 0,
            reverts_fired: 0,
            classifier,
        }
    }

    /// Orchestrator over the default behavior table and timings.
    pub fn with_defaults() -> Self {
        Self::new(GestureClassifier::with_defaults(), &ResponseConfig::default())
    }

    /// React to one detection.
    ///
    /// Identical targets are no-ops, including while a transition to that
    /// target is still in flight. A different target interrupts any running
    /// crossfade: the behavior that was fading in becomes the one fading out.
    pub fn on_detection(&mut self, detection: &Detection, now_ns: u64) -> DetectionOutcome {
        let (active, response) = self.classifier.classify_detection(detection);
        let target = response.target_behavior.clone();

        if target == self.crossfade.state().current {
            return DetectionOutcome::Unchanged;
        }

        let revert_deadline_ns = (target != self.resting && active.person_present)
            .then(|| now_ns.saturating_add(duration_to_ns(response.auto_revert_after)));

        tracing::debug!(
            gesture = %active.label,
            person_present = active.person_present,
            timestamp_ns = detection.timestamp_ns,
            "Gesture classified to new behavior"
        );

        DetectionOutcome::Started(self.start_transition(
            response,
            TransitionCause::Detection,
            revert_deadline_ns,
            now_ns,
        ))
    }

    /// Advance the crossfade and fire the revert if its deadline has passed.
    pub fn tick(&mut self, now_ns: u64) -> TickOutcome {
        let crossfade = self.crossfade.advance(now_ns);

        let reverted = match self.revert.take_due(now_ns) {
            Some(deadline_ns) if self.crossfade.state().current != self.resting => {
                let reverted_from = self.crossfade.state().current.clone();
                tracing::info!(
                    behavior = %reverted_from,
                    deadline_ns,
                    late_by_ns = now_ns.saturating_sub(deadline_ns),
                    "Auto-revert deadline reached"
                );
                self.reverts_fired += 1;
                let response = self.classifier.resting();
                Some(self.start_transition(response, TransitionCause::Revert, None, now_ns))
            }
            _ => None,
        };

        TickOutcome {
            crossfade,
            reverted,
        }
    }

    fn start_transition(
        &mut self,
        response: ResponseDescriptor,
        cause: TransitionCause,
        revert_deadline_ns: Option<u64>,
        now_ns: u64,
    ) -> TransitionStarted {
        let from = self.crossfade.state().current.clone();
        let to = response.target_behavior.clone();

        self.crossfade
            .begin_transition(from.clone(), to.clone(), self.crossfade_duration, now_ns);

        match revert_deadline_ns {
            Some(deadline) => {
                if let Some(replaced) = self.revert.arm(deadline) {
                    tracing::debug!(
                        replaced_ns = replaced,
                        deadline_ns = deadline,
                        "Revert re-armed"
                    );
                }
            }
            None => {
                if let Some(cancelled) = self.revert.cancel() {
                    tracing::debug!(cancelled_ns = cancelled, "Revert cancelled");
                }
            }
        }

        self.active = response;
        self.transitions_started += 1;

        tracing::info!(
            from = %from,
            to = %to,
            ?cause,
            revert_deadline_ns,
            "Behavior transition started"
        );

        TransitionStarted {
            from,
            to,
            cause,
            revert_deadline_ns,
        }
    }

    pub fn phase(&self) -> OrchestratorPhase {
        let state = self.crossfade.state();
        if state.is_transitioning {
            OrchestratorPhase::Transitioning
        } else if state.current == self.resting {
            OrchestratorPhase::Resting
        } else {
            OrchestratorPhase::ActiveSteady
        }
    }

    pub fn state(&self) -> &TransitionState {
        self.crossfade.state()
    }

    pub fn is_transitioning(&self) -> bool {
        self.crossfade.is_transitioning()
    }

    pub fn revert_deadline_ns(&self) -> Option<u64> {
        self.revert.deadline_ns()
    }

    /// When the transition in flight reaches full progress.
    pub fn transition_completes_at_ns(&self) -> Option<u64> {
        self.crossfade.completes_at_ns()
    }

    pub fn resting_behavior(&self) -> &BehaviorId {
        &self.resting
    }

    pub fn active_response(&self) -> &ResponseDescriptor {
        &self.active
    }

    pub fn transitions_started(&self) -> u64 {
        self.transitions_started
    }

    pub fn reverts_fired(&self) -> u64 {
        self.reverts_fired
    }

    /// Snapshot for the presentation surface.
    pub fn view(&self) -> AvatarView {
        AvatarView {
            phase: self.phase(),
            transition: self.crossfade.state().clone(),
            weights: self.crossfade.weights(),
            mood: self.active.mood,
            message: self.active.message.clone(),
            revert_deadline_ns: self.revert.deadline_ns(),
        }
    }
}
