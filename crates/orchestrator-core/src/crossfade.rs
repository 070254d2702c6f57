//! Crossfade engine.
//!
//! Interpolates the blend between the outgoing and incoming behavior as a
//! pure function of elapsed monotonic time. Callers pass `now_ns` on every
//! animation tick; a throttled or paused ticker simply sees a larger jump in
//! progress on its next call.
//!
//! # Opacity ramps
//!
//! Each asset eases independently and reaches full opacity halfway through
//! the fade:
//!
//! ```text
//! incoming = ease(min(1, 2p))
//! outgoing = ease(min(1, 2(1 - p)))
//! ```
//!
//! The incoming behavior is fully visible before the outgoing one starts to
//! fade, so the pair never dims together in the middle.

use std::time::Duration;

use handwave_common::clock::duration_to_ns;
use handwave_common::config::EasingFunction;
use handwave_response_model::{BehaviorId, BehaviorWeight, TransitionState};

/// Result of one animation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrossfadeTick {
    /// No transition in flight; the ticker can be released.
    Idle,
    /// Transition still running at this progress.
    Running(f64),
    /// Transition reached progress 1 on this tick.
    Completed,
}

/// Owner of the [`TransitionState`].
#[derive(Debug, Clone)]
pub struct CrossfadeEngine {
    state: TransitionState,
    started_at_ns: u64,
    duration_ns: u64,
    easing: EasingFunction,
}

impl CrossfadeEngine {
    /// Engine settled on `resting`.
    pub fn new(resting: BehaviorId, easing: EasingFunction) -> Self {
        Self {
            state: TransitionState::resting(resting),
            started_at_ns: 0,
            duration_ns: 0,
            easing,
        }
    }

    pub fn state(&self) -> &TransitionState {
        &self.state
    }

    pub fn is_transitioning(&self) -> bool {
        self.state.is_transitioning
    }

    /// Start blending from `from` to `to`, replacing any transition in flight.
    pub fn begin_transition(
        &mut self,
        from: BehaviorId,
        to: BehaviorId,
        duration: Duration,
        now_ns: u64,
    ) {
        self.state = TransitionState {
            previous: from,
            current: to,
            is_transitioning: true,
            progress: 0.0,
        };
        self.started_at_ns = now_ns;
        self.duration_ns = duration_to_ns(duration);
    }

    /// Recompute progress from elapsed time.
    pub fn advance(&mut self, now_ns: u64) -> CrossfadeTick {
        if !self.state.is_transitioning {
            return CrossfadeTick::Idle;
        }

        let progress = self.progress_at(now_ns);
        // Never let a late or out-of-order tick move the blend backwards.
        self.state.progress = progress.max(self.state.progress);

        if self.state.progress >= 1.0 {
            self.state.progress = 1.0;
            self.state.is_transitioning = false;
            tracing::debug!(behavior = %self.state.current, "Crossfade completed");
            CrossfadeTick::Completed
        } else {
            CrossfadeTick::Running(self.state.progress)
        }
    }

    /// Progress the running transition would have at `now_ns`.
    pub fn progress_at(&self, now_ns: u64) -> f64 {
        if !self.state.is_transitioning {
            return 1.0;
        }
        if self.duration_ns == 0 {
            return 1.0;
        }
        let elapsed = now_ns.saturating_sub(self.started_at_ns);
        (elapsed as f64 / self.duration_ns as f64).clamp(0.0, 1.0)
    }

    /// Monotonic time at which the running transition reaches progress 1.
    pub fn completes_at_ns(&self) -> Option<u64> {
        self.state
            .is_transitioning
            .then(|| self.started_at_ns.saturating_add(self.duration_ns))
    }

    /// Opacity of `behavior` at the current progress.
    pub fn weight(&self, behavior: &BehaviorId) -> f64 {
        let state = &self.state;
        if !state.is_transitioning {
            return if *behavior == state.current { 1.0 } else { 0.0 };
        }

        let p = state.progress;
        if *behavior == state.current {
            self.easing.apply((2.0 * p).min(1.0))
        } else if *behavior == state.previous {
            self.easing.apply((2.0 * (1.0 - p)).min(1.0))
        } else {
            0.0
        }
    }

    /// Weights of every visible asset, incoming first.
    pub fn weights(&self) -> Vec<BehaviorWeight> {
        let mut weights = vec![BehaviorWeight {
            behavior: self.state.current.clone(),
            weight: self.weight(&self.state.current),
        }];
        if self.state.is_transitioning && self.state.previous != self.state.current {
            weights.push(BehaviorWeight {
                behavior: self.state.previous.clone(),
                weight: self.weight(&self.state.previous),
            });
        }
        weights
    }
}
