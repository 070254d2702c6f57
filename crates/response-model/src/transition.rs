//! Crossfade state shared with the presentation surface.

use serde::{Deserialize, Serialize};

use crate::behavior::BehaviorId;

/// Blend state between the outgoing and incoming behavior.
///
/// Replaced wholesale whenever a transition starts. While
/// `is_transitioning` is true, `progress` rises monotonically from 0 to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionState {
    /// Behavior fading out.
    pub previous: BehaviorId,
    /// Behavior fading in, or fully shown once the transition is over.
    pub current: BehaviorId,
    pub is_transitioning: bool,
    /// Fraction of the crossfade elapsed, in `[0.0, 1.0]`.
    pub progress: f64,
}

impl TransitionState {
    /// At rest on `behavior`, with no blend in flight.
    pub fn resting(behavior: BehaviorId) -> Self {
        Self {
            previous: behavior.clone(),
            current: behavior,
            is_transitioning: false,
            progress: 1.0,
        }
    }
}
