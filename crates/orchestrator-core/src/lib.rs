//! Handwave Orchestrator Core
//!
//! Decides how the avatar answers what the camera sees:
//! - **Classifier:** map the active gesture of a detection to a response
//! - **Crossfade:** blend between the outgoing and incoming behavior over time
//! - **Revert:** hold a single auto-revert deadline
//! - **Orchestrator:** the state machine that ties the three together
//!
//! This crate is pure computation. Nothing here reads a clock or spawns a
//! task; every time-dependent call takes `now_ns` from the caller.

pub mod classifier;
pub mod crossfade;
pub mod orchestrator;
pub mod revert;

pub use classifier::{ActiveGesture, GestureClassifier};
pub use crossfade::{CrossfadeEngine, CrossfadeTick};
pub use orchestrator::{
    AvatarView, DetectionOutcome, OrchestratorPhase, ResponseOrchestrator, TickOutcome,
    TransitionCause, TransitionStarted,
};
pub use revert::RevertSlot;
