//! Handwave Avatar Session
//!
//! Runs a live avatar: the detection feed pumps frames through the gesture
//! detector, and a single orchestrator task reacts to detections, drives
//! the crossfade and fires the auto-revert. Every change is published as a
//! [`PresentationFrame`] on a `watch` channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  AvatarSession                   │
//! │  ┌──────────────┐  watch  ┌────────────────────┐ │
//! │  │ DetectionFeed│ ──────▶ │ orchestrator task  │ │
//! │  │  (pump task) │         │  select! over:     │ │
//! │  └──────────────┘         │  detections, tick, │ │
//! │                           │  revert, shutdown  │ │
//! │                           └─────────┬──────────┘ │
//! │                                     │ watch      │
//! │                                     ▼            │
//! │                           PresentationFrame      │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod presentation;
pub mod session;

pub use presentation::*;
pub use session::*;
