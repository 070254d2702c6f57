//! Handwave Response Model
//!
//! Defines the core data contracts shared by every Handwave crate:
//! - **Detections:** Timestamped per-frame gesture and landmark results
//! - **Gestures:** The closed gesture vocabulary
//! - **Behaviors:** Avatar behavior ids, moods, and response descriptors
//! - **Transitions:** Crossfade state read by the presentation surface
//!
//! Landmark coordinates are normalized to `[0.0, 1.0]` relative to the
//! video frame.

pub mod behavior;
pub mod detection;
pub mod gesture;
pub mod transition;

pub use behavior::*;
pub use detection::*;
pub use gesture::*;
pub use transition::*;
