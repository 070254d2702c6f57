//! Avatar behaviors and the responses that select them.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gesture::GestureLabel;

/// Identifier of an avatar presentation (a clip, pose, or animation set).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorId(String);

impl BehaviorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for BehaviorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BehaviorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Emotional tone the avatar displays alongside a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    /// Nobody in frame.
    Searching,
    /// Someone is there, no gesture yet.
    Attentive,
    Delighted,
    Disappointed,
    Determined,
    Friendly,
    Curious,
    Cheerful,
    Approving,
    Affectionate,
}

impl Mood {
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Searching => "searching",
            Mood::Attentive => "attentive",
            Mood::Delighted => "delighted",
            Mood::Disappointed => "disappointed",
            Mood::Determined => "determined",
            Mood::Friendly => "friendly",
            Mood::Curious => "curious",
            Mood::Cheerful => "cheerful",
            Mood::Approving => "approving",
            Mood::Affectionate => "affectionate",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// What the avatar should do in response to one classified detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    /// The gesture this response answers (`None` for the no-gesture cases).
    pub label: GestureLabel,

    /// Behavior to crossfade to.
    pub target_behavior: BehaviorId,

    pub mood: Mood,

    /// Caption shown next to the avatar.
    pub message: String,

    /// Dwell time before the avatar returns to rest.
    #[serde(with = "duration_ms")]
    pub auto_revert_after: Duration,
}

/// Opacity of one behavior asset at an instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorWeight {
    pub behavior: BehaviorId,
    /// Opacity in `[0.0, 1.0]`.
    pub weight: f64,
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
