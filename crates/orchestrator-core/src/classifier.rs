//! Gesture classifier map.
//!
//! Turns the active gesture of a detection into a [`ResponseDescriptor`].
//! The map is total: `classify` matches exhaustively over [`GestureLabel`],
//! so adding a label without a response is a compile error rather than a
//! silent fallback.

use std::time::Duration;

use handwave_common::config::{BehaviorTable, ResponseConfig};
use handwave_response_model::{
    BehaviorId, Detection, GestureLabel, Mood, ResponseDescriptor, UnknownGesture,
};

/// The active label and presence read from one detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveGesture {
    pub label: GestureLabel,
    pub person_present: bool,
}

/// Pure lookup from `(label, person present)` to an avatar response.
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    behaviors: BehaviorTable,
    auto_revert_after: Duration,
    min_confidence: f32,
}

impl GestureClassifier {
    pub fn new(behaviors: BehaviorTable, response: &ResponseConfig) -> Self {
        Self {
            behaviors,
            auto_revert_after: response.auto_revert_after(),
            min_confidence: response.min_gesture_confidence,
        }
    }

    /// Classifier over the default behavior table and timings.
    pub fn with_defaults() -> Self {
        Self::new(BehaviorTable::default(), &ResponseConfig::default())
    }

    /// The behavior the avatar rests on and reverts to.
    pub fn resting_behavior(&self) -> BehaviorId {
        BehaviorId::new(self.behaviors.idle.as_str())
    }

    /// The "looking for a person" response.
    pub fn resting(&self) -> ResponseDescriptor {
        self.descriptor(
            GestureLabel::None,
            &self.behaviors.idle,
            Mood::Searching,
            "Looking for someone to play with...",
        )
    }

    /// Map a label and presence to a response.
    ///
    /// Without a person every label yields [`Self::resting`]; a stale
    /// gesture reading never outlives the person who made it.
    pub fn classify(&self, label: GestureLabel, person_present: bool) -> ResponseDescriptor {
        if !person_present {
            return self.resting();
        }

        let table = &self.behaviors;
        match label {
            GestureLabel::None => self.descriptor(
                label,
                &table.waiting,
                Mood::Attentive,
                "I see you! Show me a gesture.",
            ),
            GestureLabel::ThumbUp => {
                self.descriptor(label, &table.thumb_up, Mood::Delighted, "Thumbs up to you too!")
            }
            GestureLabel::ThumbDown => self.descriptor(
                label,
                &table.thumb_down,
                Mood::Disappointed,
                "Aw, not a fan? I'll try harder.",
            ),
            GestureLabel::ClosedFist => {
                self.descriptor(label, &table.closed_fist, Mood::Determined, "Fist bump!")
            }
            GestureLabel::OpenPalm => {
                self.descriptor(label, &table.open_palm, Mood::Friendly, "Hello there! *waves*")
            }
            GestureLabel::PointingUp => self.descriptor(
                label,
                &table.pointing_up,
                Mood::Curious,
                "What's up there? Let me look!",
            ),
            GestureLabel::Victory => {
                self.descriptor(label, &table.victory, Mood::Cheerful, "Peace and good vibes!")
            }
            GestureLabel::Ok => {
                self.descriptor(label, &table.ok, Mood::Approving, "Okay! Everything's great.")
            }
            GestureLabel::ILoveYou => {
                self.descriptor(label, &table.i_love_you, Mood::Affectionate, "Love you too!")
            }
        }
    }

    /// Read the active gesture of a detection.
    ///
    /// The active label is the first candidate of the first gesture. It is
    /// `None` when nobody is present, no gesture was reported, or the
    /// candidate scores below the confidence floor.
    pub fn active_gesture(&self, detection: &Detection) -> Result<ActiveGesture, UnknownGesture> {
        let person_present = detection.person_present();
        let candidate = match detection.first_candidate() {
            Some(candidate) if person_present => candidate,
            _ => {
                return Ok(ActiveGesture {
                    label: GestureLabel::None,
                    person_present,
                })
            }
        };

        let label = GestureLabel::from_category(&candidate.category)?;
        let label = if candidate.score < self.min_confidence {
            GestureLabel::None
        } else {
            label
        };

        Ok(ActiveGesture {
            label,
            person_present,
        })
    }

    /// Classify a whole detection.
    ///
    /// A category outside the vocabulary is logged and answered with the
    /// resting response.
    pub fn classify_detection(&self, detection: &Detection) -> (ActiveGesture, ResponseDescriptor) {
        match self.active_gesture(detection) {
            Ok(active) => (active, self.classify(active.label, active.person_present)),
            Err(UnknownGesture(category)) => {
                tracing::warn!(
                    category = %category,
                    timestamp_ns = detection.timestamp_ns,
                    "Unmapped gesture category, falling back to resting response"
                );
                let active = ActiveGesture {
                    label: GestureLabel::None,
                    person_present: detection.person_present(),
                };
                (active, self.resting())
            }
        }
    }

    fn descriptor(
        &self,
        label: GestureLabel,
        behavior: &str,
        mood: Mood,
        message: &str,
    ) -> ResponseDescriptor {
        ResponseDescriptor {
            label,
            target_behavior: BehaviorId::new(behavior),
            mood,
            message: message.to_string(),
            auto_revert_after: self.auto_revert_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_every_label_maps_to_distinct_behavior_with_person() {
        let classifier = GestureClassifier::with_defaults();
        let mut seen = std::collections::HashSet::new();
        for label in GestureLabel::ALL {
            let response = classifier.classify(label, true);
            assert_eq!(response.label, label);
            assert!(seen.insert(response.target_behavior.clone()));
        }
    }

    #[test]
    fn test_none_with_person_differs_from_no_person() {
        let classifier = GestureClassifier::with_defaults();
        let waiting = classifier.classify(GestureLabel::None, true);
        let resting = classifier.classify(GestureLabel::None, false);
        assert_ne!(waiting, resting);
        assert_eq!(waiting.target_behavior.as_str(), "waiting");
        assert_eq!(resting.target_behavior.as_str(), "idle");
        assert_eq!(resting.mood, Mood::Searching);
    }

    #[test]
    fn test_behavior_table_overrides_ids() {
        let table = BehaviorTable {
            thumb_up: "clip-017".to_string(),
            ..BehaviorTable::default()
        };
        let classifier = GestureClassifier::new(table, &ResponseConfig::default());
        let response = classifier.classify(GestureLabel::ThumbUp, true);
        assert_eq!(response.target_behavior.as_str(), "clip-017");
    }

    #[test]
    fn test_detection_uses_first_hand_first_candidate() {
        let classifier = GestureClassifier::with_defaults();
        let detection = Detection::single_hand(0, "Open_Palm", 0.9);
        let (active, response) = classifier.classify_detection(&detection);
        assert_eq!(active.label, GestureLabel::OpenPalm);
        assert!(active.person_present);
        assert_eq!(response.target_behavior.as_str(), "wave");
    }

    #[test]
    fn test_low_confidence_reads_as_no_gesture() {
        let classifier = GestureClassifier::with_defaults();
        let detection = Detection::single_hand(0, "Victory", 0.2);
        let (active, response) = classifier.classify_detection(&detection);
        assert_eq!(active.label, GestureLabel::None);
        assert_eq!(response.target_behavior.as_str(), "waiting");
    }

    #[test]
    fn test_gesture_without_landmarks_is_ignored() {
        let classifier = GestureClassifier::with_defaults();
        let mut detection = Detection::single_hand(0, "Thumb_Up", 0.95);
        detection.landmarks.clear();
        let (active, response) = classifier.classify_detection(&detection);
        assert_eq!(active.label, GestureLabel::None);
        assert!(!active.person_present);
        assert_eq!(response, classifier.resting());
    }

    #[test]
    fn test_unknown_category_fails_safe_to_resting() {
        let classifier = GestureClassifier::with_defaults();
        let detection = Detection::single_hand(0, "Shaka", 0.99);
        let err = classifier.active_gesture(&detection).unwrap_err();
        assert_eq!(err, UnknownGesture("Shaka".to_string()));
        assert_eq!(err.to_string(), "unknown gesture category: \"Shaka\"");
        let (_, response) = classifier.classify_detection(&detection);
        assert_eq!(response, classifier.resting());
    }

    proptest! {
        #[test]
        fn prop_absent_person_always_rests(index in 0usize..GestureLabel::ALL.len()) {
            let classifier = GestureClassifier::with_defaults();
            let label = GestureLabel::ALL[index];
            prop_assert_eq!(classifier.classify(label, false), classifier.resting());
        }

        #[test]
        fn prop_revert_duration_follows_config(ms in 1u64..60_000) {
            let response = ResponseConfig { auto_revert_ms: ms, ..ResponseConfig::default() };
            let classifier = GestureClassifier::new(BehaviorTable::default(), &response);
            for label in GestureLabel::ALL {
                prop_assert_eq!(
                    classifier.classify(label, true).auto_revert_after,
                    Duration::from_millis(ms)
                );
            }
        }
    }
}
