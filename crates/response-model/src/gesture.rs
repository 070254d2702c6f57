//! The closed gesture vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A gesture the detector can report.
///
/// The set is closed: anything the detector emits outside of it is an
/// [`UnknownGesture`] and never reaches the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureLabel {
    None,
    ThumbUp,
    ThumbDown,
    ClosedFist,
    OpenPalm,
    PointingUp,
    Victory,
    Ok,
    ILoveYou,
}

/// A detector category name outside the gesture vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gesture category: {0:?}")]
pub struct UnknownGesture(pub String);

impl GestureLabel {
    pub const ALL: [GestureLabel; 9] = [
        GestureLabel::None,
        GestureLabel::ThumbUp,
        GestureLabel::ThumbDown,
        GestureLabel::ClosedFist,
        GestureLabel::OpenPalm,
        GestureLabel::PointingUp,
        GestureLabel::Victory,
        GestureLabel::Ok,
        GestureLabel::ILoveYou,
    ];

    /// Category name as the detector spells it.
    pub fn category_name(self) -> &'static str {
        match self {
            GestureLabel::None => "None",
            GestureLabel::ThumbUp => "Thumb_Up",
            GestureLabel::ThumbDown => "Thumb_Down",
            GestureLabel::ClosedFist => "Closed_Fist",
            GestureLabel::OpenPalm => "Open_Palm",
            GestureLabel::PointingUp => "Pointing_Up",
            GestureLabel::Victory => "Victory",
            GestureLabel::Ok => "OK",
            GestureLabel::ILoveYou => "ILoveYou",
        }
    }

    /// Parse a detector category name.
    ///
    /// Matching ignores case and `_`, `-`, and space separators, so
    /// `"Thumb_Up"`, `"thumb-up"` and `"THUMBUP"` are the same gesture.
    /// An empty name reads as [`GestureLabel::None`].
    pub fn from_category(name: &str) -> Result<Self, UnknownGesture> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        let label = match key.as_str() {
            "" | "none" => GestureLabel::None,
            "thumbup" | "thumbsup" => GestureLabel::ThumbUp,
            "thumbdown" | "thumbsdown" => GestureLabel::ThumbDown,
            "closedfist" | "fist" => GestureLabel::ClosedFist,
            "openpalm" | "palm" => GestureLabel::OpenPalm,
            "pointingup" | "pointup" => GestureLabel::PointingUp,
            "victory" => GestureLabel::Victory,
            "ok" => GestureLabel::Ok,
            "iloveyou" | "loveyou" => GestureLabel::ILoveYou,
            _ => return Err(UnknownGesture(name.to_string())),
        };
        Ok(label)
    }

    pub fn is_none(self) -> bool {
        self == GestureLabel::None
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.category_name())
    }
}

impl FromStr for GestureLabel {
    type Err = UnknownGesture;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_category(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_category_names_parse_back() {
        for label in GestureLabel::ALL {
            assert_eq!(GestureLabel::from_category(label.category_name()), Ok(label));
        }
    }

    #[test]
    fn test_lenient_spellings() {
        assert_eq!("thumb-up".parse(), Ok(GestureLabel::ThumbUp));
        assert_eq!("CLOSED FIST".parse(), Ok(GestureLabel::ClosedFist));
        assert_eq!("i_love_you".parse(), Ok(GestureLabel::ILoveYou));
        assert_eq!("".parse(), Ok(GestureLabel::None));
    }

    #[test]
    fn test_unknown_category() {
        let err = GestureLabel::from_category("Shaka").unwrap_err();
        assert_eq!(err, UnknownGesture("Shaka".to_string()));
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&GestureLabel::ILoveYou).unwrap();
        assert_eq!(json, "\"i_love_you\"");
    }

    proptest! {
        #[test]
        fn prop_case_and_separators_are_ignored(
            index in 0usize..GestureLabel::ALL.len(),
            upper in proptest::collection::vec(any::<bool>(), 16),
            separator in prop_oneof![Just(""), Just("_"), Just("-"), Just(" ")],
        ) {
            let label = GestureLabel::ALL[index];
            let spelled: String = label
                .category_name()
                .chars()
                .filter(|c| *c != '_')
                .enumerate()
                .map(|(i, c)| {
                    let c = if upper[i % upper.len()] {
                        c.to_ascii_uppercase()
                    } else {
                        c.to_ascii_lowercase()
                    };
                    format!("{c}{separator}")
                })
                .collect();
            prop_assert_eq!(GestureLabel::from_category(&spelled), Ok(label));
        }
    }
}
