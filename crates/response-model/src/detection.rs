//! Per-frame detection results.
//!
//! A [`Detection`] is what the feed hands downstream for one processed
//! video frame. Recorded streams use append-only JSONL, one entry per line,
//! with an optional `# {header}` first line. An entry is either a detection
//! or a [`DetectorFailure`] marker for a frame the detector could not read.

use serde::{Deserialize, Serialize};

/// Monotonic timestamp in nanoseconds since session start.
pub type TimestampNs = u64;

/// One classified gesture candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureCandidate {
    /// Detector category name (e.g. `"Thumb_Up"`).
    pub category: String,
    /// Confidence in `[0.0, 1.0]`.
    pub score: f32,
}

/// A single hand keypoint, normalized to the video frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

/// Raw detector output for one frame, before the feed stamps it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizerOutput {
    /// One entry per detected hand, each ordered highest-confidence first.
    #[serde(default)]
    pub gestures: Vec<Vec<GestureCandidate>>,

    /// One point set per detected hand.
    #[serde(default)]
    pub landmarks: Vec<Vec<Landmark>>,
}

/// A timestamped detection for a single processed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Monotonic nanoseconds since session start.
    #[serde(rename = "t")]
    pub timestamp_ns: TimestampNs,

    #[serde(default)]
    pub gestures: Vec<Vec<GestureCandidate>>,

    #[serde(default)]
    pub landmarks: Vec<Vec<Landmark>>,
}

/// A frame the detector failed on, recorded in place of its detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorFailure {
    #[serde(rename = "t")]
    pub timestamp_ns: TimestampNs,

    /// Error the detector reported.
    pub failed: String,
}

/// One line of a recorded stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamEntry {
    // Must stay first: every marker line also parses as a `Detection`.
    Failure(DetectorFailure),
    Detection(Detection),
}

impl StreamEntry {
    pub fn timestamp_ns(&self) -> TimestampNs {
        match self {
            StreamEntry::Failure(failure) => failure.timestamp_ns,
            StreamEntry::Detection(detection) => detection.timestamp_ns,
        }
    }
}

/// Header line for a recorded detection stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionStreamHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Wall-clock time at session start (ISO 8601).
    pub epoch_wall: String,

    /// Name of the detector that produced the stream.
    pub detector: String,
}

impl Detection {
    /// Stamp detector output with the time its frame was processed.
    pub fn from_output(timestamp_ns: TimestampNs, output: RecognizerOutput) -> Self {
        Self {
            timestamp_ns,
            gestures: output.gestures,
            landmarks: output.landmarks,
        }
    }

    /// A frame with nobody in it.
    pub fn empty(timestamp_ns: TimestampNs) -> Self {
        Self {
            timestamp_ns,
            gestures: vec![],
            landmarks: vec![],
        }
    }

    /// A frame with one hand showing `category` at `score`.
    ///
    /// The hand gets a single placeholder landmark so the person counts as
    /// present.
    pub fn single_hand(timestamp_ns: TimestampNs, category: impl Into<String>, score: f32) -> Self {
        Self {
            timestamp_ns,
            gestures: vec![vec![GestureCandidate {
                category: category.into(),
                score,
            }]],
            landmarks: vec![vec![Landmark {
                x: 0.5,
                y: 0.5,
                z: 0.0,
            }]],
        }
    }

    /// Whether any hand point set is non-empty.
    pub fn person_present(&self) -> bool {
        self.landmarks.iter().any(|hand| !hand.is_empty())
    }

    /// The first candidate of the first gesture, if any.
    pub fn first_candidate(&self) -> Option<&GestureCandidate> {
        self.gestures.first().and_then(|hand| hand.first())
    }

    /// Timestamp as fractional seconds since session start.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_ns as f64 / 1_000_000_000.0
    }
}

/// Parse every entry of a recorded stream, failure markers included.
///
/// Blank lines and `#` comment lines (including the header) are skipped.
pub fn parse_stream(jsonl: &str) -> Result<Vec<StreamEntry>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Parse the detections of a recorded stream, dropping failure markers.
pub fn parse_detections(jsonl: &str) -> Result<Vec<Detection>, serde_json::Error> {
    Ok(parse_stream(jsonl)?
        .into_iter()
        .filter_map(|entry| match entry {
            StreamEntry::Detection(detection) => Some(detection),
            StreamEntry::Failure(_) => None,
        })
        .collect())
}

/// Read the `# {header}` line of a recorded stream, if present.
pub fn parse_header(jsonl: &str) -> Option<DetectionStreamHeader> {
    let first = jsonl.lines().map(str::trim).find(|line| !line.is_empty())?;
    let body = first.strip_prefix('#')?.trim();
    serde_json::from_str(body).ok()
}

/// Serialize detections to JSONL format.
pub fn serialize_detections(detections: &[Detection]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for detection in detections {
        output.push_str(&serde_json::to_string(detection)?);
        output.push('\n');
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_presence_follows_landmarks() {
        assert!(!Detection::empty(0).person_present());
        assert!(Detection::single_hand(0, "Victory", 0.9).person_present());

        let hollow = Detection {
            timestamp_ns: 0,
            gestures: vec![],
            landmarks: vec![vec![], vec![]],
        };
        assert!(!hollow.person_present());
    }

    #[test]
    fn test_first_candidate_picks_first_hand_first_entry() {
        let detection = Detection {
            timestamp_ns: 0,
            gestures: vec![
                vec![
                    GestureCandidate {
                        category: "Thumb_Up".into(),
                        score: 0.8,
                    },
                    GestureCandidate {
                        category: "Victory".into(),
                        score: 0.1,
                    },
                ],
                vec![GestureCandidate {
                    category: "Open_Palm".into(),
                    score: 0.99,
                }],
            ],
            landmarks: vec![],
        };
        assert_eq!(detection.first_candidate().unwrap().category, "Thumb_Up");
        assert!(Detection::empty(0).first_candidate().is_none());
    }

    #[test]
    fn test_json_format_uses_short_timestamp_key() {
        let detection = Detection::single_hand(1_500_000_000, "OK", 0.7);
        let json = serde_json::to_string(&detection).unwrap();
        assert!(json.contains("\"t\":1500000000"));
        assert!(json.contains("\"category\":\"OK\""));
    }

    #[test]
    fn test_parse_detections_skips_header_and_fills_defaults() {
        let jsonl = "# {\"schema_version\":\"1.0\",\"epoch_wall\":\"2026-01-01T00:00:00Z\",\"detector\":\"replay\"}\n\
                     {\"t\":0}\n\
                     \n\
                     {\"t\":2000000000,\"gestures\":[[{\"category\":\"Thumb_Up\",\"score\":0.9}]],\"landmarks\":[[{\"x\":0.1,\"y\":0.2}]]}\n";
        let parsed = parse_detections(jsonl).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(!parsed[0].person_present());
        assert!(parsed[1].person_present());
        assert!((parsed[1].timestamp_secs() - 2.0).abs() < 1e-9);

        let header = parse_header(jsonl).unwrap();
        assert_eq!(header.detector, "replay");
    }

    #[test]
    fn test_failure_markers_stay_in_stream_order() {
        let jsonl = "{\"t\":0}\n\
                     {\"t\":50,\"failed\":\"Detector error: frame decode error\"}\n\
                     {\"t\":100,\"gestures\":[[{\"category\":\"OK\",\"score\":0.9}]]}\n";

        let entries = parse_stream(jsonl).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(matches!(&entries[0], StreamEntry::Detection(d) if d.timestamp_ns == 0));
        match &entries[1] {
            StreamEntry::Failure(failure) => {
                assert_eq!(failure.timestamp_ns, 50);
                assert!(failure.failed.contains("frame decode error"));
            }
            other => panic!("expected a failure marker, got {other:?}"),
        }
        assert_eq!(entries[2].timestamp_ns(), 100);

        let detections = parse_detections(jsonl).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[1].first_candidate().unwrap().category, "OK");
    }

    #[test]
    fn test_parse_header_absent() {
        assert!(parse_header("{\"t\":0}\n").is_none());
    }

    #[test]
    fn test_serialize_one_line_per_detection() {
        let detections = vec![Detection::empty(0), Detection::single_hand(10, "Victory", 0.6)];
        let jsonl = serialize_detections(&detections).unwrap();
        assert_eq!(jsonl.lines().count(), 2);
        assert_eq!(parse_detections(&jsonl).unwrap(), detections);
    }
}
