use std::path::PathBuf;

use handwave_common::config::{BehaviorTable, EasingFunction, ResponseConfig};
use handwave_orchestrator_core::{
    DetectionOutcome, GestureClassifier, OrchestratorPhase, ResponseOrchestrator, TransitionCause,
    TransitionStarted,
};
use handwave_response_model::detection::parse_detections;
use handwave_response_model::Detection;
use proptest::prelude::*;

const MS: u64 = 1_000_000;
const SEC: u64 = 1_000 * MS;
const FRAME_NS: u64 = 16 * MS;

fn load_fixture(name: &str) -> Vec<Detection> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sessions")
        .join(name);

    let content = std::fs::read_to_string(path).expect("fixture should be readable");
    parse_detections(&content).expect("fixture should parse")
}

/// Feed detections in order, ticking at frame rate in between, and collect
/// every transition that started.
fn drive(
    orch: &mut ResponseOrchestrator,
    detections: &[Detection],
    until_ns: u64,
) -> Vec<TransitionStarted> {
    let mut started = Vec::new();
    let mut now = 0;
    let mut pending = detections.iter().peekable();

    while now <= until_ns {
        if let Some(reverted) = orch.tick(now).reverted {
            started.push(reverted);
        }
        while let Some(detection) = pending.next_if(|d| d.timestamp_ns <= now) {
            if let DetectionOutcome::Started(transition) = orch.on_detection(detection, now) {
                started.push(transition);
            }
        }
        now += FRAME_NS;
    }
    started
}

fn summary(started: &[TransitionStarted]) -> Vec<(String, String, TransitionCause)> {
    started
        .iter()
        .map(|t| (t.from.to_string(), t.to.to_string(), t.cause))
        .collect()
}

#[test]
fn greeting_fixture_produces_expected_transitions() {
    let detections = load_fixture("greeting.jsonl");
    assert_eq!(detections.len(), 8);

    let mut orch = ResponseOrchestrator::with_defaults();
    let started = drive(&mut orch, &detections, 10 * SEC);

    let expected = vec![
        ("idle", "thumbs-up", TransitionCause::Detection),
        ("thumbs-up", "waiting", TransitionCause::Detection),
        ("waiting", "wave", TransitionCause::Detection),
        ("wave", "heart", TransitionCause::Detection),
        ("heart", "idle", TransitionCause::Revert),
    ]
    .into_iter()
    .map(|(from, to, cause)| (from.to_string(), to.to_string(), cause))
    .collect::<Vec<_>>();

    assert_eq!(summary(&started), expected);
    assert_eq!(orch.phase(), OrchestratorPhase::Resting);
    assert_eq!(orch.transitions_started(), 5);
    assert_eq!(orch.reverts_fired(), 1);
}

#[test]
fn waiting_for_gesture_rearms_revert() {
    let mut orch = ResponseOrchestrator::with_defaults();

    assert_eq!(orch.on_detection(&Detection::empty(0), 0), DetectionOutcome::Unchanged);
    assert_eq!(orch.state().current.as_str(), "idle");

    orch.tick(2 * SEC);
    orch.on_detection(&Detection::single_hand(2 * SEC, "Thumb_Up", 0.9), 2 * SEC);
    assert_eq!(orch.state().current.as_str(), "thumbs-up");
    assert_eq!(orch.revert_deadline_ns(), Some(5 * SEC));

    orch.tick(2 * SEC + 500 * MS);
    assert_eq!(orch.phase(), OrchestratorPhase::ActiveSteady);

    orch.tick(4 * SEC);
    orch.on_detection(&Detection::single_hand(4 * SEC, "None", 0.9), 4 * SEC);
    assert_eq!(orch.state().previous.as_str(), "thumbs-up");
    assert_eq!(orch.state().current.as_str(), "waiting");
    assert_eq!(orch.revert_deadline_ns(), Some(7 * SEC));

    // The first deadline no longer exists.
    assert!(orch.tick(5 * SEC).reverted.is_none());
    assert_eq!(orch.state().current.as_str(), "waiting");

    let reverted = orch.tick(7 * SEC).reverted.expect("revert should fire at 7s");
    assert_eq!(reverted.from.as_str(), "waiting");
    assert_eq!(orch.state().current.as_str(), "idle");
}

#[test]
fn repeated_gesture_does_not_restart_transition() {
    let mut orch = ResponseOrchestrator::with_defaults();
    orch.on_detection(&Detection::single_hand(0, "Victory", 0.9), 0);

    for i in 1..20 {
        let now = i * FRAME_NS;
        orch.tick(now);
        let before = orch.state().clone();
        assert_eq!(
            orch.on_detection(&Detection::single_hand(now, "Victory", 0.9), now),
            DetectionOutcome::Unchanged
        );
        assert_eq!(orch.state(), &before);
    }
    assert_eq!(orch.transitions_started(), 1);
    assert_eq!(orch.revert_deadline_ns(), Some(3 * SEC));
}

#[test]
fn rapid_gesture_changes_never_queue() {
    let mut orch = ResponseOrchestrator::with_defaults();
    let labels = ["Open_Palm", "Victory", "OK", "Closed_Fist", "Pointing_Up"];

    for (i, label) in labels.iter().enumerate() {
        let now = i as u64 * 50 * MS;
        orch.tick(now);
        let expected_previous = orch.state().current.clone();
        orch.on_detection(&Detection::single_hand(now, *label, 0.9), now);
        assert_eq!(orch.state().previous, expected_previous);
        assert!(orch.is_transitioning());
    }

    // Only the last transition is in flight; it completes on its own schedule.
    orch.tick(200 * MS + 500 * MS);
    assert!(!orch.is_transitioning());
    assert_eq!(orch.state().current.as_str(), "point-up");
}

#[test]
fn skipped_frame_leaves_state_untouched() {
    let mut orch = ResponseOrchestrator::with_defaults();
    orch.on_detection(&Detection::single_hand(0, "Thumb_Down", 0.9), 0);
    orch.tick(600 * MS);
    let before = orch.view();

    // Frame N failed upstream: nothing is delivered, the ticker still runs.
    orch.tick(616 * MS);
    assert_eq!(orch.view(), before);

    // Frame N+1 carries the same gesture.
    orch.on_detection(&Detection::single_hand(632 * MS, "Thumb_Down", 0.9), 632 * MS);
    orch.tick(632 * MS);
    assert_eq!(orch.view(), before);
}

#[test]
fn same_target_mid_crossfade_keeps_start_progress_and_deadline() {
    let response = ResponseConfig {
        crossfade_ms: 1_200,
        auto_revert_ms: 5_000,
        easing: EasingFunction::EaseInOut,
        ..ResponseConfig::default()
    };
    let mut orch = ResponseOrchestrator::new(
        GestureClassifier::new(BehaviorTable::default(), &response),
        &response,
    );

    orch.on_detection(&Detection::single_hand(0, "Open_Palm", 0.9), 0);
    assert_eq!(orch.transition_completes_at_ns(), Some(1_200 * MS));
    assert_eq!(orch.revert_deadline_ns(), Some(5 * SEC));

    let mut now = FRAME_NS;
    while now < 1_200 * MS {
        orch.tick(now);
        let before = orch.state().clone();
        assert!(before.is_transitioning);

        let outcome = orch.on_detection(&Detection::single_hand(now, "Open_Palm", 0.9), now);
        assert_eq!(outcome, DetectionOutcome::Unchanged);
        assert_eq!(orch.state(), &before);
        assert_eq!(orch.transition_completes_at_ns(), Some(1_200 * MS));
        assert_eq!(orch.revert_deadline_ns(), Some(5 * SEC));
        now += FRAME_NS;
    }

    orch.tick(1_200 * MS);
    assert_eq!(orch.phase(), OrchestratorPhase::ActiveSteady);
    assert_eq!(orch.transitions_started(), 1);
}

#[test]
fn held_gesture_restarts_once_after_revert() {
    let mut orch = ResponseOrchestrator::with_defaults();
    let mut started = Vec::new();
    let mut now = 0;
    while now <= 4 * SEC {
        if let Some(reverted) = orch.tick(now).reverted {
            started.push(reverted);
        }
        if let DetectionOutcome::Started(t) =
            orch.on_detection(&Detection::single_hand(now, "OK", 0.9), now)
        {
            started.push(t);
        }
        now += FRAME_NS;
    }

    let expected = vec![
        ("idle", "ok", TransitionCause::Detection),
        ("ok", "idle", TransitionCause::Revert),
        ("idle", "ok", TransitionCause::Detection),
    ]
    .into_iter()
    .map(|(from, to, cause)| (from.to_string(), to.to_string(), cause))
    .collect::<Vec<_>>();
    assert_eq!(summary(&started), expected);

    // Revert fired on the 3008ms frame; the same frame re-armed from there.
    assert_eq!(started[1].from.as_str(), "ok");
    assert_eq!(started[2].revert_deadline_ns, Some(6_008 * MS));
    assert_eq!(orch.reverts_fired(), 1);
    assert_eq!(orch.state().current.as_str(), "ok");
}

#[test]
fn view_serializes_for_presentation() {
    let mut orch = ResponseOrchestrator::with_defaults();
    orch.on_detection(&Detection::single_hand(0, "ILoveYou", 0.9), 0);
    orch.tick(100 * MS);

    let json = serde_json::to_value(orch.view()).expect("view should serialize");
    assert_eq!(json["phase"], "transitioning");
    assert_eq!(json["transition"]["current"], "heart");
    assert_eq!(json["mood"], "affectionate");
    assert_eq!(json["weights"].as_array().map(Vec::len), Some(2));
}

fn detection_strategy() -> impl Strategy<Value = (u64, Option<&'static str>)> {
    let labels = prop_oneof![
        Just(None),
        Just(Some("None")),
        Just(Some("Thumb_Up")),
        Just(Some("Open_Palm")),
        Just(Some("Victory")),
    ];
    (1u64..400, labels)
}

proptest! {
    #[test]
    fn prop_duplicate_detection_is_idempotent(
        steps in proptest::collection::vec(detection_strategy(), 1..60),
    ) {
        let mut orch = ResponseOrchestrator::with_defaults();
        let mut now = 0;
        for (gap_ms, label) in steps {
            now += gap_ms * MS;
            orch.tick(now);
            let detection = match label {
                Some(category) => Detection::single_hand(now, category, 0.9),
                None => Detection::empty(now),
            };
            orch.on_detection(&detection, now);

            let state = orch.state().clone();
            let deadline = orch.revert_deadline_ns();
            let outcome = orch.on_detection(&detection, now);
            prop_assert!(!matches!(outcome, DetectionOutcome::Started(_)));
            prop_assert_eq!(orch.state(), &state);
            prop_assert_eq!(orch.revert_deadline_ns(), deadline);
        }
    }

    #[test]
    fn prop_revert_never_armed_while_resting(
        steps in proptest::collection::vec(detection_strategy(), 1..60),
    ) {
        let mut orch = ResponseOrchestrator::with_defaults();
        let mut now = 0;
        for (gap_ms, label) in steps {
            now += gap_ms * MS;
            orch.tick(now);
            let detection = match label {
                Some(category) => Detection::single_hand(now, category, 0.9),
                None => Detection::empty(now),
            };
            orch.on_detection(&detection, now);
            if orch.state().current == *orch.resting_behavior() {
                prop_assert_eq!(orch.revert_deadline_ns(), None);
            } else {
                prop_assert!(orch.revert_deadline_ns().is_some());
            }
        }
    }
}
