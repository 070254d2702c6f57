//! Print the gesture-to-behavior map.

use handwave_common::config::AppConfig;
use handwave_orchestrator_core::GestureClassifier;
use handwave_response_model::{GestureLabel, ResponseDescriptor};
use serde::Serialize;

#[derive(Serialize)]
struct Row {
    gesture: &'static str,
    person_present: bool,
    #[serde(flatten)]
    response: ResponseDescriptor,
}

pub fn run(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let classifier = GestureClassifier::new(config.behaviors.clone(), &config.response);

    let mut rows = vec![Row {
        gesture: "(nobody)",
        person_present: false,
        response: classifier.classify(GestureLabel::None, false),
    }];
    rows.extend(GestureLabel::ALL.iter().map(|&label| Row {
        gesture: label.category_name(),
        person_present: true,
        response: classifier.classify(label, true),
    }));

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<12} {:<14} {:<13} Message", "Gesture", "Behavior", "Mood");
    println!("{}", "=".repeat(72));
    for row in &rows {
        println!(
            "{:<12} {:<14} {:<13} {}",
            row.gesture,
            row.response.target_behavior,
            row.response.mood,
            row.response.message
        );
    }
    println!();
    println!(
        "Crossfade: {}ms, auto-revert after {}ms, confidence floor {:.2}",
        config.response.crossfade_ms,
        config.response.auto_revert_ms,
        config.response.min_gesture_confidence
    );

    Ok(())
}
