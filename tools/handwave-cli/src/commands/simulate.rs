//! Run a detection recording through the orchestrator on a manual clock.

use std::path::PathBuf;
use std::time::Duration;

use handwave_common::clock::{ns_to_secs, secs_to_ns, ManualClock, MonotonicClock};
use handwave_common::config::AppConfig;
use handwave_detection_feed::recorder::read_stats;
use handwave_orchestrator_core::{
    DetectionOutcome, GestureClassifier, ResponseOrchestrator, TransitionStarted,
};
use handwave_response_model::detection::{parse_detections, parse_header};
use serde::Serialize;

#[derive(Serialize)]
struct TimelineEntry<'a> {
    at_secs: f64,
    #[serde(flatten)]
    transition: &'a TransitionStarted,
    mood: &'a str,
    message: &'a str,
}

pub fn run(
    config: &AppConfig,
    script: PathBuf,
    tick_ms: u64,
    tail_secs: f64,
    json: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!(tick_ms > 0, "--tick-ms must be positive");

    let content = std::fs::read_to_string(&script)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", script.display()))?;
    let mut detections = parse_detections(&content)?;
    detections.sort_by_key(|d| d.timestamp_ns);

    let Some(first) = detections.first().map(|d| d.timestamp_ns) else {
        anyhow::bail!("{} contains no detections", script.display());
    };
    let last = detections.last().map_or(first, |d| d.timestamp_ns);

    if !json {
        match parse_header(&content) {
            Some(header) => println!(
                "Recording: {} (detector: {}, recorded {})",
                script.display(),
                header.detector,
                header.epoch_wall
            ),
            None => println!("Recording: {}", script.display()),
        }
        println!(
            "  {} detections over {:.2}s",
            detections.len(),
            ns_to_secs(last - first)
        );
        if let Some(stats) = read_stats(&content) {
            println!(
                "  Recorded feed: {} frames, {} detector failures, {} dropped out of order",
                stats.frames_processed, stats.detector_failures, stats.out_of_order_dropped
            );
        }
        println!();
    }

    let classifier = GestureClassifier::new(config.behaviors.clone(), &config.response);
    let mut orchestrator = ResponseOrchestrator::new(classifier, &config.response);

    // Recording time is rebased so the first detection lands at zero.
    let clock = ManualClock::new();
    let end_ns = last - first + secs_to_ns(tail_secs.max(0.0));
    let tick = Duration::from_millis(tick_ms);
    let mut pending = detections.iter().peekable();

    loop {
        let now = clock.now_ns();

        if let Some(reverted) = orchestrator.tick(now).reverted {
            report(&orchestrator, &reverted, now, json)?;
        }

        while let Some(detection) = pending.next_if(|d| d.timestamp_ns - first <= now) {
            if let DetectionOutcome::Started(started) = orchestrator.on_detection(detection, now) {
                report(&orchestrator, &started, now, json)?;
            }
        }

        if now >= end_ns {
            break;
        }
        clock.advance(tick);
    }

    if !json {
        println!();
        println!(
            "Transitions: {} ({} auto-revert)",
            orchestrator.transitions_started(),
            orchestrator.reverts_fired()
        );
        println!(
            "Final: {} ({:?})",
            orchestrator.state().current,
            orchestrator.phase()
        );
    }

    Ok(())
}

fn report(
    orchestrator: &ResponseOrchestrator,
    started: &TransitionStarted,
    now_ns: u64,
    json: bool,
) -> anyhow::Result<()> {
    let response = orchestrator.active_response();
    if json {
        let entry = TimelineEntry {
            at_secs: ns_to_secs(now_ns),
            transition: started,
            mood: response.mood.as_str(),
            message: &response.message,
        };
        println!("{}", serde_json::to_string(&entry)?);
    } else {
        println!(
            "{:>8.3}s  {:>12} -> {:<12} {:<10} {}",
            ns_to_secs(now_ns),
            started.from,
            started.to,
            format!("{:?}", started.cause).to_lowercase(),
            response.message
        );
    }
    Ok(())
}
