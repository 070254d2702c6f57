//! Replay a detection recording through a real-time session.

use std::path::PathBuf;
use std::time::Duration;

use handwave_avatar_session::{AvatarSession, PresentationFrame, SessionConfig};
use handwave_common::clock::ns_to_secs;
use handwave_common::config::AppConfig;
use handwave_detection_feed::backends::{ReplayDetector, SyntheticFrameSource};

pub async fn run(
    config: &AppConfig,
    script: PathBuf,
    tail_secs: f64,
    record: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let detector = ReplayDetector::load(&script)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {e}", script.display()))?;
    let run_for = Duration::from_nanos(detector.span_ns())
        + Duration::from_secs_f64(tail_secs.max(0.0));

    println!(
        "Replaying {} ({} entries, {} recorded failures, {:.1}s)",
        script.display(),
        detector.len(),
        detector.failures(),
        run_for.as_secs_f64()
    );
    println!("Press Ctrl+C to stop early");
    println!();

    let mut session_config = SessionConfig::from_app_config(config);
    session_config.record_path = record.clone();

    let mut session = AvatarSession::new(session_config);
    let mut frames = session.subscribe();
    session
        .start(Box::new(detector), Box::new(SyntheticFrameSource::new()))
        .await?;

    let deadline = tokio::time::sleep(run_for);
    tokio::pin!(deadline);
    let mut last_shown: Option<(String, bool)> = None;

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted");
                break;
            }
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = frames.borrow_and_update().clone();
                show(&frame, &mut last_shown, json)?;
            }
        }
    }

    let summary = session.stop().await?;

    if json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!();
        println!("Session stopped after {:.2}s", summary.elapsed_secs);
        println!("  Frames processed: {}", summary.feed.frames_processed);
        println!("  Detector failures: {}", summary.feed.detector_failures);
        println!(
            "  Transitions: {} ({} auto-revert)",
            summary.transitions_started, summary.reverts_fired
        );
        if let Some(path) = record {
            println!("  Recording: {}", path.display());
        }
    }

    Ok(())
}

/// Print a frame when the shown behavior or transition flag changes.
fn show(
    frame: &PresentationFrame,
    last_shown: &mut Option<(String, bool)>,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(frame)?);
        return Ok(());
    }

    let transition = &frame.view.transition;
    let key = (transition.current.to_string(), transition.is_transitioning);
    if last_shown.as_ref() == Some(&key) {
        return Ok(());
    }

    if transition.is_transitioning {
        println!(
            "{:>8.3}s  {} -> {}  [{}] {}",
            ns_to_secs(frame.at_ns),
            transition.previous,
            transition.current,
            frame.view.mood,
            frame.view.message
        );
    } else {
        println!(
            "{:>8.3}s  showing {} ({:?})",
            ns_to_secs(frame.at_ns),
            transition.current,
            frame.view.phase
        );
    }
    *last_shown = Some(key);
    Ok(())
}
