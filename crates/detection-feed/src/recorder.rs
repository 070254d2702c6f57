//! Feed session recorder.
//!
//! A recording is the pump's view of a session, not just its output. Each
//! delivered detection becomes a JSONL line, each detector failure becomes a
//! `{"t":..,"failed":".."}` marker in sequence, and the final [`FeedStats`]
//! close the file as a `#` trailer. [`ReplayDetector`] plays both the
//! detections and the failures back.
//!
//! [`ReplayDetector`]: crate::backends::ReplayDetector

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use handwave_common::error::HandwaveResult;
use handwave_response_model::{Detection, DetectionStreamHeader, DetectorFailure, TimestampNs};
use serde::{Deserialize, Serialize};

use crate::FeedStats;

#[derive(Serialize, Deserialize)]
struct Trailer {
    stats: FeedStats,
}

/// Writes what a [`DetectionFeed`](crate::DetectionFeed) saw to a JSONL file.
pub struct FeedRecorder {
    out: BufWriter<File>,
    path: PathBuf,
    entries: u64,
}

impl FeedRecorder {
    /// Create (or truncate) `path` and write the stream header.
    pub fn create(path: PathBuf, header: &DetectionStreamHeader) -> HandwaveResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(&path)?);
        writeln!(out, "# {}", serde_json::to_string(header)?)?;

        Ok(Self {
            out,
            path,
            entries: 0,
        })
    }

    pub fn record_detection(&mut self, detection: &Detection) -> HandwaveResult<()> {
        serde_json::to_writer(&mut self.out, detection)?;
        self.end_entry()
    }

    pub fn record_failure(
        &mut self,
        timestamp_ns: TimestampNs,
        reason: &str,
    ) -> HandwaveResult<()> {
        let marker = DetectorFailure {
            timestamp_ns,
            failed: reason.to_string(),
        };
        serde_json::to_writer(&mut self.out, &marker)?;
        self.end_entry()?;
        self.out.flush()?;
        Ok(())
    }

    fn end_entry(&mut self) -> HandwaveResult<()> {
        self.out.write_all(b"\n")?;
        self.entries += 1;
        Ok(())
    }

    /// Lines written so far, header and trailer excluded.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Append the stats trailer and flush.
    pub fn finish(mut self, stats: &FeedStats) -> HandwaveResult<PathBuf> {
        let trailer = Trailer { stats: *stats };
        writeln!(self.out, "# {}", serde_json::to_string(&trailer)?)?;
        self.out.flush()?;
        tracing::debug!(
            path = %self.path.display(),
            entries = self.entries,
            "Feed recording closed"
        );
        Ok(self.path)
    }
}

/// Feed stats from the trailer of a finished recording.
///
/// `None` when the recording was cut short before the feed stopped.
pub fn read_stats(jsonl: &str) -> Option<FeedStats> {
    let last = jsonl.lines().map(str::trim).rev().find(|line| !line.is_empty())?;
    let body = last.strip_prefix('#')?.trim();
    serde_json::from_str::<Trailer>(body).ok().map(|t| t.stats)
}
