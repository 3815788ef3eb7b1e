//! Score extraction from per-run summary CSVs.
//!
//! The harness writes one header row followed by one row per episode; the
//! last column holds the episode score. Partial runs routinely leave
//! malformed rows behind, so anything that does not parse as a number is
//! skipped rather than aborting the read.

use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Transform applied to each raw score before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTransform {
    #[default]
    Identity,
    /// Collapse to a binary success indicator.
    Ceiling,
}

impl ScoreTransform {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::Identity => value,
            Self::Ceiling => ceiling(value),
        }
    }
}

/// `0 → 0.0`, anything else → `1.0` (negative scores included).
pub fn ceiling(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        1.0
    }
}

/// Read the last-column scores of `csv_path`, transformed.
///
/// A missing file yields an empty vector. Rows whose last field is not a
/// UTF-8 number are skipped; an I/O error part-way is logged and yields the
/// scores read so far.
pub fn extract_scores(csv_path: &Path, transform: ScoreTransform) -> Vec<f64> {
    let mut scores = Vec::new();
    if !csv_path.is_file() {
        return scores;
    }

    let mut reader = match ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(csv_path)
    {
        Ok(reader) => reader,
        Err(e) => {
            warn!(path = %csv_path.display(), error = %e, "failed to open score csv");
            return scores;
        }
    };

    for result in reader.byte_records() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => {
                warn!(path = %csv_path.display(), error = %e, "stopped reading score csv");
                break;
            }
            Err(e) => {
                warn!(path = %csv_path.display(), error = %e, "skipped unreadable score row");
                continue;
            }
        };
        let value = record
            .iter()
            .last()
            .and_then(|last| std::str::from_utf8(last).ok())
            .and_then(|last| last.trim().parse::<f64>().ok());
        if let Some(value) = value {
            scores.push(transform.apply(value));
        }
    }
    scores
}

/// Number of physical lines in `path`, header included; a trailing line
/// without a newline still counts. `None` when the file is absent or
/// unreadable.
pub fn count_lines(path: &Path) -> Option<usize> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to read csv for line count");
            }
            return None;
        }
    };
    let newlines = bytes.iter().filter(|&&b| b == b'\n').count();
    let unterminated = !bytes.is_empty() && bytes.last() != Some(&b'\n');
    Some(newlines + usize::from(unterminated))
}
