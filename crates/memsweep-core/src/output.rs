//! Report output: atomic file writes and the JSON table artifact.
//!
//! Every report is written to a temporary file in its target directory and
//! then persisted over the final name, so a reader never sees a partially
//! written report.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::catalog::Regime;
use crate::descriptor::RowLabel;
use crate::error::{Result, SweepError};
use crate::obs;
use crate::scores::ScoreTransform;
use crate::table::{ModelTable, TierMismatch};

/// Timestamp embedded in report file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Atomically write `contents` to `path`, creating parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| SweepError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Directory that receives a run's reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSink {
    root: PathBuf,
}

impl ReportSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a text report under `file_name` and return its full path.
    pub fn write(&self, kind: &str, file_name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.root.join(file_name);
        write_atomic(&path, contents.as_bytes())?;
        obs::emit_report_written(kind, &path);
        Ok(path)
    }

    /// Write `value` as pretty JSON under `file_name`.
    pub fn write_json<T: Serialize>(&self, kind: &str, file_name: &str, value: &T) -> Result<PathBuf> {
        let content = serde_json::to_string_pretty(value)?;
        self.write(kind, file_name, &content)
    }
}

// ---------------------------------------------------------------------------
// File names
// ---------------------------------------------------------------------------

pub fn timestamp(now: DateTime<chrono::Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// `table_{model}.csv`, or `table_ceiling_{model}.csv` under the ceiling
/// transform.
pub fn table_file_name(folder_key: &str, transform: ScoreTransform, regime: Option<Regime>) -> String {
    let prefix = match transform {
        ScoreTransform::Identity => "table",
        ScoreTransform::Ceiling => "table_ceiling",
    };
    match regime {
        Some(regime) => format!("{prefix}_{folder_key}_{regime}.csv"),
        None => format!("{prefix}_{folder_key}.csv"),
    }
}

pub fn scan_table_file_name(model_name: &str) -> String {
    format!("table_scan_{}.csv", sanitize(model_name))
}

pub fn table_json_file_name(folder_key: &str) -> String {
    format!("tables_{folder_key}.json")
}

pub fn integrity_report_file_name(stamp: &str) -> String {
    format!("integrity_report_{stamp}.md")
}

pub fn glove_report_file_name(stamp: &str) -> String {
    format!("glove_performance_report_{stamp}.md")
}

/// `table_{slug}_{version}.csv`, where `slug` is the lower-cased title with
/// spaces replaced, e.g. `table_frozenlake_explicit_v0.csv`.
pub fn version_table_file_name(title: &str, version: &str) -> String {
    format!("table_{}_{}.csv", slug(title), sanitize(version))
}

pub fn version_summary_file_name(title: &str) -> String {
    format!("table_{}_summary.csv", slug(title))
}

fn slug(title: &str) -> String {
    title.to_lowercase().replace(' ', "_")
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

// ---------------------------------------------------------------------------
// JSON artifact
// ---------------------------------------------------------------------------

/// One table cell in the JSON artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellArtifact {
    pub regime: Regime,
    pub row: RowLabel,
    pub environment: String,
    pub tiers: Vec<Option<f64>>,
}

/// Machine-readable copy of one model's table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub model: String,
    pub display_name: String,
    pub transform: ScoreTransform,
    pub cells: Vec<CellArtifact>,
    pub tier_mismatches: Vec<TierMismatch>,
}

impl TableArtifact {
    pub const SCHEMA_VERSION: &'static str = "1.0";

    pub fn from_model(model: &ModelTable, transform: ScoreTransform, generated_at: DateTime<Utc>) -> Self {
        Self {
            schema_version: Self::SCHEMA_VERSION.to_string(),
            generated_at,
            model: model.folder_key.clone(),
            display_name: model.display_name.clone(),
            transform,
            cells: model
                .table
                .iter()
                .map(|(key, tiers)| CellArtifact {
                    regime: key.regime,
                    row: key.row,
                    environment: key.environment.clone(),
                    tiers: tiers.to_vec(),
                })
                .collect(),
            tier_mismatches: model.tier_mismatches.clone(),
        }
    }
}
