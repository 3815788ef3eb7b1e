//! Free-form directory scan.
//!
//! Older sweeps were written flat: `base/<run_folder>/<log_folder>/...`, with
//! the model, environment and regime only recoverable from folder names.
//! This scan walks such a tree for one model and fills a [`ModelTable`] from
//! whatever log folders it can decode.

use std::path::{Path, PathBuf};

use crate::catalog::{Catalog, Regime};
use crate::descriptor::DescriptorParser;
use crate::error::Result;
use crate::obs;
use crate::resolver::sorted_child_dirs;
use crate::scores::extract_scores;
use crate::table::{BuildSettings, ModelTable};

const SKIP_PREFIX: &str = "old";
const HIDDEN_LOG_PREFIX: &str = "log_hidden_";
const MOUNTAINCAR: &str = "mountaincar";

/// Whether a run folder is an archived run that must be ignored.
pub fn should_skip_dir(name: &str) -> bool {
    name.starts_with(SKIP_PREFIX)
}

/// Whether a run folder belongs to `model_name`, using the catalog's scan
/// alias for the model if it has one and a plain case-insensitive substring
/// match otherwise.
pub fn matches_model_name(catalog: &Catalog, dir_name: &str, model_name: &str) -> bool {
    match catalog.scan_alias(model_name) {
        Some(alias) => alias.matches(dir_name),
        None => dir_name
            .to_lowercase()
            .contains(&model_name.to_lowercase()),
    }
}

/// Environment short name contained in a run folder name, ignoring `-` and
/// `_`. Candidates are tried in the order given.
pub fn match_env_name(dir_name: &str, candidates: &[String]) -> Option<String> {
    let normalized: String = dir_name
        .to_lowercase()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect();
    candidates
        .iter()
        .find(|env| normalized.contains(env.to_lowercase().as_str()))
        .cloned()
}

/// Regime of a run folder: named explicitly in the folder name, otherwise
/// implicit iff any log folder carries the hidden prefix.
pub fn determine_regime(dir_name: &str, log_dirs: &[PathBuf]) -> Regime {
    let lower = dir_name.to_lowercase();
    if lower.contains("explicit") {
        return Regime::Explicit;
    }
    if lower.contains("implicit") {
        return Regime::Implicit;
    }
    let hidden = log_dirs.iter().any(|dir| {
        dir.file_name()
            .map(|n| n.to_string_lossy().starts_with(HIDDEN_LOG_PREFIX))
            .unwrap_or(false)
    });
    if hidden {
        Regime::Implicit
    } else {
        Regime::Explicit
    }
}

/// Scans flat run folders for one model.
pub struct DirectoryScanner<'a> {
    catalog: &'a Catalog,
    parser: DescriptorParser,
    settings: BuildSettings,
}

impl<'a> DirectoryScanner<'a> {
    pub fn new(catalog: &'a Catalog, settings: BuildSettings) -> Self {
        Self {
            catalog,
            parser: DescriptorParser::new(&catalog.model_fragments),
            settings,
        }
    }

    /// Scan `base_dir` for `model_name`'s runs.
    ///
    /// Run folders are visited in lexicographic order; when two folders
    /// produce the same cell the later one wins. Fails only if `base_dir`
    /// itself cannot be listed.
    pub fn scan(&self, base_dir: &Path, model_name: &str) -> Result<ModelTable> {
        let _span = obs::ScanSpan::enter(model_name);
        // Surface an unreadable base directory as an error rather than an
        // empty table.
        std::fs::read_dir(base_dir)?;

        let display = self
            .catalog
            .models
            .iter()
            .find(|m| m.folder_key == model_name || m.name_variants.iter().any(|v| v == model_name))
            .map(|m| m.display_name.clone())
            .unwrap_or_else(|| model_name.to_string());
        let mut out = ModelTable::new(model_name, &display);
        let env_names = self.catalog.short_names();

        for run_dir in sorted_child_dirs(base_dir) {
            let run_name = run_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            if should_skip_dir(&run_name) {
                tracing::info!(folder = %run_name, "skipping archived run folder");
                continue;
            }
            if !matches_model_name(self.catalog, &run_name, model_name) {
                continue;
            }
            let Some(env) = match_env_name(&run_name, &env_names) else {
                continue;
            };

            let log_dirs = sorted_child_dirs(&run_dir);
            let regime = if env == MOUNTAINCAR {
                Regime::Explicit
            } else {
                determine_regime(&run_name, &log_dirs)
            };
            let expected_tiers = self.catalog.tiers.for_regime(regime);
            tracing::info!(folder = %run_name, regime = %regime, environment = %env, "scanning run folder");

            for log_dir in &log_dirs {
                let csv_path = log_dir.join(&self.settings.summary_file);
                if !csv_path.is_file() {
                    continue;
                }
                let log_name = log_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();

                let parsed = match self.parser.parse(&log_name) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        obs::emit_parse_failure(&log_name, &e);
                        continue;
                    }
                };
                let Some(row) = parsed.row_label() else {
                    obs::emit_row_dropped(&log_name, &parsed.descriptor);
                    continue;
                };

                let scores = extract_scores(&csv_path, self.settings.transform);
                let tiers = self.settings.chunk.aggregate(&scores);
                obs::emit_cell_recorded(row.as_str(), &env, scores.len(), tiers.len());
                out.record(regime, row, &env, tiers, expected_tiers);
            }
        }
        Ok(out)
    }
}
