//! Version-bucketed sweeps: `root/<version>/<model_folder>/<log_folder>/...`.
//!
//! Each (version, model, row) gets one whole-run average rather than per-tier
//! means, and the versions are laid side by side in a summary table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregate::mean_if_sufficient;
use crate::catalog::{Catalog, ModelSpec};
use crate::descriptor::{parse_structured, RowLabel};
use crate::obs;
use crate::resolver::{resolve_log_folder, resolve_model_folder, sorted_child_dirs};
use crate::scores::extract_scores;
use crate::table::BuildSettings;

/// Whole-run averages for one model in one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScores {
    pub folder_key: String,
    pub display_name: String,
    pub rows: BTreeMap<RowLabel, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionTable {
    pub version: String,
    /// Models with at least one averaged row, in catalog order.
    pub models: Vec<ModelScores>,
}

impl VersionTable {
    pub fn score(&self, display_name: &str, row: RowLabel) -> Option<f64> {
        self.models
            .iter()
            .find(|m| m.display_name == display_name)
            .and_then(|m| m.rows.get(&row).copied())
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// All versions of one sweep, in scan order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSweep {
    /// Table title prefix, e.g. `FrozenLake Explicit`.
    pub title: String,
    pub versions: Vec<VersionTable>,
    /// Display names of every catalog model, in catalog order.
    pub model_order: Vec<String>,
}

pub struct VersionScanner<'a> {
    catalog: &'a Catalog,
    settings: BuildSettings,
    env_short: String,
    title: String,
}

impl<'a> VersionScanner<'a> {
    pub fn new(catalog: &'a Catalog, settings: BuildSettings) -> Self {
        Self {
            catalog,
            settings,
            env_short: "frozenlake".to_string(),
            title: "FrozenLake Explicit".to_string(),
        }
    }

    /// Environment short name used in log folder templates.
    pub fn with_environment(mut self, env_short: &str, title: &str) -> Self {
        self.env_short = env_short.to_string();
        self.title = title.to_string();
        self
    }

    /// Version folder names under `root`, sorted.
    pub fn discover_versions(root: &Path) -> Vec<String> {
        sorted_child_dirs(root)
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }

    /// Scan `versions` under `root`. A missing version folder gives an empty
    /// table for that version.
    pub fn scan(&self, root: &Path, versions: &[String]) -> VersionSweep {
        let tables = versions
            .iter()
            .map(|version| self.scan_version(&root.join(version), version))
            .collect();
        VersionSweep {
            title: self.title.clone(),
            versions: tables,
            model_order: self
                .catalog
                .models
                .iter()
                .map(|m| m.display_name.clone())
                .collect(),
        }
    }

    pub fn scan_version(&self, version_dir: &Path, version: &str) -> VersionTable {
        let mut table = VersionTable {
            version: version.to_string(),
            models: Vec::new(),
        };
        if !version_dir.is_dir() {
            tracing::warn!(version = %version, path = %version_dir.display(), "version folder missing");
            return table;
        }

        for model in &self.catalog.models {
            let Some(model_folder) = resolve_model_folder(version_dir, model).into_path() else {
                continue;
            };
            let rows = self.model_rows(&model_folder, model);
            if !rows.is_empty() {
                table.models.push(ModelScores {
                    folder_key: model.folder_key.clone(),
                    display_name: model.display_name.clone(),
                    rows,
                });
            }
        }
        table
    }

    fn model_rows(&self, model_folder: &Path, model: &ModelSpec) -> BTreeMap<RowLabel, f64> {
        let _span = obs::ScanSpan::enter(&model.folder_key);
        let mut rows = BTreeMap::new();
        for method in &self.catalog.methods {
            let Some(log_folder) =
                resolve_log_folder(model_folder, &self.env_short, model, method).into_path()
            else {
                continue;
            };
            let csv_path: PathBuf = log_folder.join(&self.settings.summary_file);
            if !csv_path.is_file() {
                continue;
            }
            let descriptor = match parse_structured(method) {
                Ok(d) => d,
                Err(e) => {
                    obs::emit_parse_failure(method, &e);
                    continue;
                }
            };
            let Some(row) = descriptor.row_label() else {
                obs::emit_row_dropped(method, &descriptor);
                continue;
            };

            let scores = extract_scores(&csv_path, self.settings.transform);
            match mean_if_sufficient(&scores, self.settings.chunk.min_samples) {
                Some(avg) => {
                    tracing::debug!(row = %row, samples = scores.len(), avg, "version row averaged");
                    rows.insert(row, avg);
                }
                None => {
                    tracing::info!(row = %row, samples = scores.len(), "insufficient samples");
                }
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_run(dir: &Path, scores: &[f64]) {
        let log = dir.join("log");
        fs::create_dir_all(&log).unwrap();
        let mut body = String::from("episode,score\n");
        for (i, s) in scores.iter().enumerate() {
            body.push_str(&format!("{i},{s}\n"));
        }
        fs::write(log.join("explorer_summary.csv"), body).unwrap();
    }

    #[test]
    fn test_discover_versions_sorted() {
        let root = tempdir().unwrap();
        for v in ["v2", "v0", "v1"] {
            fs::create_dir(root.path().join(v)).unwrap();
        }
        fs::write(root.path().join("notes.txt"), "x").unwrap();
        assert_eq!(
            VersionScanner::discover_versions(root.path()),
            vec!["v0", "v1", "v2"]
        );
    }

    #[test]
    fn test_scan_version_averages_whole_run() {
        let root = tempdir().unwrap();
        let model_folder = root.path().join("v0").join("gpt4o_frozenlake_run");
        write_run(
            &model_folder.join("log_frozenlake_gpt-4o_vanilla_True_False"),
            &[1.0; 25],
        );
        write_run(
            &model_folder.join("log_frozenlake_gpt-4o_voyager_True_True"),
            &[1.0; 10],
        );

        let catalog = Catalog::standard();
        let scanner = VersionScanner::new(&catalog, BuildSettings::default());
        let sweep = scanner.scan(root.path(), &["v0".to_string(), "v9".to_string()]);

        assert_eq!(sweep.versions.len(), 2);
        let v0 = &sweep.versions[0];
        assert_eq!(v0.models.len(), 1);
        assert_eq!(v0.score("GPT-4o", RowLabel::Vanilla), Some(1.0));
        assert_eq!(v0.score("GPT-4o", RowLabel::VoyagerGlove), None);
        assert!(sweep.versions[1].is_empty());
        assert_eq!(sweep.model_order.len(), catalog.models.len());
    }
}
