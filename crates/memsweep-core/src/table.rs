//! Result tables: aggregated tier means keyed by regime, row and
//! environment, and the catalog-driven builder that fills them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregate::ChunkPolicy;
use crate::catalog::{Catalog, ModelSpec, Regime};
use crate::descriptor::{parse_structured, RowLabel};
use crate::obs;
use crate::resolver::{resolve_env_folder, resolve_method_folder};
use crate::scores::{extract_scores, ScoreTransform};

/// Relative path of the score file inside a method folder.
pub const SUMMARY_FILE: &str = "log/explorer_summary.csv";

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Cell address in a [`ResultTable`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableKey {
    pub regime: Regime,
    pub row: RowLabel,
    /// Short environment name, e.g. `frozenlake`.
    pub environment: String,
}

/// Per-tier means, keyed by `(regime, row, environment)`.
///
/// Iteration follows key order: regime, then row display order, then
/// environment name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    cells: BTreeMap<TableKey, Vec<Option<f64>>>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the tier sequence for a cell, replacing any earlier value.
    pub fn insert(&mut self, regime: Regime, row: RowLabel, environment: &str, tiers: Vec<Option<f64>>) {
        self.cells.insert(
            TableKey {
                regime,
                row,
                environment: environment.to_string(),
            },
            tiers,
        );
    }

    pub fn tiers(&self, regime: Regime, row: RowLabel, environment: &str) -> Option<&[Option<f64>]> {
        self.cells
            .get(&TableKey {
                regime,
                row,
                environment: environment.to_string(),
            })
            .map(Vec::as_slice)
    }

    /// Mean of one tier, `None` when the cell or tier is absent.
    pub fn cell(&self, regime: Regime, row: RowLabel, environment: &str, tier: usize) -> Option<f64> {
        self.tiers(regime, row, environment)
            .and_then(|tiers| tiers.get(tier).copied().flatten())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TableKey, &[Option<f64>])> {
        self.cells.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

/// A cell whose tier count differs from its regime's declared count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMismatch {
    pub regime: Regime,
    pub row: RowLabel,
    pub environment: String,
    pub expected: usize,
    pub actual: usize,
}

/// Table for one model, with any tier mismatches found while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTable {
    pub folder_key: String,
    pub display_name: String,
    pub table: ResultTable,
    pub tier_mismatches: Vec<TierMismatch>,
}

impl ModelTable {
    pub fn new(folder_key: &str, display_name: &str) -> Self {
        Self {
            folder_key: folder_key.to_string(),
            display_name: display_name.to_string(),
            table: ResultTable::new(),
            tier_mismatches: Vec::new(),
        }
    }

    /// Insert a cell and check it against the declared tier count.
    pub fn record(
        &mut self,
        regime: Regime,
        row: RowLabel,
        environment: &str,
        tiers: Vec<Option<f64>>,
        expected_tiers: usize,
    ) {
        if tiers.len() != expected_tiers {
            obs::emit_tier_mismatch(regime, row.as_str(), environment, expected_tiers, tiers.len());
            self.tier_mismatches.push(TierMismatch {
                regime,
                row,
                environment: environment.to_string(),
                expected: expected_tiers,
                actual: tiers.len(),
            });
        }
        self.table.insert(regime, row, environment, tiers);
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Knobs shared by every table-producing scan.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSettings {
    pub chunk: ChunkPolicy,
    pub transform: ScoreTransform,
    /// Score file path relative to a method folder.
    pub summary_file: PathBuf,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            chunk: ChunkPolicy::default(),
            transform: ScoreTransform::Identity,
            summary_file: PathBuf::from(SUMMARY_FILE),
        }
    }
}

impl BuildSettings {
    pub fn with_transform(mut self, transform: ScoreTransform) -> Self {
        self.transform = transform;
        self
    }
}

/// Builds per-model tables by walking the catalog's
/// (model, environment, method) triples under a base directory laid out as
/// `base/<model_folder>/<environment_folder>/<method_folder>/<summary_file>`.
pub struct TableBuilder<'a> {
    catalog: &'a Catalog,
    settings: BuildSettings,
}

impl<'a> TableBuilder<'a> {
    pub fn new(catalog: &'a Catalog, settings: BuildSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Tables for every catalog model whose folder exists, in catalog order.
    pub fn build(&self, base_dir: &Path) -> Vec<ModelTable> {
        self.catalog
            .models
            .iter()
            .filter_map(|model| self.build_model(base_dir, model))
            .collect()
    }

    /// Table for one model; `None` when its folder is missing.
    ///
    /// Triples that fail resolution, parsing or extraction leave their cell
    /// absent.
    pub fn build_model(&self, base_dir: &Path, model: &ModelSpec) -> Option<ModelTable> {
        let _span = obs::ScanSpan::enter(&model.folder_key);
        let model_dir = base_dir.join(&model.folder_key);
        if !model_dir.is_dir() {
            obs::emit_folder_missing("model", base_dir, &model.folder_key);
            return None;
        }

        let mut out = ModelTable::new(&model.folder_key, &model.display_name);
        for env in &self.catalog.environments {
            let Some(env_folder) =
                resolve_env_folder(&model_dir, &model.canonical_prefix, env).into_path()
            else {
                continue;
            };
            let expected_tiers = self.catalog.tiers.for_regime(env.regime);

            for method in &self.catalog.methods {
                let Some(method_folder) =
                    resolve_method_folder(&env_folder, model, env, method).into_path()
                else {
                    continue;
                };

                let csv_path = method_folder.join(&self.settings.summary_file);
                if !csv_path.is_file() {
                    obs::emit_folder_missing(
                        "summary",
                        &method_folder,
                        &self.settings.summary_file.to_string_lossy(),
                    );
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
                let tiers = self.settings.chunk.aggregate(&scores);
                obs::emit_cell_recorded(row.as_str(), &env.short_name, scores.len(), tiers.len());
                out.record(env.regime, row, &env.short_name, tiers, expected_tiers);
            }
        }
        Some(out)
    }
}
