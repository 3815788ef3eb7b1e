//! Glove comparison: cells where an embedding-augmented row scores strictly
//! lower than its plain counterpart.

use serde::{Deserialize, Serialize};

use crate::catalog::Regime;
use crate::descriptor::RowLabel;
use crate::table::ModelTable;

/// Scenario tiers compared by default (env1 and env2).
pub const DEFAULT_TIERS: [usize; 2] = [1, 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GloveRegression {
    /// Model display name.
    pub model: String,
    /// The plain row; its glove counterpart scored lower.
    pub method: RowLabel,
    pub tier: usize,
    pub base_score: f64,
    pub glove_score: f64,
    /// `base_score - glove_score`, always positive.
    pub diff: f64,
}

impl GloveRegression {
    pub fn tier_label(&self) -> String {
        format!("env{}", self.tier)
    }
}

/// Regressions found in one set of model tables, e.g. one sweep version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GloveSource {
    pub name: String,
    pub regressions: Vec<GloveRegression>,
}

/// Compare every plain/glove row pair of every model on `tiers` of
/// `(regime, environment)`. Pairs with either side absent are skipped.
/// Output follows model order, then pair order, then tier order.
pub fn compare_glove(
    tables: &[ModelTable],
    regime: Regime,
    environment: &str,
    tiers: &[usize],
) -> Vec<GloveRegression> {
    let mut out = Vec::new();
    for model in tables {
        for (base_row, glove_row) in RowLabel::GLOVE_PAIRS {
            for &tier in tiers {
                let base = model.table.cell(regime, base_row, environment, tier);
                let glove = model.table.cell(regime, glove_row, environment, tier);
                let (Some(base_score), Some(glove_score)) = (base, glove) else {
                    continue;
                };
                if glove_score < base_score {
                    out.push(GloveRegression {
                        model: model.display_name.clone(),
                        method: base_row,
                        tier,
                        base_score,
                        glove_score,
                        diff: base_score - glove_score,
                    });
                }
            }
        }
    }
    out
}

/// Per-method totals across all sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodStats {
    pub method: RowLabel,
    /// Regression count per compared tier, aligned with [`GloveReport::tiers`].
    pub per_tier: Vec<usize>,
    pub total_diff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub model: String,
    pub count: usize,
    pub total_diff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GloveReport {
    pub regime: Regime,
    pub environment: String,
    pub tiers: Vec<usize>,
    /// Model display names in report order.
    pub model_order: Vec<String>,
    pub sources: Vec<GloveSource>,
}

impl GloveReport {
    pub fn total(&self) -> usize {
        self.sources.iter().map(|s| s.regressions.len()).sum()
    }

    /// Every regression with its source name, largest difference first.
    pub fn ranked(&self) -> Vec<(&str, &GloveRegression)> {
        let mut all: Vec<(&str, &GloveRegression)> = self
            .sources
            .iter()
            .flat_map(|s| s.regressions.iter().map(move |r| (s.name.as_str(), r)))
            .collect();
        all.sort_by(|a, b| b.1.diff.total_cmp(&a.1.diff));
        all
    }

    pub fn worst(&self) -> Option<(&str, &GloveRegression)> {
        self.ranked().into_iter().next()
    }

    pub fn method_stats(&self) -> Vec<MethodStats> {
        RowLabel::GLOVE_PAIRS
            .iter()
            .map(|&(method, _)| {
                let mut stats = MethodStats {
                    method,
                    per_tier: vec![0; self.tiers.len()],
                    total_diff: 0.0,
                };
                for r in self.regressions().filter(|r| r.method == method) {
                    if let Some(slot) = self.tiers.iter().position(|&t| t == r.tier) {
                        stats.per_tier[slot] += 1;
                    }
                    stats.total_diff += r.diff;
                }
                stats
            })
            .collect()
    }

    /// Models with at least one regression, in report order.
    pub fn model_stats(&self) -> Vec<ModelStats> {
        self.model_order
            .iter()
            .filter_map(|model| {
                let (count, total_diff) = self
                    .regressions()
                    .filter(|r| &r.model == model)
                    .fold((0, 0.0), |(n, d), r| (n + 1, d + r.diff));
                (count > 0).then(|| ModelStats {
                    model: model.clone(),
                    count,
                    total_diff,
                })
            })
            .collect()
    }

    /// Regression count per compared tier.
    pub fn tier_counts(&self) -> Vec<(usize, usize)> {
        self.tiers
            .iter()
            .map(|&tier| (tier, self.regressions().filter(|r| r.tier == tier).count()))
            .collect()
    }

    fn regressions(&self) -> impl Iterator<Item = &GloveRegression> {
        self.sources.iter().flat_map(|s| s.regressions.iter())
    }
}
