//! Env-bucket aggregation: splitting a score run into scenario tiers.
//!
//! The k-th run of `chunk_size` consecutive scores is scenario tier k
//! (env0, env1, ...). The aggregator knows nothing else about tiers.

use serde::{Deserialize, Serialize};

/// Scores per scenario tier in a complete run.
pub const ITEMS_PER_ENV: usize = 20;

/// Fewest scores a tier needs before its mean is reported.
pub const MIN_SAMPLES: usize = 20;

/// Chunking parameters for [`aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPolicy {
    pub chunk_size: usize,
    pub min_samples: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            chunk_size: ITEMS_PER_ENV,
            min_samples: MIN_SAMPLES,
        }
    }
}

impl ChunkPolicy {
    pub fn aggregate(&self, scores: &[f64]) -> Vec<Option<f64>> {
        aggregate(scores, self.chunk_size, self.min_samples)
    }
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mean of `values` if there are at least `min_samples` of them.
pub fn mean_if_sufficient(values: &[f64], min_samples: usize) -> Option<f64> {
    if values.len() >= min_samples {
        mean(values)
    } else {
        None
    }
}

/// Per-tier means of `scores`.
///
/// Returns one entry per chunk of `chunk_size` (the last chunk may be
/// shorter), `None` where the chunk holds fewer than `min_samples` values.
/// Empty input gives empty output. A zero `chunk_size` has no tiers and also
/// gives empty output.
pub fn aggregate(scores: &[f64], chunk_size: usize, min_samples: usize) -> Vec<Option<f64>> {
    if chunk_size == 0 {
        return Vec::new();
    }
    scores
        .chunks(chunk_size)
        .map(|chunk| mean_if_sufficient(chunk, min_samples))
        .collect()
}
