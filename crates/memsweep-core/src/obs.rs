//! Structured diagnostic hooks for the scan pipeline.
//!
//! Every soft failure the pipeline tolerates (missing folders, unparseable
//! folder names, dropped descriptor combinations, tier-count mismatches) is
//! reported through one of these functions, so nothing is skipped silently.
//! Each call emits a single tracing event tagged with an `event` field.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::catalog::Regime;
use crate::descriptor::MethodDescriptor;

/// RAII guard that enters a model-scoped tracing span for the duration of a
/// scan.
pub struct ScanSpan {
    _span: tracing::span::EnteredSpan,
}

impl ScanSpan {
    /// Create and enter a span tagged with the model key.
    pub fn enter(model: &str) -> Self {
        let span = tracing::info_span!("memsweep.scan", model = %model);
        Self {
            _span: span.entered(),
        }
    }
}

/// A folder or file the pipeline looked for was absent. Expected in partial
/// sweeps, so this is debug-level.
pub fn emit_folder_missing(kind: &str, parent: &Path, wanted: &str) {
    debug!(
        event = "folder.missing",
        kind = %kind,
        parent = %parent.display(),
        wanted = %wanted,
    );
}

/// A folder name could not be decoded into a method descriptor.
pub fn emit_parse_failure(name: &str, reason: &dyn std::fmt::Display) {
    warn!(event = "descriptor.parse_failure", name = %name, reason = %reason);
}

/// A descriptor combination has no row in the report layout and was dropped.
pub fn emit_row_dropped(source: &str, descriptor: &MethodDescriptor) {
    warn!(
        event = "row.dropped",
        source = %source,
        memory_strategy = %descriptor.memory_strategy,
        uses_memory = descriptor.uses_memory,
        uses_embedding_augmentation = descriptor.uses_embedding_augmentation,
    );
}

/// An aggregated run produced a different number of tiers than its regime
/// declares.
pub fn emit_tier_mismatch(
    regime: Regime,
    row: &str,
    environment: &str,
    expected: usize,
    actual: usize,
) {
    warn!(
        event = "tiers.mismatch",
        regime = %regime,
        row = %row,
        environment = %environment,
        expected = expected,
        actual = actual,
    );
}

/// A result folder was aggregated into a table cell.
pub fn emit_cell_recorded(row: &str, environment: &str, samples: usize, tiers: usize) {
    debug!(
        event = "cell.recorded",
        row = %row,
        environment = %environment,
        samples = samples,
        tiers = tiers,
    );
}

/// A report file was written.
pub fn emit_report_written(kind: &str, path: &Path) {
    info!(event = "report.written", kind = %kind, path = %path.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_span_create() {
        let _span = ScanSpan::enter("gpt4o");
    }
}
