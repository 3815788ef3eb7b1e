//! memsweep core library
//!
//! Scans experiment output trees, turns per-run score CSVs into per-model
//! tier tables, and renders CSV/Markdown reports from them.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod glove;
pub mod integrity;
pub mod obs;
pub mod output;
pub mod render;
pub mod resolver;
pub mod scan;
pub mod scores;
pub mod table;
pub mod telemetry;
pub mod versions;

pub use aggregate::{aggregate, mean_if_sufficient, ChunkPolicy, ITEMS_PER_ENV, MIN_SAMPLES};
pub use catalog::{
    short_env_name, Catalog, ColumnGroup, EnvironmentSpec, ModelAlias, ModelSpec, Regime,
    TierExpectations,
};
pub use config::{CatalogOverride, SweepConfig};
pub use descriptor::{
    parse_structured, DescriptorParser, DescriptorStrategy, MemoryStrategy, MethodDescriptor,
    ParseFailure, ParsedMethod, RowLabel,
};
pub use error::{Result, SweepError};
pub use glove::{compare_glove, GloveRegression, GloveReport, GloveSource, DEFAULT_TIERS};
pub use integrity::{
    ConsistencyIssue, EnvironmentCheck, IntegrityChecker, IntegrityReport, IntegritySummary,
    MethodCheck, ModelCheck,
};
pub use output::{write_atomic, ReportSink, TableArtifact};
pub use resolver::{
    resolve_env_folder, resolve_log_folder, resolve_method_folder, resolve_model_folder,
    Resolution, ResolveStrategy,
};
pub use scan::DirectoryScanner;
pub use scores::{ceiling, count_lines, extract_scores, ScoreTransform};
pub use table::{BuildSettings, ModelTable, ResultTable, TableBuilder, TableKey, TierMismatch};
pub use telemetry::init_tracing;
pub use versions::{VersionScanner, VersionSweep, VersionTable};

/// memsweep version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
