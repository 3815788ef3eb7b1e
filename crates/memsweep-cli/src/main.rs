//! memsweep - experiment sweep analysis CLI
//!
//! The `memsweep` command turns a tree of experiment output folders into
//! per-model score tables and consistency reports.
//!
//! ## Commands
//!
//! - `tables`: per-model tier tables for every catalog model
//! - `check`: integrity report (missing runs, short CSVs, misnamed folders)
//! - `scan`: table for one model from a flat, free-form run tree
//! - `versions`: whole-run averages per version plus a summary table
//! - `glove`: where glove rows score below their plain counterparts

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};

use memsweep_core::output::{
    glove_report_file_name, integrity_report_file_name, scan_table_file_name, table_file_name,
    table_json_file_name, timestamp, version_summary_file_name, version_table_file_name,
};
use memsweep_core::render::{
    render_combined_csv, render_glove_markdown, render_integrity_markdown, render_split_csv,
    render_version_csv, render_version_summary_csv,
};
use memsweep_core::{
    compare_glove, Catalog, DirectoryScanner, GloveReport, GloveSource, IntegrityChecker, Regime,
    ReportSink, ScoreTransform, SweepConfig, TableArtifact, TableBuilder, VersionScanner,
    DEFAULT_TIERS,
};

const GENERATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Parser)]
#[command(name = "memsweep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Score tables and integrity reports for experiment sweeps", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root of the experiment tree (overrides config and MEMSWEEP_BASE_DIR)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Directory for reports (overrides config and MEMSWEEP_OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build per-model tier tables for every catalog model
    Tables {
        /// Collapse scores to success indicators before averaging
        #[arg(long)]
        ceiling: bool,

        /// Write separate explicit and implicit tables
        #[arg(long)]
        split: bool,

        /// Also write a tables_<model>.json artifact per model
        #[arg(long)]
        json_artifact: bool,
    },

    /// Check which runs exist and whether their CSVs are complete
    Check,

    /// Build one model's table from a flat run tree
    Scan {
        /// Model name as it appears in run folder names
        #[arg(short, long)]
        model: String,

        /// Collapse scores to success indicators before averaging
        #[arg(long)]
        ceiling: bool,
    },

    /// Build per-version tables from a version-bucketed tree
    Versions {
        /// Directory holding one folder per version (default: base dir)
        #[arg(long)]
        versions_dir: Option<PathBuf>,

        /// Versions to include, comma separated (default: every folder)
        #[arg(long, value_delimiter = ',')]
        versions: Vec<String>,

        /// Environment short name used in log folder names
        #[arg(long, default_value = "frozenlake")]
        environment: String,

        /// Table title
        #[arg(long, default_value = "FrozenLake Explicit")]
        title: String,
    },

    /// Report cells where a glove row scores below its plain row
    Glove {
        /// Environment short name to compare
        #[arg(short, long, default_value = "frozenlake")]
        environment: String,

        /// Regime to compare
        #[arg(long, default_value = "explicit")]
        regime: Regime,

        /// Collapse scores to success indicators before averaging
        #[arg(long)]
        ceiling: bool,

        /// Experiment trees to compare, one report section each
        /// (default: base dir)
        #[arg(long = "source")]
        sources: Vec<PathBuf>,
    },
}

/// Resolved configuration for one invocation.
struct Session {
    config: SweepConfig,
    catalog: Catalog,
    base_dir: PathBuf,
    sink: ReportSink,
}

impl Session {
    fn new(cli: &Cli) -> Result<Self> {
        let mut config = SweepConfig::load(cli.config.as_deref())
            .with_context(|| format!("Failed to load config {:?}", cli.config))?
            .with_env_overrides();
        if let Some(dir) = &cli.base_dir {
            config.base_dir = Some(dir.clone());
        }
        if let Some(dir) = &cli.output_dir {
            config.output_dir = Some(dir.clone());
        }
        Self::from_config(config)
    }

    fn from_config(config: SweepConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let catalog = config.catalog().context("Invalid catalog")?;
        let base_dir = config.base_dir();
        let sink = ReportSink::new(config.output_dir());
        Ok(Self {
            config,
            catalog,
            base_dir,
            sink,
        })
    }
}

fn transform_for(ceiling: bool) -> ScoreTransform {
    if ceiling {
        ScoreTransform::Ceiling
    } else {
        ScoreTransform::Identity
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    memsweep_core::init_tracing(cli.json, level);

    let session = Session::new(&cli)?;
    info!(base_dir = %session.base_dir.display(), output_dir = %session.sink.root().display(), "memsweep starting");

    let written = match cli.command {
        Commands::Tables {
            ceiling,
            split,
            json_artifact,
        } => cmd_tables(&session, transform_for(ceiling), split, json_artifact)?,
        Commands::Check => cmd_check(&session)?,
        Commands::Scan { model, ceiling } => cmd_scan(&session, &model, transform_for(ceiling))?,
        Commands::Versions {
            versions_dir,
            versions,
            environment,
            title,
        } => cmd_versions(
            &session,
            versions_dir.as_deref(),
            &versions,
            &environment,
            &title,
        )?,
        Commands::Glove {
            environment,
            regime,
            ceiling,
            sources,
        } => cmd_glove(&session, &environment, regime, transform_for(ceiling), &sources)?,
    };

    if written.is_empty() {
        println!("No reports written.");
    }
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

/// Per-model tables for every catalog model found under the base dir.
fn cmd_tables(
    session: &Session,
    transform: ScoreTransform,
    split: bool,
    json_artifact: bool,
) -> Result<Vec<PathBuf>> {
    let builder = TableBuilder::new(&session.catalog, session.config.build_settings(transform));
    let tables = builder.build(&session.base_dir);
    let generated_at = Utc::now();

    let mut written = Vec::new();
    for model in &tables {
        if !model.tier_mismatches.is_empty() {
            warn!(
                model = %model.folder_key,
                count = model.tier_mismatches.len(),
                "cells with unexpected tier counts"
            );
        }

        if split {
            for regime in Regime::ALL {
                let csv = render_split_csv(model, &session.catalog, regime)
                    .context("Failed to render table")?;
                let name = table_file_name(&model.folder_key, transform, Some(regime));
                written.push(
                    session
                        .sink
                        .write("table", &name, &csv)
                        .with_context(|| format!("Failed to write {name}"))?,
                );
            }
        } else {
            let csv = render_combined_csv(model, &session.catalog).context("Failed to render table")?;
            let name = table_file_name(&model.folder_key, transform, None);
            written.push(
                session
                    .sink
                    .write("table", &name, &csv)
                    .with_context(|| format!("Failed to write {name}"))?,
            );
        }

        if json_artifact {
            let artifact = TableArtifact::from_model(model, transform, generated_at);
            let name = table_json_file_name(&model.folder_key);
            written.push(
                session
                    .sink
                    .write_json("table_json", &name, &artifact)
                    .with_context(|| format!("Failed to write {name}"))?,
            );
        }
    }
    Ok(written)
}

/// Integrity report for the base dir.
fn cmd_check(session: &Session) -> Result<Vec<PathBuf>> {
    let checker = IntegrityChecker::new(
        &session.catalog,
        session.config.build_settings(ScoreTransform::Identity),
    );
    let report = checker.check(&session.base_dir);
    let now = Local::now();
    let md = render_integrity_markdown(&report, &now.format(GENERATED_AT_FORMAT).to_string());

    let summary = report.summary();
    info!(
        models = summary.models_present,
        methods = summary.methods_present,
        csv_ok = summary.csv_ok,
        consistency_issues = summary.consistency_issues,
        "integrity check finished"
    );

    let name = integrity_report_file_name(&timestamp(now));
    let path = session
        .sink
        .write("integrity", &name, &md)
        .with_context(|| format!("Failed to write {name}"))?;
    Ok(vec![path])
}

/// Table for one model from a flat run tree.
fn cmd_scan(session: &Session, model: &str, transform: ScoreTransform) -> Result<Vec<PathBuf>> {
    let scanner = DirectoryScanner::new(&session.catalog, session.config.build_settings(transform));
    let table = scanner
        .scan(&session.base_dir, model)
        .with_context(|| format!("Failed to scan {:?}", session.base_dir))?;
    if table.table.is_empty() {
        warn!(model = %model, "no runs found for model");
        return Ok(Vec::new());
    }

    let csv = render_combined_csv(&table, &session.catalog).context("Failed to render table")?;
    let name = scan_table_file_name(model);
    let path = session
        .sink
        .write("scan_table", &name, &csv)
        .with_context(|| format!("Failed to write {name}"))?;
    Ok(vec![path])
}

/// Per-version tables and the cross-version summary.
fn cmd_versions(
    session: &Session,
    versions_dir: Option<&Path>,
    versions: &[String],
    environment: &str,
    title: &str,
) -> Result<Vec<PathBuf>> {
    let root = versions_dir.unwrap_or(session.base_dir.as_path());
    let versions = if versions.is_empty() {
        VersionScanner::discover_versions(root)
    } else {
        versions.to_vec()
    };
    if versions.is_empty() {
        warn!(root = %root.display(), "no version folders found");
        return Ok(Vec::new());
    }

    let scanner = VersionScanner::new(
        &session.catalog,
        session.config.build_settings(ScoreTransform::Identity),
    )
    .with_environment(environment, title);
    let sweep = scanner.scan(root, &versions);

    let mut written = Vec::new();
    for table in &sweep.versions {
        let Some(csv) = render_version_csv(table, &sweep.title).context("Failed to render table")?
        else {
            info!(version = %table.version, "no data, skipping version table");
            continue;
        };
        let name = version_table_file_name(&sweep.title, &table.version);
        written.push(
            session
                .sink
                .write("version_table", &name, &csv)
                .with_context(|| format!("Failed to write {name}"))?,
        );
    }

    let csv = render_version_summary_csv(&sweep).context("Failed to render summary")?;
    let name = version_summary_file_name(&sweep.title);
    written.push(
        session
            .sink
            .write("version_summary", &name, &csv)
            .with_context(|| format!("Failed to write {name}"))?,
    );
    Ok(written)
}

/// Glove comparison across one or more experiment trees.
fn cmd_glove(
    session: &Session,
    environment: &str,
    regime: Regime,
    transform: ScoreTransform,
    sources: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    let sources: Vec<PathBuf> = if sources.is_empty() {
        vec![session.base_dir.clone()]
    } else {
        sources.to_vec()
    };

    let builder = TableBuilder::new(&session.catalog, session.config.build_settings(transform));
    let sections = sources
        .iter()
        .map(|dir| {
            let tables = builder.build(dir);
            GloveSource {
                name: source_name(dir),
                regressions: compare_glove(&tables, regime, environment, &DEFAULT_TIERS),
            }
        })
        .collect();

    let report = GloveReport {
        regime,
        environment: environment.to_string(),
        tiers: DEFAULT_TIERS.to_vec(),
        model_order: session
            .catalog
            .models
            .iter()
            .map(|m| m.display_name.clone())
            .collect(),
        sources: sections,
    };
    info!(regressions = report.total(), "glove comparison finished");

    let now = Local::now();
    let md = render_glove_markdown(&report, &now.format(GENERATED_AT_FORMAT).to_string());
    let name = glove_report_file_name(&timestamp(now));
    let path = session
        .sink
        .write("glove", &name, &md)
        .with_context(|| format!("Failed to write {name}"))?;
    Ok(vec![path])
}

fn source_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
