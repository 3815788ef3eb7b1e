use memsweep_core::render::tables::version_summary_rows;
use memsweep_core::render::render_glove_markdown;
use memsweep_core::{
    compare_glove, BuildSettings, Catalog, GloveReport, GloveSource, Regime, RowLabel,
    TableBuilder, VersionScanner, DEFAULT_TIERS,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_scores(run_dir: &Path, scores: &[f64]) {
    let log = run_dir.join("log");
    fs::create_dir_all(&log).unwrap();
    let mut body = String::from("episode,score\n");
    for (i, s) in scores.iter().enumerate() {
        body.push_str(&format!("{i},{s}\n"));
    }
    fs::write(log.join("explorer_summary.csv"), body).unwrap();
}

/// Three 20-item tiers with the given per-tier score.
fn tiers(values: [f64; 3]) -> Vec<f64> {
    values.iter().flat_map(|&v| vec![v; 20]).collect()
}

// ── Version sweeps ───────────────────────────────────────────────────────

#[test]
fn versions_are_discovered_and_summarized() {
    let root = tempdir().unwrap();
    write_scores(
        &root
            .path()
            .join("v1")
            .join("GPT-4o-frozenlake")
            .join("log_frozenlake_gpt4o_memorybank_True_False"),
        &[0.5; 30],
    );
    write_scores(
        &root
            .path()
            .join("v2")
            .join("gpt4o_frozenlake")
            .join("log_frozenlake_gpt4o_memorybank_True_False"),
        &[1.0; 20],
    );
    // Too few samples to average.
    write_scores(
        &root
            .path()
            .join("v2")
            .join("gpt4o_frozenlake")
            .join("log_frozenlake_gpt4o_vanilla_True_False"),
        &[1.0; 19],
    );

    let versions = VersionScanner::discover_versions(root.path());
    assert_eq!(versions, vec!["v1", "v2"]);

    let catalog = Catalog::standard();
    let sweep = VersionScanner::new(&catalog, BuildSettings::default()).scan(root.path(), &versions);
    assert_eq!(sweep.title, "FrozenLake Explicit");
    assert_eq!(sweep.versions[0].score("GPT-4o", RowLabel::MemoryBank), Some(0.5));
    assert_eq!(sweep.versions[1].score("GPT-4o", RowLabel::MemoryBank), Some(1.0));
    assert_eq!(sweep.versions[1].score("GPT-4o", RowLabel::Vanilla), None);

    // One block of model columns per version, in catalog order.
    let rows = version_summary_rows(&sweep);
    let n = sweep.model_order.len();
    let gpt = sweep.model_order.iter().position(|m| m == "GPT-4o").unwrap();
    assert_eq!(rows[0][1], "v1");
    assert_eq!(rows[0][1 + n], "v2");
    assert_eq!(rows[1][1 + gpt], "GPT-4o");
    let memorybank = rows.iter().find(|r| r[0] == "memorybank").unwrap();
    assert_eq!(memorybank[1 + gpt], "0.5000");
    assert_eq!(memorybank[1 + n + gpt], "1.0000");
    let vanilla = rows.iter().find(|r| r[0] == "vanilla").unwrap();
    assert_eq!(vanilla[1 + n + gpt], "");
}

// ── Glove comparison over built tables ───────────────────────────────────

#[test]
fn glove_regressions_only_where_strictly_lower() {
    let base = tempdir().unwrap();
    let env = base.path().join("gpt4o").join("gpt4o-frozenlake-explicit");
    write_scores(
        &env.join("log_frozenlake_gpt4o_vanilla_True_False"),
        &tiers([1.0, 0.8, 0.6]),
    );
    // Lower on env1, equal on env2, lower on env0 which is not compared.
    write_scores(
        &env.join("log_frozenlake_gpt4o_vanilla_True_True"),
        &tiers([0.0, 0.5, 0.6]),
    );
    write_scores(
        &env.join("log_frozenlake_gpt4o_memorybank_True_False"),
        &tiers([0.2, 0.2, 0.2]),
    );
    // Glove scores higher: not a regression.
    write_scores(
        &env.join("log_frozenlake_gpt4o_memorybank_True_True"),
        &tiers([0.9, 0.9, 0.9]),
    );

    let mut catalog = Catalog::standard();
    catalog.models.retain(|m| m.folder_key == "gpt4o");
    let tables = TableBuilder::new(&catalog, BuildSettings::default()).build(base.path());
    let regressions = compare_glove(&tables, Regime::Explicit, "frozenlake", &DEFAULT_TIERS);

    assert_eq!(regressions.len(), 1);
    let r = &regressions[0];
    assert_eq!(r.model, "GPT-4o");
    assert_eq!(r.method, RowLabel::Vanilla);
    assert_eq!(r.tier, 1);
    assert!((r.diff - 0.3).abs() < 1e-9);

    let report = GloveReport {
        regime: Regime::Explicit,
        environment: "frozenlake".to_string(),
        tiers: DEFAULT_TIERS.to_vec(),
        model_order: tables.iter().map(|t| t.display_name.clone()).collect(),
        sources: vec![GloveSource {
            name: "sweep".to_string(),
            regressions,
        }],
    };
    assert_eq!(report.total(), 1);
    let md = render_glove_markdown(&report, "now");
    assert!(md.contains("| sweep | GPT-4o | vanilla | env1 | 0.8000 | 0.5000 | **-0.3000** |"));
    assert!(md.contains("- **env1**: 1"));
}

#[test]
fn glove_skips_pairs_with_absent_side() {
    let base = tempdir().unwrap();
    write_scores(
        &base
            .path()
            .join("gpt4o")
            .join("gpt4o-frozenlake-explicit")
            .join("log_frozenlake_gpt4o_voyager_True_False"),
        &tiers([0.0, 0.0, 0.0]),
    );

    let mut catalog = Catalog::standard();
    catalog.models.retain(|m| m.folder_key == "gpt4o");
    let tables = TableBuilder::new(&catalog, BuildSettings::default()).build(base.path());
    assert!(compare_glove(&tables, Regime::Explicit, "frozenlake", &DEFAULT_TIERS).is_empty());
}
