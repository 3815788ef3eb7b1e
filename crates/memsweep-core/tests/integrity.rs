use memsweep_core::render::render_integrity_markdown;
use memsweep_core::{BuildSettings, Catalog, ConsistencyIssue, IntegrityChecker};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Score CSV with one header and `rows` data lines.
fn write_csv(run_dir: &Path, rows: usize) {
    let log = run_dir.join("log");
    fs::create_dir_all(&log).unwrap();
    let mut body = String::from("episode,score\n");
    for i in 0..rows {
        body.push_str(&format!("{i},1\n"));
    }
    fs::write(log.join("explorer_summary.csv"), body).unwrap();
}

fn small_catalog() -> Catalog {
    let mut catalog = Catalog::standard();
    catalog.models.retain(|m| m.folder_key == "gpt4o");
    catalog.methods = vec!["vanilla_True_False".to_string()];
    catalog
}

#[test]
fn full_runs_have_expected_line_counts() {
    let base = tempdir().unwrap();
    let model = base.path().join("gpt4o");
    write_csv(
        &model
            .join("gpt4o-frozenlake-explicit")
            .join("log_frozenlake_gpt4o_vanilla_True_False"),
        60,
    );
    write_csv(
        &model
            .join("gpt4o-frozenlake-implicit")
            .join("log_hidden_frozenlake_gpt4o_vanilla_True_False"),
        40,
    );

    let catalog = small_catalog();
    let report = IntegrityChecker::new(&catalog, BuildSettings::default()).check(base.path());
    let gpt = &report.models[0];
    assert!(gpt.exists);
    assert_eq!(gpt.env_count(), 2);

    let explicit = gpt
        .environments
        .iter()
        .find(|e| e.identifier == "frozenlake-explicit")
        .unwrap();
    assert_eq!(explicit.methods[0].csv_lines, Some(61));
    assert_eq!(explicit.methods[0].expected_lines, 61);
    assert!(explicit.methods[0].csv_ok());

    let implicit = gpt
        .environments
        .iter()
        .find(|e| e.identifier == "frozenlake-implicit")
        .unwrap();
    assert_eq!(implicit.methods[0].csv_lines, Some(41));
    assert!(implicit.methods[0].csv_ok());

    let summary = report.summary();
    assert_eq!(summary.csv_ok, 2);
    assert_eq!(summary.csv_checked, 2);
    assert_eq!(summary.environments_present, 2);
    assert_eq!(summary.environments_total, 5);
    assert_eq!(summary.consistency_issues, 0);
}

#[test]
fn short_csv_and_missing_csv_are_flagged() {
    let base = tempdir().unwrap();
    let env = base.path().join("gpt4o").join("gpt4o-webshop-explicit");
    write_csv(&env.join("log_webshop_gpt4o_vanilla_True_False"), 59);

    let mut catalog = small_catalog();
    catalog.methods.push("voyager_True_False".to_string());
    fs::create_dir_all(env.join("log_webshop_gpt4o_voyager_True_False")).unwrap();

    let report = IntegrityChecker::new(&catalog, BuildSettings::default()).check(base.path());
    let webshop = report.models[0]
        .environments
        .iter()
        .find(|e| e.identifier == "webshop-explicit")
        .unwrap();
    let problems = webshop.csv_problems();
    assert_eq!(problems.len(), 2);
    assert_eq!(problems[0].csv_lines, Some(60));
    assert!(!problems[1].csv_exists);

    let md = render_integrity_markdown(&report, "2026-01-01 00:00:00");
    assert!(md.contains("  - vanilla_True_False: 60/61 lines"));
    assert!(md.contains("  - voyager_True_False: CSV missing"));
}

#[test]
fn misnamed_method_folder_is_reported() {
    let base = tempdir().unwrap();
    // Implicit environment, but the run folder lacks the hidden marker and
    // names another model.
    write_csv(
        &base
            .path()
            .join("gpt4o")
            .join("gpt4o-webshop-implicit")
            .join("log_webshop_grok-3_vanilla_True_False"),
        40,
    );

    let catalog = small_catalog();
    let report = IntegrityChecker::new(&catalog, BuildSettings::default()).check(base.path());
    let webshop = report.models[0]
        .environments
        .iter()
        .find(|e| e.identifier == "webshop-implicit")
        .unwrap();
    let issues = &webshop.methods[0].issues;
    assert!(issues
        .iter()
        .any(|i| matches!(i, ConsistencyIssue::ModelMismatch { .. })));
    assert!(issues.contains(&ConsistencyIssue::MissingHiddenMarker));
    assert_eq!(report.summary().consistency_issues, 2);
    assert!(!report.is_clean());

    let md = render_integrity_markdown(&report, "now");
    assert!(md.contains("### gpt4o"));
    assert!(md.contains("implicit environment but name lacks 'hidden'"));
}

#[test]
fn absent_model_folder_counts_as_missing() {
    let base = tempdir().unwrap();
    let catalog = small_catalog();
    let report = IntegrityChecker::new(&catalog, BuildSettings::default()).check(base.path());
    assert!(!report.models[0].exists);
    let summary = report.summary();
    assert_eq!(summary.models_present, 0);
    assert_eq!(summary.models_total, 1);
    assert_eq!(summary.csv_ok_percent(), None);
}
