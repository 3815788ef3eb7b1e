use memsweep_core::{BuildSettings, Catalog, DirectoryScanner, Regime, RowLabel};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_scores(run_dir: &Path, scores: &[f64]) {
    let log = run_dir.join("log");
    fs::create_dir_all(&log).unwrap();
    let mut body = String::from("idx,score\n");
    for (i, s) in scores.iter().enumerate() {
        body.push_str(&format!("{i},{s}\n"));
    }
    fs::write(log.join("explorer_summary.csv"), body).unwrap();
}

fn scanner(catalog: &Catalog) -> DirectoryScanner<'_> {
    DirectoryScanner::new(catalog, BuildSettings::default())
}

#[test]
fn scans_flat_tree_for_model_alias() {
    let base = tempdir().unwrap();
    write_scores(
        &base
            .path()
            .join("GPT40_frozen_lake_explicit")
            .join("log_frozenlake_gpt4o_memorybank_True_False"),
        &[1.0; 60],
    );
    write_scores(
        &base
            .path()
            .join("gpt-4o-webshop")
            .join("log_hidden_webshop_gpt-4o_vanilla_True_True"),
        &[0.5; 40],
    );

    let catalog = Catalog::standard();
    let table = scanner(&catalog).scan(base.path(), "gpt-4o").unwrap();

    assert_eq!(table.display_name, "GPT-4o");
    assert_eq!(
        table.table.tiers(Regime::Explicit, RowLabel::MemoryBank, "frozenlake"),
        Some(&[Some(1.0), Some(1.0), Some(1.0)][..])
    );
    // Regime from the hidden log folder prefix.
    assert_eq!(
        table.table.tiers(Regime::Implicit, RowLabel::VanillaGlove, "webshop"),
        Some(&[Some(0.5), Some(0.5)][..])
    );
    assert!(table.tier_mismatches.is_empty());
}

#[test]
fn archived_and_foreign_runs_are_ignored() {
    let base = tempdir().unwrap();
    write_scores(
        &base
            .path()
            .join("old_gpt4o_webshop_explicit")
            .join("log_webshop_gpt4o_vanilla_True_False"),
        &[1.0; 60],
    );
    write_scores(
        &base
            .path()
            .join("llama31_70b_webshop_explicit")
            .join("log_webshop_llama31-70b_vanilla_True_False"),
        &[1.0; 60],
    );

    let catalog = Catalog::standard();
    assert!(scanner(&catalog)
        .scan(base.path(), "gpt-4o")
        .unwrap()
        .table
        .is_empty());
    assert!(scanner(&catalog)
        .scan(base.path(), "llama3.1-8b")
        .unwrap()
        .table
        .is_empty());
}

#[test]
fn defaults_apply_to_short_folder_names() {
    let base = tempdir().unwrap();
    write_scores(
        &base
            .path()
            .join("gpt4o_mountaincar")
            .join("log_mountaincar_gpt4o_memorybank_True"),
        &[0.0; 20],
    );

    let catalog = Catalog::standard();
    let table = scanner(&catalog).scan(base.path(), "gpt-4o").unwrap();
    // Glove defaults to False, so this is the plain memorybank row.
    assert_eq!(
        table.table.cell(Regime::Explicit, RowLabel::MemoryBank, "mountaincar", 0),
        Some(0.0)
    );
    assert_eq!(table.tier_mismatches.len(), 1);
}

#[test]
fn mountaincar_runs_are_always_explicit() {
    let base = tempdir().unwrap();
    write_scores(
        &base
            .path()
            .join("gpt4o-mountaincar")
            .join("log_hidden_mountaincar_gpt4o_voyager_True_False"),
        &[1.0; 60],
    );

    let catalog = Catalog::standard();
    let table = scanner(&catalog).scan(base.path(), "gpt-4o").unwrap();
    assert_eq!(
        table.table.cell(Regime::Explicit, RowLabel::Voyager, "mountaincar", 2),
        Some(1.0)
    );
    assert!(table
        .table
        .tiers(Regime::Implicit, RowLabel::Voyager, "mountaincar")
        .is_none());
}

#[test]
fn undecodable_log_folders_are_skipped() {
    let base = tempdir().unwrap();
    let run = base.path().join("grok-3_webshop_explicit");
    write_scores(&run.join("log_webshop_grok-3_reflexion_True"), &[1.0; 60]);
    write_scores(&run.join("log_webshop_grok-3_voyager_True_False"), &[1.0; 60]);

    let catalog = Catalog::standard();
    let table = scanner(&catalog).scan(base.path(), "grok-3").unwrap();
    assert_eq!(table.display_name, "Grok-3");
    assert_eq!(table.table.len(), 1);
    assert_eq!(
        table.table.cell(Regime::Explicit, RowLabel::Voyager, "webshop", 2),
        Some(1.0)
    );
}

#[test]
fn unreadable_base_dir_is_an_error() {
    let base = tempdir().unwrap();
    let missing = base.path().join("absent");
    let catalog = Catalog::standard();
    assert!(scanner(&catalog).scan(&missing, "gpt-4o").is_err());
}
