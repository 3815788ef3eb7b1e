//! Markdown reports for integrity checks and glove comparisons.

use std::collections::BTreeSet;

use crate::glove::GloveReport;
use crate::integrity::{IntegrityReport, ModelCheck};

fn model_overview_row(model: &ModelCheck, expected_envs: usize, expected_methods: usize) -> String {
    if !model.exists {
        return format!(
            "| {} | 0/{} | missing folder | - |\n",
            model.folder_key, expected_envs
        );
    }
    let problems = model.completeness_problems(expected_methods);
    let status = if problems.is_empty() {
        "complete".to_string()
    } else {
        format!("incomplete: {}", problems.join(", "))
    };
    let issues = model.consistency_issue_count();
    let consistency = if issues == 0 {
        "consistent".to_string()
    } else {
        format!("{issues} issue(s)")
    };
    format!(
        "| {} | {}/{} | {} | {} |\n",
        model.folder_key,
        model.env_count(),
        expected_envs,
        status,
        consistency
    )
}

/// Render an integrity report. `generated_at` is shown verbatim.
pub fn render_integrity_markdown(report: &IntegrityReport, generated_at: &str) -> String {
    let expected_envs = report.expected_environments;
    let expected_methods = report.expected_methods;

    let mut md = String::new();
    md.push_str("# Sweep Integrity Report\n\n");
    md.push_str(&format!("**Generated**: {generated_at}\n\n"));
    md.push_str(&format!("**Base directory**: `{}`\n\n", report.base_dir.display()));

    md.push_str("## Overview\n\n");
    md.push_str("| Model | Environments | Completeness | Consistency |\n");
    md.push_str("|-------|--------------|--------------|-------------|\n");
    for model in &report.models {
        md.push_str(&model_overview_row(model, expected_envs, expected_methods));
    }

    md.push_str("\n## Naming Consistency\n");
    let mut any_issue = false;
    for model in report.models.iter().filter(|m| m.exists) {
        let mut section = String::new();
        for env in model.environments.iter().filter(|e| e.exists()) {
            let flagged: Vec<_> = env
                .methods
                .iter()
                .filter(|m| m.exists() && !m.issues.is_empty())
                .collect();
            if env.issues.is_empty() && flagged.is_empty() {
                continue;
            }
            section.push_str(&format!("\n#### {}\n", env.identifier));
            if !env.issues.is_empty() {
                section.push_str(&format!(
                    "- environment folder `{}`:\n",
                    env.folder_name.as_deref().unwrap_or_default()
                ));
                for issue in &env.issues {
                    section.push_str(&format!("  - {issue}\n"));
                }
            }
            for method in flagged {
                section.push_str(&format!(
                    "- method `{}` (`{}`):\n",
                    method.method,
                    method.folder_name.as_deref().unwrap_or_default()
                ));
                for issue in &method.issues {
                    section.push_str(&format!("  - {issue}\n"));
                }
            }
        }
        if !section.is_empty() {
            any_issue = true;
            md.push_str(&format!("\n### {}\n", model.folder_key));
            md.push_str(&section);
        }
    }
    if !any_issue {
        md.push_str("\nAll folder names are consistent.\n");
    }

    md.push_str("\n## Details\n");
    for model in &report.models {
        md.push_str(&format!("\n### {}\n", model.folder_key));
        if !model.exists {
            md.push_str("\nModel folder missing.\n");
            continue;
        }
        for env in &model.environments {
            let Some(folder) = env.folder_name.as_deref() else {
                md.push_str(&format!("\n#### {} (missing)\n", env.identifier));
                md.push_str("- environment folder not found\n");
                continue;
            };
            let count = env.method_count();
            let csv_problems = env.csv_problems();
            if count == expected_methods && csv_problems.is_empty() {
                md.push_str(&format!("\n#### {} (ok)\n", env.identifier));
                md.push_str(&format!("- folder: `{folder}`\n"));
                md.push_str(&format!("- methods: {count}/{expected_methods}\n"));
                md.push_str("- CSV line counts: all correct\n");
                continue;
            }

            md.push_str(&format!("\n#### {} (incomplete)\n", env.identifier));
            md.push_str(&format!("- folder: `{folder}`\n"));
            if count < expected_methods {
                md.push_str(&format!("- methods: {count}/{expected_methods}\n"));
            }
            if !csv_problems.is_empty() {
                md.push_str("- CSV line counts:\n");
                for method in csv_problems {
                    match method.csv_lines {
                        None => md.push_str(&format!("  - {}: CSV missing\n", method.method)),
                        Some(lines) => md.push_str(&format!(
                            "  - {}: {}/{} lines\n",
                            method.method, lines, method.expected_lines
                        )),
                    }
                }
            }
            let missing = env.missing_methods();
            if !missing.is_empty() {
                md.push_str(&format!("- missing methods: {}\n", missing.join(", ")));
            }
        }
    }

    let s = report.summary();
    md.push_str("\n## Summary\n\n");
    md.push_str(&format!("- **Models**: {}/{}\n", s.models_present, s.models_total));
    md.push_str(&format!(
        "- **Environments**: {}/{}\n",
        s.environments_present, s.environments_total
    ));
    md.push_str(&format!("- **Methods**: {}/{}\n", s.methods_present, s.methods_total));
    match s.csv_ok_percent() {
        Some(pct) => md.push_str(&format!(
            "- **CSV line counts correct**: {}/{} ({pct:.1}%)\n",
            s.csv_ok, s.csv_checked
        )),
        None => md.push_str("- **CSV line counts correct**: N/A\n"),
    }
    md.push_str(&format!("- **Consistency issues**: {}\n", s.consistency_issues));
    md
}

/// Render a glove comparison report. `generated_at` is shown verbatim.
pub fn render_glove_markdown(report: &GloveReport, generated_at: &str) -> String {
    let tier_list = report
        .tiers
        .iter()
        .map(|t| format!("env{t}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut md = format!(
        "# {} {}: Glove Comparison\n\n",
        report.environment, report.regime
    );
    md.push_str(&format!("**Generated**: {generated_at}\n\n"));
    md.push_str(&format!(
        "**Scope**: cells on {tier_list} where the glove row scores strictly lower than its plain row\n\n"
    ));

    md.push_str("## Overview\n\n");
    md.push_str("| Source | Regressions | Models | Methods |\n");
    md.push_str("|--------|-------------|--------|---------|\n");
    for source in &report.sources {
        if source.regressions.is_empty() {
            md.push_str(&format!("| {} | 0 | - | - |\n", source.name));
            continue;
        }
        let models: BTreeSet<&str> = source.regressions.iter().map(|r| r.model.as_str()).collect();
        let methods: BTreeSet<&str> = source.regressions.iter().map(|r| r.method.as_str()).collect();
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            source.name,
            source.regressions.len(),
            models.into_iter().collect::<Vec<_>>().join(", "),
            methods.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }

    md.push_str("\n## Regressions by Size\n");
    let ranked = report.ranked();
    if ranked.is_empty() {
        md.push_str("\nNo glove regressions found.\n");
    } else {
        md.push_str("\n| Source | Model | Method | Tier | Plain | Glove | Diff |\n");
        md.push_str("|--------|-------|--------|------|-------|-------|------|\n");
        for (source, r) in &ranked {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {:.4} | {:.4} | **-{:.4}** |\n",
                source,
                r.model,
                r.method,
                r.tier_label(),
                r.base_score,
                r.glove_score,
                r.diff
            ));
        }
    }

    md.push_str("\n## By Source\n");
    for source in &report.sources {
        md.push_str(&format!("\n### {}\n", source.name));
        if source.regressions.is_empty() {
            md.push_str("\nNo regressions.\n");
            continue;
        }
        for model in &report.model_order {
            let rows: Vec<_> = source.regressions.iter().filter(|r| &r.model == model).collect();
            if rows.is_empty() {
                continue;
            }
            md.push_str(&format!("\n#### {model}\n"));
            for r in rows {
                md.push_str(&format!(
                    "- **{}** @ {}: plain={:.4}, glove={:.4} (diff: **-{:.4}**)\n",
                    r.method,
                    r.tier_label(),
                    r.base_score,
                    r.glove_score,
                    r.diff
                ));
            }
        }
    }

    md.push_str("\n## By Method\n\n");
    let tier_headers: Vec<String> = report.tiers.iter().map(|t| format!("env{t}")).collect();
    md.push_str(&format!("| Method | {} | Total Diff |\n", tier_headers.join(" | ")));
    md.push_str(&format!(
        "|--------|{}------------|\n",
        "------|".repeat(tier_headers.len())
    ));
    for stats in report.method_stats() {
        let counts: Vec<String> = stats.per_tier.iter().map(|c| c.to_string()).collect();
        md.push_str(&format!(
            "| {} | {} | {:.4} |\n",
            stats.method,
            counts.join(" | "),
            stats.total_diff
        ));
    }

    let model_stats = report.model_stats();
    md.push_str("\n## By Model\n");
    if model_stats.is_empty() {
        md.push_str("\nNo regressions.\n");
    } else {
        md.push_str("\n| Model | Regressions | Total Diff |\n");
        md.push_str("|-------|-------------|------------|\n");
        for stats in model_stats {
            md.push_str(&format!(
                "| {} | {} | {:.4} |\n",
                stats.model, stats.count, stats.total_diff
            ));
        }
    }

    md.push_str("\n## By Tier\n\n");
    for (tier, count) in report.tier_counts() {
        md.push_str(&format!("- **env{tier}**: {count}\n"));
    }
    md.push_str(&format!("- **total**: {}\n", report.total()));

    md.push_str("\n## Conclusion\n\n");
    match report.worst() {
        None => md.push_str(&format!(
            "Glove rows never score below their plain rows on {tier_list}.\n"
        )),
        Some((source, worst)) => {
            md.push_str(&format!(
                "{} glove regression(s) found. The largest is in **{}**: **{}** `{}` on {}, glove lower by **{:.4}**.\n",
                report.total(),
                source,
                worst.model,
                worst.method,
                worst.tier_label(),
                worst.diff
            ));
        }
    }
    md
}
