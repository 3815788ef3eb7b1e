//! CSV layouts for result and version tables.

use std::io;

use csv::WriterBuilder;

use crate::catalog::{Catalog, ColumnGroup, Regime};
use crate::descriptor::RowLabel;
use crate::error::Result;
use crate::table::ModelTable;
use crate::versions::{VersionSweep, VersionTable};

use super::format_score;

type Row = Vec<String>;

fn blanks(n: usize) -> impl Iterator<Item = String> {
    std::iter::repeat(String::new()).take(n)
}

fn tier_headers(count: usize, width: usize) -> impl Iterator<Item = String> {
    (0..width).map(move |i| if i < count { format!("env{i}") } else { String::new() })
}

fn group_has(group: &ColumnGroup, regime: Regime) -> bool {
    match regime {
        Regime::Explicit => group.has_explicit,
        Regime::Implicit => group.has_implicit,
    }
}

/// `width` cells for one environment group: the regime's tiers, then blanks.
fn group_cells<'a>(
    model: &'a ModelTable,
    regime: Regime,
    row: RowLabel,
    group: &ColumnGroup,
    tiers: usize,
    width: usize,
) -> impl Iterator<Item = String> + 'a {
    let present = group_has(group, regime);
    let env = group.short_name.clone();
    (0..width).map(move |tier| {
        if present && tier < tiers {
            format_score(model.table.cell(regime, row, &env, tier))
        } else {
            String::new()
        }
    })
}

fn to_csv(rows: &[Row]) -> Result<String> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

/// Rows of the combined per-model table: three header rows, the explicit
/// block, an implicit tier header row and the implicit block.
pub fn combined_rows(model: &ModelTable, catalog: &Catalog) -> Vec<Row> {
    let groups = catalog.column_groups();
    let width = catalog.tiers.max();
    let total = 2 + groups.len() * width;
    let mut rows: Vec<Row> = Vec::new();

    rows.push(
        std::iter::once(model.display_name.clone())
            .chain(blanks(total - 1))
            .collect(),
    );
    rows.push(
        blanks(2)
            .chain(
                groups
                    .iter()
                    .flat_map(|g| std::iter::once(g.label.clone()).chain(blanks(width - 1))),
            )
            .collect(),
    );
    rows.push(
        blanks(2)
            .chain(groups.iter().flat_map(|_| tier_headers(width, width)))
            .collect(),
    );

    for regime in Regime::ALL {
        let tiers = catalog.tiers.for_regime(regime);
        if regime == Regime::Implicit {
            rows.push(
                blanks(2)
                    .chain(groups.iter().flat_map(|g| {
                        let shown = if g.has_implicit { tiers } else { 0 };
                        tier_headers(shown, width)
                    }))
                    .collect(),
            );
        }
        for (i, row) in RowLabel::ALL.into_iter().enumerate() {
            let lead = if i == 0 { regime.as_str().to_string() } else { String::new() };
            rows.push(
                [lead, row.as_str().to_string()]
                    .into_iter()
                    .chain(
                        groups
                            .iter()
                            .flat_map(|g| group_cells(model, regime, row, g, tiers, width)),
                    )
                    .collect(),
            );
        }
    }
    rows
}

/// Rows of a single-regime table: label column plus the regime's tiers for
/// every environment group that has that regime.
pub fn split_rows(model: &ModelTable, catalog: &Catalog, regime: Regime) -> Vec<Row> {
    let groups = catalog.column_groups_for(regime);
    let tiers = catalog.tiers.for_regime(regime);
    let total = 1 + groups.len() * tiers;
    let mut rows: Vec<Row> = Vec::new();

    rows.push(
        std::iter::once(model.display_name.clone())
            .chain(blanks(total - 1))
            .collect(),
    );
    rows.push(
        blanks(1)
            .chain(
                groups
                    .iter()
                    .flat_map(|g| std::iter::once(g.label.clone()).chain(blanks(tiers - 1))),
            )
            .collect(),
    );
    rows.push(
        blanks(1)
            .chain(groups.iter().flat_map(|_| tier_headers(tiers, tiers)))
            .collect(),
    );
    for row in RowLabel::ALL {
        rows.push(
            std::iter::once(row.as_str().to_string())
                .chain(
                    groups
                        .iter()
                        .flat_map(|g| group_cells(model, regime, row, g, tiers, tiers)),
                )
                .collect(),
        );
    }
    rows
}

pub fn render_combined_csv(model: &ModelTable, catalog: &Catalog) -> Result<String> {
    to_csv(&combined_rows(model, catalog))
}

pub fn render_split_csv(model: &ModelTable, catalog: &Catalog, regime: Regime) -> Result<String> {
    to_csv(&split_rows(model, catalog, regime))
}

/// Rows of one version's table, `None` when the version has no data.
pub fn version_rows(table: &VersionTable, title: &str) -> Option<Vec<Row>> {
    if table.is_empty() {
        return None;
    }
    let names: Vec<&str> = table.models.iter().map(|m| m.display_name.as_str()).collect();
    let mut rows: Vec<Row> = vec![
        std::iter::once(format!("{title} - {}", table.version))
            .chain(blanks(names.len()))
            .collect(),
        std::iter::once("Method".to_string())
            .chain(names.iter().map(|n| n.to_string()))
            .collect(),
    ];
    for row in RowLabel::ALL {
        rows.push(
            std::iter::once(row.as_str().to_string())
                .chain(names.iter().map(|n| format_score(table.score(n, row))))
                .collect(),
        );
    }
    Some(rows)
}

/// Rows of the cross-version summary: every catalog model under every
/// version.
pub fn version_summary_rows(sweep: &VersionSweep) -> Vec<Row> {
    let n = sweep.model_order.len();
    let mut header = vec![format!("{} Summary", sweep.title)];
    let mut models = vec!["Method".to_string()];
    for table in &sweep.versions {
        header.push(table.version.clone());
        header.extend(blanks(n.saturating_sub(1)));
        models.extend(sweep.model_order.iter().cloned());
    }

    let mut rows = vec![header, models];
    for row in RowLabel::ALL {
        let mut cells = vec![row.as_str().to_string()];
        for table in &sweep.versions {
            cells.extend(
                sweep
                    .model_order
                    .iter()
                    .map(|m| format_score(table.score(m, row))),
            );
        }
        rows.push(cells);
    }
    rows
}

pub fn render_version_csv(table: &VersionTable, title: &str) -> Result<Option<String>> {
    version_rows(table, title).map(|rows| to_csv(&rows)).transpose()
}

pub fn render_version_summary_csv(sweep: &VersionSweep) -> Result<String> {
    to_csv(&version_summary_rows(sweep))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModelTable {
        let mut model = ModelTable::new("gpt4o", "GPT-4o");
        model.table.insert(
            Regime::Explicit,
            RowLabel::NoMemory,
            "webshop",
            vec![Some(0.25), None, Some(1.0)],
        );
        model.table.insert(
            Regime::Implicit,
            RowLabel::Vanilla,
            "frozenlake",
            vec![Some(0.5), Some(0.125)],
        );
        model
    }

    #[test]
    fn test_combined_shape() {
        let rows = combined_rows(&sample(), &Catalog::standard());
        assert_eq!(rows.len(), 3 + 9 + 1 + 9);
        assert!(rows.iter().all(|r| r.len() == 11));
        assert_eq!(rows[0][0], "GPT-4o");
        assert_eq!(
            rows[1],
            vec!["", "", "webshop", "", "", "frozen lake", "", "", "mountain car", "", ""]
        );
        assert_eq!(
            rows[12],
            vec!["", "", "env0", "env1", "", "env0", "env1", "", "", "", ""]
        );
    }

    #[test]
    fn test_combined_cells() {
        let rows = combined_rows(&sample(), &Catalog::standard());
        assert_eq!(rows[3][0], "explicit");
        assert_eq!(rows[3][1], "no-memory");
        assert_eq!(&rows[3][2..5], &["0.2500", "", "1.0000"]);
        assert_eq!(rows[4][0], "");
        // implicit vanilla row
        assert_eq!(rows[14][1], "vanilla");
        assert_eq!(&rows[14][5..8], &["0.5000", "0.1250", ""]);
        assert_eq!(rows[13][0], "implicit");
    }

    #[test]
    fn test_split_widths() {
        let catalog = Catalog::standard();
        let explicit = split_rows(&sample(), &catalog, Regime::Explicit);
        let implicit = split_rows(&sample(), &catalog, Regime::Implicit);
        assert!(explicit.iter().all(|r| r.len() == 10));
        assert!(implicit.iter().all(|r| r.len() == 5));
        assert_eq!(implicit[1], vec!["", "webshop", "", "frozen lake", ""]);
        assert_eq!(implicit[2], vec!["", "env0", "env1", "env0", "env1"]);
        assert_eq!(implicit[4], vec!["vanilla", "", "", "0.5000", "0.1250"]);
    }

    #[test]
    fn test_csv_text() {
        let text = render_split_csv(&sample(), &Catalog::standard(), Regime::Implicit).unwrap();
        let first = text.lines().next().unwrap();
        assert_eq!(first, "GPT-4o,,,,");
    }
}
