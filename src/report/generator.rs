//! Summary report generation.
//!
//! Renders the outcomes of a plotting run as Markdown (one table of
//! aggregated values per pass) or as JSON.

use crate::models::{ChartTable, PassOutcome, ProfileTable, SummaryMetadata, SummaryReport, WideTable};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &SummaryReport) -> String {
    let mut output = String::new();

    output.push_str("# Benchmark Plot Summary\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));

    output.push_str(&generate_passes_section(&report.outcomes));

    output.push_str(&generate_failures_section(report));

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &SummaryMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Data Directory:** `{}`\n",
        metadata.data_dir.display()
    ));
    section.push_str(&format!(
        "- **Plot Directory:** `{}`\n",
        metadata.plot_dir.display()
    ));
    section.push_str(&format!(
        "- **Passes Succeeded:** {}\n",
        metadata.passes_succeeded
    ));
    if metadata.passes_failed > 0 {
        section.push_str(&format!("- **Passes Failed:** {}\n", metadata.passes_failed));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate one subsection per successful pass.
fn generate_passes_section(outcomes: &[PassOutcome]) -> String {
    let mut section = String::new();

    section.push_str("## Charts\n\n");

    let succeeded: Vec<_> = outcomes.iter().filter(|o| o.is_success()).collect();
    if succeeded.is_empty() {
        section.push_str("No charts were produced.\n\n");
        return section;
    }

    for outcome in succeeded {
        section.push_str(&format!("### {}\n\n", outcome.pass));
        if let Some(ref artifact) = outcome.artifact {
            section.push_str(&format!("*Chart: `{}`*\n\n", artifact.display()));
        }

        match outcome.table {
            Some(ChartTable::Bars(ref table)) => section.push_str(&generate_wide_table(table)),
            Some(ChartTable::Stacked(ref table)) => {
                section.push_str(&generate_profile_table(table))
            }
            None => {}
        }
    }

    section
}

/// Render a wide table as `mean [min, max]` cells with a totals row.
fn generate_wide_table(table: &WideTable) -> String {
    let mut block = String::new();

    block.push_str(&format!("| {} |", table.grouping));
    for system in &table.systems {
        block.push_str(&format!(" {} |", system));
    }
    block.push('\n');

    block.push_str("|:---|");
    block.push_str(&"---:|".repeat(table.systems.len()));
    block.push('\n');

    for row in &table.rows {
        block.push_str(&format!("| {} |", row.key));
        for cell in &row.cells {
            match cell {
                Some(point) => block.push_str(&format!(
                    " {} [{}, {}] |",
                    format_value(point.mean),
                    format_value(point.min),
                    format_value(point.max)
                )),
                None => block.push_str(" - |"),
            }
        }
        block.push('\n');
    }

    block.push_str("| **Total** |");
    for (_, total) in table.mean_totals() {
        block.push_str(&format!(" **{}** |", format_value(total)));
    }
    block.push_str("\n\n");

    block
}

/// Render a profile table as ticks per symbol.
fn generate_profile_table(table: &ProfileTable) -> String {
    let mut block = String::new();

    block.push_str("| query |");
    for symbol in &table.symbols {
        block.push_str(&format!(" `{}` |", symbol));
    }
    block.push_str(" **Total** |\n");

    block.push_str("|:---|");
    block.push_str(&"---:|".repeat(table.symbols.len() + 1));
    block.push('\n');

    for (i, query) in table.queries.iter().enumerate() {
        block.push_str(&format!("| {} |", query));
        for ticks in table.ticks.get(i).into_iter().flatten() {
            block.push_str(&format!(" {} |", ticks));
        }
        block.push_str(&format!(" **{}** |\n", table.row_total(i)));
    }
    block.push('\n');

    block
}

/// Generate the failures section.
fn generate_failures_section(report: &SummaryReport) -> String {
    let failures: Vec<_> = report.failures().collect();
    if failures.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Failures\n\n");
    section.push_str("| Pass | Input | Error |\n");
    section.push_str("|:---|:---|:---|\n");

    for outcome in failures {
        section.push_str(&format!(
            "| {} | `{}` | {} |\n",
            outcome.pass,
            outcome.input.display(),
            outcome.error.as_deref().unwrap_or("unknown error").replace('|', "\\|")
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!(
        "---\n\n*Report generated by benchplot v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Up to three decimals, trailing zeros dropped.
fn format_value(value: f64) -> String {
    let text = format!("{:.3}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &SummaryReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write the report to a file in the requested format.
pub fn write_report(report: &SummaryReport, path: &Path, json: bool) -> Result<()> {
    let content = if json {
        generate_json_report(report)?
    } else {
        generate_markdown_report(report)
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AggregatedPoint, PassId, WideRow, Workload};
    use std::path::PathBuf;

    fn create_test_report() -> SummaryReport {
        let table = WideTable {
            grouping: "query".to_string(),
            systems: vec!["sqlite".to_string(), "duckdb".to_string()],
            rows: vec![
                WideRow {
                    key: "Q1.1".to_string(),
                    cells: vec![
                        AggregatedPoint::from_values(&[1960.0, 2000.0]),
                        AggregatedPoint::from_values(&[49.0]),
                    ],
                },
                WideRow {
                    key: "Q1.2".to_string(),
                    cells: vec![
                        AggregatedPoint::from_values(&[2156.0]),
                        AggregatedPoint::from_values(&[53.9]),
                    ],
                },
            ],
        };

        let outcomes = vec![
            PassOutcome::succeeded(
                PassId::new(Workload::Ssb, "c220g5", Some("plain")),
                PathBuf::from("data/ssb/c220g5.csv"),
                PathBuf::from("plots/ssb_c220g5.svg"),
                ChartTable::Bars(table),
            ),
            PassOutcome::succeeded(
                PassId::new(Workload::Profile, "c220g5", Some("vanilla")),
                PathBuf::from("data/ssb/c220g5/profiles/vanilla"),
                PathBuf::from("plots/profile_vanilla.svg"),
                ChartTable::Stacked(ProfileTable {
                    queries: vec!["Q1.1".to_string()],
                    symbols: vec!["sqlite3VdbeExec".to_string(), "other".to_string()],
                    ticks: vec![vec![900, 100]],
                }),
            ),
            PassOutcome::failed(
                PassId::new(Workload::Tatp, "rpi", None),
                PathBuf::from("data/tatp/rpi.csv"),
                "no measurements for system 'duckdb' at 1000".to_string(),
            ),
        ];

        SummaryReport::new(PathBuf::from("data"), PathBuf::from("plots"), outcomes, 2.5)
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Benchmark Plot Summary"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("- **Passes Succeeded:** 2"));
        assert!(markdown.contains("- **Passes Failed:** 1"));
        assert!(markdown.contains("### ssb [plain] on c220g5"));
        assert!(markdown.contains("`plots/ssb_c220g5.svg`"));
        assert!(markdown.contains("## Failures"));
        assert!(markdown.contains("tatp on rpi"));
    }

    #[test]
    fn test_wide_table_cells_and_totals() {
        let report = create_test_report();
        let Some(ChartTable::Bars(ref table)) = report.outcomes[0].table else {
            panic!("expected a bar table");
        };

        let block = generate_wide_table(table);
        assert!(block.starts_with("| query | sqlite | duckdb |\n"));
        assert!(block.contains("| Q1.1 | 1980 [1960, 2000] | 49 [49, 49] |"));
        assert!(block.contains("| **Total** | **4136** | **102.9** |"));
    }

    #[test]
    fn test_profile_table() {
        let table = ProfileTable {
            queries: vec!["Q1.1".to_string()],
            symbols: vec!["sqlite3VdbeExec".to_string(), "other".to_string()],
            ticks: vec![vec![900, 100]],
        };

        let block = generate_profile_table(&table);
        assert!(block.contains("| Q1.1 | 900 | 100 | **1000** |"));
    }

    #[test]
    fn test_no_failures_section_when_all_pass() {
        let mut report = create_test_report();
        report.outcomes.retain(|o| o.is_success());

        let markdown = generate_markdown_report(&report);
        assert!(!markdown.contains("## Failures"));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(15.0), "15");
        assert_eq!(format_value(0.125), "0.125");
        assert_eq!(format_value(102.9), "102.9");
        assert_eq!(format_value(-0.0001), "0");
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"passes_failed\": 1"));
        assert!(json.contains("\"kind\": \"bars\""));
        assert!(json.contains("\"kind\": \"stacked\""));
        assert!(json.contains("\"error\""));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");

        write_report(&create_test_report(), &path, true).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["outcomes"].as_array().map(Vec::len), Some(3));
    }
}
