//! Blob store throughput trials: `size,mix,system,throughput`.

use super::{cell, parse_metric, LoadError, Table};
use crate::models::TrialRecord;
use std::path::Path;

/// Grouping column of blob charts.
pub const GROUPING: &str = "mix";

/// Load blob trials of one blob size, grouped by read mix.
pub fn load_blob(path: &Path, size: &str) -> Result<Vec<TrialRecord>, LoadError> {
    let table = Table::read(path)?;
    let size_col = table.column("size")?;
    let mix = table.column(GROUPING)?;
    let system = table.column("system")?;
    let throughput = table.column("throughput")?;

    Ok(table
        .rows()
        .iter()
        .filter(|row| cell(row, size_col) == size)
        .map(|row| TrialRecord {
            grouping_key: cell(row, mix).to_string(),
            system: cell(row, system).to_string(),
            metric: parse_metric(cell(row, throughput)),
        })
        .collect())
}
