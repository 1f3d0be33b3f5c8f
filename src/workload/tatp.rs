//! TATP throughput trials: `records,system,throughput`.

use super::{cell, parse_metric, LoadError, Table};
use crate::models::TrialRecord;
use std::path::Path;

/// Grouping column of TATP charts.
pub const GROUPING: &str = "records";

/// Load TATP trials, grouped by subscriber record count.
pub fn load_tatp(path: &Path) -> Result<Vec<TrialRecord>, LoadError> {
    let table = Table::read(path)?;
    let records = table.column(GROUPING)?;
    let system = table.column("system")?;
    let throughput = table.column("throughput")?;

    Ok(table
        .rows()
        .iter()
        .map(|row| TrialRecord {
            grouping_key: cell(row, records).to_string(),
            system: cell(row, system).to_string(),
            metric: parse_metric(cell(row, throughput)),
        })
        .collect())
}
