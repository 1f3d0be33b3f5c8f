//! Star Schema Benchmark latency trials.
//!
//! One row per run with `system,cache_size,scale,threads,bloom_filter`
//! and one latency column (seconds) per query. Rows are melted into one
//! trial per query.

use super::{cell, parse_flag, parse_metric, LoadError, Table};
use crate::config::SsbConfig;
use crate::models::TrialRecord;
use std::path::Path;
use tracing::debug;

/// Grouping column of SSB charts.
pub const GROUPING: &str = "query";

/// Which SSB chart is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsbVariant {
    /// SQLite against DuckDB.
    Plain,
    /// Adds SQLite with Bloom filters (`sqlite_bloom`).
    Bloom,
}

impl SsbVariant {
    pub const ALL: [SsbVariant; 2] = [SsbVariant::Plain, SsbVariant::Bloom];

    pub fn name(&self) -> &'static str {
        match self {
            SsbVariant::Plain => "plain",
            SsbVariant::Bloom => "bloom",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "plain" => Some(SsbVariant::Plain),
            "bloom" => Some(SsbVariant::Bloom),
            _ => None,
        }
    }
}

/// Row selection for one SSB chart.
#[derive(Debug, Clone)]
pub struct SsbFilter {
    pub cache_size: String,
    pub scale: u32,
    pub queries: Vec<String>,
    pub latency_scale: f64,
    pub variant: SsbVariant,
}

impl SsbFilter {
    /// Build the filter for a hardware target from configuration.
    pub fn from_config(config: &SsbConfig, hardware: &str, variant: SsbVariant) -> Self {
        Self {
            cache_size: config.cache_size.clone(),
            scale: config.scale_for(hardware),
            queries: config.queries.clone(),
            latency_scale: config.latency_scale,
            variant,
        }
    }

    /// Effective system label of a row, or `None` if the row is dropped.
    fn classify(&self, system: &str, threads: Option<f64>, bloom: bool) -> Option<String> {
        let label = match system {
            "duckdb" if threads == Some(2.0) => return None,
            "duckdb" if threads == Some(4.0) => "duckdb_mt",
            "sqlite" if bloom => "sqlite_bloom",
            other => other,
        };

        match label {
            "duckdb_mt" => None,
            "sqlite_bloom" if self.variant == SsbVariant::Plain => None,
            _ => Some(label.to_string()),
        }
    }
}

/// Load SSB trials for one chart, grouped by query.
pub fn load_ssb(path: &Path, filter: &SsbFilter) -> Result<Vec<TrialRecord>, LoadError> {
    let table = Table::read(path)?;
    let system = table.column("system")?;
    let cache_size = table.column("cache_size")?;
    let scale = table.column("scale")?;
    let threads = table.column("threads")?;
    let bloom = table.column("bloom_filter")?;

    let query_columns = filter
        .queries
        .iter()
        .map(|q| table.column(q).map(|index| (q.as_str(), index)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::new();
    let mut kept_rows = 0;

    for row in table.rows() {
        if cell(row, cache_size) != filter.cache_size {
            continue;
        }
        if parse_metric(cell(row, scale)) != Some(f64::from(filter.scale)) {
            continue;
        }

        let Some(label) = filter.classify(
            cell(row, system),
            parse_metric(cell(row, threads)),
            parse_flag(cell(row, bloom)),
        ) else {
            continue;
        };

        kept_rows += 1;
        for &(query, index) in &query_columns {
            records.push(TrialRecord {
                grouping_key: query.to_string(),
                system: label.clone(),
                metric: parse_metric(cell(row, index)).map(|v| v * filter.latency_scale),
            });
        }
    }

    debug!(
        "SSB {}: kept {} of {} rows from {}",
        filter.variant.name(),
        kept_rows,
        table.rows().len(),
        path.display()
    );

    Ok(records)
}
