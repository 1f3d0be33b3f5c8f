//! Data models for benchmark reduction.
//!
//! This module contains the core data structures used throughout
//! the application: raw trial records, aggregated points, the wide
//! tables handed to the chart renderer, and per-pass outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Benchmark workload a plotting pass belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Workload {
    /// TATP throughput by subscriber record count
    Tatp,
    /// Star Schema Benchmark query latency
    Ssb,
    /// Blob store throughput by read mix
    Blob,
    /// SSB CPU-cycle profiles per query
    Profile,
}

impl Workload {
    /// All workloads in presentation order.
    pub const ALL: [Workload; 4] = [
        Workload::Tatp,
        Workload::Ssb,
        Workload::Blob,
        Workload::Profile,
    ];

    /// Name of the data subdirectory holding this workload's inputs.
    pub fn data_subdir(&self) -> &'static str {
        match self {
            Workload::Tatp => "tatp",
            Workload::Ssb | Workload::Profile => "ssb",
            Workload::Blob => "blob",
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workload::Tatp => write!(f, "tatp"),
            Workload::Ssb => write!(f, "ssb"),
            Workload::Blob => write!(f, "blob"),
            Workload::Profile => write!(f, "profile"),
        }
    }
}

/// One raw benchmark measurement row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Independent variable the chart is plotted against (query, record count, mix).
    pub grouping_key: String,
    /// Benchmarked variant label, e.g. `sqlite_WAL` or `duckdb`.
    pub system: String,
    /// Measured value; `None` when the input cell was missing or not numeric.
    pub metric: Option<f64>,
}

impl TrialRecord {
    /// Creates a record with a known metric value.
    #[cfg(test)]
    pub fn new(grouping_key: impl Into<String>, system: impl Into<String>, metric: f64) -> Self {
        Self {
            grouping_key: grouping_key.into(),
            system: system.into(),
            metric: Some(metric),
        }
    }

    /// Creates a record whose metric could not be read.
    #[cfg(test)]
    pub fn missing(grouping_key: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            grouping_key: grouping_key.into(),
            system: system.into(),
            metric: None,
        }
    }

    /// Returns the metric if it is present and finite.
    pub fn valid_metric(&self) -> Option<f64> {
        self.metric.filter(|v| v.is_finite())
    }
}

/// Mean/min/max summary of one (grouping key, system) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPoint {
    /// Number of valid trials folded into this point.
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl AggregatedPoint {
    /// Builds a point from a set of values. Returns `None` for an empty set.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let (&first, rest) = values.split_first()?;

        let mut min = first;
        let mut max = first;
        let mut sum = first;
        for &v in rest {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }

        // Rounding can push the mean of near-identical values just outside [min, max]
        let mean = (sum / values.len() as f64).clamp(min, max);

        Some(Self {
            count: values.len(),
            mean,
            min,
            max,
        })
    }

    /// Error bar magnitudes below and above the mean.
    pub fn error_bar(&self) -> ErrorBar {
        ErrorBar {
            lo: (self.mean - self.min).max(0.0),
            hi: (self.max - self.mean).max(0.0),
        }
    }
}

/// Error bar derived from an aggregated point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorBar {
    /// `mean - min`
    pub lo: f64,
    /// `max - mean`
    pub hi: f64,
}

/// One row of a wide table: a grouping key and one cell per system column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideRow {
    pub key: String,
    pub cells: Vec<Option<AggregatedPoint>>,
}

/// Aggregated results in wide form: one row per grouping key, one column per system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideTable {
    /// Name of the grouping column (e.g. `records`, `query`, `mix`).
    pub grouping: String,
    /// System columns, in first-seen (or configured) order.
    pub systems: Vec<String>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    /// Index of a system column.
    pub fn system_index(&self, system: &str) -> Option<usize> {
        self.systems.iter().position(|s| s == system)
    }

    /// Sum of means per system, skipping empty cells.
    pub fn mean_totals(&self) -> Vec<(String, f64)> {
        self.systems
            .iter()
            .enumerate()
            .map(|(i, system)| {
                let total = self
                    .rows
                    .iter()
                    .filter_map(|row| row.cells.get(i).copied().flatten())
                    .map(|p| p.mean)
                    .sum();
                (system.clone(), total)
            })
            .collect()
    }

    /// Largest `max` over every cell, used for auto-scaling axes.
    pub fn peak(&self) -> f64 {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter().flatten())
            .map(|p| p.max)
            .fold(0.0, f64::max)
    }

    /// Smallest positive `min` over every cell, if any.
    pub fn floor(&self) -> Option<f64> {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter().flatten())
            .map(|p| p.min)
            .filter(|v| *v > 0.0)
            .reduce(f64::min)
    }
}

/// Per-query CPU tick breakdown by symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileTable {
    /// Query names, one per row.
    pub queries: Vec<String>,
    /// Symbol columns; the last one is `other` when minor symbols were folded.
    pub symbols: Vec<String>,
    /// `ticks[row][column]`
    pub ticks: Vec<Vec<u64>>,
}

impl ProfileTable {
    /// Total ticks of one query row.
    pub fn row_total(&self, row: usize) -> u64 {
        self.ticks.get(row).map(|r| r.iter().sum()).unwrap_or(0)
    }
}

/// Table produced by a pass, as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartTable {
    /// Grouped bars of aggregated points.
    Bars(WideTable),
    /// Stacked bars of profile ticks.
    Stacked(ProfileTable),
}

/// Identifies one plotting pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassId {
    pub workload: Workload,
    pub hardware: String,
    /// Workload variant, e.g. `bloom` for SSB or `10 MB` for blob.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl PassId {
    pub fn new(workload: Workload, hardware: impl Into<String>, variant: Option<&str>) -> Self {
        Self {
            workload,
            hardware: hardware.into(),
            variant: variant.map(String::from),
        }
    }

    /// File stem for this pass's chart, with spaces replaced by underscores.
    pub fn artifact_stem(&self) -> String {
        let stem = match (self.workload, self.variant.as_deref()) {
            (Workload::Tatp, _) => format!("tatp_{}", self.hardware),
            (Workload::Ssb, Some("bloom")) => format!("ssb_bloom_{}", self.hardware),
            (Workload::Ssb, _) => format!("ssb_{}", self.hardware),
            (Workload::Blob, Some(size)) => format!("blob_{}_{}", size, self.hardware),
            (Workload::Blob, None) => format!("blob_{}", self.hardware),
            (Workload::Profile, Some(config)) => format!("profile_{}", config),
            (Workload::Profile, None) => format!("profile_{}", self.hardware),
        };
        stem.replace(' ', "_")
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant {
            Some(ref variant) => write!(f, "{} [{}] on {}", self.workload, variant, self.hardware),
            None => write!(f, "{} on {}", self.workload, self.hardware),
        }
    }
}

/// Result of one plotting pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassOutcome {
    pub pass: PassId,
    /// Input file the pass read (or the profile directory).
    pub input: PathBuf,
    /// Chart written by the pass, if it succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    /// Aggregated table, if the pass got that far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<ChartTable>,
    /// Error message if the pass failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PassOutcome {
    /// Creates a successful outcome.
    pub fn succeeded(pass: PassId, input: PathBuf, artifact: PathBuf, table: ChartTable) -> Self {
        Self {
            pass,
            input,
            artifact: Some(artifact),
            table: Some(table),
            error: None,
        }
    }

    /// Creates a failed outcome.
    pub fn failed(pass: PassId, input: PathBuf, error: String) -> Self {
        Self {
            pass,
            input,
            artifact: None,
            table: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Metadata about a plotting run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMetadata {
    pub generated_at: DateTime<Utc>,
    pub data_dir: PathBuf,
    pub plot_dir: PathBuf,
    pub passes_succeeded: usize,
    pub passes_failed: usize,
    /// Wall-clock duration in seconds
    pub duration_seconds: f64,
}

/// Everything a run produced, as written to the summary report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub metadata: SummaryMetadata,
    pub outcomes: Vec<PassOutcome>,
}

impl SummaryReport {
    /// Build a report from outcomes, counting successes and failures.
    pub fn new(
        data_dir: PathBuf,
        plot_dir: PathBuf,
        outcomes: Vec<PassOutcome>,
        duration_seconds: f64,
    ) -> Self {
        let passes_succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let passes_failed = outcomes.len() - passes_succeeded;

        Self {
            metadata: SummaryMetadata {
                generated_at: Utc::now(),
                data_dir,
                plot_dir,
                passes_succeeded,
                passes_failed,
                duration_seconds,
            },
            outcomes,
        }
    }

    /// Outcomes of passes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &PassOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}
