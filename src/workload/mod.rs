//! Benchmark input loaders.
//!
//! Each harness writes its own CSV layout. The loaders here read those
//! files, apply the row filters a chart needs, and emit uniform
//! [`TrialRecord`]s for the aggregator.
//!
//! [`TrialRecord`]: crate::models::TrialRecord

pub mod blob;
pub mod profile;
pub mod ssb;
pub mod tatp;

use crate::models::Workload;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub use blob::load_blob;
pub use profile::{load_profiles, profile_dir};
pub use ssb::{load_ssb, SsbFilter, SsbVariant};
pub use tatp::load_tatp;

/// Errors raised while reading benchmark inputs.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("input not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{}: missing column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("{}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Path of the CSV holding one workload's trials on one hardware target.
pub fn input_path(data_dir: &Path, workload: Workload, hardware: &str) -> PathBuf {
    data_dir
        .join(workload.data_subdir())
        .join(format!("{}.csv", hardware))
}

/// A delimited file read fully into memory, with columns looked up by header.
#[derive(Debug)]
pub struct Table {
    path: PathBuf,
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Table {
    /// Read a CSV file with a header row.
    pub fn read(path: &Path) -> Result<Self, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        let csv_err = |source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)
            .map_err(csv_err)?;

        let headers = reader.headers().map_err(csv_err)?.clone();
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_err)?;

        debug!("Read {} rows from {}", rows.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    /// Index of a named column.
    pub fn column(&self, name: &str) -> Result<usize, LoadError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }
}

/// Cell text, empty when the row is short.
pub fn cell(row: &StringRecord, index: usize) -> &str {
    row.get(index).unwrap_or("")
}

/// Parse a numeric cell. Empty, `NaN` or non-numeric text yields `None`.
pub fn parse_metric(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a boolean cell as written by the harness scripts.
pub fn parse_flag(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
