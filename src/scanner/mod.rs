//! Input discovery.
//!
//! Hardware targets are not listed anywhere by the benchmark harness;
//! each target leaves one `<hw>.csv` per workload directory. This module
//! finds them.

use crate::models::Workload;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A benchmark input found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedInput {
    pub workload: Workload,
    /// Hardware target name (the file stem).
    pub hardware: String,
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// Scanner over a benchmark data directory.
pub struct DataScanner {
    data_dir: PathBuf,
}

impl DataScanner {
    /// Create a new scanner rooted at `data_dir`.
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// List the CSV inputs of one workload, sorted by hardware name.
    ///
    /// A missing workload directory yields no inputs.
    pub fn scan(&self, workload: Workload) -> Result<Vec<ScannedInput>> {
        let dir = self.data_dir.join(workload.data_subdir());
        if !dir.is_dir() {
            debug!("No input directory for {}: {}", workload, dir.display());
            return Ok(Vec::new());
        }

        let mut inputs = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.with_context(|| format!("Failed to scan {}", dir.display()))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy();

            if !entry.file_type().is_file() || is_excluded(&name) {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            inputs.push(ScannedInput {
                workload,
                hardware: stem.to_string(),
                path: path.to_path_buf(),
                size,
            });
        }

        inputs.sort_by(|a, b| a.hardware.cmp(&b.hardware));
        Ok(inputs)
    }

    /// Union of hardware targets across the given workloads, sorted.
    pub fn hardware_targets(&self, workloads: &[Workload]) -> Result<Vec<String>> {
        let mut targets = BTreeSet::new();
        for &workload in workloads {
            if workload == Workload::Profile {
                continue;
            }
            for input in self.scan(workload)? {
                targets.insert(input.hardware);
            }
        }
        Ok(targets.into_iter().collect())
    }
}

/// Hidden and editor backup files are never inputs.
fn is_excluded(name: &str) -> bool {
    name.starts_with('.') || name.ends_with('~')
}
