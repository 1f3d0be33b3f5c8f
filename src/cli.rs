//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Workload;
use clap::Parser;
use std::path::PathBuf;

/// benchplot - charts from embedded database benchmark results
///
/// Reduces raw benchmark trials (TATP, SSB, blob store, CPU profiles)
/// to mean/min/max per measurement and renders one SVG chart per
/// workload and hardware target.
///
/// Examples:
///   benchplot
///   benchplot --workload ssb --hardware rpi,c220g5
///   benchplot --data-dir ./results --plot-dir ./figures --summary summary.md
///   benchplot --dry-run
///   benchplot --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Workloads to plot (repeatable)
    #[arg(short, long, value_name = "WORKLOAD", default_value = "all")]
    pub workload: Vec<WorkloadArg>,

    /// Hardware targets to plot (comma-separated)
    ///
    /// If not specified, targets are discovered from the CSV file names
    /// under the data directory.
    #[arg(long, value_name = "HW", value_delimiter = ',')]
    pub hardware: Option<Vec<String>>,

    /// Directory holding the benchmark results
    #[arg(short, long, value_name = "DIR", env = "BENCHPLOT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory charts are written to
    #[arg(short, long, value_name = "DIR", env = "BENCHPLOT_PLOT_DIR")]
    pub plot_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .benchplot.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a summary report of every pass to this file
    #[arg(short, long, value_name = "FILE")]
    pub summary: Option<PathBuf>,

    /// Summary report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Number of charts rendered concurrently
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: list the planned charts and their inputs without plotting
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .benchplot.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Workload selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum WorkloadArg {
    /// Every workload
    All,
    Tatp,
    Ssb,
    Blob,
    Profile,
}

/// Output format for the summary report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate concurrency
        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate data directory if provided
        if let Some(ref data_dir) = self.data_dir {
            if !data_dir.exists() {
                return Err(format!(
                    "Data directory does not exist: {}",
                    data_dir.display()
                ));
            }
            if !data_dir.is_dir() {
                return Err(format!(
                    "Data path is not a directory: {}",
                    data_dir.display()
                ));
            }
        }

        if let Some(ref hardware) = self.hardware {
            if hardware.iter().any(|hw| hw.trim().is_empty()) {
                return Err("Hardware target names must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Selected workloads in presentation order, without duplicates.
    pub fn workloads(&self) -> Vec<Workload> {
        if self.workload.is_empty() || self.workload.contains(&WorkloadArg::All) {
            return Workload::ALL.to_vec();
        }

        Workload::ALL
            .into_iter()
            .filter(|w| {
                self.workload.iter().any(|arg| match arg {
                    WorkloadArg::All => true,
                    WorkloadArg::Tatp => *w == Workload::Tatp,
                    WorkloadArg::Ssb => *w == Workload::Ssb,
                    WorkloadArg::Blob => *w == Workload::Blob,
                    WorkloadArg::Profile => *w == Workload::Profile,
                })
            })
            .collect()
    }
}
