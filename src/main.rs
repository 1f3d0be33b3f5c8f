//! benchplot - Benchmark result visualization
//!
//! Reduces raw benchmark trials to mean/min/max per (grouping key, system)
//! and renders one chart per workload, variant and hardware target.
//!
//! Exit codes:
//!   0 - Success (every planned chart was produced)
//!   1 - Runtime error (bad arguments, unreadable config, etc.)
//!   2 - At least one chart failed

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod runner;
mod scanner;
mod workload;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use models::{SummaryReport, Workload};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // The config file can turn on verbose logging, so it is read first
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("benchplot v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .benchplot.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize systems, filters, and chart styles.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Plan and run every pass. Returns exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();
    let workloads = args.workloads();

    let data_dir = config.general.data_dir.clone();
    if !data_dir.is_dir() {
        anyhow::bail!("Data directory does not exist: {}", data_dir.display());
    }

    let passes = runner::plan_passes(&config, &workloads)?;

    if args.dry_run {
        let scanner = scanner::DataScanner::new(data_dir);
        return handle_dry_run(&scanner, &passes, &workloads);
    }

    if passes.is_empty() {
        println!("No benchmark inputs found under {}", data_dir.display());
        return Ok(0);
    }

    let plot_dir = config.general.plot_dir.clone();
    std::fs::create_dir_all(&plot_dir)
        .with_context(|| format!("Failed to create plot directory {}", plot_dir.display()))?;

    if !args.quiet {
        println!("📊 Plotting {} charts into {}", passes.len(), plot_dir.display());
        println!("   Concurrency: {}", config.general.concurrency);
    }

    let outcomes = runner::run_all(Arc::new(config), passes, !args.quiet).await;

    let duration = start_time.elapsed().as_secs_f64();
    let report = SummaryReport::new(data_dir, plot_dir, outcomes, duration);

    if let Some(ref path) = args.summary {
        report::write_report(&report, path, args.format == OutputFormat::Json)?;
        info!("Summary written to {}", path.display());
    }

    // Print summary
    if !args.quiet {
        println!("\n📈 Run Summary:");
        for outcome in &report.outcomes {
            match (&outcome.artifact, &outcome.error) {
                (Some(artifact), _) => println!("   ✅ {} -> {}", outcome.pass, artifact.display()),
                (None, Some(error)) => println!("   ❌ {}: {}", outcome.pass, error),
                (None, None) => {}
            }
        }
        println!(
            "   Succeeded: {} | Failed: {}",
            report.metadata.passes_succeeded, report.metadata.passes_failed
        );
        println!("   Duration: {:.1}s", duration);
        if let Some(ref path) = args.summary {
            println!("\n📝 Summary report saved to: {}", path.display());
        }
    }

    if report.metadata.passes_failed > 0 {
        eprintln!(
            "\n⛔ {} of {} charts failed (exit code 2).",
            report.metadata.passes_failed,
            report.outcomes.len()
        );
        return Ok(2);
    }

    Ok(0)
}

/// Handle --dry-run: list discovered inputs and planned charts, exit.
fn handle_dry_run(
    scanner: &scanner::DataScanner,
    passes: &[runner::PlannedPass],
    workloads: &[Workload],
) -> Result<i32> {
    println!("\n🔍 Dry run: planning charts (nothing is plotted)...\n");

    let names: Vec<String> = workloads.iter().map(|w| w.to_string()).collect();
    println!("   Workloads: {}", names.join(", "));

    let targets = scanner.hardware_targets(workloads)?;
    if targets.is_empty() {
        println!(
            "   No benchmark inputs found under {}",
            scanner.data_dir().display()
        );
    } else {
        println!("   Hardware found: {}\n", targets.join(", "));
        for &workload in workloads.iter().filter(|w| **w != Workload::Profile) {
            for input in scanner.scan(workload)? {
                println!("     📄 {} ({} bytes)", input.path.display(), input.size);
            }
        }
    }

    if !passes.is_empty() {
        println!("\n   {} charts would be produced:\n", passes.len());
        for pass in passes {
            let marker = if pass.input.exists() { "✅" } else { "❓" };
            println!(
                "     {} {}.svg <- {}",
                marker,
                pass.id.artifact_stem(),
                pass.input.display()
            );
        }
    }

    println!("\n✅ Dry run complete. No charts were written.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    Ok(Config::load_default()?.unwrap_or_default())
}
