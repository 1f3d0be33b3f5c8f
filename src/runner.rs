//! Pass planning and execution.
//!
//! A pass turns one input (a CSV file or a profile directory) into one
//! chart. Passes are independent: they run on blocking worker threads,
//! bounded by the configured concurrency, and a failing pass only
//! produces a failed [`PassOutcome`].

use crate::analysis::{aggregate, pivot, reduce_profiles};
use crate::config::{ChartConfig, Config};
use crate::models::{ChartTable, PassId, PassOutcome, TrialRecord, Workload};
use crate::report::plots::{render_bars, render_profile};
use crate::scanner::DataScanner;
use crate::workload::{
    self, blob, input_path, load_blob, load_profiles, load_ssb, load_tatp, profile_dir, ssb,
    tatp, SsbFilter, SsbVariant,
};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A pass and the input it will read.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPass {
    pub id: PassId,
    pub input: PathBuf,
}

/// Plan every pass for the selected workloads.
///
/// Hardware targets come from `general.hardware`, or are discovered per
/// workload from the CSV files on disk when none are configured.
pub fn plan_passes(config: &Config, workloads: &[Workload]) -> Result<Vec<PlannedPass>> {
    let data_dir = &config.general.data_dir;
    let scanner = DataScanner::new(data_dir.clone());
    let discover = config.general.hardware.is_empty();

    let mut passes = Vec::new();
    for &workload in workloads {
        if workload == Workload::Profile {
            plan_profile_passes(config, discover, &mut passes);
            continue;
        }

        let targets = if discover {
            scanner
                .scan(workload)?
                .into_iter()
                .map(|input| input.hardware)
                .collect()
        } else {
            config.general.hardware.clone()
        };

        if targets.is_empty() {
            warn!("No {} inputs found under {}", workload, data_dir.display());
        }

        for hardware in &targets {
            let input = input_path(data_dir, workload, hardware);
            let variants: Vec<Option<&str>> = match workload {
                Workload::Ssb => SsbVariant::ALL.iter().map(|v| Some(v.name())).collect(),
                Workload::Blob => config.blob.sizes.iter().map(|s| Some(s.as_str())).collect(),
                _ => vec![None],
            };

            for variant in variants {
                passes.push(PlannedPass {
                    id: PassId::new(workload, hardware.as_str(), variant),
                    input: input.clone(),
                });
            }
        }
    }

    debug!("Planned {} passes", passes.len());
    Ok(passes)
}

fn plan_profile_passes(config: &Config, discover: bool, passes: &mut Vec<PlannedPass>) {
    let hardware = &config.profile.hardware;
    let root = config.general.data_dir.join("ssb").join(hardware).join("profiles");

    // Discovery only plans profiles that were actually captured
    if discover && !root.is_dir() {
        info!("No profiles under {}, skipping", root.display());
        return;
    }
    if !discover && !config.general.hardware.contains(hardware) {
        info!("Profile hardware {} not among selected targets, skipping", hardware);
        return;
    }

    for profile_config in &config.profile.configs {
        passes.push(PlannedPass {
            id: PassId::new(Workload::Profile, hardware.as_str(), Some(profile_config.as_str())),
            input: profile_dir(&config.general.data_dir, hardware, profile_config),
        });
    }
}

/// Run one pass to completion. Errors become a failed outcome.
pub fn run_pass(config: &Config, pass: &PlannedPass) -> PassOutcome {
    debug!("Running {}", pass.id);

    match execute(config, pass) {
        Ok((artifact, table)) => {
            info!("{} -> {}", pass.id, artifact.display());
            PassOutcome::succeeded(pass.id.clone(), pass.input.clone(), artifact, table)
        }
        Err(e) => {
            warn!("{} failed: {:#}", pass.id, e);
            PassOutcome::failed(pass.id.clone(), pass.input.clone(), format!("{:#}", e))
        }
    }
}

fn execute(config: &Config, pass: &PlannedPass) -> Result<(PathBuf, ChartTable)> {
    let plot_dir = &config.general.plot_dir;
    std::fs::create_dir_all(plot_dir)
        .with_context(|| format!("Failed to create plot directory {}", plot_dir.display()))?;
    let artifact = plot_dir.join(format!("{}.svg", pass.id.artifact_stem()));

    let hardware = pass.id.hardware.as_str();
    let variant = pass.id.variant.as_deref();

    let table = match pass.id.workload {
        Workload::Tatp => {
            let records = load_tatp(&pass.input)?;
            let chart = &config.tatp.chart;
            bar_pass(&artifact, &records, tatp::GROUPING, chart, hardware, variant)?
        }
        Workload::Ssb => {
            let ssb_variant = variant
                .and_then(SsbVariant::from_name)
                .unwrap_or(SsbVariant::Plain);
            let filter = SsbFilter::from_config(&config.ssb, hardware, ssb_variant);
            let records = load_ssb(&pass.input, &filter)?;
            let chart = match ssb_variant {
                SsbVariant::Plain => &config.ssb.chart,
                SsbVariant::Bloom => &config.ssb.bloom_chart,
            };
            bar_pass(&artifact, &records, ssb::GROUPING, chart, hardware, variant)?
        }
        Workload::Blob => {
            let size = variant.context("blob pass has no size")?;
            let records = load_blob(&pass.input, size)?;
            let chart = &config.blob.chart;
            bar_pass(&artifact, &records, blob::GROUPING, chart, hardware, variant)?
        }
        Workload::Profile => profile_pass(&artifact, config, &pass.input, hardware, variant)?,
    };

    Ok((artifact, table))
}

fn bar_pass(
    artifact: &Path,
    records: &[TrialRecord],
    grouping: &str,
    chart: &ChartConfig,
    hardware: &str,
    variant: Option<&str>,
) -> Result<ChartTable> {
    let aggregation = aggregate(records);
    debug!(
        "{} records reduced to {} points",
        records.len(),
        aggregation.len()
    );
    aggregation.require(&chart.systems)?;

    let mut table = pivot(&aggregation, grouping);
    if !chart.systems.is_empty() {
        table = table.select(&chart.systems)?;
    }

    let style = chart.style_for(hardware, variant);
    render_bars(artifact, &table, chart, &style)?;
    Ok(ChartTable::Bars(table))
}

fn profile_pass(
    artifact: &Path,
    config: &Config,
    dir: &Path,
    hardware: &str,
    variant: Option<&str>,
) -> Result<ChartTable> {
    if !dir.is_dir() {
        return Err(workload::LoadError::NotFound(dir.to_path_buf()).into());
    }

    let profiles = load_profiles(dir, &config.profile.queries)?;
    let table = reduce_profiles(&profiles, config.profile.threshold);

    let style = config.profile.chart.style_for(hardware, variant);
    render_profile(artifact, &table, &style)?;
    Ok(ChartTable::Stacked(table))
}

/// Run all passes on the blocking pool, at most `general.concurrency` at once.
///
/// Outcomes come back in plan order.
pub async fn run_all(
    config: Arc<Config>,
    passes: Vec<PlannedPass>,
    show_progress: bool,
) -> Vec<PassOutcome> {
    let concurrency = config.general.concurrency.max(1);

    let progress = if show_progress {
        let pb = ProgressBar::new(passes.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut outcomes: Vec<(usize, PassOutcome)> = stream::iter(passes.into_iter().enumerate())
        .map(|(index, pass)| {
            let config = Arc::clone(&config);
            let progress = progress.clone();
            async move {
                let id = pass.id.clone();
                let input = pass.input.clone();

                let outcome = match tokio::task::spawn_blocking(move || run_pass(&config, &pass))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(e) => PassOutcome::failed(id, input, format!("pass aborted: {}", e)),
                };

                if let Some(ref pb) = progress {
                    pb.set_message(outcome.pass.artifact_stem());
                    pb.inc(1);
                }
                (index, outcome)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::testing::fixture;

    fn fixture_config(plot_dir: &Path) -> Config {
        let mut config = Config::default();
        config.general.data_dir = fixture("data");
        config.general.plot_dir = plot_dir.to_path_buf();
        config.general.concurrency = 2;
        config.profile.hardware = "testbox".to_string();
        config.profile.queries = vec!["Q1.1".to_string(), "Q1.2".to_string()];
        config
    }

    fn stems(passes: &[PlannedPass]) -> Vec<String> {
        passes.iter().map(|p| p.id.artifact_stem()).collect()
    }

    #[test]
    fn test_plan_discovers_hardware() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path());

        let passes = plan_passes(&config, &Workload::ALL).unwrap();
        assert_eq!(
            stems(&passes),
            vec![
                "tatp_testbox",
                "ssb_testbox",
                "ssb_bloom_testbox",
                "blob_100_KB_testbox",
                "blob_10_MB_testbox",
                "profile_vanilla",
                "profile_bloom",
            ]
        );
        assert_eq!(passes[0].input, fixture("data/tatp/testbox.csv"));
    }

    #[test]
    fn test_plan_configured_hardware() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixture_config(dir.path());
        config.general.hardware = vec!["rpi".to_string(), "c220g5".to_string()];

        let passes = plan_passes(&config, &[Workload::Tatp]).unwrap();
        assert_eq!(stems(&passes), vec!["tatp_rpi", "tatp_c220g5"]);
    }

    #[test]
    fn test_plan_skips_uncaptured_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixture_config(dir.path());
        config.profile.hardware = "c220g5".to_string();

        assert!(plan_passes(&config, &[Workload::Profile]).unwrap().is_empty());
    }

    #[test]
    fn test_run_all_with_configured_hardware() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixture_config(dir.path());
        config.general.hardware = vec!["testbox".to_string()];
        config.profile.hardware = "c220g5".to_string();

        let passes = plan_passes(&config, &Workload::ALL).unwrap();
        assert!(passes.iter().all(|p| p.id.workload != Workload::Profile));
        assert_eq!(passes.len(), 5);

        let outcomes = tokio_test::block_on(run_all(Arc::new(config.clone()), passes, false));
        assert!(outcomes.iter().all(|o| o.is_success()));

        // Profiles captured on a selected target are still plotted
        config.profile.hardware = "testbox".to_string();
        let passes = plan_passes(&config, &Workload::ALL).unwrap();
        assert_eq!(passes.len(), 7);

        let outcomes = tokio_test::block_on(run_all(Arc::new(config), passes, false));
        assert!(outcomes.iter().all(|o| o.is_success()), "{:?}", outcomes);
        assert!(dir.path().join("profile_bloom.svg").is_file());
    }

    #[test]
    fn test_run_pass_tatp() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path());
        let pass = PlannedPass {
            id: PassId::new(Workload::Tatp, "testbox", None),
            input: fixture("data/tatp/testbox.csv"),
        };

        let outcome = run_pass(&config, &pass);
        assert!(outcome.is_success(), "{:?}", outcome.error);
        assert_eq!(outcome.artifact, Some(dir.path().join("tatp_testbox.svg")));
        assert!(dir.path().join("tatp_testbox.svg").is_file());

        let Some(ChartTable::Bars(table)) = outcome.table else {
            panic!("expected a bar table");
        };
        assert_eq!(table.systems, vec!["sqlite_WAL", "sqlite_DELETE", "duckdb"]);
        assert_eq!(table.rows.len(), 3);
    }

    #[test]
    fn test_run_pass_skips_blank_key_rows() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path());
        let input = crate::workload::testing::write_csv(
            dir.path(),
            "testbox.csv",
            "records,system,throughput\n\
             1000,sqlite_WAL,10\n\
             1000,sqlite_DELETE,5\n\
             1000,duckdb,2\n\
             ,duckdb,3\n",
        );
        let pass = PlannedPass {
            id: PassId::new(Workload::Tatp, "testbox", None),
            input,
        };

        let outcome = run_pass(&config, &pass);
        assert!(outcome.is_success(), "{:?}", outcome.error);
        let Some(ChartTable::Bars(table)) = outcome.table else {
            panic!("expected a bar table");
        };
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].key, "1000");
    }

    #[test]
    fn test_run_pass_missing_system() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixture_config(dir.path());
        config.tatp.chart.systems.push("postgres".to_string());
        config.tatp.chart.labels.push("Postgres".to_string());
        let pass = PlannedPass {
            id: PassId::new(Workload::Tatp, "testbox", None),
            input: fixture("data/tatp/testbox.csv"),
        };

        let outcome = run_pass(&config, &pass);
        assert!(!outcome.is_success());
        assert!(outcome.error.unwrap().contains("postgres"));
        assert!(!dir.path().join("tatp_testbox.svg").exists());
    }

    #[test]
    fn test_run_pass_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path());
        let pass = PlannedPass {
            id: PassId::new(Workload::Blob, "nowhere", Some("100 KB")),
            input: fixture("data/blob/nowhere.csv"),
        };

        let outcome = run_pass(&config, &pass);
        assert!(outcome.error.unwrap().contains("nowhere.csv"));
        assert!(outcome.artifact.is_none());
    }

    #[test]
    fn test_run_pass_profile() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixture_config(dir.path());
        config.profile.threshold = 0.0;
        let pass = PlannedPass {
            id: PassId::new(Workload::Profile, "testbox", Some("bloom")),
            input: fixture("data/ssb/testbox/profiles/bloom"),
        };

        let outcome = run_pass(&config, &pass);
        assert!(outcome.is_success(), "{:?}", outcome.error);
        let Some(ChartTable::Stacked(table)) = outcome.table else {
            panic!("expected a stacked table");
        };
        assert_eq!(table.queries, vec!["Q1.1", "Q1.2"]);
        assert_eq!(table.symbols.last().map(String::as_str), Some("other"));
    }

    #[test]
    fn test_run_all_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixture_config(dir.path());
        config.general.hardware = vec!["testbox".to_string(), "missing".to_string()];
        let passes = plan_passes(&config, &[Workload::Tatp, Workload::Ssb, Workload::Blob]).unwrap();
        let expected = stems(&passes);

        let outcomes = tokio_test::block_on(run_all(Arc::new(config), passes, false));

        let order: Vec<String> = outcomes.iter().map(|o| o.pass.artifact_stem()).collect();
        assert_eq!(order, expected);

        let (ok, failed): (Vec<_>, Vec<_>) = outcomes.iter().partition(|o| o.is_success());
        assert_eq!(ok.len(), 5);
        assert_eq!(failed.len(), 5);
        assert!(ok.iter().all(|o| o.pass.hardware == "testbox"));
        assert!(dir.path().join("ssb_bloom_testbox.svg").is_file());
        assert!(dir.path().join("blob_10_MB_testbox.svg").is_file());
    }
}
