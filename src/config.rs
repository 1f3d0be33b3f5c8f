//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.benchplot.toml` files. Chart cosmetics are tuned per hardware
//! target and workload variant, so they live here as data.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".benchplot.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// TATP chart settings.
    #[serde(default)]
    pub tatp: TatpConfig,

    /// SSB filtering and chart settings.
    #[serde(default)]
    pub ssb: SsbConfig,

    /// Blob store chart settings.
    #[serde(default)]
    pub blob: BlobConfig,

    /// CPU profile chart settings.
    #[serde(default)]
    pub profile: ProfileConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding `tatp/`, `ssb/` and `blob/` inputs.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory charts are written to.
    #[serde(default = "default_plot_dir")]
    pub plot_dir: PathBuf,

    /// Number of plotting passes run at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Hardware targets to plot. Empty means discover from input file names.
    #[serde(default)]
    pub hardware: Vec<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            plot_dir: default_plot_dir(),
            concurrency: default_concurrency(),
            verbose: false,
            hardware: Vec::new(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_plot_dir() -> PathBuf {
    PathBuf::from("plots")
}

fn default_concurrency() -> usize {
    4
}

/// Where a bar's value label is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Annotation {
    /// No value labels.
    None,
    /// Label at `height * factor`; suits log-scaled axes.
    Scale { factor: f64 },
    /// Label at `height + offset`, plus a per-bar nudge.
    Offset {
        offset: f64,
        #[serde(default)]
        nudges: Vec<Nudge>,
    },
}

/// Extra offset for a single bar, indexed series-major (all bars of the
/// first system, then the second, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nudge {
    pub bar: usize,
    pub offset: f64,
}

impl Annotation {
    /// Y coordinate of the label for a bar of `height` at `bar` index.
    pub fn anchor(&self, bar: usize, height: f64) -> Option<f64> {
        match self {
            Annotation::None => None,
            Annotation::Scale { factor } => Some(height * factor),
            Annotation::Offset { offset, nudges } => {
                let nudge: f64 = nudges
                    .iter()
                    .filter(|n| n.bar == bar)
                    .map(|n| n.offset)
                    .sum();
                Some(height + offset + nudge)
            }
        }
    }
}

/// Corner the legend is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegendPosition {
    UpperLeft,
    #[default]
    UpperMiddle,
    UpperRight,
    /// No legend.
    Hidden,
}

/// Visual settings of one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartStyle {
    #[serde(default)]
    pub x_desc: String,

    #[serde(default)]
    pub y_desc: String,

    /// Log-scaled y axis.
    #[serde(default)]
    pub log_y: bool,

    /// Y axis limits. Derived from the data when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_range: Option<[f64; 2]>,

    /// Y values to label. Derived from the range when empty.
    #[serde(default)]
    pub y_ticks: Vec<f64>,

    /// Fraction of each group's width covered by its bars.
    #[serde(default = "default_bar_width")]
    pub bar_width: f64,

    /// Chart size in pixels.
    #[serde(default = "default_size")]
    pub size: [u32; 2],

    /// Draw min/max whiskers on each bar.
    #[serde(default)]
    pub error_bars: bool,

    #[serde(default = "default_annotation")]
    pub annotation: Annotation,

    /// Replacement labels for the grouping keys, in row order.
    #[serde(default)]
    pub x_tick_labels: Vec<String>,

    #[serde(default)]
    pub legend: LegendPosition,

    /// Bar colors as `#rrggbb`, one per system column.
    #[serde(default = "colorblind_palette")]
    pub colors: Vec<String>,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            x_desc: String::new(),
            y_desc: String::new(),
            log_y: false,
            y_range: None,
            y_ticks: Vec::new(),
            bar_width: default_bar_width(),
            size: default_size(),
            error_bars: false,
            annotation: default_annotation(),
            x_tick_labels: Vec::new(),
            legend: LegendPosition::default(),
            colors: colorblind_palette(),
        }
    }
}

fn default_bar_width() -> f64 {
    0.8
}

fn default_size() -> [u32; 2] {
    [580, 250]
}

fn default_annotation() -> Annotation {
    Annotation::None
}

/// Colorblind-safe palette.
fn colorblind_palette() -> Vec<String> {
    vec![
        "#0173b2", "#de8f05", "#029e73", "#d55e00", "#cc78bc", "#ca9161", "#fbafe4", "#949494",
        "#ece133", "#56b4e9",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Same palette with the second and third colors swapped.
fn swapped_palette() -> Vec<String> {
    let mut palette = colorblind_palette();
    palette.swap(1, 2);
    palette
}

/// Partial style applied on top of a chart's base style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_range: Option<[f64; 2]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_ticks: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_width: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<[u32; 2]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_bars: Option<bool>,
}

impl ChartStyle {
    /// Apply the set fields of an override.
    pub fn apply(&mut self, patch: &StyleOverride) {
        if let Some(range) = patch.y_range {
            self.y_range = Some(range);
        }
        if let Some(ref ticks) = patch.y_ticks {
            self.y_ticks = ticks.clone();
        }
        if let Some(width) = patch.bar_width {
            self.bar_width = width;
        }
        if let Some(size) = patch.size {
            self.size = size;
        }
        if let Some(ref annotation) = patch.annotation {
            self.annotation = annotation.clone();
        }
        if let Some(error_bars) = patch.error_bars {
            self.error_bars = error_bars;
        }
    }
}

/// Systems, legend labels and styling of one chart kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Systems every chart must show, in display order.
    #[serde(default)]
    pub systems: Vec<String>,

    /// Legend label per system. Falls back to the system name.
    #[serde(default)]
    pub labels: Vec<String>,

    #[serde(default)]
    pub style: ChartStyle,

    /// Style overrides keyed by `<variant>/<hw>`, `<hw>` or `<variant>`.
    #[serde(default)]
    pub overrides: BTreeMap<String, StyleOverride>,
}

impl ChartConfig {
    /// Resolve the style for a hardware target and optional variant.
    ///
    /// Overrides apply from least to most specific: variant, hardware,
    /// then the combined key.
    pub fn style_for(&self, hardware: &str, variant: Option<&str>) -> ChartStyle {
        let mut style = self.style.clone();

        let mut keys = Vec::with_capacity(3);
        if let Some(variant) = variant {
            keys.push(variant.to_string());
        }
        keys.push(hardware.to_string());
        if let Some(variant) = variant {
            keys.push(format!("{}/{}", variant, hardware));
        }

        for key in keys {
            if let Some(patch) = self.overrides.get(&key) {
                style.apply(patch);
            }
        }

        style
    }

    /// Legend label for the system at `index`.
    pub fn label(&self, index: usize, system: &str) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| system.to_string())
    }
}

/// TATP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TatpConfig {
    #[serde(default = "default_tatp_chart")]
    pub chart: ChartConfig,
}

impl Default for TatpConfig {
    fn default() -> Self {
        Self {
            chart: default_tatp_chart(),
        }
    }
}

fn default_tatp_chart() -> ChartConfig {
    ChartConfig {
        systems: strings(&["sqlite_WAL", "sqlite_DELETE", "duckdb"]),
        labels: strings(&["SQLite-WAL", "SQLite-DELETE", "DuckDB"]),
        style: ChartStyle {
            x_desc: "Subscriber Records".to_string(),
            y_desc: "Throughput (TPS)".to_string(),
            log_y: true,
            y_range: Some([2.0, 5e5]),
            y_ticks: vec![1e1, 1e2, 1e3, 1e4],
            bar_width: 0.63,
            annotation: Annotation::Scale { factor: 2.8 },
            colors: swapped_palette(),
            ..ChartStyle::default()
        },
        overrides: BTreeMap::new(),
    }
}

/// SSB settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsbConfig {
    /// Only rows run with this cache size are plotted.
    #[serde(default = "default_cache_size")]
    pub cache_size: String,

    /// Scale factor plotted when a hardware target has no entry in `scale`.
    #[serde(default = "default_scale")]
    pub default_scale: u32,

    /// Scale factor per hardware target.
    #[serde(default = "default_scale_map")]
    pub scale: BTreeMap<String, u32>,

    /// Query latency columns, in display order.
    #[serde(default = "default_queries")]
    pub queries: Vec<String>,

    /// Multiplier applied to every latency (seconds to milliseconds).
    #[serde(default = "default_latency_scale")]
    pub latency_scale: f64,

    /// Chart without the Bloom filter variant.
    #[serde(default = "default_ssb_chart")]
    pub chart: ChartConfig,

    /// Chart including the Bloom filter variant.
    #[serde(default = "default_ssb_bloom_chart")]
    pub bloom_chart: ChartConfig,
}

impl Default for SsbConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
            default_scale: default_scale(),
            scale: default_scale_map(),
            queries: default_queries(),
            latency_scale: default_latency_scale(),
            chart: default_ssb_chart(),
            bloom_chart: default_ssb_bloom_chart(),
        }
    }
}

impl SsbConfig {
    /// Scale factor for a hardware target.
    pub fn scale_for(&self, hardware: &str) -> u32 {
        self.scale
            .get(hardware)
            .copied()
            .unwrap_or(self.default_scale)
    }
}

fn default_cache_size() -> String {
    "1 GB".to_string()
}

fn default_scale() -> u32 {
    5
}

fn default_scale_map() -> BTreeMap<String, u32> {
    [("rpi".to_string(), 1)].into_iter().collect()
}

fn default_queries() -> Vec<String> {
    strings(&[
        "Q1.1", "Q1.2", "Q1.3", "Q2.1", "Q2.2", "Q2.3", "Q3.1", "Q3.2", "Q3.3", "Q3.4", "Q4.1",
        "Q4.2", "Q4.3",
    ])
}

fn default_latency_scale() -> f64 {
    1000.0
}

fn ssb_style() -> ChartStyle {
    ChartStyle {
        x_desc: "Query".to_string(),
        y_desc: "Latency (ms)".to_string(),
        log_y: true,
        y_range: Some([6e1, 1.6e5]),
        y_ticks: vec![1e2, 1e3, 1e4],
        bar_width: 0.75,
        size: [1230, 250],
        annotation: Annotation::Scale { factor: 1.85 },
        ..ChartStyle::default()
    }
}

fn default_ssb_chart() -> ChartConfig {
    ChartConfig {
        systems: strings(&["sqlite", "duckdb"]),
        labels: strings(&["SQLite", "DuckDB"]),
        style: ssb_style(),
        overrides: BTreeMap::new(),
    }
}

fn default_ssb_bloom_chart() -> ChartConfig {
    ChartConfig {
        systems: strings(&["sqlite", "sqlite_bloom", "duckdb"]),
        labels: strings(&["SQLite", "SQLite-LIP", "DuckDB"]),
        style: ChartStyle {
            bar_width: 0.85,
            colors: swapped_palette(),
            ..ssb_style()
        },
        overrides: BTreeMap::new(),
    }
}

/// Blob store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Blob sizes plotted, one chart each.
    #[serde(default = "default_blob_sizes")]
    pub sizes: Vec<String>,

    #[serde(default = "default_blob_chart")]
    pub chart: ChartConfig,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            sizes: default_blob_sizes(),
            chart: default_blob_chart(),
        }
    }
}

fn default_blob_sizes() -> Vec<String> {
    strings(&["100 KB", "10 MB"])
}

fn blob_limits(y_max: f64, offset: f64, nudge: Option<f64>) -> StyleOverride {
    StyleOverride {
        y_range: Some([0.0, y_max]),
        annotation: Some(Annotation::Offset {
            offset,
            nudges: nudge
                .map(|offset| vec![Nudge { bar: 6, offset }])
                .unwrap_or_default(),
        }),
        ..StyleOverride::default()
    }
}

fn default_blob_chart() -> ChartConfig {
    let overrides = [
        ("100 KB/c220g5", blob_limits(11000.0, 920.0, None)),
        ("100 KB/rpi", blob_limits(1700.0, 140.0, Some(60.0))),
        ("10 MB/c220g5", blob_limits(210.0, 17.0, None)),
        ("10 MB/rpi", blob_limits(35.0, 3.0, Some(1.5))),
    ]
    .into_iter()
    .map(|(key, patch)| (key.to_string(), patch))
    .collect();

    ChartConfig {
        systems: strings(&["sqlite-WAL", "sqlite-DELETE", "duckdb", "filesystem"]),
        labels: strings(&["SQLite-WAL", "SQLite-DELETE", "DuckDB", "Filesystem"]),
        style: ChartStyle {
            x_desc: "Read percentage".to_string(),
            y_desc: "Throughput (TPS)".to_string(),
            y_range: Some([0.0, 35.0]),
            bar_width: 0.85,
            error_bars: true,
            annotation: Annotation::Offset {
                offset: 3.0,
                nudges: Vec::new(),
            },
            x_tick_labels: strings(&["90%", "50%", "10%"]),
            legend: LegendPosition::UpperRight,
            colors: swapped_palette(),
            ..ChartStyle::default()
        },
        overrides,
    }
}

/// CPU profile settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Hardware target whose profiles are plotted.
    #[serde(default = "default_profile_hardware")]
    pub hardware: String,

    /// Profile configurations, one chart each.
    #[serde(default = "default_profile_configs")]
    pub configs: Vec<String>,

    /// Profiled queries, one bar each.
    #[serde(default = "default_queries")]
    pub queries: Vec<String>,

    /// Symbols whose peak ticks stay below this are folded into `other`.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default = "default_profile_chart")]
    pub chart: ChartConfig,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            hardware: default_profile_hardware(),
            configs: default_profile_configs(),
            queries: default_queries(),
            threshold: default_threshold(),
            chart: default_profile_chart(),
        }
    }
}

fn default_profile_hardware() -> String {
    "c220g5".to_string()
}

fn default_profile_configs() -> Vec<String> {
    strings(&["vanilla", "bloom"])
}

fn default_threshold() -> f64 {
    5e8
}

fn default_profile_chart() -> ChartConfig {
    ChartConfig {
        systems: Vec::new(),
        labels: Vec::new(),
        style: ChartStyle {
            x_desc: "query".to_string(),
            y_desc: "TSC ticks".to_string(),
            size: [800, 400],
            legend: LegendPosition::UpperLeft,
            ..ChartStyle::default()
        },
        overrides: BTreeMap::new(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data_dir) = args.data_dir {
            self.general.data_dir = data_dir.clone();
        }
        if let Some(ref plot_dir) = args.plot_dir {
            self.general.plot_dir = plot_dir.clone();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if let Some(ref hardware) = args.hardware {
            self.general.hardware = hardware.clone();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
