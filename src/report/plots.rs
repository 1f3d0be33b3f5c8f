//! SVG chart rendering.
//!
//! Grouped bar charts for aggregated wide tables and stacked bar charts
//! for CPU profiles, drawn with `plotters`. Every cosmetic value comes
//! from the resolved [`ChartStyle`].

use crate::config::{ChartConfig, ChartStyle, LegendPosition};
use crate::models::{ProfileTable, WideTable};
use anyhow::{bail, Context, Result};
use plotters::coord::ranged1d::{AsRangedCoord, ValueFormatter};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

const FONT: &str = "sans-serif";
const FONT_SIZE: u32 = 12;
const LABEL_SIZE: u32 = 10;

/// Compact scientific notation used for bar labels, e.g. `2e4`.
pub fn sci_label(value: f64) -> String {
    format!("{:.0e}", value)
}

/// Parse a `#rrggbb` color.
pub fn parse_color(text: &str) -> Result<RGBColor> {
    let hex = text.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        bail!("invalid color '{}', expected #rrggbb", text);
    }

    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .with_context(|| format!("invalid color '{}', expected #rrggbb", text))
    };

    Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

/// Colors for `count` series, cycling the configured palette.
fn palette(style: &ChartStyle, count: usize) -> Result<Vec<RGBColor>> {
    if style.colors.is_empty() {
        bail!("chart style has no colors");
    }

    let colors = style
        .colors
        .iter()
        .map(|c| parse_color(c))
        .collect::<Result<Vec<_>>>()?;

    Ok((0..count).map(|i| colors[i % colors.len()]).collect())
}

fn legend_position(position: LegendPosition) -> Option<SeriesLabelPosition> {
    match position {
        LegendPosition::UpperLeft => Some(SeriesLabelPosition::UpperLeft),
        LegendPosition::UpperMiddle => Some(SeriesLabelPosition::UpperMiddle),
        LegendPosition::UpperRight => Some(SeriesLabelPosition::UpperRight),
        LegendPosition::Hidden => None,
    }
}

/// Resolve the y axis limits from the style, or from the data when unset.
fn y_limits(style: &ChartStyle, table: &WideTable) -> Result<(f64, f64)> {
    let (lo, hi) = match style.y_range {
        Some([lo, hi]) => (lo, hi),
        None if style.log_y => {
            let floor = table.floor().unwrap_or(1.0);
            (floor / 2.0, table.peak().max(floor) * 4.0)
        }
        None => (0.0, table.peak().max(1.0) * 1.15),
    };

    if !(lo < hi) {
        bail!("invalid y range [{}, {}]", lo, hi);
    }
    if style.log_y && lo <= 0.0 {
        bail!("log-scaled y range must start above zero, got {}", lo);
    }

    Ok((lo, hi))
}

/// Render a grouped bar chart of `table` to an SVG file.
///
/// Bars are laid out one group per row and one bar per system column,
/// in column order.
pub fn render_bars(
    path: &Path,
    table: &WideTable,
    chart: &ChartConfig,
    style: &ChartStyle,
) -> Result<()> {
    let (lo, hi) = y_limits(style, table)?;

    let rendered = if style.log_y {
        draw_grouped(path, table, chart, style, (lo..hi).log_scale(), lo, hi)
    } else {
        draw_grouped(path, table, chart, style, lo..hi, lo, hi)
    };

    rendered.with_context(|| format!("Failed to render {}", path.display()))
}

fn draw_grouped<Y>(
    path: &Path,
    table: &WideTable,
    config: &ChartConfig,
    style: &ChartStyle,
    y_coord: Y,
    y_lo: f64,
    y_hi: f64,
) -> Result<()>
where
    Y: AsRangedCoord<Value = f64>,
    Y::CoordDescType: ValueFormatter<f64>,
{
    let n_keys = table.rows.len();
    let n_systems = table.systems.len();
    if n_keys == 0 || n_systems == 0 {
        bail!("nothing to plot");
    }

    let colors = palette(style, n_systems)?;
    let x_max = n_keys as f64;

    let root = SVGBackend::new(path, (style.size[0], style.size[1])).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max, y_coord)?;

    let fixed_ticks = !style.y_ticks.is_empty();
    let no_label = |_: &f64| String::new();
    let y_fmt = |y: &f64| {
        if fixed_ticks {
            String::new()
        } else if style.log_y {
            sci_label(*y)
        } else {
            format!("{:.0}", y)
        }
    };

    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .x_desc(style.x_desc.as_str())
        .y_desc(style.y_desc.as_str())
        .x_label_formatter(&no_label)
        .y_label_formatter(&y_fmt)
        .label_style((FONT, FONT_SIZE));
    if fixed_ticks {
        mesh.disable_y_mesh();
    }
    mesh.draw()?;

    let label_style = (FONT, FONT_SIZE).into_font().color(&BLACK);

    for &tick in style.y_ticks.iter().filter(|t| (y_lo..=y_hi).contains(*t)) {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(0.0, tick), (x_max, tick)],
            BLACK.mix(0.15).stroke_width(1),
        )))?;
        let (px, py) = chart.backend_coord(&(0.0, tick));
        let text = if style.log_y {
            sci_label(tick)
        } else {
            format!("{}", tick)
        };
        root.draw(&Text::new(
            text,
            (px - 6, py),
            label_style.clone().pos(Pos::new(HPos::Right, VPos::Center)),
        ))?;
    }

    for (k, row) in table.rows.iter().enumerate() {
        let label = style
            .x_tick_labels
            .get(k)
            .cloned()
            .unwrap_or_else(|| row.key.clone());
        let (px, py) = chart.backend_coord(&(k as f64 + 0.5, y_lo));
        root.draw(&Text::new(
            label,
            (px, py + 6),
            label_style.clone().pos(Pos::new(HPos::Center, VPos::Top)),
        ))?;
    }

    let group_width = style.bar_width.clamp(0.05, 1.0);
    let bar_width = group_width / n_systems as f64;
    let pad = (1.0 - group_width) / 2.0;
    let annotation_style = (FONT, LABEL_SIZE)
        .into_font()
        .color(&BLACK.mix(0.8))
        .pos(Pos::new(HPos::Center, VPos::Top));

    for (s, system) in table.systems.iter().enumerate() {
        let color = colors[s];
        let bars: Vec<Rectangle<(f64, f64)>> = table
            .rows
            .iter()
            .enumerate()
            .filter_map(|(k, row)| {
                let point = row.cells.get(s).copied().flatten()?;
                if style.log_y && point.mean <= 0.0 {
                    return None;
                }
                let x0 = k as f64 + pad + s as f64 * bar_width;
                let top = point.mean.clamp(y_lo, y_hi);
                Some(Rectangle::new([(x0, y_lo), (x0 + bar_width, top)], color.filled()))
            })
            .collect();

        chart
            .draw_series(bars)?
            .label(config.label(s, system))
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));

        for (k, row) in table.rows.iter().enumerate() {
            let Some(point) = row.cells.get(s).copied().flatten() else {
                continue;
            };
            let center = k as f64 + pad + (s as f64 + 0.5) * bar_width;

            if style.error_bars {
                let err = point.error_bar();
                let (lo, hi) = (point.mean - err.lo, point.mean + err.hi);
                let cap = bar_width * 0.25;
                let whisker = BLACK.stroke_width(1);
                chart.draw_series([
                    PathElement::new(vec![(center, lo), (center, hi)], whisker),
                    PathElement::new(vec![(center - cap, lo), (center + cap, lo)], whisker),
                    PathElement::new(vec![(center - cap, hi), (center + cap, hi)], whisker),
                ])?;
            }

            if point.mean <= 0.0 {
                continue;
            }
            if let Some(y) = style.annotation.anchor(s * n_keys + k, point.mean) {
                chart.draw_series(std::iter::once(Text::new(
                    sci_label(point.mean),
                    (center, y),
                    annotation_style.clone(),
                )))?;
            }
        }
    }

    if let Some(position) = legend_position(style.legend) {
        chart
            .configure_series_labels()
            .position(position)
            .margin(8)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK.mix(0.3))
            .label_font((FONT, FONT_SIZE))
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// Render a stacked bar chart of a profile table to an SVG file.
pub fn render_profile(path: &Path, table: &ProfileTable, style: &ChartStyle) -> Result<()> {
    draw_stacked(path, table, style)
        .with_context(|| format!("Failed to render {}", path.display()))
}

fn draw_stacked(path: &Path, table: &ProfileTable, style: &ChartStyle) -> Result<()> {
    let n_queries = table.queries.len();
    if n_queries == 0 || table.symbols.is_empty() {
        bail!("nothing to plot");
    }

    let colors = palette(style, table.symbols.len())?;
    let peak = (0..n_queries).map(|q| table.row_total(q)).max().unwrap_or(0) as f64;
    let (y_lo, y_hi) = match style.y_range {
        Some([lo, hi]) if lo < hi => (lo, hi),
        Some([lo, hi]) => bail!("invalid y range [{}, {}]", lo, hi),
        None => (0.0, peak.max(1.0) * 1.1),
    };
    let x_max = n_queries as f64;

    let root = SVGBackend::new(path, (style.size[0], style.size[1])).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..x_max, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(style.x_desc.as_str())
        .y_desc(style.y_desc.as_str())
        .x_label_formatter(&|_| String::new())
        .y_label_formatter(&|y| sci_label(*y))
        .label_style((FONT, FONT_SIZE))
        .draw()?;

    let label_style = (FONT, FONT_SIZE)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    for (q, query) in table.queries.iter().enumerate() {
        let label = style.x_tick_labels.get(q).unwrap_or(query).clone();
        let (px, py) = chart.backend_coord(&(q as f64 + 0.5, y_lo));
        root.draw(&Text::new(label, (px, py + 6), label_style.clone()))?;
    }

    let width = style.bar_width.clamp(0.05, 1.0);
    let pad = (1.0 - width) / 2.0;
    let mut base = vec![0.0f64; n_queries];

    for (s, symbol) in table.symbols.iter().enumerate() {
        let color = colors[s];
        let segments: Vec<Rectangle<(f64, f64)>> = (0..n_queries)
            .map(|q| {
                let ticks = table.ticks[q].get(s).copied().unwrap_or(0) as f64;
                let x0 = q as f64 + pad;
                let bottom = base[q];
                base[q] += ticks;
                Rectangle::new([(x0, bottom), (x0 + width, bottom + ticks)], color.filled())
            })
            .collect();

        chart
            .draw_series(segments)?
            .label(symbol.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    if let Some(position) = legend_position(style.legend) {
        chart
            .configure_series_labels()
            .position(position)
            .margin(8)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK.mix(0.3))
            .label_font((FONT, LABEL_SIZE))
            .draw()?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{aggregate, pivot};
    use crate::config::{Annotation, Config};
    use crate::models::TrialRecord;

    fn sample_table() -> WideTable {
        let records = vec![
            TrialRecord::new("1000", "sqlite_WAL", 9000.0),
            TrialRecord::new("1000", "sqlite_WAL", 11000.0),
            TrialRecord::new("1000", "sqlite_DELETE", 2500.0),
            TrialRecord::new("1000", "duckdb", 120.0),
            TrialRecord::new("10000", "sqlite_WAL", 8000.0),
            TrialRecord::new("10000", "sqlite_DELETE", 2000.0),
            TrialRecord::new("10000", "duckdb", 80.0),
        ];
        pivot(&aggregate(&records), "records")
    }

    #[test]
    fn test_sci_label() {
        assert_eq!(sci_label(10000.0), "1e4");
        assert_eq!(sci_label(500000.0), "5e5");
        assert_eq!(sci_label(120.0), "1e2");
        assert_eq!(sci_label(7.0), "7e0");
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#0173b2").unwrap(), RGBColor(1, 115, 178));
        assert_eq!(parse_color("de8f05").unwrap(), RGBColor(222, 143, 5));
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("#zzzzzz").is_err());
    }

    #[test]
    fn test_y_limits() {
        let table = sample_table();
        let mut style = ChartStyle::default();

        let (lo, hi) = y_limits(&style, &table).unwrap();
        assert_eq!(lo, 0.0);
        assert!(hi > 11000.0);

        style.log_y = true;
        let (lo, hi) = y_limits(&style, &table).unwrap();
        assert_eq!(lo, 40.0);
        assert_eq!(hi, 44000.0);

        style.y_range = Some([0.0, 10.0]);
        assert!(y_limits(&style, &table).is_err());

        style.log_y = false;
        style.y_range = Some([5.0, 5.0]);
        assert!(y_limits(&style, &table).is_err());
    }

    #[test]
    fn test_render_log_bars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tatp_test.svg");
        let chart = Config::default().tatp.chart;
        let style = chart.style_for("test", None);

        render_bars(&path, &sample_table(), &chart, &style).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("SQLite-WAL"));
        assert!(svg.contains("Subscriber Records"));
        assert!(svg.contains("1e4"));
    }

    #[test]
    fn test_render_linear_bars_with_error_bars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob_test.svg");
        let mut chart = Config::default().blob.chart;
        chart.labels.clear();
        let mut style = chart.style.clone();
        style.y_range = None;
        style.annotation = Annotation::Offset {
            offset: 100.0,
            nudges: Vec::new(),
        };

        render_bars(&path, &sample_table(), &chart, &style).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        // Without configured labels the legend falls back to system names
        assert!(svg.contains("sqlite_DELETE"));
        assert!(svg.contains("90%"));
    }

    #[test]
    fn test_render_empty_table_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.svg");
        let table = WideTable {
            grouping: "records".to_string(),
            systems: Vec::new(),
            rows: Vec::new(),
        };
        let chart = Config::default().tatp.chart;

        let err = render_bars(&path, &table, &chart, &chart.style).unwrap_err();
        assert!(format!("{:#}", err).contains("nothing to plot"));
    }

    #[test]
    fn test_render_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile_vanilla.svg");
        let table = ProfileTable {
            queries: vec!["Q1.1".to_string(), "Q1.2".to_string()],
            symbols: vec!["sqlite3VdbeExec".to_string(), "other".to_string()],
            ticks: vec![vec![900, 100], vec![600, 50]],
        };
        let style = Config::default().profile.chart.style;

        render_profile(&path, &table, &style).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("sqlite3VdbeExec"));
        assert!(svg.contains("Q1.2"));
        assert!(svg.contains("TSC ticks"));
    }
}
