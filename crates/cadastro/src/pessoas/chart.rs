//! Bar chart rendering for the daily registration counts.

use std::fmt::Write as _;

use super::domain::DailyCount;

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 320.0;
const MARGIN_LEFT: f64 = 56.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 16.0;
const MARGIN_BOTTOM: f64 = 64.0;
/// Fraction of each slot left empty between bars.
const BAR_GAP: f64 = 0.8;
const BAR_COLOR: &str = "#636efa";

/// Data handed to a chart renderer: one bar per x value.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub x_values: Vec<String>,
    pub y_values: Vec<u32>,
    pub x_label: String,
    pub y_label: String,
}

impl BarChart {
    /// Chart of registrations per day, keyed by `YYYY-MM-DD`.
    pub fn registrations(counts: &[DailyCount]) -> Self {
        Self {
            x_values: counts
                .iter()
                .map(|entry| entry.date.format("%Y-%m-%d").to_string())
                .collect(),
            y_values: counts.iter().map(|entry| entry.count).collect(),
            x_label: "Data".to_string(),
            y_label: "Quantidade".to_string(),
        }
    }
}

/// Produces markup that can be embedded directly in an HTML page.
pub trait ChartRenderer: Send + Sync {
    fn bar_chart(&self, chart: &BarChart) -> String;
}

/// Inline SVG renderer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgBarChart;

impl ChartRenderer for SvgBarChart {
    fn bar_chart(&self, chart: &BarChart) -> String {
        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" class="chart" viewBox="0 0 {WIDTH} {HEIGHT}" role="img" aria-label="{y} por {x}">"#,
            x = escape(&chart.x_label),
            y = escape(&chart.y_label),
        );

        let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let baseline = MARGIN_TOP + plot_height;

        let _ = write!(
            svg,
            r##"<line x1="{MARGIN_LEFT}" y1="{baseline}" x2="{right}" y2="{baseline}" stroke="#444"/><line x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{baseline}" stroke="#444"/>"##,
            right = WIDTH - MARGIN_RIGHT,
        );

        let bars = chart.x_values.len().min(chart.y_values.len());
        if bars == 0 {
            let _ = write!(
                svg,
                r#"<text x="{cx}" y="{cy}" text-anchor="middle">Nenhum cadastro</text>"#,
                cx = MARGIN_LEFT + plot_width / 2.0,
                cy = MARGIN_TOP + plot_height / 2.0,
            );
        } else {
            let max = chart.y_values.iter().take(bars).copied().max().unwrap_or(0).max(1);
            let slot = plot_width / bars as f64;
            let bar_width = slot * (1.0 - BAR_GAP);

            for tick in 0..=max.min(5) {
                let value = (f64::from(max) * f64::from(tick) / f64::from(max.min(5))).round();
                let y = baseline - plot_height * value / f64::from(max);
                let _ = write!(
                    svg,
                    r#"<text x="{tx}" y="{ty:.1}" text-anchor="end" font-size="11">{value}</text>"#,
                    tx = MARGIN_LEFT - 6.0,
                    ty = y + 4.0,
                );
            }

            for (index, (label, count)) in chart
                .x_values
                .iter()
                .zip(chart.y_values.iter())
                .enumerate()
            {
                let height = plot_height * f64::from(*count) / f64::from(max);
                let x = MARGIN_LEFT + slot * index as f64 + (slot - bar_width) / 2.0;
                let center = x + bar_width / 2.0;
                let _ = write!(
                    svg,
                    r#"<rect x="{x:.1}" y="{y:.1}" width="{bar_width:.1}" height="{height:.1}" fill="{BAR_COLOR}"><title>{label}: {count}</title></rect>"#,
                    y = baseline - height,
                    label = escape(label),
                );
                let _ = write!(
                    svg,
                    r#"<text x="{center:.1}" y="{ty}" text-anchor="middle" font-size="11">{label}</text>"#,
                    ty = baseline + 16.0,
                    label = escape(label),
                );
            }
        }

        let _ = write!(
            svg,
            r#"<text x="{cx}" y="{by}" text-anchor="middle">{x}</text><text x="14" y="{cy}" text-anchor="middle" transform="rotate(-90 14 {cy})">{y}</text></svg>"#,
            cx = MARGIN_LEFT + plot_width / 2.0,
            by = HEIGHT - 16.0,
            cy = MARGIN_TOP + plot_height / 2.0,
            x = escape(&chart.x_label),
            y = escape(&chart.y_label),
        );

        svg
    }
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
