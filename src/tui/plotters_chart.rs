//! Plotters-powered indicator chart widget for Ratatui.
//!
//! Why Plotters instead of Ratatui's built-in `Chart` widget?
//! - nicer axis + mesh rendering
//! - less manual work for ticks/labels
//! - one widget covers both time series (lines) and scatter (points + trend)
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::viz::{ScatterChart, TimeSeriesChart};

/// Series and bounds prepared outside the render call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    /// Polylines: time-series segments or a trendline.
    pub lines: Vec<Vec<(f64, f64)>>,
    pub points: Vec<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: String,
    pub y_label: String,
}

impl ChartData {
    /// `None` when the chart has no plottable points.
    pub fn from_timeseries(chart: &TimeSeriesChart) -> Option<Self> {
        let points = chart.defined_points();
        let lines = chart.segments();
        let (x_bounds, y_bounds) = bounds(&points, &lines)?;
        Some(Self {
            lines,
            points,
            x_bounds,
            y_bounds,
            x_label: "year".to_string(),
            y_label: chart.indicator.clone(),
        })
    }

    pub fn from_scatter(chart: &ScatterChart) -> Option<Self> {
        let points = chart.xy();
        let (x_bounds, _) = bounds(&points, &[])?;
        let lines = match chart.trendline {
            Some(fit) => vec![vec![
                (x_bounds[0], fit.predict(x_bounds[0])),
                (x_bounds[1], fit.predict(x_bounds[1])),
            ]],
            None => Vec::new(),
        };
        let (_, y_bounds) = bounds(&points, &lines)?;
        Some(Self {
            lines,
            points,
            x_bounds,
            y_bounds,
            x_label: chart.x_label.clone(),
            y_label: chart.y_label.clone(),
        })
    }
}

/// Padded bounds over points and line vertices.
fn bounds(points: &[(f64, f64)], lines: &[Vec<(f64, f64)>]) -> Option<([f64; 2], [f64; 2])> {
    let mut x = [f64::INFINITY, f64::NEG_INFINITY];
    let mut y = [f64::INFINITY, f64::NEG_INFINITY];
    for &(px, py) in points.iter().chain(lines.iter().flatten()) {
        x = [x[0].min(px), x[1].max(px)];
        y = [y[0].min(py), y[1].max(py)];
    }
    if !(x[0].is_finite() && x[1].is_finite() && y[0].is_finite() && y[1].is_finite()) {
        return None;
    }
    Some((pad(x), pad(y)))
}

fn pad(b: [f64; 2]) -> [f64; 2] {
    if b[1] <= b[0] {
        return [b[0] - 0.5, b[1] + 0.5];
    }
    let pad = ((b[1] - b[0]) * 0.05).max(1e-12);
    [b[0] - pad, b[1] + pad]
}

/// Render-only chart over borrowed `ChartData`.
pub struct IndicatorPlottersChart<'a> {
    pub data: &'a ChartData,
    /// Formatting of tick labels.
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for IndicatorPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        // In that case, we render a small hint rather than panicking.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.data.x_bounds;
        let [y0, y1] = self.data.y_bounds;
        if x1 <= x0 || y1 <= y0 {
            return;
        }

        let data = self.data;
        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 8)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(data.x_label.as_str())
                .y_desc(data.y_label.as_str())
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let line_color = RGBColor(0, 255, 255); // cyan
            let point_color = WHITE;

            for line in &data.lines {
                chart.draw_series(LineSeries::new(line.iter().copied(), &line_color))?;
            }

            // `Circle` markers come out far too large through this backend;
            // a `Pixel` renders as a single dot.
            chart.draw_series(
                data.points
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), point_color)),
            )?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
