//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observations: `o`
//! - time-series lines and scatter trendlines: `-`

use crate::viz::{ScatterChart, TimeSeriesChart};

/// Render one country's indicator history.
pub fn render_timeseries_plot(chart: &TimeSeriesChart, width: usize, height: usize) -> String {
    let points = chart.defined_points();
    let lines = chart.segments();
    render_plot(&chart.title, "year", &chart.indicator, &lines, &points, width, height)
}

/// Render a scatter chart with its trendline (when one was fitted).
pub fn render_scatter_plot(chart: &ScatterChart, width: usize, height: usize) -> String {
    let points = chart.xy();
    let mut lines = Vec::new();
    if let (Some(trend), Some((x_min, x_max))) = (chart.trendline, x_range(&points)) {
        lines.push(vec![
            (x_min, trend.predict(x_min)),
            (x_max, trend.predict(x_max)),
        ]);
    }
    render_plot(&chart.title, &chart.x_label, &chart.y_label, &lines, &points, width, height)
}

fn render_plot(
    title: &str,
    x_label: &str,
    y_label: &str,
    lines: &[Vec<(f64, f64)>],
    points: &[(f64, f64)],
    width: usize,
    height: usize,
) -> String {
    let Some((x_min, x_max)) = x_range(points) else {
        return format!("Plot: {title}\n(no data)\n");
    };

    let width = width.max(10);
    let height = height.max(5);

    let all_y = points
        .iter()
        .chain(lines.iter().flatten())
        .map(|&(_, y)| y);
    let (y_min, y_max) = value_range(all_y).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw lines first (so points can overlay).
    for line in lines {
        for pair in line.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            draw_line(
                &mut grid,
                map_x(x0, x_min, x_max, width),
                map_y(y0, y_min, y_max, height),
                map_x(x1, x_min, x_max, width),
                map_y(y1, y_min, y_max, height),
                '-',
            );
        }
    }

    for &(x, y) in points {
        grid[map_y(y, y_min, y_max, height)][map_x(x, x_min, x_max, width)] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {title} | {x_label}=[{x_min:.2}, {x_max:.2}] | {y_label}=[{y_min:.2}, {y_max:.2}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn x_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    value_range(points.iter().map(|&(x, _)| x))
}

/// Min/max of `values`, widened by 0.5 each way when they coincide.
fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if !(min.is_finite() && max.is_finite()) {
        return None;
    }
    if max > min {
        Some((min, max))
    } else {
        Some((min - 0.5, max + 0.5))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
