//! Chart descriptions built from pipeline tables.
//!
//! These are render-agnostic and serializable: the terminal renderers in
//! `plot`/`tui` draw them, and `io::export` can write them as JSON for any
//! other front-end.

use serde::{Deserialize, Serialize};

use crate::data::worldbank::{is_country_code, normalize_country_code};
use crate::domain::{CrossSection, IndicatorTable, Panel};
use crate::error::AppError;
use crate::math::{LineFit, fit_line};

pub const NO_MAP_DATA_TITLE: &str = "No data available for this indicator";

/// Viridis anchor colors, low to high.
const VIRIDIS: [[u8; 3]; 5] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [253, 231, 37],
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub value: Option<f64>,
}

/// One indicator over time for one country. Null years are kept as gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesChart {
    pub title: String,
    pub country_code: String,
    pub country_name: Option<String>,
    pub indicator: String,
    pub points: Vec<SeriesPoint>,
}

impl TimeSeriesChart {
    /// `(year, value)` pairs with a value.
    pub fn defined_points(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .filter_map(|p| p.value.map(|v| (p.year as f64, v)))
            .collect()
    }

    /// Runs of consecutive defined points, split at null years.
    pub fn segments(&self) -> Vec<Vec<(f64, f64)>> {
        let mut out = Vec::new();
        let mut current = Vec::new();
        for p in &self.points {
            match p.value {
                Some(v) => current.push((p.year as f64, v)),
                None if !current.is_empty() => out.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.points.iter().all(|p| p.value.is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub country_code: String,
    pub country_name: String,
    pub x: f64,
    pub y: f64,
}

/// Two indicators against each other, with an OLS trendline when defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<ScatterPoint>,
    pub trendline: Option<LineFit>,
}

impl ScatterChart {
    pub fn xy(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(|p| (p.x, p.y)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub iso3: String,
    pub country_name: String,
    pub value: f64,
}

/// Country values keyed by ISO-3 code, on a continuous color scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoroplethMap {
    pub title: String,
    pub value_column: String,
    pub entries: Vec<MapEntry>,
    /// `(min, max)` of the mapped values; `None` when there are no entries.
    pub range: Option<(f64, f64)>,
}

impl ChoroplethMap {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of `value` on the scale, in `[0, 1]`.
    pub fn scale_position(&self, value: f64) -> f64 {
        match self.range {
            Some((lo, hi)) if hi > lo => ((value - lo) / (hi - lo)).clamp(0.0, 1.0),
            _ => 0.5,
        }
    }

    pub fn color_of(&self, value: f64) -> [u8; 3] {
        viridis(self.scale_position(value))
    }
}

/// Sample the Viridis scale at `u ∈ [0, 1]`.
pub fn viridis(u: f64) -> [u8; 3] {
    let u = if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = u * (VIRIDIS.len() - 1) as f64;
    let lo = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let t = scaled - lo as f64;
    let (a, b) = (VIRIDIS[lo], VIRIDIS[lo + 1]);
    let mix = |i: usize| (a[i] as f64 + (b[i] as f64 - a[i] as f64) * t).round() as u8;
    [mix(0), mix(1), mix(2)]
}

fn require_column(table: &IndicatorTable, column: &str) -> Result<usize, AppError> {
    table.column_index(column).ok_or_else(|| {
        AppError::usage(format!(
            "Unknown indicator column '{column}'. Available: {}.",
            table.indicators().join(", ")
        ))
    })
}

/// Year-ordered series of `indicator` for one country.
pub fn timeseries(
    panel: &Panel,
    country_code: &str,
    indicator: &str,
    title: Option<&str>,
) -> Result<TimeSeriesChart, AppError> {
    let idx = require_column(panel, indicator)?;
    let code = normalize_country_code(country_code);

    let (country_name, points) = {
        let mut rows: Vec<_> = panel.rows_for(&code).collect();
        rows.sort_by_key(|r| r.year);
        let points: Vec<SeriesPoint> = rows
            .iter()
            .map(|r| SeriesPoint {
                year: r.year,
                value: r.value(idx),
            })
            .collect();
        (rows.first().map(|r| r.country_name.clone()), points)
    };

    Ok(TimeSeriesChart {
        title: title
            .map(str::to_string)
            .unwrap_or_else(|| format!("{indicator} — {code}")),
        country_name,
        points,
        country_code: code,
        indicator: indicator.to_string(),
    })
}

/// `y` against `x` over rows where both are present, plus a trendline.
pub fn scatter_rel(
    table: &CrossSection,
    x: &str,
    y: &str,
    title: Option<&str>,
) -> Result<ScatterChart, AppError> {
    let xi = require_column(table, x)?;
    let yi = require_column(table, y)?;

    let points: Vec<ScatterPoint> = table
        .rows()
        .iter()
        .filter_map(|r| {
            Some(ScatterPoint {
                country_code: r.country_code.clone(),
                country_name: r.country_name.clone(),
                x: r.value(xi)?,
                y: r.value(yi)?,
            })
        })
        .collect();

    let xy: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();

    Ok(ScatterChart {
        title: title
            .map(str::to_string)
            .unwrap_or_else(|| format!("{y} vs {x}")),
        x_label: x.to_string(),
        y_label: y.to_string(),
        trendline: fit_line(&xy),
        points,
    })
}

/// Map-ready values of `value_column`, one entry per valid ISO-3 code.
///
/// Codes are re-normalized and non-3-letter codes and nulls are dropped, so
/// the map is only blank when there is truly nothing to show.
pub fn choropleth_latest(
    table: &CrossSection,
    value_column: &str,
    title: Option<&str>,
) -> Result<ChoroplethMap, AppError> {
    let idx = require_column(table, value_column)?;

    let mut entries: Vec<MapEntry> = table
        .rows()
        .iter()
        .filter_map(|r| {
            let iso3 = normalize_country_code(&r.country_code);
            if !is_country_code(&iso3) {
                return None;
            }
            Some(MapEntry {
                iso3,
                country_name: r.country_name.clone(),
                value: r.value(idx)?,
            })
        })
        .collect();
    entries.sort_by(|a, b| a.iso3.cmp(&b.iso3));
    entries.dedup_by(|b, a| a.iso3 == b.iso3);

    if entries.is_empty() {
        return Ok(ChoroplethMap {
            title: NO_MAP_DATA_TITLE.to_string(),
            value_column: value_column.to_string(),
            entries,
            range: None,
        });
    }

    let range = entries.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| {
        (lo.min(e.value), hi.max(e.value))
    });

    Ok(ChoroplethMap {
        title: title
            .map(str::to_string)
            .unwrap_or_else(|| format!("{value_column} (latest)")),
        value_column: value_column.to_string(),
        entries,
        range: Some(range),
    })
}
