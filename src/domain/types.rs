//! Shared domain types.
//!
//! Every table produced by the pipeline uses the same strongly-typed layout:
//! identifier columns (`country_code`, `country_name`, `year`) as plain
//! fields, and one nullable float per indicator column. Coercion to `f64`
//! happens once at the fetch boundary, so downstream stages never see
//! string-typed values.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::IndicatorSelection;
use crate::error::AppError;

pub const COUNTRY_CODE: &str = "country_code";
pub const COUNTRY_NAME: &str = "country_name";
pub const YEAR: &str = "year";

/// Columns that identify a row rather than hold an indicator value.
pub const IDENTIFIER_COLUMNS: [&str; 3] = [COUNTRY_CODE, COUNTRY_NAME, YEAR];

/// Inclusive range of calendar years, written `start:end` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::usage(format!(
                "Invalid year range {start}:{end}: start must not be after end."
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: 1960,
            end: 2023,
        }
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl FromStr for YearRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            AppError::usage(format!(
                "Invalid year range '{s}'. Expected start:end with 4-digit years (e.g. 1990:2023)."
            ))
        };

        let (start, end) = s.trim().split_once(':').ok_or_else(invalid)?;
        let start = parse_year(start).ok_or_else(invalid)?;
        let end = parse_year(end).ok_or_else(invalid)?;
        YearRange::new(start, end)
    }
}

fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if raw.len() != 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// One observation of one indicator for one country-year.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub country_code: String,
    pub country_name: String,
    pub year: i32,
    pub value: Option<f64>,
}

/// Tidy rows for a single indicator, as returned by the fetcher.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndicatorSeries {
    pub code: String,
    pub observations: Vec<Observation>,
}

impl IndicatorSeries {
    pub fn new(code: impl Into<String>, observations: Vec<Observation>) -> Self {
        Self {
            code: code.into(),
            observations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }
}

/// One country-year row of a wide table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub country_code: String,
    pub country_name: String,
    pub year: i32,
    /// One entry per indicator column, in `IndicatorTable::indicators` order.
    pub values: Vec<Option<f64>>,
}

impl TableRow {
    /// Number of populated indicator values (identifier columns excluded).
    pub fn non_null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn value(&self, column: usize) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }
}

/// Wide country-year table with one nullable float column per indicator.
///
/// Column names are unique by construction: identifier columns are struct
/// fields and indicator names come from an `IndicatorSelection`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndicatorTable {
    indicators: Vec<String>,
    rows: Vec<TableRow>,
}

/// Wide table keyed by `(country_code, year)`.
pub type Panel = IndicatorTable;

/// One row per country at its latest sufficiently complete year.
pub type CrossSection = IndicatorTable;

impl IndicatorTable {
    /// Build a table. Rows must carry exactly one value per indicator.
    pub fn new(indicators: Vec<String>, rows: Vec<TableRow>) -> Result<Self, AppError> {
        if let Some(bad) = rows.iter().find(|r| r.values.len() != indicators.len()) {
            return Err(AppError::data(format!(
                "Row {}/{} has {} values for {} indicator columns.",
                bad.country_code,
                bad.year,
                bad.values.len(),
                indicators.len()
            )));
        }
        Ok(Self { indicators, rows })
    }

    /// Build a table whose rows are known to match `indicators`.
    pub(crate) fn from_parts(indicators: Vec<String>, rows: Vec<TableRow>) -> Self {
        debug_assert!(rows.iter().all(|r| r.values.len() == indicators.len()));
        Self { indicators, rows }
    }

    /// Zero rows, but with the indicator columns declared.
    pub fn empty(indicators: Vec<String>) -> Self {
        Self {
            indicators,
            rows: Vec::new(),
        }
    }

    pub fn indicators(&self) -> &[String] {
        &self.indicators
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All column names: identifiers first, then indicators.
    pub fn column_names(&self) -> Vec<String> {
        IDENTIFIER_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.indicators.iter().cloned())
            .collect()
    }

    pub fn column_index(&self, indicator: &str) -> Option<usize> {
        self.indicators.iter().position(|c| c == indicator)
    }

    /// Values of one indicator column, row-aligned.
    pub fn column(&self, indicator: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(indicator)?;
        Some(self.rows.iter().map(|r| r.value(idx)).collect())
    }

    /// Sorted distinct country codes.
    pub fn country_codes(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rows.iter().map(|r| r.country_code.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    pub fn country_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.country_code.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn year_count(&self) -> usize {
        self.rows.iter().map(|r| r.year).collect::<BTreeSet<_>>().len()
    }

    pub fn rows_for<'a>(&'a self, country_code: &'a str) -> impl Iterator<Item = &'a TableRow> + 'a {
        self.rows.iter().filter(move |r| r.country_code == country_code)
    }

    pub fn find(&self, country_code: &str, year: i32) -> Option<&TableRow> {
        self.rows
            .iter()
            .find(|r| r.country_code == country_code && r.year == year)
    }
}

/// Square, symmetric Pearson correlation matrix over indicator columns.
///
/// Undefined entries (too few pairs, constant column) are `NaN`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get(i).and_then(|row| row.get(j)).copied()
    }

    pub fn get_named(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.get(i, j)
    }
}

/// What the merger does when one indicator fails to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Log the failure, leave the column empty, keep going.
    #[default]
    SkipFailed,
    /// Abort the whole batch on the first failure.
    FailFast,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub years: YearRange,
    pub selection: IndicatorSelection,
    /// Minimum non-null indicator count for the latest-complete cross-section.
    pub min_count: usize,
    pub policy: FetchPolicy,
    /// Fetch indicators concurrently (results are still merged in key order).
    pub parallel: bool,
    pub preview_rows: usize,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            years: YearRange::default(),
            selection: IndicatorSelection::default_catalog(),
            min_count: 2,
            policy: FetchPolicy::SkipFailed,
            parallel: false,
            preview_rows: 20,
            plot_width: 100,
            plot_height: 25,
            export: None,
        }
    }
}
