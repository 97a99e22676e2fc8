//! Export tables and charts.
//!
//! - tables (panel, cross-section, correlation) go to CSV for spreadsheets
//! - chart descriptions go to JSON so another front-end can draw them

use std::fs::File;
use std::path::Path;

use chrono::Local;
use serde::Serialize;

use crate::domain::{CorrelationMatrix, IndicatorTable, YearRange};
use crate::error::AppError;

/// Write a wide table to CSV: identifier columns, then one column per indicator.
///
/// Null values are written as empty fields.
pub fn write_table_csv(path: &Path, table: &IndicatorTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::usage(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writer
        .write_record(table.column_names())
        .map_err(|e| AppError::usage(format!("Failed to write export CSV header: {e}")))?;

    for row in table.rows() {
        let mut record = vec![
            row.country_code.clone(),
            row.country_name.clone(),
            row.year.to_string(),
        ];
        record.extend(row.values.iter().map(|v| fmt_cell(*v)));
        writer
            .write_record(&record)
            .map_err(|e| AppError::usage(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::usage(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write a correlation matrix to CSV with a leading label column.
///
/// Undefined coefficients are written as empty fields.
pub fn write_correlation_csv(path: &Path, matrix: &CorrelationMatrix) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::usage(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let mut header = vec![String::new()];
    header.extend(matrix.columns.iter().cloned());
    writer
        .write_record(&header)
        .map_err(|e| AppError::usage(format!("Failed to write export CSV header: {e}")))?;

    for (name, row) in matrix.columns.iter().zip(&matrix.values) {
        let mut record = vec![name.clone()];
        record.extend(row.iter().map(|v| fmt_cell(Some(*v))));
        writer
            .write_record(&record)
            .map_err(|e| AppError::usage(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::usage(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

#[derive(Serialize)]
struct ChartFile<'a, T: Serialize> {
    tool: &'static str,
    generated_at: String,
    years: YearRange,
    chart: &'a T,
}

/// Write a chart description (time series, scatter, map) as pretty JSON.
pub fn write_chart_json<T: Serialize>(path: &Path, chart: &T, years: YearRange) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::usage(format!("Failed to create chart JSON '{}': {e}", path.display())))?;

    let doc = ChartFile {
        tool: "won",
        generated_at: Local::now().to_rfc3339(),
        years,
        chart,
    };

    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::usage(format!("Failed to write chart JSON: {e}")))?;

    Ok(())
}

fn fmt_cell(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => x.to_string(),
        _ => String::new(),
    }
}
