//! Formatted terminal output: summaries, tables, correlation matrix, map.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::data::IndicatorFailure;
use crate::domain::{CATALOG, CorrelationMatrix, IndicatorTable, RunConfig};
use crate::report::DatasetSummary;
use crate::viz::ChoroplethMap;

const NAME_WIDTH: usize = 24;
const VALUE_WIDTH: usize = 12;
const BAR_WIDTH: usize = 24;

pub const EMPTY_PANEL_HINT: &str =
    "No rows matched. Try a wider year range or different indicators.";
pub const EMPTY_LATEST_HINT: &str =
    "No country has enough non-null indicators. Lower --min-count or load more indicators.";

/// Run header: settings, dataset size, and skipped indicators.
pub fn format_run_summary(
    summary: &DatasetSummary,
    failures: &[IndicatorFailure],
    config: &RunConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== won - Wealth of Nations (World Bank) ===\n");
    out.push_str(&format!("Years: {}\n", config.years));
    let indicators: Vec<String> = config
        .selection
        .iter()
        .map(|(key, code)| format!("{key}={code}"))
        .collect();
    out.push_str(&format!("Indicators: {}\n", indicators.join(", ")));
    out.push_str(&format!(
        "Rows: {} | Countries: {} | Years: {}\n",
        summary.rows, summary.countries, summary.years
    ));

    for f in failures {
        out.push_str(&format!("  (skipped {} [{}]) {}\n", f.key, f.code, f.error));
    }

    out
}

/// Up to `limit` rows of a wide table.
pub fn format_table(table: &IndicatorTable, limit: usize) -> String {
    let mut out = String::new();

    let mut header = format!("{:<5} {:<NAME_WIDTH$} {:>4}", "code", "country", "year");
    let mut rule = format!("{:-<5} {:-<NAME_WIDTH$} {:-<4}", "", "", "");
    for name in table.indicators() {
        header.push_str(&format!(" {:>VALUE_WIDTH$}", truncate(name, VALUE_WIDTH)));
        rule.push_str(&format!(" {:-<VALUE_WIDTH$}", ""));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    for row in table.rows().iter().take(limit) {
        let mut line = format!(
            "{:<5} {:<NAME_WIDTH$} {:>4}",
            row.country_code,
            truncate(&row.country_name, NAME_WIDTH),
            row.year
        );
        for v in &row.values {
            line.push_str(&format!(" {:>VALUE_WIDTH$}", fmt_value(*v)));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    if table.len() > limit {
        out.push_str(&format!("... {} more rows\n", table.len() - limit));
    }

    out
}

/// Square matrix with column names as both header and row labels.
pub fn format_correlation(matrix: &CorrelationMatrix) -> String {
    let label_width = matrix
        .columns
        .iter()
        .map(|c| c.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    let mut out = String::new();
    let mut header = format!("{:<label_width$}", "");
    for c in &matrix.columns {
        header.push_str(&format!(" {:>10}", truncate(c, 10)));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    for (i, name) in matrix.columns.iter().enumerate() {
        let mut line = format!("{name:<label_width$}");
        for v in &matrix.values[i] {
            let cell = if v.is_finite() { format!("{v:.3}") } else { "-".to_string() };
            line.push_str(&format!(" {cell:>10}"));
        }
        out.push_str(&line);
        out.push('\n');
    }

    out
}

/// Countries ranked by value, with a bar showing the position on the scale.
pub fn format_choropleth(map: &ChoroplethMap, limit: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", map.title));
    if map.is_empty() {
        return out;
    }

    if let Some((lo, hi)) = map.range {
        out.push_str(&format!(
            "{}: {} .. {} ({} countries)\n",
            map.value_column,
            fmt_value(Some(lo)),
            fmt_value(Some(hi)),
            map.entries.len()
        ));
    }

    let mut ranked: Vec<_> = map.entries.iter().collect();
    ranked.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.iso3.cmp(&b.iso3)));

    for e in ranked.iter().take(limit) {
        let filled = (map.scale_position(e.value) * BAR_WIDTH as f64).round() as usize;
        out.push_str(&format!(
            "{:<5} {:<NAME_WIDTH$} {:>VALUE_WIDTH$} {}\n",
            e.iso3,
            truncate(&e.country_name, NAME_WIDTH),
            fmt_value(Some(e.value)),
            "#".repeat(filled.max(1)),
        ));
    }
    if ranked.len() > limit {
        out.push_str(&format!("... {} more countries\n", ranked.len() - limit));
    }

    out
}

/// The built-in indicator catalog.
pub fn format_catalog() -> String {
    let mut out = String::new();
    for def in CATALOG.iter() {
        out.push_str(&format!("{:<10} {:<20} {}\n", def.key, def.code, def.label));
    }
    out
}

/// Compact numeric cell: `-` for null, no decimals for large magnitudes.
pub fn fmt_value(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() && x.abs() >= 1000.0 => format!("{x:.0}"),
        Some(x) if x.is_finite() => format!("{x:.2}"),
        _ => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TableRow;
    use crate::viz::MapEntry;

    fn table() -> IndicatorTable {
        IndicatorTable::new(
            vec!["gdp_pc".into(), "life_exp".into()],
            vec![
                TableRow {
                    country_code: "ITA".into(),
                    country_name: "Italy".into(),
                    year: 2022,
                    values: vec![Some(34776.4), Some(82.9)],
                },
                TableRow {
                    country_code: "USA".into(),
                    country_name: "United States of America and more".into(),
                    year: 2022,
                    values: vec![None, Some(77.43)],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn table_preview_formats_nulls_and_truncates() {
        let txt = format_table(&table(), 1);
        let lines: Vec<&str> = txt.lines().collect();
        assert!(lines[0].starts_with("code  country"));
        assert!(lines[0].ends_with("life_exp"));
        assert!(lines[2].starts_with("ITA   Italy"));
        assert!(lines[2].contains("34776") && lines[2].ends_with("82.90"));
        assert_eq!(lines[3], "... 1 more rows");

        let full = format_table(&table(), 10);
        assert!(full.contains("United States of Americ."));
        assert!(full.lines().last().unwrap().contains(" - "));
    }

    #[test]
    fn correlation_shows_dash_for_undefined() {
        let m = CorrelationMatrix {
            columns: vec!["a".into(), "b".into()],
            values: vec![vec![1.0, f64::NAN], vec![f64::NAN, 1.0]],
        };
        let txt = format_correlation(&m);
        assert_eq!(
            txt,
            concat!(
                "              a          b\n",
                "a         1.000          -\n",
                "b             -      1.000\n",
            )
        );
    }

    #[test]
    fn choropleth_ranks_descending() {
        let map = ChoroplethMap {
            title: "life (latest)".into(),
            value_column: "life".into(),
            entries: vec![
                MapEntry { iso3: "ITA".into(), country_name: "Italy".into(), value: 83.0 },
                MapEntry { iso3: "NGA".into(), country_name: "Nigeria".into(), value: 53.0 },
                MapEntry { iso3: "USA".into(), country_name: "United States".into(), value: 77.0 },
            ],
            range: Some((53.0, 83.0)),
        };
        let txt = format_choropleth(&map, 2);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines[0], "life (latest)");
        assert_eq!(lines[1], "life: 53.00 .. 83.00 (3 countries)");
        assert!(lines[2].starts_with("ITA") && lines[2].ends_with(&"#".repeat(BAR_WIDTH)));
        assert!(lines[3].starts_with("USA"));
        assert_eq!(lines[4], "... 1 more countries");
    }

    #[test]
    fn fmt_value_rules() {
        assert_eq!(fmt_value(None), "-");
        assert_eq!(fmt_value(Some(f64::NAN)), "-");
        assert_eq!(fmt_value(Some(1234.56)), "1235");
        assert_eq!(fmt_value(Some(-3.14159)), "-3.14");
    }

    #[test]
    fn catalog_lists_every_indicator() {
        assert_eq!(format_catalog().lines().count(), CATALOG.len());
    }
}
