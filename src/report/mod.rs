//! Reporting utilities: dataset summaries and text formatting.

pub mod format;

pub use format::*;

use crate::domain::IndicatorTable;

/// Size of a loaded panel: `Rows | Countries | Years`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatasetSummary {
    pub rows: usize,
    pub countries: usize,
    pub years: usize,
}

pub fn summarize(table: &IndicatorTable) -> DatasetSummary {
    DatasetSummary {
        rows: table.len(),
        countries: table.country_count(),
        years: table.year_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TableRow;

    fn row(code: &str, year: i32) -> TableRow {
        TableRow {
            country_code: code.to_string(),
            country_name: code.to_string(),
            year,
            values: vec![Some(1.0)],
        }
    }

    #[test]
    fn summary_counts_distinct_countries_and_years() {
        let table = IndicatorTable::new(
            vec!["a".into()],
            vec![row("ITA", 2020), row("ITA", 2021), row("USA", 2021)],
        )
        .unwrap();
        assert_eq!(
            summarize(&table),
            DatasetSummary {
                rows: 3,
                countries: 2,
                years: 2
            }
        );
        assert_eq!(summarize(&IndicatorTable::empty(vec![])), DatasetSummary::default());
    }
}
