//! Multi-indicator download and wide merge.
//!
//! Every requested indicator is fetched independently and then outer-joined
//! on `(country_code, year)`. The merge walks indicators in selection order,
//! which fixes two things regardless of how the downloads were scheduled:
//!
//! - the column order of the resulting panel
//! - which country name wins (the first one seen for a country code)

use std::collections::{BTreeMap, HashMap};

use log::{info, warn};
use rayon::prelude::*;

use crate::data::worldbank::{PageSource, fetch_indicator};
use crate::domain::{
    FetchPolicy, IndicatorSelection, IndicatorSeries, IndicatorTable, Panel, TableRow, YearRange,
};
use crate::error::FetchError;

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    pub policy: FetchPolicy,
    /// Download indicators concurrently.
    pub parallel: bool,
}

/// An indicator that could not be downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFailure {
    pub key: String,
    pub code: String,
    pub error: FetchError,
}

/// Result of `fetch_many`: the merged panel plus any skipped indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub panel: Panel,
    pub failures: Vec<IndicatorFailure>,
}

impl FetchOutcome {
    /// True when indicators were requested and none of them downloaded.
    pub fn all_failed(&self) -> bool {
        !self.failures.is_empty() && self.failures.len() == self.panel.indicators().len()
    }
}

/// Fetch every selected indicator and merge them into one wide panel.
///
/// The panel declares a column for every selected key, even when that
/// indicator came back empty or (under `SkipFailed`) failed.
pub fn fetch_many<S: PageSource + ?Sized>(
    source: &S,
    selection: &IndicatorSelection,
    years: YearRange,
    options: FetchOptions,
) -> Result<FetchOutcome, FetchError> {
    let requests: Vec<(&str, &str)> = selection.iter().collect();

    let results: Vec<Result<IndicatorSeries, FetchError>> = if options.parallel {
        requests
            .par_iter()
            .map(|(_, code)| fetch_indicator(source, code, years))
            .collect()
    } else {
        requests
            .iter()
            .map(|(_, code)| fetch_indicator(source, code, years))
            .collect()
    };

    let mut entries = Vec::with_capacity(requests.len());
    let mut failures = Vec::new();
    for ((key, code), result) in requests.into_iter().zip(results) {
        match result {
            Ok(series) => entries.push((key.to_string(), series)),
            Err(error) => {
                if options.policy == FetchPolicy::FailFast {
                    return Err(error);
                }
                warn!("skipping indicator {key} ({code}): {error}");
                failures.push(IndicatorFailure {
                    key: key.to_string(),
                    code: code.to_string(),
                    error,
                });
                entries.push((key.to_string(), IndicatorSeries::new(code, Vec::new())));
            }
        }
    }

    let panel = merge_series(&entries);
    info!(
        "merged panel: {} rows, {} countries, {} indicators ({} failed)",
        panel.len(),
        panel.country_count(),
        panel.indicators().len(),
        failures.len()
    );

    Ok(FetchOutcome { panel, failures })
}

/// Full outer join of keyed series on `(country_code, year)`.
///
/// Each entry contributes one column named by its key. Rows come out sorted
/// by country code, then year. A country's name is the first one seen while
/// walking the entries in order. Non-finite values are stored as null.
pub fn merge_series(entries: &[(String, IndicatorSeries)]) -> Panel {
    let indicators: Vec<String> = entries.iter().map(|(key, _)| key.clone()).collect();
    let width = indicators.len();

    let mut names: HashMap<&str, &str> = HashMap::new();
    let mut cells: BTreeMap<(&str, i32), Vec<Option<f64>>> = BTreeMap::new();

    for (col, (_, series)) in entries.iter().enumerate() {
        for obs in &series.observations {
            names
                .entry(obs.country_code.as_str())
                .or_insert(obs.country_name.as_str());

            let values = cells
                .entry((obs.country_code.as_str(), obs.year))
                .or_insert_with(|| vec![None; width]);
            // A repeated key inside one series keeps its first non-null value.
            if values[col].is_none() {
                values[col] = obs.value.filter(|v| v.is_finite());
            }
        }
    }

    let rows = cells
        .into_iter()
        .map(|((code, year), values)| TableRow {
            country_code: code.to_string(),
            country_name: names.get(code).copied().unwrap_or(code).to_string(),
            year,
            values,
        })
        .collect();

    IndicatorTable::from_parts(indicators, rows)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::data::fake::{FakeSource, single_page};
    use crate::domain::Observation;

    fn years() -> YearRange {
        YearRange::new(2019, 2021).unwrap()
    }

    fn selection(pairs: &[(&str, &str)]) -> IndicatorSelection {
        IndicatorSelection::new(pairs.iter().copied()).unwrap()
    }

    fn obs(code: &str, name: &str, year: i32, value: Option<f64>) -> Observation {
        Observation {
            country_code: code.to_string(),
            country_name: name.to_string(),
            year,
            value,
        }
    }

    #[test]
    fn outer_join_keeps_rows_missing_from_some_indicators() {
        let source = FakeSource::new()
            .with_page(
                "A.CODE",
                1,
                single_page(&[("USA", "United States", 2020, Some(1.0)), ("ITA", "Italy", 2020, Some(2.0))]),
            )
            .with_page("B.CODE", 1, single_page(&[("USA", "United States", 2020, Some(10.0))]));

        let outcome = fetch_many(
            &source,
            &selection(&[("a", "A.CODE"), ("b", "B.CODE")]),
            years(),
            FetchOptions::default(),
        )
        .unwrap();
        let panel = outcome.panel;

        assert!(outcome.failures.is_empty());
        assert_eq!(panel.indicators(), ["a", "b"]);
        assert_eq!(panel.len(), 2);
        let ita = panel.find("ITA", 2020).unwrap();
        assert_eq!(ita.values, vec![Some(2.0), None]);
        let usa = panel.find("USA", 2020).unwrap();
        assert_eq!(usa.values, vec![Some(1.0), Some(10.0)]);
    }

    #[test]
    fn first_seen_country_name_wins_per_code() {
        let panel = merge_series(&[
            (
                "a".to_string(),
                IndicatorSeries::new("A", vec![obs("USA", "United States", 2020, Some(1.0))]),
            ),
            (
                "b".to_string(),
                IndicatorSeries::new(
                    "B",
                    vec![
                        obs("USA", "USA (alt)", 2019, Some(2.0)),
                        obs("GBR", "United Kingdom", 2019, None),
                    ],
                ),
            ),
        ]);

        let names: Vec<(&str, i32, &str)> = panel
            .rows()
            .iter()
            .map(|r| (r.country_code.as_str(), r.year, r.country_name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("GBR", 2019, "United Kingdom"),
                ("USA", 2019, "United States"),
                ("USA", 2020, "United States"),
            ]
        );
    }

    #[test]
    fn all_empty_still_declares_columns() {
        let source = FakeSource::new()
            .with_page("A", 1, single_page(&[]))
            .with_page("B", 1, single_page(&[]));

        let outcome = fetch_many(&source, &selection(&[("a", "A"), ("b", "B")]), years(), FetchOptions::default())
            .unwrap();
        assert!(outcome.panel.is_empty());
        assert!(!outcome.all_failed());
        assert_eq!(
            outcome.panel.column_names(),
            vec!["country_code", "country_name", "year", "a", "b"]
        );
    }

    #[test]
    fn failed_indicator_is_skipped_by_default() {
        let source = FakeSource::new()
            .with_page("A", 1, single_page(&[("USA", "United States", 2020, Some(1.0))]))
            .with_page("B", 1, serde_json::json!({"message": "Invalid indicator"}));

        let outcome =
            fetch_many(&source, &selection(&[("a", "A"), ("b", "B")]), years(), FetchOptions::default())
                .unwrap();
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].key, "b");
        assert!(!outcome.all_failed());
        assert_eq!(outcome.panel.find("USA", 2020).unwrap().values, vec![Some(1.0), None]);
    }

    #[test]
    fn fail_fast_propagates_first_error() {
        let source = FakeSource::new()
            .with_sequence("A", 1, vec![Err(FetchError::Status(500))])
            .with_page("B", 1, single_page(&[("USA", "United States", 2020, Some(1.0))]));

        let options = FetchOptions {
            policy: FetchPolicy::FailFast,
            parallel: false,
        };
        let err = fetch_many(&source, &selection(&[("a", "A"), ("b", "B")]), years(), options).unwrap_err();
        assert_eq!(err, FetchError::Status(500));
    }

    #[test]
    fn every_failure_is_reported_as_all_failed() {
        let source = FakeSource::new();
        let outcome =
            fetch_many(&source, &selection(&[("a", "A")]), years(), FetchOptions::default()).unwrap();
        assert!(outcome.all_failed());
        assert!(outcome.panel.is_empty());
    }

    #[test]
    fn parallel_fetch_matches_sequential() {
        let source = FakeSource::new()
            .with_page("A", 1, single_page(&[("USA", "United States", 2020, Some(1.0)), ("FRA", "France", 2021, None)]))
            .with_page("B", 1, single_page(&[("USA", "U.S.", 2021, Some(3.0))]))
            .with_page("C", 1, single_page(&[("DEU", "Germany", 2019, Some(7.5))]));
        let sel = selection(&[("a", "A"), ("b", "B"), ("c", "C")]);

        let seq = fetch_many(&source, &sel, years(), FetchOptions::default()).unwrap();
        let par = fetch_many(
            &source,
            &sel,
            years(),
            FetchOptions {
                policy: FetchPolicy::SkipFailed,
                parallel: true,
            },
        )
        .unwrap();
        assert_eq!(seq, par);
        assert_eq!(par.panel.find("USA", 2021).unwrap().country_name, "United States");
    }

    #[test]
    fn merged_panel_is_sorted_unique_and_complete() {
        let a = IndicatorSeries::new(
            "A",
            vec![
                obs("USA", "United States", 2021, Some(1.0)),
                obs("ITA", "Italy", 2020, Some(f64::NAN)),
                obs("USA", "United States", 2020, None),
            ],
        );
        let b = IndicatorSeries::new(
            "B",
            vec![obs("BRA", "Brazil", 2020, Some(4.0)), obs("USA", "United States", 2021, Some(2.0))],
        );
        let panel = merge_series(&[("a".to_string(), a.clone()), ("b".to_string(), b.clone())]);

        let keys: Vec<(String, i32)> = panel
            .rows()
            .iter()
            .map(|r| (r.country_code.clone(), r.year))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(keys, sorted);

        let expected: HashSet<(String, i32)> = a
            .observations
            .iter()
            .chain(&b.observations)
            .map(|o| (o.country_code.clone(), o.year))
            .collect();
        assert_eq!(keys.into_iter().collect::<HashSet<_>>(), expected);
        assert_eq!(panel.find("ITA", 2020).unwrap().values, vec![None, None]);
    }
}
