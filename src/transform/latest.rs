//! "Latest complete" cross-section selection.

use std::collections::BTreeMap;

use crate::domain::{CrossSection, IndicatorTable, Panel, TableRow};

/// For each country, the row with the greatest year whose non-null indicator
/// count is at least `min_count`.
///
/// Countries with no qualifying year are left out. The result keeps the
/// panel's indicator columns and is sorted by country code; with no
/// qualifying rows it is an empty table of the same shape.
pub fn latest_complete(panel: &Panel, min_count: usize) -> CrossSection {
    let mut latest: BTreeMap<&str, &TableRow> = BTreeMap::new();

    for row in panel.rows() {
        if row.non_null_count() < min_count {
            continue;
        }
        latest
            .entry(row.country_code.as_str())
            .and_modify(|best| {
                if row.year > best.year {
                    *best = row;
                }
            })
            .or_insert(row);
    }

    let rows = latest.into_values().cloned().collect();
    IndicatorTable::from_parts(panel.indicators().to_vec(), rows)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn row(code: &str, year: i32, values: Vec<Option<f64>>) -> TableRow {
        TableRow {
            country_code: code.to_string(),
            country_name: code.to_string(),
            year,
            values,
        }
    }

    fn scenario() -> Panel {
        IndicatorTable::new(
            vec!["gdp".into(), "life".into()],
            vec![
                row("ITA", 2020, vec![Some(5.0), None]),
                row("ITA", 2022, vec![Some(6.0), Some(20.0)]),
                row("USA", 2020, vec![Some(1.0), Some(10.0)]),
                row("USA", 2021, vec![None, Some(11.0)]),
                row("USA", 2022, vec![Some(3.0), None]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn picks_latest_year_meeting_threshold() {
        let latest = latest_complete(&scenario(), 1);
        let picked: Vec<(&str, i32)> = latest
            .rows()
            .iter()
            .map(|r| (r.country_code.as_str(), r.year))
            .collect();
        assert_eq!(picked, vec![("ITA", 2022), ("USA", 2022)]);
        assert_eq!(latest.rows()[0].non_null_count(), 2);
        assert_eq!(latest.rows()[1].values, vec![Some(3.0), None]);
    }

    #[test]
    fn stricter_threshold_falls_back_to_earlier_year() {
        let latest = latest_complete(&scenario(), 2);
        let picked: Vec<(&str, i32)> = latest
            .rows()
            .iter()
            .map(|r| (r.country_code.as_str(), r.year))
            .collect();
        assert_eq!(picked, vec![("ITA", 2022), ("USA", 2020)]);
    }

    #[test]
    fn threshold_above_column_count_is_empty() {
        let latest = latest_complete(&scenario(), 3);
        assert!(latest.is_empty());
        assert_eq!(latest.indicators(), ["gdp", "life"]);
    }

    #[test]
    fn empty_panel_gives_empty_cross_section() {
        let panel = IndicatorTable::empty(vec!["gdp".into()]);
        let latest = latest_complete(&panel, 1);
        assert!(latest.is_empty());
        assert_eq!(latest.column_names().len(), 4);
    }

    #[test]
    fn random_panels_satisfy_selection_invariants() {
        let mut rng = StdRng::seed_from_u64(7);
        let codes = ["ARG", "BRA", "CHN", "DEU", "EGY"];

        for _ in 0..50 {
            let width = rng.gen_range(1..=4);
            let mut rows = Vec::new();
            for code in codes {
                for year in 2000..2010 {
                    if rng.gen_bool(0.3) {
                        continue;
                    }
                    let values = (0..width)
                        .map(|_| rng.gen_bool(0.5).then(|| rng.gen_range(-10.0..10.0)))
                        .collect();
                    rows.push(row(code, year, values));
                }
            }
            let indicators = (0..width).map(|i| format!("c{i}")).collect();
            let panel = IndicatorTable::new(indicators, rows).unwrap();
            let k = rng.gen_range(0..=width + 1);
            let latest = latest_complete(&panel, k);

            if k > width {
                assert!(latest.is_empty());
            }
            let out_codes: Vec<&str> = latest.rows().iter().map(|r| r.country_code.as_str()).collect();
            let mut sorted = out_codes.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(out_codes, sorted);

            for code in codes {
                let best = panel
                    .rows_for(code)
                    .filter(|r| r.non_null_count() >= k)
                    .map(|r| r.year)
                    .max();
                let chosen = latest.rows().iter().find(|r| r.country_code == code);
                match (best, chosen) {
                    (None, None) => {}
                    (Some(year), Some(r)) => {
                        assert_eq!(r.year, year);
                        assert!(r.non_null_count() >= k);
                        assert_eq!(Some(r), panel.find(code, year));
                    }
                    other => panic!("mismatch for {code}: {other:?}"),
                }
            }
        }
    }
}
