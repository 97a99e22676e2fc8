//! Panel cache owned by the front-end.
//!
//! Entries are keyed by the ordered indicator selection and the year range,
//! so changing either one is a cache miss. The cache is a plain value passed
//! into the loader; nothing in the pipeline holds it globally.

use std::collections::HashMap;

use chrono::{DateTime, Local};

use crate::data::FetchOutcome;
use crate::domain::{IndicatorSelection, YearRange};

/// A fetched panel and when it was downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPanel {
    pub outcome: FetchOutcome,
    pub fetched_at: DateTime<Local>,
}

#[derive(Debug, Clone, Default)]
pub struct PanelCache {
    entries: HashMap<(IndicatorSelection, YearRange), CachedPanel>,
}

impl PanelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, selection: &IndicatorSelection, years: YearRange) -> Option<&CachedPanel> {
        self.entries.get(&(selection.clone(), years))
    }

    /// Store `outcome`, stamped with the current local time.
    pub fn insert(
        &mut self,
        selection: IndicatorSelection,
        years: YearRange,
        outcome: FetchOutcome,
    ) -> CachedPanel {
        let entry = CachedPanel {
            outcome,
            fetched_at: Local::now(),
        };
        self.entries.insert((selection, years), entry.clone());
        entry
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&mut self, selection: &IndicatorSelection, years: YearRange) -> bool {
        self.entries.remove(&(selection.clone(), years)).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
