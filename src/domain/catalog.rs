//! World Bank indicator catalog and indicator selections.

use std::collections::HashSet;

use crate::domain::types::IDENTIFIER_COLUMNS;
use crate::error::AppError;

/// GDP per capita (current US$).
pub const GDP_PC: &str = "NY.GDP.PCAP.CD";
/// Life expectancy at birth (years).
pub const LIFE_EXP: &str = "SP.DYN.LE00.IN";
/// Current health expenditure per capita (current US$).
pub const HEALTH_PC: &str = "SH.XPD.CHEX.PC.CD";
/// Under-5 mortality rate (per 1,000 live births).
pub const U5_MORT: &str = "SH.DYN.MORT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorDef {
    pub key: &'static str,
    pub code: &'static str,
    pub label: &'static str,
}

pub const CATALOG: [IndicatorDef; 4] = [
    IndicatorDef {
        key: "gdp_pc",
        code: GDP_PC,
        label: "GDP per capita (current US$)",
    },
    IndicatorDef {
        key: "life_exp",
        code: LIFE_EXP,
        label: "Life expectancy at birth (years)",
    },
    IndicatorDef {
        key: "health_pc",
        code: HEALTH_PC,
        label: "Health expenditure per capita (current US$)",
    },
    IndicatorDef {
        key: "u5_mort",
        code: U5_MORT,
        label: "Under-5 mortality (per 1,000 births)",
    },
];

pub fn lookup(key: &str) -> Option<&'static IndicatorDef> {
    CATALOG.iter().find(|d| d.key == key)
}

/// Ordered `key -> code` pairs chosen for one run.
///
/// Keys become column names, so they must be unique and must not shadow the
/// identifier columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct IndicatorSelection {
    entries: Vec<(String, String)>,
}

impl IndicatorSelection {
    pub fn new<K, C>(entries: impl IntoIterator<Item = (K, C)>) -> Result<Self, AppError>
    where
        K: Into<String>,
        C: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (key, code) in entries {
            let key = key.into().trim().to_string();
            let code = code.into().trim().to_string();
            if key.is_empty() || code.is_empty() {
                return Err(AppError::usage("Indicator key and code must be non-empty."));
            }
            if IDENTIFIER_COLUMNS.contains(&key.as_str()) {
                return Err(AppError::usage(format!(
                    "Indicator key '{key}' clashes with an identifier column."
                )));
            }
            if !seen.insert(key.clone()) {
                return Err(AppError::usage(format!("Indicator key '{key}' given twice.")));
            }
            out.push((key, code));
        }
        Ok(Self { entries: out })
    }

    /// Every catalog indicator, in catalog order.
    pub fn default_catalog() -> Self {
        Self {
            entries: CATALOG
                .iter()
                .map(|d| (d.key.to_string(), d.code.to_string()))
                .collect(),
        }
    }

    /// Parse CLI-style specs: `key` (catalog lookup) or `key=CODE` (ad hoc).
    pub fn from_specs<S: AsRef<str>>(specs: &[S]) -> Result<Self, AppError> {
        let mut entries = Vec::with_capacity(specs.len());
        for spec in specs {
            let spec = spec.as_ref().trim();
            match spec.split_once('=') {
                Some((key, code)) => entries.push((key.to_string(), code.to_string())),
                None => {
                    let def = lookup(spec).ok_or_else(|| {
                        let known: Vec<&str> = CATALOG.iter().map(|d| d.key).collect();
                        AppError::usage(format!(
                            "Unknown indicator '{spec}'. Known: {} (or use key=CODE).",
                            known.join(", ")
                        ))
                    })?;
                    entries.push((def.key.to_string(), def.code.to_string()));
                }
            }
        }
        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), c.as_str()))
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn code_for(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, c)| c.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.code_for(key).is_some()
    }

    /// Copy with `key` removed, or added from the catalog when absent.
    ///
    /// Catalog order is kept for catalog keys; ad hoc keys stay at the end.
    pub fn toggled(&self, key: &str) -> Self {
        if self.contains(key) {
            return Self {
                entries: self.entries.iter().filter(|(k, _)| k != key).cloned().collect(),
            };
        }
        let Some(def) = lookup(key) else {
            return self.clone();
        };
        let mut entries: Vec<(String, String)> = CATALOG
            .iter()
            .filter(|d| d.key == def.key || self.contains(d.key))
            .map(|d| {
                let code = self.code_for(d.key).unwrap_or(d.code);
                (d.key.to_string(), code.to_string())
            })
            .collect();
        entries.extend(
            self.entries
                .iter()
                .filter(|(k, _)| lookup(k).is_none())
                .cloned(),
        );
        Self { entries }
    }
}
