//! Data acquisition: World Bank indicator downloads and the wide merge.

pub mod merge;
pub mod worldbank;

#[cfg(test)]
pub(crate) mod fake;

pub use merge::{FetchOptions, FetchOutcome, IndicatorFailure, fetch_many, merge_series};
pub use worldbank::{ApiConfig, PageSource, RetryPolicy, WorldBankClient, fetch_indicator};
