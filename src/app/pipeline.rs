//! Shared "indicator pipeline" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! cache lookup -> fetch_many -> latest_complete -> correlation_matrix
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use chrono::{DateTime, Local};
use log::info;

use crate::app::cache::PanelCache;
use crate::data::{FetchOptions, IndicatorFailure, PageSource, fetch_many};
use crate::domain::{CorrelationMatrix, CrossSection, Panel, RunConfig};
use crate::error::AppError;
use crate::transform::{correlation_matrix, latest_complete};

pub const NO_INDICATORS_MESSAGE: &str =
    "No indicators selected. Pass --indicator KEY (or KEY=CODE), or toggle one in the TUI.";

/// A panel ready for the downstream stages.
#[derive(Debug, Clone)]
pub struct LoadedPanel {
    pub panel: Panel,
    pub failures: Vec<IndicatorFailure>,
    pub fetched_at: DateTime<Local>,
    pub from_cache: bool,
}

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub loaded: LoadedPanel,
    pub latest: CrossSection,
    pub corr: CorrelationMatrix,
}

impl RunOutput {
    pub fn panel(&self) -> &Panel {
        &self.loaded.panel
    }

    /// Hint for an empty panel or cross-section; `None` when both have rows.
    pub fn empty_hint(&self) -> Option<&'static str> {
        if self.loaded.panel.is_empty() {
            Some(crate::report::EMPTY_PANEL_HINT)
        } else if self.latest.is_empty() {
            Some(crate::report::EMPTY_LATEST_HINT)
        } else {
            None
        }
    }
}

/// Fetch the configured panel, or reuse a cached one unless `refresh` is set.
///
/// - an empty selection is a usage error
/// - every indicator failing is a data error
/// - a successful fetch with zero rows is returned as-is
///
/// Outcomes with failed indicators are not cached, so the next load retries them.
pub fn load_panel<S: PageSource + ?Sized>(
    source: &S,
    cache: &mut PanelCache,
    config: &RunConfig,
    refresh: bool,
) -> Result<LoadedPanel, AppError> {
    if config.selection.is_empty() {
        return Err(AppError::usage(NO_INDICATORS_MESSAGE));
    }

    if refresh {
        cache.invalidate(&config.selection, config.years);
    } else if let Some(hit) = cache.get(&config.selection, config.years) {
        info!("using cached panel from {}", hit.fetched_at.format("%H:%M:%S"));
        return Ok(LoadedPanel {
            panel: hit.outcome.panel.clone(),
            failures: hit.outcome.failures.clone(),
            fetched_at: hit.fetched_at,
            from_cache: true,
        });
    }

    let options = FetchOptions {
        policy: config.policy,
        parallel: config.parallel,
    };
    let outcome = fetch_many(source, &config.selection, config.years, options)?;

    if outcome.all_failed() {
        let detail: Vec<String> = outcome
            .failures
            .iter()
            .map(|f| format!("{} ({}): {}", f.key, f.code, f.error))
            .collect();
        return Err(AppError::data(format!(
            "Fetch failed for every indicator: {}",
            detail.join("; ")
        )));
    }

    if outcome.failures.is_empty() {
        let entry = cache.insert(config.selection.clone(), config.years, outcome);
        return Ok(LoadedPanel {
            panel: entry.outcome.panel,
            failures: Vec::new(),
            fetched_at: entry.fetched_at,
            from_cache: false,
        });
    }

    Ok(LoadedPanel {
        panel: outcome.panel,
        failures: outcome.failures,
        fetched_at: Local::now(),
        from_cache: false,
    })
}

/// Downstream stages over an already loaded panel.
pub fn run_with_panel(loaded: LoadedPanel, config: &RunConfig) -> RunOutput {
    let latest = latest_complete(&loaded.panel, config.min_count);
    let corr = correlation_matrix(&latest);
    RunOutput {
        loaded,
        latest,
        corr,
    }
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_pipeline<S: PageSource + ?Sized>(
    source: &S,
    cache: &mut PanelCache,
    config: &RunConfig,
    refresh: bool,
) -> Result<RunOutput, AppError> {
    let loaded = load_panel(source, cache, config, refresh)?;
    Ok(run_with_panel(loaded, config))
}
