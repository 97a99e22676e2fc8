//! Command-line parsing for the World Bank indicator explorer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the data pipeline code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{FetchPolicy, IndicatorSelection, RunConfig, YearRange};
use crate::error::AppError;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "won", version, about = "Wealth of Nations: World Bank indicator explorer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the built-in indicator catalog.
    Indicators,
    /// Fetch the panel, print its size and a preview, and optionally export it.
    Panel(DataArgs),
    /// Print each country's latest sufficiently complete year.
    Latest(DataArgs),
    /// Print the pairwise-complete correlation matrix of the latest cross-section.
    Corr(DataArgs),
    /// Plot one indicator over time for one country.
    Timeseries(TimeseriesArgs),
    /// Plot two indicators of the latest cross-section against each other.
    Scatter(ScatterArgs),
    /// Rank countries by one indicator of the latest cross-section.
    Map(MapArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same underlying pipeline as the other subcommands, but renders
    /// results in a terminal UI using Ratatui.
    Tui(DataArgs),
}

/// Common options for every command that loads data.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Year range, inclusive (start:end).
    #[arg(short = 'y', long, default_value_t = YearRange::default())]
    pub years: YearRange,

    /// Indicator to load: a catalog key (gdp_pc) or key=CODE. Repeatable.
    /// Defaults to the whole catalog.
    #[arg(short = 'i', long = "indicator", value_name = "KEY[=CODE]")]
    pub indicators: Vec<String>,

    /// Minimum non-null indicators for a row to count as complete.
    #[arg(short = 'k', long, default_value_t = 2)]
    pub min_count: usize,

    /// What to do when one indicator fails to download.
    #[arg(long, value_enum, default_value_t = FetchPolicy::SkipFailed)]
    pub policy: FetchPolicy,

    /// Download indicators concurrently.
    #[arg(long)]
    pub parallel: bool,

    /// Rows to show in table previews.
    #[arg(long, default_value_t = 20)]
    pub rows: usize,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the command's table (CSV) or chart (JSON).
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct TimeseriesArgs {
    /// ISO-3 country code (case-insensitive).
    #[arg(short = 'c', long)]
    pub country: String,

    /// Indicator column to plot.
    #[arg(long = "series", value_name = "KEY")]
    pub series: String,

    /// Chart title (defaults to the indicator and country code).
    #[arg(long)]
    pub title: Option<String>,

    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ScatterArgs {
    /// Indicator on the x axis.
    #[arg(long, value_name = "KEY")]
    pub x: String,

    /// Indicator on the y axis.
    #[arg(long, value_name = "KEY")]
    pub y: String,

    /// Chart title (defaults to "<y> vs <x>").
    #[arg(long)]
    pub title: Option<String>,

    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Debug, Args, Clone)]
pub struct MapArgs {
    /// Indicator column to map.
    #[arg(long = "series", value_name = "KEY")]
    pub series: String,

    /// Chart title (defaults to "<indicator> (latest)").
    #[arg(long)]
    pub title: Option<String>,

    #[command(flatten)]
    pub data: DataArgs,
}

impl DataArgs {
    /// Resolve flags into a pipeline configuration.
    pub fn to_run_config(&self) -> Result<RunConfig, AppError> {
        let selection = if self.indicators.is_empty() {
            IndicatorSelection::default_catalog()
        } else {
            IndicatorSelection::from_specs(&self.indicators)?
        };

        Ok(RunConfig {
            years: self.years,
            selection,
            min_count: self.min_count,
            policy: self.policy,
            parallel: self.parallel,
            preview_rows: self.rows,
            plot_width: self.width,
            plot_height: self.height,
            export: self.export.clone(),
        })
    }
}
