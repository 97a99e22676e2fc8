//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - fetches World Bank indicators (through the panel cache)
//! - prints tables, matrices, and charts
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, DataArgs, MapArgs, ScatterArgs, TimeseriesArgs};
use crate::data::WorldBankClient;
use crate::domain::RunConfig;
use crate::error::AppError;

pub mod cache;
pub mod pipeline;

use cache::PanelCache;
use pipeline::{LoadedPanel, RunOutput};

/// Entry point for the `won` binary.
pub fn run() -> Result<(), AppError> {
    // We want `won` and `won -y 1990:2020` to behave like `won tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Indicators => {
            print!("{}", crate::report::format_catalog());
            Ok(())
        }
        Command::Panel(args) => handle_panel(args),
        Command::Latest(args) => handle_latest(args),
        Command::Corr(args) => handle_corr(args),
        Command::Timeseries(args) => handle_timeseries(args),
        Command::Scatter(args) => handle_scatter(args),
        Command::Map(args) => handle_map(args),
        Command::Tui(args) => crate::tui::run(args.to_run_config()?),
    }
}

fn load(args: &DataArgs) -> Result<(RunConfig, LoadedPanel), AppError> {
    let config = args.to_run_config()?;
    let client = WorldBankClient::from_env()?;
    let mut cache = PanelCache::new();
    let loaded = pipeline::load_panel(&client, &mut cache, &config, false)?;
    Ok((config, loaded))
}

fn run_all(args: &DataArgs) -> Result<(RunConfig, RunOutput), AppError> {
    let (config, loaded) = load(args)?;
    let run = pipeline::run_with_panel(loaded, &config);
    Ok((config, run))
}

fn print_header(config: &RunConfig, loaded: &LoadedPanel) {
    let summary = crate::report::summarize(&loaded.panel);
    println!(
        "{}",
        crate::report::format_run_summary(&summary, &loaded.failures, config)
    );
}

fn handle_panel(args: DataArgs) -> Result<(), AppError> {
    let (config, loaded) = load(&args)?;
    print_header(&config, &loaded);

    if loaded.panel.is_empty() {
        println!("{}", crate::report::EMPTY_PANEL_HINT);
    } else {
        print!("{}", crate::report::format_table(&loaded.panel, config.preview_rows));
    }

    if let Some(path) = &config.export {
        crate::io::write_table_csv(path, &loaded.panel)?;
    }
    Ok(())
}

fn handle_latest(args: DataArgs) -> Result<(), AppError> {
    let (config, run) = run_all(&args)?;
    print_header(&config, &run.loaded);

    match run.empty_hint() {
        Some(hint) => println!("{hint}"),
        None => print!("{}", crate::report::format_table(&run.latest, config.preview_rows)),
    }

    if let Some(path) = &config.export {
        crate::io::write_table_csv(path, &run.latest)?;
    }
    Ok(())
}

fn handle_corr(args: DataArgs) -> Result<(), AppError> {
    let (config, run) = run_all(&args)?;
    print_header(&config, &run.loaded);

    if let Some(hint) = run.empty_hint() {
        println!("{hint}");
    }
    print!("{}", crate::report::format_correlation(&run.corr));

    if let Some(path) = &config.export {
        crate::io::write_correlation_csv(path, &run.corr)?;
    }
    Ok(())
}

fn handle_timeseries(args: TimeseriesArgs) -> Result<(), AppError> {
    let (config, loaded) = load(&args.data)?;

    let chart = crate::viz::timeseries(
        &loaded.panel,
        &args.country,
        &args.series,
        args.title.as_deref(),
    )?;
    if chart.is_empty() {
        println!("{}", crate::report::EMPTY_PANEL_HINT);
    }
    println!(
        "{}",
        crate::plot::render_timeseries_plot(&chart, config.plot_width, config.plot_height)
    );

    if let Some(path) = &config.export {
        crate::io::write_chart_json(path, &chart, config.years)?;
    }
    Ok(())
}

fn handle_scatter(args: ScatterArgs) -> Result<(), AppError> {
    let (config, run) = run_all(&args.data)?;

    let chart = crate::viz::scatter_rel(&run.latest, &args.x, &args.y, args.title.as_deref())?;
    if let Some(hint) = run.empty_hint() {
        println!("{hint}");
    }
    println!(
        "{}",
        crate::plot::render_scatter_plot(&chart, config.plot_width, config.plot_height)
    );
    if let Some(fit) = chart.trendline {
        println!(
            "trend: {} = {:.4} + {:.4}·{} (R²={:.3}, n={})",
            chart.y_label, fit.intercept, fit.slope, chart.x_label, fit.r_squared, fit.n
        );
    }

    if let Some(path) = &config.export {
        crate::io::write_chart_json(path, &chart, config.years)?;
    }
    Ok(())
}

fn handle_map(args: MapArgs) -> Result<(), AppError> {
    let (config, run) = run_all(&args.data)?;

    let map = crate::viz::choropleth_latest(&run.latest, &args.series, args.title.as_deref())?;
    print!("{}", crate::report::format_choropleth(&map, config.preview_rows));

    if let Some(path) = &config.export {
        crate::io::write_chart_json(path, &map, config.years)?;
    }
    Ok(())
}

/// Rewrite argv so `won` defaults to `won tui`.
///
/// Rules:
/// - `won`                      -> `won tui`
/// - `won -y 1990:2020 ...`     -> `won tui -y 1990:2020 ...`
/// - `won --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise (a subcommand or a typo), let clap decide.
    argv
}
