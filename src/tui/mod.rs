//! Ratatui-based terminal UI.
//!
//! The TUI provides a settings panel for the year range, indicator selection,
//! and completeness threshold, then shows the loaded data in tabs: table
//! previews, the correlation matrix, and time-series / scatter / map views.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs},
};

use crate::app::cache::PanelCache;
use crate::app::pipeline::{self, RunOutput};
use crate::data::{PageSource, WorldBankClient};
use crate::domain::{CATALOG, RunConfig, YearRange, lookup};
use crate::error::AppError;

mod plotters_chart;

use plotters_chart::{ChartData, IndicatorPlottersChart};

/// Start the TUI.
pub fn run(config: RunConfig) -> Result<(), AppError> {
    let client = WorldBankClient::from_env()?;
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::data(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(client, config);
    app.reload(false);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::data(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::data(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Preview,
    Latest,
    Correlation,
    TimeSeries,
    Scatter,
    Map,
}

impl Tab {
    const ALL: [Tab; 6] = [
        Tab::Preview,
        Tab::Latest,
        Tab::Correlation,
        Tab::TimeSeries,
        Tab::Scatter,
        Tab::Map,
    ];

    fn title(self) -> &'static str {
        match self {
            Tab::Preview => "Preview",
            Tab::Latest => "Latest",
            Tab::Correlation => "Correlation",
            Tab::TimeSeries => "Time series",
            Tab::Scatter => "Scatter",
            Tab::Map => "Map",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn step(self, delta: isize) -> Tab {
        let n = Self::ALL.len() as isize;
        Self::ALL[(self.index() as isize + delta).rem_euclid(n) as usize]
    }
}

/// One row of the settings list.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Years,
    Indicator(String),
    MinCount,
}

struct App<S: PageSource> {
    source: S,
    cache: PanelCache,
    config: RunConfig,
    run: Option<RunOutput>,
    tab: Tab,
    selected_field: usize,
    editing_years: bool,
    years_input: String,
    /// Index into the panel's country codes (time series tab).
    country_idx: usize,
    /// Indicator column for time series and map.
    series_idx: usize,
    /// Indicator columns for the scatter axes.
    x_idx: usize,
    y_idx: usize,
    status: String,
}

impl<S: PageSource> App<S> {
    fn new(source: S, config: RunConfig) -> Self {
        Self {
            source,
            cache: PanelCache::new(),
            config,
            run: None,
            tab: Tab::Preview,
            selected_field: 0,
            editing_years: false,
            years_input: String::new(),
            country_idx: 0,
            series_idx: 0,
            x_idx: 0,
            y_idx: 1,
            status: String::new(),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::data(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::data(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::data(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Settings rows: year range, catalog indicators, selected ad hoc
    /// indicators, then the completeness threshold.
    fn fields(&self) -> Vec<Field> {
        let mut out = vec![Field::Years];
        out.extend(CATALOG.iter().map(|d| Field::Indicator(d.key.to_string())));
        out.extend(
            self.config
                .selection
                .iter()
                .filter(|(key, _)| lookup(key).is_none())
                .map(|(key, _)| Field::Indicator(key.to_string())),
        );
        out.push(Field::MinCount);
        out
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing_years {
            self.handle_years_edit(code);
            return false;
        }

        let n_fields = self.fields().len();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.tab = self.tab.step(1),
            KeyCode::BackTab => self.tab = self.tab.step(-1),
            KeyCode::Up => self.selected_field = self.selected_field.saturating_sub(1),
            KeyCode::Down => {
                if self.selected_field + 1 < n_fields {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Enter | KeyCode::Char(' ') => self.activate_field(),
            KeyCode::Char('r') => self.reload(true),
            KeyCode::Char('c') => self.country_idx = self.country_idx.wrapping_add(1),
            KeyCode::Char('C') => self.country_idx = self.country_idx.wrapping_sub(1),
            KeyCode::Char('s') => self.series_idx = self.series_idx.wrapping_add(1),
            KeyCode::Char('x') => self.x_idx = self.x_idx.wrapping_add(1),
            KeyCode::Char('y') => self.y_idx = self.y_idx.wrapping_add(1),
            _ => {}
        }
        false
    }

    fn handle_years_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing_years = false;
                self.status = "Year edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing_years = false;
                match self.years_input.parse::<YearRange>() {
                    Ok(years) => {
                        self.config.years = years;
                        self.reload(false);
                    }
                    Err(e) => self.status = e.to_string(),
                }
            }
            KeyCode::Backspace => {
                self.years_input.pop();
            }
            KeyCode::Char(c) => {
                if c.is_ascii_digit() || c == ':' {
                    self.years_input.push(c);
                }
            }
            _ => {}
        }
    }

    fn activate_field(&mut self) {
        match self.fields().get(self.selected_field) {
            Some(Field::Years) => {
                self.editing_years = true;
                self.years_input = self.config.years.to_string();
                self.status = "Editing years (start:end). Enter to apply, Esc to cancel.".to_string();
            }
            Some(Field::Indicator(key)) => {
                self.config.selection = self.config.selection.toggled(key);
                self.selected_field = self.selected_field.min(self.fields().len() - 1);
                self.reload(false);
            }
            Some(Field::MinCount) | None => {}
        }
    }

    fn adjust_field(&mut self, delta: i32) {
        if self.fields().get(self.selected_field) != Some(&Field::MinCount) {
            return;
        }
        let next = if delta >= 0 {
            self.config.min_count.saturating_add(1)
        } else {
            self.config.min_count.saturating_sub(1)
        };
        self.config.min_count = next.max(1);
        self.status = format!("min count: {}", self.config.min_count);

        // The threshold only affects downstream stages; no refetch.
        if let Some(run) = self.run.take() {
            self.run = Some(pipeline::run_with_panel(run.loaded, &self.config));
        }
    }

    /// Load (or reuse) the panel for the current settings and recompute.
    fn reload(&mut self, refresh: bool) {
        match pipeline::run_pipeline(&self.source, &mut self.cache, &self.config, refresh) {
            Ok(run) => {
                self.status = status_for(&run);
                self.run = Some(run);
            }
            Err(err) => {
                self.status = err.to_string();
                self.run = None;
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let summary = self
            .run
            .as_ref()
            .map(|r| {
                let s = crate::report::summarize(r.panel());
                format!(
                    "Rows: {} | Countries: {} | Years: {} | fetched {}{}",
                    s.rows,
                    s.countries,
                    s.years,
                    r.loaded.fetched_at.format("%H:%M:%S"),
                    if r.loaded.from_cache { " (cached)" } else { "" }
                )
            })
            .unwrap_or_else(|| "no data loaded".to_string());

        let block = Block::default().borders(Borders::ALL).title(Line::from(vec![
            Span::styled(" won ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("— World Bank indicators, {} ", self.config.years)),
        ]));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        let titles: Vec<&str> = Tab::ALL.iter().map(|t| t.title()).collect();
        let tabs = Tabs::new(titles)
            .select(self.tab.index())
            .style(Style::default().fg(Color::Gray))
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, rows[0]);
        frame.render_widget(
            Paragraph::new(summary).style(Style::default().fg(Color::Gray)),
            rows[1],
        );
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(36), Constraint::Min(0)])
            .split(area);

        self.draw_settings(frame, chunks[0]);
        self.draw_tab(frame, chunks[1]);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .fields()
            .into_iter()
            .map(|field| match field {
                Field::Years => {
                    let years = if self.editing_years {
                        format!("{}_", self.years_input)
                    } else {
                        self.config.years.to_string()
                    };
                    ListItem::new(format!("Years: {years}"))
                }
                Field::Indicator(key) => {
                    let mark = if self.config.selection.contains(&key) { "x" } else { " " };
                    let label = lookup(&key)
                        .map(|d| d.label.to_string())
                        .or_else(|| self.config.selection.code_for(&key).map(str::to_string))
                        .unwrap_or_default();
                    ListItem::new(format!("[{mark}] {key:<10} {label}"))
                }
                Field::MinCount => ListItem::new(format!("Min count: {}", self.config.min_count)),
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_tab(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title(self.tab.title()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(run) = &self.run else {
            let msg = Paragraph::new(self.status.as_str()).style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let rows = usize::from(inner.height.saturating_sub(3));
        match self.tab {
            Tab::Preview => draw_text(frame, inner, crate::report::format_table(run.panel(), rows)),
            Tab::Latest => draw_text(frame, inner, crate::report::format_table(&run.latest, rows)),
            Tab::Correlation => draw_text(frame, inner, crate::report::format_correlation(&run.corr)),
            Tab::TimeSeries => self.draw_timeseries(frame, inner, run),
            Tab::Scatter => self.draw_scatter(frame, inner, run),
            Tab::Map => self.draw_map(frame, inner, run),
        }
    }

    fn draw_timeseries(&self, frame: &mut ratatui::Frame<'_>, area: Rect, run: &RunOutput) {
        let codes = run.panel().country_codes();
        let (Some(series), false) = (pick(run.panel().indicators(), self.series_idx), codes.is_empty()) else {
            draw_text(frame, area, crate::report::EMPTY_PANEL_HINT.to_string());
            return;
        };
        let country = &codes[self.country_idx % codes.len()];

        match crate::viz::timeseries(run.panel(), country, series, None) {
            Ok(chart) => {
                let title = match &chart.country_name {
                    Some(name) => format!("{} ({name})", chart.title),
                    None => chart.title.clone(),
                };
                draw_chart(frame, area, &title, ChartData::from_timeseries(&chart));
            }
            Err(e) => draw_text(frame, area, e.to_string()),
        }
    }

    fn draw_scatter(&self, frame: &mut ratatui::Frame<'_>, area: Rect, run: &RunOutput) {
        let cols = run.latest.indicators();
        let (Some(x), Some(y)) = (pick(cols, self.x_idx), pick(cols, self.y_idx)) else {
            draw_text(frame, area, crate::report::EMPTY_LATEST_HINT.to_string());
            return;
        };

        match crate::viz::scatter_rel(&run.latest, x, y, None) {
            Ok(chart) => {
                let title = match chart.trendline {
                    Some(fit) => format!("{} | slope {:.4}, R² {:.3}", chart.title, fit.slope, fit.r_squared),
                    None => chart.title.clone(),
                };
                draw_chart(frame, area, &title, ChartData::from_scatter(&chart));
            }
            Err(e) => draw_text(frame, area, e.to_string()),
        }
    }

    fn draw_map(&self, frame: &mut ratatui::Frame<'_>, area: Rect, run: &RunOutput) {
        let Some(series) = pick(run.latest.indicators(), self.series_idx) else {
            draw_text(frame, area, crate::report::EMPTY_LATEST_HINT.to_string());
            return;
        };
        let map = match crate::viz::choropleth_latest(&run.latest, series, None) {
            Ok(map) => map,
            Err(e) => {
                draw_text(frame, area, e.to_string());
                return;
            }
        };

        let mut ranked: Vec<_> = map.entries.iter().collect();
        ranked.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.iso3.cmp(&b.iso3)));

        let mut lines = vec![Line::from(Span::styled(
            map.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        for e in ranked {
            let [r, g, b] = map.color_of(e.value);
            lines.push(Line::from(vec![
                Span::styled("██ ", Style::default().fg(Color::Rgb(r, g, b))),
                Span::raw(format!(
                    "{:<4} {:<28} {:>12}",
                    e.iso3,
                    e.country_name,
                    crate::report::fmt_value(Some(e.value))
                )),
            ]));
        }
        frame.render_widget(Paragraph::new(Text::from(lines)), area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab view  ↑/↓ select  Enter toggle/edit  ←/→ min  r refresh  c country  s series  x/y axes  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Status line after a successful run: skipped indicators, then hints.
fn status_for(run: &RunOutput) -> String {
    if !run.loaded.failures.is_empty() {
        let keys: Vec<&str> = run.loaded.failures.iter().map(|f| f.key.as_str()).collect();
        return format!("Skipped (fetch failed): {}", keys.join(", "));
    }
    match run.empty_hint() {
        Some(hint) => hint.to_string(),
        None if run.loaded.from_cache => "Loaded from cache.".to_string(),
        None => "Loaded.".to_string(),
    }
}

fn pick(columns: &[String], idx: usize) -> Option<&str> {
    if columns.is_empty() {
        return None;
    }
    Some(columns[idx % columns.len()].as_str())
}

fn draw_text(frame: &mut ratatui::Frame<'_>, area: Rect, text: String) {
    frame.render_widget(Paragraph::new(text), area);
}

fn draw_chart(frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, data: Option<ChartData>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);
    frame.render_widget(
        Paragraph::new(title.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        chunks[0],
    );

    let Some(data) = data else {
        frame.render_widget(
            Paragraph::new("(no data)").style(Style::default().fg(Color::Yellow)),
            chunks[1],
        );
        return;
    };
    let widget = IndicatorPlottersChart {
        data: &data,
        fmt_x: fmt_axis,
        fmt_y: fmt_axis,
    };
    frame.render_widget(widget, chunks[1]);
}

fn fmt_axis(v: f64) -> String {
    if v.abs() >= 1000.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}
