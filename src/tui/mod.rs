//! Ratatui-based terminal UI.
//!
//! The TUI provides a settings panel for choosing metric, region, sector,
//! year window and language, then renders the joined series with end-of-line
//! badges, the headline figures, the sector breakdown and the peer ranking.
//!
//! Datasets load on a background thread (`Loader`); the view is rebuilt from
//! the latest completed load whenever the selection changes.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::app::pipeline::{self, ChartView, Context, LoadedData, Selection, ViewState};
use crate::data::loader::Loader;
use crate::domain::{EntityClass, Language, Metric};
use crate::error::AppError;
use crate::report::{fmt_pct, fmt_value, tr};

mod plotters_chart;

use plotters_chart::{ChartSeries, SeriesPlottersChart};

const FIELD_COUNT: usize = 6;

/// Start the TUI.
pub fn run(ctx: Context, selection: Selection) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(ctx, selection);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
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

struct App {
    ctx: Arc<Context>,
    selection: Selection,
    /// Region codes offered by the region field; `None` means country view.
    regions: Vec<String>,
    loader: Loader<LoadedData>,
    /// Metric and region flag of the latest load request.
    requested: Option<(Metric, bool)>,
    view: ViewState,
    selected_field: usize,
    status: String,
}

impl App {
    fn new(ctx: Context, selection: Selection) -> Self {
        let regions = ctx
            .table
            .of_class(EntityClass::Region)
            .map(|e| e.code.clone())
            .collect();
        let mut app = Self {
            ctx: Arc::new(ctx),
            selection,
            regions,
            loader: Loader::new(),
            requested: None,
            view: ViewState::Loading,
            selected_field: 0,
            status: String::new(),
        };
        app.ensure_loaded();
        app
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if self.loader.poll() {
                self.rebuild_view();
                needs_redraw = true;
            }

            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100)).map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
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

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < FIELD_COUNT {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Enter => self.reset_field(),
            KeyCode::Char('l') => {
                self.selection.language = self.selection.language.toggle();
                self.rebuild_view();
            }
            KeyCode::Char('d') => self.write_debug(),
            KeyCode::Char('e') => self.export_chart(),
            _ => {}
        }
        false
    }

    fn adjust_field(&mut self, delta: i32) {
        match self.selected_field {
            0 => {
                self.selection.metric = step_metric(self.selection.metric, delta);
                self.status = format!("metric: {}", self.selection.metric.label(self.selection.language));
            }
            1 => {
                self.selection.region = step_region(&self.regions, self.selection.region.as_deref(), delta);
                self.status = format!("region: {}", self.region_label());
            }
            2 => {
                self.selection.sector = if delta >= 0 {
                    self.selection.sector.next()
                } else {
                    self.selection.sector.prev()
                };
            }
            3 => {
                let fallback = self.data_years().map(|(lo, _)| lo);
                let next = step_year(self.selection.from, fallback, delta);
                if next.zip(self.selection.to).is_some_and(|(from, to)| from > to) {
                    self.status = "from must not be after to".to_string();
                    return;
                }
                self.selection.from = next;
            }
            4 => {
                let fallback = self.data_years().map(|(_, hi)| hi);
                let next = step_year(self.selection.to, fallback, delta);
                if self.selection.from.zip(next).is_some_and(|(from, to)| from > to) {
                    self.status = "to must not be before from".to_string();
                    return;
                }
                self.selection.to = next;
            }
            5 => {
                self.selection.language = self.selection.language.toggle();
            }
            _ => {}
        }
        self.ensure_loaded();
        self.rebuild_view();
    }

    /// Enter clears the selected field back to its automatic value.
    fn reset_field(&mut self) {
        match self.selected_field {
            1 => self.selection.region = None,
            3 => self.selection.from = None,
            4 => self.selection.to = None,
            _ => return,
        }
        self.rebuild_view();
    }

    /// Request a new load when the loaded datasets cannot serve the selection.
    fn ensure_loaded(&mut self) {
        let metric = self.selection.metric;
        let with_region = self.selection.region.is_some();
        let covered = self
            .requested
            .is_some_and(|(m, r)| m == metric && (r || !with_region));
        if covered {
            return;
        }

        let ctx = Arc::clone(&self.ctx);
        let generation = self.loader.request(move || pipeline::load(&ctx, metric, with_region));
        tracing::info!(generation, ?metric, with_region, "requested load");
        self.requested = Some((metric, with_region));
        self.view = ViewState::Loading;
    }

    fn rebuild_view(&mut self) {
        self.view = ViewState::from_load(self.loader.state(), &self.ctx, &self.selection);
        if let ViewState::Unavailable(reason) = &self.view {
            self.status = reason.clone();
        }
    }

    /// Year span of the focal dataset, when loaded.
    fn data_years(&self) -> Option<(i32, i32)> {
        let data = self.loader.state().ready()?;
        let dataset = data.dataset(self.selection.level())?;
        let years = dataset.years();
        Some((*years.first()?, *years.last()?))
    }

    fn ready_view(&self) -> Option<&ChartView> {
        match &self.view {
            ViewState::Ready(view) => Some(&**view),
            _ => None,
        }
    }

    fn write_debug(&mut self) {
        let Some(data) = self.loader.state().ready() else {
            self.status = "Nothing loaded yet.".to_string();
            return;
        };
        self.status = match crate::debug::write_debug_bundle(
            &PathBuf::from("debug"),
            data,
            &self.selection,
            self.ready_view(),
            &self.ctx.table,
        ) {
            Ok(path) => format!("Wrote debug bundle: {}", path.display()),
            Err(err) => format!("Debug write failed: {err}"),
        };
    }

    fn export_chart(&mut self) {
        let Some(view) = self.ready_view() else {
            self.status = "No chart to export.".to_string();
            return;
        };
        let path = PathBuf::from(format!(
            "rds_{:?}_{}.json",
            view.selection.metric,
            view.selection.primary_code()
        ));
        self.status = match crate::io::chart::write_chart_json(&path, &view.to_chart_file()) {
            Ok(()) => format!("Wrote chart: {}", path.display()),
            Err(err) => format!("Export failed: {err}"),
        };
    }

    fn region_label(&self) -> String {
        let lang = self.selection.language;
        match self.selection.region.as_deref() {
            Some(code) => self
                .ctx
                .table
                .by_code(code)
                .map(|e| e.name(lang).to_string())
                .unwrap_or_else(|| code.to_string()),
            None => tr(lang, "ninguna", "none").to_string(),
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let lang = self.selection.language;
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("rds", Style::default().fg(Color::Cyan)),
            Span::raw(" | "),
            Span::raw(tr(lang, "Indicadores de I+D", "R&D indicators")),
        ]));

        let Some(view) = self.ready_view() else {
            let msg = self.view.message(lang).unwrap_or_default();
            lines.push(Line::from(Span::styled(msg, Style::default().fg(Color::Gray))));
            let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
            frame.render_widget(p, area);
            return;
        };

        let metric = view.selection.metric;
        let unit = metric.unit();
        let summary = &view.summary;
        let primary = view
            .legends
            .iter()
            .find(|l| l.key == view.selection.primary_key())
            .map(|l| l.label.as_str())
            .unwrap_or("-");
        let year = summary.latest_year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string());
        let rank = summary
            .rank
            .map(|r| format!("{}/{}", r.rank, r.total))
            .unwrap_or_else(|| "-".to_string());

        lines.push(Line::from(Span::styled(
            format!(
                "{} | {primary} {year}: {} | {} {} | rank {rank}",
                view.title,
                fmt_value(summary.latest, metric, unit),
                tr(lang, "interanual", "yoy"),
                fmt_pct(summary.yoy),
            ),
            Style::default().fg(Color::Gray),
        )));

        let diffs: Vec<String> = view
            .legends
            .iter()
            .filter_map(|l| {
                let diff = summary.peer_diffs.get(&l.key)?;
                Some(format!("vs {}: {}", l.badge, fmt_pct(*diff)))
            })
            .collect();
        if !diffs.is_empty() {
            lines.push(Line::from(Span::styled(diffs.join(" | "), Style::default().fg(Color::Gray))));
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(9)])
            .split(area);

        self.draw_chart(frame, chunks[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[1]);
        self.draw_settings(frame, bottom[0]);
        self.draw_details(frame, bottom[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let lang = self.selection.language;
        let title = self
            .ready_view()
            .map(|v| v.title.clone())
            .unwrap_or_else(|| self.selection.metric.label(lang).to_string());
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(view) = self.ready_view() else {
            let color = match self.view {
                ViewState::Unavailable(_) => Color::Red,
                _ => Color::Yellow,
            };
            let msg = Paragraph::new(self.view.message(lang).unwrap_or_default())
                .style(Style::default().fg(color))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        };

        let (series, x_bounds, y_bounds) = chart_series(view);
        let (chart_rect, insets) = chart_layout(inner);
        let y_label = match view.selection.metric.unit() {
            "" => view.selection.metric.label(lang).to_string(),
            unit => unit.to_string(),
        };
        let widget = SeriesPlottersChart {
            series: &series,
            x_bounds,
            y_bounds,
            x_label: tr(lang, "año", "year"),
            y_label,
            fmt_x: fmt_axis_year,
            fmt_y: fmt_axis_value,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, x_bounds, y_bounds, lang);
            draw_badges(frame, inner, chart_rect, view, y_bounds);
        }
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let lang = self.selection.language;
        let year = |y: Option<i32>| y.map(|y| y.to_string()).unwrap_or_else(|| "auto".to_string());

        let items = vec![
            ListItem::new(format!("{}: {}", tr(lang, "Indicador", "Metric"), self.selection.metric.label(lang))),
            ListItem::new(format!("{}: {}", tr(lang, "Comunidad", "Region"), self.region_label())),
            ListItem::new(format!("{}: {}", tr(lang, "Sector", "Sector"), self.selection.sector.label(lang))),
            ListItem::new(format!("{}: {}", tr(lang, "Desde", "From"), year(self.selection.from))),
            ListItem::new(format!("{}: {}", tr(lang, "Hasta", "To"), year(self.selection.to))),
            ListItem::new(format!("{}: {}", tr(lang, "Idioma", "Language"), tr(lang, "español", "English"))),
        ];

        let list = List::new(items)
            .block(Block::default().title(tr(lang, "Ajustes", "Settings")).borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    /// Sector breakdown and the top of the peer ranking.
    fn draw_details(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let lang = self.selection.language;
        let block = Block::default()
            .title(tr(lang, "Sectores y ranking", "Sectors and ranking"))
            .borders(Borders::ALL);

        let Some(view) = self.ready_view() else {
            frame.render_widget(block, area);
            return;
        };

        let metric = view.selection.metric;
        let unit = metric.unit();
        let mut left: Vec<Line> = Vec::new();
        for share in &view.breakdown {
            left.push(Line::from(format!(
                "{:<14} {:>9} {:>6}",
                crate::report::truncate(share.sector.label(lang), 14),
                fmt_value(share.value, metric, unit),
                share.share.map(|s| format!("{s:.1}%")).unwrap_or_else(|| "-".to_string()),
            )));
        }

        let focus = view.selection.primary_code();
        let mut right: Vec<Line> = Vec::new();
        for entry in view.ranking.entries.iter().take(area.height.saturating_sub(2) as usize) {
            let name = self
                .ctx
                .table
                .by_code(&entry.code)
                .map(|e| e.name(lang))
                .unwrap_or(&entry.code);
            let text = format!(
                "{:>2}. {:<16} {}",
                entry.rank,
                crate::report::truncate(name, 16),
                fmt_value(Some(entry.value), metric, unit)
            );
            let style = if entry.code == focus {
                Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan)
            } else {
                Style::default()
            };
            right.push(Line::from(Span::styled(text, style)));
        }

        let inner = block.inner(area);
        frame.render_widget(block, area);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(inner);
        frame.render_widget(Paragraph::new(Text::from(left)), cols[0]);
        frame.render_widget(Paragraph::new(Text::from(right)), cols[1]);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  Enter auto  l lang  e export  d debug  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn step_metric(cur: Metric, delta: i32) -> Metric {
    match (cur, delta >= 0) {
        (Metric::RdGdp, true) => Metric::Researchers,
        (Metric::Researchers, true) => Metric::Patents,
        (Metric::Patents, true) => Metric::RdGdp,
        (Metric::RdGdp, false) => Metric::Patents,
        (Metric::Researchers, false) => Metric::RdGdp,
        (Metric::Patents, false) => Metric::Researchers,
    }
}

/// Cycle through `none, regions[0], regions[1], ...`.
fn step_region(regions: &[String], cur: Option<&str>, delta: i32) -> Option<String> {
    let slots = regions.len() as i64 + 1;
    let idx = match cur {
        None => 0,
        Some(code) => regions.iter().position(|r| r == code).map_or(0, |i| i as i64 + 1),
    };
    let next = (idx + delta.signum() as i64).rem_euclid(slots);
    if next == 0 {
        None
    } else {
        regions.get(next as usize - 1).cloned()
    }
}

/// Move a year bound; an automatic bound starts from `fallback`.
fn step_year(cur: Option<i32>, fallback: Option<i32>, delta: i32) -> Option<i32> {
    match cur {
        Some(year) => Some(year + delta.signum()),
        None => fallback,
    }
}

fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Build chart series for Plotters: one entry per legend, split at absent years.
fn chart_series(view: &ChartView) -> (Vec<ChartSeries>, [f64; 2], [f64; 2]) {
    let series = view
        .legends
        .iter()
        .map(|legend| {
            let mut segments: Vec<Vec<(f64, f64)>> = Vec::new();
            let mut current: Vec<(f64, f64)> = Vec::new();
            for row in &view.rows {
                match row.get(&legend.key) {
                    Some(v) => current.push((row.year as f64, v)),
                    None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
                    None => {}
                }
            }
            if !current.is_empty() {
                segments.push(current);
            }
            ChartSeries {
                segments,
                color: hex_rgb(&legend.color).unwrap_or((255, 255, 255)),
            }
        })
        .collect();

    let first = view.rows.first().map(|r| r.year as f64).unwrap_or(0.0);
    let last = view.rows.last().map(|r| r.year as f64).unwrap_or(1.0);
    let x_bounds = if last > first { [first, last] } else { [first - 0.5, first + 0.5] };
    let y_bounds = view.value_bounds().unwrap_or([0.0, 1.0]);

    (series, x_bounds, y_bounds)
}

fn fmt_axis_year(v: f64) -> String {
    format!("{v:.0}")
}

fn fmt_axis_value(v: f64) -> String {
    format!("{v:.2}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    // The right inset holds the end-of-line badges.
    let insets = AxisInsets {
        left: 8,
        right: 14,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    lang: Language,
) {
    let style = Style::default().fg(Color::Gray);

    // One tick per year while they fit, otherwise five evenly spaced.
    let span = (x_bounds[1] - x_bounds[0]).round().max(1.0) as usize;
    let x_ticks = if span + 1 <= (chart.width / 6) as usize { span + 1 } else { 5 };
    for i in 0..x_ticks {
        let u = i as f64 / (x_ticks as f64 - 1.0).max(1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_axis_year(x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub(label_len / 2);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let y_ticks = 5usize;
    for i in 0..y_ticks {
        let u = i as f64 / (y_ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_axis_value(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new(tr(lang, "año", "year"))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }
}

/// End-of-line badges in the right inset, one row apart at minimum.
fn draw_badges(frame: &mut ratatui::Frame<'_>, inner: Rect, chart: Rect, view: &ChartView, y_bounds: [f64; 2]) {
    let height = chart.height.saturating_sub(1) as f64;
    let metric = view.selection.metric;
    let x = chart.x + chart.width + 1;
    let width = (inner.x + inner.width).saturating_sub(x);
    if width == 0 {
        return;
    }

    for marker in view.end_markers(y_bounds, height, 1.0) {
        let y = chart.y + marker.adjusted_y.round().max(0.0) as u16;
        if y >= inner.y + inner.height {
            continue;
        }
        let badge = view
            .legends
            .iter()
            .find(|l| l.key == marker.series_key)
            .map(|l| l.badge.as_str())
            .unwrap_or(marker.series_key.as_str());
        let (r, g, b) = hex_rgb(&marker.color).unwrap_or((255, 255, 255));
        let text = format!("{badge} {}", fmt_value(Some(marker.value), metric, ""));
        frame.render_widget(
            Paragraph::new(text).style(Style::default().fg(Color::Rgb(r, g, b)).add_modifier(Modifier::BOLD)),
            Rect {
                x,
                y,
                width,
                height: 1,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legend_colors() {
        assert_eq!(hex_rgb("#c60b1e"), Some((0xc6, 0x0b, 0x1e)));
        assert_eq!(hex_rgb("c60b1e"), None);
        assert_eq!(hex_rgb("#zz0000"), None);
    }

    #[test]
    fn metric_cycle_wraps_both_ways() {
        assert_eq!(step_metric(Metric::Patents, 1), Metric::RdGdp);
        assert_eq!(step_metric(Metric::RdGdp, -1), Metric::Patents);
    }

    #[test]
    fn region_cycle_passes_through_none() {
        let regions = vec!["ES30".to_string(), "ES51".to_string()];
        assert_eq!(step_region(&regions, None, 1).as_deref(), Some("ES30"));
        assert_eq!(step_region(&regions, Some("ES51"), 1), None);
        assert_eq!(step_region(&regions, None, -1).as_deref(), Some("ES51"));
    }

    #[test]
    fn automatic_year_starts_from_data() {
        assert_eq!(step_year(None, Some(2015), 1), Some(2015));
        assert_eq!(step_year(Some(2015), Some(2000), -1), Some(2014));
    }
}
