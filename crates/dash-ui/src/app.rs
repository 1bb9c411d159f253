//! Application state and TUI event loop for the billing dashboard.
//!
//! [`App`] owns the [`Dashboard`], the theme and the per-view date ranges.
//! Every view switch or range change recomputes the current view from the
//! cached extracts; a view that fails shows its error and leaves the other
//! views usable.

use std::collections::HashMap;
use std::io;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use tracing::{debug, warn};

use dash_core::models::DateRange;
use dash_runtime::assembler::Dashboard;
use dash_runtime::views::ViewKind;

use crate::report_view::{self, ReportViewData};
use crate::themes::Theme;

/// Rows moved per PageUp / PageDown.
const PAGE_ROWS: usize = 10;

// ── UiConfig ──────────────────────────────────────────────────────────────────

/// Presentation settings, built by the caller and handed to [`App::new`].
#[derive(Debug, Clone)]
pub struct UiConfig {
    pub theme: Theme,
    pub initial_view: ViewKind,
    /// Overrides for the start / end of every view's default range.
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Explicit table columns for the initial view.
    pub columns: Option<Vec<String>>,
    pub tick_rate: Duration,
}

impl UiConfig {
    pub fn new(theme: Theme, initial_view: ViewKind) -> Self {
        Self {
            theme,
            initial_view,
            start: None,
            end: None,
            columns: None,
            tick_rate: Duration::from_millis(250),
        }
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the dashboard TUI.
pub struct App {
    dashboard: Dashboard,
    pub theme: Theme,
    pub active: ViewKind,
    start_override: Option<NaiveDate>,
    end_override: Option<NaiveDate>,
    initial_view: ViewKind,
    columns: Option<Vec<String>>,
    tick_rate: Duration,
    /// Range currently applied per view.
    ranges: HashMap<ViewKind, DateRange>,
    /// Observed min/max per view, the target of a reset.
    defaults: HashMap<ViewKind, DateRange>,
    table_offset: usize,
    /// Last rendered state of the active view.
    pub current: Option<ReportViewData>,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
}

impl App {
    pub fn new(dashboard: Dashboard, config: UiConfig) -> Self {
        Self {
            dashboard,
            theme: config.theme,
            active: config.initial_view,
            start_override: config.start,
            end_override: config.end,
            initial_view: config.initial_view,
            columns: config.columns,
            tick_rate: config.tick_rate,
            ranges: HashMap::new(),
            defaults: HashMap::new(),
            table_offset: 0,
            current: None,
            should_quit: false,
        }
    }

    // ── Public event loop ─────────────────────────────────────────────────────

    /// Run the TUI until `q`, `Q` or `Ctrl+C`.
    ///
    /// Uses `crossterm::event::poll` with the configured tick so the loop
    /// stays on the current thread.
    pub fn run(mut self) -> io::Result<()> {
        self.recompute();

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }

            match event::poll(self.tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key);
                    }
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    /// Apply one key press. Returns `true` when the view was recomputed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                false
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
                false
            }
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                self.switch_to(ViewKind::ALL[idx])
            }
            KeyCode::Tab | KeyCode::Right => self.switch_to(self.active.next()),
            KeyCode::BackTab | KeyCode::Left => self.switch_to(self.active.prev()),
            KeyCode::Char('[') => self.shift(-1, 0),
            KeyCode::Char(']') => self.shift(1, 0),
            KeyCode::Char('{') => self.shift(0, -1),
            KeyCode::Char('}') => self.shift(0, 1),
            KeyCode::Char('r') => self.reset_range(),
            KeyCode::Char('R') => {
                self.dashboard.refresh();
                self.recompute();
                true
            }
            KeyCode::Down => self.scroll(1),
            KeyCode::Up => self.scroll(-1),
            KeyCode::PageDown => self.scroll(PAGE_ROWS as i64),
            KeyCode::PageUp => self.scroll(-(PAGE_ROWS as i64)),
            _ => false,
        }
    }

    fn switch_to(&mut self, kind: ViewKind) -> bool {
        if kind == self.active {
            return false;
        }
        self.active = kind;
        self.table_offset = 0;
        self.recompute();
        true
    }

    /// Move the active range's start and/or end by whole days.
    fn shift(&mut self, start_days: i64, end_days: i64) -> bool {
        let Some(range) = self.ranges.get(&self.active).copied() else {
            return false;
        };
        let shifted = DateRange::new(
            add_days(range.start, start_days),
            add_days(range.end, end_days),
        );
        debug!(view = %self.active, range = %shifted, "range shifted");
        self.ranges.insert(self.active, shifted);
        self.table_offset = 0;
        self.recompute();
        true
    }

    fn reset_range(&mut self) -> bool {
        let Some(observed) = self.defaults.get(&self.active).copied() else {
            return false;
        };
        self.ranges.insert(self.active, observed);
        self.table_offset = 0;
        self.recompute();
        true
    }

    fn scroll(&mut self, delta: i64) -> bool {
        let rows = match &self.current {
            Some(ReportViewData {
                outcome: Ok(report),
                ..
            }) => report.table.len(),
            _ => return false,
        };
        let max = rows.saturating_sub(1) as i64;
        self.table_offset = (self.table_offset as i64 + delta).clamp(0, max.max(0)) as usize;
        if let Some(current) = self.current.as_mut() {
            current.table_offset = self.table_offset;
        }
        false
    }

    // ── Computation ───────────────────────────────────────────────────────────

    /// Recompute the active view and store the result for rendering.
    pub fn recompute(&mut self) {
        let kind = self.active;
        let columns = if kind == self.initial_view {
            self.columns.clone()
        } else {
            None
        };

        let outcome = match self.ranges.get(&kind).copied() {
            Some(range) => self.dashboard.run_view(kind, Some(range), columns.as_deref()),
            None => self.first_run(kind, columns.as_deref()),
        };

        if let Err(e) = &outcome {
            warn!(view = %kind, error = %e, "view failed");
        }

        let range = match &outcome {
            Ok(report) => report
                .range
                .map(|r| r.to_string())
                .unwrap_or_else(|| "no dated records".to_string()),
            Err(_) => self
                .ranges
                .get(&kind)
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
        };

        self.current = Some(ReportViewData {
            active: kind,
            range,
            source: self.source_label(kind),
            outcome: outcome.map_err(|e| e.to_string()),
            table_offset: self.table_offset,
        });
    }

    /// First computation of a view: learn its observed range, then apply
    /// any start / end overrides.
    fn first_run(
        &mut self,
        kind: ViewKind,
        columns: Option<&[String]>,
    ) -> dash_core::Result<dash_runtime::assembler::ViewReport> {
        let report = self.dashboard.run_view(kind, None, columns)?;
        let Some(observed) = report.range else {
            return Ok(report);
        };
        self.defaults.insert(kind, observed);

        let wanted = DateRange::new(
            self.start_override.unwrap_or(observed.start),
            self.end_override.unwrap_or(observed.end),
        );
        self.ranges.insert(kind, wanted);
        if wanted == observed {
            Ok(report)
        } else {
            self.dashboard.run_view(kind, Some(wanted), columns)
        }
    }

    /// Data source plus how old the view's extracts are, e.g.
    /// `"data · fetched 2m ago"`; flags a stale copy after a failed refetch.
    fn source_label(&self, kind: ViewKind) -> String {
        let mut label = self.dashboard.source_description();
        let freshness = self.dashboard.freshness(kind);
        if let Some(age) = freshness.age {
            label.push_str(&format!(" · fetched {} ago", format_age(age)));
        }
        if let Some(err) = freshness.stale_error {
            label.push_str(&format!(" · showing cached copy ({})", err));
        }
        label
    }

    /// Range applied to `kind`, once it has been computed.
    pub fn range_of(&self, kind: ViewKind) -> Option<DateRange> {
        self.ranges.get(&kind).copied()
    }

    pub fn table_offset(&self) -> usize {
        self.table_offset
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    /// Render the current application state into `frame`.
    pub fn render(&self, frame: &mut Frame) {
        if let Some(data) = &self.current {
            report_view::render_report_view(frame, frame.area(), data, &self.theme);
        }
    }
}

/// Coarse age for the header: seconds, minutes or hours.
fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m", secs / 60),
        _ => format!("{}h", secs / 3600),
    }
}

fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    let magnitude = Days::new(days.unsigned_abs());
    let moved = if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    };
    moved.unwrap_or(date)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
