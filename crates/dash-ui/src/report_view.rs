//! Full-screen rendering of one dashboard view.
//!
//! Layout from top to bottom: header with view tabs, metric cards, charts,
//! the record table and a key-hint footer. A view that failed to compute
//! shows its error in place of the body.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use dash_runtime::assembler::ViewReport;
use dash_runtime::views::ViewKind;

use crate::components::bar_chart::chart_lines;
use crate::components::header::Header;
use crate::components::metric_cards::{metric_strip_height, render_metric_strip};
use crate::table_view;
use crate::themes::Theme;

/// Terminal width at which charts are laid out side by side.
pub const WIDE_LAYOUT_MIN_WIDTH: u16 = 110;

/// Everything needed to draw one frame.
pub struct ReportViewData {
    pub active: ViewKind,
    /// Applied range as shown in the header.
    pub range: String,
    pub source: String,
    /// The computed report, or the message of the error that prevented it.
    pub outcome: Result<ViewReport, String>,
    /// First table row on screen.
    pub table_offset: usize,
}

/// Render the view into `area`.
pub fn render_report_view(frame: &mut Frame, area: Rect, data: &ReportViewData, theme: &Theme) {
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let header = Header::new(data.active, &data.range, &data.source, theme);
    frame.render_widget(Paragraph::new(Text::from(header.to_lines())), header_area);

    match &data.outcome {
        Ok(report) => render_body(frame, body_area, report, data.table_offset, theme),
        Err(message) => table_view::render_no_data(frame, body_area, message, theme),
    }

    frame.render_widget(Paragraph::new(footer_line(theme)), footer_area);
}

fn render_body(frame: &mut Frame, area: Rect, report: &ViewReport, offset: usize, theme: &Theme) {
    let strip = metric_strip_height(&report.metrics, area.width);
    let [metrics_area, charts_area, table_area] = Layout::vertical([
        Constraint::Length(strip),
        Constraint::Percentage(55),
        Constraint::Min(5),
    ])
    .areas(area);

    render_metric_strip(frame, metrics_area, &report.metrics, theme);
    render_charts(frame, charts_area, report, theme);
    table_view::render_table_view(
        frame,
        table_area,
        report.view.title(),
        &report.table,
        offset,
        theme,
    );
}

fn render_charts(frame: &mut Frame, area: Rect, report: &ViewReport, theme: &Theme) {
    if report.charts.is_empty() || area.height == 0 {
        return;
    }

    let columns = if area.width >= WIDE_LAYOUT_MIN_WIDTH && report.charts.len() > 1 {
        2
    } else {
        1
    };
    let rows = report.charts.len().div_ceil(columns);
    let row_areas = Layout::vertical(vec![Constraint::Ratio(1, rows as u32); rows]).split(area);

    for (row_idx, row_area) in row_areas.iter().enumerate() {
        let cells =
            Layout::horizontal(vec![Constraint::Ratio(1, columns as u32); columns]).split(*row_area);
        for (col_idx, cell) in cells.iter().enumerate() {
            let Some(chart) = report.charts.get(row_idx * columns + col_idx) else {
                continue;
            };
            let paragraph = Paragraph::new(Text::from(chart_lines(chart, theme))).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme.table_border),
            );
            frame.render_widget(paragraph, *cell);
        }
    }
}

/// Key hints shown on the last line.
pub fn footer_line(theme: &Theme) -> Line<'static> {
    let hint = |key: &'static str, what: &'static str| {
        [
            Span::styled(key, theme.info),
            Span::styled(what, theme.dim),
        ]
    };
    let mut spans = Vec::new();
    for pair in [
        hint("1-5/Tab", " view  "),
        hint("[ ]", " start ±1d  "),
        hint("{ }", " end ±1d  "),
        hint("r", " reset range  "),
        hint("↑↓", " scroll  "),
        hint("R", " reload  "),
        hint("q", " quit"),
    ] {
        spans.extend(pair);
    }
    Line::from(spans)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
