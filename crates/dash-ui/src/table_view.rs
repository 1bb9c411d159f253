//! Tabular listing of the records behind a view.
//!
//! Renders a bordered [`ratatui::widgets::Table`] of the projected columns,
//! starting at a scroll offset, with alternating row styles.

use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use dash_core::formatting::format_count;
use dash_data::projection::Table as ProjectedTable;

use crate::themes::Theme;

/// Widest a column may grow before its cells are clipped.
pub const MAX_COLUMN_WIDTH: u16 = 32;

/// Column widths fitted to the header and the visible cells.
pub fn column_widths(table: &ProjectedTable, offset: usize, visible: usize) -> Vec<Constraint> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let widest_cell = table
                .rows
                .iter()
                .skip(offset)
                .take(visible)
                .filter_map(|r| r.get(i))
                .map(|c| c.width())
                .max()
                .unwrap_or(0);
            let w = name.width().max(widest_cell) as u16;
            Constraint::Length(w.clamp(4, MAX_COLUMN_WIDTH))
        })
        .collect()
}

/// Render `table` into `area`, skipping the first `offset` rows.
///
/// The block title shows `title` and which rows are on screen.
pub fn render_table_view(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    table: &ProjectedTable,
    offset: usize,
    theme: &Theme,
) {
    // Borders plus header row.
    let visible = area.height.saturating_sub(3) as usize;
    let offset = offset.min(table.len().saturating_sub(1));

    let header = Row::new(
        table
            .columns
            .iter()
            .map(|h| Cell::from(h.as_str()).style(theme.table_header)),
    )
    .height(1);

    let rows: Vec<Row> = table
        .rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, row)| {
            let style = if i % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            Row::new(row.iter().map(|c| Cell::from(c.as_str()))).style(style)
        })
        .collect();

    let shown_end = (offset + visible).min(table.len());
    let caption = if table.is_empty() {
        format!(" {} (no rows) ", title)
    } else {
        format!(
            " {} ({}–{} of {}) ",
            title,
            format_count(offset as u64 + 1),
            format_count(shown_end as u64),
            format_count(table.len() as u64)
        )
    };

    let widget = Table::new(rows, column_widths(table, offset, visible))
        .header(header)
        .column_spacing(2)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(caption),
        )
        .style(theme.text);

    frame.render_widget(widget, area);
}

/// Render a placeholder when a view could not be computed.
pub fn render_no_data(frame: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), theme.error)),
        Line::from(""),
        Line::from(Span::styled(
            "Other views are unaffected; press 1-5 or Tab to switch.",
            theme.dim,
        )),
        Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Billing Dashboard "),
        ),
        area,
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────
