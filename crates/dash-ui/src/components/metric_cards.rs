use crate::themes::Theme;
use dash_core::formatting::format_metric;
use dash_core::models::{Metric, MetricBundle};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

// ── MetricCard ───────────────────────────────────────────────────────────────

/// One headline number: a dim label over a styled value.
pub struct MetricCard<'a> {
    pub metric: &'a Metric,
    pub theme: &'a Theme,
}

impl<'a> MetricCard<'a> {
    pub fn new(metric: &'a Metric, theme: &'a Theme) -> Self {
        Self { metric, theme }
    }

    /// Format: `"Total Amount"` then `"$ 12,345"`.
    pub fn to_lines(&self) -> Vec<Line<'a>> {
        vec![
            Line::from(Span::styled(self.metric.label.as_str(), self.theme.label)),
            Line::from(Span::styled(
                format_metric(&self.metric.value),
                self.theme.metric_style(&self.metric.value),
            )),
        ]
    }

    /// Single-line form used when the terminal is too narrow for cards.
    pub fn to_line(&self) -> Line<'a> {
        Line::from(vec![
            Span::styled(format!("{}: ", self.metric.label), self.theme.label),
            Span::styled(
                format_metric(&self.metric.value),
                self.theme.metric_style(&self.metric.value),
            ),
        ])
    }
}

// ── Card row ─────────────────────────────────────────────────────────────────

/// Minimum card width before falling back to one metric per line.
pub const MIN_CARD_WIDTH: u16 = 18;

/// Height the metric strip needs for `bundle` within `width` columns.
pub fn metric_strip_height(bundle: &MetricBundle, width: u16) -> u16 {
    if bundle.is_empty() {
        return 0;
    }
    if fits_as_cards(bundle, width) {
        4
    } else {
        bundle.len() as u16 + 2
    }
}

fn fits_as_cards(bundle: &MetricBundle, width: u16) -> bool {
    width / bundle.len().max(1) as u16 >= MIN_CARD_WIDTH
}

/// Render `bundle` as a row of bordered cards, or a bordered list when the
/// area is too narrow.
pub fn render_metric_strip(frame: &mut Frame, area: Rect, bundle: &MetricBundle, theme: &Theme) {
    if bundle.is_empty() {
        return;
    }

    if !fits_as_cards(bundle, area.width) {
        let lines: Vec<Line> = bundle
            .metrics
            .iter()
            .map(|m| MetricCard::new(m, theme).to_line())
            .collect();
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme.table_border),
            ),
            area,
        );
        return;
    }

    let constraints = vec![Constraint::Ratio(1, bundle.len() as u32); bundle.len()];
    let cells = Layout::horizontal(constraints).split(area);
    for (metric, cell) in bundle.metrics.iter().zip(cells.iter()) {
        frame.render_widget(
            Paragraph::new(MetricCard::new(metric, theme).to_lines()).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme.table_border),
            ),
            *cell,
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use dash_core::models::MetricValue;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn bundle() -> MetricBundle {
        let mut b = MetricBundle::default();
        b.push("total_customers", "Total Customers", MetricValue::Count(1234));
        b.push("churned_customers", "Churned Customers", MetricValue::Count(3));
        b.push("churn_rate", "Churn Rate", MetricValue::Undefined);
        b
    }

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_card_lines() {
        let theme = Theme::dark();
        let b = bundle();
        let lines = MetricCard::new(&b.metrics[0], &theme).to_lines();
        assert_eq!(text(&lines[0]), "Total Customers");
        assert_eq!(text(&lines[1]), "1,234");
    }

    #[test]
    fn test_undefined_renders_na() {
        let theme = Theme::dark();
        let b = bundle();
        let line = MetricCard::new(&b.metrics[2], &theme).to_line();
        assert_eq!(text(&line), "Churn Rate: n/a");
    }

    #[test]
    fn test_strip_height() {
        let b = bundle();
        assert_eq!(metric_strip_height(&b, 120), 4);
        assert_eq!(metric_strip_height(&b, 30), 5);
        assert_eq!(metric_strip_height(&MetricBundle::default(), 120), 0);
    }

    #[test]
    fn test_render_strip_does_not_panic() {
        let theme = Theme::dark();
        let b = bundle();
        for width in [120, 30] {
            let mut terminal = Terminal::new(TestBackend::new(width, 8)).unwrap();
            terminal
                .draw(|frame| render_metric_strip(frame, frame.area(), &b, &theme))
                .unwrap();
        }
    }
}
