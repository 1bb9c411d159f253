use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use dash_core::formatting::format_number;
use dash_runtime::assembler::Chart;
use dash_runtime::views::ChartKind;

use crate::themes::Theme;

/// Visual configuration shared by the chart renderers.
pub struct BarConfig {
    /// Width in terminal columns of the bar portion (excluding labels).
    pub width: u16,
    pub filled_char: char,
    pub empty_char: char,
    /// Longest category label before truncation.
    pub max_label_width: usize,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            width: 40,
            filled_char: '\u{2588}', // █  FULL BLOCK
            empty_char: '\u{2591}',  // ░  LIGHT SHADE
            max_label_width: 24,
        }
    }
}

/// Integral values print without decimals, others with two.
pub fn format_point(value: f64) -> String {
    if value.fract() == 0.0 {
        format_number(value, 0)
    } else {
        format_number(value, 2)
    }
}

/// Pad or truncate `label` to exactly `width` terminal columns, ending a
/// truncated label with `…`.
fn fit_label(label: &str, width: usize) -> String {
    if label.width() <= width {
        return format!("{}{}", label, " ".repeat(width - label.width()));
    }
    if width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in label.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    // A double-width char that did not fit leaves a gap to fill.
    out.push_str(&" ".repeat(width - 1 - used));
    out
}

// ── HorizontalBars ────────────────────────────────────────────────────────────

/// One row per point: label, a bar scaled to the largest magnitude, value.
///
/// Negative values are drawn with the magnitude of their bar in the
/// negative-metric style.
pub struct HorizontalBars<'a> {
    pub points: &'a [(String, f64)],
    pub theme: &'a Theme,
    pub config: BarConfig,
}

impl<'a> HorizontalBars<'a> {
    pub fn new(points: &'a [(String, f64)], theme: &'a Theme) -> Self {
        Self {
            points,
            theme,
            config: BarConfig::default(),
        }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let max = self
            .points
            .iter()
            .map(|(_, v)| v.abs())
            .fold(0.0_f64, f64::max);
        let label_width = self
            .points
            .iter()
            .map(|(l, _)| l.width())
            .max()
            .unwrap_or(0)
            .min(self.config.max_label_width);

        self.points
            .iter()
            .map(|(label, value)| {
                let filled = if max > 0.0 {
                    ((value.abs() / max) * self.config.width as f64).round() as u16
                } else {
                    0
                };
                let empty = self.config.width.saturating_sub(filled);
                let fill_style = if *value < 0.0 {
                    self.theme.metric_negative
                } else {
                    self.theme.palette_style(0)
                };

                Line::from(vec![
                    Span::styled(fit_label(label, label_width), self.theme.label),
                    Span::raw(" "),
                    Span::styled(
                        std::iter::repeat_n(self.config.filled_char, filled as usize)
                            .collect::<String>(),
                        fill_style,
                    ),
                    Span::styled(
                        std::iter::repeat_n(self.config.empty_char, empty as usize)
                            .collect::<String>(),
                        self.theme.bar_empty,
                    ),
                    Span::styled(format!(" {}", format_point(*value)), self.theme.bar_label),
                ])
            })
            .collect()
    }
}

// ── ShareBar ──────────────────────────────────────────────────────────────────

/// A proportional multi-coloured bar for part-of-whole breakdowns.
///
/// Each category is a contiguous segment sized by its share of the total,
/// followed by one legend line per category with its value and share.
pub struct ShareBar<'a> {
    pub entries: &'a [(String, f64)],
    pub theme: &'a Theme,
    pub width: u16,
}

impl<'a> ShareBar<'a> {
    pub fn new(entries: &'a [(String, f64)], theme: &'a Theme) -> Self {
        Self {
            entries,
            theme,
            width: 40,
        }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        // Negative slices have no meaningful share.
        let total: f64 = self.entries.iter().map(|(_, v)| v.max(0.0)).sum();
        let mut bar: Vec<Span<'a>> = Vec::new();
        let mut legend: Vec<Line<'a>> = Vec::new();

        for (i, (label, value)) in self.entries.iter().enumerate() {
            let share = if total > 0.0 {
                value.max(0.0) / total * 100.0
            } else {
                0.0
            };
            let chars = ((share / 100.0) * self.width as f64).round() as usize;
            let style = self.theme.palette_style(i);
            if chars > 0 {
                bar.push(Span::styled("█".repeat(chars), style));
            }
            legend.push(Line::from(vec![
                Span::styled("■ ", style),
                Span::styled(label.clone(), self.theme.label),
                Span::styled(
                    format!("  {} ({:.1}%)", format_point(*value), share),
                    self.theme.bar_label,
                ),
            ]));
        }

        let mut lines = Vec::with_capacity(legend.len() + 1);
        lines.push(Line::from(bar));
        lines.extend(legend);
        lines
    }
}

// ── Chart dispatch ────────────────────────────────────────────────────────────

/// Render a chart's title, axis caption and body.
pub fn chart_lines<'a>(chart: &'a Chart, theme: &'a Theme) -> Vec<Line<'a>> {
    let mut lines = vec![Line::from(Span::styled(chart.title.as_str(), theme.header))];

    if chart.data.is_empty() {
        lines.push(Line::from(Span::styled("No data in range", theme.dim)));
        return lines;
    }

    let points = chart.data.points();
    match chart.kind {
        ChartKind::Pie => lines.extend(ShareBar::new(points, theme).to_lines()),
        ChartKind::Bar => {
            lines.push(Line::from(Span::styled(
                format!("{} by {}", chart.y_label, chart.x_label),
                theme.dim,
            )));
            lines.extend(HorizontalBars::new(points, theme).to_lines());
        }
    }
    lines
}

// ── Tests ─────────────────────────────────────────────────────────────────────
