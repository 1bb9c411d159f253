use crate::themes::Theme;
use dash_runtime::views::ViewKind;
use ratatui::text::{Line, Span};

/// Decorative string placed either side of the application title.
pub const SPARKLES: &str = "✦ ✧ ✦ ✧";

/// Dashboard header rendering four lines:
///
/// 1. Application title with sparkle decorations.
/// 2. A 60-column `=` separator.
/// 3. View tabs, the active one highlighted, with their hotkeys.
/// 4. Applied date range and data source in `[ range | source ]` format.
pub struct Header<'a> {
    pub active: ViewKind,
    /// Human-readable range, e.g. `"2024-01-01 → 2024-01-31"`.
    pub range: &'a str,
    /// Data source description (directory or base URL).
    pub source: &'a str,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(active: ViewKind, range: &'a str, source: &'a str, theme: &'a Theme) -> Self {
        Self {
            active,
            range,
            source,
            theme,
        }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let separator = "=".repeat(60);

        let mut tabs: Vec<Span<'a>> = Vec::new();
        for (i, kind) in ViewKind::ALL.into_iter().enumerate() {
            let style = if kind == self.active {
                self.theme.tab_active
            } else {
                self.theme.tab_inactive
            };
            tabs.push(Span::styled(format!(" {} {} ", i + 1, kind.title()), style));
            tabs.push(Span::raw(" "));
        }

        vec![
            Line::from(vec![
                Span::styled(SPARKLES, self.theme.header),
                Span::styled(" BILLING DASHBOARD ", self.theme.header),
                Span::styled(SPARKLES, self.theme.header),
            ]),
            Line::from(Span::styled(separator, self.theme.separator)),
            Line::from(tabs),
            Line::from(vec![
                Span::styled("[ ", self.theme.label),
                Span::styled(self.range, self.theme.value),
                Span::styled(" | ", self.theme.label),
                Span::styled(self.source, self.theme.value),
                Span::styled(" ]", self.theme.label),
            ]),
        ]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
