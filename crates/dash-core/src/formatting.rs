//! Display formatting for metric cards, chart labels and table cells.

use crate::models::MetricValue;

/// Placeholder shown for a ratio whose denominator was zero.
pub const UNDEFINED_DISPLAY: &str = "n/a";

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use dash_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    // "-0" is not worth showing.
    if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Whole-dollar amount with thousands separators, e.g. `"$ 12,345"`.
///
/// ```
/// use dash_core::formatting::format_currency;
///
/// assert_eq!(format_currency(12345.4), "$ 12,345");
/// assert_eq!(format_currency(-20.0), "$ -20");
/// ```
pub fn format_currency(amount: f64) -> String {
    format!("$ {}", format_number(amount, 0))
}

/// Integer count with thousands separators.
pub fn format_count(count: u64) -> String {
    group_thousands(&count.to_string())
}

/// Percentage with two decimals, e.g. `"12.50%"`.
pub fn format_percent(pct: f64) -> String {
    format!("{}%", format_number(pct, 2))
}

/// Render a metric value according to its own presentation tag.
pub fn format_metric(value: &MetricValue) -> String {
    match value {
        MetricValue::Currency(v) => format_currency(*v),
        MetricValue::Count(c) => format_count(*c),
        MetricValue::Percent(p) => format_percent(*p),
        MetricValue::Undefined => UNDEFINED_DISPLAY.to_string(),
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of a digit string.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
