//! Reusable line-level widgets: header, metric cards and text charts.

pub mod bar_chart;
pub mod header;
pub mod metric_cards;
