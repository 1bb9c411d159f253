//! Terminal UI layer for the billing dashboard.
//!
//! Provides themes, the header, metric cards and text charts, the record
//! table, the full-screen view renderer and the main application event
//! loop built on top of [`ratatui`].

pub mod app;
pub mod components;
pub mod report_view;
pub mod table_view;
pub mod themes;

pub use dash_core as core;
