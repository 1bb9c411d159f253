//! Data layer for the billing dashboard.
//!
//! Parses CSV extracts into typed record sets, narrows them by date range
//! and predicate, joins related extracts, computes scalar metrics and
//! time series, summarises categorical columns and projects rows for
//! tabular display.

pub mod aggregator;
pub mod filter;
pub mod join;
pub mod loader;
pub mod projection;
pub mod summarizer;

pub use dash_core as core;
