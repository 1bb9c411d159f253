//! Runtime layer for the billing dashboard.
//!
//! Fetches raw extracts from a data source with retry and caching, holds
//! the declarative per-view catalogue and assembles view reports for the
//! presentation layer.

pub mod assembler;
pub mod data_manager;
pub mod source;
pub mod views;

pub use dash_core as core;
pub use dash_data as data;
