//! Shared building blocks for the billing dashboard.
//!
//! Holds the typed record model, metric and series types handed to the
//! presentation layer, the error taxonomy, display formatting, timestamp
//! parsing and the command-line settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{DashError, Result};
