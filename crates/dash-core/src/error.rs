use thiserror::Error;

/// All errors produced by the billing dashboard.
#[derive(Error, Debug)]
pub enum DashError {
    /// Raw extract text could not be tokenised into a consistent table.
    #[error("Failed to load data: {0}")]
    Load(String),

    /// The data source has no object under the requested key.
    #[error("Dataset not found: {0}")]
    NotFound(String),

    /// The data source failed in a way that may succeed on retry.
    #[error("Transient I/O error: {0}")]
    TransientIo(String),

    /// A ratio metric was requested with a zero denominator.
    #[error("Ratio is undefined for a zero denominator")]
    DivisionUndefined,

    /// An explicit column selection named columns the extract does not have.
    #[error("Unknown columns: {}", .0.join(", "))]
    UnknownColumns(Vec<String>),

    /// A date string supplied by the user could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A computation for one report view failed; names the view.
    #[error("{view} view failed: {source}")]
    View {
        view: String,
        #[source]
        source: Box<DashError>,
    },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DashError {
    /// Wrap `self` so the message names the view that failed.
    pub fn in_view(self, view: impl Into<String>) -> Self {
        DashError::View {
            view: view.into(),
            source: Box::new(self),
        }
    }

    /// `true` for failures worth retrying against the data source.
    pub fn is_transient(&self) -> bool {
        matches!(self, DashError::TransientIo(_))
    }
}

/// Convenience alias used throughout the dashboard crates.
pub type Result<T> = std::result::Result<T, DashError>;
