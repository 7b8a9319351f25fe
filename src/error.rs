//! Error types for table construction and cleaning operations.

use std::num::ParseFloatError;
use thiserror::Error;

/// Every failure a table operation can report.
#[derive(Error, Debug)]
pub enum CleanError {
    /// No header matches the requested column name
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// A rename or split would introduce a duplicate header
    #[error("column already exists: {0}")]
    ColumnAlreadyExists(String),

    /// A row's width differs from the header count at construction time
    #[error("row {row} has an incompatible number of columns: {actual} (expected: {expected})")]
    ShapeMismatch {
        row: usize,
        actual: usize,
        expected: usize,
    },

    #[error("headers cannot be empty")]
    EmptyHeaders,

    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// A non-empty cell in a numeric column did not parse as a float
    #[error("row {row}, column {column}: conversion error for {value:?}: {source}")]
    NumericConversion {
        row: usize,
        column: String,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    /// No known layout parsed the cell
    #[error("row {row}, column {column}: date format not found: {value}")]
    DateParseFailure {
        row: usize,
        column: String,
        value: String,
    },

    #[error("at least one new column name must be specified")]
    NoNewColumns,

    /// A date layout could not be translated or used for formatting
    #[error("invalid date layout: {0}")]
    InvalidLayout(String),

    /// A cleaning step description could not be parsed
    #[error("invalid step: {0}")]
    InvalidStep(String),

    /// The per-call worker pool could not be started
    #[error("worker pool error: {0}")]
    WorkerPool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("plan error: {0}")]
    Plan(String),
}

impl From<serde_yaml::Error> for CleanError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Plan(format!("YAML error: {err}"))
    }
}

impl From<serde_json::Error> for CleanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Plan(format!("JSON error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, CleanError>;
