//! Error types for loading and aggregating survey data.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required column is not present in the input header.
    #[error("Missing column: {column}")]
    MissingColumn { column: String },

    /// A value is outside its expected domain.
    #[error("Invalid value {value:?} in column {column}{}: {reason}", row_suffix(.row))]
    InvalidValue {
        row: Option<usize>,
        column: String,
        value: String,
        reason: String,
    },

    /// A ratio was requested over a group with no records.
    #[error("Empty group: {0}")]
    EmptyGroup(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Builds an `InvalidValue` error. `row` is the 1-based data row when the
    /// value came from an input file.
    pub fn invalid(
        row: Option<usize>,
        column: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            row,
            column: column.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

fn row_suffix(row: &Option<usize>) -> String {
    match row {
        Some(n) => format!(" (row {})", n),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
