use std::path::PathBuf;
use thiserror::Error;

pub type ReportResult<T> = Result<T, ReportError>;

/// Conditions that stop the pipeline. Per-row revenue problems are not
/// represented here; they degrade to a missing value during coercion.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("data file not found at {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("error reading CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("error reading CSV: no columns to parse from {}", path.display())]
    EmptyFile { path: PathBuf },

    #[error("error reading CSV: {source}")]
    Io { source: std::io::Error },

    #[error("error reading CSV: expected {expected} fields in line {line}, saw {found}")]
    TooManyFields { line: u64, expected: usize, found: usize },

    #[error("error reading CSV: EOF inside string starting at line {line}")]
    UnterminatedQuote { line: usize },

    #[error("required column '{column}' not found in data")]
    MissingColumn { column: String },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

impl ReportError {
    /// Process exit status for this failure class.
    pub fn exit_code(&self) -> u8 {
        match self {
            ReportError::FileNotFound { .. } => 2,
            ReportError::Csv(_)
            | ReportError::EmptyFile { .. }
            | ReportError::Io { .. }
            | ReportError::TooManyFields { .. }
            | ReportError::UnterminatedQuote { .. } => 3,
            ReportError::MissingColumn { .. } => 4,
            ReportError::Serialize(_) | ReportError::Output(_) => 1,
        }
    }
}
