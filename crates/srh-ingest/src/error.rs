//! Error types for loading and checking source tables.

use std::path::PathBuf;

use srh_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    #[error("failed to write CSV {path}: {message}")]
    CsvWrite { path: PathBuf, message: String },

    #[error("failed to create file {path}: {source}")]
    FileCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "the data imported from {path} does not contain the expected column names: missing {missing:?}, unexpected {unexpected:?}"
    )]
    Shape {
        path: PathBuf,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error(
        "the reporting period in the parameters ({expected}) does not match the period found in field {field} ({found:?})"
    )]
    PeriodMismatch {
        field: String,
        expected: String,
        found: Vec<String>,
    },

    #[error("invalid financial year {value}: expected the form YYYY-YY")]
    InvalidPeriod { value: String },

    #[error(
        "{count} records in field {field} carry organisation codes that are not yet classified: {codes:?}"
    )]
    UnclassifiedCodes {
        field: String,
        count: usize,
        codes: Vec<String>,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl IngestError {
    pub(crate) fn csv_parse(path: impl Into<PathBuf>, err: impl ToString) -> Self {
        Self::CsvParse {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
