use std::path::PathBuf;

use srh_core::EngineError;
use srh_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output {output}: {source}")]
    Engine {
        output: String,
        #[source]
        source: EngineError,
    },

    #[error("output {output}: tables to combine have row fields {expected:?} and {found:?}")]
    IndexMismatch {
        output: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("output {output}: column {column} is produced by more than one content group")]
    DuplicateColumn { output: String, column: String },

    #[error("output {output}: post step {step} needs column {column}, which is not in the table")]
    MissingColumn {
        output: String,
        step: &'static str,
        column: String,
    },

    #[error("output {output}: time series {message}")]
    TimeSeries { output: String, message: String },

    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    #[error("failed to read CSV {path}: {source}")]
    CsvRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write CSV {path}: {source}")]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl OutputError {
    pub(crate) fn engine(output: &str, source: EngineError) -> Self {
        Self::Engine {
            output: output.to_string(),
            source,
        }
    }

    pub(crate) fn time_series(output: &str, message: impl Into<String>) -> Self {
        Self::TimeSeries {
            output: output.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OutputError>;
