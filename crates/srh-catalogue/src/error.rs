use std::path::PathBuf;

use srh_filter::FilterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse catalogue: {source}")]
    Parse {
        #[source]
        source: toml::de::Error,
    },

    #[error("output {name} is defined more than once")]
    DuplicateOutput { name: String },

    #[error("output {entry}: {rule}")]
    InvalidEntry { entry: String, rule: String },

    #[error("output {entry}: invalid condition: {source}")]
    Condition {
        entry: String,
        #[source]
        source: FilterError,
    },

    #[error("unknown output {name}. Only {valid:?} are defined")]
    UnknownOutput { name: String, valid: Vec<String> },
}

impl CatalogueError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(entry: &str, rule: impl Into<String>) -> Self {
        Self::InvalidEntry {
            entry: entry.to_string(),
            rule: rule.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogueError>;
