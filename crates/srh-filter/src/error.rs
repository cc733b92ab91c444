use srh_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to parse filter expression `{expression}` at offset {offset}: {message}")]
    Parse {
        expression: String,
        offset: usize,
        message: String,
    },

    #[error(
        "an invalid value has been entered in the filter_type input: {name}. Only {valid:?} are valid values"
    )]
    UnknownFilter { name: String, valid: Vec<String> },

    #[error("invalid definition for filter {name}: {source}")]
    Definition {
        name: String,
        #[source]
        source: Box<FilterError>,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, FilterError>;
