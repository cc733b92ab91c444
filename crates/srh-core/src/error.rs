use srh_filter::FilterError;
use srh_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid {part} expression: {source}")]
    Expression {
        part: &'static str,
        #[source]
        source: FilterError,
    },

    #[error(
        "the process is attempting to extract {field} from the population data but it does not exist. Only {available:?} are available"
    )]
    PopulationField {
        field: String,
        available: Vec<String>,
    },

    #[error("rates were requested but no population table is attached")]
    MissingPopulation,

    #[error("{field} needs the organisation reference table but none is attached")]
    MissingOrgReference { field: String },

    #[error("percentages down rows need a total row in the table")]
    MissingTotalRow,

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl EngineError {
    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
