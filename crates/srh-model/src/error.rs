use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("field {field} does not exist; only {available:?} are available")]
    MissingField {
        field: String,
        available: Vec<String>,
    },

    #[error("field {field} appears more than once")]
    DuplicateField { field: String },

    #[error("column {field} has {actual} values but the table has {expected} rows")]
    ColumnLength {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("row has {actual} {part} but the table expects {expected}")]
    RowShape {
        part: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error(
        "an invalid value has been entered in the {check} input: {value}. Only {valid:?} are valid values"
    )]
    InvalidChoice {
        check: String,
        value: String,
        valid: Vec<String>,
    },
}

impl ModelError {
    pub(crate) fn missing_field(field: &str, available: &[String]) -> Self {
        Self::MissingField {
            field: field.to_string(),
            available: available.to_vec(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Checks `value` against a closed list of valid options.
pub fn validate_choice<S: AsRef<str>>(check: &str, value: &str, valid: &[S]) -> Result<()> {
    if valid.iter().any(|candidate| candidate.as_ref() == value) {
        return Ok(());
    }
    Err(ModelError::InvalidChoice {
        check: check.to_string(),
        value: value.to_string(),
        valid: valid.iter().map(|v| v.as_ref().to_string()).collect(),
    })
}
