//! Source table ingestion for the SRH publication.
//!
//! Loads CSV extracts into [`srh_model::Dataset`]s and runs the checks that
//! must pass before any aggregation: column shape, reporting period and
//! organisation classification.

pub mod error;
pub mod organisation;
pub mod period;
pub mod reader;

pub use error::{IngestError, Result};
pub use organisation::{
    ORG_LEVEL_FIELD, ORG_TYPE_FIELD, classify_code, classify_organisations, unclassified_rows,
};
pub use period::{FinancialYear, YearStyle, check_reporting_period, to_financial_years};
pub use reader::{IngestOptions, check_shape, read_csv, read_csv_with_options, write_csv};
