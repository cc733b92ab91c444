//! Publication output catalogue.
//!
//! A catalogue is a TOML list of `[[outputs]]`, each naming the crosstab and
//! multi-field requests that make up one published table, how their results
//! are combined and the post steps applied before writing. Entries are
//! validated against the [`srh_model::EngineConfig`] before any data is
//! read.

pub mod catalogue;
pub mod error;
pub mod validate;

pub use catalogue::{
    Catalogue, ContentGroup, ContentRequest, DEFAULT_SERIES_LENGTH, OutputEntry, PostStep, Target,
    TimeSeriesSettings, load_engine_config,
};
pub use error::{CatalogueError, Result};
pub use validate::validate_entry;
