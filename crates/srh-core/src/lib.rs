//! Aggregation engine for the SRH publication.
//!
//! [`Engine`] turns record-level [`srh_model::Dataset`]s into
//! [`srh_model::OutputTable`]s: crosstabs of row fields against a column
//! field, and multi-field tables of measure flags per breakdown. Both can
//! synthesise subgroups, join the organisation reference, apply disclosure
//! control and derive percentages; crosstabs can also derive population
//! rates.

mod aggregate;
mod crosstab;
pub mod disclosure;
pub mod engine;
pub mod error;
mod multi_field;
pub mod ordering;
pub mod orgref;
mod percent;
mod pivot;
pub mod population;
mod rate;
mod subgroup;

pub use disclosure::{round_half_up, suppress_cell, suppress_count};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use multi_field::MEASURE_FIELD;
pub use ordering::sort_fields;
pub use orgref::select_org_reference;
pub use population::{population_level, select_population};
