//! Data model for the SRH publication engine.
//!
//! Loaded tables are [`Dataset`]s of [`Value`]s; aggregation results are
//! [`OutputTable`]s of [`Cell`]s. [`EngineConfig`] and the request records
//! describe what to aggregate and how.

pub mod cell;
pub mod config;
pub mod dataset;
pub mod error;
pub mod request;
pub mod table;
pub mod value;

pub use cell::{Cell, Symbols, format_number};
pub use config::{
    DedupeRule, DisclosureSettings, EngineConfig, FilterDefinition, GroupTotal, LocalOrgField,
    MeasureGroup, OrgPrefixRule, OrgReferenceSettings, PopulationLevel, PopulationSettings,
};
pub use dataset::Dataset;
pub use error::{ModelError, Result, validate_choice};
pub use request::{
    Aggregation, ColumnSubgroup, CrosstabRequest, MultiFieldRequest, OutputKind, RowSubgroup,
};
pub use table::{OutputRow, OutputTable};
pub use value::{Key, Value};
