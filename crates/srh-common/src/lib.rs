//! Shared utilities for the SRH publication crates.
//!
//! Converts between Polars frames and the engine's [`srh_model::Dataset`].

pub mod frame;

pub use frame::{
    any_to_f64, any_to_string, any_to_value, column_values, dataset_from_frame, format_numeric,
    frame_from_dataset, parse_f64,
};
