//! Publication outputs built from engine requests.
//!
//! A catalogue entry is turned into a table by [`build_output`]: the requests
//! of each content group are stacked, the groups are joined on their row
//! labels and the entry's post steps are applied. Tables are then written as
//! CSV or JSON, and entries configured as a time series are merged with the
//! series already on disk by [`update_time_series`].

pub mod assemble;
pub mod error;
pub mod post;
pub mod series;
pub mod writer;

pub use assemble::{build_output, join, stack};
pub use error::{OutputError, Result};
pub use post::{apply_step, apply_steps};
pub use series::{PERIOD_FIELD, update_time_series};
pub use writer::{read_csv_table, render_csv, render_json, write_csv, write_json};
