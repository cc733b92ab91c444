//! Output catalogue records and TOML loading.

use std::path::Path;

use serde::{Deserialize, Serialize};
use srh_model::{CrosstabRequest, EngineConfig, Key, MultiFieldRequest};
use tracing::info;

use crate::error::{CatalogueError, Result};

/// Default number of periods kept in a time-series output.
pub const DEFAULT_SERIES_LENGTH: usize = 11;

/// Every output of a publication run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalogue {
    #[serde(default)]
    pub outputs: Vec<OutputEntry>,
}

/// One published table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputEntry {
    pub name: String,
    /// Where the table lands in the publication workbook.
    #[serde(default)]
    pub target: Option<Target>,
    #[serde(default = "default_true")]
    pub include_row_labels: bool,
    #[serde(default = "default_true")]
    pub years_as_rows: bool,
    #[serde(default)]
    pub time_series: Option<TimeSeriesSettings>,
    /// Groups joined side by side; requests within a group are stacked.
    pub contents: Vec<ContentGroup>,
    #[serde(default)]
    pub post: Vec<PostStep>,
}

impl OutputEntry {
    pub fn requests(&self) -> impl Iterator<Item = &ContentRequest> {
        self.contents.iter().flat_map(|group| group.requests.iter())
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    pub sheet: String,
    pub cell: String,
}

/// A fixed-length series of reporting periods updated once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeSeriesSettings {
    #[serde(default = "default_series_length")]
    pub length: usize,
}

fn default_series_length() -> usize {
    DEFAULT_SERIES_LENGTH
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentGroup {
    pub requests: Vec<ContentRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentRequest {
    Crosstab(CrosstabRequest),
    MultiField(MultiFieldRequest),
}

impl ContentRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentRequest::Crosstab(_) => "crosstab",
            ContentRequest::MultiField(_) => "multi_field",
        }
    }
}

/// Table-specific adjustment applied after assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case", deny_unknown_fields)]
pub enum PostStep {
    /// Drops rows whose cell in `column` is a withheld-value marker.
    DropRowsWithSentinel { column: String },
    /// Adds a constant leading label.
    InsertLabelColumn { name: String, value: String },
    MoveColumnsToEnd { columns: Vec<String> },
    DropColumns { columns: Vec<String> },
    /// Drops rows labelled with one of `values` under `field`.
    DropRows { field: String, values: Vec<Key> },
    /// Adds `numerator / denominator * scale`.
    RatioColumn {
        name: String,
        numerator: String,
        denominator: String,
        #[serde(default = "default_scale")]
        scale: f64,
    },
}

fn default_scale() -> f64 {
    100.0
}

impl PostStep {
    pub fn name(&self) -> &'static str {
        match self {
            PostStep::DropRowsWithSentinel { .. } => "drop_rows_with_sentinel",
            PostStep::InsertLabelColumn { .. } => "insert_label_column",
            PostStep::MoveColumnsToEnd { .. } => "move_columns_to_end",
            PostStep::DropColumns { .. } => "drop_columns",
            PostStep::DropRows { .. } => "drop_rows",
            PostStep::RatioColumn { .. } => "ratio_column",
        }
    }
}

impl Catalogue {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|source| CatalogueError::Parse { source })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CatalogueError::io(path, e))?;
        let catalogue: Catalogue = toml::from_str(&contents).map_err(|source| CatalogueError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), outputs = catalogue.outputs.len(), "loaded catalogue");
        Ok(catalogue)
    }

    pub fn names(&self) -> Vec<String> {
        self.outputs.iter().map(|entry| entry.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&OutputEntry> {
        self.outputs.iter().find(|entry| entry.name == name)
    }

    /// The named outputs in catalogue order, or every output when `only` is
    /// empty.
    pub fn select(&self, only: &[String]) -> Result<Vec<&OutputEntry>> {
        for name in only {
            if self.get(name).is_none() {
                return Err(CatalogueError::UnknownOutput {
                    name: name.clone(),
                    valid: self.names(),
                });
            }
        }
        Ok(self
            .outputs
            .iter()
            .filter(|entry| only.is_empty() || only.contains(&entry.name))
            .collect())
    }
}

/// Engine configuration from a TOML file; absent keys keep their defaults.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| CatalogueError::io(path, e))?;
    let config = toml::from_str(&contents).map_err(|source| CatalogueError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "loaded engine configuration");
    Ok(config)
}
