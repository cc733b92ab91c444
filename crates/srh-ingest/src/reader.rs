//! CSV loading via Polars.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use polars::prelude::{CsvReadOptions, CsvWriter, SerReader, SerWriter};
use srh_common::{dataset_from_frame, frame_from_dataset};
use srh_model::Dataset;
use tracing::{debug, info};

use crate::error::{IngestError, Result};

/// Options for reading a source table.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// When set, the file must hold exactly these columns (in any order).
    pub expected_columns: Option<Vec<String>>,
    /// Columns removed after the shape check.
    pub drop_columns: Vec<String>,
    /// Rows scanned for type inference; `None` scans the whole file.
    pub infer_schema_length: Option<usize>,
}

impl IngestOptions {
    #[must_use]
    pub fn with_expected_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_drop_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drop_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Reads a CSV file with a single header row.
pub fn read_csv(path: &Path) -> Result<Dataset> {
    read_csv_with_options(path, &IngestOptions::default())
}

pub fn read_csv_with_options(path: &Path, options: &IngestOptions) -> Result<Dataset> {
    if !path.is_file() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    info!(path = %path.display(), "importing data");

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(options.infer_schema_length)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::csv_parse(path, e))?
        .finish()
        .map_err(|e| IngestError::csv_parse(path, e))?;
    let mut dataset = dataset_from_frame(&df)?;

    if let Some(expected) = &options.expected_columns {
        check_shape(path, &dataset, expected)?;
    }
    if !options.drop_columns.is_empty() {
        let keep: Vec<&String> = dataset
            .fields()
            .iter()
            .filter(|field| !options.drop_columns.contains(field))
            .collect();
        dataset = dataset.select(&keep)?;
    }

    debug!(
        path = %path.display(),
        rows = dataset.height(),
        columns = dataset.fields().len(),
        "loaded table"
    );
    Ok(dataset)
}

/// Checks that `data` holds exactly the `expected` columns.
pub fn check_shape(path: &Path, data: &Dataset, expected: &[String]) -> Result<()> {
    let expected: BTreeSet<&str> = expected.iter().map(String::as_str).collect();
    let actual: BTreeSet<&str> = data.fields().iter().map(String::as_str).collect();
    if expected == actual {
        return Ok(());
    }
    Err(IngestError::Shape {
        path: path.to_path_buf(),
        missing: expected
            .difference(&actual)
            .map(|s| (*s).to_string())
            .collect(),
        unexpected: actual
            .difference(&expected)
            .map(|s| (*s).to_string())
            .collect(),
    })
}

/// Writes a dataset as CSV with a header row.
pub fn write_csv(data: &Dataset, path: &Path) -> Result<()> {
    let write_error = |message: String| IngestError::CsvWrite {
        path: path.to_path_buf(),
        message,
    };
    let mut df = frame_from_dataset(data).map_err(|e| write_error(e.to_string()))?;
    let mut file = File::create(path).map_err(|source| IngestError::FileCreate {
        path: path.to_path_buf(),
        source,
    })?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .map_err(|e| write_error(e.to_string()))?;
    info!(path = %path.display(), rows = data.height(), "exported records");
    Ok(())
}
