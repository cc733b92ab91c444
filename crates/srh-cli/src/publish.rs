//! Building catalogue outputs and writing them to the output directory.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use srh_catalogue::OutputEntry;
use srh_core::Engine;
use srh_model::Dataset;
use srh_output::{build_output, read_csv_table, update_time_series, write_csv, write_json};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    /// Reporting period used to label time series rows.
    pub period: Option<String>,
    pub dry_run: bool,
}

/// What one catalogue entry produced.
#[derive(Debug, Clone)]
pub struct PublishedOutput {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    /// Workbook location, `Sheet!Cell`.
    pub target: Option<String>,
    pub time_series: bool,
    /// Unset on a dry run.
    pub path: Option<PathBuf>,
}

/// File for an output, named after the entry.
pub fn output_path(output_dir: &Path, name: &str, format: OutputFormat) -> PathBuf {
    let stem: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    output_dir.join(format!("{stem}.{}", format.extension()))
}

/// Builds one entry and writes it, merging time series with the file
/// already on disk.
pub fn publish_entry(
    engine: &Engine,
    data: &Dataset,
    entry: &OutputEntry,
    options: &PublishOptions,
) -> Result<PublishedOutput> {
    let start = Instant::now();
    let symbols = &engine.config().symbols;
    let path = output_path(&options.output_dir, &entry.name, options.format);
    let mut table = build_output(engine, data, entry)?;

    if let Some(settings) = entry.time_series {
        if options.format != OutputFormat::Csv {
            bail!("time series output {} can only be written as CSV", entry.name);
        }
        let period = options
            .period
            .as_deref()
            .ok_or_else(|| anyhow!("time series output {} needs --period", entry.name))?;
        let existing = if path.exists() {
            Some(
                read_csv_table(&path, 1, symbols)
                    .with_context(|| format!("read time series {}", path.display()))?,
            )
        } else {
            None
        };
        table = update_time_series(
            &entry.name,
            existing.as_ref(),
            &table,
            period,
            settings,
            entry.years_as_rows,
        )?;
    }

    // A time series is read back on the next run, so it keeps its labels.
    let include_row_labels = entry.include_row_labels || entry.time_series.is_some();
    let written = if options.dry_run {
        None
    } else {
        match options.format {
            OutputFormat::Csv => write_csv(&table, &path, include_row_labels, symbols)?,
            OutputFormat::Json => write_json(&entry.name, &table, &path, symbols)?,
        }
        Some(path)
    };
    info!(
        output = %entry.name,
        rows = table.height(),
        columns = table.width(),
        duration_ms = start.elapsed().as_millis(),
        "published output"
    );
    Ok(PublishedOutput {
        name: entry.name.clone(),
        rows: table.height(),
        columns: table.width(),
        target: entry
            .target
            .as_ref()
            .map(|target| format!("{}!{}", target.sheet, target.cell)),
        time_series: entry.time_series.is_some(),
        path: written,
    })
}

/// Publishes every entry in order, stopping at the first failure.
pub fn publish_all(
    engine: &Engine,
    data: &Dataset,
    entries: &[&OutputEntry],
    options: &PublishOptions,
) -> Result<Vec<PublishedOutput>> {
    entries
        .iter()
        .map(|entry| publish_entry(engine, data, entry, options))
        .collect()
}
