//! Fixed-length time series updated with each reporting period.

use srh_catalogue::TimeSeriesSettings;
use srh_model::{Key, OutputRow, OutputTable};
use tracing::info;

use crate::error::{OutputError, Result};

/// Index field of a series laid out with one row per period.
pub const PERIOD_FIELD: &str = "Year";

/// The latest output as a single row labelled with the period.
fn latest_period(
    output: &str,
    latest: &OutputTable,
    period: &Key,
    periods_as_rows: bool,
) -> Result<OutputTable> {
    let latest = if periods_as_rows {
        latest.clone()
    } else {
        if latest.width() != 1 {
            return Err(OutputError::time_series(
                output,
                format!(
                    "laid out by column needs one value column, found {}",
                    latest.width()
                ),
            ));
        }
        latest.transpose(PERIOD_FIELD)
    };
    if latest.height() != 1 {
        return Err(OutputError::time_series(
            output,
            format!(
                "needs exactly one row for the latest period, found {}",
                latest.height()
            ),
        ));
    }
    let mut table = OutputTable::new(vec![PERIOD_FIELD.to_string()], latest.columns().to_vec());
    table.push_row(vec![period.clone()], latest.rows()[0].cells.clone())?;
    Ok(table)
}

/// Adds the latest period to an existing series.
///
/// A period already in the series is replaced in place. Otherwise it is
/// appended and the oldest periods are dropped to keep `settings.length`.
/// With `periods_as_rows` false the series holds one column per period.
pub fn update_time_series(
    output: &str,
    existing: Option<&OutputTable>,
    latest: &OutputTable,
    period: &str,
    settings: TimeSeriesSettings,
    periods_as_rows: bool,
) -> Result<OutputTable> {
    let period = Key::parse(period);
    let latest_row = latest_period(output, latest, &period, periods_as_rows)?;
    let Some(existing) = existing else {
        info!(output, %period, "started time series");
        return Ok(if periods_as_rows {
            latest_row
        } else {
            latest_row.transpose(latest.index_fields().first().map_or(PERIOD_FIELD, String::as_str))
        });
    };
    let [series_field] = existing.index_fields() else {
        return Err(OutputError::time_series(
            output,
            format!(
                "existing series must have one label column, found {:?}",
                existing.index_fields()
            ),
        ));
    };

    let series = if periods_as_rows {
        existing.clone()
    } else {
        existing.transpose(PERIOD_FIELD)
    };
    if series.columns() != latest_row.columns() {
        return Err(OutputError::time_series(
            output,
            format!(
                "holds {:?} but the latest period has {:?}",
                series.columns(),
                latest_row.columns()
            ),
        ));
    }

    let cells = latest_row.rows()[0].cells.clone();
    let fields = series.index_fields().to_vec();
    let columns = series.columns().to_vec();
    let mut rows = series.into_rows();
    let replaced = match rows.iter_mut().find(|row| row.labels[0] == period) {
        Some(row) => {
            row.cells = cells;
            true
        }
        None => {
            rows.push(OutputRow {
                labels: vec![period.clone()],
                cells,
            });
            let excess = rows.len().saturating_sub(settings.length);
            rows.drain(..excess);
            false
        }
    };
    let updated = OutputTable::from_rows(fields, columns, rows)?;
    info!(output, %period, periods = updated.height(), replaced, "updated time series");
    Ok(if periods_as_rows {
        updated
    } else {
        updated.transpose(series_field)
    })
}
