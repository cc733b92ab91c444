//! Table-specific adjustments applied after assembly.

use srh_catalogue::PostStep;
use srh_model::{Cell, Key, OutputTable};
use tracing::debug;

use crate::error::{OutputError, Result};

fn missing(output: &str, step: &PostStep, column: &str) -> OutputError {
    OutputError::MissingColumn {
        output: output.to_string(),
        step: step.name(),
        column: column.to_string(),
    }
}

fn ratio(numerator: Cell, denominator: Cell, scale: f64) -> Cell {
    match (numerator, denominator) {
        (_, Cell::Value(d)) if d == 0.0 => Cell::NotApplicable,
        (Cell::Value(n), Cell::Value(d)) => Cell::Value(n * scale / d),
        (Cell::Value(_), marker) | (marker, _) => marker,
    }
}

/// Applies `steps` in order.
pub fn apply_steps(mut table: OutputTable, steps: &[PostStep], output: &str) -> Result<OutputTable> {
    for step in steps {
        table = apply_step(table, step, output)?;
        debug!(step = step.name(), rows = table.height(), "applied post step");
    }
    Ok(table)
}

pub fn apply_step(mut table: OutputTable, step: &PostStep, output: &str) -> Result<OutputTable> {
    match step {
        PostStep::DropRowsWithSentinel { column } => {
            let idx = table
                .column_index(column)
                .ok_or_else(|| missing(output, step, column))?;
            table.retain_rows(|row| row.cells[idx].is_value());
        }
        PostStep::InsertLabelColumn { name, value } => {
            table.insert_index_field(0, name.clone(), &Key::parse(value));
        }
        PostStep::MoveColumnsToEnd { columns } => {
            for column in columns {
                table.move_column_to_end(column);
            }
        }
        PostStep::DropColumns { columns } => {
            for column in columns {
                table.remove_column(column);
            }
        }
        PostStep::DropRows { field, values } => {
            let idx = table
                .index_fields()
                .iter()
                .position(|f| f == field)
                .ok_or_else(|| missing(output, step, field))?;
            table.retain_rows(|row| !values.contains(&row.labels[idx]));
        }
        PostStep::RatioColumn {
            name,
            numerator,
            denominator,
            scale,
        } => {
            let numerators = table
                .column_cells(numerator)
                .ok_or_else(|| missing(output, step, numerator))?;
            let denominators = table
                .column_cells(denominator)
                .ok_or_else(|| missing(output, step, denominator))?;
            let cells = numerators
                .into_iter()
                .zip(denominators)
                .map(|(n, d)| ratio(n, d, *scale))
                .collect();
            table.insert_column(table.width(), name.clone(), cells)?;
        }
    }
    Ok(table)
}
