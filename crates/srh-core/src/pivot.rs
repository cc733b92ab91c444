//! Long-to-wide reshaping with grand totals.

use std::collections::{BTreeMap, BTreeSet};

use srh_model::{Cell, Key, OutputTable};

use crate::error::Result;

/// Labels of the grand-total row for a table with `width` index fields.
pub(crate) fn total_labels(width: usize, total_label: &str) -> Vec<Key> {
    let mut labels = vec![Key::blank(); width.max(1)];
    labels[0] = Key::Text(total_label.to_string());
    labels.truncate(width);
    labels
}

/// Appends the grand-total row: the column-wise sum of every other row.
pub(crate) fn append_total_row(table: &mut OutputTable, total_label: &str) -> Result<()> {
    let mut totals = vec![0.0; table.width()];
    for row in table.rows() {
        if row.is_total(total_label) {
            continue;
        }
        for (total, cell) in totals.iter_mut().zip(&row.cells) {
            *total += cell.as_f64().unwrap_or(0.0);
        }
    }
    let labels = total_labels(table.index_fields().len(), total_label);
    table.push_row(labels, totals.into_iter().map(Cell::Value).collect())?;
    Ok(())
}

/// Spreads grouped values into one row per row key and one column per
/// category of `column`, in ascending key order, then adds the total column
/// and the total row. Absent combinations are zero.
///
/// Group keys are the row fields followed by the column field when there is
/// one. Without a column field the only column is the total.
pub(crate) fn pivot(
    groups: &BTreeMap<Vec<Key>, Vec<f64>>,
    rows: &[String],
    column: Option<&str>,
    total_label: &str,
) -> Result<OutputTable> {
    let width = rows.len();
    let mut categories = BTreeSet::new();
    let mut wide: BTreeMap<&[Key], (BTreeMap<&Key, f64>, f64)> = BTreeMap::new();
    for (key, values) in groups {
        let value = values.first().copied().unwrap_or(0.0);
        let (row_key, rest) = key.split_at(width.min(key.len()));
        let (by_category, total) = wide.entry(row_key).or_default();
        *total += value;
        if let (Some(_), Some(category)) = (column, rest.first()) {
            categories.insert(category);
            *by_category.entry(category).or_insert(0.0) += value;
        }
    }

    let mut columns: Vec<String> = categories.iter().map(ToString::to_string).collect();
    columns.push(total_label.to_string());

    let mut table = OutputTable::new(rows.to_vec(), columns);
    for (row_key, (by_category, total)) in wide {
        let mut cells: Vec<Cell> = categories
            .iter()
            .map(|category| Cell::Value(by_category.get(*category).copied().unwrap_or(0.0)))
            .collect();
        cells.push(Cell::Value(total));
        table.push_row(row_key.to_vec(), cells)?;
    }
    append_total_row(&mut table, total_label)?;
    Ok(table)
}
