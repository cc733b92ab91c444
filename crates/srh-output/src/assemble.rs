//! Combining the request results of one catalogue entry into a table.

use std::collections::HashMap;

use srh_catalogue::{ContentRequest, OutputEntry};
use srh_core::Engine;
use srh_model::{Cell, Dataset, Key, OutputTable};
use tracing::{debug, info, info_span};

use crate::error::{OutputError, Result};
use crate::post::apply_steps;

/// Runs every request of `entry`, stacks each content group, joins the
/// groups on their row labels and applies the post steps.
pub fn build_output(engine: &Engine, data: &Dataset, entry: &OutputEntry) -> Result<OutputTable> {
    let _span = info_span!("output", name = %entry.name).entered();
    let mut groups = Vec::with_capacity(entry.contents.len());
    for group in &entry.contents {
        let tables = group
            .requests
            .iter()
            .map(|request| run_request(engine, data, request))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|source| OutputError::engine(&entry.name, source))?;
        groups.push(stack(&entry.name, tables)?);
    }
    let table = join(&entry.name, groups)?;
    let table = apply_steps(table, &entry.post, &entry.name)?;
    info!(rows = table.height(), columns = table.width(), "assembled output");
    Ok(table)
}

fn run_request(
    engine: &Engine,
    data: &Dataset,
    request: &ContentRequest,
) -> srh_core::Result<OutputTable> {
    debug!(kind = request.kind(), "running request");
    match request {
        ContentRequest::Crosstab(request) => engine.crosstab(data, request),
        ContentRequest::MultiField(request) => engine.multi_field(data, request),
    }
}

fn check_index(output: &str, expected: &[String], table: &OutputTable) -> Result<()> {
    if table.index_fields() == expected {
        return Ok(());
    }
    Err(OutputError::IndexMismatch {
        output: output.to_string(),
        expected: expected.to_vec(),
        found: table.index_fields().to_vec(),
    })
}

/// Appends the rows of every table under the union of their columns.
/// Columns a table lacks are zero in its rows.
pub fn stack(output: &str, tables: Vec<OutputTable>) -> Result<OutputTable> {
    let Some(first) = tables.first() else {
        return Ok(OutputTable::default());
    };
    let index_fields = first.index_fields().to_vec();
    let mut columns: Vec<String> = Vec::new();
    for table in &tables {
        check_index(output, &index_fields, table)?;
        for column in table.columns() {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }

    let mut stacked = OutputTable::new(index_fields, columns.clone());
    for table in tables {
        let positions: Vec<Option<usize>> =
            columns.iter().map(|column| table.column_index(column)).collect();
        for row in table.into_rows() {
            let cells = positions
                .iter()
                .map(|position| position.map_or(Cell::ZERO, |idx| row.cells[idx]))
                .collect();
            stacked.push_row(row.labels, cells)?;
        }
    }
    Ok(stacked)
}

/// Places the tables side by side, matching rows on their labels. Rows keep
/// first-seen order; a table with no row for a label contributes zeros.
pub fn join(output: &str, tables: Vec<OutputTable>) -> Result<OutputTable> {
    let mut tables = tables.into_iter();
    let Some(first) = tables.next() else {
        return Ok(OutputTable::default());
    };
    let mut joined = first;
    for table in tables {
        check_index(output, joined.index_fields(), &table)?;
        if let Some(column) = table
            .columns()
            .iter()
            .find(|column| joined.column_index(column).is_some())
        {
            return Err(OutputError::DuplicateColumn {
                output: output.to_string(),
                column: column.clone(),
            });
        }
        joined = join_pair(&joined, &table)?;
    }
    Ok(joined)
}

fn join_pair(left: &OutputTable, right: &OutputTable) -> Result<OutputTable> {
    let mut labels: Vec<&[Key]> = Vec::new();
    let mut left_rows: HashMap<&[Key], usize> = HashMap::new();
    let mut right_rows: HashMap<&[Key], usize> = HashMap::new();
    for (idx, row) in left.rows().iter().enumerate() {
        if !left_rows.contains_key(row.labels.as_slice()) {
            left_rows.insert(&row.labels, idx);
            labels.push(&row.labels);
        }
    }
    for (idx, row) in right.rows().iter().enumerate() {
        if !right_rows.contains_key(row.labels.as_slice()) {
            right_rows.insert(&row.labels, idx);
            if !left_rows.contains_key(row.labels.as_slice()) {
                labels.push(&row.labels);
            }
        }
    }

    let mut columns = left.columns().to_vec();
    columns.extend(right.columns().iter().cloned());
    let mut joined = OutputTable::new(left.index_fields().to_vec(), columns);
    for key in labels {
        let mut cells = match left_rows.get(key) {
            Some(&idx) => left.rows()[idx].cells.clone(),
            None => vec![Cell::ZERO; left.width()],
        };
        match right_rows.get(key) {
            Some(&idx) => cells.extend_from_slice(&right.rows()[idx].cells),
            None => cells.extend(std::iter::repeat_n(Cell::ZERO, right.width())),
        }
        joined.push_row(key.to_vec(), cells)?;
    }
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[(&str, &[f64])]) -> OutputTable {
        let mut table = OutputTable::new(
            vec!["Age_group".to_string()],
            columns.iter().map(ToString::to_string).collect(),
        );
        for (label, values) in rows {
            table
                .push_row(
                    vec![Key::parse(label)],
                    values.iter().copied().map(Cell::Value).collect(),
                )
                .expect("row");
        }
        table
    }

    #[test]
    fn stacking_unions_columns_with_zero_fill() {
        let first = table(&["LARC", "Grand_total"], &[("16-17", &[4.0, 9.0])]);
        let second = table(&["Grand_total", "Other"], &[("18-19", &[12.0, 3.0])]);
        let stacked = stack("Table 1", vec![first, second]).expect("stack");
        assert_eq!(stacked.columns(), ["LARC", "Grand_total", "Other"]);
        assert_eq!(
            stacked.rows()[1].cells,
            vec![Cell::ZERO, Cell::Value(12.0), Cell::Value(3.0)]
        );
    }

    #[test]
    fn joining_matches_labels_and_fills_gaps() {
        let left = table(&["Persons"], &[("16-17", &[5.0]), ("18-19", &[7.0])]);
        let right = table(&["Contacts"], &[("18-19", &[11.0]), ("20-24", &[2.0])]);
        let joined = join("Table 1", vec![left, right]).expect("join");
        assert_eq!(joined.labels(), ["16-17", "18-19", "20-24"]);
        assert_eq!(joined.cell("16-17", "Contacts"), Some(Cell::ZERO));
        assert_eq!(joined.cell("18-19", "Contacts"), Some(Cell::Value(11.0)));
        assert_eq!(joined.cell("20-24", "Persons"), Some(Cell::ZERO));
    }

    #[test]
    fn joining_rejects_repeated_columns() {
        let left = table(&["Grand_total"], &[("16-17", &[5.0])]);
        let right = table(&["Grand_total"], &[("16-17", &[5.0])]);
        let err = join("Table 20a", vec![left, right]).unwrap_err();
        assert!(matches!(err, OutputError::DuplicateColumn { ref column, .. } if column == "Grand_total"));
    }

    #[test]
    fn combining_needs_matching_row_fields() {
        let left = table(&["A"], &[]);
        let mut right = OutputTable::new(vec!["Gender".to_string()], vec!["B".to_string()]);
        right
            .push_row(vec![Key::Int(1)], vec![Cell::ZERO])
            .expect("row");
        assert!(matches!(
            stack("Table 1", vec![left.clone(), right.clone()]),
            Err(OutputError::IndexMismatch { .. })
        ));
        assert!(matches!(
            join("Table 1", vec![left, right]),
            Err(OutputError::IndexMismatch { .. })
        ));
    }
}
