//! Final row ordering: declared orders, sort fields and the total row.

use std::cmp::Ordering;

use srh_model::{Cell, Key, OutputRow, OutputTable};

use crate::error::{EngineError, Result};

/// Row fields to group by plus the sort-only fields among them.
///
/// Sort fields that are not row fields are appended to the grouping so the
/// sort can see them; they are removed again before the table is returned.
pub fn sort_fields(rows: &[String], sort_on: Option<&[String]>) -> (Vec<String>, Vec<String>) {
    let mut grouping = rows.to_vec();
    let mut sort_only = Vec::new();
    for field in sort_on.unwrap_or_default() {
        if !grouping.contains(field) {
            grouping.push(field.clone());
            sort_only.push(field.clone());
        }
    }
    (grouping, sort_only)
}

/// How the rows of a finished table are arranged.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RowArrangement<'a> {
    pub row_order: Option<&'a [Key]>,
    pub sort_on: Option<&'a [String]>,
    pub sort_only: &'a [String],
    pub include_total: bool,
    pub total_label: &'a str,
    /// Cell used for declared rows that have no data.
    pub missing: Cell,
}

/// Rows whose first label is one of `order`, in that order. Declared labels
/// with no row get a row filled with `missing`.
fn order_by_list(table: &OutputTable, order: &[Key], missing: Cell) -> Result<OutputTable> {
    let mut ordered = OutputTable::new(table.index_fields().to_vec(), table.columns().to_vec());
    let width = table.index_fields().len();
    for key in order {
        let mut found = false;
        for row in table.rows().iter().filter(|row| row.label() == Some(key)) {
            ordered.push_row(row.labels.clone(), row.cells.clone())?;
            found = true;
        }
        if !found {
            let mut labels = vec![Key::blank(); width];
            if let Some(first) = labels.first_mut() {
                *first = key.clone();
            }
            ordered.push_row(labels, vec![missing; table.width()])?;
        }
    }
    Ok(ordered)
}

fn compare_on(indices: &[usize], a: &OutputRow, b: &OutputRow) -> Ordering {
    indices
        .iter()
        .map(|&idx| a.labels[idx].cmp(&b.labels[idx]))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Applies the declared order, or the sort fields, or plain total-row
/// removal, then drops the sort-only index fields.
pub(crate) fn arrange_rows(table: OutputTable, arrangement: &RowArrangement<'_>) -> Result<OutputTable> {
    let total_label = arrangement.total_label;
    let mut table = if let Some(order) = arrangement.row_order {
        order_by_list(&table, order, arrangement.missing)?
    } else if let Some(sort_on) = arrangement.sort_on {
        let mut table = table;
        if !arrangement.include_total {
            table.retain_rows(|row| !row.is_total(total_label));
        }
        let indices = sort_on
            .iter()
            .map(|field| {
                table
                    .index_fields()
                    .iter()
                    .position(|f| f == field)
                    .ok_or_else(|| {
                        EngineError::invalid_request(format!("cannot sort on {field}: not a row field"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        table.sort_rows_by(|a, b| {
            a.is_total(total_label)
                .cmp(&b.is_total(total_label))
                .reverse()
                .then_with(|| compare_on(&indices, a, b))
        });
        table
    } else {
        let mut table = table;
        if !arrangement.include_total {
            table.retain_rows(|row| !row.is_total(total_label));
        }
        table
    };
    for field in arrangement.sort_only {
        table.remove_index_field(field);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_only_fields_are_appended() {
        let rows = vec!["LA_code".to_string(), "LA_name".to_string()];
        let sort_on = vec!["LA_parent_code".to_string(), "LA_name".to_string()];
        let (grouping, sort_only) = sort_fields(&rows, Some(&sort_on));
        assert_eq!(grouping, ["LA_code", "LA_name", "LA_parent_code"]);
        assert_eq!(sort_only, ["LA_parent_code"]);
        assert_eq!(sort_fields(&rows, None).0, rows);
    }

    fn table() -> OutputTable {
        let mut table = OutputTable::new(
            vec!["Age_group".to_string()],
            vec!["Grand_total".to_string()],
        );
        for (label, value) in [("18-19", 4.0), ("16-17", 3.0), ("Grand_total", 7.0)] {
            table
                .push_row(vec![Key::parse(label)], vec![Cell::Value(value)])
                .expect("row");
        }
        table
    }

    #[test]
    fn declared_order_adds_missing_rows() {
        let order = [Key::parse("16-17"), Key::parse("<16"), Key::parse("18-19")];
        let arranged = arrange_rows(
            table(),
            &RowArrangement {
                row_order: Some(&order),
                sort_on: None,
                sort_only: &[],
                include_total: true,
                total_label: "Grand_total",
                missing: Cell::ZERO,
            },
        )
        .expect("arrange");
        assert_eq!(arranged.labels(), ["16-17", "<16", "18-19"]);
        assert_eq!(arranged.cell("<16", "Grand_total"), Some(Cell::ZERO));
    }

    #[test]
    fn sorting_pins_the_total_first() {
        let sort_on = vec!["Age_group".to_string()];
        let arranged = arrange_rows(
            table(),
            &RowArrangement {
                row_order: None,
                sort_on: Some(&sort_on),
                sort_only: &[],
                include_total: true,
                total_label: "Grand_total",
                missing: Cell::ZERO,
            },
        )
        .expect("arrange");
        assert_eq!(arranged.labels(), ["Grand_total", "16-17", "18-19"]);
    }

    #[test]
    fn unwanted_total_is_dropped() {
        let arranged = arrange_rows(
            table(),
            &RowArrangement {
                row_order: None,
                sort_on: None,
                sort_only: &[],
                include_total: false,
                total_label: "Grand_total",
                missing: Cell::ZERO,
            },
        )
        .expect("arrange");
        assert_eq!(arranged.labels(), ["18-19", "16-17"]);
    }
}
