//! Synthetic rows and columns built by summing members.

use std::collections::BTreeMap;

use srh_model::{Cell, ColumnSubgroup, Key, OutputTable, RowSubgroup};
use tracing::debug;

use crate::error::{EngineError, Result};

fn add(a: Cell, b: Cell) -> Cell {
    match (a, b) {
        (Cell::Value(x), Cell::Value(y)) => Cell::Value(x + y),
        (Cell::Value(_), marker) | (marker, _) => marker,
    }
}

/// Appends one row per distinct remaining key, summing the rows whose
/// `field` label is a member. The appended rows carry the subgroup code.
pub(crate) fn add_row_subgroup(
    table: &mut OutputTable,
    subgroup: &RowSubgroup,
    total_label: &str,
) -> Result<()> {
    let idx = table
        .index_fields()
        .iter()
        .position(|field| *field == subgroup.field)
        .ok_or_else(|| {
            EngineError::invalid_request(format!(
                "subgroup field {} is not one of the row fields {:?}",
                subgroup.field,
                table.index_fields()
            ))
        })?;

    let width = table.width();
    let mut sums: BTreeMap<Vec<Key>, Vec<Cell>> = BTreeMap::new();
    for row in table.rows() {
        if row.is_total(total_label) || !subgroup.members.contains(&row.labels[idx]) {
            continue;
        }
        let mut labels = row.labels.clone();
        labels[idx] = subgroup.code.clone();
        let acc = sums.entry(labels).or_insert_with(|| vec![Cell::ZERO; width]);
        for (total, cell) in acc.iter_mut().zip(&row.cells) {
            *total = add(*total, *cell);
        }
    }
    debug!(field = %subgroup.field, code = %subgroup.code, rows = sums.len(), "added row subgroup");
    for (labels, cells) in sums {
        table.push_row(labels, cells)?;
    }
    Ok(())
}

/// Appends a column summing the member columns. Members with no column in
/// the table contribute zero.
pub(crate) fn add_column_subgroup(table: &mut OutputTable, subgroup: &ColumnSubgroup) -> Result<()> {
    let mut members = Vec::with_capacity(subgroup.members.len());
    for member in &subgroup.members {
        match table.column_index(&member.to_string()) {
            Some(idx) => members.push(idx),
            None => debug!(subgroup = %subgroup.name, member = %member, "subgroup member has no data"),
        }
    }
    let cells = table
        .rows()
        .iter()
        .map(|row| {
            members
                .iter()
                .fold(Cell::ZERO, |acc, &idx| add(acc, row.cells[idx]))
        })
        .collect();
    table.remove_column(&subgroup.name);
    table.insert_column(table.width(), subgroup.name.clone(), cells)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> OutputTable {
        let mut table = OutputTable::new(
            vec!["Age_group".to_string(), "Gender".to_string()],
            vec!["LARC".to_string(), "Other".to_string(), "Grand_total".to_string()],
        );
        let rows: [(&str, &str, [f64; 3]); 4] = [
            ("16-17", "2", [3.0, 1.0, 4.0]),
            ("18-19", "2", [5.0, 2.0, 7.0]),
            ("18-19", "1", [0.0, 4.0, 4.0]),
            ("20-24", "2", [9.0, 9.0, 18.0]),
        ];
        for (age, gender, cells) in rows {
            table
                .push_row(
                    vec![Key::parse(age), Key::parse(gender)],
                    cells.into_iter().map(Cell::Value).collect(),
                )
                .expect("row");
        }
        table
            .push_row(
                vec![Key::parse("Grand_total"), Key::blank()],
                vec![Cell::Value(17.0), Cell::Value(16.0), Cell::Value(33.0)],
            )
            .expect("total");
        table
    }

    #[test]
    fn row_subgroup_sums_members_per_remaining_key() {
        let mut table = table();
        let subgroup = RowSubgroup {
            field: "Age_group".to_string(),
            code: Key::parse("Under 20"),
            members: vec![Key::parse("16-17"), Key::parse("18-19")],
        };
        add_row_subgroup(&mut table, &subgroup, "Grand_total").expect("subgroup");
        let added: Vec<_> = table.rows()[5..].to_vec();
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].labels, vec![Key::parse("Under 20"), Key::Int(1)]);
        assert_eq!(added[0].cells, vec![Cell::Value(0.0), Cell::Value(4.0), Cell::Value(4.0)]);
        assert_eq!(added[1].labels, vec![Key::parse("Under 20"), Key::Int(2)]);
        assert_eq!(added[1].cells, vec![Cell::Value(8.0), Cell::Value(3.0), Cell::Value(11.0)]);
    }

    #[test]
    fn row_subgroup_on_unknown_field_fails() {
        let subgroup = RowSubgroup {
            field: "Ethnicity".to_string(),
            code: Key::parse("All"),
            members: vec![],
        };
        let err = add_row_subgroup(&mut table(), &subgroup, "Grand_total").unwrap_err();
        assert!(err.to_string().contains("Ethnicity"));
    }

    #[test]
    fn column_subgroup_is_appended() {
        let mut table = table();
        let subgroup = ColumnSubgroup {
            name: "All methods".to_string(),
            members: vec![Key::parse("LARC"), Key::parse("Other"), Key::parse("Absent")],
        };
        add_column_subgroup(&mut table, &subgroup).expect("subgroup");
        assert_eq!(table.columns().last().map(String::as_str), Some("All methods"));
        assert_eq!(table.cell("20-24", "All methods"), Some(Cell::Value(18.0)));
        assert_eq!(table.cell("Grand_total", "All methods"), Some(Cell::Value(33.0)));
    }
}
