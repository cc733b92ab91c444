//! The row-keyed result table handed from the engine to writers.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::cell::{Cell, Symbols};
use crate::error::{ModelError, Result};
use crate::value::Key;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    pub labels: Vec<Key>,
    pub cells: Vec<Cell>,
}

impl OutputRow {
    /// First index label, used for declared-order selection and lookups.
    pub fn label(&self) -> Option<&Key> {
        self.labels.first()
    }

    /// True for the grand-total row: the total label first, blanks after.
    pub fn is_total(&self, total_label: &str) -> bool {
        let mut labels = self.labels.iter();
        labels
            .next()
            .is_some_and(|first| first.as_str() == Some(total_label))
            && labels.all(Key::is_blank)
    }
}

/// Output of one aggregation: index labels per row plus ordered columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputTable {
    index_fields: Vec<String>,
    columns: Vec<String>,
    rows: Vec<OutputRow>,
}

impl OutputTable {
    pub fn new(index_fields: Vec<String>, columns: Vec<String>) -> Self {
        Self {
            index_fields,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, labels: Vec<Key>, cells: Vec<Cell>) -> Result<()> {
        if labels.len() != self.index_fields.len() {
            return Err(ModelError::RowShape {
                part: "labels",
                expected: self.index_fields.len(),
                actual: labels.len(),
            });
        }
        if cells.len() != self.columns.len() {
            return Err(ModelError::RowShape {
                part: "cells",
                expected: self.columns.len(),
                actual: cells.len(),
            });
        }
        self.rows.push(OutputRow { labels, cells });
        Ok(())
    }

    /// Builds a table from complete rows, checking every row's shape.
    pub fn from_rows(
        index_fields: Vec<String>,
        columns: Vec<String>,
        rows: Vec<OutputRow>,
    ) -> Result<Self> {
        let mut table = Self::new(index_fields, columns);
        for row in rows {
            table.push_row(row.labels, row.cells)?;
        }
        Ok(table)
    }

    pub fn index_fields(&self) -> &[String] {
        &self.index_fields
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[OutputRow] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// First row whose leading label renders as `label`.
    pub fn row(&self, label: &str) -> Option<&OutputRow> {
        self.rows
            .iter()
            .find(|row| row.label().is_some_and(|key| key.to_string() == label))
    }

    pub fn cell(&self, label: &str, column: &str) -> Option<Cell> {
        let idx = self.column_index(column)?;
        self.row(label).map(|row| row.cells[idx])
    }

    pub fn column_cells(&self, column: &str) -> Option<Vec<Cell>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|row| row.cells[idx]).collect())
    }

    /// Leading labels of every row, rendered.
    pub fn labels(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.label().map(ToString::to_string).unwrap_or_default())
            .collect()
    }

    pub fn into_rows(self) -> Vec<OutputRow> {
        self.rows
    }

    /// Replaces every cell of `column` with `f` of itself.
    pub fn map_column(&mut self, column: &str, mut f: impl FnMut(Cell) -> Cell) -> bool {
        let Some(idx) = self.column_index(column) else {
            return false;
        };
        for row in &mut self.rows {
            row.cells[idx] = f(row.cells[idx]);
        }
        true
    }

    /// Replaces the cells of every row with `f` of the row.
    pub fn map_rows(&mut self, mut f: impl FnMut(&OutputRow) -> Vec<Cell>) -> Result<()> {
        for row in &mut self.rows {
            let cells = f(row);
            if cells.len() != self.columns.len() {
                return Err(ModelError::RowShape {
                    part: "cells",
                    expected: self.columns.len(),
                    actual: cells.len(),
                });
            }
            row.cells = cells;
        }
        Ok(())
    }

    /// New table holding `names` in the given order.
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<OutputTable> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name.as_ref())
                    .ok_or_else(|| ModelError::missing_field(name.as_ref(), &self.columns))
            })
            .collect::<Result<Vec<_>>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| OutputRow {
                labels: row.labels.clone(),
                cells: indices.iter().map(|&idx| row.cells[idx]).collect(),
            })
            .collect();
        Ok(OutputTable {
            index_fields: self.index_fields.clone(),
            columns: names.iter().map(|n| n.as_ref().to_string()).collect(),
            rows,
        })
    }

    /// Removes an index field and its label from every row.
    pub fn remove_index_field(&mut self, name: &str) -> bool {
        let Some(idx) = self.index_fields.iter().position(|f| f == name) else {
            return false;
        };
        self.index_fields.remove(idx);
        for row in &mut self.rows {
            row.labels.remove(idx);
        }
        true
    }

    /// Adds an index field at `position` (clamped) labelled `label` on every row.
    pub fn insert_index_field(&mut self, position: usize, name: String, label: &Key) {
        let position = position.min(self.index_fields.len());
        self.index_fields.insert(position, name);
        for row in &mut self.rows {
            row.labels.insert(position, label.clone());
        }
    }

    /// Stable sort of the rows.
    pub fn sort_rows_by(&mut self, compare: impl FnMut(&OutputRow, &OutputRow) -> Ordering) {
        self.rows.sort_by(compare);
    }

    pub fn rename_columns(&mut self, renames: &BTreeMap<String, String>) {
        for column in &mut self.columns {
            if let Some(target) = renames.get(column) {
                column.clone_from(target);
            }
        }
    }

    pub fn retain_rows(&mut self, mut keep: impl FnMut(&OutputRow) -> bool) {
        self.rows.retain(|row| keep(row));
    }

    /// Inserts a column at `position` (clamped to the width) filled with `cells`.
    pub fn insert_column(&mut self, position: usize, name: String, cells: Vec<Cell>) -> Result<()> {
        if cells.len() != self.rows.len() {
            return Err(ModelError::ColumnLength {
                field: name,
                expected: self.rows.len(),
                actual: cells.len(),
            });
        }
        let position = position.min(self.columns.len());
        self.columns.insert(position, name);
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.cells.insert(position, cell);
        }
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.cells.remove(idx);
        }
        true
    }

    pub fn move_column_to_end(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        let column = self.columns.remove(idx);
        self.columns.push(column);
        for row in &mut self.rows {
            let cell = row.cells.remove(idx);
            row.cells.push(cell);
        }
        true
    }

    /// Swaps rows and columns. Former columns become rows labelled under
    /// `index_field`; former rows become columns named by their non-blank
    /// labels joined with `" / "`.
    pub fn transpose(&self, index_field: &str) -> OutputTable {
        let columns = self
            .rows
            .iter()
            .map(|row| {
                row.labels
                    .iter()
                    .filter(|key| !key.is_blank())
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" / ")
            })
            .collect();
        let rows = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| OutputRow {
                labels: vec![Key::parse(name)],
                cells: self.rows.iter().map(|row| row.cells[idx]).collect(),
            })
            .collect();
        OutputTable {
            index_fields: vec![index_field.to_string()],
            columns,
            rows,
        }
    }

    /// Renders every cell to text with the given symbols.
    pub fn render(&self, symbols: &Symbols) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.cells.iter().map(|cell| cell.render(symbols)).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> OutputTable {
        let mut table = OutputTable::new(
            vec!["Age_group".to_string()],
            vec!["LARC".to_string(), "Grand_total".to_string()],
        );
        table
            .push_row(vec![Key::parse("16-17")], vec![Cell::Value(20.0), Cell::Value(30.0)])
            .expect("row");
        table
            .push_row(vec![Key::parse("18-19")], vec![Cell::Suppressed, Cell::Value(400.0)])
            .expect("row");
        table
    }

    #[test]
    fn looks_up_cells_by_label() {
        let table = table();
        assert_eq!(table.cell("16-17", "LARC"), Some(Cell::Value(20.0)));
        assert_eq!(table.cell("18-19", "LARC"), Some(Cell::Suppressed));
        assert_eq!(table.cell("20-24", "LARC"), None);
    }

    #[test]
    fn rejects_misshapen_rows() {
        let mut table = table();
        let err = table
            .push_row(vec![Key::parse("x")], vec![Cell::ZERO])
            .unwrap_err();
        assert!(matches!(err, ModelError::RowShape { part: "cells", .. }));
    }

    #[test]
    fn transpose_swaps_axes() {
        let transposed = table().transpose("Measure");
        assert_eq!(transposed.columns(), ["16-17", "18-19"]);
        assert_eq!(transposed.labels(), ["LARC", "Grand_total"]);
        assert_eq!(transposed.cell("Grand_total", "18-19"), Some(Cell::Value(400.0)));
    }

    #[test]
    fn total_row_needs_blank_secondary_labels() {
        let total = OutputRow {
            labels: vec![Key::parse("Grand_total"), Key::blank()],
            cells: vec![],
        };
        let named = OutputRow {
            labels: vec![Key::parse("Grand_total"), Key::parse("x")],
            cells: vec![],
        };
        assert!(total.is_total("Grand_total"));
        assert!(!named.is_total("Grand_total"));
    }

    #[test]
    fn selects_and_drops_index_fields() {
        let mut table = table();
        let selected = table.select_columns(&["Grand_total"]).expect("select");
        assert_eq!(selected.columns(), ["Grand_total"]);
        assert!(table.select_columns(&["missing"]).is_err());
        assert!(table.remove_index_field("Age_group"));
        assert!(table.index_fields().is_empty());
        assert!(table.rows().iter().all(|row| row.labels.is_empty()));

        table.insert_index_field(3, "Measure".to_string(), &Key::parse("Perc_LARC"));
        assert_eq!(table.index_fields(), ["Measure"]);
        assert_eq!(table.labels(), ["Perc_LARC", "Perc_LARC"]);
    }

    #[test]
    fn moves_and_removes_columns() {
        let mut table = table();
        assert!(table.move_column_to_end("LARC"));
        assert_eq!(table.columns(), ["Grand_total", "LARC"]);
        assert!(table.remove_column("Grand_total"));
        assert_eq!(table.column_cells("LARC"), Some(vec![Cell::Value(20.0), Cell::Suppressed]));
        assert!(!table.remove_column("missing"));
    }
}
