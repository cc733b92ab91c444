//! Counts to percentages of a row or column total.

use srh_model::{Cell, OutputTable};

use crate::disclosure::round_half_up;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy)]
pub(crate) struct PercentOptions {
    /// Divide by the row's total column; otherwise by the total row.
    pub across_columns: bool,
    /// Skip the zero and small-denominator rules.
    pub exempt: bool,
    pub cutoff: f64,
    /// Decimal places when rounding, `None` to keep full precision.
    pub decimals: Option<u32>,
}

/// Percentages of one line of cells against `denominator`.
fn percent_line(cells: &[Cell], denominator: Cell, options: &PercentOptions) -> Vec<Cell> {
    let Cell::Value(denominator) = denominator else {
        let marker = if options.exempt {
            Cell::Suppressed
        } else {
            Cell::NotShown
        };
        return vec![marker; cells.len()];
    };
    if denominator == 0.0 {
        return cells
            .iter()
            .map(|&cell| match cell {
                _ if options.exempt => Cell::NotApplicable,
                Cell::Value(v) if v == 0.0 => Cell::NotApplicable,
                other => other,
            })
            .collect();
    }
    if !options.exempt && denominator > 0.0 && denominator < options.cutoff {
        return vec![Cell::NotShown; cells.len()];
    }
    cells
        .iter()
        .map(|cell| {
            cell.map(|v| {
                let percent = v * 100.0 / denominator;
                options
                    .decimals
                    .map_or(percent, |decimals| round_half_up(percent, decimals))
            })
        })
        .collect()
}

/// Converts every cell of `table` to a percentage of its line total.
///
/// Across columns the denominator is the row's `total_label` column; down
/// rows it is the total row's value in the same column, so a table without
/// a total row cannot be converted that way.
pub(crate) fn counts_to_percents(
    table: &OutputTable,
    total_label: &str,
    options: &PercentOptions,
) -> Result<OutputTable> {
    let mut percents = table.clone();
    if options.across_columns {
        let total = table.column_index(total_label).ok_or_else(|| {
            EngineError::invalid_request(format!("table has no {total_label} column"))
        })?;
        percents.map_rows(|row| percent_line(&row.cells, row.cells[total], options))?;
    } else {
        let totals = table
            .rows()
            .iter()
            .find(|row| row.is_total(total_label))
            .ok_or(EngineError::MissingTotalRow)?
            .cells
            .clone();
        let mut columns: Vec<Vec<Cell>> = vec![Vec::with_capacity(table.height()); table.width()];
        for row in table.rows() {
            for (column, cell) in columns.iter_mut().zip(&row.cells) {
                column.push(*cell);
            }
        }
        let converted: Vec<Vec<Cell>> = columns
            .iter()
            .zip(totals)
            .map(|(cells, denominator)| percent_line(cells, denominator, options))
            .collect();
        let mut row_idx = 0;
        percents.map_rows(|_| {
            let cells = converted.iter().map(|column| column[row_idx]).collect();
            row_idx += 1;
            cells
        })?;
    }
    Ok(percents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use srh_model::Key;

    fn options(across_columns: bool, decimals: Option<u32>) -> PercentOptions {
        PercentOptions {
            across_columns,
            exempt: false,
            cutoff: 400.0,
            decimals,
        }
    }

    fn table(index: &str, columns: &[&str], rows: &[(&str, &[f64])]) -> OutputTable {
        let mut table = OutputTable::new(
            vec![index.to_string()],
            columns.iter().map(|c| (*c).to_string()).collect(),
        );
        for (label, cells) in rows {
            table
                .push_row(
                    vec![Key::parse(label)],
                    cells.iter().copied().map(Cell::Value).collect(),
                )
                .expect("row");
        }
        table
    }

    #[test]
    fn down_rows_hides_small_columns() {
        let counts = table(
            "Method",
            &["16-17", "18-19", "Grand_total"],
            &[
                ("LARC", &[20.0, 10.0, 30.0]),
                ("User_dependent", &[30.0, 90.0, 120.0]),
                ("Other", &[100.0, 300.0, 400.0]),
                ("Grand_total", &[150.0, 400.0, 550.0]),
            ],
        );
        let percents =
            counts_to_percents(&counts, "Grand_total", &options(false, None)).expect("percents");
        assert_eq!(
            percents.column_cells("16-17"),
            Some(vec![Cell::NotShown; 4])
        );
        assert_eq!(
            percents.column_cells("18-19"),
            Some(vec![
                Cell::Value(2.5),
                Cell::Value(22.5),
                Cell::Value(75.0),
                Cell::Value(100.0)
            ])
        );
        assert_eq!(percents.cell("Grand_total", "Grand_total"), Some(Cell::Value(100.0)));
    }

    #[test]
    fn across_columns_rounds_with_disclosure() {
        let counts = table(
            "Method",
            &["16-17", "18-19", "Grand_total"],
            &[("LARC", &[100.0, 400.0, 500.0]), ("Other", &[1.0, 2.0, 3.0])],
        );
        let percents =
            counts_to_percents(&counts, "Grand_total", &options(true, Some(0))).expect("percents");
        assert_eq!(percents.cell("LARC", "16-17"), Some(Cell::Value(20.0)));
        assert_eq!(percents.cell("LARC", "18-19"), Some(Cell::Value(80.0)));
        assert_eq!(percents.cell("Other", "18-19"), Some(Cell::NotShown));
    }

    #[test]
    fn zero_denominator_marks_zero_cells_not_applicable() {
        let line = percent_line(
            &[Cell::ZERO, Cell::Suppressed, Cell::ZERO],
            Cell::ZERO,
            &options(true, None),
        );
        assert_eq!(line, vec![Cell::NotApplicable, Cell::Suppressed, Cell::NotApplicable]);
    }

    #[test]
    fn exempt_groups_ignore_the_cutoff() {
        let exempt = PercentOptions {
            exempt: true,
            ..options(true, Some(0))
        };
        let line = percent_line(&[Cell::Value(1.0), Cell::Value(3.0)], Cell::Value(4.0), &exempt);
        assert_eq!(line, vec![Cell::Value(25.0), Cell::Value(75.0)]);
        let zero = percent_line(&[Cell::ZERO, Cell::ZERO], Cell::ZERO, &exempt);
        assert_eq!(zero, vec![Cell::NotApplicable; 2]);
    }

    #[test]
    fn suppressed_numerators_stay_suppressed() {
        let line = percent_line(
            &[Cell::Suppressed, Cell::Value(400.0), Cell::Value(500.0)],
            Cell::Value(500.0),
            &options(true, Some(0)),
        );
        assert_eq!(line, vec![Cell::Suppressed, Cell::Value(80.0), Cell::Value(100.0)]);
    }

    #[test]
    fn down_rows_needs_a_total_row() {
        let counts = table("Method", &["Grand_total"], &[("LARC", &[5.0])]);
        let err = counts_to_percents(&counts, "Grand_total", &options(false, None)).unwrap_err();
        assert!(matches!(err, EngineError::MissingTotalRow));
    }
}
