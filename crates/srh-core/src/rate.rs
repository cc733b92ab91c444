//! Counts per head of population.

use std::collections::HashMap;

use srh_model::{Cell, Key, OutputRow, OutputTable};

use crate::disclosure::round_half_up;
use crate::error::Result;

fn rate_cell(count: Cell, population: Cell, multiplier: f64, decimals: Option<u32>) -> Cell {
    match (count, population) {
        (_, Cell::Value(p)) if p == 0.0 => Cell::NotApplicable,
        (Cell::Value(c), Cell::Value(p)) => {
            let rate = c * multiplier / p;
            Cell::Value(decimals.map_or(rate, |decimals| round_half_up(rate, decimals)))
        }
        _ => Cell::Suppressed,
    }
}

/// Divides `counts` by `population` cell by cell, aligned on row labels and
/// column names.
///
/// Rows or columns present on only one side count as zero there. A row whose
/// `total_label` cell is not applicable is not applicable throughout.
pub(crate) fn counts_to_rates(
    counts: &OutputTable,
    population: &OutputTable,
    total_label: &str,
    multiplier: f64,
    decimals: Option<u32>,
) -> Result<OutputTable> {
    let population_rows: HashMap<&[Key], &OutputRow> = population
        .rows()
        .iter()
        .map(|row| (row.labels.as_slice(), row))
        .collect();
    let population_columns: Vec<Option<usize>> = counts
        .columns()
        .iter()
        .map(|column| population.column_index(column))
        .collect();
    let total = counts.column_index(total_label);

    let rate_row = |labels: &[Key], cells: &[Cell]| -> Vec<Cell> {
        let denominators = population_rows.get(labels);
        let mut rates: Vec<Cell> = cells
            .iter()
            .zip(&population_columns)
            .map(|(&count, column)| {
                let population = denominators
                    .zip(*column)
                    .map_or(Cell::ZERO, |(row, idx)| row.cells[idx]);
                rate_cell(count, population, multiplier, decimals)
            })
            .collect();
        if total.is_some_and(|idx| rates[idx] == Cell::NotApplicable) {
            rates.fill(Cell::NotApplicable);
        }
        rates
    };

    let mut rates = OutputTable::new(counts.index_fields().to_vec(), counts.columns().to_vec());
    for row in counts.rows() {
        rates.push_row(row.labels.clone(), rate_row(&row.labels, &row.cells))?;
    }
    let zeros = vec![Cell::ZERO; counts.width()];
    for row in population.rows() {
        if counts.rows().iter().all(|counted| counted.labels != row.labels) {
            rates.push_row(row.labels.clone(), rate_row(&row.labels, &zeros))?;
        }
    }
    Ok(rates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_population_is_not_applicable() {
        assert_eq!(rate_cell(Cell::ZERO, Cell::ZERO, 1000.0, None), Cell::NotApplicable);
        assert_eq!(rate_cell(Cell::Suppressed, Cell::ZERO, 1000.0, None), Cell::NotApplicable);
        assert_eq!(
            rate_cell(Cell::Suppressed, Cell::Value(50.0), 1000.0, None),
            Cell::Suppressed
        );
        assert_eq!(
            rate_cell(Cell::Value(38.0), Cell::Value(50.0), 1000.0, Some(0)),
            Cell::Value(760.0)
        );
    }

    #[test]
    fn not_applicable_total_blanks_the_row() {
        let mut counts = OutputTable::new(
            vec!["Region".to_string()],
            vec!["A".to_string(), "Grand_total".to_string()],
        );
        counts
            .push_row(vec![Key::parse("R1")], vec![Cell::Value(4.0), Cell::Value(4.0)])
            .expect("row");
        let mut population = counts.clone();
        population.map_column("Grand_total", |_| Cell::ZERO);

        let rates = counts_to_rates(&counts, &population, "Grand_total", 1.0, None).expect("rates");
        assert_eq!(
            rates.rows()[0].cells,
            vec![Cell::NotApplicable, Cell::NotApplicable]
        );
    }

    #[test]
    fn population_only_rows_are_kept() {
        let counts = OutputTable::new(vec!["Region".to_string()], vec!["Grand_total".to_string()]);
        let mut population = counts.clone();
        population
            .push_row(vec![Key::parse("R9")], vec![Cell::Value(250.0)])
            .expect("row");
        let rates = counts_to_rates(&counts, &population, "Grand_total", 1000.0, Some(0))
            .expect("rates");
        assert_eq!(rates.cell("R9", "Grand_total"), Some(Cell::ZERO));
    }
}
