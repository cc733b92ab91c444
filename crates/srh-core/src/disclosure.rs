//! Statistical disclosure control: small-count suppression and rounding.

use srh_model::{Cell, DisclosureSettings, OutputTable};

/// Rounds to `decimals` places with ties away from zero.
///
/// Works on the shortest decimal representation of the float, so a value
/// written as `2.675` rounds to `2.68` even though its binary form is just
/// below the tie.
pub fn round_half_up(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let text = format!("{}", value.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let decimals = decimals as usize;
    if frac_part.len() <= decimals {
        return value;
    }

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(decimals))
        .map(|b| b - b'0')
        .collect();
    if frac_part.as_bytes()[decimals] >= b'5' {
        let mut idx = digits.len();
        loop {
            if idx == 0 {
                digits.insert(0, 1);
                break;
            }
            idx -= 1;
            if digits[idx] == 9 {
                digits[idx] = 0;
            } else {
                digits[idx] += 1;
                break;
            }
        }
    }

    let split = digits.len() - decimals;
    let mut rounded = String::with_capacity(digits.len() + 1);
    rounded.extend(digits[..split].iter().map(|d| char::from(b'0' + d)));
    if decimals > 0 {
        rounded.push('.');
        rounded.extend(digits[split..].iter().map(|d| char::from(b'0' + d)));
    }
    let magnitude: f64 = rounded.parse().unwrap_or(value.abs());
    if value.is_sign_negative() {
        -magnitude
    } else {
        magnitude
    }
}

/// Suppresses counts in `[lower, upper]` and rounds larger counts to the
/// nearest `base`. Counts below `lower` (zero) pass unchanged.
pub fn suppress_count(value: f64, lower: u32, upper: u32, base: u32) -> Cell {
    let (lower, upper, base) = (f64::from(lower), f64::from(upper), f64::from(base));
    if value >= lower && value <= upper {
        Cell::Suppressed
    } else if value > upper && base > 0.0 {
        Cell::Value(base * round_half_up(value / base, 0))
    } else {
        Cell::Value(value)
    }
}

/// [`suppress_count`] over a cell; markers pass through.
pub fn suppress_cell(cell: Cell, settings: &DisclosureSettings) -> Cell {
    match cell {
        Cell::Value(v) => suppress_count(v, settings.lower, settings.upper, settings.base),
        other => other,
    }
}

/// Applies count suppression to each named column present in `table`.
pub(crate) fn suppress_columns(
    table: &mut OutputTable,
    columns: &[String],
    settings: &DisclosureSettings,
) {
    for column in columns {
        table.map_column(column, |cell| suppress_cell(cell, settings));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rounds_ties_away_from_zero() {
        assert_eq!(round_half_up(2.675, 2), 2.68);
        assert_eq!(round_half_up(-2.675, 2), -2.68);
        assert_eq!(round_half_up(0.5, 0), 1.0);
        assert_eq!(round_half_up(2.5, 0), 3.0);
        assert_eq!(round_half_up(9.95, 1), 10.0);
        assert_eq!(round_half_up(2.4, 0), 2.0);
        assert_eq!(round_half_up(7.0, 0), 7.0);
        assert!(round_half_up(f64::NAN, 0).is_nan());
    }

    #[test]
    fn suppresses_small_counts_and_rounds_the_rest() {
        let settings = DisclosureSettings::default();
        let input = [0.0, 1.0, 4.0, 7.0, 8.0, 12.0, 16.0, 21.0, 101.0];
        let output: Vec<Cell> = input
            .iter()
            .map(|&v| suppress_cell(Cell::Value(v), &settings))
            .collect();
        assert_eq!(
            output,
            vec![
                Cell::Value(0.0),
                Cell::Suppressed,
                Cell::Suppressed,
                Cell::Suppressed,
                Cell::Value(10.0),
                Cell::Value(10.0),
                Cell::Value(15.0),
                Cell::Value(20.0),
                Cell::Value(100.0),
            ]
        );
    }

    #[test]
    fn markers_pass_through_suppression() {
        let settings = DisclosureSettings::default();
        assert_eq!(suppress_cell(Cell::NotShown, &settings), Cell::NotShown);
    }

    proptest! {
        #[test]
        fn suppressed_counts_are_multiples_of_base_or_zero(count in 0u32..100_000) {
            let settings = DisclosureSettings::default();
            match suppress_cell(Cell::Value(f64::from(count)), &settings) {
                Cell::Suppressed => prop_assert!((1..=7).contains(&count)),
                Cell::Value(v) => {
                    prop_assert!(v == 0.0 || v % 5.0 == 0.0);
                    prop_assert!((v - f64::from(count)).abs() <= 2.5);
                }
                other => prop_assert!(false, "unexpected {other:?}"),
            }
        }

        #[test]
        fn suppression_is_monotone(a in 8u32..100_000, b in 8u32..100_000) {
            let settings = DisclosureSettings::default();
            let (lo, hi) = (a.min(b), a.max(b));
            let lo = suppress_cell(Cell::Value(f64::from(lo)), &settings).as_f64();
            let hi = suppress_cell(Cell::Value(f64::from(hi)), &settings).as_f64();
            prop_assert!(lo <= hi);
        }

        #[test]
        fn rounding_whole_numbers_is_identity(v in -1_000_000i64..1_000_000) {
            prop_assert_eq!(round_half_up(v as f64, 0), v as f64);
        }
    }
}
