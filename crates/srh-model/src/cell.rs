use serde::{Deserialize, Serialize};

/// A single output cell after aggregation and disclosure control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Value(f64),
    /// Small raw count withheld by disclosure control.
    Suppressed,
    /// Denominator is positive but below the percent cutoff.
    NotShown,
    /// Zero denominator.
    NotApplicable,
}

impl Cell {
    pub const ZERO: Cell = Cell::Value(0.0);

    pub fn as_f64(self) -> Option<f64> {
        match self {
            Cell::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_value(self) -> bool {
        matches!(self, Cell::Value(_))
    }

    /// Applies `f` to numeric cells; sentinels pass through.
    #[must_use]
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Cell {
        match self {
            Cell::Value(v) => Cell::Value(f(v)),
            other => other,
        }
    }

    pub fn render(self, symbols: &Symbols) -> String {
        match self {
            Cell::Value(v) => format_number(v),
            Cell::Suppressed => symbols.suppressed.clone(),
            Cell::NotShown => symbols.not_shown.clone(),
            Cell::NotApplicable => symbols.not_applicable.clone(),
        }
    }

    /// True for any of the withheld-value markers.
    pub fn is_sentinel(self) -> bool {
        !self.is_value()
    }
}

/// Renders a number without a trailing `.0` for whole values.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}

/// Marker strings written in place of withheld values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Symbols {
    pub not_applicable: String,
    pub not_shown: String,
    pub suppressed: String,
}

impl Default for Symbols {
    fn default() -> Self {
        Self {
            not_applicable: "z".to_string(),
            not_shown: "#".to_string(),
            suppressed: "*".to_string(),
        }
    }
}

impl Symbols {
    pub fn all(&self) -> [&str; 3] {
        [&self.not_applicable, &self.not_shown, &self.suppressed]
    }
}
