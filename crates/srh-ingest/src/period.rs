//! Reporting periods and the checks that tie source tables to them.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use srh_model::{Dataset, Value};

use crate::error::{IngestError, Result};

/// Financial year `YYYY-YY`, running April to March.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FinancialYear {
    start: i32,
}

impl FinancialYear {
    pub fn starting(start: i32) -> Self {
        Self { start }
    }

    /// Year style used by hospital episode extracts: `1920` is 2019-20.
    pub fn from_hes(raw: &str) -> Result<Self> {
        let invalid = || IngestError::InvalidPeriod {
            value: raw.to_string(),
        };
        let trimmed = raw.trim();
        if trimmed.len() != 4 {
            return Err(invalid());
        }
        let start: i32 = trimmed[..2].parse().map_err(|_| invalid())?;
        let end: i32 = trimmed[2..].parse().map_err(|_| invalid())?;
        if (start + 1) % 100 != end {
            return Err(invalid());
        }
        Ok(Self::starting(2000 + start))
    }

    pub fn start_year(self) -> i32 {
        self.start
    }

    pub fn end_year(self) -> i32 {
        self.start + 1
    }

    #[must_use]
    pub fn previous(self) -> Self {
        Self::starting(self.start - 1)
    }

    /// `span` consecutive years ending at `self`, oldest first.
    pub fn range(self, span: usize) -> Vec<FinancialYear> {
        let span = i32::try_from(span).unwrap_or(i32::MAX);
        (0..span)
            .rev()
            .map(|back| Self::starting(self.start - back))
            .collect()
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.start, self.end_year().rem_euclid(100))
    }
}

impl FromStr for FinancialYear {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || IngestError::InvalidPeriod {
            value: s.to_string(),
        };
        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        if start.len() != 4 || end.len() != 2 {
            return Err(invalid());
        }
        let start: i32 = start.parse().map_err(|_| invalid())?;
        let end: i32 = end.parse().map_err(|_| invalid())?;
        if (start + 1).rem_euclid(100) != end {
            return Err(invalid());
        }
        Ok(Self::starting(start))
    }
}

/// How a source table writes its reporting year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearStyle {
    /// Calendar start year, `2021` for 2021-22.
    CalendarStart,
    /// Two plus two digits, `2122` for 2021-22.
    Hes,
    /// Already `YYYY-YY`.
    Financial,
}

/// Rewrites `field` as financial year text.
pub fn to_financial_years(data: Dataset, field: &str, style: YearStyle) -> Result<Dataset> {
    let converted = data
        .require(field)?
        .iter()
        .map(|value| {
            let Some(text) = value.canonical_text() else {
                return Ok(Value::Null);
            };
            let year = match style {
                YearStyle::CalendarStart => {
                    let start: i32 = text.parse().map_err(|_| IngestError::InvalidPeriod {
                        value: text.clone(),
                    })?;
                    FinancialYear::starting(start)
                }
                YearStyle::Hes => FinancialYear::from_hes(&text)?,
                YearStyle::Financial => text.parse()?,
            };
            Ok(Value::Text(year.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(data.with_column(field, converted)?)
}

/// Fails unless every non-null value of `field` equals `expected`.
pub fn check_reporting_period(data: &Dataset, field: &str, expected: &str) -> Result<()> {
    let found: BTreeSet<String> = data
        .require(field)?
        .iter()
        .filter_map(Value::canonical_text)
        .collect();
    if found.iter().all(|value| value == expected) {
        return Ok(());
    }
    Err(IngestError::PeriodMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        found: found.into_iter().collect(),
    })
}
