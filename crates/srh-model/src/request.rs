//! Parameter records for the two aggregation operations.
//!
//! Requests deserialize from catalogue entries and can be assembled in code
//! with the `with_*` builders. They are validated when the engine runs them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    #[default]
    Counts,
    Percents,
    Rates,
}

impl OutputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputKind::Counts => "counts",
            OutputKind::Percents => "percents",
            OutputKind::Rates => "rates",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduction applied per group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Count non-null values of the configured identifier field.
    #[default]
    CountIdentifier,
    /// Count non-null values of the named field.
    Count(String),
    /// Sum the named numeric field.
    Sum(String),
}

/// Synthetic row: records whose `field` is one of `members` are summed and
/// added with `field` set to `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RowSubgroup {
    pub field: String,
    pub code: Key,
    pub members: Vec<Key>,
}

/// Synthetic column summing the member columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSubgroup {
    pub name: String,
    pub members: Vec<Key>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrosstabRequest {
    pub filter: Option<String>,
    pub condition: Option<String>,
    pub rows: Vec<String>,
    pub column: Option<String>,
    pub sort_on: Option<Vec<String>>,
    pub row_order: Option<Vec<Key>>,
    pub column_order: Option<Vec<Key>>,
    pub row_subgroups: Vec<RowSubgroup>,
    pub column_subgroups: Vec<ColumnSubgroup>,
    pub include_row_total: bool,
    pub multiplier: Option<f64>,
    pub output: OutputKind,
    pub percent_across_columns: bool,
    pub disclosure: bool,
    pub aggregation: Aggregation,
    pub column_rename: BTreeMap<String, String>,
}

impl Default for CrosstabRequest {
    fn default() -> Self {
        Self {
            filter: None,
            condition: None,
            rows: Vec::new(),
            column: None,
            sort_on: None,
            row_order: None,
            column_order: None,
            row_subgroups: Vec::new(),
            column_subgroups: Vec::new(),
            include_row_total: true,
            multiplier: None,
            output: OutputKind::Counts,
            percent_across_columns: true,
            disclosure: false,
            aggregation: Aggregation::CountIdentifier,
            column_rename: BTreeMap::new(),
        }
    }
}

impl CrosstabRequest {
    pub fn new<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>) -> Self {
        self.filter = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: OutputKind) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_disclosure(mut self, enable: bool) -> Self {
        self.disclosure = enable;
        self
    }

    #[must_use]
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    #[must_use]
    pub fn with_sort_on<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort_on = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_row_order<I, K>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.row_order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_column_order<I, K>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.column_order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_row_subgroup(mut self, subgroup: RowSubgroup) -> Self {
        self.row_subgroups.push(subgroup);
        self
    }

    #[must_use]
    pub fn with_column_subgroup(mut self, subgroup: ColumnSubgroup) -> Self {
        self.column_subgroups.push(subgroup);
        self
    }

    #[must_use]
    pub fn with_row_total(mut self, include: bool) -> Self {
        self.include_row_total = include;
        self
    }

    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Percent direction: `true` divides by the row total, `false` by the
    /// column total.
    #[must_use]
    pub fn with_percent_across_columns(mut self, across: bool) -> Self {
        self.percent_across_columns = across;
        self
    }

    #[must_use]
    pub fn with_column_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.column_rename.insert(from.into(), to.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MultiFieldRequest {
    pub filter: Option<String>,
    pub condition: Option<String>,
    pub breakdown: Vec<String>,
    pub sort_on: Option<Vec<String>>,
    pub breakdown_order: Option<Vec<Key>>,
    pub measure_group: String,
    pub measure_order: Option<Vec<String>>,
    pub breakdown_subgroups: Vec<RowSubgroup>,
    pub include_breakdown_total: bool,
    pub multiplier: Option<f64>,
    pub output: OutputKind,
    pub measures_as_rows: bool,
    pub disclosure: bool,
}

impl Default for MultiFieldRequest {
    fn default() -> Self {
        Self {
            filter: None,
            condition: None,
            breakdown: Vec::new(),
            sort_on: None,
            breakdown_order: None,
            measure_group: String::new(),
            measure_order: None,
            breakdown_subgroups: Vec::new(),
            include_breakdown_total: true,
            multiplier: None,
            output: OutputKind::Counts,
            measures_as_rows: false,
            disclosure: false,
        }
    }
}

impl MultiFieldRequest {
    pub fn new<I, S>(measure_group: impl Into<String>, breakdown: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            measure_group: measure_group.into(),
            breakdown: breakdown.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>) -> Self {
        self.filter = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: OutputKind) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_disclosure(mut self, enable: bool) -> Self {
        self.disclosure = enable;
        self
    }

    #[must_use]
    pub fn with_sort_on<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort_on = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_breakdown_order<I, K>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.breakdown_order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_measure_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.measure_order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_breakdown_subgroup(mut self, subgroup: RowSubgroup) -> Self {
        self.breakdown_subgroups.push(subgroup);
        self
    }

    #[must_use]
    pub fn with_breakdown_total(mut self, include: bool) -> Self {
        self.include_breakdown_total = include;
        self
    }

    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    #[must_use]
    pub fn with_measures_as_rows(mut self, enable: bool) -> Self {
        self.measures_as_rows = enable;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crosstab_request_defaults_keep_totals() {
        let request = CrosstabRequest::new(["Age_group"]).with_column("Gender");
        assert!(request.include_row_total);
        assert!(request.percent_across_columns);
        assert_eq!(request.output, OutputKind::Counts);
        assert_eq!(request.aggregation, Aggregation::CountIdentifier);
    }

    #[test]
    fn crosstab_request_from_json() {
        let request: CrosstabRequest = serde_json::from_str(
            r#"{
                "rows": ["Method"],
                "column": "Age_group",
                "output": "percents",
                "aggregation": {"sum": "Count"},
                "row_order": ["LARC", 2],
                "row_subgroups": [{"field": "Method", "code": "All", "members": ["LARC"]}]
            }"#,
        )
        .expect("parse request");
        assert_eq!(request.output, OutputKind::Percents);
        assert_eq!(request.aggregation, Aggregation::Sum("Count".to_string()));
        assert_eq!(request.row_order, Some(vec![Key::parse("LARC"), Key::Int(2)]));
        assert_eq!(request.row_subgroups[0].code, Key::parse("All"));
    }

    #[test]
    fn unknown_request_fields_are_rejected() {
        let result: Result<MultiFieldRequest, _> =
            serde_json::from_str(r#"{"measure_group": "DQ", "breakdwon": ["x"]}"#);
        assert!(result.is_err());
    }
}
