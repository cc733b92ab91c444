//! Column-oriented in-memory table.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ModelError, Result};
use crate::value::Value;

/// An immutable table of named columns of equal length.
///
/// Observation, population and organisation reference tables are all held
/// as datasets once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    fields: Vec<String>,
    columns: Vec<Vec<Value>>,
    height: usize,
}

impl Dataset {
    pub fn new(fields: Vec<String>, columns: Vec<Vec<Value>>) -> Result<Self> {
        if fields.len() != columns.len() {
            return Err(ModelError::RowShape {
                part: "columns",
                expected: fields.len(),
                actual: columns.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for field in &fields {
            if !seen.insert(field.as_str()) {
                return Err(ModelError::DuplicateField {
                    field: field.clone(),
                });
            }
        }
        let height = columns.first().map_or(0, Vec::len);
        for (field, column) in fields.iter().zip(&columns) {
            if column.len() != height {
                return Err(ModelError::ColumnLength {
                    field: field.clone(),
                    expected: height,
                    actual: column.len(),
                });
            }
        }
        Ok(Self {
            fields,
            columns,
            height,
        })
    }

    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let (fields, columns): (Vec<String>, Vec<Vec<Value>>) = columns
            .into_iter()
            .map(|(name, values)| (name.into(), values))
            .unzip();
        Self::new(fields, columns)
    }

    /// Builds a dataset from row-major values, mostly useful for fixtures.
    pub fn from_rows(fields: &[&str], rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); fields.len()];
        for row in rows {
            if row.len() != fields.len() {
                return Err(ModelError::RowShape {
                    part: "values",
                    expected: fields.len(),
                    actual: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        let fields = fields.iter().map(|f| (*f).to_string()).collect();
        Self::new(fields, columns)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.fields
            .iter()
            .position(|f| f == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    /// Column lookup that fails with the list of available fields.
    pub fn require(&self, name: &str) -> Result<&[Value]> {
        self.column(name)
            .ok_or_else(|| ModelError::missing_field(name, &self.fields))
    }

    pub fn require_all<'a, I>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in names {
            self.require(name)?;
        }
        Ok(())
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        self.column(name).and_then(|column| column.get(row))
    }

    /// New dataset holding the given rows, in the given order.
    pub fn take(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|column| indices.iter().map(|&idx| column[idx].clone()).collect())
            .collect();
        Self {
            fields: self.fields.clone(),
            columns,
            height: indices.len(),
        }
    }

    /// Keeps rows whose mask entry is true.
    pub fn filter(&self, mask: &[bool]) -> Self {
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(idx, keep)| keep.then_some(idx))
            .collect();
        self.take(&indices)
    }

    /// Renames fields. A renamed field replaces any existing field of the
    /// target name.
    pub fn rename(&self, renames: &BTreeMap<String, String>) -> Self {
        let targets: BTreeSet<&str> = renames
            .iter()
            .filter(|(from, _)| self.has_field(from))
            .map(|(_, to)| to.as_str())
            .collect();
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut columns = Vec::with_capacity(self.columns.len());
        for (field, column) in self.fields.iter().zip(&self.columns) {
            match renames.get(field) {
                Some(target) => {
                    fields.push(target.clone());
                    columns.push(column.clone());
                }
                None if targets.contains(field.as_str()) => {}
                None => {
                    fields.push(field.clone());
                    columns.push(column.clone());
                }
            }
        }
        Self {
            fields,
            columns,
            height: self.height,
        }
    }

    /// Projects the named fields, in the given order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            columns.push(self.require(name.as_ref())?.to_vec());
        }
        Ok(Self {
            fields: names.iter().map(|n| n.as_ref().to_string()).collect(),
            columns,
            height: self.height,
        })
    }

    /// Adds a column, or replaces it when the field already exists.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<Value>) -> Result<Self> {
        let name = name.into();
        if !self.fields.is_empty() && values.len() != self.height {
            return Err(ModelError::ColumnLength {
                field: name,
                expected: self.height,
                actual: values.len(),
            });
        }
        if self.fields.is_empty() {
            self.height = values.len();
        }
        match self.fields.iter().position(|f| *f == name) {
            Some(idx) => self.columns[idx] = values,
            None => {
                self.fields.push(name);
                self.columns.push(values);
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_rows(
            &["Org_code", "Org_name", "Count"],
            vec![
                vec!["E06000001".into(), "LA1".into(), 10.into()],
                vec!["E07000001".into(), "LA2".into(), 4.into()],
                vec!["E10000001".into(), Value::Null, 7.into()],
            ],
        )
        .expect("sample dataset")
    }

    #[test]
    fn require_reports_available_fields() {
        let err = sample().require("LA_code").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("LA_code"));
        assert!(message.contains("Org_code"));
    }

    #[test]
    fn rename_and_select() {
        let renames = BTreeMap::from([("Org_code".to_string(), "LA_code".to_string())]);
        let renamed = sample().rename(&renames);
        assert!(renamed.has_field("LA_code"));
        assert!(!renamed.has_field("Org_code"));
        let selected = renamed.select(&["Count", "LA_code"]).expect("select");
        assert_eq!(selected.fields(), ["Count", "LA_code"]);
        assert_eq!(selected.height(), 3);
    }

    #[test]
    fn rename_replaces_existing_target() {
        let data = Dataset::from_rows(&["a", "b"], vec![vec![1.into(), 2.into()]]).expect("data");
        let renames = BTreeMap::from([("a".to_string(), "b".to_string())]);
        let renamed = data.rename(&renames);
        assert_eq!(renamed.fields(), ["b"]);
        assert_eq!(renamed.value(0, "b"), Some(&Value::Int(1)));
    }

    #[test]
    fn filter_keeps_masked_rows() {
        let filtered = sample().filter(&[true, false, true]);
        assert_eq!(filtered.height(), 2);
        assert_eq!(filtered.value(1, "Org_code"), Some(&Value::from("E10000001")));
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = Dataset::from_columns([
            ("a", vec![Value::Int(1)]),
            ("b", vec![Value::Int(1), Value::Int(2)]),
        ])
        .unwrap_err();
        assert!(matches!(err, ModelError::ColumnLength { .. }));
    }
}
