//! Group-by reduction over a dataset.

use std::collections::BTreeMap;

use srh_model::{Dataset, Key, Value};

use crate::error::Result;

/// Per-group reduction of one field.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Reducer<'a> {
    /// Non-null values of the field.
    Count(&'a str),
    /// Sum of the numeric values of the field; nulls are skipped.
    Sum(&'a str),
}

impl Reducer<'_> {
    pub(crate) fn field(&self) -> &str {
        match self {
            Reducer::Count(field) | Reducer::Sum(field) => field,
        }
    }

    fn contribution(&self, value: &Value) -> f64 {
        match self {
            Reducer::Count(_) => {
                if value.to_key().is_some() {
                    1.0
                } else {
                    0.0
                }
            }
            Reducer::Sum(_) => value.as_f64().unwrap_or(0.0),
        }
    }
}

/// Group keys of every row, `None` where any key field is null.
pub(crate) fn group_keys(data: &Dataset, fields: &[String]) -> Result<Vec<Option<Vec<Key>>>> {
    let columns = fields
        .iter()
        .map(|field| data.require(field))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((0..data.height())
        .map(|row| columns.iter().map(|column| column[row].to_key()).collect())
        .collect())
}

/// Reduces each reducer per group. Rows with a null key are dropped; groups
/// come back in ascending key order.
pub(crate) fn group_reduce(
    data: &Dataset,
    fields: &[String],
    reducers: &[Reducer<'_>],
) -> Result<BTreeMap<Vec<Key>, Vec<f64>>> {
    let keys = group_keys(data, fields)?;
    let columns = reducers
        .iter()
        .map(|reducer| data.require(reducer.field()))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut groups: BTreeMap<Vec<Key>, Vec<f64>> = BTreeMap::new();
    for (row, key) in keys.into_iter().enumerate() {
        let Some(key) = key else { continue };
        let totals = groups
            .entry(key)
            .or_insert_with(|| vec![0.0; reducers.len()]);
        for ((total, reducer), column) in totals.iter_mut().zip(reducers).zip(&columns) {
            *total += reducer.contribution(&column[row]);
        }
    }
    Ok(groups)
}
