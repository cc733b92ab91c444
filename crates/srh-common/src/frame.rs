//! Polars AnyValue utility functions.
//!
//! Helpers for moving cell values between Polars frames and the engine's
//! [`Value`] representation.

use polars::prelude::{AnyValue, Column, DataFrame, IntoColumn, NamedFrom, PolarsResult, Series};
use srh_model::{Dataset, Value};

/// Converts a Polars `AnyValue` to an engine [`Value`].
///
/// Integer types widen to `Int`, floats to `Float`, strings are trimmed and
/// blank strings become `Null`. Booleans map to `1`/`0` so flag columns read
/// as booleans still sum.
///
/// # Examples
///
/// ```
/// use polars::prelude::AnyValue;
/// use srh_common::any_to_value;
/// use srh_model::Value;
///
/// assert_eq!(any_to_value(AnyValue::Int32(42)), Value::Int(42));
/// assert_eq!(any_to_value(AnyValue::String(" 16-17 ")), Value::from("16-17"));
/// assert_eq!(any_to_value(AnyValue::String("")), Value::Null);
/// ```
pub fn any_to_value(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Int8(v) => Value::Int(i64::from(v)),
        AnyValue::Int16(v) => Value::Int(i64::from(v)),
        AnyValue::Int32(v) => Value::Int(i64::from(v)),
        AnyValue::Int64(v) => Value::Int(v),
        AnyValue::UInt8(v) => Value::Int(i64::from(v)),
        AnyValue::UInt16(v) => Value::Int(i64::from(v)),
        AnyValue::UInt32(v) => Value::Int(i64::from(v)),
        AnyValue::UInt64(v) => i64::try_from(v).map_or(Value::Float(v as f64), Value::Int),
        AnyValue::Float32(v) => float_value(f64::from(v)),
        AnyValue::Float64(v) => float_value(v),
        AnyValue::Boolean(b) => Value::Int(i64::from(b)),
        AnyValue::String(s) => text_value(s),
        AnyValue::StringOwned(s) => text_value(&s),
        other => text_value(&other.to_string()),
    }
}

fn float_value(v: f64) -> Value {
    if v.is_nan() { Value::Null } else { Value::Float(v) }
}

fn text_value(s: &str) -> Value {
    let trimmed = s.trim().trim_matches('\u{feff}');
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::Text(trimmed.to_string())
    }
}

/// Converts a Polars `AnyValue` to a `String`; `Null` becomes empty.
pub fn any_to_string(value: AnyValue<'_>) -> String {
    any_to_value(value).canonical_text().unwrap_or_default()
}

/// Converts an `AnyValue` to `f64`, returning `None` for non-numeric or null values.
pub fn any_to_f64(value: AnyValue<'_>) -> Option<f64> {
    any_to_value(value).as_f64()
}

/// Formats a floating-point number as a string without trailing zeros.
///
/// # Examples
///
/// ```
/// use srh_common::format_numeric;
///
/// assert_eq!(format_numeric(1.0), "1");
/// assert_eq!(format_numeric(1.50), "1.5");
/// assert_eq!(format_numeric(0.0), "0");
/// ```
pub fn format_numeric(v: f64) -> String {
    srh_model::format_number(v)
}

/// Parses a string as `f64`, returning `None` for invalid or empty strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Reads every value of a column.
pub fn column_values(column: &Column) -> Vec<Value> {
    (0..column.len())
        .map(|idx| any_to_value(column.get(idx).unwrap_or(AnyValue::Null)))
        .collect()
}

/// Converts a frame into a [`Dataset`], keeping column order.
pub fn dataset_from_frame(df: &DataFrame) -> srh_model::Result<Dataset> {
    let columns = df
        .get_columns()
        .iter()
        .map(|column| (column.name().to_string(), column_values(column)));
    Dataset::from_columns(columns)
}

/// Converts a [`Dataset`] back into a frame.
///
/// Columns holding only integers become `Int64`, numeric columns become
/// `Float64`, anything else is written as text.
pub fn frame_from_dataset(dataset: &Dataset) -> PolarsResult<DataFrame> {
    let columns: Vec<Column> = dataset
        .fields()
        .iter()
        .map(|field| {
            let values = dataset.column(field).unwrap_or(&[]);
            series_from_values(field, values).into_column()
        })
        .collect();
    DataFrame::new(columns)
}

fn series_from_values(name: &str, values: &[Value]) -> Series {
    let all_int = values
        .iter()
        .all(|v| matches!(v, Value::Int(_) | Value::Null));
    let all_numeric = values
        .iter()
        .all(|v| matches!(v, Value::Int(_) | Value::Float(_) | Value::Null));
    if all_int {
        let ints: Vec<Option<i64>> = values
            .iter()
            .map(|v| match v {
                Value::Int(i) => Some(*i),
                _ => None,
            })
            .collect();
        Series::new(name.into(), ints)
    } else if all_numeric {
        let floats: Vec<Option<f64>> = values.iter().map(Value::as_f64).collect();
        Series::new(name.into(), floats)
    } else {
        let texts: Vec<Option<String>> = values.iter().map(Value::canonical_text).collect();
        Series::new(name.into(), texts)
    }
}
