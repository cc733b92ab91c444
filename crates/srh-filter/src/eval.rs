//! Column-wise evaluation of a [`Predicate`] into a row mask.
//!
//! Null handling mirrors dataframe semantics: equality, ordering,
//! membership and string tests are false on null, `!=` and `not in` are
//! true on null.

use std::cmp::Ordering;

use srh_model::{Dataset, Value};

use crate::ast::{CmpOp, Literal, Predicate, StrMethod};
use crate::error::Result;

/// Evaluates `predicate` for every row of `data`.
///
/// Every referenced field must exist; the first missing one is reported.
pub fn mask(predicate: &Predicate, data: &Dataset) -> Result<Vec<bool>> {
    data.require_all(predicate.required_fields().iter().map(String::as_str))?;
    evaluate(predicate, data)
}

/// Keeps the rows of `data` for which `predicate` holds.
pub fn filter_rows(predicate: &Predicate, data: &Dataset) -> Result<Dataset> {
    let keep = mask(predicate, data)?;
    Ok(data.filter(&keep))
}

fn evaluate(predicate: &Predicate, data: &Dataset) -> Result<Vec<bool>> {
    Ok(match predicate {
        Predicate::Compare { field, op, literal } => data
            .require(field)?
            .iter()
            .map(|value| compare(value, *op, literal))
            .collect(),
        Predicate::InList {
            field,
            values,
            negated,
        } => data
            .require(field)?
            .iter()
            .map(|value| {
                if value.is_null() {
                    return *negated;
                }
                let found = values
                    .iter()
                    .any(|literal| ordering(value, literal) == Some(Ordering::Equal));
                found != *negated
            })
            .collect(),
        Predicate::Str {
            field,
            method,
            pattern,
        } => data
            .require(field)?
            .iter()
            .map(|value| {
                value.canonical_text().is_some_and(|text| match method {
                    StrMethod::StartsWith => text.starts_with(pattern.as_str()),
                    StrMethod::EndsWith => text.ends_with(pattern.as_str()),
                    StrMethod::Contains => text.contains(pattern.as_str()),
                })
            })
            .collect(),
        Predicate::Null { field, negated } => data
            .require(field)?
            .iter()
            .map(|value| value.is_null() != *negated)
            .collect(),
        Predicate::And(left, right) => {
            let left = evaluate(left, data)?;
            let right = evaluate(right, data)?;
            left.into_iter().zip(right).map(|(l, r)| l && r).collect()
        }
        Predicate::Or(left, right) => {
            let left = evaluate(left, data)?;
            let right = evaluate(right, data)?;
            left.into_iter().zip(right).map(|(l, r)| l || r).collect()
        }
        Predicate::Not(inner) => evaluate(inner, data)?.into_iter().map(|v| !v).collect(),
    })
}

fn compare(value: &Value, op: CmpOp, literal: &Literal) -> bool {
    let order = ordering(value, literal);
    match op {
        CmpOp::Eq => order == Some(Ordering::Equal),
        CmpOp::Ne => order != Some(Ordering::Equal),
        CmpOp::Lt => order == Some(Ordering::Less),
        CmpOp::Le => matches!(order, Some(Ordering::Less | Ordering::Equal)),
        CmpOp::Gt => order == Some(Ordering::Greater),
        CmpOp::Ge => matches!(order, Some(Ordering::Greater | Ordering::Equal)),
    }
}

/// Orders a value against a literal; `None` when they cannot be compared.
fn ordering(value: &Value, literal: &Literal) -> Option<Ordering> {
    match (value, literal) {
        (Value::Null, _) => None,
        (Value::Float(v), _) if v.is_nan() => None,
        (Value::Text(text), Literal::Text(expected)) => Some(text.as_str().cmp(expected.as_str())),
        (Value::Int(v), Literal::Int(expected)) => Some(v.cmp(expected)),
        (Value::Int(_) | Value::Float(_), Literal::Int(_) | Literal::Float(_)) => {
            value.as_f64()?.partial_cmp(&literal_number(literal)?)
        }
        (Value::Int(_) | Value::Float(_), Literal::Text(expected)) => {
            match expected.trim().parse::<f64>() {
                Ok(number) => value.as_f64()?.partial_cmp(&number),
                Err(_) => value
                    .canonical_text()
                    .map(|text| text.as_str().cmp(expected.as_str())),
            }
        }
        (Value::Text(_), Literal::Int(_) | Literal::Float(_)) => {
            value.as_f64()?.partial_cmp(&literal_number(literal)?)
        }
    }
}

fn literal_number(literal: &Literal) -> Option<f64> {
    match literal {
        Literal::Int(v) => Some(*v as f64),
        Literal::Float(v) => Some(*v),
        Literal::Text(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn contacts() -> Dataset {
        Dataset::from_rows(
            &["Gender", "Age", "LA_parent_code", "Status"],
            vec![
                vec!["2".into(), 17.into(), "E12000001".into(), "1".into()],
                vec!["1".into(), 25.into(), "E12000002".into(), Value::Null],
                vec!["2".into(), Value::Null, Value::Null, "0".into()],
                vec![Value::Null, 40.into(), "W92000004".into(), "1".into()],
            ],
        )
        .expect("fixture")
    }

    fn eval(expression: &str) -> Vec<bool> {
        mask(&parse(expression).expect("parse"), &contacts()).expect("mask")
    }

    #[test]
    fn equality_is_false_on_null_and_inequality_true() {
        assert_eq!(eval("Gender == '2'"), vec![true, false, true, false]);
        assert_eq!(eval("Gender != '2'"), vec![false, true, false, true]);
    }

    #[test]
    fn numeric_comparisons_skip_nulls() {
        assert_eq!(eval("Age >= 18"), vec![false, true, false, true]);
        assert_eq!(eval("Age < 18"), vec![true, false, false, false]);
        assert_eq!(eval("Age == '25'"), vec![false, true, false, false]);
    }

    #[test]
    fn text_against_numeric_literal_parses_the_text() {
        assert_eq!(eval("Gender == 2"), vec![true, false, true, false]);
        assert_eq!(eval("LA_parent_code == 2"), vec![false, false, false, false]);
    }

    #[test]
    fn membership_and_string_tests() {
        assert_eq!(eval("Gender in ['1', '2']"), vec![true, true, true, false]);
        assert_eq!(eval("Gender not in ['1']"), vec![true, false, true, true]);
        assert_eq!(
            eval("LA_parent_code.str.startswith('E12')"),
            vec![true, true, false, false]
        );
    }

    #[test]
    fn null_checks_and_boolean_structure() {
        assert_eq!(eval("Status.notnull()"), vec![true, false, true, true]);
        assert_eq!(eval("Status.isnull()"), vec![false, true, false, false]);
        assert_eq!(
            eval("(Gender == '2') & ~(Status == '0')"),
            vec![true, false, false, false]
        );
        assert_eq!(
            eval("(Gender == '1') | (Age > 30)"),
            vec![false, true, false, true]
        );
    }

    #[test]
    fn missing_field_is_reported() {
        let predicate = parse("Outside_england == 'N'").expect("parse");
        let err = mask(&predicate, &contacts()).unwrap_err();
        assert!(err.to_string().contains("Outside_england"));
    }
}
