//! Organisation type and level from code prefixes.

use std::collections::BTreeSet;

use srh_model::{Dataset, OrgPrefixRule, Value};
use tracing::warn;

use crate::error::{IngestError, Result};

pub const ORG_TYPE_FIELD: &str = "Org_type";
pub const ORG_LEVEL_FIELD: &str = "Org_level";

/// First rule whose prefix starts `code`.
pub fn classify_code<'a>(code: &str, rules: &'a [OrgPrefixRule]) -> Option<&'a OrgPrefixRule> {
    rules.iter().find(|rule| code.starts_with(rule.prefix.as_str()))
}

/// Rows whose non-null code matches no rule.
pub fn unclassified_rows(data: &Dataset, code_field: &str, rules: &[OrgPrefixRule]) -> Result<Dataset> {
    let keep: Vec<bool> = data
        .require(code_field)?
        .iter()
        .map(|value| {
            value
                .canonical_text()
                .is_some_and(|code| classify_code(&code, rules).is_none())
        })
        .collect();
    Ok(data.filter(&keep))
}

/// Adds `Org_type` and `Org_level` columns derived from `code_field`.
///
/// Null codes get null attributes. Any other code that no rule covers is a
/// data-consistency error carrying the distinct codes.
pub fn classify_organisations(
    data: Dataset,
    code_field: &str,
    rules: &[OrgPrefixRule],
) -> Result<Dataset> {
    let mut types = Vec::with_capacity(data.height());
    let mut levels = Vec::with_capacity(data.height());
    let mut unclassified = BTreeSet::new();
    let mut unclassified_count = 0;
    for value in data.require(code_field)? {
        let Some(code) = value.canonical_text() else {
            types.push(Value::Null);
            levels.push(Value::Null);
            continue;
        };
        match classify_code(&code, rules) {
            Some(rule) => {
                types.push(Value::from(rule.org_type.as_str()));
                levels.push(Value::from(rule.org_level.as_str()));
            }
            None => {
                unclassified_count += 1;
                unclassified.insert(code);
            }
        }
    }
    if !unclassified.is_empty() {
        warn!(
            field = code_field,
            records = unclassified_count,
            "unclassified organisation codes"
        );
        return Err(IngestError::UnclassifiedCodes {
            field: code_field.to_string(),
            count: unclassified_count,
            codes: unclassified.into_iter().collect(),
        });
    }
    Ok(data
        .with_column(ORG_TYPE_FIELD, types)?
        .with_column(ORG_LEVEL_FIELD, levels)?)
}
