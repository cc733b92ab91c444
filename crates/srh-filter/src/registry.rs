//! Named, pre-compiled row filters.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use srh_model::{DedupeRule, Dataset, FilterDefinition, Key};
use tracing::debug;

use crate::ast::Predicate;
use crate::error::{FilterError, Result};
use crate::eval::mask;
use crate::parser::parse;

/// A registered filter: a predicate and an optional one-record-per-key rule.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedFilter {
    pub name: String,
    pub predicate: Predicate,
    pub dedupe: Option<DedupeRule>,
}

impl NamedFilter {
    pub fn compile(name: &str, definition: &FilterDefinition) -> Result<Self> {
        let predicate = parse(&definition.expression).map_err(|source| FilterError::Definition {
            name: name.to_string(),
            source: Box::new(source),
        })?;
        Ok(Self {
            name: name.to_string(),
            predicate,
            dedupe: definition.dedupe.clone(),
        })
    }

    /// Fields read by the predicate and the dedupe rule.
    pub fn required_fields(&self) -> BTreeSet<String> {
        let mut fields = self.predicate.required_fields();
        if let Some(rule) = &self.dedupe {
            fields.extend(rule.sort_by.iter().cloned());
            fields.extend(rule.unique_on.iter().cloned());
        }
        fields
    }

    pub fn apply(&self, data: &Dataset) -> Result<Dataset> {
        data.require_all(self.required_fields().iter().map(String::as_str))?;
        let keep = mask(&self.predicate, data)?;
        let filtered = data.filter(&keep);
        debug!(
            filter = %self.name,
            before = data.height(),
            after = filtered.height(),
            "applied named filter"
        );
        match &self.dedupe {
            Some(rule) => dedupe(&filtered, rule),
            None => Ok(filtered),
        }
    }
}

/// Keeps the first record per `unique_on` combination when ordered by
/// `sort_by` (ascending, nulls last). Surviving rows keep their input order.
pub fn dedupe(data: &Dataset, rule: &DedupeRule) -> Result<Dataset> {
    let sort_columns = rule
        .sort_by
        .iter()
        .map(|field| data.require(field))
        .collect::<srh_model::Result<Vec<_>>>()?;
    let unique_columns = rule
        .unique_on
        .iter()
        .map(|field| data.require(field))
        .collect::<srh_model::Result<Vec<_>>>()?;

    let mut order: Vec<usize> = (0..data.height()).collect();
    order.sort_by(|&a, &b| {
        sort_columns
            .iter()
            .map(|column| column[a].sort_cmp(&column[b]))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut seen: HashSet<Vec<Option<Key>>> = HashSet::new();
    let mut kept: Vec<usize> = order
        .into_iter()
        .filter(|&row| {
            let key = unique_columns
                .iter()
                .map(|column| column[row].to_key())
                .collect();
            seen.insert(key)
        })
        .collect();
    kept.sort_unstable();

    debug!(
        before = data.height(),
        after = kept.len(),
        "removed duplicate records"
    );
    Ok(data.take(&kept))
}

/// Registry of every configured filter, compiled once.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    filters: BTreeMap<String, NamedFilter>,
}

impl FilterRegistry {
    pub fn from_definitions(definitions: &BTreeMap<String, FilterDefinition>) -> Result<Self> {
        let filters = definitions
            .iter()
            .map(|(name, definition)| {
                NamedFilter::compile(name, definition).map(|filter| (name.clone(), filter))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self { filters })
    }

    /// Looks up a filter; unknown names list the valid ones.
    pub fn get(&self, name: &str) -> Result<&NamedFilter> {
        self.filters
            .get(name)
            .ok_or_else(|| FilterError::UnknownFilter {
                name: name.to_string(),
                valid: self.names(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.filters.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedFilter> {
        self.filters.values()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srh_model::{EngineConfig, Value};

    fn prescriptions() -> Dataset {
        Dataset::from_rows(
            &["Org_code_unedited", "PatientID", "LA_parent_code", "Age", "RowNum"],
            vec![
                vec!["A".into(), "p1".into(), Value::Null, 20.into(), 1.into()],
                vec!["A".into(), "p1".into(), "E12000002".into(), 20.into(), 2.into()],
                vec!["A".into(), "p2".into(), "E12000001".into(), 30.into(), 3.into()],
                vec!["B".into(), "p1".into(), "E12000003".into(), 19.into(), 4.into()],
                vec!["A".into(), "p1".into(), "E12000001".into(), 21.into(), 5.into()],
            ],
        )
        .expect("fixture")
    }

    #[test]
    fn dedupe_prefers_recorded_values_and_keeps_input_order() {
        let rule = DedupeRule {
            sort_by: vec![
                "LA_parent_code".to_string(),
                "Age".to_string(),
                "RowNum".to_string(),
            ],
            unique_on: vec!["Org_code_unedited".to_string(), "PatientID".to_string()],
        };
        let deduped = dedupe(&prescriptions(), &rule).expect("dedupe");
        let rows: Vec<&Value> = deduped.require("RowNum").expect("RowNum").iter().collect();
        assert_eq!(rows, vec![&Value::Int(3), &Value::Int(4), &Value::Int(5)]);
    }

    #[test]
    fn default_filters_compile() {
        let config = EngineConfig::default();
        let registry = FilterRegistry::from_definitions(&config.filters).expect("registry");
        assert_eq!(registry.len(), config.filters.len());
        let emergency = registry
            .get("females_emergency_contraception")
            .expect("emergency filter");
        assert!(emergency.required_fields().contains("RowNum"));
    }

    #[test]
    fn unknown_filter_lists_valid_names() {
        let registry = FilterRegistry::from_definitions(&EngineConfig::default().filters)
            .expect("registry");
        let err = registry.get("persons_everything").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("persons_everything"));
        assert!(message.contains("persons_main_contact"));
    }

    #[test]
    fn invalid_definition_names_the_filter() {
        let definitions = BTreeMap::from([(
            "broken".to_string(),
            FilterDefinition {
                expression: "MainContact = 'Y'".to_string(),
                dedupe: None,
            },
        )]);
        let err = FilterRegistry::from_definitions(&definitions).unwrap_err();
        assert!(matches!(err, FilterError::Definition { ref name, .. } if name == "broken"));
    }
}
