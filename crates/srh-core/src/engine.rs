//! The aggregation engine and the stages shared by its operations.

use srh_filter::{FilterRegistry, NamedFilter, Predicate, filter_rows, parse};
use srh_model::{
    Aggregation, Cell, ColumnSubgroup, Dataset, EngineConfig, OutputTable, RowSubgroup,
};
use tracing::debug;

use crate::aggregate::Reducer;
use crate::disclosure::suppress_columns;
use crate::error::{EngineError, Result};
use crate::orgref::{join_org_reference, select_org_reference};
use crate::subgroup::{add_column_subgroup, add_row_subgroup};

/// Runs crosstab and multi-field aggregations under one configuration.
///
/// The configuration, the compiled filters and the attached reference
/// tables are read-only, so the same engine serves every output of a run.
#[derive(Debug, Clone)]
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) filters: FilterRegistry,
    pub(crate) rate_scope: Option<Predicate>,
    pub(crate) population: Option<Dataset>,
    pub(crate) org_reference: Option<Dataset>,
}

impl Engine {
    /// Compiles the configured filters and rate scope.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let filters = FilterRegistry::from_definitions(&config.filters)?;
        let rate_scope = config
            .rate_scope
            .as_deref()
            .map(parse)
            .transpose()
            .map_err(|source| EngineError::Expression {
                part: "rate scope",
                source,
            })?;
        debug!(filters = filters.len(), "compiled engine filters");
        Ok(Self {
            config,
            filters,
            rate_scope,
            population: None,
            org_reference: None,
        })
    }

    /// Attaches the population table used as the denominator of rates.
    #[must_use]
    pub fn with_population(mut self, population: Dataset) -> Self {
        self.population = Some(population);
        self
    }

    /// Attaches the classified organisation reference table.
    #[must_use]
    pub fn with_org_reference(mut self, reference: Dataset) -> Self {
        self.org_reference = Some(reference);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn has_population(&self) -> bool {
        self.population.is_some()
    }

    pub fn has_org_reference(&self) -> bool {
        self.org_reference.is_some()
    }

    pub(crate) fn total_label(&self) -> &str {
        &self.config.total_label
    }

    pub(crate) fn named_filter(&self, name: Option<&str>) -> Result<Option<&NamedFilter>> {
        Ok(name.map(|name| self.filters.get(name)).transpose()?)
    }

    pub(crate) fn reducer<'a>(&'a self, aggregation: &'a Aggregation) -> Reducer<'a> {
        match aggregation {
            Aggregation::CountIdentifier => Reducer::Count(&self.config.identifier_field),
            Aggregation::Count(field) => Reducer::Count(field),
            Aggregation::Sum(field) => Reducer::Sum(field),
        }
    }

    /// Named filter, then condition, then the rate scope when asked for.
    pub(crate) fn apply_filters(
        &self,
        data: &Dataset,
        filter: Option<&NamedFilter>,
        condition: Option<&Predicate>,
        rate_scope: bool,
    ) -> Result<Dataset> {
        let mut filtered = match filter {
            Some(filter) => filter.apply(data)?,
            None => data.clone(),
        };
        if let Some(condition) = condition {
            filtered = filter_rows(condition, &filtered)?;
            debug!(condition = %condition, rows = filtered.height(), "applied condition");
        }
        if rate_scope && let Some(scope) = &self.rate_scope {
            filtered = filter_rows(scope, &filtered)?;
            debug!(rows = filtered.height(), "applied rate scope");
        }
        Ok(filtered)
    }

    /// Replaces organisation labels from the reference for every configured
    /// local field among the table's index fields.
    pub(crate) fn join_local_fields(&self, mut table: OutputTable) -> Result<OutputTable> {
        let settings = &self.config.org_reference;
        for (field, local) in &settings.local_fields {
            if !table.index_fields().contains(field) {
                continue;
            }
            let reference = self
                .org_reference
                .as_ref()
                .ok_or_else(|| EngineError::MissingOrgReference {
                    field: field.clone(),
                })?;
            let organisations = select_org_reference(reference, settings, field, local)?;
            table = join_org_reference(&table, &organisations, field, self.total_label())?;
        }
        Ok(table)
    }

    /// Subgroups, organisation join and disclosure for a freshly pivoted
    /// counts table.
    pub(crate) fn finish_counts(
        &self,
        mut table: OutputTable,
        row_subgroups: &[RowSubgroup],
        column_subgroups: &[ColumnSubgroup],
        disclosure: bool,
        disclosed_columns: &[String],
    ) -> Result<OutputTable> {
        for subgroup in row_subgroups {
            add_row_subgroup(&mut table, subgroup, self.total_label())?;
        }
        for subgroup in column_subgroups {
            add_column_subgroup(&mut table, subgroup)?;
        }
        let mut table = self.join_local_fields(table)?;
        for column in disclosed_columns {
            if table.column_index(column).is_none() {
                let zeros = vec![Cell::ZERO; table.height()];
                table.insert_column(table.width(), column.clone(), zeros)?;
            }
        }
        if disclosure {
            let mut columns = vec![self.config.total_label.clone()];
            for column in disclosed_columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
            suppress_columns(&mut table, &columns, &self.config.disclosure);
        }
        Ok(table)
    }
}

/// Multiplies every count.
pub(crate) fn apply_multiplier(table: &mut OutputTable, multiplier: Option<f64>) {
    let Some(multiplier) = multiplier else {
        return;
    };
    let columns = table.columns().to_vec();
    for column in &columns {
        table.map_column(column, |cell| cell.map(|v| v * multiplier));
    }
}

pub(crate) fn parse_condition(condition: Option<&str>) -> Result<Option<Predicate>> {
    condition
        .map(parse)
        .transpose()
        .map_err(|source| EngineError::Expression {
            part: "condition",
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use srh_model::Value;

    #[test]
    fn invalid_rate_scope_fails_at_construction() {
        let config = EngineConfig {
            rate_scope: Some("Age_group_alt not in".to_string()),
            ..EngineConfig::default()
        };
        let err = Engine::new(config).unwrap_err();
        assert!(err.to_string().starts_with("invalid rate scope expression"));
    }

    #[test]
    fn filters_apply_in_order() {
        let engine = Engine::new(EngineConfig::default()).expect("engine");
        let data = Dataset::from_rows(
            &["MainContact", "Gender", "Outside_england", "Age_group_alt"],
            vec![
                vec!["Y".into(), 2.into(), "N".into(), "16-17".into()],
                vec!["Y".into(), 1.into(), "N".into(), "16-17".into()],
                vec!["Y".into(), 2.into(), "Y".into(), "16-17".into()],
                vec!["N".into(), 2.into(), "N".into(), "16-17".into()],
                vec!["Y".into(), 2.into(), "N".into(), "55+".into()],
            ],
        )
        .expect("data");
        let filter = engine
            .named_filter(Some("persons_main_contact"))
            .expect("filter");
        let condition = parse_condition(Some("Gender == '2'")).expect("condition");

        let counts = engine
            .apply_filters(&data, filter, condition.as_ref(), false)
            .expect("filtered");
        assert_eq!(counts.height(), 3);
        let rates = engine
            .apply_filters(&data, filter, condition.as_ref(), true)
            .expect("filtered");
        assert_eq!(rates.height(), 1);
        assert_eq!(rates.value(0, "Outside_england"), Some(&Value::from("N")));
    }

    #[test]
    fn local_fields_need_the_reference() {
        let engine = Engine::new(EngineConfig::default()).expect("engine");
        let table = OutputTable::new(vec!["LA_code".to_string()], vec!["Grand_total".to_string()]);
        let err = engine.join_local_fields(table).unwrap_err();
        assert!(matches!(err, EngineError::MissingOrgReference { .. }));
    }
}
