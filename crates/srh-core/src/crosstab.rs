//! Crosstab: one or more row fields against an optional column field.

use srh_filter::Predicate;
use srh_model::{Cell, CrosstabRequest, Dataset, OutputKind, OutputTable};
use tracing::{debug, info};

use crate::aggregate::{Reducer, group_reduce};
use crate::engine::{Engine, apply_multiplier, parse_condition};
use crate::error::{EngineError, Result};
use crate::ordering::{RowArrangement, arrange_rows, sort_fields};
use crate::percent::{PercentOptions, counts_to_percents};
use crate::pivot::pivot;
use crate::population::select_population;
use crate::rate::counts_to_rates;

impl Engine {
    /// Aggregates `data` into a crosstab.
    ///
    /// The request is checked against the configuration and the data before
    /// anything is counted.
    pub fn crosstab(&self, data: &Dataset, request: &CrosstabRequest) -> Result<OutputTable> {
        if request.rows.is_empty() {
            return Err(EngineError::invalid_request(
                "a crosstab needs at least one row field",
            ));
        }
        let filter = self.named_filter(request.filter.as_deref())?;
        let condition = parse_condition(request.condition.as_deref())?;
        let rates = request.output == OutputKind::Rates;
        if rates && self.population.is_none() {
            return Err(EngineError::MissingPopulation);
        }

        let (grouping, sort_only) = sort_fields(&request.rows, request.sort_on.as_deref());
        let reducer = self.reducer(&request.aggregation);
        let mut required: Vec<&str> = grouping.iter().map(String::as_str).collect();
        required.extend(request.column.as_deref());
        required.push(reducer.field());
        data.require_all(required)?;

        let filtered = self.apply_filters(data, filter, condition.as_ref(), rates)?;
        debug!(rows = filtered.height(), "records after filters");

        let (mut table, display) = self.crosstab_counts(&filtered, &grouping, reducer, request)?;
        let total_label = self.total_label();

        table = match request.output {
            OutputKind::Counts => {
                apply_multiplier(&mut table, request.multiplier);
                table
            }
            OutputKind::Percents => {
                let options = PercentOptions {
                    across_columns: request.percent_across_columns,
                    exempt: false,
                    cutoff: f64::from(self.config.disclosure.percent_cutoff),
                    decimals: request
                        .disclosure
                        .then_some(self.config.disclosure.percent_decimals),
                };
                counts_to_percents(&table, total_label, &options)?
            }
            OutputKind::Rates => {
                let population = self.crosstab_population(&grouping, condition.as_ref(), request)?;
                let decimals = request
                    .disclosure
                    .then_some(self.config.disclosure.rate_decimals);
                counts_to_rates(
                    &table,
                    &population,
                    total_label,
                    request.multiplier.unwrap_or(1.0),
                    decimals,
                )?
            }
        };

        let table = table.select_columns(&display)?;
        let mut table = arrange_rows(
            table,
            &RowArrangement {
                row_order: request.row_order.as_deref(),
                sort_on: request.sort_on.as_deref(),
                sort_only: &sort_only,
                include_total: request.include_row_total,
                total_label,
                missing: match request.output {
                    OutputKind::Counts => Cell::ZERO,
                    OutputKind::Percents | OutputKind::Rates => Cell::NotApplicable,
                },
            },
        )?;
        table.rename_columns(&request.column_rename);
        info!(
            output = %request.output,
            rows = table.height(),
            columns = table.width(),
            "built crosstab"
        );
        Ok(table)
    }

    /// Pivoted, subgrouped and disclosed counts plus the display columns.
    fn crosstab_counts(
        &self,
        data: &Dataset,
        grouping: &[String],
        reducer: Reducer<'_>,
        request: &CrosstabRequest,
    ) -> Result<(OutputTable, Vec<String>)> {
        let mut fields = grouping.to_vec();
        fields.extend(request.column.iter().cloned());
        let groups = group_reduce(data, &fields, &[reducer])?;
        let table = pivot(&groups, grouping, request.column.as_deref(), self.total_label())?;

        let display = self.display_columns(&table, request);
        let table = self.finish_counts(
            table,
            &request.row_subgroups,
            &request.column_subgroups,
            request.disclosure,
            &display,
        )?;
        Ok((table, display))
    }

    /// Declared column order, or every pivot column followed by the column
    /// subgroups. Without a column field only the total is shown.
    fn display_columns(&self, pivoted: &OutputTable, request: &CrosstabRequest) -> Vec<String> {
        if let Some(order) = &request.column_order {
            return order.iter().map(ToString::to_string).collect();
        }
        if request.column.is_none() {
            return vec![self.config.total_label.clone()];
        }
        let mut columns = pivoted.columns().to_vec();
        for subgroup in &request.column_subgroups {
            if !columns.contains(&subgroup.name) {
                columns.push(subgroup.name.clone());
            }
        }
        columns
    }

    /// The population counterpart of a rates crosstab: same fields,
    /// subgroups and disclosure, summing the population count.
    fn crosstab_population(
        &self,
        grouping: &[String],
        condition: Option<&Predicate>,
        request: &CrosstabRequest,
    ) -> Result<OutputTable> {
        let population = self
            .population
            .as_ref()
            .ok_or(EngineError::MissingPopulation)?;
        let settings = &self.config.population;
        let mut fields = grouping.to_vec();
        fields.extend(request.column.iter().cloned());
        let selected = select_population(
            population,
            settings,
            &fields,
            condition,
            self.rate_scope.as_ref(),
        )?;
        selected.require_all([settings.count_field.as_str()])?;

        let (table, _) = self.crosstab_counts(
            &selected,
            grouping,
            Reducer::Sum(&settings.count_field),
            request,
        )?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srh_model::{EngineConfig, Key, Value};

    fn records() -> Dataset {
        Dataset::from_rows(
            &["PatientID", "Group"],
            vec![
                vec!["p1".into(), "A".into()],
                vec!["p2".into(), "A".into()],
                vec!["p3".into(), "B".into()],
            ],
        )
        .expect("records")
    }

    #[test]
    fn single_row_field_counts_with_total() {
        let engine = Engine::new(EngineConfig::default()).expect("engine");
        let table = engine
            .crosstab(&records(), &CrosstabRequest::new(["Group"]))
            .expect("crosstab");
        assert_eq!(table.labels(), ["A", "B", "Grand_total"]);
        assert_eq!(
            table.column_cells("Grand_total"),
            Some(vec![Cell::Value(2.0), Cell::Value(1.0), Cell::Value(3.0)])
        );
    }

    #[test]
    fn missing_fields_fail_before_aggregation() {
        let engine = Engine::new(EngineConfig::default()).expect("engine");
        let err = engine
            .crosstab(&records(), &CrosstabRequest::new(["Region"]))
            .unwrap_err();
        assert!(err.to_string().contains("Region"));
    }

    #[test]
    fn rates_need_a_population() {
        let engine = Engine::new(EngineConfig::default()).expect("engine");
        let request = CrosstabRequest::new(["Group"]).with_output(OutputKind::Rates);
        let err = engine.crosstab(&records(), &request).unwrap_err();
        assert!(matches!(err, EngineError::MissingPopulation));
    }

    #[test]
    fn declared_columns_absent_from_data_are_zero() {
        let engine = Engine::new(EngineConfig::default()).expect("engine");
        let data = records()
            .with_column("Gender", vec![Value::Int(2), Value::Int(2), Value::Int(2)])
            .expect("data");
        let request = CrosstabRequest::new(["Group"])
            .with_column("Gender")
            .with_column_order([Key::Int(1), Key::Int(2)]);
        let table = engine.crosstab(&data, &request).expect("crosstab");
        assert_eq!(table.columns(), ["1", "2"]);
        assert_eq!(table.cell("A", "1"), Some(Cell::ZERO));
        assert_eq!(table.cell("A", "2"), Some(Cell::Value(2.0)));
    }
}
