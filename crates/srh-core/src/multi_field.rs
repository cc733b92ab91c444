//! Multi-field aggregation: several measure flags summed per breakdown.

use srh_model::{
    Cell, Dataset, GroupTotal, MeasureGroup, MultiFieldRequest, OutputKind, OutputTable,
    validate_choice,
};
use tracing::{debug, info};

use crate::aggregate::{Reducer, group_reduce};
use crate::engine::{Engine, apply_multiplier, parse_condition};
use crate::error::{EngineError, Result};
use crate::ordering::{RowArrangement, arrange_rows, sort_fields};
use crate::percent::{PercentOptions, counts_to_percents};
use crate::pivot::append_total_row;

/// Index field of a table transposed to list measures as rows.
pub const MEASURE_FIELD: &str = "Measure";

impl Engine {
    /// Sums each measure of a group per breakdown key.
    pub fn multi_field(&self, data: &Dataset, request: &MultiFieldRequest) -> Result<OutputTable> {
        validate_choice(
            "output_type",
            request.output.as_str(),
            &[OutputKind::Counts.as_str(), OutputKind::Percents.as_str()],
        )?;
        let group = self.measure_group(&request.measure_group)?;
        if request.breakdown.is_empty() {
            return Err(EngineError::invalid_request(
                "a multi-field output needs at least one breakdown field",
            ));
        }
        let total_label = self.total_label();
        let measure_order = match &request.measure_order {
            Some(order) => {
                let mut valid = vec![total_label.to_string()];
                valid.extend(group.measures.iter().cloned());
                for measure in order {
                    validate_choice("measure_order", measure, &valid)?;
                }
                order.clone()
            }
            None => {
                let mut order = vec![total_label.to_string()];
                order.extend(group.measures.iter().cloned());
                order
            }
        };
        let filter = self.named_filter(request.filter.as_deref())?;
        let condition = parse_condition(request.condition.as_deref())?;

        let (grouping, sort_only) = sort_fields(&request.breakdown, request.sort_on.as_deref());
        data.require_all(grouping.iter().map(String::as_str))?;
        data.require_all(group.measures.iter().map(String::as_str))?;
        if group.total == GroupTotal::CountIdentifier {
            data.require_all([self.config.identifier_field.as_str()])?;
        }

        let filtered = self.apply_filters(data, filter, condition.as_ref(), false)?;
        debug!(rows = filtered.height(), "records after filters");

        let table = self.measure_table(&filtered, &grouping, group)?;
        let mut columns = group.measures.clone();
        columns.push(total_label.to_string());
        let mut table = self.finish_counts(
            table,
            &request.breakdown_subgroups,
            &[],
            request.disclosure,
            &columns,
        )?;

        if request.output == OutputKind::Percents {
            let options = PercentOptions {
                across_columns: true,
                exempt: group.exempt_from_percent_cutoff,
                cutoff: f64::from(self.config.disclosure.percent_cutoff),
                decimals: request
                    .disclosure
                    .then_some(self.config.disclosure.percent_decimals),
            };
            table = counts_to_percents(&table, total_label, &options)?;
        } else {
            apply_multiplier(&mut table, request.multiplier);
        }

        let table = table.select_columns(&measure_order)?;
        let table = arrange_rows(
            table,
            &RowArrangement {
                row_order: request.breakdown_order.as_deref(),
                sort_on: request.sort_on.as_deref(),
                sort_only: &sort_only,
                include_total: request.include_breakdown_total,
                total_label,
                missing: match request.output {
                    OutputKind::Counts => Cell::ZERO,
                    _ => Cell::NotApplicable,
                },
            },
        )?;
        let table = if request.measures_as_rows {
            table.transpose(MEASURE_FIELD)
        } else {
            table
        };
        info!(
            measure_group = %request.measure_group,
            output = %request.output,
            rows = table.height(),
            columns = table.width(),
            "built multi-field table"
        );
        Ok(table)
    }

    fn measure_group(&self, name: &str) -> Result<&MeasureGroup> {
        let names = self.config.measure_group_names();
        validate_choice("measure_type", name, &names)?;
        self.config
            .measure_groups
            .get(name)
            .ok_or_else(|| EngineError::invalid_request(format!("unknown measure group {name}")))
    }

    /// One row per breakdown key: each measure's sum, then the group total,
    /// then the total row.
    fn measure_table(
        &self,
        data: &Dataset,
        grouping: &[String],
        group: &MeasureGroup,
    ) -> Result<OutputTable> {
        let mut reducers: Vec<Reducer<'_>> = group
            .measures
            .iter()
            .map(|measure| Reducer::Sum(measure))
            .collect();
        if group.total == GroupTotal::CountIdentifier {
            reducers.push(Reducer::Count(&self.config.identifier_field));
        }
        let groups = group_reduce(data, grouping, &reducers)?;

        let mut columns = group.measures.clone();
        columns.push(self.config.total_label.clone());
        let mut table = OutputTable::new(grouping.to_vec(), columns);
        let measures = group.measures.len();
        for (key, mut values) in groups {
            let total = match group.total {
                GroupTotal::SumMeasures => values.iter().sum(),
                GroupTotal::CountIdentifier => values.get(measures).copied().unwrap_or(0.0),
            };
            values.truncate(measures);
            let mut cells: Vec<Cell> = values.into_iter().map(Cell::Value).collect();
            cells.push(Cell::Value(total));
            table.push_row(key, cells)?;
        }
        append_total_row(&mut table, self.total_label())?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srh_model::{EngineConfig, Value};

    fn records() -> Dataset {
        Dataset::from_rows(
            &["PatientID", "Age_group", "ECOralFlag", "ECIUDFlag"],
            vec![
                vec!["p1".into(), "16-17".into(), 1.into(), 0.into()],
                vec!["p2".into(), "16-17".into(), 1.into(), 1.into()],
                vec!["p3".into(), "18-19".into(), Value::Null, 1.into()],
            ],
        )
        .expect("records")
    }

    #[test]
    fn sum_measures_total_adds_across_measures() {
        let engine = Engine::new(EngineConfig::default()).expect("engine");
        let table = engine
            .multi_field(&records(), &MultiFieldRequest::new("EC", ["Age_group"]))
            .expect("multi field");
        assert_eq!(table.columns(), ["Grand_total", "ECOralFlag", "ECIUDFlag"]);
        assert_eq!(table.labels(), ["16-17", "18-19", "Grand_total"]);
        assert_eq!(table.cell("16-17", "Grand_total"), Some(Cell::Value(3.0)));
        assert_eq!(table.cell("18-19", "ECOralFlag"), Some(Cell::ZERO));
        assert_eq!(table.cell("Grand_total", "Grand_total"), Some(Cell::Value(4.0)));
    }

    #[test]
    fn rates_are_not_a_multi_field_output() {
        let engine = Engine::new(EngineConfig::default()).expect("engine");
        let request = MultiFieldRequest::new("EC", ["Age_group"]).with_output(OutputKind::Rates);
        let err = engine.multi_field(&records(), &request).unwrap_err();
        assert!(err.to_string().contains("output_type"));
    }

    #[test]
    fn unknown_measure_group_lists_valid_groups() {
        let engine = Engine::new(EngineConfig::default()).expect("engine");
        let err = engine
            .multi_field(&records(), &MultiFieldRequest::new("Visits", ["Age_group"]))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("measure_type"));
        assert!(message.contains("Contacts"));
    }

    #[test]
    fn measures_as_rows_transposes() {
        let engine = Engine::new(EngineConfig::default()).expect("engine");
        let request = MultiFieldRequest::new("EC", ["Age_group"])
            .with_measures_as_rows(true)
            .with_breakdown_total(false);
        let table = engine.multi_field(&records(), &request).expect("multi field");
        assert_eq!(table.index_fields(), [MEASURE_FIELD]);
        assert_eq!(table.columns(), ["16-17", "18-19"]);
        assert_eq!(table.cell("ECIUDFlag", "18-19"), Some(Cell::Value(1.0)));
    }
}
