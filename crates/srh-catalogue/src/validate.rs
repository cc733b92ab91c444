//! Load-time checks of catalogue entries against the engine configuration.

use std::collections::BTreeSet;

use srh_filter::parse;
use srh_model::{CrosstabRequest, EngineConfig, MultiFieldRequest, OutputKind};
use tracing::debug;

use crate::catalogue::{Catalogue, ContentRequest, OutputEntry, PostStep};
use crate::error::{CatalogueError, Result};

impl Catalogue {
    /// Checks every entry; the first failing rule is returned.
    pub fn validate(&self, config: &EngineConfig) -> Result<()> {
        let mut seen = BTreeSet::new();
        for entry in &self.outputs {
            if !seen.insert(entry.name.as_str()) {
                return Err(CatalogueError::DuplicateOutput {
                    name: entry.name.clone(),
                });
            }
            validate_entry(entry, config)?;
        }
        debug!(outputs = self.outputs.len(), "catalogue validated");
        Ok(())
    }
}

pub fn validate_entry(entry: &OutputEntry, config: &EngineConfig) -> Result<()> {
    let name = entry.name.as_str();
    if entry.contents.is_empty() {
        return Err(CatalogueError::invalid(name, "no content groups"));
    }
    for (idx, group) in entry.contents.iter().enumerate() {
        if group.requests.is_empty() {
            return Err(CatalogueError::invalid(
                name,
                format!("content group {} has no requests", idx + 1),
            ));
        }
    }
    for request in entry.requests() {
        match request {
            ContentRequest::Crosstab(request) => validate_crosstab(name, request, config)?,
            ContentRequest::MultiField(request) => validate_multi_field(name, request, config)?,
        }
    }
    if let Some(series) = entry.time_series {
        if series.length == 0 {
            return Err(CatalogueError::invalid(name, "time series length must be positive"));
        }
        if entry.contents.len() != 1 {
            return Err(CatalogueError::invalid(
                name,
                "time series outputs take a single content group",
            ));
        }
    }
    for step in &entry.post {
        validate_step(name, step)?;
    }
    Ok(())
}

fn validate_filter(entry: &str, filter: Option<&str>, config: &EngineConfig) -> Result<()> {
    match filter {
        Some(filter) if !config.filters.contains_key(filter) => Err(CatalogueError::invalid(
            entry,
            format!(
                "an invalid value has been entered in the filter_type input: {filter}. Only {:?} are valid values",
                config.filter_names()
            ),
        )),
        _ => Ok(()),
    }
}

fn validate_condition(entry: &str, condition: Option<&str>) -> Result<()> {
    if let Some(condition) = condition {
        parse(condition).map_err(|source| CatalogueError::Condition {
            entry: entry.to_string(),
            source,
        })?;
    }
    Ok(())
}

fn validate_crosstab(entry: &str, request: &CrosstabRequest, config: &EngineConfig) -> Result<()> {
    validate_filter(entry, request.filter.as_deref(), config)?;
    validate_condition(entry, request.condition.as_deref())?;
    if request.rows.is_empty() {
        return Err(CatalogueError::invalid(entry, "a crosstab needs at least one row field"));
    }
    if request.column.is_none() && !request.column_subgroups.is_empty() {
        return Err(CatalogueError::invalid(
            entry,
            "column subgroups need a column field",
        ));
    }
    if request.multiplier.is_some_and(|m| m <= 0.0) {
        return Err(CatalogueError::invalid(entry, "multiplier must be positive"));
    }
    Ok(())
}

fn validate_multi_field(
    entry: &str,
    request: &MultiFieldRequest,
    config: &EngineConfig,
) -> Result<()> {
    validate_filter(entry, request.filter.as_deref(), config)?;
    validate_condition(entry, request.condition.as_deref())?;
    if request.output == OutputKind::Rates {
        return Err(CatalogueError::invalid(
            entry,
            "rates are only available for crosstab requests",
        ));
    }
    let Some(group) = config.measure_groups.get(&request.measure_group) else {
        return Err(CatalogueError::invalid(
            entry,
            format!(
                "an invalid value has been entered in the measure_type input: {}. Only {:?} are valid values",
                request.measure_group,
                config.measure_group_names()
            ),
        ));
    };
    if request.breakdown.is_empty() {
        return Err(CatalogueError::invalid(
            entry,
            "a multi-field request needs at least one breakdown field",
        ));
    }
    for measure in request.measure_order.iter().flatten() {
        if measure != &config.total_label && !group.measures.contains(measure) {
            return Err(CatalogueError::invalid(
                entry,
                format!(
                    "measure {measure} is not part of measure group {}",
                    request.measure_group
                ),
            ));
        }
    }
    Ok(())
}

fn validate_step(entry: &str, step: &PostStep) -> Result<()> {
    let empty = match step {
        PostStep::DropRowsWithSentinel { column } => column.is_empty(),
        PostStep::InsertLabelColumn { name, .. } => name.is_empty(),
        PostStep::MoveColumnsToEnd { columns } | PostStep::DropColumns { columns } => {
            columns.is_empty()
        }
        PostStep::DropRows { field, values } => field.is_empty() || values.is_empty(),
        PostStep::RatioColumn {
            name,
            numerator,
            denominator,
            scale,
        } => {
            if *scale == 0.0 {
                return Err(CatalogueError::invalid(
                    entry,
                    "ratio_column scale must be non-zero",
                ));
            }
            name.is_empty() || numerator.is_empty() || denominator.is_empty()
        }
    };
    if empty {
        return Err(CatalogueError::invalid(
            entry,
            format!("post step {} is missing its arguments", step.name()),
        ));
    }
    Ok(())
}
