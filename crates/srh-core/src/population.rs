//! Population denominators for rates.

use srh_filter::{Predicate, filter_rows};
use srh_model::{Dataset, PopulationLevel, PopulationSettings};
use tracing::{debug, warn};

use crate::error::{EngineError, Result};

/// Level whose trigger field is among `fields`, if any.
pub fn population_level<'a>(
    settings: &'a PopulationSettings,
    fields: &[String],
) -> Option<&'a PopulationLevel> {
    settings
        .levels
        .iter()
        .find(|level| fields.contains(&level.trigger_field))
}

/// Population rows matching an output's organisation level and filters.
///
/// Fields are renamed to the output's names for the chosen level and every
/// requested field must then exist. Conjuncts of `condition` and `scope`
/// that read fields the population lacks are dropped; a dropped condition
/// clause is logged as a warning since numerator and denominator then differ.
pub fn select_population(
    population: &Dataset,
    settings: &PopulationSettings,
    fields: &[String],
    condition: Option<&Predicate>,
    scope: Option<&Predicate>,
) -> Result<Dataset> {
    let level = population_level(settings, fields);
    let org_type = level.map_or(settings.default_org_type.as_str(), |level| level.org_type.as_str());
    let population = match level {
        Some(level) if !level.renames.is_empty() => population.rename(&level.renames),
        _ => population.clone(),
    };

    for field in fields {
        if !population.has_field(field) {
            return Err(EngineError::PopulationField {
                field: field.clone(),
                available: population.fields().to_vec(),
            });
        }
    }

    let keep: Vec<bool> = population
        .require(&settings.org_type_field)?
        .iter()
        .map(|value| value.canonical_text().as_deref() == Some(org_type))
        .collect();
    let mut selected = population.filter(&keep);

    if let Some(condition) = condition {
        let applicable = applicable_part(condition, &selected);
        if applicable.as_ref() != Some(condition) {
            warn!(
                condition = %condition,
                applied = ?applicable.as_ref().map(ToString::to_string),
                "population lacks fields read by the condition; the denominator is filtered differently"
            );
        }
        if let Some(applicable) = applicable {
            selected = filter_rows(&applicable, &selected)?;
        }
    }
    if let Some(scope) = scope {
        match applicable_part(scope, &selected) {
            Some(applicable) => selected = filter_rows(&applicable, &selected)?,
            None => debug!(scope = %scope, "population has none of the scope fields"),
        }
    }
    debug!(org_type, rows = selected.height(), "selected population");
    Ok(selected)
}

/// Conjuncts of `predicate` whose fields all exist in `data`.
fn applicable_part(predicate: &Predicate, data: &Dataset) -> Option<Predicate> {
    predicate.restrict_to(&|field| data.has_field(field))
}
