//! Joining aggregated rows to the organisation reference table.
//!
//! Local-level outputs list every valid organisation of the requested type,
//! including those with no activity, and take their names and parents from
//! the reference rather than from the records.

use std::collections::{BTreeSet, HashMap};

use srh_model::{
    Cell, Dataset, Key, LocalOrgField, OrgReferenceSettings, OutputTable, Value, validate_choice,
};
use tracing::debug;

use crate::error::Result;

/// Valid organisations for a join on `join_field`, with reference columns
/// renamed to the output's field names.
pub fn select_org_reference(
    reference: &Dataset,
    settings: &OrgReferenceSettings,
    join_field: &str,
    local: &LocalOrgField,
) -> Result<Dataset> {
    let types = reference.require(&settings.org_type_field)?;
    let levels = reference.require(&settings.org_level_field)?;
    let valid: BTreeSet<String> = types
        .iter()
        .zip(levels)
        .filter(|(_, level)| level.canonical_text().as_deref() == Some(settings.local_level.as_str()))
        .filter_map(|(org_type, _)| org_type.canonical_text())
        .collect();
    let valid: Vec<String> = valid.into_iter().collect();
    validate_choice("org_type", &local.org_type, &valid)?;

    let codes = reference.require(&settings.code_field)?;
    let entities = if local.exclude_entity_codes.is_empty() {
        None
    } else {
        Some(reference.require(&settings.entity_code_field)?)
    };
    let keep: Vec<bool> = (0..reference.height())
        .map(|row| {
            let code = codes[row].canonical_text();
            let of_type =
                types[row].canonical_text().as_deref() == Some(local.org_type.as_str());
            let excluded_entity = entities.is_some_and(|entities| {
                entities[row]
                    .canonical_text()
                    .is_some_and(|entity| local.exclude_entity_codes.contains(&entity))
            });
            let merged = local.exclude_merged
                && code
                    .as_ref()
                    .is_some_and(|code| settings.merged_codes.contains(code));
            of_type && code.is_some() && !excluded_entity && !merged
        })
        .collect();

    let renames = [
        (settings.code_field.clone(), join_field.to_string()),
        (settings.name_field.clone(), local.name_field_for(join_field)),
        (settings.parent_code_field.clone(), local.parent_code_field()),
        (settings.parent_name_field.clone(), local.parent_name_field()),
    ];
    let selected = reference.filter(&keep);
    let columns = renames
        .iter()
        .filter_map(|(from, to)| {
            selected
                .column(from)
                .map(|values| (to.clone(), values.to_vec()))
        })
        .collect::<Vec<_>>();
    Ok(Dataset::from_columns(columns)?)
}

/// Left join from `organisations` onto `table` on `join_field`.
///
/// Index fields the reference provides are taken from it. Table rows with
/// no organisation (the total row among them) are dropped; organisations
/// with no table row become zero rows.
pub(crate) fn join_org_reference(
    table: &OutputTable,
    organisations: &Dataset,
    join_field: &str,
    total_label: &str,
) -> Result<OutputTable> {
    let fields = table.index_fields();
    let join_idx = fields.iter().position(|field| field == join_field);
    let reference_columns: Vec<Option<&[Value]>> =
        fields.iter().map(|field| organisations.column(field)).collect();
    let codes = organisations.require(join_field)?;

    let mut by_code: HashMap<&Key, Vec<usize>> = HashMap::new();
    if let Some(join_idx) = join_idx {
        for (idx, row) in table.rows().iter().enumerate() {
            if !row.is_total(total_label) {
                by_code.entry(&row.labels[join_idx]).or_default().push(idx);
            }
        }
    }

    let mut joined = OutputTable::new(fields.to_vec(), table.columns().to_vec());
    let mut unmatched = 0usize;
    for (org, code) in codes.iter().enumerate() {
        let Some(code) = code.to_key() else { continue };
        let reference_label = |idx: usize| {
            reference_columns[idx].and_then(|column| column[org].to_key())
        };
        match by_code.get(&code) {
            Some(matches) => {
                for &idx in matches {
                    let row = &table.rows()[idx];
                    let labels = (0..fields.len())
                        .map(|i| reference_label(i).unwrap_or_else(|| row.labels[i].clone()))
                        .collect();
                    joined.push_row(labels, row.cells.clone())?;
                }
            }
            None => {
                unmatched += 1;
                let labels = (0..fields.len())
                    .map(|i| reference_label(i).unwrap_or_else(Key::blank))
                    .collect();
                joined.push_row(labels, vec![Cell::ZERO; table.width()])?;
            }
        }
    }
    debug!(
        field = join_field,
        organisations = codes.len(),
        without_activity = unmatched,
        "joined organisation reference"
    );
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> Dataset {
        Dataset::from_rows(
            &[
                "Org_code",
                "Org_name",
                "Parent_code",
                "Parent_name",
                "Entity_code",
                "Org_type",
                "Org_level",
            ],
            vec![
                vec![
                    "E06000001".into(),
                    "LA1".into(),
                    "E12000001".into(),
                    "REG1".into(),
                    "E06".into(),
                    "LA".into(),
                    "Local".into(),
                ],
                vec![
                    "E10000001".into(),
                    "LA2".into(),
                    "E12000002".into(),
                    "REG2".into(),
                    "E10".into(),
                    "LA".into(),
                    "Local".into(),
                ],
                vec![
                    "E07000001".into(),
                    "LA3".into(),
                    "E12000002".into(),
                    "REG2".into(),
                    "E07".into(),
                    "LA".into(),
                    "Local".into(),
                ],
                vec![
                    "E12000001".into(),
                    "REG1".into(),
                    "E92000001".into(),
                    "England".into(),
                    "E12".into(),
                    "LA_parent".into(),
                    "Regional".into(),
                ],
            ],
        )
        .expect("reference")
    }

    #[test]
    fn selects_upper_tier_local_authorities() {
        let settings = OrgReferenceSettings::default();
        let local = &settings.local_fields["LA_code"];
        let selected = select_org_reference(&reference(), &settings, "LA_code", local)
            .expect("select");
        assert_eq!(
            selected.fields(),
            ["LA_code", "LA_name", "LA_parent_code", "LA_parent_name"]
        );
        assert_eq!(
            selected.require("LA_code").expect("codes"),
            [Value::from("E06000001"), Value::from("E10000001")]
        );
        assert_eq!(
            selected.require("LA_parent_name").expect("parents"),
            [Value::from("REG1"), Value::from("REG2")]
        );
    }

    #[test]
    fn clinic_lower_tier_drops_counties() {
        let settings = OrgReferenceSettings::default();
        let local = &settings.local_fields["Clinic_LA_code_lower"];
        let selected =
            select_org_reference(&reference(), &settings, "Clinic_LA_code_lower", local)
                .expect("select");
        assert!(selected.has_field("Clinic_LA_name_lower"));
        assert_eq!(
            selected.require("Clinic_LA_code_lower").expect("codes"),
            [Value::from("E06000001"), Value::from("E07000001")]
        );
    }

    #[test]
    fn invalid_org_type_lists_valid_types() {
        let settings = OrgReferenceSettings::default();
        let mut local = settings.local_fields["LA_code"].clone();
        local.org_type = "CCG".to_string();
        let err = select_org_reference(&reference(), &settings, "LA_code", &local).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("CCG"));
        assert!(message.contains("LA"));
    }

    #[test]
    fn join_replaces_names_and_adds_missing_organisations() {
        let settings = OrgReferenceSettings::default();
        let organisations = select_org_reference(
            &reference(),
            &settings,
            "LA_code",
            &settings.local_fields["LA_code"],
        )
        .expect("select");

        let mut table = OutputTable::new(
            vec!["LA_code".to_string(), "LA_name".to_string()],
            vec!["Grand_total".to_string()],
        );
        table
            .push_row(
                vec![Key::parse("E06000001"), Key::parse("old name")],
                vec![Cell::Value(12.0)],
            )
            .expect("row");
        table
            .push_row(
                vec![Key::parse("E07000001"), Key::parse("LA3")],
                vec![Cell::Value(3.0)],
            )
            .expect("row");
        table
            .push_row(
                vec![Key::parse("Grand_total"), Key::blank()],
                vec![Cell::Value(15.0)],
            )
            .expect("total");

        let joined =
            join_org_reference(&table, &organisations, "LA_code", "Grand_total").expect("join");
        assert_eq!(joined.labels(), ["E06000001", "E10000001"]);
        assert_eq!(joined.rows()[0].labels[1], Key::parse("LA1"));
        assert_eq!(joined.cell("E06000001", "Grand_total"), Some(Cell::Value(12.0)));
        assert_eq!(joined.cell("E10000001", "Grand_total"), Some(Cell::ZERO));
    }
}
