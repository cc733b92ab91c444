//! Engine configuration: thresholds, symbols and the registries shared by
//! every output.
//!
//! Loaded once per run and read-only thereafter. Every section has a default
//! matching the publication parameters, so a configuration file only needs
//! to list what it overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cell::Symbols;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Label of the synthesised total row and column.
    pub total_label: String,
    /// Field counted by default, one entry per contact.
    pub identifier_field: String,
    pub symbols: Symbols,
    pub disclosure: DisclosureSettings,
    pub measure_groups: BTreeMap<String, MeasureGroup>,
    pub filters: BTreeMap<String, FilterDefinition>,
    /// Implicit filter applied to every rates output.
    pub rate_scope: Option<String>,
    pub population: PopulationSettings,
    pub org_reference: OrgReferenceSettings,
    pub org_classification: Vec<OrgPrefixRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            total_label: "Grand_total".to_string(),
            identifier_field: "PatientID".to_string(),
            symbols: Symbols::default(),
            disclosure: DisclosureSettings::default(),
            measure_groups: default_measure_groups(),
            filters: default_filters(),
            rate_scope: Some(
                "(Outside_england == 'N') & (Age_group_alt not in ['<13', '55+', 'unrecorded'])"
                    .to_string(),
            ),
            population: PopulationSettings::default(),
            org_reference: OrgReferenceSettings::default(),
            org_classification: default_org_classification(),
        }
    }
}

impl EngineConfig {
    pub fn measure_group_names(&self) -> Vec<String> {
        self.measure_groups.keys().cloned().collect()
    }

    pub fn filter_names(&self) -> Vec<String> {
        self.filters.keys().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisclosureSettings {
    /// Smallest count that is suppressed.
    pub lower: u32,
    /// Largest count that is suppressed; larger counts are rounded.
    pub upper: u32,
    /// Rounding base for counts above `upper`.
    pub base: u32,
    /// Percentages with a smaller denominator are not shown.
    pub percent_cutoff: u32,
    pub percent_decimals: u32,
    pub rate_decimals: u32,
}

impl Default for DisclosureSettings {
    fn default() -> Self {
        Self {
            lower: 1,
            upper: 7,
            base: 5,
            percent_cutoff: 400,
            percent_decimals: 0,
            rate_decimals: 0,
        }
    }
}

/// How the total column of a measure group is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupTotal {
    /// Row-wise sum of the measures; one record may count towards several.
    SumMeasures,
    /// Count of the identifier field; each record counted once.
    CountIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeasureGroup {
    pub measures: Vec<String>,
    pub total: GroupTotal,
    #[serde(default)]
    pub exempt_from_percent_cutoff: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterDefinition {
    pub expression: String,
    #[serde(default)]
    pub dedupe: Option<DedupeRule>,
}

/// Keeps one record per `unique_on` combination: the first when ordered
/// ascending by `sort_by`, nulls last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DedupeRule {
    pub sort_by: Vec<String>,
    pub unique_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PopulationSettings {
    pub count_field: String,
    pub org_type_field: String,
    pub default_org_type: String,
    /// Checked in order; the first level whose trigger field is requested wins.
    pub levels: Vec<PopulationLevel>,
}

impl Default for PopulationSettings {
    fn default() -> Self {
        let renames = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                .collect::<BTreeMap<_, _>>()
        };
        Self {
            count_field: "Count".to_string(),
            org_type_field: "Org_type".to_string(),
            default_org_type: "National".to_string(),
            levels: vec![
                PopulationLevel {
                    org_type: "LA".to_string(),
                    trigger_field: "LA_code".to_string(),
                    renames: renames(&[
                        ("Org_code", "LA_code"),
                        ("Org_name", "LA_name"),
                        ("Parent_code", "LA_parent_code"),
                        ("Parent_name", "LA_parent_name"),
                    ]),
                },
                PopulationLevel {
                    org_type: "LA_parent".to_string(),
                    trigger_field: "LA_parent_code".to_string(),
                    renames: renames(&[
                        ("Org_code", "LA_parent_code"),
                        ("Org_name", "LA_parent_name"),
                    ]),
                },
                PopulationLevel {
                    org_type: "LSOA".to_string(),
                    trigger_field: "IMD_decile".to_string(),
                    renames: BTreeMap::new(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulationLevel {
    pub org_type: String,
    pub trigger_field: String,
    #[serde(default)]
    pub renames: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrgReferenceSettings {
    pub code_field: String,
    pub name_field: String,
    pub parent_code_field: String,
    pub parent_name_field: String,
    pub org_type_field: String,
    pub org_level_field: String,
    pub entity_code_field: String,
    /// Org level value marking sub-national organisations.
    pub local_level: String,
    /// Organisations reported as part of a larger neighbour.
    pub merged_codes: Vec<String>,
    /// Output fields that trigger a reference join, keyed by field name.
    pub local_fields: BTreeMap<String, LocalOrgField>,
}

impl Default for OrgReferenceSettings {
    fn default() -> Self {
        let local = |exclude: &str, exclude_merged: bool| LocalOrgField {
            org_type: "LA".to_string(),
            exclude_entity_codes: vec![exclude.to_string()],
            exclude_merged,
            name_field: None,
            parent_code_field: None,
            parent_name_field: None,
        };
        Self {
            code_field: "Org_code".to_string(),
            name_field: "Org_name".to_string(),
            parent_code_field: "Parent_code".to_string(),
            parent_name_field: "Parent_name".to_string(),
            org_type_field: "Org_type".to_string(),
            org_level_field: "Org_level".to_string(),
            entity_code_field: "Entity_code".to_string(),
            local_level: "Local".to_string(),
            merged_codes: vec![
                "E09000001".to_string(),
                "E06000053".to_string(),
                "E06000017".to_string(),
            ],
            local_fields: BTreeMap::from([
                ("LA_code".to_string(), local("E07", true)),
                ("Clinic_LA_code_upper".to_string(), local("E07", false)),
                ("Clinic_LA_code_lower".to_string(), local("E10", false)),
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalOrgField {
    pub org_type: String,
    #[serde(default)]
    pub exclude_entity_codes: Vec<String>,
    #[serde(default)]
    pub exclude_merged: bool,
    #[serde(default)]
    pub name_field: Option<String>,
    #[serde(default)]
    pub parent_code_field: Option<String>,
    #[serde(default)]
    pub parent_name_field: Option<String>,
}

impl LocalOrgField {
    /// Output name of the organisation name for a join on `join_field`
    /// (`LA_code` → `LA_name`).
    pub fn name_field_for(&self, join_field: &str) -> String {
        self.name_field
            .clone()
            .unwrap_or_else(|| join_field.replace("code", "name"))
    }

    pub fn parent_code_field(&self) -> String {
        self.parent_code_field
            .clone()
            .unwrap_or_else(|| format!("{}_parent_code", self.org_type))
    }

    pub fn parent_name_field(&self) -> String {
        self.parent_name_field
            .clone()
            .unwrap_or_else(|| format!("{}_parent_name", self.org_type))
    }
}

/// Organisation code prefix classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrgPrefixRule {
    pub prefix: String,
    pub org_type: String,
    pub org_level: String,
}

fn default_measure_groups() -> BTreeMap<String, MeasureGroup> {
    let group = |measures: &[&str], total, exempt| MeasureGroup {
        measures: measures.iter().map(|m| (*m).to_string()).collect(),
        total,
        exempt_from_percent_cutoff: exempt,
    };
    BTreeMap::from([
        (
            "Contacts".to_string(),
            group(
                &[
                    "MainMethodNewFlag",
                    "MainMethodChangeFlag",
                    "MainMethodMaintFlag",
                    "MainMethodAdviceFlag",
                    "EmergencyContraceptionFlag",
                    "SRHCareActivityFLag",
                ],
                GroupTotal::CountIdentifier,
                false,
            ),
        ),
        (
            "Activity".to_string(),
            group(
                &[
                    "ContraceptiveCareFlag",
                    "Number_EC_items",
                    "STI_care",
                    "SRH_advice",
                    "Pregnancy",
                    "Ultrasound",
                    "Abortion",
                    "Cervical_screening",
                    "Psychosexual",
                    "Implant_removal",
                    "IUS_removal",
                    "IUD_removal",
                    "PMS_menopause",
                    "Alcohol",
                    "Other",
                ],
                GroupTotal::SumMeasures,
                false,
            ),
        ),
        (
            "EC".to_string(),
            group(&["ECOralFlag", "ECIUDFlag"], GroupTotal::SumMeasures, false),
        ),
        (
            "DQ".to_string(),
            group(
                &[
                    "Duplicate",
                    "Unknown_LSOA_code",
                    "Unknown_LA_code",
                    "Unknown_GP_code",
                    "Unknown_Ethnicity",
                    "Extreme_age",
                ],
                GroupTotal::CountIdentifier,
                true,
            ),
        ),
    ])
}

fn default_filters() -> BTreeMap<String, FilterDefinition> {
    let plain = |expression: &str| FilterDefinition {
        expression: expression.to_string(),
        dedupe: None,
    };
    let emergency = FilterDefinition {
        expression: "(EmergencyContraceptionFlag == 1) & (Gender == '2')".to_string(),
        dedupe: Some(DedupeRule {
            sort_by: vec![
                "LA_parent_code".to_string(),
                "Age".to_string(),
                "RowNum".to_string(),
            ],
            unique_on: vec!["Org_code_unedited".to_string(), "PatientID".to_string()],
        }),
    };
    BTreeMap::from([
        (
            "persons_first_contact".to_string(),
            plain("FirstContact == 'Y'"),
        ),
        (
            "persons_main_contact".to_string(),
            plain("MainContact == 'Y'"),
        ),
        (
            "persons_main_method".to_string(),
            plain("(ContraceptiveMainMethod != 99) & (MainContact == 'Y')"),
        ),
        (
            "contacts_main_method".to_string(),
            plain("ContraceptiveMainMethod != 99"),
        ),
        (
            "contacts_contraception".to_string(),
            plain("ContraceptiveMethodStatus.notnull() | ContraceptiveMethodPostCoital1.notnull()"),
        ),
        (
            "persons_contraception".to_string(),
            plain(
                "(MainContact == 'Y') & (ContraceptiveMethodStatus.notnull() | ContraceptiveMethodPostCoital1.notnull())",
            ),
        ),
        ("females_emergency_contraception".to_string(), emergency),
        (
            "vasectomies".to_string(),
            plain(
                "(SRHCareActivity1 == 15 | SRHCareActivity2 == 15 | SRHCareActivity3 == 15 | SRHCareActivity4 == 15 | SRHCareActivity5 == 15 | SRHCareActivity6 == 15) & (Gender == '1')",
            ),
        ),
    ])
}

fn default_org_classification() -> Vec<OrgPrefixRule> {
    let rule = |prefix: &str, org_type: &str, org_level: &str| OrgPrefixRule {
        prefix: prefix.to_string(),
        org_type: org_type.to_string(),
        org_level: org_level.to_string(),
    };
    vec![
        rule("E01", "LSOA", "LSOA"),
        rule("E06", "LA", "Local"),
        rule("E07", "LA", "Local"),
        rule("E08", "LA", "Local"),
        rule("E09", "LA", "Local"),
        rule("E10", "LA", "Local"),
        rule("E12", "LA_parent", "Regional"),
        rule("E38", "CCG", "Local"),
        rule("E54", "ICB", "Local"),
        rule("E40", "ICB_parent", "Regional"),
        rule("E92", "National", "National"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_publication_thresholds() {
        let config = EngineConfig::default();
        assert_eq!(config.disclosure.upper, 7);
        assert_eq!(config.disclosure.percent_cutoff, 400);
        assert!(config.measure_groups["DQ"].exempt_from_percent_cutoff);
        assert_eq!(config.measure_groups["EC"].total, GroupTotal::SumMeasures);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            total_label = "All"

            [disclosure]
            percent_cutoff = 100

            [symbols]
            not_shown = ".."
            "#,
        )
        .expect("parse config");
        assert_eq!(config.total_label, "All");
        assert_eq!(config.disclosure.percent_cutoff, 100);
        assert_eq!(config.disclosure.base, 5);
        assert_eq!(config.symbols.not_shown, "..");
        assert_eq!(config.symbols.suppressed, "*");
        assert!(config.filters.contains_key("persons_main_contact"));
    }

    #[test]
    fn local_field_names_follow_join_field() {
        let settings = OrgReferenceSettings::default();
        let clinic = &settings.local_fields["Clinic_LA_code_upper"];
        assert_eq!(clinic.name_field_for("Clinic_LA_code_upper"), "Clinic_LA_name_upper");
        assert_eq!(clinic.parent_code_field(), "LA_parent_code");
    }
}
