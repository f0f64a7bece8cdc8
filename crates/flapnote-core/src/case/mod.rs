//! Per-case input: who operates, which flap, which modifiers, and the free
//! text the notes carry through.

pub mod toml_format;

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::models::{FlapType, FlapTypeParseError, Modifier, ModifierSet};
use crate::registry::ConfigRegistry;

pub use toml_format::CaseToml;

/// Errors that can occur while reading a case file.
#[derive(Debug, Error)]
pub enum CaseParseError {
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidFlap(#[from] FlapTypeParseError),
}

/// Parse and validate a TOML case file.
pub fn parse_case_toml(content: &str) -> Result<CaseToml, CaseParseError> {
    let case: CaseToml = toml::from_str(content)?;
    case.flap()?;
    Ok(case)
}

/// Parse and validate a JSON case file.
pub fn parse_case_json(content: &str) -> Result<CaseToml, CaseParseError> {
    let case: CaseToml = serde_json::from_str(content)?;
    case.flap()?;
    Ok(case)
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything the resolver and assembler need to know about one case.
///
/// Built per request and never mutated during resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseContext {
    /// Attending profile key (e.g. `Eid`). Unknown keys resolve against the
    /// registry's default profile.
    pub attending: String,
    pub flap: FlapType,
    pub modifiers: ModifierSet,
    pub facts: CaseFacts,
}

impl CaseContext {
    pub fn new(attending: impl Into<String>, flap: FlapType) -> Self {
        Self {
            attending: attending.into(),
            flap,
            modifiers: ModifierSet::new(),
            facts: CaseFacts::default(),
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }

    pub fn with_modifiers(mut self, modifiers: impl IntoIterator<Item = Modifier>) -> Self {
        for m in modifiers {
            self.modifiers.insert(m);
        }
        self
    }

    pub fn with_facts(mut self, facts: CaseFacts) -> Self {
        self.facts = facts;
        self
    }

    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(modifier)
    }
}

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

/// Scalar case facts used for headers and template substitution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaseFacts {
    pub patient: PatientInfo,
    pub surgeons: SurgeonInfo,
    pub intraop: IntraopPlan,
    pub discharge: DischargePlan,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatientInfo {
    pub name: Option<String>,
    pub mrn: Option<String>,
    pub date: Option<CaseDate>,
    pub diagnosis: Option<String>,
    pub planned_procedures: Vec<String>,
}

/// Surgery date: a calendar date when the input parses as one, otherwise the
/// text as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CaseDate {
    Date(NaiveDate),
    Text(String),
}

impl CaseDate {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            Ok(date) => Self::Date(date),
            Err(_) => Self::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for CaseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%m/%d/%Y")),
            Self::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SurgeonInfo {
    pub ablative: Option<String>,
    pub reconstructive: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntraopPlan {
    pub anticipated_airway: Option<String>,
    pub ett_position: Option<String>,
    pub protected_limbs: Option<String>,
    pub paralytic_ok: Option<String>,
    pub pressors_ok: Option<String>,
    pub preop_antibiotics: Option<String>,
    pub expected_blood_loss: Option<String>,
    pub patient_position: Option<String>,
    pub table_position: Option<String>,
    pub number_of_setups: Option<String>,
    pub saw: Option<String>,
    pub drill: Option<String>,
    pub hn_plating: Option<String>,
    pub extremity_plating: Option<String>,
    pub plating_company: Option<String>,
    pub stsg: Option<String>,
    pub anticipated_trach_size: Option<String>,
    pub wound_vac: Option<String>,
}

impl IntraopPlan {
    /// Whether a split-thickness skin graft is planned.
    pub fn plans_stsg(&self) -> bool {
        is_yes(self.stsg.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DischargePlan {
    pub ablative_follow_up: Option<String>,
    pub reconstructive_follow_up: Option<String>,
    pub home_care: Option<String>,
    pub dressing_changes: Option<String>,
    pub physical_therapy: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub medication_instructions: Option<String>,
}

impl DischargePlan {
    /// Supplied instructions as `(key, label, text)`, in form order.
    pub fn entries(&self) -> Vec<(&'static str, &'static str, &str)> {
        [
            ("ablativeFollowUp", "Ablative follow-up", &self.ablative_follow_up),
            ("reconstructiveFollowUp", "Reconstructive follow-up", &self.reconstructive_follow_up),
            ("homeCare", "Home care", &self.home_care),
            ("dressingChanges", "Dressing changes", &self.dressing_changes),
            ("physicalTherapy", "Physical therapy", &self.physical_therapy),
            ("dietaryRestrictions", "Dietary restrictions", &self.dietary_restrictions),
            ("medicationInstructions", "Medication instructions", &self.medication_instructions),
        ]
        .into_iter()
        .filter_map(|(key, label, value)| {
            let text = value.as_deref()?.trim();
            (!text.is_empty()).then_some((key, label, text))
        })
        .collect()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_yes(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("yes"))
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

impl CaseToml {
    /// The flap type named by the case.
    pub fn flap(&self) -> Result<FlapType, FlapTypeParseError> {
        self.surgeons.flap.trim().parse()
    }

    /// Build a context, mapping the reconstructive surgeon to an attending
    /// profile key of `registry`.
    pub fn into_context(self, registry: &ConfigRegistry) -> Result<CaseContext, CaseParseError> {
        let flap = self.flap()?;
        let reconstructive = non_blank(self.surgeons.reconstructive);
        let attending = match reconstructive.as_deref() {
            Some(name) => registry.attending_for_surgeon(name),
            None => {
                warn!(
                    attending = %registry.default_attending().key,
                    "no reconstructive surgeon, using default attending"
                );
                registry.default_attending().key.as_str()
            }
        }
        .to_string();

        let p = self.patient;
        let i = self.intraop;
        let d = self.discharge;
        let facts = CaseFacts {
            patient: PatientInfo {
                name: p.name,
                mrn: p.mrn,
                date: non_blank(p.date).as_deref().map(CaseDate::parse),
                diagnosis: p.diagnosis,
                planned_procedures: p.planned_procedures.into_vec(),
            },
            surgeons: SurgeonInfo {
                ablative: non_blank(self.surgeons.ablative),
                reconstructive,
            },
            intraop: IntraopPlan {
                anticipated_airway: i.anticipated_airway,
                ett_position: i.ett_position,
                protected_limbs: i.protected_limbs,
                paralytic_ok: i.paralytic_ok,
                pressors_ok: i.pressors_ok,
                preop_antibiotics: i.preop_antibiotics,
                expected_blood_loss: i.expected_blood_loss,
                patient_position: i.patient_position,
                table_position: i.table_position,
                number_of_setups: i.number_of_setups,
                saw: i.saw,
                drill: i.drill,
                hn_plating: i.hn_plating,
                extremity_plating: i.extremity_plating,
                plating_company: i.plating_company,
                stsg: i.stsg,
                anticipated_trach_size: i.anticipated_trach_size,
                wound_vac: i.wound_vac,
            },
            discharge: DischargePlan {
                ablative_follow_up: d.ablative_follow_up,
                reconstructive_follow_up: d.reconstructive_follow_up,
                home_care: d.home_care,
                dressing_changes: d.dressing_changes,
                physical_therapy: d.physical_therapy,
                dietary_restrictions: d.dietary_restrictions,
                medication_instructions: d.medication_instructions,
            },
        };

        Ok(CaseContext {
            attending,
            flap,
            modifiers: ModifierSet::from(self.modifiers),
            facts,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
