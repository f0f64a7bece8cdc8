//! On-disk format for case files (TOML or JSON).
//!
//! Every free-text field is optional. Field-level validation belongs to
//! whatever produced the file; missing values surface in the generated notes
//! as `***`.

use serde::{Deserialize, Serialize};

use crate::models::ModifierFlags;

/// Top-level structure of a case file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CaseToml {
    #[serde(default)]
    pub patient: PatientToml,
    pub surgeons: SurgeonsToml,
    #[serde(default)]
    pub modifiers: ModifierFlags,
    #[serde(default)]
    pub intraop: IntraopToml,
    #[serde(default)]
    pub discharge: DischargeToml,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PatientToml {
    pub name: Option<String>,
    pub mrn: Option<String>,
    /// `YYYY-MM-DD`, or free text such as `"tomorrow AM"`.
    pub date: Option<String>,
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub planned_procedures: Procedures,
}

/// Planned procedures, given either as one line or as a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Procedures {
    One(String),
    Many(Vec<String>),
}

impl Default for Procedures {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl Procedures {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(line) if line.trim().is_empty() => Vec::new(),
            Self::One(line) => vec![line],
            Self::Many(list) => list,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SurgeonsToml {
    /// Flap type key, matched case-insensitively (e.g. `RFFF`, `fibula`).
    pub flap: String,
    pub ablative: Option<String>,
    /// Display name; the attending profile is picked from it.
    pub reconstructive: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IntraopToml {
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

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DischargeToml {
    pub ablative_follow_up: Option<String>,
    pub reconstructive_follow_up: Option<String>,
    pub home_care: Option<String>,
    pub dressing_changes: Option<String>,
    pub physical_therapy: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub medication_instructions: Option<String>,
}
