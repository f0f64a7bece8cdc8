//! TOML format types for registry files.
//!
//! These types map directly to the `registry.toml` on-disk format. Keys that
//! name modifiers, flap types, or sections stay plain strings here; the
//! parser converts and validates them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::content::SectionContent;

/// Section key → override content.
pub type SectionOverridesToml = BTreeMap<String, SectionContent>;

/// Top-level structure of a registry file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryToml {
    /// Attending key used when a case names an unknown surgeon.
    pub default_attending: String,
    /// Base plan sections, in document order.
    #[serde(default)]
    pub sections: Vec<SectionToml>,
    /// Flap type key (e.g. `RFFF`) → default care text.
    #[serde(default)]
    pub flaps: BTreeMap<String, FlapConfigToml>,
    /// Generic overrides keyed by modifier key or lower-cased flap type.
    #[serde(default)]
    pub overrides: BTreeMap<String, SectionOverridesToml>,
    /// Attending key → profile.
    #[serde(default)]
    pub attendings: BTreeMap<String, AttendingToml>,
}

/// A `[[sections]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionToml {
    /// Stable section key (e.g. `gastrointestinal`).
    pub key: String,
    /// Display title.
    pub title: String,
    /// Ordered item key → instruction text.
    #[serde(default)]
    pub items: SectionContent,
}

/// A `[flaps.<type>]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlapConfigToml {
    pub extremity_care: String,
    /// Durable medical equipment.
    pub dme: String,
    #[serde(default = "default_wound_care")]
    pub wound_care: String,
}

/// An `[attendings.<key>]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttendingToml {
    /// Name as it appears on the schedule (e.g. `Dr. Eid`).
    pub display_name: String,
    pub aspirin_duration: String,
    pub doppler_management: String,
    /// Split-thickness skin graft donor site management.
    pub stsg_management: String,
    pub discharge_wound_care: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<String>,
    pub staple_removal: StapleRemovalToml,
    /// Flap type key → wound vac note for the day-of-surgery plan.
    #[serde(default)]
    pub wound_vac: BTreeMap<String, String>,
    /// Flap type key → per-flap care preferences.
    #[serde(default)]
    pub flap_preferences: BTreeMap<String, FlapPreferenceToml>,
    /// `base` or modifier key → section overrides.
    #[serde(default)]
    pub plan_overrides: BTreeMap<String, SectionOverridesToml>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StapleRemovalToml {
    pub neck_non_irradiated: String,
    pub neck_radiated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leg: Option<String>,
    pub other: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlapPreferenceToml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extremity_care: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wound_care: Option<String>,
}

pub(crate) fn default_wound_care() -> String {
    "Standard wound care".to_string()
}
