//! Registry TOML parser with validation.
//!
//! Parses a registry string into a [`ConfigRegistry`] and validates:
//! - Section keys are unique and every base section has items.
//! - Every override (generic, flap, attending) names a base plan section.
//! - Generic override keys are modifier keys or lower-cased flap types.
//! - Attending override keys are `base` or modifier keys.
//! - Every flap type has a default configuration.
//! - The default attending exists.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::models::{FlapType, Modifier};

use super::toml_format::{AttendingToml, RegistryToml, SectionOverridesToml};
use super::{
    AttendingProfile, ConfigRegistry, FlapConfig, FlapPreference, PlanOverrides, Section,
    StapleRemoval, digest_source,
};

/// Errors that can occur during registry parsing and validation.
#[derive(Debug, Error)]
pub enum RegistryParseError {
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("registry must contain at least one section")]
    NoSections,

    #[error("duplicate section key: {0:?}")]
    DuplicateSection(String),

    #[error("section {0:?} has no items")]
    EmptySection(String),

    #[error("{layer} overrides unknown section {section:?}")]
    UnknownOverrideSection { layer: String, section: String },

    #[error("override key {0:?} is neither a modifier nor a lower-cased flap type")]
    UnknownOverrideKey(String),

    #[error("attending {attending:?} has override key {key:?} (expected base or a modifier)")]
    UnknownAttendingOverrideKey { attending: String, key: String },

    #[error("unknown flap type {value:?} in {location}")]
    UnknownFlapType { location: String, value: String },

    #[error("no flap configuration for {0}")]
    MissingFlapConfig(FlapType),

    #[error("registry must contain at least one attending")]
    NoAttendings,

    #[error("default attending {0:?} has no profile")]
    UnknownDefaultAttending(String),
}

/// Parse and validate a registry TOML string.
pub fn parse_registry_toml(content: &str) -> Result<ConfigRegistry, RegistryParseError> {
    let raw: RegistryToml = toml::from_str(content)?;
    let mut registry = build(raw)?;
    registry.digest = digest_source(content);
    Ok(registry)
}

/// Validate a parsed registry file and convert it to typed keys.
fn build(raw: RegistryToml) -> Result<ConfigRegistry, RegistryParseError> {
    let sections = build_sections(&raw)?;
    let known: HashSet<&str> = sections.iter().map(|s| s.key.as_str()).collect();

    let mut modifier_overrides = BTreeMap::new();
    let mut flap_overrides = BTreeMap::new();
    for (key, overrides) in &raw.overrides {
        if let Ok(modifier) = key.parse::<Modifier>() {
            check_sections(&known, &format!("modifier {key:?}"), overrides)?;
            modifier_overrides.insert(modifier, overrides.clone());
        } else if let Some(flap) = FlapType::ALL.into_iter().find(|f| f.override_key() == *key) {
            check_sections(&known, &format!("flap {key:?}"), overrides)?;
            flap_overrides.insert(flap, overrides.clone());
        } else {
            return Err(RegistryParseError::UnknownOverrideKey(key.clone()));
        }
    }

    let mut flap_configs = BTreeMap::new();
    for (key, cfg) in &raw.flaps {
        let flap = parse_flap(key, "[flaps]")?;
        flap_configs.insert(
            flap,
            FlapConfig {
                extremity_care: cfg.extremity_care.clone(),
                dme: cfg.dme.clone(),
                wound_care: cfg.wound_care.clone(),
            },
        );
    }
    if let Some(missing) = FlapType::ALL
        .into_iter()
        .find(|f| !flap_configs.contains_key(f))
    {
        return Err(RegistryParseError::MissingFlapConfig(missing));
    }

    if raw.attendings.is_empty() {
        return Err(RegistryParseError::NoAttendings);
    }
    let mut attendings = BTreeMap::new();
    for (key, attending) in &raw.attendings {
        attendings.insert(key.clone(), build_attending(key, attending, &known)?);
    }
    if !attendings.contains_key(&raw.default_attending) {
        return Err(RegistryParseError::UnknownDefaultAttending(
            raw.default_attending.clone(),
        ));
    }

    Ok(ConfigRegistry {
        sections,
        attendings,
        default_attending: raw.default_attending,
        modifier_overrides,
        flap_overrides,
        flap_configs,
        digest: String::new(),
    })
}

fn build_sections(raw: &RegistryToml) -> Result<Vec<Section>, RegistryParseError> {
    if raw.sections.is_empty() {
        return Err(RegistryParseError::NoSections);
    }
    let mut seen = HashSet::new();
    let mut sections = Vec::with_capacity(raw.sections.len());
    for section in &raw.sections {
        if !seen.insert(section.key.as_str()) {
            return Err(RegistryParseError::DuplicateSection(section.key.clone()));
        }
        if section.items.is_empty() {
            return Err(RegistryParseError::EmptySection(section.key.clone()));
        }
        sections.push(Section {
            key: section.key.clone(),
            title: section.title.clone(),
            content: section.items.clone(),
        });
    }
    Ok(sections)
}

fn build_attending(
    key: &str,
    raw: &AttendingToml,
    known: &HashSet<&str>,
) -> Result<AttendingProfile, RegistryParseError> {
    let mut plan_overrides = PlanOverrides::default();
    for (layer, overrides) in &raw.plan_overrides {
        let label = format!("attending {key:?} layer {layer:?}");
        if layer == "base" {
            check_sections(known, &label, overrides)?;
            plan_overrides.base = overrides.clone();
        } else if let Ok(modifier) = layer.parse::<Modifier>() {
            check_sections(known, &label, overrides)?;
            plan_overrides.by_modifier.insert(modifier, overrides.clone());
        } else {
            return Err(RegistryParseError::UnknownAttendingOverrideKey {
                attending: key.to_string(),
                key: layer.clone(),
            });
        }
    }

    let mut wound_vac = BTreeMap::new();
    for (flap, note) in &raw.wound_vac {
        let location = format!("attending {key:?} wound_vac");
        wound_vac.insert(parse_flap(flap, &location)?, note.clone());
    }

    let mut flap_preferences = BTreeMap::new();
    for (flap, pref) in &raw.flap_preferences {
        let location = format!("attending {key:?} flap_preferences");
        flap_preferences.insert(
            parse_flap(flap, &location)?,
            FlapPreference {
                extremity_care: pref.extremity_care.clone(),
                wound_care: pref.wound_care.clone(),
            },
        );
    }

    Ok(AttendingProfile {
        key: key.to_string(),
        display_name: raw.display_name.clone(),
        aspirin_duration: raw.aspirin_duration.clone(),
        doppler_management: raw.doppler_management.clone(),
        stsg_management: raw.stsg_management.clone(),
        discharge_wound_care: raw.discharge_wound_care.clone(),
        restrictions: raw.restrictions.clone(),
        staple_removal: StapleRemoval {
            neck_non_irradiated: raw.staple_removal.neck_non_irradiated.clone(),
            neck_radiated: raw.staple_removal.neck_radiated.clone(),
            leg: raw.staple_removal.leg.clone(),
            other: raw.staple_removal.other.clone(),
        },
        wound_vac,
        flap_preferences,
        plan_overrides,
    })
}

fn check_sections(
    known: &HashSet<&str>,
    layer: &str,
    overrides: &SectionOverridesToml,
) -> Result<(), RegistryParseError> {
    match overrides.keys().find(|k| !known.contains(k.as_str())) {
        Some(section) => Err(RegistryParseError::UnknownOverrideSection {
            layer: layer.to_string(),
            section: section.clone(),
        }),
        None => Ok(()),
    }
}

fn parse_flap(value: &str, location: &str) -> Result<FlapType, RegistryParseError> {
    value
        .parse::<FlapType>()
        .map_err(|_| RegistryParseError::UnknownFlapType {
            location: location.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAPS: &str = r#"
[flaps.ALT]
extremity_care = "Standard care"
dme = "None required"
[flaps.Fibula]
extremity_care = "Leg boot"
dme = "Leg boot for comfort"
[flaps.RFFF]
extremity_care = "Arm splint"
dme = "Arm splint for comfort"
[flaps.Scapula]
extremity_care = "Shoulder immobilizer"
dme = "None required"
[flaps.Jejunal]
extremity_care = "Abdominal binder"
dme = "None required"
[flaps.LatissimusDorsi]
extremity_care = "Trunk binder"
dme = "None required"
[flaps.Other]
extremity_care = "Standard care"
dme = "None required"
"#;

    const ATTENDING: &str = r#"
[attendings.Smith]
display_name = "Dr. Smith"
aspirin_duration = "1 week"
doppler_management = "Pull doppler POD 5"
stsg_management = "Xeroform"
discharge_wound_care = "Bacitracin"
[attendings.Smith.staple_removal]
neck_non_irradiated = "POD 7"
neck_radiated = "POD 14"
other = "POD 10"
"#;

    fn registry_with(extra: &str) -> String {
        format!(
            r#"default_attending = "Smith"

[[sections]]
key = "respiratory"
title = "Respiratory"
[sections.items]
monitoring = "Monitor respiratory status"

[[sections]]
key = "gastrointestinal"
title = "Gastrointestinal"
[sections.items]
diet = "Regular diet"
{FLAPS}
{ATTENDING}
{extra}"#
        )
    }

    #[test]
    fn parse_valid_registry() {
        let registry = parse_registry_toml(&registry_with("")).expect("should parse");
        assert_eq!(registry.base_plan().len(), 2);
        assert_eq!(registry.default_attending().display_name, "Dr. Smith");
        assert_eq!(registry.digest().len(), 64);
    }

    #[test]
    fn splits_generic_overrides_into_modifier_and_flap_layers() {
        let extra = r#"
[overrides.gTube.gastrointestinal]
diet = "G-tube feeds"

[overrides.jejunal.gastrointestinal]
diet = "Per Gen Surg"
"#;
        let registry = parse_registry_toml(&registry_with(extra)).expect("should parse");
        assert_eq!(
            registry
                .generic_override(Modifier::GTube, "gastrointestinal")
                .and_then(|c| c.get("diet")),
            Some("G-tube feeds")
        );
        assert_eq!(
            registry
                .flap_override(FlapType::Jejunal, "gastrointestinal")
                .and_then(|c| c.get("diet")),
            Some("Per Gen Surg")
        );
    }

    #[test]
    fn rejects_missing_sections() {
        let toml_str = format!("default_attending = \"Smith\"\n{FLAPS}\n{ATTENDING}");
        let err = parse_registry_toml(&toml_str).unwrap_err();
        assert!(
            matches!(err, RegistryParseError::NoSections),
            "expected NoSections, got: {err}"
        );
    }

    #[test]
    fn rejects_duplicate_section() {
        let extra = r#"
[[sections]]
key = "respiratory"
title = "Again"
[sections.items]
x = "y"
"#;
        let err = parse_registry_toml(&registry_with(extra)).unwrap_err();
        assert!(
            matches!(err, RegistryParseError::DuplicateSection(ref k) if k == "respiratory"),
            "expected DuplicateSection, got: {err}"
        );
    }

    #[test]
    fn rejects_empty_section() {
        let extra = r#"
[[sections]]
key = "endocrine"
title = "Endocrine"
"#;
        let err = parse_registry_toml(&registry_with(extra)).unwrap_err();
        assert!(
            matches!(err, RegistryParseError::EmptySection(ref k) if k == "endocrine"),
            "expected EmptySection, got: {err}"
        );
    }

    #[test]
    fn rejects_override_of_unknown_section() {
        let extra = r#"
[overrides.diabetes.endocrine]
glucose = "Accuchecks"
"#;
        let err = parse_registry_toml(&registry_with(extra)).unwrap_err();
        assert!(
            matches!(err, RegistryParseError::UnknownOverrideSection { ref section, .. } if section == "endocrine"),
            "expected UnknownOverrideSection, got: {err}"
        );
    }

    #[test]
    fn rejects_unknown_override_key() {
        let extra = r#"
[overrides.smoker.respiratory]
cessation = "Nicotine patch"
"#;
        let err = parse_registry_toml(&registry_with(extra)).unwrap_err();
        assert!(
            matches!(err, RegistryParseError::UnknownOverrideKey(ref k) if k == "smoker"),
            "expected UnknownOverrideKey, got: {err}"
        );
    }

    #[test]
    fn flap_override_keys_must_be_lowercase() {
        let extra = r#"
[overrides.Jejunal.gastrointestinal]
diet = "Per Gen Surg"
"#;
        let err = parse_registry_toml(&registry_with(extra)).unwrap_err();
        assert!(matches!(err, RegistryParseError::UnknownOverrideKey(_)));
    }

    #[test]
    fn rejects_attending_override_with_item_keys_as_sections() {
        // Items placed directly under a modifier layer read as section keys.
        let extra = r#"
[attendings.Smith.plan_overrides.traumaRecon]
multimodal = "Tylenol"
"#;
        let err = parse_registry_toml(&registry_with(extra)).unwrap_err();
        assert!(
            matches!(err, RegistryParseError::TomlError(_) | RegistryParseError::UnknownOverrideSection { .. }),
            "expected a rejection, got: {err}"
        );
    }

    #[test]
    fn rejects_unknown_attending_layer() {
        let extra = r#"
[attendings.Smith.plan_overrides.weekend.respiratory]
monitoring = "q4h"
"#;
        let err = parse_registry_toml(&registry_with(extra)).unwrap_err();
        assert!(
            matches!(err, RegistryParseError::UnknownAttendingOverrideKey { ref key, .. } if key == "weekend"),
            "expected UnknownAttendingOverrideKey, got: {err}"
        );
    }

    #[test]
    fn rejects_unknown_flap_in_preferences() {
        let extra = r#"
[attendings.Smith.flap_preferences.Radial]
extremity_care = "Splint"
"#;
        let err = parse_registry_toml(&registry_with(extra)).unwrap_err();
        assert!(
            matches!(err, RegistryParseError::UnknownFlapType { ref value, .. } if value == "Radial"),
            "expected UnknownFlapType, got: {err}"
        );
    }

    #[test]
    fn rejects_missing_flap_config() {
        let toml_str = registry_with("").replace(
            "[flaps.Other]\nextremity_care = \"Standard care\"\ndme = \"None required\"\n",
            "",
        );
        let err = parse_registry_toml(&toml_str).unwrap_err();
        assert!(
            matches!(err, RegistryParseError::MissingFlapConfig(FlapType::Other)),
            "expected MissingFlapConfig, got: {err}"
        );
    }

    #[test]
    fn rejects_unknown_flap_config_key() {
        let toml_str = registry_with("").replace("[flaps.Other]", "[flaps.Radial]");
        let err = parse_registry_toml(&toml_str).unwrap_err();
        assert!(
            matches!(err, RegistryParseError::UnknownFlapType { ref value, .. } if value == "Radial"),
            "expected UnknownFlapType, got: {err}"
        );
    }

    #[test]
    fn rejects_unknown_default_attending() {
        let toml_str = registry_with("").replace(
            "default_attending = \"Smith\"",
            "default_attending = \"Jones\"",
        );
        let err = parse_registry_toml(&toml_str).unwrap_err();
        assert!(
            matches!(err, RegistryParseError::UnknownDefaultAttending(ref k) if k == "Jones"),
            "expected UnknownDefaultAttending, got: {err}"
        );
    }

    #[test]
    fn rejects_registry_without_attendings() {
        let toml_str = registry_with("").replace(ATTENDING, "");
        let err = parse_registry_toml(&toml_str).unwrap_err();
        assert!(
            matches!(err, RegistryParseError::NoAttendings),
            "expected NoAttendings, got: {err}"
        );
    }
}
