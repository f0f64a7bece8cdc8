//! Shared test fixtures for flapnote integration tests.
//!
//! Provides a [`RegistryBuilder`] for small hand-written registries (so a
//! test can state exactly which layers define which sections) and ready-made
//! case files for the CLI tests.

use flapnote_core::models::FlapType;
use flapnote_core::registry::toml_format::{
    AttendingToml, FlapConfigToml, FlapPreferenceToml, RegistryToml, SectionToml,
    StapleRemovalToml,
};
use flapnote_core::registry::{ConfigRegistry, SectionContent, parse_registry_toml};

/// Build section content from `(item key, text)` pairs.
pub fn content(items: &[(&str, &str)]) -> SectionContent {
    items.iter().copied().collect()
}

/// An attending profile with fixed scalar preferences and no overrides.
pub fn plain_attending(display_name: &str) -> AttendingToml {
    AttendingToml {
        display_name: display_name.to_string(),
        aspirin_duration: "2 weeks".to_string(),
        doppler_management: "Pull doppler POD 5".to_string(),
        stsg_management: "Xeroform bolster".to_string(),
        discharge_wound_care: "Bacitracin BID".to_string(),
        restrictions: None,
        staple_removal: StapleRemovalToml {
            neck_non_irradiated: "POD 7".to_string(),
            neck_radiated: "POD 14".to_string(),
            leg: None,
            other: "POD 10".to_string(),
        },
        wound_vac: Default::default(),
        flap_preferences: Default::default(),
        plan_overrides: Default::default(),
    }
}

/// Builder for fixture registries.
///
/// Starts with a default flap configuration for every flap type and a single
/// override-free attending, so only what a test adds can win resolution.
#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    raw: RegistryToml,
}

impl RegistryBuilder {
    pub fn new(default_attending: &str) -> Self {
        let flaps = FlapType::ALL
            .into_iter()
            .map(|flap| {
                (
                    flap.key().to_string(),
                    FlapConfigToml {
                        extremity_care: format!("{flap} default extremity care"),
                        dme: format!("{flap} default DME"),
                        wound_care: "Standard wound care".to_string(),
                    },
                )
            })
            .collect();
        let mut attendings = std::collections::BTreeMap::new();
        attendings.insert(
            default_attending.to_string(),
            plain_attending(&format!("Dr. {default_attending}")),
        );
        Self {
            raw: RegistryToml {
                default_attending: default_attending.to_string(),
                sections: Vec::new(),
                flaps,
                overrides: Default::default(),
                attendings,
            },
        }
    }

    pub fn section(mut self, key: &str, title: &str, items: &[(&str, &str)]) -> Self {
        self.raw.sections.push(SectionToml {
            key: key.to_string(),
            title: title.to_string(),
            items: content(items),
        });
        self
    }

    /// Add a generic override. `layer` is a modifier key or a lower-cased
    /// flap type.
    pub fn generic_override(mut self, layer: &str, section: &str, items: &[(&str, &str)]) -> Self {
        self.raw
            .overrides
            .entry(layer.to_string())
            .or_default()
            .insert(section.to_string(), content(items));
        self
    }

    /// Add an override-free attending.
    pub fn attending(mut self, key: &str) -> Self {
        self.raw
            .attendings
            .insert(key.to_string(), plain_attending(&format!("Dr. {key}")));
        self
    }

    /// Edit an attending profile in place, adding it first if needed.
    pub fn with_attending(mut self, key: &str, edit: impl FnOnce(&mut AttendingToml)) -> Self {
        let profile = self
            .raw
            .attendings
            .entry(key.to_string())
            .or_insert_with(|| plain_attending(&format!("Dr. {key}")));
        edit(profile);
        self
    }

    /// Add an attending override. `layer` is `base` or a modifier key.
    pub fn attending_override(
        self,
        attending: &str,
        layer: &str,
        section: &str,
        items: &[(&str, &str)],
    ) -> Self {
        self.with_attending(attending, |profile| {
            profile
                .plan_overrides
                .entry(layer.to_string())
                .or_default()
                .insert(section.to_string(), content(items));
        })
    }

    pub fn flap_preference(
        self,
        attending: &str,
        flap: FlapType,
        extremity_care: Option<&str>,
        wound_care: Option<&str>,
    ) -> Self {
        self.with_attending(attending, |profile| {
            profile.flap_preferences.insert(
                flap.key().to_string(),
                FlapPreferenceToml {
                    extremity_care: extremity_care.map(str::to_string),
                    wound_care: wound_care.map(str::to_string),
                },
            );
        })
    }

    /// Serialize to registry TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string(&self.raw).expect("fixture registry should serialize")
    }

    /// Serialize, then parse through the real validating parser.
    pub fn build(&self) -> ConfigRegistry {
        parse_registry_toml(&self.to_toml()).expect("fixture registry should validate")
    }
}

/// A registry where every layer defines `woundCare` with a distinct marker
/// text, plus an untouched `respiratory` section.
///
/// Attendings: `A` has `gTube`, `priorRadiation`, `tracheostomy` and `base`
/// overrides; `B` has none. Generic overrides exist for `gTube`,
/// `priorRadiation`, `laryngectomy`, `diabetes` and the `fibula` flap.
pub fn layered_registry() -> ConfigRegistry {
    RegistryBuilder::new("A")
        .section(
            "woundCare",
            "Wound Care",
            &[("base", "base wound care"), ("drains", "base drains")],
        )
        .section("respiratory", "Respiratory", &[("base", "base respiratory")])
        .generic_override("gTube", "woundCare", &[("text", "Y: generic gTube")])
        .generic_override("priorRadiation", "woundCare", &[("text", "generic priorRadiation")])
        .generic_override("laryngectomy", "woundCare", &[("text", "generic laryngectomy")])
        .generic_override("diabetes", "woundCare", &[("text", "generic diabetes")])
        .generic_override("fibula", "woundCare", &[("text", "fibula flap")])
        .attending_override("A", "gTube", "woundCare", &[("text", "X: A gTube")])
        .attending_override("A", "priorRadiation", "woundCare", &[("text", "A priorRadiation")])
        .attending_override("A", "tracheostomy", "woundCare", &[("text", "A tracheostomy")])
        .attending_override("A", "base", "woundCare", &[("text", "A base")])
        .attending("B")
        .build()
}

/// A complete case file: Eid, RFFF, oral cavity reconstruction.
pub const EID_RFFF_CASE: &str = r#"[patient]
name = "Jane Doe"
mrn = "00123456"
date = "2025-03-14"
diagnosis = "cT4aN1 SCC of the oral tongue"
planned_procedures = ["Partial glossectomy", "Left neck dissection", "Left RFFF"]

[surgeons]
flap = "RFFF"
ablative = "Dr. Smith"
reconstructive = "Dr. Eid"

[modifiers]
oralCavityAerodigestive = true

[intraop]
anticipated_airway = "Oral ETT"
ett_position = "Right"
protected_limbs = "Left arm"
paralytic_ok = "No"
pressors_ok = "No"
preop_antibiotics = "Unasyn"
expected_blood_loss = "200 mL"
patient_position = "Supine"
table_position = "180"
number_of_setups = "2"
saw = "No"
drill = "No"
hn_plating = "No"
extremity_plating = "No"
stsg = "Yes"
wound_vac = "Yes"

[discharge]
home_care = "Home health for tube feeds"
"#;

/// A minimal case file for `surgeon`, `flap` and the given modifier keys.
pub fn case_toml(surgeon: &str, flap: &str, modifiers: &[&str]) -> String {
    let mut out = format!("[surgeons]\nflap = \"{flap}\"\nreconstructive = \"{surgeon}\"\n");
    if !modifiers.is_empty() {
        out.push_str("\n[modifiers]\n");
        for m in modifiers {
            out.push_str(&format!("{m} = true\n"));
        }
    }
    out
}
