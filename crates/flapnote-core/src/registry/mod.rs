//! Configuration registry: base plan, attending profiles, generic overrides,
//! and flap defaults.
//!
//! The shipped registry is defined in `registry.toml` and embedded in the
//! binary at compile time. An alternative file with the same schema can be
//! loaded through [`parse_registry_toml`]. A registry is immutable once
//! built and can be shared freely across threads.

pub mod content;
pub mod parser;
pub mod toml_format;

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::models::{FlapType, Modifier};

pub use content::SectionContent;
pub use parser::{RegistryParseError, parse_registry_toml};
pub use toml_format::RegistryToml;

/// The embedded registry TOML.
static REGISTRY_TOML: &str = include_str!("registry.toml");

/// Return the source text of the embedded registry.
pub fn embedded_source() -> &'static str {
    REGISTRY_TOML
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Section key → override content.
pub type SectionOverrides = BTreeMap<String, SectionContent>;

/// One base plan section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub key: String,
    pub title: String,
    pub content: SectionContent,
}

/// Per-attending overrides: an attending-wide `base` layer plus one layer per
/// modifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanOverrides {
    pub base: SectionOverrides,
    pub by_modifier: BTreeMap<Modifier, SectionOverrides>,
}

impl PlanOverrides {
    pub fn for_modifier(&self, modifier: Modifier, section: &str) -> Option<&SectionContent> {
        self.by_modifier.get(&modifier)?.get(section)
    }

    pub fn for_base(&self, section: &str) -> Option<&SectionContent> {
        self.base.get(section)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StapleRemoval {
    pub neck_non_irradiated: String,
    pub neck_radiated: String,
    pub leg: Option<String>,
    pub other: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlapPreference {
    pub extremity_care: Option<String>,
    pub wound_care: Option<String>,
}

/// A surgeon's scalar preferences and override tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendingProfile {
    pub key: String,
    pub display_name: String,
    pub aspirin_duration: String,
    pub doppler_management: String,
    pub stsg_management: String,
    pub discharge_wound_care: String,
    pub restrictions: Option<String>,
    pub staple_removal: StapleRemoval,
    pub wound_vac: BTreeMap<FlapType, String>,
    pub flap_preferences: BTreeMap<FlapType, FlapPreference>,
    pub plan_overrides: PlanOverrides,
}

impl AttendingProfile {
    pub fn flap_preference(&self, flap: FlapType) -> Option<&FlapPreference> {
        self.flap_preferences.get(&flap)
    }
}

/// Default care text for a flap type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlapConfig {
    pub extremity_care: String,
    pub dme: String,
    pub wound_care: String,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Validated, read-only configuration.
///
/// Built by [`parse_registry_toml`]; every flap type has a [`FlapConfig`],
/// every override names a base plan section, and the default attending
/// exists.
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    pub(crate) sections: Vec<Section>,
    pub(crate) attendings: BTreeMap<String, AttendingProfile>,
    pub(crate) default_attending: String,
    pub(crate) modifier_overrides: BTreeMap<Modifier, SectionOverrides>,
    pub(crate) flap_overrides: BTreeMap<FlapType, SectionOverrides>,
    pub(crate) flap_configs: BTreeMap<FlapType, FlapConfig>,
    pub(crate) digest: String,
}

impl ConfigRegistry {
    /// Load the registry embedded in the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. This is a compile-time
    /// invariant covered by the crate's tests.
    pub fn embedded() -> Self {
        parse_registry_toml(REGISTRY_TOML)
            .unwrap_or_else(|e| panic!("embedded registry.toml is invalid: {e}"))
    }

    /// Base plan sections in document order.
    pub fn base_plan(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.key == key)
    }

    pub fn section_keys(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.key.as_str())
    }

    pub fn attending(&self, key: &str) -> Option<&AttendingProfile> {
        self.attendings.get(key)
    }

    pub fn attending_keys(&self) -> impl Iterator<Item = &str> {
        self.attendings.keys().map(String::as_str)
    }

    pub fn attendings(&self) -> impl Iterator<Item = &AttendingProfile> {
        self.attendings.values()
    }

    pub fn default_attending(&self) -> &AttendingProfile {
        // Presence is checked by the parser.
        &self.attendings[&self.default_attending]
    }

    /// Look up a profile, falling back to the default one.
    ///
    /// The boolean is `true` when the fallback was taken.
    pub fn attending_or_default(&self, key: &str) -> (&AttendingProfile, bool) {
        match self.attendings.get(key) {
            Some(profile) => (profile, false),
            None => (self.default_attending(), true),
        }
    }

    /// Attending keys in surgeon-matching order: the default profile first,
    /// then the rest by key.
    pub fn surgeon_match_order(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.default_attending.as_str()).chain(
            self.attendings
                .keys()
                .map(String::as_str)
                .filter(|key| *key != self.default_attending),
        )
    }

    /// Find the attending named by a surgeon's display name (e.g. `Dr. Eid`).
    ///
    /// A profile matches when its key is a whole word of the name or the
    /// name equals its display name, ignoring case. `Dr. Reid` does not
    /// match `Eid`.
    pub fn match_surgeon(&self, surgeon_name: &str) -> Option<&str> {
        let name = surgeon_name.trim();
        self.surgeon_match_order().find(|key| {
            let display = &self.attendings[*key].display_name;
            name.eq_ignore_ascii_case(display)
                || name
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|word| word.eq_ignore_ascii_case(key))
        })
    }

    /// Map a surgeon's display name to an attending key, falling back to
    /// the default attending with a warning.
    pub fn attending_for_surgeon(&self, surgeon_name: &str) -> &str {
        match self.match_surgeon(surgeon_name) {
            Some(key) => key,
            None => {
                warn!(
                    surgeon = surgeon_name,
                    attending = %self.default_attending,
                    "unknown surgeon, using default attending"
                );
                &self.default_attending
            }
        }
    }

    pub fn flap_config(&self, flap: FlapType) -> &FlapConfig {
        // Totality over FlapType::ALL is checked by the parser.
        &self.flap_configs[&flap]
    }

    pub fn generic_override(&self, modifier: Modifier, section: &str) -> Option<&SectionContent> {
        self.modifier_overrides.get(&modifier)?.get(section)
    }

    pub fn flap_override(&self, flap: FlapType, section: &str) -> Option<&SectionContent> {
        self.flap_overrides.get(&flap)?.get(section)
    }

    /// Hex SHA-256 of the registry source text.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

pub(crate) fn digest_source(source: &str) -> String {
    hex::encode(Sha256::digest(source.as_bytes()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
