use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// A boolean clinical flag that may trigger specialized plan content.
///
/// Variant order is the declaration order used as the tie-break when several
/// active modifiers of the same precedence class define the same section.
/// `Ord` is derived, so sorted collections iterate in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Modifier {
    OralCavityAerodigestive,
    Laryngectomy,
    PriorRadiation,
    Diabetes,
    Tracheostomy,
    TraumaRecon,
    GTube,
}

impl Modifier {
    /// Every modifier, in declaration order.
    pub const ALL: [Modifier; 7] = [
        Self::OralCavityAerodigestive,
        Self::Laryngectomy,
        Self::PriorRadiation,
        Self::Diabetes,
        Self::Tracheostomy,
        Self::TraumaRecon,
        Self::GTube,
    ];

    /// Risk-factor modifiers, highest priority first.
    pub const RISK_FACTORS: [Modifier; 2] = [Self::GTube, Self::PriorRadiation];

    /// Configuration key (e.g. `gTube`).
    pub fn key(self) -> &'static str {
        match self {
            Self::OralCavityAerodigestive => "oralCavityAerodigestive",
            Self::Laryngectomy => "laryngectomy",
            Self::PriorRadiation => "priorRadiation",
            Self::Diabetes => "diabetes",
            Self::Tracheostomy => "tracheostomy",
            Self::TraumaRecon => "traumaRecon",
            Self::GTube => "gTube",
        }
    }

    /// Label shown in the case overview.
    pub fn label(self) -> &'static str {
        match self {
            Self::OralCavityAerodigestive => "Oral cavity/Aerodigestive",
            Self::Laryngectomy => "Laryngectomy",
            Self::PriorRadiation => "Prior radiation",
            Self::Diabetes => "Diabetes",
            Self::Tracheostomy => "Tracheostomy",
            Self::TraumaRecon => "Trauma recon",
            Self::GTube => "G tube",
        }
    }

    /// Whether this modifier outranks attending preferences.
    pub fn is_risk_factor(self) -> bool {
        Self::RISK_FACTORS.contains(&self)
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Modifier {
    type Err = ModifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.key() == s)
            .ok_or_else(|| ModifierParseError(s.to_owned()))
    }
}

/// Error returned when parsing an invalid [`Modifier`] string.
#[derive(Debug, Clone)]
pub struct ModifierParseError(pub String);

impl fmt::Display for ModifierParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid modifier: {:?}", self.0)
    }
}

impl std::error::Error for ModifierParseError {}

// ---------------------------------------------------------------------------

/// The set of modifiers active for a case.
///
/// Iteration follows [`Modifier::ALL`] order no matter how the set was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifierSet(BTreeSet<Modifier>);

impl ModifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, modifier: Modifier) -> bool {
        self.0.insert(modifier)
    }

    pub fn contains(&self, modifier: Modifier) -> bool {
        self.0.contains(&modifier)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Active modifiers in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Modifier> + '_ {
        self.0.iter().copied()
    }

    /// Active modifiers other than the risk factors, in declaration order.
    pub fn non_risk(&self) -> impl Iterator<Item = Modifier> + '_ {
        self.iter().filter(|m| !m.is_risk_factor())
    }

    /// Comma-joined labels, or `"None"` when nothing is active.
    pub fn labels(&self) -> String {
        if self.is_empty() {
            return "None".to_string();
        }
        self.iter().map(Modifier::label).collect::<Vec<_>>().join(", ")
    }
}

impl FromIterator<Modifier> for ModifierSet {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Boolean flag record as produced by the intake form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ModifierFlags {
    pub oral_cavity_aerodigestive: bool,
    pub laryngectomy: bool,
    pub prior_radiation: bool,
    pub diabetes: bool,
    pub tracheostomy: bool,
    pub trauma_recon: bool,
    pub g_tube: bool,
}

impl ModifierFlags {
    fn is_set(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::OralCavityAerodigestive => self.oral_cavity_aerodigestive,
            Modifier::Laryngectomy => self.laryngectomy,
            Modifier::PriorRadiation => self.prior_radiation,
            Modifier::Diabetes => self.diabetes,
            Modifier::Tracheostomy => self.tracheostomy,
            Modifier::TraumaRecon => self.trauma_recon,
            Modifier::GTube => self.g_tube,
        }
    }
}

impl From<ModifierFlags> for ModifierSet {
    fn from(flags: ModifierFlags) -> Self {
        Modifier::ALL
            .into_iter()
            .filter(|m| flags.is_set(*m))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Flap types
// ---------------------------------------------------------------------------

/// Free flap donor site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FlapType {
    #[serde(rename = "ALT")]
    Alt,
    Fibula,
    #[serde(rename = "RFFF")]
    Rfff,
    Scapula,
    Jejunal,
    LatissimusDorsi,
    Other,
}

impl FlapType {
    pub const ALL: [FlapType; 7] = [
        Self::Alt,
        Self::Fibula,
        Self::Rfff,
        Self::Scapula,
        Self::Jejunal,
        Self::LatissimusDorsi,
        Self::Other,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Alt => "ALT",
            Self::Fibula => "Fibula",
            Self::Rfff => "RFFF",
            Self::Scapula => "Scapula",
            Self::Jejunal => "Jejunal",
            Self::LatissimusDorsi => "LatissimusDorsi",
            Self::Other => "Other",
        }
    }

    /// Key addressing this flap in the generic override table.
    pub fn override_key(self) -> String {
        self.key().to_ascii_lowercase()
    }
}

impl fmt::Display for FlapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FlapType {
    type Err = FlapTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| FlapTypeParseError(s.to_owned()))
    }
}

/// Error returned when parsing an invalid [`FlapType`] string.
#[derive(Debug, Clone)]
pub struct FlapTypeParseError(pub String);

impl fmt::Display for FlapTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid flap type: {:?} (expected ALT, Fibula, RFFF, Scapula, Jejunal, LatissimusDorsi, or Other)",
            self.0
        )
    }
}

impl std::error::Error for FlapTypeParseError {}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// The configuration layer that supplied a section's content.
///
/// Display and audit only; nothing downstream branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "layer", content = "key", rename_all = "camelCase")]
pub enum Provenance {
    Base,
    AttendingBase,
    AttendingModifier(Modifier),
    ModifierGeneric(Modifier),
    FlapSpecific(FlapType),
}

impl Provenance {
    pub fn is_override(&self) -> bool {
        !matches!(self, Self::Base)
    }

    /// Reviewer-facing label, e.g. `Eid (gTube)` or `Base Plan`.
    pub fn describe(&self, attending: &str) -> String {
        match self {
            Self::Base => "Base Plan".to_string(),
            Self::AttendingBase => format!("{attending} (base)"),
            Self::AttendingModifier(m) => format!("{attending} ({m})"),
            Self::ModifierGeneric(m) => m.to_string(),
            Self::FlapSpecific(f) => format!("{f} flap"),
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("base"),
            Self::AttendingBase => f.write_str("attendingBase"),
            Self::AttendingModifier(m) => write!(f, "attendingModifier({m})"),
            Self::ModifierGeneric(m) => write!(f, "modifierGeneric({m})"),
            Self::FlapSpecific(flap) => write!(f, "flapSpecific({flap})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
