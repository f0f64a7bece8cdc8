//! Section override resolution.
//!
//! For each plan section the resolver walks an explicit, ordered list of
//! candidate layers (the precedence chain) and takes the first layer that
//! defines the section. The winning layer replaces the whole section; items
//! from lower layers are never merged in. Content and provenance come out of
//! the same walk, so they cannot disagree.
//!
//! Precedence, highest first:
//!
//! 1. `gTube` attending override, then `gTube` generic override
//! 2. `priorRadiation` attending override, then `priorRadiation` generic override
//! 3. other active modifiers, attending overrides, first match in declaration order
//! 4. attending base override
//! 5. flap-specific override
//! 6. other active modifiers, generic overrides, first match in declaration order
//! 7. base plan

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::case::CaseContext;
use crate::models::{Modifier, Provenance};
use crate::registry::{AttendingProfile, ConfigRegistry, SectionContent};

/// Errors returned by [`OverrideResolver::resolve_section`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown plan section: {0:?}")]
    UnknownSection(String),
}

/// A section after override selection, before template substitution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSection {
    pub key: String,
    pub title: String,
    pub content: SectionContent,
    pub provenance: Provenance,
}

/// Selects one configuration layer per section for a case.
///
/// Holds only a shared reference to the registry; any number of resolvers
/// can run against the same registry concurrently.
#[derive(Debug, Clone, Copy)]
pub struct OverrideResolver<'r> {
    registry: &'r ConfigRegistry,
}

impl<'r> OverrideResolver<'r> {
    pub fn new(registry: &'r ConfigRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r ConfigRegistry {
        self.registry
    }

    /// The attending profile for `ctx`, or the registry default when the key
    /// is unknown.
    pub fn attending(&self, ctx: &CaseContext) -> &'r AttendingProfile {
        let (profile, fell_back) = self.registry.attending_or_default(&ctx.attending);
        if fell_back {
            warn!(
                attending = %ctx.attending,
                default = %profile.key,
                "unknown attending, using default profile"
            );
        }
        profile
    }

    /// Ordered lookup attempts for `ctx`, ending with [`Provenance::Base`].
    ///
    /// Only layers that can apply to the context are listed: a modifier that
    /// is not active contributes no entries.
    pub fn precedence_chain(ctx: &CaseContext) -> Vec<Provenance> {
        let mut chain = Vec::with_capacity(2 * ctx.modifiers.len() + 3);

        for risk in Modifier::RISK_FACTORS {
            if ctx.has(risk) {
                chain.push(Provenance::AttendingModifier(risk));
                chain.push(Provenance::ModifierGeneric(risk));
            }
        }
        chain.extend(ctx.modifiers.non_risk().map(Provenance::AttendingModifier));
        chain.push(Provenance::AttendingBase);
        chain.push(Provenance::FlapSpecific(ctx.flap));
        chain.extend(ctx.modifiers.non_risk().map(Provenance::ModifierGeneric));
        chain.push(Provenance::Base);
        chain
    }

    /// Resolve one section.
    ///
    /// Fails only when `key` is not a Base Plan section.
    pub fn resolve_section(
        &self,
        key: &str,
        ctx: &CaseContext,
    ) -> Result<ResolvedSection, ResolveError> {
        let section = self
            .registry
            .section(key)
            .ok_or_else(|| ResolveError::UnknownSection(key.to_string()))?;
        let attending = self.attending(ctx);
        Ok(self.resolve_with(section.key.as_str(), &section.title, &section.content, attending, ctx))
    }

    /// Resolve every Base Plan section, in Base Plan order.
    pub fn resolve_all(&self, ctx: &CaseContext) -> Vec<ResolvedSection> {
        let attending = self.attending(ctx);
        self.registry
            .base_plan()
            .iter()
            .map(|s| self.resolve_with(&s.key, &s.title, &s.content, attending, ctx))
            .collect()
    }

    fn resolve_with(
        &self,
        key: &str,
        title: &str,
        base: &'r SectionContent,
        attending: &'r AttendingProfile,
        ctx: &CaseContext,
    ) -> ResolvedSection {
        let (content, provenance) = Self::precedence_chain(ctx)
            .into_iter()
            .find_map(|layer| {
                self.lookup(layer, key, base, attending)
                    .filter(|content| !content.is_empty())
                    .map(|content| (content, layer))
            })
            // The chain always ends with Base, which is never empty.
            .unwrap_or((base, Provenance::Base));

        debug!(
            section = key,
            layer = %provenance,
            attending = %attending.key,
            items = content.len(),
            "resolved section"
        );

        ResolvedSection {
            key: key.to_string(),
            title: title.to_string(),
            content: content.clone(),
            provenance,
        }
    }

    /// Content a single layer defines for `section`, if any.
    fn lookup(
        &self,
        layer: Provenance,
        section: &str,
        base: &'r SectionContent,
        attending: &'r AttendingProfile,
    ) -> Option<&'r SectionContent> {
        match layer {
            Provenance::AttendingModifier(m) => attending.plan_overrides.for_modifier(m, section),
            Provenance::ModifierGeneric(m) => self.registry.generic_override(m, section),
            Provenance::AttendingBase => attending.plan_overrides.for_base(section),
            Provenance::FlapSpecific(flap) => self.registry.flap_override(flap, section),
            Provenance::Base => Some(base),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
