//! Placeholder substitution for resolved plan text.
//!
//! Placeholders look like `{aspirinDuration}`: an ASCII letter followed by
//! letters, digits or underscores, wrapped in braces. Substitution is literal
//! and replaces only the first occurrence of each token. Tokens without a
//! binding are left as they are so a reviewer can see what still needs
//! attention.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::case::CaseContext;
use crate::models::Modifier;
use crate::registry::{AttendingProfile, SectionContent};

/// Token → replacement text for one case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateRenderer {
    bindings: BTreeMap<String, String>,
}

impl TemplateRenderer {
    /// A renderer with no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every case token from the attending profile and case context.
    pub fn for_case(profile: &AttendingProfile, ctx: &CaseContext) -> Self {
        let mut renderer = Self::new()
            .with_binding("aspirinDuration", &profile.aspirin_duration)
            .with_binding("dopplerManagement", &profile.doppler_management)
            .with_binding("stsgManagement", &profile.stsg_management)
            .with_binding("dischargeWoundCare", &profile.discharge_wound_care)
            .with_binding("stapleRemoval", staple_removal(profile, ctx))
            .with_binding("npoDuration", npo_duration(ctx))
            .with_binding("swallowStudy", swallow_study(ctx))
            .with_binding("laryngectomyConsults", laryngectomy_consults(ctx));

        if let Some(restrictions) = &profile.restrictions {
            renderer = renderer.with_binding("restrictions", restrictions);
        }
        let surgeons = &ctx.facts.surgeons;
        if let Some(name) = &surgeons.reconstructive {
            renderer = renderer.with_binding("reconstructiveSurgeon", name);
        }
        if let Some(name) = &surgeons.ablative {
            renderer = renderer.with_binding("ablativeSurgeon", name);
        }
        renderer
    }

    pub fn with_binding(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.bindings.insert(token.into(), value.into());
        self
    }

    pub fn binding(&self, token: &str) -> Option<&str> {
        self.bindings.get(token).map(String::as_str)
    }

    /// Substitute the first occurrence of each bound token.
    ///
    /// Replacement text is inserted as-is and never scanned again.
    pub fn render(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut used: Vec<&str> = Vec::new();
        let mut cursor = 0;

        for (span, token) in placeholders(text) {
            let Some(value) = self.binding(token) else {
                continue;
            };
            if used.contains(&token) {
                continue;
            }
            used.push(token);
            out.push_str(&text[cursor..span.start]);
            out.push_str(value);
            cursor = span.end;
        }
        out.push_str(&text[cursor..]);
        out
    }

    pub fn render_content(&self, content: &SectionContent) -> SectionContent {
        content.map_text(|text| self.render(text))
    }

    /// Placeholder tokens still present in `text`, first occurrence order,
    /// without duplicates.
    pub fn unresolved_tokens(text: &str) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        for (_, token) in placeholders(text) {
            if !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
        tokens
    }
}

/// Every well-formed `{token}` in `text` with its byte span.
fn placeholders(text: &str) -> Vec<(Range<usize>, &str)> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while let Some(offset) = text[i..].find('{') {
        let open = i + offset;
        let start = open + 1;
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
            end += 1;
        }
        let well_formed = end > start
            && bytes[start].is_ascii_alphabetic()
            && end < bytes.len()
            && bytes[end] == b'}';
        if well_formed {
            found.push((open..end + 1, &text[start..end]));
            i = end + 1;
        } else {
            i = start;
        }
    }
    found
}

// ---------------------------------------------------------------------------
// Derived values
// ---------------------------------------------------------------------------

/// Minimum NPO period for the case.
pub fn npo_duration(ctx: &CaseContext) -> &'static str {
    if ctx.has(Modifier::PriorRadiation) {
        "14 days (post-XRT)"
    } else if ctx.has(Modifier::Laryngectomy) {
        "7 days (laryngectomy)"
    } else {
        "5 days (non-irradiated oral cavity)"
    }
}

/// Swallow study before starting PO intake; empty when none is required.
pub fn swallow_study(ctx: &CaseContext) -> &'static str {
    let irradiated = ctx.has(Modifier::PriorRadiation);
    if ctx.has(Modifier::OralCavityAerodigestive) && !irradiated {
        "Bedside swallow (non-irradiated)"
    } else if ctx.has(Modifier::Laryngectomy) && !irradiated {
        "Esophagram POD 7 (non-irradiated)"
    } else {
        ""
    }
}

/// Staple removal timing, e.g. `Neck: POD 7, Leg: POD 7-8, Other: POD 10`.
pub fn staple_removal(profile: &AttendingProfile, ctx: &CaseContext) -> String {
    let timing = &profile.staple_removal;
    let neck = if ctx.has(Modifier::PriorRadiation) {
        &timing.neck_radiated
    } else {
        &timing.neck_non_irradiated
    };
    match &timing.leg {
        Some(leg) => format!("Neck: {neck}, Leg: {leg}, Other: {}", timing.other),
        None => format!("Neck: {neck}, Other: {}", timing.other),
    }
}

fn laryngectomy_consults(ctx: &CaseContext) -> &'static str {
    if ctx.has(Modifier::Laryngectomy) {
        ", SLP for laryngectomy counseling/electrolarynx teaching"
    } else {
        ""
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlapType;
    use crate::registry::ConfigRegistry;

    fn eid() -> AttendingProfile {
        ConfigRegistry::embedded()
            .attending("Eid")
            .cloned()
            .expect("Eid profile")
    }

    #[test]
    fn replaces_bound_token() {
        let r = TemplateRenderer::new().with_binding("aspirinDuration", "3 weeks");
        assert_eq!(
            r.render("Start ASA 81mg PO daily x {aspirinDuration}"),
            "Start ASA 81mg PO daily x 3 weeks"
        );
    }

    #[test]
    fn only_first_occurrence_is_replaced() {
        let r = TemplateRenderer::new().with_binding("x", "1");
        assert_eq!(r.render("{x} and {x}"), "1 and {x}");
    }

    #[test]
    fn unknown_token_is_left_verbatim() {
        let r = TemplateRenderer::new().with_binding("x", "1");
        assert_eq!(r.render("{x} then {mysteryToken}"), "1 then {mysteryToken}");
    }

    #[test]
    fn replacement_text_is_not_rescanned() {
        let r = TemplateRenderer::new()
            .with_binding("a", "{b}")
            .with_binding("b", "oops");
        assert_eq!(r.render("{a}"), "{b}");
    }

    #[test]
    fn malformed_braces_are_ignored() {
        let r = TemplateRenderer::new().with_binding("x", "1");
        assert_eq!(r.render("{ x } {} {1x} {x"), "{ x } {} {1x} {x");
        assert!(TemplateRenderer::unresolved_tokens("{ x } {} {1x}").is_empty());
    }

    #[test]
    fn unresolved_tokens_are_deduplicated() {
        assert_eq!(
            TemplateRenderer::unresolved_tokens("{a} {b} {a}"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn case_bindings_from_profile() {
        let ctx = CaseContext::new("Eid", FlapType::Rfff).with_modifier(Modifier::Laryngectomy);
        let r = TemplateRenderer::for_case(&eid(), &ctx);
        assert_eq!(r.binding("aspirinDuration"), Some("3 weeks"));
        assert_eq!(
            r.binding("restrictions"),
            Some("Okay for chocolate, tea and decaf coffee")
        );
        assert_eq!(
            r.render("Consults: ICU, CM{laryngectomyConsults}"),
            "Consults: ICU, CM, SLP for laryngectomy counseling/electrolarynx teaching"
        );
        assert_eq!(r.binding("reconstructiveSurgeon"), None);
    }

    #[test]
    fn restrictions_unbound_without_preference() {
        let registry = ConfigRegistry::embedded();
        let wood = registry.attending("Wood").unwrap();
        let ctx = CaseContext::new("Wood", FlapType::Alt);
        let r = TemplateRenderer::for_case(wood, &ctx);
        assert_eq!(r.binding("restrictions"), None);
        assert_eq!(r.render("{restrictions}"), "{restrictions}");
        assert_eq!(r.render("CM{laryngectomyConsults}"), "CM");
    }

    #[test]
    fn npo_duration_prefers_radiation() {
        let base = CaseContext::new("Eid", FlapType::Alt);
        assert_eq!(npo_duration(&base), "5 days (non-irradiated oral cavity)");
        let lx = base.clone().with_modifier(Modifier::Laryngectomy);
        assert_eq!(npo_duration(&lx), "7 days (laryngectomy)");
        let xrt = lx.with_modifier(Modifier::PriorRadiation);
        assert_eq!(npo_duration(&xrt), "14 days (post-XRT)");
    }

    #[test]
    fn swallow_study_only_without_radiation() {
        let oral = CaseContext::new("Eid", FlapType::Rfff)
            .with_modifier(Modifier::OralCavityAerodigestive);
        assert_eq!(swallow_study(&oral), "Bedside swallow (non-irradiated)");
        let lx = CaseContext::new("Eid", FlapType::Jejunal).with_modifier(Modifier::Laryngectomy);
        assert_eq!(swallow_study(&lx), "Esophagram POD 7 (non-irradiated)");
        let xrt = oral.with_modifier(Modifier::PriorRadiation);
        assert_eq!(swallow_study(&xrt), "");
    }

    #[test]
    fn staple_removal_omits_missing_leg() {
        let ctx = CaseContext::new("Eid", FlapType::Fibula);
        assert_eq!(
            staple_removal(&eid(), &ctx),
            "Neck: discharge AM, Other: POD 10-14 (clinic)"
        );
        let registry = ConfigRegistry::embedded();
        let gleysteen = registry.attending("Gleysteen").unwrap();
        let xrt = ctx.with_modifier(Modifier::PriorRadiation);
        assert_eq!(
            staple_removal(gleysteen, &xrt),
            "Neck: POD 10-14 (clinic), Leg: POD 7-8, Other: POD 10"
        );
    }
}
