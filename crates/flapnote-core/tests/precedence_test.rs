//! Integration tests for section override precedence.
//!
//! The fixture registries come from `flapnote-test-utils`; the end-to-end
//! cases run against the embedded registry.

use flapnote_core::models::{FlapType, Modifier, Provenance};
use flapnote_core::registry::ConfigRegistry;
use flapnote_core::{CaseContext, OverrideResolver, ResolveError};
use flapnote_test_utils::{RegistryBuilder, layered_registry};

fn resolve(registry: &ConfigRegistry, section: &str, ctx: &CaseContext) -> (String, Provenance) {
    let resolved = OverrideResolver::new(registry)
        .resolve_section(section, ctx)
        .expect("section exists");
    let text = resolved
        .content
        .get("text")
        .or_else(|| resolved.content.get("base"))
        .unwrap_or_default()
        .to_string();
    (text, resolved.provenance)
}

// -----------------------------------------------------------------------
// Risk factors
// -----------------------------------------------------------------------

#[test]
fn attending_gtube_beats_everything() {
    let registry = layered_registry();
    let ctx = CaseContext::new("A", FlapType::Fibula).with_modifiers(Modifier::ALL);
    let (text, provenance) = resolve(&registry, "woundCare", &ctx);
    assert_eq!(text, "X: A gTube");
    assert_eq!(provenance, Provenance::AttendingModifier(Modifier::GTube));
}

#[test]
fn gtube_outranks_prior_radiation_regardless_of_insertion_order() {
    let registry = layered_registry();
    let forward = CaseContext::new("A", FlapType::Alt)
        .with_modifier(Modifier::GTube)
        .with_modifier(Modifier::PriorRadiation);
    let reverse = CaseContext::new("A", FlapType::Alt)
        .with_modifier(Modifier::PriorRadiation)
        .with_modifier(Modifier::GTube);
    assert_eq!(resolve(&registry, "woundCare", &forward), resolve(&registry, "woundCare", &reverse));
    assert_eq!(
        resolve(&registry, "woundCare", &forward).1,
        Provenance::AttendingModifier(Modifier::GTube)
    );
}

#[test]
fn generic_prior_radiation_outranks_attending_base() {
    let registry = layered_registry();
    let ctx = CaseContext::new("B", FlapType::Fibula).with_modifier(Modifier::PriorRadiation);
    let (text, provenance) = resolve(&registry, "woundCare", &ctx);
    assert_eq!(text, "generic priorRadiation");
    assert_eq!(provenance, Provenance::ModifierGeneric(Modifier::PriorRadiation));
}

// -----------------------------------------------------------------------
// Attending, flap and generic tiers
// -----------------------------------------------------------------------

#[test]
fn attending_base_beats_flap_layer() {
    let registry = layered_registry();
    let ctx = CaseContext::new("A", FlapType::Fibula).with_modifier(Modifier::Laryngectomy);
    assert_eq!(
        resolve(&registry, "woundCare", &ctx),
        ("A base".to_string(), Provenance::AttendingBase)
    );
}

#[test]
fn flap_layer_beats_generic_modifier() {
    let registry = layered_registry();
    let ctx = CaseContext::new("B", FlapType::Fibula).with_modifier(Modifier::Laryngectomy);
    assert_eq!(
        resolve(&registry, "woundCare", &ctx),
        ("fibula flap".to_string(), Provenance::FlapSpecific(FlapType::Fibula))
    );
}

#[test]
fn first_declared_generic_modifier_wins() {
    let registry = layered_registry();
    // Laryngectomy is declared before diabetes.
    let ctx = CaseContext::new("B", FlapType::Alt)
        .with_modifiers([Modifier::Diabetes, Modifier::Laryngectomy]);
    assert_eq!(
        resolve(&registry, "woundCare", &ctx),
        (
            "generic laryngectomy".to_string(),
            Provenance::ModifierGeneric(Modifier::Laryngectomy)
        )
    );
}

#[test]
fn second_modifier_content_is_never_merged() {
    let registry = RegistryBuilder::new("A")
        .section("endocrine", "Endocrine", &[("steroids", "base steroids")])
        .generic_override("laryngectomy", "endocrine", &[("one", "from laryngectomy")])
        .generic_override("diabetes", "endocrine", &[("two", "from diabetes")])
        .build();
    let ctx = CaseContext::new("A", FlapType::Alt)
        .with_modifiers([Modifier::Laryngectomy, Modifier::Diabetes]);
    let resolved = OverrideResolver::new(&registry)
        .resolve_section("endocrine", &ctx)
        .unwrap();
    let keys: Vec<&str> = resolved.content.keys().collect();
    assert_eq!(keys, vec!["one"]);
}

#[test]
fn all_layers_absent_yields_base() {
    let registry = layered_registry();
    let ctx = CaseContext::new("B", FlapType::Alt).with_modifier(Modifier::TraumaRecon);
    let resolved = OverrideResolver::new(&registry)
        .resolve_section("woundCare", &ctx)
        .unwrap();
    assert_eq!(resolved.provenance, Provenance::Base);
    assert_eq!(resolved.content, registry.section("woundCare").unwrap().content);
}

#[test]
fn unknown_section_reports_its_key() {
    let registry = layered_registry();
    let ctx = CaseContext::new("A", FlapType::Alt);
    let err = OverrideResolver::new(&registry)
        .resolve_section("nonexistent", &ctx)
        .unwrap_err();
    assert_eq!(err, ResolveError::UnknownSection("nonexistent".to_string()));
}

// -----------------------------------------------------------------------
// Embedded registry
// -----------------------------------------------------------------------

#[test]
fn eid_oral_cavity_gastrointestinal_uses_attending_override() {
    let registry = ConfigRegistry::embedded();
    let ctx = CaseContext::new("Eid", FlapType::Rfff).with_modifier(Modifier::OralCavityAerodigestive);
    let resolved = OverrideResolver::new(&registry)
        .resolve_section("gastrointestinal", &ctx)
        .unwrap();

    assert_eq!(
        resolved.provenance,
        Provenance::AttendingModifier(Modifier::OralCavityAerodigestive)
    );
    let ng = resolved.content.get("ngPlacement").expect("ngPlacement item");
    assert!(ng.contains("Eid: Use two view prior to feeding"));
    assert!(resolved.content.contains_key("tubeFeeding"));

    let generic = registry
        .generic_override(Modifier::OralCavityAerodigestive, "gastrointestinal")
        .unwrap();
    assert_ne!(&resolved.content, generic);
}

#[test]
fn eid_oral_cavity_woundcare_falls_to_generic_table() {
    let registry = ConfigRegistry::embedded();
    let ctx = CaseContext::new("Eid", FlapType::Rfff).with_modifier(Modifier::OralCavityAerodigestive);
    let resolved = OverrideResolver::new(&registry)
        .resolve_section("woundCare", &ctx)
        .unwrap();
    assert_eq!(
        resolved.provenance,
        Provenance::ModifierGeneric(Modifier::OralCavityAerodigestive)
    );
    assert!(resolved.content.contains_key("peridex"));
}

#[test]
fn jejunal_flap_overrides_gastrointestinal() {
    let registry = ConfigRegistry::embedded();
    let ctx = CaseContext::new("Wood", FlapType::Jejunal);
    let resolved = OverrideResolver::new(&registry)
        .resolve_section("gastrointestinal", &ctx)
        .unwrap();
    assert_eq!(resolved.provenance, Provenance::FlapSpecific(FlapType::Jejunal));
}

#[test]
fn gtube_generic_beats_eid_oral_cavity_override() {
    let registry = ConfigRegistry::embedded();
    let ctx = CaseContext::new("Eid", FlapType::Rfff)
        .with_modifiers([Modifier::OralCavityAerodigestive, Modifier::GTube]);
    let resolved = OverrideResolver::new(&registry)
        .resolve_section("gastrointestinal", &ctx)
        .unwrap();
    assert_eq!(resolved.provenance, Provenance::ModifierGeneric(Modifier::GTube));
    assert_eq!(resolved.content.get("diet"), Some("NPO with G-tube feeding"));
}

#[test]
fn resolve_all_provenance_matches_single_resolution() {
    let registry = ConfigRegistry::embedded();
    let resolver = OverrideResolver::new(&registry);
    let ctx = CaseContext::new("Eid", FlapType::Jejunal)
        .with_modifiers([Modifier::Laryngectomy, Modifier::TraumaRecon, Modifier::Diabetes]);
    for section in resolver.resolve_all(&ctx) {
        let single = resolver.resolve_section(&section.key, &ctx).unwrap();
        assert_eq!(single, section);
    }
}

#[test]
fn shared_registry_resolves_identically_across_threads() {
    let registry = std::sync::Arc::new(ConfigRegistry::embedded());
    let ctx = CaseContext::new("Eid", FlapType::Fibula)
        .with_modifiers([Modifier::PriorRadiation, Modifier::Tracheostomy]);
    let expected = OverrideResolver::new(&registry).resolve_all(&ctx);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = std::sync::Arc::clone(&registry);
            let ctx = ctx.clone();
            std::thread::spawn(move || OverrideResolver::new(&registry).resolve_all(&ctx))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
