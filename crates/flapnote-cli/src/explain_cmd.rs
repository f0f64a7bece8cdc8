//! `flapnote explain`: the preference playground.
//!
//! Resolves every base plan section for a surgeon, flap and modifier set and
//! prints which layer won each one.

use std::io::Write;

use flapnote_core::models::{FlapType, Modifier, Provenance};
use flapnote_core::registry::ConfigRegistry;
use flapnote_core::{CaseContext, OverrideResolver, TemplateRenderer};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExplainOptions {
    pub content: bool,
    pub overrides_only: bool,
}

/// Execute `flapnote explain`, printing to stdout.
pub fn run_explain(
    registry: &ConfigRegistry,
    surgeon: &str,
    flap: FlapType,
    modifiers: &[Modifier],
    options: ExplainOptions,
) -> anyhow::Result<()> {
    let attending = registry.attending_for_surgeon(surgeon);
    let ctx = CaseContext::new(attending, flap).with_modifiers(modifiers.iter().copied());
    let mut stdout = std::io::stdout().lock();
    write_explain(&mut stdout, registry, &ctx, options)
}

pub fn write_explain(
    out: &mut impl Write,
    registry: &ConfigRegistry,
    ctx: &CaseContext,
    options: ExplainOptions,
) -> anyhow::Result<()> {
    let resolver = OverrideResolver::new(registry);
    let profile = resolver.attending(ctx);
    let renderer = TemplateRenderer::for_case(profile, ctx);

    writeln!(out, "Attending:  {} ({})", profile.display_name, profile.key)?;
    writeln!(out, "Flap:       {}", ctx.flap)?;
    writeln!(out, "Modifiers:  {}", ctx.modifiers.labels())?;
    let chain: Vec<String> = OverrideResolver::precedence_chain(ctx)
        .iter()
        .map(Provenance::to_string)
        .collect();
    writeln!(out, "Precedence: {}", chain.join(" > "))?;
    writeln!(out)?;

    let sections: Vec<_> = resolver
        .resolve_all(ctx)
        .into_iter()
        .filter(|s| !options.overrides_only || s.provenance.is_override())
        .collect();

    if sections.is_empty() {
        writeln!(out, "No sections overridden; every section uses the base plan.")?;
        return Ok(());
    }

    let layers: Vec<String> = sections
        .iter()
        .map(|s| s.provenance.describe(&profile.key))
        .collect();
    let key_w = sections.iter().map(|s| s.key.len()).max().unwrap_or(7).max(7);
    let layer_w = layers.iter().map(String::len).max().unwrap_or(5).max(5);

    writeln!(out, "{:<key_w$}  {:<layer_w$}  ITEMS", "SECTION", "LAYER")?;
    writeln!(out, "{}  {}  -----", "-".repeat(key_w), "-".repeat(layer_w))?;

    for (section, layer) in sections.iter().zip(&layers) {
        writeln!(
            out,
            "{:<key_w$}  {:<layer_w$}  {}",
            section.key,
            layer,
            section.content.len()
        )?;
        if options.content {
            for (key, text) in renderer.render_content(&section.content).iter() {
                writeln!(out, "    {key}: {text}")?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explain(ctx: &CaseContext, options: ExplainOptions) -> String {
        let registry = ConfigRegistry::embedded();
        let mut buf = Vec::new();
        write_explain(&mut buf, &registry, ctx, options).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn lists_every_section_with_its_layer() {
        let ctx = CaseContext::new("Eid", FlapType::Rfff).with_modifier(Modifier::GTube);
        let out = explain(&ctx, ExplainOptions::default());
        assert!(out.contains("Attending:  Dr. Eid (Eid)"));
        assert!(out.contains("Modifiers:  G tube"));
        assert!(out.contains("Precedence: attendingModifier(gTube) > modifierGeneric(gTube)"));
        let gi = out
            .lines()
            .find(|l| l.starts_with("gastrointestinal "))
            .unwrap();
        assert!(gi.contains("gTube"), "unexpected row: {gi}");
        assert!(out.lines().any(|l| l.starts_with("hematology ") && l.contains("Base Plan")));
    }

    #[test]
    fn overrides_only_hides_base_sections() {
        let ctx = CaseContext::new("Gleysteen", FlapType::Alt).with_modifier(Modifier::Diabetes);
        let out = explain(
            &ctx,
            ExplainOptions {
                overrides_only: true,
                ..Default::default()
            },
        );
        assert!(out.lines().any(|l| l.starts_with("endocrine ")));
        assert!(!out.contains("Base Plan"));
    }

    #[test]
    fn overrides_only_with_nothing_overridden() {
        let ctx = CaseContext::new("Wood", FlapType::Alt);
        let out = explain(
            &ctx,
            ExplainOptions {
                overrides_only: true,
                ..Default::default()
            },
        );
        assert!(out.contains("No sections overridden"));
    }

    #[test]
    fn content_prints_templated_items() {
        let ctx = CaseContext::new("Eid", FlapType::Fibula);
        let out = explain(
            &ctx,
            ExplainOptions {
                content: true,
                ..Default::default()
            },
        );
        assert!(out.contains("    aspirin: Start ASA 81mg PO daily x 3 weeks"));
        assert!(!out.contains("{aspirinDuration}"));
    }
}
