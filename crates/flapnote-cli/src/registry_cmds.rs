use std::io::Write;
use std::path::Path;

use flapnote_core::models::{FlapType, Modifier};
use flapnote_core::registry::{self, ConfigRegistry};

use crate::RegistryCommands;
use crate::config::FlapnoteConfig;
use crate::loader;

/// Dispatch a `flapnote registry` subcommand.
pub fn run_registry_command(
    command: RegistryCommands,
    config: &FlapnoteConfig,
) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    match command {
        RegistryCommands::Validate { file } => cmd_validate(&mut stdout, &file),
        RegistryCommands::Digest { file } => {
            let path = file.as_deref().or(config.registry_path.as_deref());
            let registry = loader::load_registry(path)?;
            writeln!(stdout, "{}", registry.digest())?;
            Ok(())
        }
        RegistryCommands::Sections => {
            let registry = loader::load_registry(config.registry_path.as_deref())?;
            write_sections(&mut stdout, &registry)
        }
        RegistryCommands::Dump => {
            write!(stdout, "{}", registry::embedded_source())?;
            Ok(())
        }
    }
}

// -----------------------------------------------------------------------
// validate
// -----------------------------------------------------------------------

fn cmd_validate(out: &mut impl Write, file: &Path) -> anyhow::Result<()> {
    let registry = loader::load_registry(Some(file))?;
    write_summary(out, &registry)?;
    writeln!(out)?;
    writeln!(out, "Registry {} is valid.", file.display())?;
    Ok(())
}

fn write_summary(out: &mut impl Write, registry: &ConfigRegistry) -> anyhow::Result<()> {
    let generic = Modifier::ALL
        .into_iter()
        .flat_map(|m| registry.section_keys().filter(move |key| registry.generic_override(m, key).is_some()))
        .count();
    let flap = FlapType::ALL
        .into_iter()
        .flat_map(|f| registry.section_keys().filter(move |key| registry.flap_override(f, key).is_some()))
        .count();

    writeln!(out, "Sections:          {}", registry.base_plan().len())?;
    writeln!(
        out,
        "Attendings:        {}",
        registry.attending_keys().collect::<Vec<_>>().join(", ")
    )?;
    writeln!(out, "Default attending: {}", registry.default_attending().key)?;
    writeln!(out, "Generic overrides: {generic}")?;
    writeln!(out, "Flap overrides:    {flap}")?;
    writeln!(out, "Digest:            {}", registry.digest())?;
    Ok(())
}

// -----------------------------------------------------------------------
// sections
// -----------------------------------------------------------------------

/// One row per base section: title, item count, and every layer that can
/// replace it.
fn write_sections(out: &mut impl Write, registry: &ConfigRegistry) -> anyhow::Result<()> {
    let rows: Vec<(&str, &str, usize, String)> = registry
        .base_plan()
        .iter()
        .map(|section| {
            let key = section.key.as_str();
            (key, section.title.as_str(), section.content.len(), overriders(registry, key).join(", "))
        })
        .collect();

    let key_w = rows.iter().map(|r| r.0.len()).max().unwrap_or(7).max(7);
    let title_w = rows.iter().map(|r| r.1.len()).max().unwrap_or(5).max(5);

    writeln!(out, "{:<key_w$}  {:<title_w$}  ITEMS  OVERRIDDEN BY", "SECTION", "TITLE")?;
    for (key, title, items, by) in &rows {
        let by = if by.is_empty() { "-" } else { by.as_str() };
        writeln!(out, "{key:<key_w$}  {title:<title_w$}  {items:<5}  {by}")?;
    }
    Ok(())
}

fn overriders(registry: &ConfigRegistry, section: &str) -> Vec<String> {
    let mut layers = Vec::new();
    for profile in registry.attendings() {
        if profile.plan_overrides.for_base(section).is_some() {
            layers.push(format!("{} (base)", profile.key));
        }
        for m in Modifier::ALL {
            if profile.plan_overrides.for_modifier(m, section).is_some() {
                layers.push(format!("{} ({m})", profile.key));
            }
        }
    }
    for m in Modifier::ALL {
        if registry.generic_override(m, section).is_some() {
            layers.push(m.to_string());
        }
    }
    for f in FlapType::ALL {
        if registry.flap_override(f, section).is_some() {
            layers.push(format!("{f} flap"));
        }
    }
    layers
}
