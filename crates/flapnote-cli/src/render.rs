//! Document rendering for the terminal and for files.
//!
//! Markdown for people, JSON for anything downstream. The JSON form carries
//! the registry digest and timestamp alongside each document for audit.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use flapnote_core::assembler::{Document, DocumentSection, NoteSet, SectionSource};

/// Short form of the registry digest for headers.
fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

/// Render one document as Markdown.
pub fn markdown(doc: &Document, notes: &NoteSet) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_markdown(&mut out, doc, notes);
    out
}

fn write_markdown(out: &mut impl fmt::Write, doc: &Document, notes: &NoteSet) -> fmt::Result {
    writeln!(out, "# {}", doc.title)?;
    writeln!(
        out,
        "\n_Generated {} · registry {}_",
        notes.generated_at.format("%Y-%m-%d %H:%M UTC"),
        short_digest(&notes.registry_digest)
    )?;
    for section in &doc.sections {
        writeln!(out)?;
        write_section(out, section, &notes.attending)?;
    }
    Ok(())
}

fn write_section(
    out: &mut impl fmt::Write,
    section: &DocumentSection,
    attending: &str,
) -> fmt::Result {
    writeln!(out, "## {}\n", section.title)?;
    for item in &section.items {
        match &item.label {
            Some(label) => writeln!(out, "- **{label}:** {}", item.text)?,
            None => writeln!(out, "- {}", item.text)?,
        }
    }
    if let SectionSource::Plan(provenance) = section.source {
        if provenance.is_override() {
            writeln!(out, "\n_Source: {}_", provenance.describe(attending))?;
        }
    }
    if section.needs_attention() {
        let tokens: Vec<String> = section
            .unresolved_tokens
            .iter()
            .map(|t| format!("`{{{t}}}`"))
            .collect();
        writeln!(out, "\n> **Needs attention:** unresolved {}", tokens.join(", "))?;
    }
    Ok(())
}

/// Render both documents as Markdown, separated by a rule.
pub fn markdown_all(notes: &NoteSet) -> String {
    notes
        .documents()
        .iter()
        .map(|doc| markdown(doc, notes))
        .collect::<Vec<_>>()
        .join("\n---\n\n")
}

/// A single document with the audit fields of its note set.
#[derive(Serialize)]
struct DocumentEnvelope<'a> {
    attending: &'a str,
    registry_digest: &'a str,
    generated_at: DateTime<Utc>,
    document: &'a Document,
}

/// Render one document as pretty JSON.
pub fn json(doc: &Document, notes: &NoteSet) -> Result<String> {
    let envelope = DocumentEnvelope {
        attending: &notes.attending,
        registry_digest: &notes.registry_digest,
        generated_at: notes.generated_at,
        document: doc,
    };
    serde_json::to_string_pretty(&envelope).context("failed to serialize document")
}

/// Render the whole note set as pretty JSON.
pub fn json_all(notes: &NoteSet) -> Result<String> {
    serde_json::to_string_pretty(notes).context("failed to serialize notes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flapnote_core::models::{FlapType, Modifier};
    use flapnote_core::registry::ConfigRegistry;
    use flapnote_core::{CaseContext, NoteAssembler};

    fn notes(ctx: &CaseContext) -> NoteSet {
        let registry = ConfigRegistry::embedded();
        NoteAssembler::new(&registry).assemble(ctx)
    }

    #[test]
    fn markdown_has_titles_and_labels() {
        let notes = notes(&CaseContext::new("Gleysteen", FlapType::Fibula));
        let md = markdown(&notes.plan_of_day, &notes);
        assert!(md.starts_with("# FREE FLAP PLAN OF THE DAY\n"));
        assert!(md.contains("## Nursing\n"));
        assert!(md.contains("- **Underbody warmer:** Yes\n"));
    }

    #[test]
    fn markdown_marks_overridden_sections() {
        let ctx = CaseContext::new("Eid", FlapType::Rfff).with_modifier(Modifier::OralCavityAerodigestive);
        let notes = notes(&ctx);
        let md = markdown(&notes.post_op_course, &notes);
        assert!(md.contains("_Source: Eid (oralCavityAerodigestive)_"));
        assert!(md.contains("_Source: oralCavityAerodigestive_"));
        assert!(!md.contains("_Source: Base Plan_"));
    }

    #[test]
    fn json_envelope_carries_digest() {
        let notes = notes(&CaseContext::new("Wood", FlapType::Alt));
        let value: serde_json::Value =
            serde_json::from_str(&json(&notes.post_op_course, &notes).unwrap()).unwrap();
        assert_eq!(value["registry_digest"], notes.registry_digest.as_str());
        assert_eq!(value["document"]["kind"], "postOpCourse");
    }

    #[test]
    fn markdown_all_joins_both_documents() {
        let notes = notes(&CaseContext::new("Wood", FlapType::Alt));
        let md = markdown_all(&notes);
        assert!(md.contains("# FREE FLAP PLAN OF THE DAY"));
        assert!(md.contains("# ANTICIPATED POST-OPERATIVE COURSE"));
        assert!(md.contains("\n---\n"));
    }
}
