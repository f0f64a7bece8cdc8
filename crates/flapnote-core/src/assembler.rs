//! Note assembly: the plan of the day and the anticipated post-operative
//! course.
//!
//! The assembler resolves every Base Plan section, renders placeholders, and
//! wraps the result in case metadata blocks. Problems are recorded per
//! section; one section with an unresolved placeholder never stops the rest
//! of the document from being produced.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::case::CaseContext;
use crate::models::Provenance;
use crate::registry::{AttendingProfile, ConfigRegistry};
use crate::resolver::{OverrideResolver, ResolvedSection};
use crate::template::{self, TemplateRenderer};

/// Shown wherever the case leaves a value blank.
pub const NEEDS_ATTENTION: &str = "***";

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    PlanOfDay,
    PostOpCourse,
}

impl DocumentKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::PlanOfDay => "FREE FLAP PLAN OF THE DAY",
            Self::PostOpCourse => "ANTICIPATED POST-OPERATIVE COURSE",
        }
    }

    /// File name stem used when documents are written to disk.
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::PlanOfDay => "plan-of-day",
            Self::PostOpCourse => "post-op-course",
        }
    }
}

/// Where a document section's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "provenance", rename_all = "camelCase")]
pub enum SectionSource {
    CaseMetadata,
    FlapCare,
    Discharge,
    Plan(Provenance),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentItem {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub text: String,
}

impl DocumentItem {
    fn labelled(key: &str, label: &str, text: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            label: Some(label.to_string()),
            text: text.into(),
        }
    }

    fn plain(key: &str, text: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            label: None,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSection {
    pub key: String,
    pub title: String,
    pub items: Vec<DocumentItem>,
    pub source: SectionSource,
    /// Placeholders left in the rendered items.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved_tokens: Vec<String>,
}

impl DocumentSection {
    fn new(key: &str, title: &str, source: SectionSource, items: Vec<DocumentItem>) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            items,
            source,
            unresolved_tokens: Vec::new(),
        }
    }

    pub fn needs_attention(&self) -> bool {
        !self.unresolved_tokens.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub kind: DocumentKind,
    pub title: String,
    pub sections: Vec<DocumentSection>,
}

impl Document {
    pub fn section(&self, key: &str) -> Option<&DocumentSection> {
        self.sections.iter().find(|s| s.key == key)
    }
}

/// Both documents for one case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteSet {
    pub plan_of_day: Document,
    pub post_op_course: Document,
    /// Attending profile key the notes were resolved against.
    pub attending: String,
    pub registry_digest: String,
    pub generated_at: DateTime<Utc>,
}

impl NoteSet {
    pub fn documents(&self) -> [&Document; 2] {
        [&self.plan_of_day, &self.post_op_course]
    }
}

// ---------------------------------------------------------------------------
// Flap care
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FlapCareSource {
    /// The attending's per-flap preference.
    Attending,
    /// The registry's default for the flap type.
    FlapDefault,
}

/// Flap-specific care text with the source of each preference-driven field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlapCare {
    pub extremity_care: String,
    pub extremity_care_source: FlapCareSource,
    pub wound_care: String,
    pub wound_care_source: FlapCareSource,
    /// Durable medical equipment, always the flap default.
    pub dme: String,
}

fn pick(preferred: Option<&str>, fallback: &str) -> (String, FlapCareSource) {
    match preferred.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => (text.to_string(), FlapCareSource::Attending),
        None => (fallback.to_string(), FlapCareSource::FlapDefault),
    }
}

fn or_marker(value: Option<&str>) -> &str {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NEEDS_ATTENTION)
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Builds [`NoteSet`]s from a shared registry.
#[derive(Debug, Clone, Copy)]
pub struct NoteAssembler<'r> {
    resolver: OverrideResolver<'r>,
}

impl<'r> NoteAssembler<'r> {
    pub fn new(registry: &'r ConfigRegistry) -> Self {
        Self {
            resolver: OverrideResolver::new(registry),
        }
    }

    fn registry(&self) -> &'r ConfigRegistry {
        self.resolver.registry()
    }

    /// Assemble both documents for `ctx`.
    pub fn assemble(&self, ctx: &CaseContext) -> NoteSet {
        let attending = self.resolver.attending(ctx);
        let plan_of_day = self.plan_of_day_for(attending, ctx);
        let post_op_course = self.post_op_course_for(attending, ctx);
        NoteSet {
            plan_of_day,
            post_op_course,
            attending: attending.key.clone(),
            registry_digest: self.registry().digest().to_string(),
            generated_at: Utc::now(),
        }
    }

    pub fn plan_of_day(&self, ctx: &CaseContext) -> Document {
        self.plan_of_day_for(self.resolver.attending(ctx), ctx)
    }

    pub fn post_op_course(&self, ctx: &CaseContext) -> Document {
        self.post_op_course_for(self.resolver.attending(ctx), ctx)
    }

    /// Extremity and wound care: the attending's per-flap preference when
    /// present, else the flap default.
    pub fn flap_care(&self, ctx: &CaseContext) -> FlapCare {
        self.flap_care_for(self.resolver.attending(ctx), ctx)
    }

    fn flap_care_for(&self, attending: &AttendingProfile, ctx: &CaseContext) -> FlapCare {
        let defaults = self.registry().flap_config(ctx.flap);
        let pref = attending.flap_preference(ctx.flap);
        let (extremity_care, extremity_care_source) = pick(
            pref.and_then(|p| p.extremity_care.as_deref()),
            &defaults.extremity_care,
        );
        let (wound_care, wound_care_source) = pick(
            pref.and_then(|p| p.wound_care.as_deref()),
            &defaults.wound_care,
        );
        FlapCare {
            extremity_care,
            extremity_care_source,
            wound_care,
            wound_care_source,
            dme: defaults.dme.clone(),
        }
    }

    // -- plan of the day ----------------------------------------------------

    fn plan_of_day_for(&self, attending: &AttendingProfile, ctx: &CaseContext) -> Document {
        let patient = &ctx.facts.patient;
        let op = &ctx.facts.intraop;
        let meta = SectionSource::CaseMetadata;

        let date = patient.date.as_ref().map(ToString::to_string);
        let procedures = patient.planned_procedures.join(", ");
        let wound_vac = match (op.wound_vac.as_deref(), attending.wound_vac.get(&ctx.flap)) {
            (Some(answer), Some(note)) if !answer.trim().is_empty() => {
                format!("{} ({note})", answer.trim())
            }
            (answer, _) => or_marker(answer).to_string(),
        };

        let sections = vec![
            DocumentSection::new(
                "patient",
                "Patient",
                meta,
                vec![
                    DocumentItem::labelled("name", "Patient", or_marker(patient.name.as_deref())),
                    DocumentItem::labelled("date", "Date", or_marker(date.as_deref())),
                    DocumentItem::labelled("mrn", "MRN", or_marker(patient.mrn.as_deref())),
                ],
            ),
            DocumentSection::new(
                "history",
                "History (one line)",
                meta,
                vec![DocumentItem::plain(
                    "diagnosis",
                    or_marker(patient.diagnosis.as_deref()),
                )],
            ),
            DocumentSection::new(
                "plannedProcedures",
                "Planned Procedures",
                meta,
                vec![DocumentItem::plain(
                    "procedures",
                    or_marker(Some(procedures.as_str())),
                )],
            ),
            DocumentSection::new(
                "anesthesia",
                "Anesthesia",
                meta,
                vec![
                    DocumentItem::labelled(
                        "airway",
                        "Recommended airway",
                        or_marker(op.anticipated_airway.as_deref()),
                    ),
                    DocumentItem::labelled(
                        "ettPosition",
                        "ETT Positioning",
                        or_marker(op.ett_position.as_deref()),
                    ),
                    DocumentItem::labelled(
                        "protectedLimbs",
                        "Protected limbs",
                        or_marker(op.protected_limbs.as_deref()),
                    ),
                    DocumentItem::labelled(
                        "paralyticOk",
                        "Paralytic ok",
                        or_marker(op.paralytic_ok.as_deref()),
                    ),
                    DocumentItem::labelled(
                        "pressorsOk",
                        "Pressors ok",
                        or_marker(op.pressors_ok.as_deref()),
                    ),
                    DocumentItem::labelled(
                        "antibiotics",
                        "Antibiotics",
                        or_marker(op.preop_antibiotics.as_deref()),
                    ),
                    DocumentItem::labelled(
                        "bloodLoss",
                        "Expected blood loss",
                        or_marker(op.expected_blood_loss.as_deref()),
                    ),
                    DocumentItem::labelled(
                        "postopAirway",
                        "Predicted postoperative airway",
                        or_marker(op.anticipated_airway.as_deref()),
                    ),
                    DocumentItem::labelled(
                        "patientPosition",
                        "Patient Position",
                        or_marker(op.patient_position.as_deref()),
                    ),
                    DocumentItem::labelled(
                        "tablePosition",
                        "Table Position",
                        or_marker(op.table_position.as_deref()),
                    ),
                ],
            ),
            DocumentSection::new(
                "nursing",
                "Nursing",
                meta,
                vec![
                    DocumentItem::labelled("underbodyWarmer", "Underbody warmer", "Yes"),
                    DocumentItem::labelled(
                        "setups",
                        "Number of setups",
                        or_marker(op.number_of_setups.as_deref()),
                    ),
                    DocumentItem::labelled("saw", "Saw", or_marker(op.saw.as_deref())),
                    DocumentItem::labelled("drill", "Drill", or_marker(op.drill.as_deref())),
                    DocumentItem::labelled(
                        "hnPlating",
                        "H&N plating",
                        or_marker(op.hn_plating.as_deref()),
                    ),
                    DocumentItem::labelled(
                        "extremityPlating",
                        "Extremity plating",
                        or_marker(op.extremity_plating.as_deref()),
                    ),
                    DocumentItem::labelled(
                        "platingCompany",
                        "Plating company",
                        or_marker(op.plating_company.as_deref()),
                    ),
                    DocumentItem::labelled(
                        "stsg",
                        "Split thickness skin graft",
                        or_marker(op.stsg.as_deref()),
                    ),
                    DocumentItem::labelled(
                        "trachSize",
                        "Anticipated trach size",
                        or_marker(op.anticipated_trach_size.as_deref()),
                    ),
                    DocumentItem::labelled("woundVac", "Wound vac", wound_vac),
                ],
            ),
            DocumentSection::new(
                "otherNotes",
                "Other Notes",
                meta,
                vec![DocumentItem::plain("notes", NEEDS_ATTENTION)],
            ),
        ];

        let kind = DocumentKind::PlanOfDay;
        info!(document = kind.file_stem(), attending = %attending.key, "assembled document");
        Document {
            kind,
            title: kind.title().to_string(),
            sections,
        }
    }

    // -- post-op course -----------------------------------------------------

    fn post_op_course_for(&self, attending: &AttendingProfile, ctx: &CaseContext) -> Document {
        let renderer = TemplateRenderer::for_case(attending, ctx);
        let mut sections = Vec::with_capacity(self.registry().base_plan().len() + 3);

        let surgeon = ctx
            .facts
            .surgeons
            .reconstructive
            .as_deref()
            .unwrap_or(attending.display_name.as_str());
        sections.push(DocumentSection::new(
            "caseOverview",
            "Case Overview",
            SectionSource::CaseMetadata,
            vec![
                DocumentItem::labelled("surgeon", "Reconstructive Surgeon", surgeon),
                DocumentItem::labelled("flap", "Flap Type", ctx.flap.key()),
                DocumentItem::labelled("modifiers", "Modifiers", ctx.modifiers.labels()),
            ],
        ));

        let care = self.flap_care_for(attending, ctx);
        sections.push(DocumentSection::new(
            "flapSpecificCare",
            "Flap-Specific Care",
            SectionSource::FlapCare,
            vec![
                DocumentItem::labelled("extremityCare", "Extremity Care", care.extremity_care),
                DocumentItem::labelled("dme", "DME", care.dme),
                DocumentItem::labelled("woundCare", "Wound Care", care.wound_care),
            ],
        ));

        for resolved in self.resolver.resolve_all(ctx) {
            sections.push(render_plan_section(&renderer, resolved));
        }

        sections.push(discharge_section(attending, ctx));

        let kind = DocumentKind::PostOpCourse;
        let overridden = sections
            .iter()
            .filter(|s| matches!(s.source, SectionSource::Plan(p) if p.is_override()))
            .count();
        info!(
            document = kind.file_stem(),
            attending = %attending.key,
            flap = %ctx.flap,
            overridden,
            "assembled document"
        );
        Document {
            kind,
            title: kind.title().to_string(),
            sections,
        }
    }
}

fn render_plan_section(renderer: &TemplateRenderer, resolved: ResolvedSection) -> DocumentSection {
    let items: Vec<DocumentItem> = resolved
        .content
        .iter()
        .map(|(key, text)| DocumentItem::plain(key, renderer.render(text)))
        .collect();

    let mut unresolved: Vec<String> = Vec::new();
    for item in &items {
        for token in TemplateRenderer::unresolved_tokens(&item.text) {
            if !unresolved.contains(&token) {
                unresolved.push(token);
            }
        }
    }
    if !unresolved.is_empty() {
        warn!(
            section = %resolved.key,
            tokens = ?unresolved,
            "section has unresolved placeholders"
        );
    }

    let mut section = DocumentSection::new(
        &resolved.key,
        &resolved.title,
        SectionSource::Plan(resolved.provenance),
        items,
    );
    section.unresolved_tokens = unresolved;
    section
}

fn discharge_section(attending: &AttendingProfile, ctx: &CaseContext) -> DocumentSection {
    let mut items = vec![DocumentItem::labelled(
        "npo",
        "NPO duration",
        template::npo_duration(ctx),
    )];

    let swallow = template::swallow_study(ctx);
    if !swallow.is_empty() {
        items.push(DocumentItem::labelled("swallowStudy", "Swallow study", swallow));
    }
    items.push(DocumentItem::labelled(
        "doppler",
        "Doppler",
        attending.doppler_management.as_str(),
    ));
    items.push(DocumentItem::labelled(
        "stapleRemoval",
        "Staple removal",
        template::staple_removal(attending, ctx),
    ));
    items.push(DocumentItem::labelled(
        "incisionCare",
        "Incision care",
        attending.discharge_wound_care.as_str(),
    ));
    if ctx.facts.intraop.plans_stsg() {
        items.push(DocumentItem::labelled(
            "stsgDonorSite",
            "STSG donor site",
            attending.stsg_management.as_str(),
        ));
    }
    if let Some(restrictions) = &attending.restrictions {
        items.push(DocumentItem::labelled(
            "restrictions",
            "Restrictions",
            restrictions.as_str(),
        ));
    }
    for (key, label, text) in ctx.facts.discharge.entries() {
        items.push(DocumentItem::labelled(key, label, text));
    }

    DocumentSection::new(
        "dischargePlanning",
        "Discharge Planning",
        SectionSource::Discharge,
        items,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
