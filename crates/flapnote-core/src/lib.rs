//! Free flap planning notes built from layered configuration.
//!
//! A [`ConfigRegistry`] holds the base plan plus attending, modifier and
//! flap-specific overrides. The [`OverrideResolver`] picks one layer per
//! section for a [`CaseContext`], the [`TemplateRenderer`] fills in
//! case-specific placeholders, and the [`NoteAssembler`] composes the plan of
//! the day and the anticipated post-operative course.

pub mod assembler;
pub mod case;
pub mod models;
pub mod registry;
pub mod resolver;
pub mod template;

pub use assembler::{
    Document, DocumentItem, DocumentKind, DocumentSection, FlapCare, FlapCareSource,
    NoteAssembler, NoteSet, SectionSource,
};
pub use case::{CaseContext, CaseFacts, CaseParseError, CaseToml, parse_case_json, parse_case_toml};
pub use models::{FlapType, Modifier, ModifierFlags, ModifierSet, Provenance};
pub use registry::{ConfigRegistry, RegistryParseError, SectionContent, parse_registry_toml};
pub use resolver::{OverrideResolver, ResolveError, ResolvedSection};
pub use template::TemplateRenderer;
