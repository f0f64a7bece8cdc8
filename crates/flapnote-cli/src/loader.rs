//! Registry and case file loading.
//!
//! - [`load_registry`] returns the embedded registry or parses the given file.
//! - [`load_case`] reads a case file as JSON when it has a `.json`
//!   extension, otherwise as TOML.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use flapnote_core::case::{CaseToml, parse_case_json, parse_case_toml};
use flapnote_core::registry::{ConfigRegistry, parse_registry_toml};

/// Load the registry at `path`, or the embedded one when `path` is `None`.
pub fn load_registry(path: Option<&Path>) -> Result<ConfigRegistry> {
    let Some(path) = path else {
        return Ok(ConfigRegistry::embedded());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read registry file: {}", path.display()))?;
    let registry = parse_registry_toml(&content)
        .with_context(|| format!("failed to parse registry file: {}", path.display()))?;
    debug!(path = %path.display(), digest = registry.digest(), "loaded registry");
    Ok(registry)
}

/// Read and validate a case file.
pub fn load_case(path: &Path) -> Result<CaseToml> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read case file: {}", path.display()))?;
    let case = if is_json(path) {
        parse_case_json(&content)
    } else {
        parse_case_toml(&content)
    };
    case.with_context(|| format!("failed to parse case file: {}", path.display()))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_registry_when_no_path() {
        let registry = load_registry(None).unwrap();
        assert_eq!(registry.digest(), ConfigRegistry::embedded().digest());
    }

    #[test]
    fn missing_registry_file_is_an_error() {
        let err = load_registry(Some(Path::new("/nonexistent/registry.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read registry file"));
    }

    #[test]
    fn case_format_follows_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let json = tmp.path().join("case.json");
        std::fs::write(&json, r#"{"surgeons": {"flap": "ALT"}}"#).unwrap();
        let toml_path = tmp.path().join("case.toml");
        std::fs::write(&toml_path, "[surgeons]\nflap = \"Fibula\"\n").unwrap();

        assert_eq!(load_case(&json).unwrap().surgeons.flap, "ALT");
        assert_eq!(load_case(&toml_path).unwrap().surgeons.flap, "Fibula");
    }

    #[test]
    fn invalid_case_reports_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "[surgeons]\nflap = \"Radial\"\n").unwrap();
        let msg = format!("{:#}", load_case(&path).unwrap_err());
        assert!(msg.contains("bad.toml"), "unexpected error: {msg}");
        assert!(msg.contains("Radial"), "unexpected error: {msg}");
    }
}
