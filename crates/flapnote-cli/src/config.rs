//! Configuration file management for flapnote.
//!
//! Provides a TOML-based config file at `~/.config/flapnote/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------
// Output format
// -----------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markdown => f.write_str("markdown"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = OutputFormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            _ => Err(OutputFormatParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`OutputFormat`] string.
#[derive(Debug, Clone)]
pub struct OutputFormatParseError(pub String);

impl fmt::Display for OutputFormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid output format: {:?} (expected markdown or json)", self.0)
    }
}

impl std::error::Error for OutputFormatParseError {}

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub registry: RegistrySection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RegistrySection {
    /// Registry TOML to use instead of the embedded one.
    pub path: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Written by `flapnote init`.
pub const DEFAULT_CONFIG: &str = r#"# flapnote configuration

[registry]
# Registry TOML to use instead of the embedded one.
# Overridden by --registry and FLAPNOTE_REGISTRY.
# path = "/path/to/registry.toml"

[output]
# markdown or json. Overridden by --format and FLAPNOTE_FORMAT.
format = "markdown"
"#;

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the flapnote config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/flapnote` or
/// `~/.config/flapnote`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("flapnote");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("flapnote")
}

/// Return the path to the flapnote config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns `None` if it does not exist.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Write the commented default config, creating parent dirs as needed.
pub fn write_default_config() -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    std::fs::write(&path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(path)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug, PartialEq)]
pub struct FlapnoteConfig {
    /// `None` means the embedded registry.
    pub registry_path: Option<PathBuf>,
    pub format: OutputFormat,
}

impl FlapnoteConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Registry: `cli_registry` > `FLAPNOTE_REGISTRY` env > `registry.path` > embedded
    /// - Format: `cli_format` > `FLAPNOTE_FORMAT` env > `output.format` > markdown
    pub fn resolve(cli_registry: Option<&str>, cli_format: Option<OutputFormat>) -> Result<Self> {
        let file_config = load_config()?;

        let registry_path = if let Some(path) = cli_registry {
            Some(PathBuf::from(path))
        } else if let Some(path) = non_empty_env("FLAPNOTE_REGISTRY") {
            Some(PathBuf::from(path))
        } else {
            file_config
                .as_ref()
                .and_then(|cfg| cfg.registry.path.as_deref())
                .map(PathBuf::from)
        };

        let format = if let Some(format) = cli_format {
            format
        } else if let Some(value) = non_empty_env("FLAPNOTE_FORMAT") {
            value
                .parse()
                .context("FLAPNOTE_FORMAT env var is not a valid output format")?
        } else if let Some(ref cfg) = file_config {
            cfg.output.format
        } else {
            OutputFormat::default()
        };

        Ok(Self {
            registry_path,
            format,
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
