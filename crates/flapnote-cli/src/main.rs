mod case_cmd;
mod config;
mod explain_cmd;
mod generate_cmd;
mod loader;
mod registry_cmds;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use flapnote_core::models::{FlapType, Modifier};

use config::OutputFormat;

#[derive(Parser)]
#[command(name = "flapnote", about = "Free flap plan-of-the-day and post-op course generator")]
struct Cli {
    /// Registry TOML to use (overrides FLAPNOTE_REGISTRY env var and config file)
    #[arg(long, global = true)]
    registry: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a flapnote config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Generate the plan of the day and post-op course for a case file
    Generate {
        /// Path to the case file (TOML, or JSON with a .json extension)
        case: PathBuf,
        /// Output format (overrides FLAPNOTE_FORMAT env var and config file)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Directory to write one file per document (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show which layer wins each section for a surgeon, flap and modifiers
    Explain {
        /// Surgeon name as written on a case (e.g. "Dr. Eid")
        #[arg(long)]
        surgeon: String,
        /// Flap type (ALT, Fibula, RFFF, Scapula, Jejunal, LatissimusDorsi, Other)
        #[arg(long)]
        flap: FlapType,
        /// Active modifier (repeatable, e.g. --modifier gTube)
        #[arg(long = "modifier")]
        modifiers: Vec<Modifier>,
        /// Also print the resolved, templated items of each section
        #[arg(long)]
        content: bool,
        /// Hide sections that fell through to the base plan
        #[arg(long)]
        overrides_only: bool,
    },
    /// Registry inspection
    Registry {
        #[command(subcommand)]
        command: RegistryCommands,
    },
    /// Case file helpers
    Case {
        #[command(subcommand)]
        command: CaseCommands,
    },
}

#[derive(Subcommand)]
pub enum RegistryCommands {
    /// Parse and validate a registry TOML file
    Validate {
        /// Path to the registry TOML file
        file: PathBuf,
    },
    /// Print the SHA-256 digest of a registry (the configured one when omitted)
    Digest {
        /// Path to the registry TOML file
        file: Option<PathBuf>,
    },
    /// List base plan sections with their override coverage
    Sections,
    /// Print the embedded registry source
    Dump,
}

#[derive(Subcommand)]
pub enum CaseCommands {
    /// Print a commented case file skeleton
    Template,
}

/// Execute the `flapnote init` command: write a default config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let path = config::write_default_config()?;

    println!("Config written to {}", path.display());
    println!("  output.format = {}", OutputFormat::default());
    println!();
    println!("Next: run `flapnote case template > case.toml` and `flapnote generate case.toml`.");

    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Documents go to stdout; diagnostics stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            cmd_init(force)?;
        }
        Commands::Generate {
            case,
            format,
            output,
        } => {
            let resolved = config::FlapnoteConfig::resolve(cli.registry.as_deref(), format)?;
            generate_cmd::run_generate(&resolved, &case, output.as_deref())?;
        }
        Commands::Explain {
            surgeon,
            flap,
            modifiers,
            content,
            overrides_only,
        } => {
            let resolved = config::FlapnoteConfig::resolve(cli.registry.as_deref(), None)?;
            let registry = loader::load_registry(resolved.registry_path.as_deref())?;
            let options = explain_cmd::ExplainOptions {
                content,
                overrides_only,
            };
            explain_cmd::run_explain(&registry, &surgeon, flap, &modifiers, options)?;
        }
        Commands::Registry { command } => {
            let resolved = config::FlapnoteConfig::resolve(cli.registry.as_deref(), None)?;
            registry_cmds::run_registry_command(command, &resolved)?;
        }
        Commands::Case { command } => {
            case_cmd::run_case_command(command)?;
        }
    }

    Ok(())
}
