use std::io::Write;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use flapnote_core::NoteAssembler;

use crate::config::{FlapnoteConfig, OutputFormat};
use crate::loader;
use crate::render;

/// Execute `flapnote generate`: assemble both documents for a case file.
///
/// With `output_dir`, writes `plan-of-day.<ext>` and `post-op-course.<ext>`
/// into it; otherwise prints both documents to stdout.
pub fn run_generate(
    config: &FlapnoteConfig,
    case_path: &Path,
    output_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let registry = loader::load_registry(config.registry_path.as_deref())?;
    let case = loader::load_case(case_path)?;
    let ctx = case
        .into_context(&registry)
        .with_context(|| format!("invalid case file: {}", case_path.display()))?;

    let notes = NoteAssembler::new(&registry).assemble(&ctx);

    let Some(dir) = output_dir else {
        let text = match config.format {
            OutputFormat::Markdown => render::markdown_all(&notes),
            OutputFormat::Json => render::json_all(&notes)?,
        };
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", text.trim_end())?;
        return Ok(());
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create output directory: {}", dir.display()))?;

    for doc in notes.documents() {
        let path = dir
            .join(doc.kind.file_stem())
            .with_extension(config.format.extension());
        let text = match config.format {
            OutputFormat::Markdown => render::markdown(doc, &notes),
            OutputFormat::Json => render::json(doc, &notes)?,
        };
        let mut file = std::fs::File::create(&path)
            .with_context(|| format!("cannot create output file: {}", path.display()))?;
        writeln!(file, "{}", text.trim_end())
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote document");
        println!("Wrote {}", path.display());
    }

    Ok(())
}
