//! Assemble command - merge clip artifacts into one PDF.

use std::path::PathBuf;

use clap::Args;
use console::style;

use blueclip_core::ArtifactStore;

/// Arguments for the assemble command.
#[derive(Args)]
pub struct AssembleArgs {
    /// Directory holding the clip artifacts
    #[arg(required = true)]
    clips_dir: PathBuf,

    /// Output PDF (replaced if it exists)
    #[arg(short, long, default_value = "clips.pdf")]
    output: PathBuf,
}

pub fn run(args: AssembleArgs) -> anyhow::Result<()> {
    if !args.clips_dir.is_dir() {
        anyhow::bail!("Clip directory not found: {}", args.clips_dir.display());
    }

    let store = ArtifactStore::open(&args.clips_dir)?;
    let pages = store.assemble(&args.output)?;

    println!(
        "{} Assembled {} pages into {}",
        style("✓").green(),
        pages,
        args.output.display()
    );

    Ok(())
}
