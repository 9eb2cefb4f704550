//! List and delete commands - inspect an artifact directory.

use std::path::PathBuf;

use clap::Args;
use console::style;
use uuid::Uuid;

use blueclip_core::ArtifactStore;

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// Directory holding the clip artifacts
    #[arg(required = true)]
    clips_dir: PathBuf,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

/// Arguments for the delete command.
#[derive(Args)]
pub struct DeleteArgs {
    /// Directory holding the clip artifacts
    #[arg(required = true)]
    clips_dir: PathBuf,

    /// Artifact id
    #[arg(required = true)]
    id: Uuid,
}

pub fn list(args: ListArgs) -> anyhow::Result<()> {
    if !args.clips_dir.is_dir() {
        anyhow::bail!("Clip directory not found: {}", args.clips_dir.display());
    }
    let artifacts = ArtifactStore::open(&args.clips_dir)?.artifacts()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&artifacts)?);
        return Ok(());
    }

    if artifacts.is_empty() {
        println!("{} No clips in {}", style("ℹ").blue(), args.clips_dir.display());
        return Ok(());
    }

    println!(
        "{:>4}  {:<36}  {:>4}  {:<20}",
        style("#").bold(),
        style("ID").bold(),
        style("PAGE").bold(),
        style("CREATED").bold()
    );
    for artifact in &artifacts {
        println!(
            "{:>4}  {:<36}  {:>4}  {:<20}",
            artifact.sequence,
            artifact.id,
            artifact.page_number,
            artifact.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}

pub fn delete(args: DeleteArgs) -> anyhow::Result<()> {
    let mut store = ArtifactStore::open(&args.clips_dir)?;
    let artifact = store.remove(args.id)?;

    println!(
        "{} Deleted {} ({})",
        style("✓").green(),
        artifact.id,
        artifact.file
    );

    Ok(())
}
