//! CLI application for extracting regions of engineering blueprints.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{assemble, clip, clips, config, parse};

/// Blueprint clipper - cut regions of vector blueprints into standalone pages
#[derive(Parser)]
#[command(name = "blueclip")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect regions on every page and write one PDF of regions per page
    Parse(parse::ParseArgs),

    /// Clip one rectangle of a page into a new artifact
    Clip(clip::ClipArgs),

    /// Merge all clip artifacts of a directory into one PDF
    Assemble(assemble::AssembleArgs),

    /// List clip artifacts in assembly order
    List(clips::ListArgs),

    /// Delete a clip artifact
    Delete(clips::DeleteArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Execute command
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Parse(args) => parse::run(args, config_path),
        Commands::Clip(args) => clip::run(args, config_path),
        Commands::Assemble(args) => assemble::run(args),
        Commands::List(args) => clips::list(args),
        Commands::Delete(args) => clips::delete(args),
        Commands::Config(args) => config::run(args, config_path),
    }
}
