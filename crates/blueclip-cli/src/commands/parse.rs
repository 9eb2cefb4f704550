//! Parse command - auto-detect regions on every page.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use blueclip_core::{ClipEngine, PageReport, SourceDocument, VectorDocument};

use super::config;

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "Blueprint")]
    output_dir: PathBuf,

    /// Only parse this page (1-based)
    #[arg(short, long)]
    page: Option<usize>,

    /// Neighborhood radius (overrides config)
    #[arg(long)]
    eps: Option<f64>,

    /// Minimum points per core neighborhood (overrides config)
    #[arg(long)]
    min_samples: Option<usize>,

    /// Include text span corners in the clustering input
    #[arg(long)]
    text_points: bool,

    /// Include the corners of rotated rectangles
    #[arg(long)]
    expand_quads: bool,

    /// Write scatter_<n>.png diagnostics
    #[arg(long)]
    scatter: bool,

    /// Skip the bbox_<n>.pdf overlays
    #[arg(long)]
    no_overlay: bool,

    /// Print a JSON summary instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct PageSummary {
    page: usize,
    regions: usize,
    noise: usize,
    failures: Vec<String>,
    files: Vec<PathBuf>,
}

impl From<&PageReport> for PageSummary {
    fn from(report: &PageReport) -> Self {
        Self {
            page: report.clips.page_index + 1,
            regions: report.clips.rendered_count(),
            noise: report.clips.noise,
            failures: report
                .clips
                .failures
                .iter()
                .map(|f| format!("region {}: {}", f.label, f.error))
                .collect(),
            files: report.files.clone(),
        }
    }
}

pub fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = config::load(config_path)?;
    if let Some(eps) = args.eps {
        config.clustering.eps = eps;
    }
    if let Some(min_samples) = args.min_samples {
        config.clustering.min_samples = min_samples;
    }
    config.extraction.include_text_points |= args.text_points;
    config.extraction.expand_quads |= args.expand_quads;
    config.output.write_scatter |= args.scatter;
    if args.no_overlay {
        config.output.write_overlay = false;
    }
    let engine = ClipEngine::new(config)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    info!("Parsing {}", args.input.display());
    let source = SourceDocument::open(&args.input)?;

    let pages: Vec<usize> = match args.page {
        Some(0) => anyhow::bail!("Page numbers start at 1"),
        Some(page) => vec![page - 1],
        None => (0..source.page_count()).collect(),
    };

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages")?
            .progress_chars("=>-"),
    );

    let mut reports = Vec::with_capacity(pages.len());
    for page_index in pages {
        reports.push(engine.parse_page(&source, page_index, &args.output_dir)?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let summaries: Vec<PageSummary> = reports.iter().map(PageSummary::from).collect();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            println!(
                "{} Page {}: {} regions, {} noise points",
                style("✓").green(),
                summary.page,
                summary.regions,
                summary.noise
            );
            for failure in &summary.failures {
                println!("  {} {}", style("⚠").yellow(), failure);
            }
        }
        let regions: usize = summaries.iter().map(|s| s.regions).sum();
        println!(
            "{} Wrote {} regions to {}",
            style("ℹ").blue(),
            regions,
            args.output_dir.display()
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
