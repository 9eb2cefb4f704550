//! Clip command - render one selected rectangle into a new artifact.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use tracing::info;

use blueclip_core::{
    ArtifactStore, ClipEngine, ClipPayload, ClipResponse, SizingMode, SourceDocument,
};

use super::config;

/// Arguments for the clip command.
#[derive(Args)]
pub struct ClipArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Directory the artifact is written to
    #[arg(short = 'd', long)]
    clips_dir: PathBuf,

    /// Clip request as JSON (file path, or '-' for stdin)
    #[arg(long, conflicts_with_all = ["page", "rect"])]
    request: Option<String>,

    /// Page number (1-based)
    #[arg(short, long, required_unless_present = "request")]
    page: Option<i64>,

    /// Selection corners in display coordinates: startX,startY,endX,endY
    #[arg(short, long, value_parser = parse_rect, required_unless_present = "request")]
    rect: Option<[f64; 4]>,

    /// Display scale the selection was drawn at
    #[arg(short, long, default_value_t = 1.0)]
    scale: f64,

    /// Fixed output page size, e.g. 640x480
    #[arg(long, value_parser = parse_size)]
    fixed: Option<(f64, f64)>,
}

fn parse_rect(value: &str) -> Result<[f64; 4], String> {
    let numbers = value
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{}: {}", v, e)))
        .collect::<Result<Vec<f64>, String>>()?;
    <[f64; 4]>::try_from(numbers).map_err(|_| "expected four comma-separated numbers".to_string())
}

fn parse_size(value: &str) -> Result<(f64, f64), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let parse = |v: &str| v.trim().parse::<f64>().map_err(|e| format!("{}: {}", v, e));
    Ok((parse(width)?, parse(height)?))
}

impl ClipArgs {
    fn payload(&self) -> anyhow::Result<ClipPayload> {
        if let Some(source) = &self.request {
            let content = if source == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                fs::read_to_string(source)?
            };
            return Ok(serde_json::from_str(&content)?);
        }

        let (Some(page_number), Some([start_x, start_y, end_x, end_y])) = (self.page, self.rect)
        else {
            anyhow::bail!("--page and --rect are required without --request");
        };
        Ok(ClipPayload {
            page_number,
            start_x,
            start_y,
            end_x,
            end_y,
            scale: self.scale,
            sizing_mode: if self.fixed.is_some() {
                SizingMode::FixedSize
            } else {
                SizingMode::BoundingBox
            },
            fixed_width: self.fixed.map(|(w, _)| w),
            fixed_height: self.fixed.map(|(_, h)| h),
        })
    }
}

pub fn run(args: ClipArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let result = clip(&args, config_path);

    let response = match &result {
        Ok(id) => ClipResponse::ok(*id),
        Err(e) => ClipResponse::failed(e),
    };
    println!("{}", serde_json::to_string(&response)?);

    result.map(|_| ())
}

fn clip(args: &ClipArgs, config_path: Option<&str>) -> anyhow::Result<uuid::Uuid> {
    let config = config::load(config_path)?;
    let engine = ClipEngine::new(config)?;
    let request = args.payload()?.into_request()?;

    let source = SourceDocument::open(&args.input)?;
    let mut store = ArtifactStore::open(&args.clips_dir)?;
    let artifact = engine.clip(&source, &request, &mut store)?;

    info!("Clip written to {}", artifact.path.display());
    Ok(artifact.id)
}
