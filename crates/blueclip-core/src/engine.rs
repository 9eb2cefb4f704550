//! Clip engine: auto-detected regions and manual clips.
//!
//! Auto mode extracts points from a page, clusters them and renders one
//! fixed-size output page per region. A region that cannot be rendered is
//! reported and skipped; the rest of the page still renders. Manual mode
//! renders exactly one caller-chosen rectangle and fails as a whole.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::artifacts::ArtifactStore;
use crate::diagnostics::write_scatter;
use crate::error::{ClipError, GeometryError, Result};
use crate::geometry::{CanvasLayout, Rect, SizingPolicy};
use crate::models::{ClipArtifact, ClipConfig, ClipRequest};
use crate::pdf::{OutputDocument, SourceDocument, VectorDocument};
use crate::region::{Clustering, DensityClusterer, PointExtractor, PointSet, Region};
use crate::render::{render_overlay, render_region};

/// Regions found on one page.
#[derive(Debug, Clone)]
pub struct DetectedRegions {
    /// Page index (0-based).
    pub page_index: usize,
    /// Visible page rectangle in document space.
    pub page_rect: Rect,
    pub points: PointSet,
    pub clustering: Clustering,
    /// Regions in label order, noise excluded.
    pub regions: Vec<Region>,
}

/// A region auto mode could not render.
#[derive(Debug)]
pub struct RegionFailure {
    pub label: usize,
    pub error: ClipError,
}

/// Outcome of auto-clipping one page.
#[derive(Debug, Default)]
pub struct AutoClipReport {
    /// Page index (0-based).
    pub page_index: usize,
    /// Bounding boxes of the rendered regions, in output page order.
    pub rendered: Vec<Rect>,
    pub failures: Vec<RegionFailure>,
    /// Points labeled as noise.
    pub noise: usize,
}

impl AutoClipReport {
    pub fn rendered_count(&self) -> usize {
        self.rendered.len()
    }
}

/// Outcome of parsing one page to files.
#[derive(Debug)]
pub struct PageReport {
    pub clips: AutoClipReport,
    /// Files written for this page.
    pub files: Vec<PathBuf>,
}

/// Orchestrates extraction, clustering and rendering.
#[derive(Debug, Clone)]
pub struct ClipEngine {
    config: ClipConfig,
    extractor: PointExtractor,
    clusterer: DensityClusterer,
}

impl ClipEngine {
    /// Create an engine, rejecting unusable configuration.
    pub fn new(config: ClipConfig) -> Result<Self> {
        config.validate()?;
        let clusterer = DensityClusterer::new(config.clustering.eps, config.clustering.min_samples)?;
        let extractor = PointExtractor::from_config(&config.extraction);

        Ok(Self {
            config,
            extractor,
            clusterer,
        })
    }

    pub fn config(&self) -> &ClipConfig {
        &self.config
    }

    /// Extract and cluster the points of one page.
    pub fn detect_regions<D: VectorDocument + ?Sized>(
        &self,
        document: &D,
        page_index: usize,
    ) -> Result<DetectedRegions> {
        let content = document.page_content(page_index)?;
        let points = self.extractor.extract(&content)?;
        let clustering = self.clusterer.cluster(points.points());
        let regions = clustering.regions(points.points());

        debug!(
            "Page {}: {} points, {} regions, {} noise",
            page_index + 1,
            points.len(),
            regions.len(),
            clustering.noise_count()
        );

        Ok(DetectedRegions {
            page_index,
            page_rect: content.rect,
            points,
            clustering,
            regions,
        })
    }

    /// Detect regions on a page and append one page per region to `output`.
    pub fn auto_clip(
        &self,
        source: &SourceDocument,
        page_index: usize,
        output: &mut OutputDocument,
    ) -> Result<AutoClipReport> {
        let detected = self.detect_regions(source, page_index)?;
        Ok(self.render_regions(source, &detected, output))
    }

    /// Render already detected regions, collecting per-region failures.
    pub fn render_regions(
        &self,
        source: &SourceDocument,
        detected: &DetectedRegions,
        output: &mut OutputDocument,
    ) -> AutoClipReport {
        let mut report = AutoClipReport {
            page_index: detected.page_index,
            noise: detected.clustering.noise_count(),
            ..Default::default()
        };

        for region in &detected.regions {
            match self.render_auto_region(source, detected.page_index, region, output) {
                Ok(rect) => report.rendered.push(rect),
                Err(error) => {
                    warn!(
                        "Skipping region {} on page {}: {}",
                        region.label,
                        detected.page_index + 1,
                        error
                    );
                    report.failures.push(RegionFailure {
                        label: region.label,
                        error,
                    });
                }
            }
        }

        report
    }

    fn render_auto_region(
        &self,
        source: &SourceDocument,
        page_index: usize,
        region: &Region,
        output: &mut OutputDocument,
    ) -> Result<Rect> {
        let layout_config = &self.config.layout;
        let clip = region.bounding_box()?.as_rect();
        let policy = SizingPolicy::FixedSize {
            width: layout_config.page_width,
            height: layout_config.page_height,
        };
        let layout = CanvasLayout::new(&clip, policy, layout_config.margin)?;
        render_region(output, source, page_index, &clip, &layout)?;
        Ok(clip)
    }

    /// Render a manual clip request and save it as a new artifact.
    pub fn clip(
        &self,
        source: &SourceDocument,
        request: &ClipRequest,
        store: &mut ArtifactStore,
    ) -> Result<ClipArtifact> {
        source.frame(request.page_index)?;
        let clip = request.document_rect()?;
        let policy = request.sizing_policy()?;
        if clip.is_empty() {
            return Err(GeometryError::EmptyClip.into());
        }
        let layout = CanvasLayout::new(&clip, policy, self.config.layout.margin)?;

        let mut output = OutputDocument::new();
        render_region(&mut output, source, request.page_index, &clip, &layout)?;
        store.save_clip(request.page_index, output)
    }

    /// Auto-clip one page, writing `parse_<n>.pdf` and the configured side
    /// outputs into `out_dir` (`n` is the 1-based page number).
    ///
    /// Region files are only written when at least one region rendered.
    pub fn parse_page(
        &self,
        source: &SourceDocument,
        page_index: usize,
        out_dir: &Path,
    ) -> Result<PageReport> {
        std::fs::create_dir_all(out_dir)?;
        let number = page_index + 1;
        let detected = self.detect_regions(source, page_index)?;
        let mut files = Vec::new();

        if self.config.output.write_scatter {
            let path = out_dir.join(format!("scatter_{}.png", number));
            write_scatter(&detected.points, &detected.page_rect, &path)?;
            files.push(path);
        }

        let mut output = OutputDocument::new();
        let clips = self.render_regions(source, &detected, &mut output);
        if clips.rendered.is_empty() {
            info!("Page {}: no regions to write", number);
            return Ok(PageReport { clips, files });
        }

        let path = out_dir.join(format!("parse_{}.pdf", number));
        output.save(&path)?;
        info!("Page {}: wrote {} regions to {}", number, clips.rendered_count(), path.display());
        files.push(path);

        if self.config.output.write_overlay {
            let mut overlay = OutputDocument::new();
            render_overlay(&mut overlay, source, page_index, &clips.rendered)?;
            let path = out_dir.join(format!("bbox_{}.pdf", number));
            overlay.save(&path)?;
            files.push(path);
        }

        Ok(PageReport { clips, files })
    }

    /// [`parse_page`](Self::parse_page) for every page of the document.
    pub fn parse_document(&self, source: &SourceDocument, out_dir: &Path) -> Result<Vec<PageReport>> {
        (0..source.page_count())
            .map(|page_index| self.parse_page(source, page_index, out_dir))
            .collect()
    }
}
