//! Configuration structures for region detection and clipping.

use serde::{Deserialize, Serialize};

use crate::error::{ClipError, Result};

/// Main configuration for blueclip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Density clustering parameters.
    pub clustering: ClusteringConfig,

    /// Which primitives contribute points.
    pub extraction: ExtractionConfig,

    /// Output page layout.
    pub layout: LayoutConfig,

    /// Side outputs of a whole-document parse.
    pub output: OutputConfig,
}

/// Density clustering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Neighborhood radius in PDF points.
    pub eps: f64,

    /// Points (including itself) a core point needs within `eps`.
    pub min_samples: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            eps: 110.0,
            min_samples: 100,
        }
    }
}

/// Point extraction configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Fold the corners of text spans into the point set.
    pub include_text_points: bool,

    /// Contribute the four corners of rotated rectangles.
    pub expand_quads: bool,
}

/// Output page layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Padding kept between content and the page edge.
    pub margin: f64,

    /// Page width used for auto-detected regions.
    pub page_width: f64,

    /// Page height used for auto-detected regions.
    pub page_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin: 20.0,
            page_width: 640.0,
            page_height: 640.0,
        }
    }
}

/// Side outputs of a whole-document parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write `bbox_<n>.pdf` with detected regions outlined.
    pub write_overlay: bool,

    /// Write `scatter_<n>.png` with the extracted points.
    pub write_scatter: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            write_overlay: true,
            write_scatter: false,
        }
    }
}

impl ClipConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> std::result::Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Reject values no operation could run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.clustering.eps.is_finite() && self.clustering.eps > 0.0) {
            return Err(ClipError::Config(format!(
                "clustering.eps must be positive, got {}",
                self.clustering.eps
            )));
        }
        if self.clustering.min_samples == 0 {
            return Err(ClipError::Config(
                "clustering.min_samples must be at least 1".to_string(),
            ));
        }
        if !(self.layout.margin.is_finite() && self.layout.margin >= 0.0) {
            return Err(ClipError::Config(format!(
                "layout.margin must not be negative, got {}",
                self.layout.margin
            )));
        }
        let (width, height) = (self.layout.page_width, self.layout.page_height);
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ClipError::Config(format!(
                "layout page size must be positive, got {}x{}",
                width, height
            )));
        }
        if width <= 2.0 * self.layout.margin || height <= 2.0 * self.layout.margin {
            return Err(ClipError::Config(format!(
                "layout page {}x{} leaves no room inside margin {}",
                width, height, self.layout.margin
            )));
        }
        Ok(())
    }
}
