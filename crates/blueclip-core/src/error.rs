//! Error types for the blueclip-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the blueclip library.
#[derive(Error, Debug)]
pub enum ClipError {
    /// PDF reading or writing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Point extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Bounding box or layout error.
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Clustering parameter error.
    #[error("clustering error: {0}")]
    Cluster(#[from] ClusterError),

    /// Clip artifact storage error.
    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// Image encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed clip request.
    #[error("invalid clip request: {0}")]
    InvalidRequest(String),
}

impl ClipError {
    /// Whether the failure was caused by the caller's input rather than by the
    /// document content or an internal invariant.
    pub fn is_caller_error(&self) -> bool {
        match self {
            ClipError::Pdf(PdfError::InvalidPageIndex { .. }) => true,
            ClipError::Geometry(
                GeometryError::EmptyClip
                | GeometryError::InvalidScale(_)
                | GeometryError::InvalidCanvas { .. }
                | GeometryError::MissingFixedSize,
            ) => true,
            ClipError::Cluster(_) => true,
            ClipError::Artifact(ArtifactError::NoArtifacts | ArtifactError::NotFound(_)) => true,
            ClipError::Config(_) | ClipError::InvalidRequest(_) => true,
            _ => false,
        }
    }
}

/// Errors related to reading and composing PDF documents.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Page index (0-based) outside the document's page range.
    #[error("invalid page index {index} (document has {page_count} pages)")]
    InvalidPageIndex { index: usize, page_count: usize },

    /// A page's content stream could not be read or decoded.
    #[error("failed to read page content: {0}")]
    Content(String),

    /// A page handle issued by a different output document.
    #[error("page handle does not belong to this document")]
    ForeignPage,

    /// Failed to write the output document.
    #[error("failed to write PDF to {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Errors raised while turning page primitives into points.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A primitive kind the extractor does not model.
    #[error("unsupported drawing primitive: {operator}")]
    UnsupportedPrimitive { operator: String },
}

/// Errors from bounding-box and layout arithmetic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Bounding box requested for an empty point set.
    #[error("region has no points")]
    EmptyRegion,

    /// Region has zero or negative extent on at least one axis.
    #[error("degenerate box {width}x{height}")]
    DegenerateBox { width: f64, height: f64 },

    /// Clip rectangle has no positive area.
    #[error("clip rectangle has no area")]
    EmptyClip,

    /// Display scale must be finite and positive.
    #[error("invalid display scale: {0}")]
    InvalidScale(f64),

    /// Canvas leaves no room inside its margins.
    #[error("canvas {width}x{height} too small for margin {margin}")]
    InvalidCanvas { width: f64, height: f64, margin: f64 },

    /// Fixed-size sizing requested without a positive width and height.
    #[error("fixed-size sizing requires positive width and height")]
    MissingFixedSize,
}

/// Errors related to clustering parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    /// Neighborhood radius must be positive.
    #[error("eps must be positive, got {0}")]
    InvalidEps(f64),

    /// Minimum density must be at least one.
    #[error("min_samples must be at least 1")]
    InvalidMinSamples,
}

/// Errors related to clip artifact storage and assembly.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// Nothing to assemble.
    #[error("no clip artifacts to assemble")]
    NoArtifacts,

    /// Unknown artifact id.
    #[error("artifact not found: {0}")]
    NotFound(String),

    /// The manifest could not be read or written.
    #[error("manifest error: {0}")]
    Manifest(String),
}

/// Result type for the blueclip library.
pub type Result<T> = std::result::Result<T, ClipError>;
