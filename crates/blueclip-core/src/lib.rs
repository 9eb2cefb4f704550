//! Core library for extracting regions of engineering blueprints.
//!
//! This crate provides:
//! - Vector PDF reading (drawing primitives and text spans) and composition
//! - Point extraction and density-based clustering into regions
//! - Bounding-box and canvas layout arithmetic for clip pages
//! - Manual and auto-detected clips, artifact storage and assembly

pub mod artifacts;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod models;
pub mod pdf;
pub mod region;
pub mod render;

pub use artifacts::{assemble, ArtifactStore};
pub use engine::{AutoClipReport, ClipEngine, DetectedRegions, PageReport, RegionFailure};
pub use error::{ClipError, Result};
pub use geometry::{BoundingBox, CanvasLayout, Point, Rect, SizingPolicy};
pub use models::{ClipArtifact, ClipConfig, ClipPayload, ClipRequest, ClipResponse, SizingMode};
pub use pdf::{OutputDocument, SourceDocument, VectorDocument};
pub use region::{DensityClusterer, PointExtractor, PointSet, Region};
