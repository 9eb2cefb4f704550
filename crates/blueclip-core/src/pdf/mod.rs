//! PDF processing module.
//!
//! Reading goes through [`SourceDocument`], which recovers drawing primitives
//! and text spans from page content streams. Writing goes through
//! [`OutputDocument`], which composes new pages out of clipped, scaled copies
//! of source pages.

mod content;
mod document;
mod writer;

pub use document::{PageFrame, SourceDocument};
pub use writer::{OutputDocument, PageHandle};

use crate::error::PdfError;
use crate::geometry::{Point, Rect};

/// A vector drawing primitive recovered from a page, in document space.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Straight segment between two points.
    Line(Point, Point),
    /// Axis-aligned rectangle.
    Rectangle(Rect),
    /// Rectangle under a rotating or shearing transform (four corners).
    Quad([Point; 4]),
    /// Cubic Bezier: start, two control points, end.
    Curve([Point; 4]),
    /// Path construction the interpreter could not model.
    Unknown { operator: String },
}

/// The bounding box of a run of shown text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub rect: Rect,
    pub text: String,
}

/// Drawing content of one page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// Page index (0-based).
    pub index: usize,
    /// Visible page rectangle in document space.
    pub rect: Rect,
    /// Vector primitives in painting order.
    pub primitives: Vec<Primitive>,
    /// Text spans in showing order.
    pub text_spans: Vec<TextSpan>,
}

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Read access to a multi-page vector document.
pub trait VectorDocument {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Visible rectangle of a page (0-based index) in document space.
    fn page_rect(&self, index: usize) -> Result<Rect>;

    /// Primitives and text spans of a page (0-based index).
    fn page_content(&self, index: usize) -> Result<PageContent>;
}
