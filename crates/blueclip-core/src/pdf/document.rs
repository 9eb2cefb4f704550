//! Source document access using lopdf.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};
use uuid::Uuid;

use super::content::ContentInterpreter;
use super::{PageContent, Result, VectorDocument};
use crate::error::PdfError;
use crate::geometry::Rect;

/// Page tree depth beyond which attribute inheritance gives up.
const MAX_TREE_DEPTH: usize = 64;

/// Maps between a page's PDF user space and document space.
///
/// Document space has its origin at the top-left corner of the visible box
/// (CropBox, else MediaBox) and y growing downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    /// Visible box in PDF user space, normalized.
    pub pdf_box: Rect,
}

impl PageFrame {
    pub fn new(pdf_box: Rect) -> Self {
        Self {
            pdf_box: pdf_box.normalized(),
        }
    }

    pub fn width(&self) -> f64 {
        self.pdf_box.width()
    }

    pub fn height(&self) -> f64 {
        self.pdf_box.height()
    }

    /// Page rectangle in document space.
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width(), self.height())
    }

    /// PDF user space -> document space.
    pub fn to_document(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.pdf_box.x0, self.pdf_box.y1 - y)
    }

    /// Document space -> PDF user space.
    pub fn to_pdf(&self, x: f64, y: f64) -> (f64, f64) {
        (self.pdf_box.x0 + x, self.pdf_box.y1 - y)
    }
}

/// A loaded source PDF.
pub struct SourceDocument {
    document: Document,
    pages: Vec<ObjectId>,
    key: Uuid,
}

impl SourceDocument {
    /// Open a PDF from disk.
    pub fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        debug!("Opening {} ({} bytes)", path.display(), data.len());
        Ok(Self::from_bytes(&data)?)
    }

    /// Load a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        Self::from_document(document)
    }

    /// Wrap an already-parsed lopdf document.
    pub fn from_document(document: Document) -> Result<Self> {
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", pages.len());
        Ok(Self {
            document,
            pages,
            key: Uuid::new_v4(),
        })
    }

    /// Identity of this loaded document, used to share imported objects.
    pub(crate) fn key(&self) -> Uuid {
        self.key
    }

    pub(crate) fn lopdf(&self) -> &Document {
        &self.document
    }

    pub(crate) fn page_ids(&self) -> &[ObjectId] {
        &self.pages
    }

    /// Object id of a page (0-based index).
    pub(crate) fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or(PdfError::InvalidPageIndex {
                index,
                page_count: self.pages.len(),
            })
    }

    /// Coordinate frame of a page (0-based index).
    pub fn frame(&self, index: usize) -> Result<PageFrame> {
        let page_id = self.page_id(index)?;

        let pdf_box = self
            .inherited_attribute(page_id, b"CropBox")
            .and_then(|obj| self.rect_from_object(obj))
            .or_else(|| {
                self.inherited_attribute(page_id, b"MediaBox")
                    .and_then(|obj| self.rect_from_object(obj))
            })
            // US Letter when the page declares no box at all
            .unwrap_or(Rect::new(0.0, 0.0, 612.0, 792.0));

        if let Some(rotate) = self
            .inherited_attribute(page_id, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .filter(|r| r % 360 != 0)
        {
            warn!("Page {} has /Rotate {}, rotation is not applied", index + 1, rotate);
        }

        Ok(PageFrame::new(pdf_box))
    }

    /// Decompressed, concatenated content streams of a page.
    pub(crate) fn page_content_bytes(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        self.document
            .get_page_content(page_id)
            .map_err(|e| PdfError::Content(e.to_string()))
    }

    /// Get resources dictionary for a page, handling inheritance
    pub(crate) fn page_resources(&self, page_id: ObjectId) -> Option<Dictionary> {
        let resources = self.inherited_attribute(page_id, b"Resources")?;
        match self.document.dereference(resources) {
            Ok((_, Object::Dictionary(dict))) => Some(dict.clone()),
            _ => None,
        }
    }

    /// Look up an inheritable page attribute, walking up the page tree.
    pub(crate) fn inherited_attribute(&self, node_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = node_id;
        for _ in 0..MAX_TREE_DEPTH {
            let dict = self.document.get_dictionary(current).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current = *parent_id,
                _ => return None,
            }
        }
        None
    }

    fn rect_from_object(&self, obj: &Object) -> Option<Rect> {
        let (_, obj) = self.document.dereference(obj).ok()?;
        let values = obj
            .as_array()
            .ok()?
            .iter()
            .map(|o| self.number(o))
            .collect::<Option<Vec<f64>>>()?;
        match values.as_slice() {
            [x0, y0, x1, y1] => Some(Rect::new(*x0, *y0, *x1, *y1).normalized()),
            _ => None,
        }
    }

    fn number(&self, obj: &Object) -> Option<f64> {
        let (_, obj) = self.document.dereference(obj).ok()?;
        super::content::number(obj)
    }
}

impl VectorDocument for SourceDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_rect(&self, index: usize) -> Result<Rect> {
        Ok(self.frame(index)?.rect())
    }

    fn page_content(&self, index: usize) -> Result<PageContent> {
        let page_id = self.page_id(index)?;
        let frame = self.frame(index)?;
        let content = self.page_content_bytes(page_id)?;
        let resources = self.page_resources(page_id);

        let mut interpreter = ContentInterpreter::new(&self.document, frame);
        interpreter.run(&content, resources.as_ref())?;
        let (primitives, text_spans) = interpreter.finish();

        debug!(
            "Page {}: {} primitives, {} text spans",
            index + 1,
            primitives.len(),
            text_spans.len()
        );

        Ok(PageContent {
            index,
            rect: frame.rect(),
            primitives,
            text_spans,
        })
    }
}
