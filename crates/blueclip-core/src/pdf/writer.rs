//! Output document composition using lopdf.
//!
//! Source pages are embedded as Form XObjects (one per source page per output
//! document) and placed with a clip path and a uniform scale + translate, so
//! the output stays vector content.

use std::collections::HashMap;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;
use uuid::Uuid;

use super::document::SourceDocument;
use crate::error::{GeometryError, PdfError};
use crate::geometry::Rect;

/// Page entries that would drag foreign page trees into the output.
const SKIPPED_PAGE_KEYS: [&[u8]; 3] = [b"Parent", b"Annots", b"B"];

/// Attributes a page may inherit from its ancestors.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Handle to a page created with [`OutputDocument::new_page`], valid only for
/// the document that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHandle {
    document: Uuid,
    index: usize,
}

struct ComposedPage {
    width: f64,
    height: f64,
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

enum OutputPage {
    Composed(ComposedPage),
    Imported(ObjectId),
}

/// A PDF under construction.
pub struct OutputDocument {
    id: Uuid,
    document: Document,
    pages_id: ObjectId,
    pages: Vec<OutputPage>,
    /// Form XObject per (source document, page index).
    forms: HashMap<(Uuid, usize), ObjectId>,
    /// Object id translation per source document.
    imports: HashMap<Uuid, HashMap<ObjectId, ObjectId>>,
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn rect_array(rect: &Rect) -> Object {
    Object::Array(vec![real(rect.x0), real(rect.y0), real(rect.x1), real(rect.y1)])
}

impl OutputDocument {
    pub fn new() -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        Self {
            id: Uuid::new_v4(),
            document,
            pages_id,
            pages: Vec::new(),
            forms: HashMap::new(),
            imports: HashMap::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Append an empty page of the given size.
    pub fn new_page(&mut self, width: f64, height: f64) -> PageHandle {
        self.pages.push(OutputPage::Composed(ComposedPage {
            width,
            height,
            operations: Vec::new(),
            xobjects: Dictionary::new(),
        }));
        PageHandle {
            document: self.id,
            index: self.pages.len() - 1,
        }
    }

    fn composed(&mut self, page: PageHandle) -> Result<&mut ComposedPage, PdfError> {
        if page.document != self.id {
            return Err(PdfError::ForeignPage);
        }
        match self.pages.get_mut(page.index) {
            Some(OutputPage::Composed(composed)) => Ok(composed),
            _ => Err(PdfError::ForeignPage),
        }
    }

    /// Draw the part of a source page inside `clip` (document space of the
    /// source page) into `target` (document space of the output page).
    ///
    /// The content is scaled uniformly and centered inside `target` when the
    /// aspect ratios differ.
    pub fn show_region(
        &mut self,
        page: PageHandle,
        source: &SourceDocument,
        page_index: usize,
        clip: &Rect,
        target: &Rect,
    ) -> crate::Result<()> {
        let frame = source.frame(page_index)?;
        if clip.is_empty() || target.is_empty() {
            return Err(GeometryError::EmptyClip.into());
        }
        self.composed(page)?;

        let form_id = self.source_form(source, page_index)?;
        let name = format!("Fm{}", form_id.0);

        let scale = (target.width() / clip.width()).min(target.height() / clip.height());
        let placed_width = clip.width() * scale;
        let placed_height = clip.height() * scale;
        let left = target.x0 + (target.width() - placed_width) / 2.0;
        let top = target.y0 + (target.height() - placed_height) / 2.0;

        let composed = self.composed(page)?;
        let page_height = composed.height;
        let bottom = page_height - top - placed_height;

        // Source user space -> output user space.
        let e = left - scale * (frame.pdf_box.x0 + clip.x0);
        let f = page_height - top - scale * (frame.pdf_box.y1 - clip.y0);

        composed.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "re",
                vec![real(left), real(bottom), real(placed_width), real(placed_height)],
            ),
            Operation::new("W", vec![]),
            Operation::new("n", vec![]),
            Operation::new(
                "cm",
                vec![real(scale), real(0.0), real(0.0), real(scale), real(e), real(f)],
            ),
            Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        composed.xobjects.set(name, Object::Reference(form_id));

        Ok(())
    }

    /// Stroke the outline of `rect` (document space of the output page).
    pub fn stroke_rect(
        &mut self,
        page: PageHandle,
        rect: &Rect,
        rgb: [f64; 3],
        line_width: f64,
    ) -> crate::Result<()> {
        let composed = self.composed(page)?;
        let rect = rect.normalized();
        let bottom = composed.height - rect.y1;

        composed.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("RG", rgb.iter().map(|c| real(*c)).collect()),
            Operation::new("w", vec![real(line_width)]),
            Operation::new(
                "re",
                vec![real(rect.x0), real(bottom), real(rect.width()), real(rect.height())],
            ),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    /// Copy every page of `source`, in order, to the end of this document.
    pub fn append_document(&mut self, source: &SourceDocument) -> crate::Result<usize> {
        for page_id in source.page_ids() {
            let page = source
                .lopdf()
                .get_dictionary(*page_id)
                .map_err(|e| PdfError::Parse(e.to_string()))?;

            let mut flattened = Dictionary::new();
            for (key, value) in page.iter() {
                if !SKIPPED_PAGE_KEYS.contains(&key.as_slice()) {
                    flattened.set(key.clone(), value.clone());
                }
            }
            for key in INHERITABLE_KEYS {
                if !flattened.has(key) {
                    if let Some(value) = source.inherited_attribute(*page_id, key) {
                        flattened.set(key.to_vec(), value.clone());
                    }
                }
            }

            let mut copied = self.import_dictionary(source, &flattened);
            copied.set("Parent", Object::Reference(self.pages_id));
            let id = self.document.add_object(copied);
            self.pages.push(OutputPage::Imported(id));
        }

        debug!("Appended {} pages", source.page_ids().len());
        Ok(source.page_ids().len())
    }

    /// Form XObject wrapping a whole source page, created on first use.
    fn source_form(&mut self, source: &SourceDocument, page_index: usize) -> crate::Result<ObjectId> {
        if let Some(id) = self.forms.get(&(source.key(), page_index)) {
            return Ok(*id);
        }

        let page_id = source.page_id(page_index)?;
        let frame = source.frame(page_index)?;
        let content = source.page_content_bytes(page_id)?;
        let resources = match source.page_resources(page_id) {
            Some(resources) => self.import_dictionary(source, &resources),
            None => Dictionary::new(),
        };

        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => rect_array(&frame.pdf_box),
                "Resources" => resources,
            },
            content,
        );
        let id = self.document.add_object(form);
        self.forms.insert((source.key(), page_index), id);

        debug!("Embedded source page {} as form {:?}", page_index + 1, id);
        Ok(id)
    }

    fn import_dictionary(&mut self, source: &SourceDocument, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            copy.set(key.clone(), self.import_object(source, value));
        }
        copy
    }

    /// Deep-copy an object from `source`, translating references.
    fn import_object(&mut self, source: &SourceDocument, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.import_reference(source, *id)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|o| self.import_object(source, o)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.import_dictionary(source, dict)),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.import_dictionary(source, &stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn import_reference(&mut self, source: &SourceDocument, id: ObjectId) -> ObjectId {
        let known = self.imports.entry(source.key()).or_default();
        if let Some(local) = known.get(&id) {
            return *local;
        }

        let local = self.document.new_object_id();
        known.insert(id, local);

        let copied = match source.lopdf().get_object(id) {
            Ok(object) => self.import_object(source, object),
            Err(_) => Object::Null,
        };
        self.document.objects.insert(local, copied);
        local
    }

    /// Finalize the page tree and return the lopdf document.
    pub fn into_document(mut self) -> crate::Result<Document> {
        let mut kids = Vec::with_capacity(self.pages.len());

        for page in std::mem::take(&mut self.pages) {
            let id = match page {
                OutputPage::Imported(id) => id,
                OutputPage::Composed(composed) => {
                    let content = Content {
                        operations: composed.operations,
                    }
                    .encode()
                    .map_err(|e| PdfError::Content(e.to_string()))?;
                    let content_id = self.document.add_object(Stream::new(Dictionary::new(), content));

                    self.document.add_object(dictionary! {
                        "Type" => "Page",
                        "Parent" => self.pages_id,
                        "MediaBox" => rect_array(&Rect::new(0.0, 0.0, composed.width, composed.height)),
                        "Resources" => dictionary! {
                            "XObject" => composed.xobjects,
                        },
                        "Contents" => content_id,
                    })
                }
            };
            kids.push(Object::Reference(id));
        }

        let count = kids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);
        self.document.compress();

        Ok(self.document)
    }

    /// Serialize to bytes.
    pub fn to_bytes(self) -> crate::Result<Vec<u8>> {
        let mut document = self.into_document()?;
        let mut buffer = Vec::new();
        document
            .save_to(&mut buffer)
            .map_err(|e| PdfError::Write {
                path: "<memory>".into(),
                reason: e.to_string(),
            })?;
        Ok(buffer)
    }

    /// Write to `path`, replacing any existing file.
    pub fn save(self, path: impl AsRef<Path>) -> crate::Result<()> {
        let path = path.as_ref();
        let pages = self.page_count();
        let mut document = self.into_document()?;
        document.save(path).map_err(|e| PdfError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!("Wrote {} pages to {}", pages, path.display());
        Ok(())
    }
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClipError;

    #[test]
    fn test_handle_from_other_document_is_rejected() {
        let mut first = OutputDocument::new();
        let mut second = OutputDocument::new();
        first.new_page(100.0, 100.0);
        let foreign = first.new_page(50.0, 50.0);
        second.new_page(10.0, 10.0);

        let err = second
            .stroke_rect(foreign, &Rect::new(0.0, 0.0, 5.0, 5.0), [1.0, 0.0, 0.0], 0.5)
            .unwrap_err();
        assert!(matches!(err, ClipError::Pdf(PdfError::ForeignPage)));
        assert_eq!(second.page_count(), 1);
    }

    #[test]
    fn test_stroke_rect_on_own_page() {
        let mut output = OutputDocument::new();
        let page = output.new_page(100.0, 100.0);
        output
            .stroke_rect(page, &Rect::new(10.0, 10.0, 20.0, 20.0), [1.0, 0.0, 0.0], 0.5)
            .unwrap();
    }
}
