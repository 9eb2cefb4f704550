//! Content stream interpretation: recovers drawing primitives and text span
//! boxes from PDF page operators.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::trace;

use super::document::PageFrame;
use super::{Primitive, Result, TextSpan};
use crate::error::PdfError;
use crate::geometry::{BoundingBox, Matrix, Point};

/// Nesting limit for form XObjects.
const MAX_FORM_DEPTH: usize = 16;

/// Average glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f64 = 0.5;
const DESCENT: f64 = -0.2;
const ASCENT: f64 = 0.8;

/// Numeric value of an integer or real object.
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn numbers(operands: &[Object]) -> Option<Vec<f64>> {
    operands.iter().map(number).collect()
}

/// Path under construction, already in document space.
#[derive(Default)]
struct PathState {
    items: Vec<Primitive>,
    current: Option<Point>,
    start: Option<Point>,
}

impl PathState {
    fn close(&mut self) {
        if let (Some(current), Some(start)) = (self.current, self.start) {
            if current != start {
                self.items.push(Primitive::Line(current, start));
            }
            self.current = Some(start);
        }
    }

    fn take(&mut self) -> Vec<Primitive> {
        self.current = None;
        self.start = None;
        std::mem::take(&mut self.items)
    }
}

#[derive(Clone)]
struct TextState {
    matrix: Matrix,
    line_matrix: Matrix,
    font_size: f64,
    two_byte: bool,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font_size: 0.0,
            two_byte: false,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.matrix = self.line_matrix;
    }

    /// Horizontal displacement, in unscaled text space, of showing `bytes`.
    fn advance(&self, bytes: &[u8]) -> f64 {
        let (glyphs, spaces) = if self.two_byte {
            (bytes.len() / 2, 0)
        } else {
            (bytes.len(), bytes.iter().filter(|b| **b == b' ').count())
        };
        (glyphs as f64 * (GLYPH_ADVANCE * self.font_size + self.char_spacing)
            + spaces as f64 * self.word_spacing)
            * self.horizontal_scale
    }
}

/// Walks content stream operators, tracking the graphics and text state.
pub(crate) struct ContentInterpreter<'a> {
    document: &'a Document,
    frame: PageFrame,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    path: PathState,
    text: TextState,
    forms: Vec<ObjectId>,
    primitives: Vec<Primitive>,
    spans: Vec<TextSpan>,
}

impl<'a> ContentInterpreter<'a> {
    pub(crate) fn new(document: &'a Document, frame: PageFrame) -> Self {
        Self {
            document,
            frame,
            ctm: Matrix::IDENTITY,
            ctm_stack: Vec::new(),
            path: PathState::default(),
            text: TextState::default(),
            forms: Vec::new(),
            primitives: Vec::new(),
            spans: Vec::new(),
        }
    }

    /// Interpret a (decompressed) content stream.
    pub(crate) fn run(&mut self, content: &[u8], resources: Option<&Dictionary>) -> Result<()> {
        let content = Content::decode(content).map_err(|e| PdfError::Content(e.to_string()))?;
        for op in &content.operations {
            self.execute(op, resources)?;
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> (Vec<Primitive>, Vec<TextSpan>) {
        (self.primitives, self.spans)
    }

    fn to_document(&self, x: f64, y: f64) -> Point {
        let (px, py) = self.ctm.apply(x, y);
        self.frame.to_document(px, py).into()
    }

    fn execute(&mut self, op: &Operation, resources: Option<&Dictionary>) -> Result<()> {
        trace!("{} {:?}", op.operator, op.operands);

        match op.operator.as_str() {
            // Graphics state
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.ctm_stack.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = numbers(&op.operands).as_deref().and_then(Matrix::from_slice) {
                    self.ctm = m.then(&self.ctm);
                }
            }

            // Path construction
            "m" | "l" | "c" | "v" | "y" | "re" => self.construct_path(op),
            "h" => self.path.close(),

            // Path painting
            "S" | "f" | "F" | "f*" | "B" | "B*" => self.paint(),
            "s" | "b" | "b*" => {
                self.path.close();
                self.paint();
            }
            "n" => {
                self.path.take();
            }

            // Text objects and state
            "BT" => {
                self.text.matrix = Matrix::IDENTITY;
                self.text.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => self.set_font(&op.operands, resources),
            "Tc" => self.set_text_param(&op.operands, |t, v| t.char_spacing = v),
            "Tw" => self.set_text_param(&op.operands, |t, v| t.word_spacing = v),
            "Tz" => self.set_text_param(&op.operands, |t, v| t.horizontal_scale = v / 100.0),
            "TL" => self.set_text_param(&op.operands, |t, v| t.leading = v),
            "Ts" => self.set_text_param(&op.operands, |t, v| t.rise = v),
            "Td" | "TD" => {
                if let Some([tx, ty]) = numbers(&op.operands)
                    .as_deref()
                    .and_then(|v| <[f64; 2]>::try_from(v).ok())
                {
                    if op.operator == "TD" {
                        self.text.leading = -ty;
                    }
                    self.text.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = numbers(&op.operands).as_deref().and_then(Matrix::from_slice) {
                    self.text.matrix = m;
                    self.text.line_matrix = m;
                }
            }
            "T*" => {
                let leading = self.text.leading;
                self.text.move_line(0.0, -leading);
            }

            // Text showing
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show_text(&[TextPiece::Glyphs(bytes)]);
                }
            }
            "'" => {
                let leading = self.text.leading;
                self.text.move_line(0.0, -leading);
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show_text(&[TextPiece::Glyphs(bytes)]);
                }
            }
            "\"" => {
                if let [aw, ac, Object::String(bytes, _)] = op.operands.as_slice() {
                    if let (Some(aw), Some(ac)) = (number(aw), number(ac)) {
                        self.text.word_spacing = aw;
                        self.text.char_spacing = ac;
                    }
                    let leading = self.text.leading;
                    self.text.move_line(0.0, -leading);
                    self.show_text(&[TextPiece::Glyphs(bytes)]);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    let pieces: Vec<TextPiece> = items
                        .iter()
                        .filter_map(|item| match item {
                            Object::String(bytes, _) => Some(TextPiece::Glyphs(bytes)),
                            other => number(other).map(TextPiece::Adjust),
                        })
                        .collect();
                    self.show_text(&pieces);
                }
            }

            // XObjects
            "Do" => self.invoke_xobject(&op.operands, resources)?,

            _ => {}
        }

        Ok(())
    }

    fn construct_path(&mut self, op: &Operation) {
        let malformed = || Primitive::Unknown {
            operator: op.operator.clone(),
        };

        let Some(values) = numbers(&op.operands) else {
            self.path.items.push(malformed());
            return;
        };

        match (op.operator.as_str(), values.as_slice()) {
            ("m", [x, y]) => {
                let p = self.to_document(*x, *y);
                self.path.current = Some(p);
                self.path.start = Some(p);
            }
            ("l", [x, y]) => {
                let p = self.to_document(*x, *y);
                match self.path.current {
                    Some(current) => self.path.items.push(Primitive::Line(current, p)),
                    None => self.path.start = Some(p),
                }
                self.path.current = Some(p);
            }
            ("c", [x1, y1, x2, y2, x3, y3]) => {
                let (p1, p2, p3) = (
                    self.to_document(*x1, *y1),
                    self.to_document(*x2, *y2),
                    self.to_document(*x3, *y3),
                );
                self.push_curve(p1, p2, p3);
            }
            ("v", [x2, y2, x3, y3]) => {
                let (p2, p3) = (self.to_document(*x2, *y2), self.to_document(*x3, *y3));
                let p1 = self.path.current.unwrap_or(p2);
                self.push_curve(p1, p2, p3);
            }
            ("y", [x1, y1, x3, y3]) => {
                let (p1, p3) = (self.to_document(*x1, *y1), self.to_document(*x3, *y3));
                self.push_curve(p1, p3, p3);
            }
            ("re", [x, y, w, h]) => {
                let corners = [
                    self.to_document(*x, *y),
                    self.to_document(x + w, *y),
                    self.to_document(x + w, y + h),
                    self.to_document(*x, y + h),
                ];
                if self.ctm.is_axis_aligned() {
                    // Corners are finite numbers, so the box always exists.
                    if let Ok(bbox) = BoundingBox::from_points(&corners) {
                        self.path.items.push(Primitive::Rectangle(bbox.as_rect()));
                    }
                } else {
                    self.path.items.push(Primitive::Quad(corners));
                }
                self.path.current = Some(corners[0]);
                self.path.start = Some(corners[0]);
            }
            _ => self.path.items.push(malformed()),
        }
    }

    fn push_curve(&mut self, p1: Point, p2: Point, p3: Point) {
        let p0 = self.path.current.unwrap_or(p1);
        if self.path.start.is_none() {
            self.path.start = Some(p0);
        }
        self.path.items.push(Primitive::Curve([p0, p1, p2, p3]));
        self.path.current = Some(p3);
    }

    fn paint(&mut self) {
        let items = self.path.take();
        self.primitives.extend(items);
    }

    fn set_text_param(&mut self, operands: &[Object], apply: impl FnOnce(&mut TextState, f64)) {
        if let Some(value) = operands.first().and_then(number) {
            apply(&mut self.text, value);
        }
    }

    fn set_font(&mut self, operands: &[Object], resources: Option<&Dictionary>) {
        let [Object::Name(name), size] = operands else {
            return;
        };
        if let Some(size) = number(size) {
            self.text.font_size = size;
        }
        self.text.two_byte = self
            .resource(resources, b"Font", name)
            .and_then(|font| font.as_dict().ok())
            .and_then(|font| font.get(b"Subtype").ok())
            .and_then(|subtype| subtype.as_name().ok())
            .is_some_and(|subtype| subtype == b"Type0");
    }

    fn show_text(&mut self, pieces: &[TextPiece]) {
        let font_size = self.text.font_size;
        let mut x = 0.0_f64;
        let (mut min_x, mut max_x) = (0.0_f64, 0.0_f64);
        let mut text = String::new();

        for piece in pieces {
            match piece {
                TextPiece::Glyphs(bytes) => {
                    x += self.text.advance(bytes);
                    text.push_str(&String::from_utf8_lossy(bytes));
                }
                TextPiece::Adjust(amount) => {
                    x -= amount / 1000.0 * font_size * self.text.horizontal_scale;
                }
            }
            min_x = min_x.min(x);
            max_x = max_x.max(x);
        }

        if !text.is_empty() && font_size != 0.0 {
            let bottom = self.text.rise + DESCENT * font_size;
            let top = self.text.rise + ASCENT * font_size;
            let to_user = self.text.matrix.then(&self.ctm);
            let corners: Vec<Point> = [(min_x, bottom), (max_x, bottom), (max_x, top), (min_x, top)]
                .iter()
                .map(|(tx, ty)| {
                    let (ux, uy) = to_user.apply(*tx, *ty);
                    self.frame.to_document(ux, uy).into()
                })
                .collect();

            if let Ok(bbox) = BoundingBox::from_points(&corners) {
                self.spans.push(TextSpan {
                    rect: bbox.as_rect(),
                    text,
                });
            }
        }

        self.text.matrix = Matrix::translate(x, 0.0).then(&self.text.matrix);
    }

    /// Resolve `/Category /Name` in a resource dictionary.
    fn resource<'r>(
        &self,
        resources: Option<&'r Dictionary>,
        category: &[u8],
        name: &[u8],
    ) -> Option<&'r Object>
    where
        'a: 'r,
    {
        let document = self.document;
        let category = resources?.get(category).ok()?;
        let (_, category) = document.dereference(category).ok()?;
        let entry = category.as_dict().ok()?.get(name).ok()?;
        document.dereference(entry).ok().map(|(_, obj)| obj)
    }

    fn invoke_xobject(&mut self, operands: &[Object], resources: Option<&Dictionary>) -> Result<()> {
        let Some(Object::Name(name)) = operands.first() else {
            return Ok(());
        };
        let document = self.document;

        let Some(entry) = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|x| document.dereference(x).ok())
            .and_then(|(_, x)| x.as_dict().ok())
            .and_then(|x| x.get(name).ok())
        else {
            trace!("XObject /{} not found", String::from_utf8_lossy(name));
            return Ok(());
        };

        let Object::Reference(form_id) = entry else {
            return Ok(());
        };
        if self.forms.contains(form_id) || self.forms.len() >= MAX_FORM_DEPTH {
            trace!("Skipping recursive or deeply nested form {:?}", form_id);
            return Ok(());
        }

        let Ok(Object::Stream(stream)) = document.get_object(*form_id) else {
            return Ok(());
        };
        let is_form = stream
            .dict
            .get(b"Subtype")
            .and_then(|s| s.as_name())
            .is_ok_and(|s| s == b"Form");
        if !is_form {
            return Ok(());
        }

        let matrix = stream
            .dict
            .get(b"Matrix")
            .and_then(|m| m.as_array())
            .ok()
            .and_then(|m| numbers(m))
            .and_then(|m| Matrix::from_slice(&m))
            .unwrap_or(Matrix::IDENTITY);

        let form_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|r| document.dereference(r).ok())
            .and_then(|(_, r)| r.as_dict().ok());

        let data = match stream.decompressed_content() {
            Ok(d) => d,
            Err(_) => stream.content.clone(),
        };

        self.forms.push(*form_id);
        self.ctm_stack.push(self.ctm);
        self.ctm = matrix.then(&self.ctm);
        let result = self.run(&data, form_resources.or(resources));
        if let Some(ctm) = self.ctm_stack.pop() {
            self.ctm = ctm;
        }
        self.forms.pop();

        result
    }
}

enum TextPiece<'b> {
    Glyphs(&'b [u8]),
    Adjust(f64),
}
