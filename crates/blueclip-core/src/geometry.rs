//! Planar geometry: points, rectangles, bounding boxes, affine matrices and
//! the canvas layouts used when a region is re-rendered onto a new page.
//!
//! All coordinates live in document space: origin at the top-left corner of
//! the visible page, y growing downward, units in PDF points.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// A 2D coordinate in document space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    pub fn distance_sq(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_sq(other).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle given by two corners.
///
/// Unlike [`BoundingBox`], a `Rect` may be supplied with its corners in any
/// order; call [`Rect::normalized`] before doing arithmetic on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Rectangle with the given top-left corner and size.
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Same rectangle with `x0 <= x1` and `y0 <= y1`.
    pub fn normalized(&self) -> Self {
        Self {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// True when the rectangle has no positive area.
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Closed-interval containment test.
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
    }

    /// Divide every coordinate by `factor`.
    pub fn scaled_down(&self, factor: f64) -> Self {
        Self::new(
            self.x0 / factor,
            self.y0 / factor,
            self.x1 / factor,
            self.y1 / factor,
        )
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x0, self.y0),
            Point::new(self.x1, self.y0),
            Point::new(self.x1, self.y1),
            Point::new(self.x0, self.y1),
        ]
    }
}

/// Axis-aligned bounding box of a non-empty point set.
///
/// Only obtainable through [`BoundingBox::from_points`], so `x0 <= x1` and
/// `y0 <= y1` always hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl BoundingBox {
    /// Per-axis min/max over `points`.
    pub fn from_points(points: &[Point]) -> Result<Self, GeometryError> {
        let (first, rest) = points.split_first().ok_or(GeometryError::EmptyRegion)?;

        let mut bbox = Self {
            x0: first.x,
            y0: first.y,
            x1: first.x,
            y1: first.y,
        };
        for p in rest {
            bbox.x0 = bbox.x0.min(p.x);
            bbox.y0 = bbox.y0.min(p.y);
            bbox.x1 = bbox.x1.max(p.x);
            bbox.y1 = bbox.y1.max(p.y);
        }

        Ok(bbox)
    }

    pub fn x0(&self) -> f64 {
        self.x0
    }

    pub fn y0(&self) -> f64 {
        self.y0
    }

    pub fn x1(&self) -> f64 {
        self.x1
    }

    pub fn y1(&self) -> f64 {
        self.y1
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn as_rect(&self) -> Rect {
        Rect::new(self.x0, self.y0, self.x1, self.y1)
    }

    pub fn contains(&self, p: &Point) -> bool {
        self.as_rect().contains(p)
    }
}

/// Convert a rectangle drawn on a scaled viewing surface into document
/// coordinates.
///
/// The two corners may arrive in any order (drag gestures can start at any
/// corner); the result is always normalized.
pub fn display_to_document(display: &Rect, display_scale: f64) -> Result<Rect, GeometryError> {
    if !(display_scale.is_finite() && display_scale > 0.0) {
        return Err(GeometryError::InvalidScale(display_scale));
    }
    Ok(display.normalized().scaled_down(display_scale))
}

/// Uniform scale and centering offsets for fitting content inside a canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitScale {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

fn ensure_extent(content: &Rect) -> Result<(f64, f64), GeometryError> {
    let (width, height) = (content.width(), content.height());
    if !(width > 0.0 && height > 0.0) {
        return Err(GeometryError::DegenerateBox { width, height });
    }
    Ok((width, height))
}

/// Fit `content` inside a `canvas_width` x `canvas_height` canvas, keeping
/// `margin` free on every side, without distorting its aspect ratio.
pub fn fit_scale(
    content: &Rect,
    canvas_width: f64,
    canvas_height: f64,
    margin: f64,
) -> Result<FitScale, GeometryError> {
    let (width, height) = ensure_extent(content)?;

    let inner_width = canvas_width - 2.0 * margin;
    let inner_height = canvas_height - 2.0 * margin;
    if !(inner_width > 0.0 && inner_height > 0.0) {
        return Err(GeometryError::InvalidCanvas {
            width: canvas_width,
            height: canvas_height,
            margin,
        });
    }

    let scale = (inner_width / width).min(inner_height / height);

    Ok(FitScale {
        scale,
        offset_x: (canvas_width - width * scale) / 2.0,
        offset_y: (canvas_height - height * scale) / 2.0,
    })
}

/// How the output canvas of a clip is sized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizingPolicy {
    /// Canvas is the content size plus the margin on each side, no scaling.
    BoundingBox,
    /// Canvas has a fixed size; content is uniformly scaled and centered.
    FixedSize { width: f64, height: f64 },
}

/// Placement of a region on a freshly created page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasLayout {
    /// Output page width.
    pub width: f64,
    /// Output page height.
    pub height: f64,
    /// Where the region's content lands on the output page.
    pub content: Rect,
    /// Uniform scale applied to the region.
    pub scale: f64,
}

impl CanvasLayout {
    /// Layout for `content` under the given sizing policy.
    pub fn new(content: &Rect, policy: SizingPolicy, margin: f64) -> Result<Self, GeometryError> {
        match policy {
            SizingPolicy::BoundingBox => Self::bounding_box(content, margin),
            SizingPolicy::FixedSize { width, height } => {
                Self::fixed_size(content, width, height, margin)
            }
        }
    }

    /// Canvas exactly as large as the content plus margins.
    pub fn bounding_box(content: &Rect, margin: f64) -> Result<Self, GeometryError> {
        let (width, height) = ensure_extent(content)?;

        Ok(Self {
            width: width + 2.0 * margin,
            height: height + 2.0 * margin,
            content: Rect::from_origin_size(margin, margin, width, height),
            scale: 1.0,
        })
    }

    /// Fixed canvas with the content scaled to fit and centered.
    pub fn fixed_size(
        content: &Rect,
        canvas_width: f64,
        canvas_height: f64,
        margin: f64,
    ) -> Result<Self, GeometryError> {
        let fit = fit_scale(content, canvas_width, canvas_height, margin)?;

        Ok(Self {
            width: canvas_width,
            height: canvas_height,
            content: Rect::from_origin_size(
                fit.offset_x,
                fit.offset_y,
                content.width() * fit.scale,
                content.height() * fit.scale,
            ),
            scale: fit.scale,
        })
    }
}

/// A PDF affine transform `[a b c d e f]` in row-vector convention:
/// `(x, y) -> (a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Build from six numeric operands, as found after `cm` or `Tm`.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [a, b, c, d, e, f] => Some(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }

    /// `self` followed by `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// True when the transform maps axis-aligned rectangles to axis-aligned
    /// rectangles.
    pub fn is_axis_aligned(&self) -> bool {
        (self.b == 0.0 && self.c == 0.0) || (self.a == 0.0 && self.d == 0.0)
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_bounding_box_of_points() {
        let points = [
            Point::new(3.0, 7.0),
            Point::new(-1.0, 2.0),
            Point::new(5.0, 4.0),
        ];
        let bbox = BoundingBox::from_points(&points).unwrap();
        assert_eq!(bbox.as_rect(), Rect::new(-1.0, 2.0, 5.0, 7.0));
        assert!(points.iter().all(|p| bbox.contains(p)));
    }

    #[test]
    fn test_bounding_box_empty() {
        assert_eq!(
            BoundingBox::from_points(&[]).unwrap_err(),
            GeometryError::EmptyRegion
        );
    }

    #[test]
    fn test_display_to_document_reorders_corners() {
        let display = Rect::new(100.0, 50.0, 50.0, 200.0);
        let doc = display_to_document(&display, 2.0).unwrap();
        assert_eq!(doc, Rect::new(25.0, 25.0, 50.0, 100.0));
    }

    #[test]
    fn test_display_to_document_rejects_bad_scale() {
        let display = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(matches!(
            display_to_document(&display, 0.0),
            Err(GeometryError::InvalidScale(_))
        ));
        assert!(display_to_document(&display, f64::NAN).is_err());
    }

    #[test]
    fn test_bounding_box_layout() {
        let layout = CanvasLayout::bounding_box(&Rect::new(25.0, 25.0, 50.0, 100.0), 20.0).unwrap();
        assert_eq!(layout.width, 65.0);
        assert_eq!(layout.height, 115.0);
        assert_eq!(layout.content, Rect::new(20.0, 20.0, 45.0, 95.0));
        assert_eq!(layout.scale, 1.0);
    }

    #[test]
    fn test_fit_scale_limited_by_height() {
        // 100x200 box into 640x640 with margin 20: height limits the scale.
        let fit = fit_scale(&Rect::new(0.0, 0.0, 100.0, 200.0), 640.0, 640.0, 20.0).unwrap();
        assert!(approx(fit.scale, 3.0));
        assert!(approx(fit.offset_x, 170.0));
        assert!(approx(fit.offset_y, 20.0));
    }

    #[test]
    fn test_fit_scale_degenerate() {
        let line = Rect::new(0.0, 10.0, 100.0, 10.0);
        assert!(matches!(
            fit_scale(&line, 640.0, 640.0, 20.0),
            Err(GeometryError::DegenerateBox { .. })
        ));
        assert!(matches!(
            CanvasLayout::bounding_box(&line, 20.0),
            Err(GeometryError::DegenerateBox { .. })
        ));
    }

    #[test]
    fn test_fit_scale_canvas_too_small() {
        let content = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(matches!(
            fit_scale(&content, 40.0, 100.0, 20.0),
            Err(GeometryError::InvalidCanvas { .. })
        ));
    }

    #[test]
    fn test_matrix_composition() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translate(10.0, 5.0);
        // Scale first, then translate.
        let m = scale.then(&shift);
        assert_eq!(m.apply(1.0, 1.0), (12.0, 7.0));
        // Translate first, then scale.
        let m = shift.then(&scale);
        assert_eq!(m.apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn test_matrix_axis_alignment() {
        assert!(Matrix::IDENTITY.is_axis_aligned());
        assert!(Matrix::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0).is_axis_aligned());
        let rotated = Matrix::new(0.7071, 0.7071, -0.7071, 0.7071, 0.0, 0.0);
        assert!(!rotated.is_axis_aligned());
    }
}
