//! Point extraction: flattens a page's primitives and text spans into the
//! coordinates that feed clustering.

use tracing::{debug, trace};

use crate::error::ExtractionError;
use crate::geometry::Point;
use crate::models::config::ExtractionConfig;
use crate::pdf::{PageContent, Primitive};

/// Points extracted from one page, vector-derived points first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    points: Vec<Point>,
    vector_count: usize,
}

impl PointSet {
    /// Build from separately collected vector and text points.
    pub fn new(vector: Vec<Point>, text: Vec<Point>) -> Self {
        let vector_count = vector.len();
        let mut points = vector;
        points.extend(text);
        Self {
            points,
            vector_count,
        }
    }

    /// All points in extraction order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn vector_points(&self) -> &[Point] {
        &self.points[..self.vector_count]
    }

    pub fn text_points(&self) -> &[Point] {
        &self.points[self.vector_count..]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Converts page content into a [`PointSet`].
#[derive(Debug, Clone, Default)]
pub struct PointExtractor {
    include_text_points: bool,
    expand_quads: bool,
}

impl PointExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new()
            .with_text_points(config.include_text_points)
            .with_quad_expansion(config.expand_quads)
    }

    /// Add the two corners of every text span to the point set.
    pub fn with_text_points(mut self, enabled: bool) -> Self {
        self.include_text_points = enabled;
        self
    }

    /// Contribute the four corners of quads instead of skipping them.
    pub fn with_quad_expansion(mut self, enabled: bool) -> Self {
        self.expand_quads = enabled;
        self
    }

    /// Extract points from one page.
    pub fn extract(&self, page: &PageContent) -> Result<PointSet, ExtractionError> {
        let mut vector = Vec::with_capacity(page.primitives.len() * 2);

        for primitive in &page.primitives {
            match primitive {
                Primitive::Line(a, b) => vector.extend([*a, *b]),
                Primitive::Rectangle(rect) => {
                    vector.extend([Point::new(rect.x0, rect.y0), Point::new(rect.x1, rect.y1)])
                }
                Primitive::Quad(corners) => {
                    if self.expand_quads {
                        vector.extend(corners.iter().copied());
                    }
                }
                Primitive::Curve(_) => {}
                Primitive::Unknown { operator } => {
                    return Err(ExtractionError::UnsupportedPrimitive {
                        operator: operator.clone(),
                    });
                }
            }
        }

        let mut text = Vec::new();
        if self.include_text_points {
            text.reserve(page.text_spans.len() * 2);
            for span in &page.text_spans {
                text.extend([
                    Point::new(span.rect.x0, span.rect.y0),
                    Point::new(span.rect.x1, span.rect.y1),
                ]);
            }
        }

        let before = vector.len() + text.len();
        vector.retain(Point::is_finite);
        text.retain(Point::is_finite);
        let dropped = before - vector.len() - text.len();
        if dropped > 0 {
            trace!("Dropped {} non-finite points", dropped);
        }

        debug!(
            "Page {}: extracted {} vector points, {} text points",
            page.index + 1,
            vector.len(),
            text.len()
        );

        Ok(PointSet::new(vector, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::pdf::TextSpan;
    use pretty_assertions::assert_eq;

    fn page(primitives: Vec<Primitive>) -> PageContent {
        PageContent {
            index: 0,
            rect: Rect::new(0.0, 0.0, 100.0, 100.0),
            primitives,
            text_spans: vec![TextSpan {
                rect: Rect::new(5.0, 6.0, 7.0, 8.0),
                text: "A-1".to_string(),
            }],
        }
    }

    fn quad() -> Primitive {
        Primitive::Quad([
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ])
    }

    #[test]
    fn test_lines_and_rectangles() {
        let page = page(vec![
            Primitive::Line(Point::new(0.0, 0.0), Point::new(10.0, 10.0)),
            Primitive::Rectangle(Rect::new(1.0, 2.0, 3.0, 4.0)),
        ]);
        let points = PointExtractor::new().extract(&page).unwrap();
        assert_eq!(
            points.points(),
            &[
                Point::new(0.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(1.0, 2.0),
                Point::new(3.0, 4.0),
            ]
        );
        assert!(points.text_points().is_empty());
    }

    #[test]
    fn test_curves_always_skipped() {
        let curve = Primitive::Curve([Point::new(0.0, 0.0); 4]);
        let points = PointExtractor::new()
            .with_quad_expansion(true)
            .extract(&page(vec![curve]))
            .unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn test_quads_follow_configuration() {
        let skipped = PointExtractor::new().extract(&page(vec![quad()])).unwrap();
        assert!(skipped.is_empty());

        let expanded = PointExtractor::new()
            .with_quad_expansion(true)
            .extract(&page(vec![quad()]))
            .unwrap();
        assert_eq!(expanded.len(), 4);
    }

    #[test]
    fn test_text_points_follow_configuration() {
        let line = Primitive::Line(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        let with_text = PointExtractor::new()
            .with_text_points(true)
            .extract(&page(vec![line]))
            .unwrap();
        assert_eq!(with_text.vector_points().len(), 2);
        assert_eq!(
            with_text.text_points(),
            &[Point::new(5.0, 6.0), Point::new(7.0, 8.0)]
        );
    }

    #[test]
    fn test_unknown_primitive_fails() {
        let page = page(vec![Primitive::Unknown {
            operator: "l".to_string(),
        }]);
        let err = PointExtractor::new().extract(&page).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedPrimitive { .. }));
    }

    #[test]
    fn test_empty_page() {
        let page = PageContent::default();
        assert!(PointExtractor::new().extract(&page).unwrap().is_empty());
    }
}
