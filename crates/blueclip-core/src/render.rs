//! Region rendering: one new output page per clipped region.

use tracing::debug;

use crate::error::{GeometryError, Result};
use crate::geometry::{CanvasLayout, Rect};
use crate::pdf::{OutputDocument, PageHandle, SourceDocument};

/// Outline color of region boxes on overlay pages.
pub const OVERLAY_RGB: [f64; 3] = [1.0, 0.0, 0.0];

/// Outline width of region boxes on overlay pages.
pub const OVERLAY_LINE_WIDTH: f64 = 0.5;

/// Append a page of `layout`'s size to `output` and draw the part of the
/// source page inside `clip` into the layout's content rectangle.
///
/// Nothing is appended when the page index or the clip is invalid.
pub fn render_region(
    output: &mut OutputDocument,
    source: &SourceDocument,
    page_index: usize,
    clip: &Rect,
    layout: &CanvasLayout,
) -> Result<PageHandle> {
    source.frame(page_index)?;
    let clip = clip.normalized();
    if clip.is_empty() || layout.content.is_empty() {
        return Err(GeometryError::EmptyClip.into());
    }

    let page = output.new_page(layout.width, layout.height);
    output.show_region(page, source, page_index, &clip, &layout.content)?;

    debug!(
        "Rendered page {} clip ({:.1}, {:.1})-({:.1}, {:.1}) onto {:.1}x{:.1} at scale {:.3}",
        page_index + 1,
        clip.x0,
        clip.y0,
        clip.x1,
        clip.y1,
        layout.width,
        layout.height,
        layout.scale
    );
    Ok(page)
}

/// Append a full copy of a source page with every box in `boxes` outlined.
pub fn render_overlay(
    output: &mut OutputDocument,
    source: &SourceDocument,
    page_index: usize,
    boxes: &[Rect],
) -> Result<PageHandle> {
    let frame = source.frame(page_index)?;
    let full = frame.rect();

    let page = output.new_page(frame.width(), frame.height());
    output.show_region(page, source, page_index, &full, &full)?;
    for rect in boxes {
        output.stroke_rect(page, rect, OVERLAY_RGB, OVERLAY_LINE_WIDTH)?;
    }

    debug!("Outlined {} regions on page {}", boxes.len(), page_index + 1);
    Ok(page)
}
