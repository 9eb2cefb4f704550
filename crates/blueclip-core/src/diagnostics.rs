//! Scatter plot of extracted points, for tuning clustering parameters.

use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as ImageRect;
use tracing::debug;

use crate::error::Result;
use crate::geometry::{Point, Rect};
use crate::region::PointSet;

const VECTOR_COLOR: Rgb<u8> = Rgb([31, 119, 180]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 127, 14]);
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const FRAME_COLOR: Rgb<u8> = Rgb([200, 200, 200]);

/// Longest side of the plot area in pixels.
const PLOT_SIZE: f64 = 800.0;
const PADDING: u32 = 16;

/// Plot `points` over the page rectangle: vector points in blue, text points
/// in orange, page top at the top of the image.
pub fn scatter_plot(points: &PointSet, page: &Rect) -> RgbImage {
    let page = page.normalized();
    let scale = if page.is_empty() {
        1.0
    } else {
        PLOT_SIZE / page.width().max(page.height())
    };
    let plot_width = (page.width() * scale).round().max(1.0) as u32;
    let plot_height = (page.height() * scale).round().max(1.0) as u32;

    let mut image = RgbImage::from_pixel(
        plot_width + 2 * PADDING,
        plot_height + 2 * PADDING,
        BACKGROUND,
    );
    draw_frame(&mut image, plot_width, plot_height);

    let to_pixel = |p: &Point| -> (i32, i32) {
        (
            (PADDING as f64 + ((p.x - page.x0) * scale).round()) as i32,
            (PADDING as f64 + ((p.y - page.y0) * scale).round()) as i32,
        )
    };
    for point in points.vector_points() {
        draw_dot(&mut image, to_pixel(point), VECTOR_COLOR);
    }
    for point in points.text_points() {
        draw_dot(&mut image, to_pixel(point), TEXT_COLOR);
    }

    image
}

/// Render [`scatter_plot`] to a PNG file.
pub fn write_scatter(points: &PointSet, page: &Rect, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    scatter_plot(points, page).save(path)?;
    debug!("Wrote scatter plot of {} points to {}", points.len(), path.display());
    Ok(())
}

fn draw_frame(image: &mut RgbImage, plot_width: u32, plot_height: u32) {
    let frame = ImageRect::at(PADDING as i32 - 1, PADDING as i32 - 1)
        .of_size(plot_width + 2, plot_height + 2);
    draw_hollow_rect_mut(image, frame, FRAME_COLOR);
}

/// 3x3 dot centred on `(cx, cy)`.
fn draw_dot(image: &mut RgbImage, (cx, cy): (i32, i32), color: Rgb<u8>) {
    // Keep far-off points just outside the canvas so the rect stays in i32 range.
    let cx = cx.clamp(-2, image.width() as i32 + 1);
    let cy = cy.clamp(-2, image.height() as i32 + 1);
    draw_filled_rect_mut(image, ImageRect::at(cx - 1, cy - 1).of_size(3, 3), color);
}
