//! Minimal 2D drawing surface the engine paints on.
//!
//! The browser host implements it over `CanvasRenderingContext2d`; tests use
//! a recording double. Colors are CSS color strings.

use crate::types::CanvasSize;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke<'a> {
    pub color: &'a str,
    pub width: f64,
    /// Dash pattern in pixels; solid when empty.
    pub dash: &'a [f64],
}

impl<'a> Stroke<'a> {
    pub const fn solid(color: &'a str, width: f64) -> Self {
        Self { color, width, dash: &[] }
    }

    pub const fn dashed(color: &'a str, width: f64, dash: &'a [f64]) -> Self {
        Self { color, width, dash }
    }
}

pub trait DrawingSurface {
    /// Decoded image type blitted by [`DrawingSurface::draw_image`].
    type Image;

    fn size(&self) -> CanvasSize;

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str);

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64, stroke: Stroke<'_>);

    fn stroke_path(&mut self, points: &[(f64, f64)], stroke: Stroke<'_>);

    fn fill_text(&mut self, text: &str, x: f64, y: f64, font: &str, color: &str);

    /// Width of `text` in pixels. Hosts without text metrics may estimate.
    fn text_width(&self, text: &str, _font: &str) -> f64 {
        text.chars().count() as f64 * 6.0
    }

    /// Blit `image` scaled into the destination rectangle.
    fn draw_image(&mut self, image: &Self::Image, x: f64, y: f64, w: f64, h: f64);

    fn clear(&mut self, color: &str) {
        let size = self.size();
        self.fill_rect(0.0, 0.0, size.width, size.height, color);
    }

    fn line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, stroke: Stroke<'_>) {
        self.stroke_path(&[(x0, y0), (x1, y1)], stroke);
    }
}
