use sonomark_core::surface::{DrawingSurface, Stroke};
use sonomark_core::CanvasSize;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageBitmap};

/// [`DrawingSurface`] over a 2D canvas context.
pub struct WebSurface {
    ctx: CanvasRenderingContext2d,
    size: CanvasSize,
}

impl WebSurface {
    /// Match the canvas backing store to its CSS box and grab the 2D context.
    /// `None` while the canvas is not laid out yet.
    pub fn attach(canvas: &HtmlCanvasElement) -> Option<Self> {
        let rect = canvas.get_bounding_client_rect();
        let display_w = rect.width() as u32;
        let display_h = rect.height() as u32;
        if display_w == 0 || display_h == 0 {
            return None;
        }
        if canvas.width() != display_w || canvas.height() != display_h {
            canvas.set_width(display_w);
            canvas.set_height(display_h);
        }
        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())?;
        Some(Self { ctx, size: CanvasSize::new(display_w as f64, display_h as f64) })
    }

    fn apply_stroke(&self, stroke: &Stroke<'_>) {
        self.ctx.set_stroke_style_str(stroke.color);
        self.ctx.set_line_width(stroke.width);
        let dash = js_sys::Array::new();
        for d in stroke.dash {
            dash.push(&JsValue::from_f64(*d));
        }
        let _ = self.ctx.set_line_dash(&dash);
    }
}

impl DrawingSurface for WebSurface {
    type Image = ImageBitmap;

    fn size(&self) -> CanvasSize {
        self.size
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) {
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_rect(x, y, w, h);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64, stroke: Stroke<'_>) {
        self.apply_stroke(&stroke);
        self.ctx.stroke_rect(x, y, w, h);
    }

    fn stroke_path(&mut self, points: &[(f64, f64)], stroke: Stroke<'_>) {
        let Some(((x0, y0), rest)) = points.split_first() else { return };
        self.apply_stroke(&stroke);
        self.ctx.begin_path();
        self.ctx.move_to(*x0, *y0);
        for (x, y) in rest {
            self.ctx.line_to(*x, *y);
        }
        self.ctx.stroke();
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, font: &str, color: &str) {
        self.ctx.set_font(font);
        self.ctx.set_fill_style_str(color);
        let _ = self.ctx.fill_text(text, x, y);
    }

    fn text_width(&self, text: &str, font: &str) -> f64 {
        self.ctx.set_font(font);
        match self.ctx.measure_text(text) {
            Ok(metrics) => metrics.width(),
            Err(_) => text.chars().count() as f64 * 6.0,
        }
    }

    fn draw_image(&mut self, image: &ImageBitmap, x: f64, y: f64, w: f64, h: f64) {
        if let Err(e) = self.ctx.draw_image_with_image_bitmap_and_dw_and_dh(image, x, y, w, h) {
            log::error!("Failed to draw tile: {e:?}");
        }
    }
}
