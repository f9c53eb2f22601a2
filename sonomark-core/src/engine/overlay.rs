//! Annotation layer and the per-mode overlays painted above it.

use super::hit::{self, Footprint};
use super::{EngineState, Mode, Scene};
use crate::geometry::Geometry;
use crate::measure;
use crate::surface::{DrawingSurface, Stroke};
use crate::types::{AnnotationId, CanvasId, SoundEventAnnotation, Window};

pub const ANNOTATION_COLOR: &str = "rgba(80, 200, 255, 0.9)";
pub const SELECTED_COLOR: &str = "rgba(255, 200, 60, 1.0)";
pub const HOVER_COLOR: &str = "rgba(255, 255, 255, 0.95)";
pub const DELETE_COLOR: &str = "rgba(255, 70, 70, 0.95)";
const DELETE_FILL: &str = "rgba(255, 70, 70, 0.25)";
pub const SKETCH_COLOR: &str = "rgba(120, 255, 120, 0.9)";
const HANDLE_FILL: &str = "#fff";
const LABEL_BG: &str = "rgba(0, 0, 0, 0.55)";
const LABEL_FONT: &str = "11px sans-serif";
const HANDLE_SIZE: f64 = 6.0;

/// Outline a footprint. Lines and bands run the full canvas height.
fn paint<S: DrawingSurface>(surface: &mut S, fp: Footprint, stroke: Stroke<'_>, fill: Option<&str>) {
    let h = surface.size().height;
    match fp {
        Footprint::Line { x } => surface.line(x, 0.0, x, h, stroke),
        Footprint::Band { x0, x1 } => {
            if let Some(fill) = fill {
                surface.fill_rect(x0, 0.0, x1 - x0, h, fill);
            }
            surface.line(x0, 0.0, x0, h, stroke);
            surface.line(x1, 0.0, x1, h, stroke);
        }
        Footprint::Dot { x, y } => {
            if let Some(fill) = fill {
                surface.fill_rect(x - 4.0, y - 4.0, 8.0, 8.0, fill);
            }
            surface.stroke_rect(x - 4.0, y - 4.0, 8.0, 8.0, stroke);
        }
        Footprint::Rect { x, y, w, h } => {
            if let Some(fill) = fill {
                surface.fill_rect(x, y, w, h, fill);
            }
            surface.stroke_rect(x, y, w, h, stroke);
        }
    }
}

fn label_anchor(fp: Footprint) -> (f64, f64) {
    match fp {
        Footprint::Line { x } => (x + 3.0, 14.0),
        Footprint::Band { x0, .. } => (x0 + 3.0, 14.0),
        Footprint::Dot { x, y } => (x + 6.0, y - 6.0),
        Footprint::Rect { x, y, .. } => (x, y - 4.0),
    }
}

/// Paint every annotation. The waveform shows only their time extents.
/// With `show_labels`, the first tag is printed next to each shape.
pub fn draw_annotations<S: DrawingSurface>(
    surface: &mut S,
    annotations: &[SoundEventAnnotation],
    canvas: CanvasId,
    window: &Window,
    selected: Option<AnnotationId>,
    show_labels: bool,
) {
    let size = surface.size();
    let time_only = canvas == CanvasId::Waveform;
    for annotation in annotations {
        let Some(fp) = hit::footprint(&annotation.geometry, window, size, time_only) else {
            continue;
        };
        let color = if selected == Some(annotation.id) { SELECTED_COLOR } else { ANNOTATION_COLOR };
        paint(surface, fp, Stroke::solid(color, 1.5), None);

        if show_labels && !time_only {
            if let Some(tag) = annotation.tags.first() {
                let text = tag.label();
                let (lx, ly) = label_anchor(fp);
                let ly = ly.max(12.0);
                let tw = surface.text_width(&text, LABEL_FONT);
                surface.fill_rect(lx - 1.0, ly - 11.0, tw + 2.0, 13.0, LABEL_BG);
                surface.fill_text(&text, lx, ly, LABEL_FONT, color);
            }
        }
    }
}

fn draw_handles<S: DrawingSurface>(surface: &mut S, geometry: &Geometry, window: &Window) {
    let size = surface.size();
    for (_, x, y) in hit::handle_positions(geometry, window, size) {
        let half = HANDLE_SIZE / 2.0;
        surface.fill_rect(x - half, y - half, HANDLE_SIZE, HANDLE_SIZE, HANDLE_FILL);
        surface.stroke_rect(x - half, y - half, HANDLE_SIZE, HANDLE_SIZE, Stroke::solid(SELECTED_COLOR, 1.0));
    }
}

/// Overlay of the current mode for `canvas`: hover outline in select mode,
/// the shape being drawn, edit handles, the delete target, or the ruler.
pub fn draw_mode<S: DrawingSurface>(surface: &mut S, state: &EngineState, scene: &Scene, canvas: CanvasId) {
    let window = scene.window_for(canvas);
    let size = surface.size();
    let hovered = state.hover.and_then(|id| scene.annotation(id));

    match (state.mode, canvas) {
        (Mode::Measure, _) => measure::draw(surface, &state.measurement, canvas, &window),
        (_, CanvasId::Waveform) => measure::draw_highlight(surface, &state.measurement, &window),
        (Mode::Idle, _) => {}
        (Mode::Select, _) => {
            if let Some(fp) = hovered.and_then(|a| hit::footprint(&a.geometry, &window, size, false)) {
                paint(surface, fp, Stroke::solid(HOVER_COLOR, 2.0), None);
            }
        }
        (Mode::Draw, _) => {
            if let Some(fp) = state.drag_preview(scene).and_then(|g| hit::footprint(&g, &window, size, false)) {
                paint(surface, fp, Stroke::dashed(SKETCH_COLOR, 1.5, &[6.0, 4.0]), None);
            }
        }
        (Mode::Edit, _) => {
            let Some(selected) = state.selected.and_then(|id| scene.annotation(id)) else {
                if let Some(fp) = hovered.and_then(|a| hit::footprint(&a.geometry, &window, size, false)) {
                    paint(surface, fp, Stroke::solid(HOVER_COLOR, 2.0), None);
                }
                return;
            };
            let geometry = state.drag_preview(scene).unwrap_or_else(|| selected.geometry.clone());
            if let Some(fp) = hit::footprint(&geometry, &window, size, false) {
                paint(surface, fp, Stroke::dashed(SELECTED_COLOR, 2.0, &[4.0, 2.0]), None);
            }
            draw_handles(surface, &geometry, &window);
        }
        (Mode::Delete, _) => {
            if let Some(fp) = hovered.and_then(|a| hit::footprint(&a.geometry, &window, size, false)) {
                paint(surface, fp, Stroke::solid(DELETE_COLOR, 2.0), Some(DELETE_FILL));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::geometry::BoundingBox;
    use crate::surface::recording::{Op, RecordingSurface};
    use crate::types::{CanvasSize, Interval, Tag};

    fn ann(id: u64) -> SoundEventAnnotation {
        SoundEventAnnotation {
            id: AnnotationId(id),
            geometry: Geometry::BoundingBox(BoundingBox { time_min: 2.0, freq_min: 200.0, time_max: 4.0, freq_max: 600.0 }),
            tags: vec![Tag::new("species", "Eptesicus")],
            features: vec![],
            created_by: None,
        }
    }

    fn window() -> Window {
        Window::new(Interval::new(0.0, 10.0), Interval::new(0.0, 1000.0))
    }

    #[test]
    fn test_labels_follow_display_toggle() {
        let anns = vec![ann(1)];
        let mut surface = RecordingSurface::new(100.0, 100.0);
        draw_annotations(&mut surface, &anns, CanvasId::Spectrogram, &window(), None, true);
        assert_eq!(surface.texts(), vec!["species: Eptesicus"]);

        let mut surface = RecordingSurface::new(100.0, 100.0);
        draw_annotations(&mut surface, &anns, CanvasId::Spectrogram, &window(), None, false);
        assert!(surface.texts().is_empty());
    }

    #[test]
    fn test_selected_annotation_is_highlighted() {
        let anns = vec![ann(1), ann(2)];
        let mut surface = RecordingSurface::new(100.0, 100.0);
        draw_annotations(&mut surface, &anns, CanvasId::Waveform, &window(), Some(AnnotationId(2)), true);
        let colors = surface.colors();
        assert_eq!(colors.iter().filter(|c| **c == SELECTED_COLOR).count(), 2, "two band edges");
        assert!(surface.texts().is_empty(), "no labels on the waveform");
    }

    #[test]
    fn test_edit_overlay_draws_eight_handles() {
        let anns = vec![ann(1)];
        let config = EngineConfig::default();
        let scene = Scene {
            annotations: &anns,
            window: window(),
            bounds: window(),
            spectrogram_size: CanvasSize::new(100.0, 100.0),
            waveform_size: CanvasSize::new(100.0, 20.0),
            config: &config,
        };
        let state = EngineState { mode: Mode::Edit, selected: Some(AnnotationId(1)), ..Default::default() };
        let mut surface = RecordingSurface::new(100.0, 100.0);
        draw_mode(&mut surface, &state, &scene, CanvasId::Spectrogram);
        let handles = surface
            .ops
            .iter()
            .filter(|op| matches!(op, Op::FillRect { color, .. } if color == HANDLE_FILL))
            .count();
        assert_eq!(handles, 8);
    }

    #[test]
    fn test_delete_hover_is_red() {
        let anns = vec![ann(1)];
        let config = EngineConfig::default();
        let scene = Scene {
            annotations: &anns,
            window: window(),
            bounds: window(),
            spectrogram_size: CanvasSize::new(100.0, 100.0),
            waveform_size: CanvasSize::new(100.0, 20.0),
            config: &config,
        };
        let state = EngineState { mode: Mode::Delete, hover: Some(AnnotationId(1)), ..Default::default() };
        let mut surface = RecordingSurface::new(100.0, 100.0);
        draw_mode(&mut surface, &state, &scene, CanvasId::Spectrogram);
        assert_eq!(surface.colors(), vec![DELETE_FILL, DELETE_COLOR]);
    }
}
