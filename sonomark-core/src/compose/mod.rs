//! Frame composition for both canvases.
//!
//! One frame is painted in a fixed order: base layer (tiles or waveform,
//! axis markers), playback marker, persisted annotations, then the overlay of
//! the active mode. Interactive overlays therefore always end up on top.

pub mod markers;
pub mod waveform;

use crate::config::DisplaySettings;
use crate::engine::overlay;
use crate::engine::{EngineState, Scene};
use crate::error::TileError;
use crate::playback::PlaybackSync;
use crate::surface::DrawingSurface;
use crate::transform;
use crate::types::{CanvasId, Interval, Window};

const BACKGROUND: &str = "#000";
const STATUS_FONT: &str = "13px sans-serif";
const STATUS_COLOR: &str = "rgba(255,255,255,0.6)";
const ERROR_COLOR: &str = "rgba(255,120,120,0.9)";

pub const LOADING_TEXT: &str = "Loading spectrogram…";
pub const UNAVAILABLE_TEXT: &str = "Spectrogram unavailable";

/// State of one time segment of the spectrogram.
#[derive(Debug)]
pub enum TileState<'a, I> {
    Ready(&'a I),
    Loading,
    Failed(&'a TileError),
}

/// A tile placed in domain space: `segment` in time, `freq` the full range
/// the tile service rendered (0 to Nyquist).
#[derive(Debug)]
pub struct TileSlot<'a, I> {
    pub segment: Interval,
    pub freq: Interval,
    pub state: TileState<'a, I>,
}

#[derive(Debug)]
pub enum BaseLayer<'a, I> {
    Spectrogram(Vec<TileSlot<'a, I>>),
    Waveform { samples: &'a [f32], sample_rate: u32 },
}

/// Overall tile status of a spectrogram frame, for cursor and status text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Ready,
    Loading,
    Failed,
}

impl<I> BaseLayer<'_, I> {
    pub fn status(&self) -> LoadStatus {
        let BaseLayer::Spectrogram(tiles) = self else {
            return LoadStatus::Ready;
        };
        if tiles.iter().any(|t| matches!(t.state, TileState::Failed(_))) {
            LoadStatus::Failed
        } else if tiles.iter().any(|t| matches!(t.state, TileState::Loading)) {
            LoadStatus::Loading
        } else {
            LoadStatus::Ready
        }
    }
}

pub struct Frame<'a, I> {
    pub canvas: CanvasId,
    pub base: BaseLayer<'a, I>,
    pub playback: &'a PlaybackSync,
    pub state: &'a EngineState,
    pub scene: &'a Scene<'a>,
    pub settings: &'a DisplaySettings,
}

fn status_text<S: DrawingSurface>(surface: &mut S, text: &str, color: &str) {
    let size = surface.size();
    let tw = surface.text_width(text, STATUS_FONT);
    surface.fill_text(text, ((size.width - tw) / 2.0).max(4.0), size.height / 2.0, STATUS_FONT, color);
}

fn draw_tiles<S: DrawingSurface>(surface: &mut S, tiles: &[TileSlot<'_, S::Image>], window: &Window) {
    let size = surface.size();
    surface.fill_rect(0.0, 0.0, size.width, size.height, BACKGROUND);

    let mut failure = None;
    let mut loading = false;
    let mut drawn = false;
    for tile in tiles {
        match tile.state {
            TileState::Ready(image) => {
                let top_left = transform::to_pixel(tile.segment.min, tile.freq.max, window, size);
                let bottom_right = transform::to_pixel(tile.segment.max, tile.freq.min, window, size);
                if let (Some((x0, y0)), Some((x1, y1))) = (top_left, bottom_right) {
                    surface.draw_image(image, x0, y0, x1 - x0, y1 - y0);
                    drawn = true;
                }
            }
            TileState::Loading => loading = true,
            TileState::Failed(e) => failure = failure.or(Some(e)),
        }
    }

    if let Some(e) = failure {
        status_text(surface, &format!("{UNAVAILABLE_TEXT}: {e}"), ERROR_COLOR);
    } else if loading && !drawn {
        status_text(surface, LOADING_TEXT, STATUS_COLOR);
    }
}

/// Paint one canvas.
pub fn compose<S: DrawingSurface>(surface: &mut S, frame: &Frame<'_, S::Image>) {
    let window = frame.scene.window_for(frame.canvas);

    match &frame.base {
        BaseLayer::Spectrogram(tiles) => {
            draw_tiles(surface, tiles, &window);
            markers::draw_freq_markers(surface, &window);
        }
        BaseLayer::Waveform { samples, sample_rate } => {
            waveform::draw_waveform(surface, samples, *sample_rate, window.time);
        }
    }
    markers::draw_time_markers(surface, &window);

    frame.playback.draw(surface, &window);

    overlay::draw_annotations(
        surface,
        frame.scene.annotations,
        frame.canvas,
        &window,
        frame.state.selected,
        frame.settings.show_labels(),
    );

    overlay::draw_mode(surface, frame.state, frame.scene, frame.canvas);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::Mode;
    use crate::geometry::{BoundingBox, Geometry};
    use crate::measure::{MeasureMessage, HIGHLIGHT_COLOR};
    use crate::playback::MARKER_COLOR;
    use crate::surface::recording::{Op, RecordingSurface};
    use crate::types::{AnnotationId, CanvasSize, SoundEventAnnotation};

    fn annotations() -> Vec<SoundEventAnnotation> {
        vec![SoundEventAnnotation {
            id: AnnotationId(1),
            geometry: Geometry::BoundingBox(BoundingBox { time_min: 2.0, freq_min: 1000.0, time_max: 4.0, freq_max: 8000.0 }),
            tags: vec![],
            features: vec![],
            created_by: None,
        }]
    }

    fn scene<'a>(annotations: &'a [SoundEventAnnotation], config: &'a EngineConfig) -> Scene<'a> {
        Scene {
            annotations,
            window: Window::new(Interval::new(0.0, 10.0), Interval::new(0.0, 22050.0)),
            bounds: Window::for_clip(60.0, 44_100),
            spectrogram_size: CanvasSize::new(800.0, 400.0),
            waveform_size: CanvasSize::new(800.0, 100.0),
            config,
        }
    }

    #[test]
    fn test_frame_order() {
        let anns = annotations();
        let config = EngineConfig::default();
        let scene = scene(&anns, &config);
        let mut playback = PlaybackSync::new();
        playback.set_time(1.0);
        let state = EngineState { mode: Mode::Edit, selected: Some(AnnotationId(1)), ..Default::default() };
        let settings = DisplaySettings::default();
        let image = 7u32;
        let frame = Frame {
            canvas: CanvasId::Spectrogram,
            base: BaseLayer::Spectrogram(vec![TileSlot {
                segment: Interval::new(0.0, 10.0),
                freq: Interval::new(0.0, 22050.0),
                state: TileState::Ready(&image),
            }]),
            playback: &playback,
            state: &state,
            scene: &scene,
            settings: &settings,
        };
        let mut surface = RecordingSurface::new(800.0, 400.0);
        compose(&mut surface, &frame);

        let image_at = surface.ops.iter().position(|op| matches!(op, Op::Image { id: 7, .. })).unwrap();
        let marker_at = surface.first_with(MARKER_COLOR).unwrap();
        let annotation_at = surface.first_with(overlay::SELECTED_COLOR).unwrap();
        let handle_at = surface.first_with("#fff").unwrap();
        assert!(image_at < marker_at, "base before playback");
        assert!(marker_at < annotation_at, "playback before annotations");
        assert!(annotation_at < handle_at, "annotations before the mode overlay");
        assert_eq!(surface.ops[image_at], Op::Image { id: 7, x: 0.0, y: 0.0, w: 800.0, h: 400.0 });
    }

    #[test]
    fn test_loading_and_error_text() {
        let anns = Vec::new();
        let config = EngineConfig::default();
        let scene = scene(&anns, &config);
        let playback = PlaybackSync::new();
        let state = EngineState::default();
        let settings = DisplaySettings::default();

        let loading: Frame<'_, u32> = Frame {
            canvas: CanvasId::Spectrogram,
            base: BaseLayer::Spectrogram(vec![TileSlot {
                segment: Interval::new(0.0, 10.0),
                freq: Interval::new(0.0, 22050.0),
                state: TileState::Loading,
            }]),
            playback: &playback,
            state: &state,
            scene: &scene,
            settings: &settings,
        };
        assert_eq!(loading.base.status(), LoadStatus::Loading);
        let mut surface = RecordingSurface::new(800.0, 400.0);
        compose(&mut surface, &loading);
        assert!(surface.texts().contains(&LOADING_TEXT));

        let error = TileError::ImageLoad("404".into());
        let failed: Frame<'_, u32> = Frame {
            base: BaseLayer::Spectrogram(vec![TileSlot {
                segment: Interval::new(0.0, 10.0),
                freq: Interval::new(0.0, 22050.0),
                state: TileState::Failed(&error),
            }]),
            ..loading
        };
        assert_eq!(failed.base.status(), LoadStatus::Failed);
        let mut surface = RecordingSurface::new(800.0, 400.0);
        compose(&mut surface, &failed);
        assert!(surface.texts().contains(&"Spectrogram unavailable: image load failed: 404"));
    }

    #[test]
    fn test_waveform_keeps_measurement_highlight() {
        let anns = annotations();
        let config = EngineConfig::default();
        let scene = scene(&anns, &config);
        let playback = PlaybackSync::new();
        let mut state = EngineState::default();
        state.measurement.publish(MeasureMessage::Started { canvas: CanvasId::Spectrogram, at: (1.0, 100.0) });
        state.measurement.publish(MeasureMessage::Finished { canvas: CanvasId::Spectrogram, at: (3.0, 900.0) });
        let settings = DisplaySettings::default();
        let samples = vec![0.1f32; 4410];
        let frame = Frame {
            canvas: CanvasId::Waveform,
            base: BaseLayer::Waveform { samples: &samples, sample_rate: 441 },
            playback: &playback,
            state: &state,
            scene: &scene,
            settings: &settings,
        };
        let mut surface = RecordingSurface::new(800.0, 100.0);
        compose(&mut surface, &frame);
        let highlight = surface
            .ops
            .iter()
            .find_map(|op| match op {
                Op::FillRect { x, w, color, .. } if color == HIGHLIGHT_COLOR => Some((*x, *w)),
                _ => None,
            })
            .unwrap();
        assert_eq!(highlight, (80.0, 160.0));
    }
}
