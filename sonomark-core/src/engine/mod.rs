//! Annotation interaction state machine.
//!
//! [`EngineState`] is plain serializable data. Every input goes through
//! [`transition`], which returns the next state plus the side effects the
//! host must run (mutation intents, viewport requests, selection callbacks).
//! The engine never performs I/O itself; async results come back as events.

pub mod hit;
pub mod overlay;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::geometry::{Geometry, GeometryType, Handle};
use crate::measure::{MeasureBus, MeasureMessage};
use crate::transform;
use crate::types::{AnnotationId, CanvasId, CanvasSize, SoundEventAnnotation, Tag, Window};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Idle,
    Select,
    Draw,
    Edit,
    Delete,
    Measure,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Select => "select",
            Mode::Draw => "draw",
            Mode::Edit => "edit",
            Mode::Delete => "delete",
            Mode::Measure => "measure",
        }
    }

    /// Modes reachable while the engine is disabled.
    pub fn allowed_when_disabled(&self) -> bool {
        matches!(self, Mode::Idle | Mode::Select)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a pointer press grabbed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Grab {
    /// Idle-mode hand: drags the view. Keeps the window at press time.
    Pan { window: Window },
    /// Draw mode: the drag spans the new shape.
    Sketch,
    /// Edit mode: a handle (or the body) of the selected annotation.
    Resize(Handle),
    /// Edit mode: pressed away from the selection; dragging copies it.
    Copy,
    /// Select/delete mode, or edit mode without a selection. Acts on release.
    Click,
    Measure,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Drag {
    pub canvas: CanvasId,
    pub grab: Grab,
    pub start_px: (f64, f64),
    pub current_px: (f64, f64),
    pub moved: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub mode: Mode,
    pub geometry_type: GeometryType,
    pub selected: Option<AnnotationId>,
    pub hover: Option<AnnotationId>,
    pub disabled: bool,
    /// Restricts next/previous cycling to annotations carrying this tag.
    pub tag_filter: Option<Tag>,
    pub measurement: MeasureBus,
    pub drag: Option<Drag>,
    /// A create or copy is in flight; its result becomes the selection.
    pub awaiting_created: bool,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            mode: Mode::Idle,
            geometry_type: GeometryType::BoundingBox,
            selected: None,
            hover: None,
            disabled: false,
            tag_filter: None,
            measurement: MeasureBus::default(),
            drag: None,
            awaiting_created: false,
        }
    }
}

/// Everything outside the engine a transition may read.
#[derive(Clone, Copy, Debug)]
pub struct Scene<'a> {
    pub annotations: &'a [SoundEventAnnotation],
    /// Spectrogram window. The waveform shares its time axis.
    pub window: Window,
    /// Extent of the clip; persisted shapes never leave it.
    pub bounds: Window,
    pub spectrogram_size: CanvasSize,
    pub waveform_size: CanvasSize,
    pub config: &'a EngineConfig,
}

impl Scene<'_> {
    pub fn window_for(&self, canvas: CanvasId) -> Window {
        match canvas {
            CanvasId::Spectrogram => self.window,
            CanvasId::Waveform => Window::waveform(self.window.time),
        }
    }

    pub fn size_for(&self, canvas: CanvasId) -> CanvasSize {
        match canvas {
            CanvasId::Spectrogram => self.spectrogram_size,
            CanvasId::Waveform => self.waveform_size,
        }
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&SoundEventAnnotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    fn to_domain(&self, canvas: CanvasId, px: (f64, f64)) -> Option<(f64, f64)> {
        transform::to_domain(px.0, px.1, &self.window_for(canvas), self.size_for(canvas))
    }

    /// Drawn corners stop at the clip edges even when the pointer, captured
    /// by the canvas, has left it.
    fn sketch_corner(&self, canvas: CanvasId, px: (f64, f64)) -> Option<(f64, f64)> {
        self.to_domain(canvas, px).map(|p| self.bounds.clamp_point(p))
    }

    /// Annotations whose extent intersects the spectrogram window.
    pub fn visible(&self) -> impl Iterator<Item = &SoundEventAnnotation> + '_ {
        self.annotations.iter().filter(|a| {
            let time_ok = a.geometry.time_range().overlaps(&self.window.time);
            let freq_ok = a.geometry.freq_range().is_none_or(|f| f.overlaps(&self.window.freq));
            time_ok && freq_ok
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Enable(Mode),
    SetGeometryType(GeometryType),
    SetDisabled(bool),
    SetTagFilter(Option<Tag>),
    PointerDown { canvas: CanvasId, x: f64, y: f64 },
    PointerMove { canvas: CanvasId, x: f64, y: f64 },
    PointerUp { canvas: CanvasId, x: f64, y: f64 },
    /// Pointer left a canvas: hover is dropped, drags continue.
    PointerLeave { canvas: CanvasId },
    /// Escape: back to idle from anywhere.
    Abort,
    SelectNext,
    SelectPrevious,
    DeleteSelected,
    AddTag(Tag),
    RemoveTag(Tag),
    /// The collaborator finished a create or copy.
    Created(SoundEventAnnotation),
    Updated(SoundEventAnnotation),
    Deleted(AnnotationId),
    MutationFailed(String),
}

/// Side effects for the host to run, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Create { geometry: Geometry, tags: Vec<Tag> },
    UpdateGeometry { id: AnnotationId, geometry: Geometry },
    /// Duplicate an annotation's tags onto a new geometry.
    Copy { source: AnnotationId, geometry: Geometry, tags: Vec<Tag> },
    Delete { id: AnnotationId },
    AddTag { id: AnnotationId, tag: Tag },
    RemoveTag { id: AnnotationId, tag: Tag },
    CenterOn { time: f64 },
    /// Requested window; the host clamps it through the viewport.
    SetWindow(Window),
    Select(AnnotationId),
    Deselect,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: EngineState,
    pub effects: Vec<Effect>,
}

impl EngineState {
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Shape the current drag would produce if released now: the new shape
    /// in draw mode, the resized or copied selection in edit mode.
    pub fn drag_preview(&self, scene: &Scene) -> Option<Geometry> {
        let drag = self.drag.filter(|d| d.moved && d.canvas == CanvasId::Spectrogram)?;
        if drag.grab == Grab::Sketch {
            let start = scene.sketch_corner(drag.canvas, drag.start_px)?;
            let end = scene.sketch_corner(drag.canvas, drag.current_px)?;
            return self.geometry_type.from_drag(start, end).ok();
        }
        let start = scene.to_domain(drag.canvas, drag.start_px)?;
        let end = scene.to_domain(drag.canvas, drag.current_px)?;
        let (dt, df) = (end.0 - start.0, end.1 - start.1);
        match drag.grab {
            Grab::Resize(handle) => {
                let selected = scene.annotation(self.selected?)?;
                Some(selected.geometry.apply_drag(handle, dt, df))
            }
            Grab::Copy => {
                let selected = scene.annotation(self.selected?)?;
                Some(selected.geometry.translate(dt, df))
            }
            Grab::Sketch | Grab::Pan { .. } | Grab::Click | Grab::Measure => None,
        }
    }
}

/// Advance the engine by one event.
///
/// Fails only with [`EngineError::TransitionGuard`], when a mode other than
/// idle or select is requested while the engine is disabled. Invalid drawn
/// geometry is dropped without an error.
pub fn transition(state: &EngineState, event: Event, scene: &Scene) -> Result<Transition, EngineError> {
    let mut next = state.clone();
    let mut effects = Vec::new();

    match event {
        Event::Enable(mode) => {
            if next.disabled && !mode.allowed_when_disabled() {
                log::error!("Refusing to enter {mode} mode from {} while disabled", next.mode);
                return Err(EngineError::TransitionGuard { from: next.mode, to: mode });
            }
            next.mode = mode;
            next.drag = None;
            next.hover = None;
            if mode != Mode::Edit {
                next.selected = None;
            }
            if mode == Mode::Measure {
                next.measurement.publish(MeasureMessage::Cleared);
            }
        }
        Event::SetGeometryType(kind) => next.geometry_type = kind,
        Event::SetDisabled(disabled) => {
            next.disabled = disabled;
            if disabled && !next.mode.allowed_when_disabled() {
                next.mode = Mode::Idle;
                next.drag = None;
            }
        }
        Event::SetTagFilter(tag) => next.tag_filter = tag,
        Event::PointerDown { canvas, x, y } => on_pointer_down(&mut next, canvas, (x, y), scene),
        Event::PointerMove { canvas, x, y } => on_pointer_move(&mut next, canvas, (x, y), scene, &mut effects),
        Event::PointerUp { canvas, x, y } => on_pointer_up(&mut next, canvas, (x, y), scene, &mut effects),
        Event::PointerLeave { .. } => next.hover = None,
        Event::Abort => {
            if next.measurement.is_measuring() {
                next.measurement.publish(MeasureMessage::Cleared);
            }
            next.mode = Mode::Idle;
            next.selected = None;
            next.hover = None;
            next.drag = None;
            next.awaiting_created = false;
            effects.push(Effect::Deselect);
        }
        Event::SelectNext => cycle(&mut next, scene, true, &mut effects),
        Event::SelectPrevious => cycle(&mut next, scene, false, &mut effects),
        Event::DeleteSelected => {
            if let Some(id) = next.selected.filter(|_| !next.disabled) {
                effects.push(Effect::Delete { id });
                next.selected = None;
                next.hover = None;
                next.mode = Mode::Idle;
            }
        }
        Event::AddTag(tag) => {
            if let Some(id) = next.selected.filter(|_| !next.disabled) {
                effects.push(Effect::AddTag { id, tag });
            }
        }
        Event::RemoveTag(tag) => {
            if let Some(id) = next.selected.filter(|_| !next.disabled) {
                effects.push(Effect::RemoveTag { id, tag });
            }
        }
        Event::Created(annotation) => {
            if next.awaiting_created {
                next.awaiting_created = false;
                next.selected = Some(annotation.id);
                effects.push(Effect::Select(annotation.id));
            }
        }
        Event::Updated(_) => {}
        Event::Deleted(id) => {
            if next.selected == Some(id) {
                next.selected = None;
            }
            if next.hover == Some(id) {
                next.hover = None;
            }
        }
        Event::MutationFailed(reason) => {
            log::warn!("Annotation change rejected: {reason}");
            next.awaiting_created = false;
        }
    }

    Ok(Transition { state: next, effects })
}

fn on_pointer_down(state: &mut EngineState, canvas: CanvasId, px: (f64, f64), scene: &Scene) {
    if state.drag.is_some() {
        return;
    }
    let window = scene.window_for(canvas);
    let size = scene.size_for(canvas);
    let grab = match (state.mode, canvas) {
        (Mode::Idle, _) => Grab::Pan { window: scene.window },
        (Mode::Measure, _) => {
            let Some(at) = scene.to_domain(canvas, px) else { return };
            if !state.measurement.publish(MeasureMessage::Started { canvas, at }) {
                return;
            }
            Grab::Measure
        }
        // the waveform only carries the idle hand and the ruler
        (_, CanvasId::Waveform) => return,
        (Mode::Select | Mode::Delete, _) => Grab::Click,
        (Mode::Draw, _) => Grab::Sketch,
        (Mode::Edit, _) => {
            let selected = state.selected.and_then(|id| scene.annotation(id));
            match selected {
                None => Grab::Click,
                Some(a) => {
                    let radius = scene.config.handle_radius_px;
                    let tolerance = scene.config.hit_tolerance_px;
                    if let Some(handle) = hit::handle_at(&a.geometry, px.0, px.1, &window, size, radius) {
                        Grab::Resize(handle)
                    } else if hit::footprint(&a.geometry, &window, size, false)
                        .is_some_and(|fp| fp.contains(px.0, px.1, tolerance))
                    {
                        Grab::Resize(Handle::Body)
                    } else {
                        Grab::Copy
                    }
                }
            }
        }
    };
    state.drag = Some(Drag { canvas, grab, start_px: px, current_px: px, moved: false });
}

fn on_pointer_move(
    state: &mut EngineState,
    canvas: CanvasId,
    px: (f64, f64),
    scene: &Scene,
    effects: &mut Vec<Effect>,
) {
    let Some(mut drag) = state.drag else {
        if matches!(state.mode, Mode::Select | Mode::Edit | Mode::Delete) && canvas == CanvasId::Spectrogram {
            state.hover = hit::annotation_at(
                scene.annotations,
                px.0,
                px.1,
                &scene.window,
                scene.spectrogram_size,
                scene.config.hit_tolerance_px,
            );
        }
        return;
    };
    if drag.canvas != canvas {
        return;
    }
    drag.current_px = px;
    let travel = (px.0 - drag.start_px.0).hypot(px.1 - drag.start_px.1);
    drag.moved |= travel > scene.config.click_slop_px;
    state.drag = Some(drag);

    match drag.grab {
        Grab::Pan { window } if drag.moved => {
            if let Some(w) = panned(window, canvas, drag.start_px, px, scene) {
                effects.push(Effect::SetWindow(w));
            }
        }
        Grab::Measure => {
            if let Some(to) = scene.to_domain(canvas, px) {
                state.measurement.publish(MeasureMessage::Moved { canvas, to });
            }
        }
        _ => {}
    }
}

/// Window after dragging the view from `from` to `to` (pixels). The content
/// follows the pointer; the waveform only pans in time.
fn panned(window: Window, canvas: CanvasId, from: (f64, f64), to: (f64, f64), scene: &Scene) -> Option<Window> {
    let size = scene.size_for(canvas);
    let canvas_window = match canvas {
        CanvasId::Spectrogram => window,
        CanvasId::Waveform => Window::waveform(window.time),
    };
    let tpp = transform::time_per_pixel(&canvas_window, size)?;
    let dt = -(to.0 - from.0) * tpp;
    let df = match canvas {
        CanvasId::Spectrogram => (to.1 - from.1) * transform::freq_per_pixel(&window, size)?,
        CanvasId::Waveform => 0.0,
    };
    Some(Window::new(window.time.shifted(dt), window.freq.shifted(df)))
}

fn on_pointer_up(
    state: &mut EngineState,
    canvas: CanvasId,
    px: (f64, f64),
    scene: &Scene,
    effects: &mut Vec<Effect>,
) {
    let Some(mut drag) = state.drag else { return };
    if drag.canvas != canvas {
        return;
    }
    state.drag = None;
    drag.current_px = px;
    drag.moved |= (px.0 - drag.start_px.0).hypot(px.1 - drag.start_px.1) > scene.config.click_slop_px;

    match drag.grab {
        Grab::Pan { window } => {
            if drag.moved {
                if let Some(w) = panned(window, canvas, drag.start_px, px, scene) {
                    effects.push(Effect::SetWindow(w));
                }
            }
        }
        Grab::Measure => {
            if let Some(at) = scene.to_domain(canvas, px) {
                state.measurement.publish(MeasureMessage::Finished { canvas, at });
            }
        }
        Grab::Sketch => {
            let (Some(start), Some(end)) = (scene.sketch_corner(canvas, drag.start_px), scene.sketch_corner(canvas, px))
            else {
                return;
            };
            let drawn = state.geometry_type.from_drag(start, end).and_then(|g| {
                g.ensure_persistable()?;
                g.validate()
            });
            match drawn {
                Ok(geometry) => {
                    state.awaiting_created = true;
                    effects.push(Effect::Create { geometry, tags: scene.config.default_tags.clone() });
                }
                Err(e) => log::debug!("Dropping drawn {}: {e}", state.geometry_type),
            }
        }
        Grab::Resize(_) | Grab::Copy if drag.moved => {
            let Some(source) = state.selected.and_then(|id| scene.annotation(id)) else { return };
            state.drag = Some(drag);
            let preview = state.drag_preview(scene);
            state.drag = None;
            let Some(geometry) = preview else { return };
            let geometry = match geometry.validate().and_then(|g| g.within(&scene.bounds)) {
                Ok(g) => g,
                Err(e) => {
                    log::debug!("Dropping edit of {}: {e}", source.id);
                    return;
                }
            };
            if matches!(drag.grab, Grab::Copy) {
                state.awaiting_created = true;
                effects.push(Effect::Copy { source: source.id, geometry, tags: source.tags.clone() });
            } else {
                effects.push(Effect::UpdateGeometry { id: source.id, geometry });
            }
        }
        Grab::Click | Grab::Resize(_) | Grab::Copy => on_click(state, px, scene, effects),
    }
}

fn on_click(state: &mut EngineState, px: (f64, f64), scene: &Scene, effects: &mut Vec<Effect>) {
    let hit = hit::annotation_at(
        scene.annotations,
        px.0,
        px.1,
        &scene.window,
        scene.spectrogram_size,
        scene.config.hit_tolerance_px,
    );
    let Some(id) = hit else { return };
    match state.mode {
        Mode::Select | Mode::Edit => {
            state.selected = Some(id);
            if !state.disabled {
                state.mode = Mode::Edit;
            }
            effects.push(Effect::Select(id));
        }
        Mode::Delete if !state.disabled => {
            effects.push(Effect::Delete { id });
            if state.selected == Some(id) {
                state.selected = None;
            }
            state.hover = None;
            state.mode = Mode::Idle;
        }
        _ => {}
    }
}

/// Step the selection through the visible annotations in time order.
fn cycle(state: &mut EngineState, scene: &Scene, forward: bool, effects: &mut Vec<Effect>) {
    let mut ordered: Vec<&SoundEventAnnotation> = scene
        .visible()
        .filter(|a| state.tag_filter.as_ref().is_none_or(|t| a.has_tag(t)))
        .collect();
    if ordered.is_empty() {
        return;
    }
    ordered.sort_by(|a, b| {
        a.geometry
            .start_coordinate()
            .total_cmp(&b.geometry.start_coordinate())
            .then(a.id.cmp(&b.id))
    });

    let n = ordered.len();
    let current = state.selected.and_then(|id| ordered.iter().position(|a| a.id == id));
    let index = match (current, forward) {
        (Some(i), true) => (i + 1) % n,
        (Some(i), false) => (i + n - 1) % n,
        (None, true) => 0,
        (None, false) => n - 1,
    };
    let target = ordered[index];

    state.selected = Some(target.id);
    state.mode = if state.disabled { Mode::Select } else { Mode::Edit };
    effects.push(Effect::Select(target.id));

    let range = target.geometry.time_range();
    if !scene.window.time.encloses(&range) {
        effects.push(Effect::CenterOn { time: range.center() });
    }
}
