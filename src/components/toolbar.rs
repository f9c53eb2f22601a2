use leptos::prelude::*;
use sonomark_core::{Event, GeometryType, Mode, Tag};

use crate::audio::playback;
use crate::interaction;
use crate::state::{save_config, AppState};

const MODES: &[(Mode, &str, &str)] = &[
    (Mode::Idle, "Hand", "Pan the view (Esc)"),
    (Mode::Select, "Select", "Click an annotation to select it (S)"),
    (Mode::Draw, "Draw", "Drag to create an annotation (A)"),
    (Mode::Edit, "Edit", "Move handles, or drag outside to copy (E)"),
    (Mode::Delete, "Delete", "Click an annotation to delete it (D)"),
    (Mode::Measure, "Measure", "Drag to measure time and frequency (M)"),
];

const KINDS: &[GeometryType] = &[
    GeometryType::BoundingBox,
    GeometryType::TimeInterval,
    GeometryType::TimeStamp,
    GeometryType::Point,
];

fn mode_class(active: bool) -> &'static str {
    if active { "layer-btn sel" } else { "layer-btn" }
}

/// `key:value` → tag. Both halves must be non-empty.
fn parse_tag(text: &str) -> Option<Tag> {
    let (key, value) = text.split_once(':')?;
    let (key, value) = (key.trim(), value.trim());
    (!key.is_empty() && !value.is_empty()).then(|| Tag::new(key, value))
}

/// Persist a display toggle so the next page load starts with it.
fn remember(state: &AppState, change: impl FnOnce(&mut sonomark_core::EngineConfig)) {
    state.config.update(change);
    state.config.with_untracked(save_config);
}

#[component]
pub fn Toolbar() -> impl IntoView {
    let state = expect_context::<AppState>();
    let tag_text = RwSignal::new(String::new());
    let disabled = move || state.engine.with(|e| e.disabled);

    let mode_buttons = MODES
        .iter()
        .map(|&(mode, label, title)| {
            view! {
                <button
                    class=move || mode_class(state.engine.with(|e| e.mode) == mode)
                    disabled=move || disabled() && !mode.allowed_when_disabled()
                    on:click=move |_| interaction::send(state, Event::Enable(mode))
                    title=title
                >{label}</button>
            }
        })
        .collect_view();

    let on_kind = move |ev: leptos::ev::Event| {
        match event_target_value(&ev).parse::<GeometryType>() {
            Ok(kind) => interaction::send(state, Event::SetGeometryType(kind)),
            Err(e) => log::warn!("Ignoring geometry choice: {e}"),
        }
    };

    let with_tag = move |make: fn(Tag) -> Event| {
        match parse_tag(&tag_text.get_untracked()) {
            Some(tag) => interaction::send(state, make(tag)),
            None => state.status.set(Some("Tags are written key:value".into())),
        }
    };

    view! {
        <div class="toolbar">
            <span class="toolbar-brand"><b>"sono"</b><i>"mark"</i></span>

            <div class="toolbar-group">{mode_buttons}</div>

            <select class="toolbar-select" on:change=on_kind title="Shape drawn in draw mode">
                {KINDS
                    .iter()
                    .map(|kind| {
                        let kind = *kind;
                        view! {
                            <option
                                value=kind.as_str()
                                selected=move || state.engine.with(|e| e.geometry_type) == kind
                            >{kind.as_str()}</option>
                        }
                    })
                    .collect_view()}
            </select>

            <label class="toolbar-toggle" title="Read-only: only panning and selection">
                <input
                    type="checkbox"
                    prop:checked=disabled
                    on:change=move |ev| interaction::send(state, Event::SetDisabled(event_target_checked(&ev)))
                />
                "Lock"
            </label>

            <div class="toolbar-group">
                <input
                    class="toolbar-tag"
                    type="text"
                    placeholder="key:value"
                    prop:value=move || tag_text.get()
                    on:input=move |ev| tag_text.set(event_target_value(&ev))
                />
                <button class="layer-btn" on:click=move |_| with_tag(Event::AddTag) title="Tag the selection">"+ Tag"</button>
                <button class="layer-btn" on:click=move |_| with_tag(Event::RemoveTag) title="Untag the selection">"- Tag"</button>
                <button
                    class=move || mode_class(state.engine.with(|e| e.tag_filter.is_some()))
                    on:click=move |_| {
                        let filter = if state.engine.with_untracked(|e| e.tag_filter.is_some()) {
                            None
                        } else {
                            parse_tag(&tag_text.get_untracked())
                        };
                        interaction::send(state, Event::SetTagFilter(filter));
                    }
                    title="Only cycle through annotations with this tag (N / P)"
                >"Filter"</button>
            </div>

            // Spacer
            <div style="flex: 1;"></div>

            <label class="toolbar-toggle">
                <input
                    type="checkbox"
                    prop:checked=move || state.settings.with(|s| s.show_labels())
                    on:change=move |ev| {
                        let on = event_target_checked(&ev);
                        state.settings.update(|s| s.set_show_labels(on));
                        remember(&state, |c| c.show_labels = on);
                    }
                />
                "Labels"
            </label>
            <label class="toolbar-toggle">
                <input
                    type="checkbox"
                    prop:checked=move || state.settings.with(|s| s.auto_scroll())
                    on:change=move |ev| {
                        let on = event_target_checked(&ev);
                        state.settings.update(|s| s.set_auto_scroll(on));
                        remember(&state, |c| c.auto_scroll = on);
                    }
                />
                "Follow"
            </label>
            <label class="toolbar-toggle">
                <input
                    type="checkbox"
                    prop:checked=move || state.settings.with(|s| s.fixed_aspect_ratio())
                    on:change=move |ev| {
                        let on = event_target_checked(&ev);
                        state.settings.update(|s| s.set_fixed_aspect_ratio(on));
                        state.viewport.update(|vp| {
                            let next = vp.set_fixed_aspect_ratio(on);
                            vp.commit(next);
                        });
                        remember(&state, |c| c.fixed_aspect_ratio = on);
                    }
                />
                "Lock aspect"
            </label>

            <button
                class="layer-btn"
                disabled=move || !state.viewport.with(|vp| vp.can_go_back())
                on:click=move |_| state.viewport.update(|vp| {
                    vp.back();
                })
                title="Previous view (B)"
            >"Back"</button>

            <button
                class="layer-btn"
                disabled=move || state.recording.with(|r| r.is_none())
                on:click=move |_| playback::toggle(&state)
                title="Play / pause (Space)"
            >
                {move || if state.playback.with(|p| p.is_playing()) { "Pause" } else { "Play" }}
            </button>
            <span class="toolbar-time">{move || format!("{:.3}s", state.playback.with(|p| p.time()))}</span>
        </div>
    }
}
