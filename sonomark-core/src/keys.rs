use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::{Event, Mode};

/// Keyboard-triggered actions of the annotation view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Abort,
    Select,
    Draw,
    Edit,
    Delete,
    Measure,
    Next,
    Previous,
    DeleteSelected,
    Back,
    TogglePlay,
    ZoomIn,
    ZoomOut,
}

impl Command {
    /// Engine input for commands the state machine handles. View and
    /// playback commands give `None`, as do modes a disabled engine refuses.
    pub fn engine_event(&self, disabled: bool) -> Option<Event> {
        let mode = match self {
            Command::Abort => return Some(Event::Abort),
            Command::Next => return Some(Event::SelectNext),
            Command::Previous => return Some(Event::SelectPrevious),
            Command::DeleteSelected => return Some(Event::DeleteSelected),
            Command::Back | Command::TogglePlay | Command::ZoomIn | Command::ZoomOut => return None,
            Command::Select => Mode::Select,
            Command::Draw => Mode::Draw,
            Command::Edit => Mode::Edit,
            Command::Delete => Mode::Delete,
            Command::Measure => Mode::Measure,
        };
        (!disabled || mode.allowed_when_disabled()).then_some(Event::Enable(mode))
    }
}

/// Mapping from `KeyboardEvent.key` values to commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMap {
    bindings: BTreeMap<String, Command>,
}

impl Default for KeyMap {
    fn default() -> Self {
        let bindings = [
            ("Escape", Command::Abort),
            ("s", Command::Select),
            ("a", Command::Draw),
            ("e", Command::Edit),
            ("d", Command::Delete),
            ("m", Command::Measure),
            ("n", Command::Next),
            ("p", Command::Previous),
            ("Delete", Command::DeleteSelected),
            ("Backspace", Command::DeleteSelected),
            ("b", Command::Back),
            (" ", Command::TogglePlay),
            ("+", Command::ZoomIn),
            ("=", Command::ZoomIn),
            ("-", Command::ZoomOut),
        ]
        .into_iter()
        .map(|(k, c)| (k.to_string(), c))
        .collect();
        Self { bindings }
    }
}

impl KeyMap {
    /// Look up a key. Single letters match regardless of case.
    pub fn command(&self, key: &str) -> Option<Command> {
        if let Some(cmd) = self.bindings.get(key) {
            return Some(*cmd);
        }
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_alphabetic() => self.bindings.get(&c.to_lowercase().to_string()).copied(),
            _ => None,
        }
    }
}
