//! Keyboard shortcuts
//!
//! Resolution depends on what has focus: the search shortcut is ignored
//! inside a multi-line field, the help shortcut inside any field, and Enter
//! only commits single-line fields.

use crate::session::Focus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Other,
}

/// Modifier state; `ctrl` and `meta` are interchangeable for shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        shift: false,
        alt: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub fn ctrl_shift() -> Self {
        Self {
            ctrl: true,
            shift: true,
            ..Self::NONE
        }
    }

    /// Ctrl on most platforms, Cmd on macOS
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    pub fn any(&self) -> bool {
        self.ctrl || self.meta || self.shift || self.alt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyChord {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }
}

/// What a chord asks the editor to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Undo,
    Redo,
    Save,
    Export,
    ToggleSearch,
    ToggleShortcuts,
    Escape,
    CommitEdit,
}

/// Map a chord to an action, or `None` if the key is not a shortcut
pub fn resolve(chord: KeyChord, focus: Focus) -> Option<KeyAction> {
    let mods = chord.modifiers;

    if mods.command() {
        let Key::Char(c) = chord.key else {
            return None;
        };
        return match c.to_ascii_lowercase() {
            'z' if mods.shift => Some(KeyAction::Redo),
            'z' => Some(KeyAction::Undo),
            'y' => Some(KeyAction::Redo),
            's' => Some(KeyAction::Save),
            'p' => Some(KeyAction::Export),
            'f' if focus != Focus::MultiLine => Some(KeyAction::ToggleSearch),
            _ => None,
        };
    }

    match chord.key {
        Key::Escape => Some(KeyAction::Escape),
        Key::Enter if !mods.any() && focus == Focus::SingleLine => Some(KeyAction::CommitEdit),
        Key::Char('?') if focus == Focus::None => Some(KeyAction::ToggleShortcuts),
        _ => None,
    }
}

/// Shortcut reference shown in the help overlay
pub const SHORTCUTS: &[(&str, &str)] = &[
    ("Ctrl+Z", "Undo"),
    ("Ctrl+Y / Ctrl+Shift+Z", "Redo"),
    ("Ctrl+S", "Save now"),
    ("Ctrl+P", "Export"),
    ("Ctrl+F", "Search"),
    ("Enter", "Confirm edit"),
    ("Escape", "Cancel edit / close"),
    ("?", "Show shortcuts"),
];
