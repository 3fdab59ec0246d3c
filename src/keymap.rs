//! Keystroke routing: a single process-wide table from key symbol to an
//! ordered list of handler callbacks.
//!
//! Registering a handler for an already-bound key appends rather than
//! replacing, so several components can react to the same physical key in
//! registration order. Handlers never touch the layout engine directly;
//! they return [`UiAction`]s the engine applies afterwards, which keeps
//! the input side free of back-references into panels and legends.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};

use crate::log_debug;
use crate::nav::NavAction;

/// Key symbols the engine routes. Alphabetic characters keep their case;
/// shift-modified arrows are distinct symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySym {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    ShiftUp,
    ShiftDown,
    ShiftLeft,
    ShiftRight,
    PageUp,
    PageDown,
    Esc,
    Enter,
    /// Synthetic symbol carrying a decoded mouse payload.
    Mouse,
}

impl KeySym {
    /// Maps a terminal key event; `None` for keys the engine ignores.
    pub fn from_event(event: &KeyEvent) -> Option<Self> {
        let shifted = event.modifiers.contains(KeyModifiers::SHIFT);
        match event.code {
            KeyCode::Char(ch) => Some(KeySym::Char(ch)),
            KeyCode::Up if shifted => Some(KeySym::ShiftUp),
            KeyCode::Down if shifted => Some(KeySym::ShiftDown),
            KeyCode::Left if shifted => Some(KeySym::ShiftLeft),
            KeyCode::Right if shifted => Some(KeySym::ShiftRight),
            KeyCode::Up => Some(KeySym::Up),
            KeyCode::Down => Some(KeySym::Down),
            KeyCode::Left => Some(KeySym::Left),
            KeyCode::Right => Some(KeySym::Right),
            KeyCode::PageUp => Some(KeySym::PageUp),
            KeyCode::PageDown => Some(KeySym::PageDown),
            KeyCode::Esc => Some(KeySym::Esc),
            KeyCode::Enter => Some(KeySym::Enter),
            _ => None,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            KeySym::Char(' ') => "space".to_string(),
            KeySym::Char(ch) => ch.to_string(),
            KeySym::Up => "up".to_string(),
            KeySym::Down => "down".to_string(),
            KeySym::Left => "left".to_string(),
            KeySym::Right => "right".to_string(),
            KeySym::ShiftUp => "shift+up".to_string(),
            KeySym::ShiftDown => "shift+down".to_string(),
            KeySym::ShiftLeft => "shift+left".to_string(),
            KeySym::ShiftRight => "shift+right".to_string(),
            KeySym::PageUp => "pgup".to_string(),
            KeySym::PageDown => "pgdn".to_string(),
            KeySym::Esc => "esc".to_string(),
            KeySym::Enter => "enter".to_string(),
            KeySym::Mouse => "mouse".to_string(),
        }
    }

    /// The same symbol with flipped alphabetic case; non-alphabetic
    /// symbols map to themselves.
    pub fn switch_case(&self) -> KeySym {
        match self {
            KeySym::Char(ch) if ch.is_ascii_lowercase() => KeySym::Char(ch.to_ascii_uppercase()),
            KeySym::Char(ch) if ch.is_ascii_uppercase() => KeySym::Char(ch.to_ascii_lowercase()),
            other => *other,
        }
    }
}

/// A resolved key press handed to handlers. Handlers for the mouse
/// binding receive the decoded payload in `mouse`.
#[derive(Debug, Clone)]
pub struct KeyPress {
    pub sym: KeySym,
    pub name: String,
    pub mouse: Option<MouseEvent>,
}

impl KeyPress {
    pub fn new(sym: KeySym) -> Self {
        Self {
            sym,
            name: sym.display_name(),
            mouse: None,
        }
    }

    pub fn mouse(event: MouseEvent) -> Self {
        Self {
            sym: KeySym::Mouse,
            name: KeySym::Mouse.display_name(),
            mouse: Some(event),
        }
    }
}

/// Engine-level operations handlers ask for. Domain parameters (threshold,
/// NFFT, channel) are adjusted by the handlers themselves through shared
/// atomics; these actions cover state only the layout engine owns.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Quit,
    ToggleLayout,
    ToggleHelp,
    ToggleLegends,
    ToggleMinimalLegend,
    MoveLegendsLeft,
    MoveLegendsRight,
    SnapLegendsBack,
    Nav(NavAction),
    Flash(String),
    /// Marks one cached legend element stale so the next redraw recomputes it.
    Invalidate(String),
    /// Marks every cached legend element stale.
    InvalidateAll,
}

pub type KeyHandler = Box<dyn FnMut(&KeyPress) -> Option<UiAction> + Send>;

/// One key's binding: display name, case sensitivity, and the ordered
/// handler list (as slab indices, so both cases of a letter can share it).
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub key: KeySym,
    pub name: String,
    pub case_sensitive: bool,
    handler_ids: Vec<usize>,
}

impl KeyBinding {
    /// The logically equivalent binding for the other case of an
    /// alphabetic key. Round-trips: two applications restore the original.
    pub fn switch_case(&self) -> KeyBinding {
        let key = self.key.switch_case();
        KeyBinding {
            key,
            name: key.display_name(),
            case_sensitive: self.case_sensitive,
            handler_ids: self.handler_ids.clone(),
        }
    }
}

#[derive(Default)]
pub struct Keymap {
    bindings: HashMap<KeySym, KeyBinding>,
    handlers: Vec<KeyHandler>,
    /// (keys, description) rows for the help overlay, in registration order.
    help_rows: Vec<(String, String)>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to `key`, appending to any existing binding. When
    /// `case_sensitive` is false and the key is alphabetic, both cases are
    /// registered and share the handler; the handler tells them apart via
    /// the resolved `KeyPress::name`.
    pub fn register(
        &mut self,
        key: KeySym,
        description: &str,
        case_sensitive: bool,
        handler: KeyHandler,
    ) {
        let handler_id = self.handlers.len();
        self.handlers.push(handler);

        let mut targets = vec![key];
        if !case_sensitive {
            let flipped = key.switch_case();
            if flipped != key {
                targets.push(flipped);
            }
        }
        let label = targets
            .iter()
            .map(KeySym::display_name)
            .collect::<Vec<_>>()
            .join(" / ");
        if !description.is_empty() {
            self.help_rows.push((label, description.to_string()));
        }
        for sym in targets {
            self.bindings
                .entry(sym)
                .or_insert_with(|| KeyBinding {
                    key: sym,
                    name: sym.display_name(),
                    case_sensitive,
                    handler_ids: Vec::new(),
                })
                .handler_ids
                .push(handler_id);
        }
    }

    pub fn binding(&self, key: KeySym) -> Option<&KeyBinding> {
        self.bindings.get(&key)
    }

    pub fn help_rows(&self) -> &[(String, String)] {
        &self.help_rows
    }

    /// Runs every handler bound to the pressed key, in registration order,
    /// collecting the actions they request. Unknown keys are logged and
    /// otherwise ignored.
    pub fn dispatch(&mut self, press: &KeyPress) -> Vec<UiAction> {
        let Some(binding) = self.bindings.get(&press.sym) else {
            log_debug(&format!("unbound key: {}", press.name));
            return Vec::new();
        };
        let handler_ids = binding.handler_ids.clone();
        let mut actions = Vec::new();
        for id in handler_ids {
            if let Some(action) = (self.handlers[id])(press) {
                actions.push(action);
            }
        }
        actions
    }
}
