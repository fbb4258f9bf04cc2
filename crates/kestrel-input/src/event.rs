// SPDX-License-Identifier: MIT
//
// Input event types.
//
// Everything a host can feed into the editor: keys, mouse actions, and
// pasted text. Mouse coordinates are 0-indexed cells relative to the
// editor's display area. Hosts that work in pixels divide by their cell
// size before handing events over.

use bitflags::bitflags;

// ─── Event Types ────────────────────────────────────────────────────────────

/// An input event delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A key press.
    Key(KeyEvent),
    /// A mouse action with position.
    Mouse(MouseEvent),
    /// Pasted text, delivered as a single event so modes can insert it
    /// verbatim instead of interpreting it as commands.
    Paste(String),
}

/// A key press with modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Which key was pressed.
    pub code: KeyCode,
    /// Active modifier keys.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// A key press without modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    /// A key press with the given modifiers.
    #[must_use]
    pub const fn with(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// A plain character press.
    #[must_use]
    pub const fn char(ch: char) -> Self {
        Self::new(KeyCode::Char(ch))
    }

    /// `Ctrl` + character.
    #[must_use]
    pub const fn ctrl(ch: char) -> Self {
        Self::with(KeyCode::Char(ch), Modifiers::CTRL)
    }

    /// True when Ctrl is held.
    #[inline]
    #[must_use]
    pub const fn is_ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    /// True when Shift is held.
    #[inline]
    #[must_use]
    pub const fn is_shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    /// The printable character this key produces, if any.
    ///
    /// Ctrl and Alt chords never produce text.
    #[must_use]
    pub const fn printable(&self) -> Option<char> {
        if self.modifiers.intersects(Modifiers::CTRL.union(Modifiers::ALT)) {
            return None;
        }
        match self.code {
            KeyCode::Char(ch) => Some(ch),
            _ => None,
        }
    }
}

impl From<KeyCode> for KeyEvent {
    fn from(code: KeyCode) -> Self {
        Self::new(code)
    }
}

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A Unicode character (printable).
    Char(char),
    // ── Named keys ──────────────────────────────────────────────
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    Insert,
    // ── Navigation ──────────────────────────────────────────────
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    // ── Function keys ───────────────────────────────────────────
    /// F1 through F12.
    F(u8),
}

bitflags! {
    /// Keyboard modifier flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
        const SUPER = 0b0000_1000;
    }
}

/// A mouse action at a cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// What happened.
    pub kind: MouseEventKind,
    /// 0-indexed column.
    pub x: u16,
    /// 0-indexed row.
    pub y: u16,
    /// Active modifier keys during the mouse event.
    pub modifiers: Modifiers,
}

/// Mouse event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    /// Button pressed.
    Down(MouseButton),
    /// Button released.
    Up(MouseButton),
    /// Pointer moved (with or without a button held).
    Move,
}

/// Mouse button identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    #[default]
    Unknown,
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_constructor() {
        let k = KeyEvent::char('x');
        assert_eq!(k.code, KeyCode::Char('x'));
        assert!(k.modifiers.is_empty());
        assert_eq!(k.printable(), Some('x'));
    }

    #[test]
    fn ctrl_is_not_printable() {
        let k = KeyEvent::ctrl('r');
        assert!(k.is_ctrl());
        assert_eq!(k.printable(), None);
    }

    #[test]
    fn shift_char_is_printable() {
        let k = KeyEvent::with(KeyCode::Char('A'), Modifiers::SHIFT);
        assert!(k.is_shift());
        assert_eq!(k.printable(), Some('A'));
    }

    #[test]
    fn named_keys_are_not_printable() {
        assert_eq!(KeyEvent::new(KeyCode::Enter).printable(), None);
        assert_eq!(KeyEvent::new(KeyCode::Escape).printable(), None);
    }

    #[test]
    fn from_keycode() {
        let k: KeyEvent = KeyCode::Left.into();
        assert_eq!(k, KeyEvent::new(KeyCode::Left));
    }

    #[test]
    fn default_mouse_button_is_unknown() {
        assert_eq!(MouseButton::default(), MouseButton::Unknown);
    }
}
