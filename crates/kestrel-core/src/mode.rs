//! Modal input: the `Mode` interface and the registry that selects one.
//!
//! A mode is a state machine fed one key at a time. For each key it either
//! waits for more ([`InputOutcome::Pending`]), performs a command
//! ([`InputOutcome::Completed`]), or throws the accumulated keys away
//! ([`InputOutcome::Rejected`]). Modes edit through a [`ModeContext`] and
//! ask for anything outside the buffer (ex commands, splits, tab changes)
//! by pushing a [`ModeRequest`]; the editor carries those out after the
//! key has been handled.
//!
//! | State           | Cursor limit          |
//! |-----------------|-----------------------|
//! | Normal          | `0..content_len-1`    |
//! | Insert          | `0..content_len`      |
//! | Visual          | `0..content_len-1`    |
//! | Replace         | `0..content_len`      |
//! | CommandLine     | unchanged             |

use std::fmt;

use kestrel_input::KeyEvent;

use crate::buffer::Buffer;
use crate::config::EditorConfig;
use crate::cursor::Cursor;
use crate::error::{HostError, HostResult};
use crate::register::RegisterStore;
use crate::split::{Direction, SplitAxis};

// ---------------------------------------------------------------------------
// ModeState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    Char,
    Line,
    Block,
}

/// Logical state of a mode instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModeState {
    #[default]
    Normal,
    Insert,
    Visual(VisualKind),
    Replace,
    CommandLine,
}

impl ModeState {
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Insert => "INSERT",
            Self::Visual(VisualKind::Char) => "VISUAL",
            Self::Visual(VisualKind::Line) => "VISUAL LINE",
            Self::Visual(VisualKind::Block) => "VISUAL BLOCK",
            Self::Replace => "REPLACE",
            Self::CommandLine => "COMMAND",
        }
    }

    /// True if the cursor may sit just past the last char of a line.
    #[inline]
    #[must_use]
    pub const fn cursor_past_end(self) -> bool {
        matches!(self, Self::Insert | Self::Replace)
    }

    #[inline]
    #[must_use]
    pub const fn is_visual(self) -> bool {
        matches!(self, Self::Visual(_))
    }
}

impl fmt::Display for ModeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// Outcome & requests
// ---------------------------------------------------------------------------

/// What a mode did with one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Part of an unfinished command; nothing changed yet.
    Pending,
    /// A command (or a plain key such as a typed char) took effect.
    Completed,
    /// The key sequence was invalid. Pending state was discarded and
    /// nothing changed.
    Rejected,
}

/// Work a mode hands back to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeRequest {
    /// Run an ex command line (without the leading `:`).
    Ex(String),
    /// Make another registered mode current.
    SwitchMode(String),
    Split(SplitAxis),
    CloseWindow,
    CycleWindow,
    /// Move to the neighbouring window in a direction.
    Focus(Direction),
    NextTab,
    PreviousTab,
    /// Show a message to the user.
    Message(String),
}

/// Everything a mode may touch while handling a key.
pub struct ModeContext<'a> {
    pub buffer: &'a mut Buffer,
    pub cursor: &'a mut Cursor,
    pub registers: &'a mut RegisterStore,
    pub config: &'a EditorConfig,
    pub requests: &'a mut Vec<ModeRequest>,
}

impl ModeContext<'_> {
    pub fn request(&mut self, request: ModeRequest) {
        self.requests.push(request);
    }

    /// Cursor char offset in the target buffer.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.cursor.offset(self.buffer)
    }
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// A modal input grammar.
pub trait Mode {
    /// Registry key, e.g. `"vim"`.
    fn name(&self) -> &str;

    fn handle_input(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> InputOutcome;

    /// Called before the editor paints. Lets the mode fix up the cursor.
    fn pre_display(&mut self, _ctx: &mut ModeContext<'_>) {}

    fn state(&self) -> ModeState;

    /// Drop all pending input and return to the mode's resting state.
    fn reset(&mut self);

    /// Text of the command line while one is being typed.
    fn command_text(&self) -> Option<&str> {
        None
    }

    /// Keys typed toward an unfinished command, for display.
    fn pending_keys(&self) -> String {
        String::new()
    }
}

// ---------------------------------------------------------------------------
// ModeRegistry
// ---------------------------------------------------------------------------

/// Named modes plus which one is current and which is secondary.
#[derive(Default)]
pub struct ModeRegistry {
    modes: Vec<Box<dyn Mode>>,
    current: Option<usize>,
    secondary: Option<usize>,
}

impl ModeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mode, replacing any mode of the same name. The first mode
    /// registered becomes current.
    pub fn register(&mut self, mode: Box<dyn Mode>) {
        if let Some(i) = self.index_of(mode.name()) {
            self.modes[i] = mode;
        } else {
            self.modes.push(mode);
        }
        if self.current.is_none() {
            self.current = Some(0);
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.modes.iter().position(|m| m.name() == name)
    }

    /// Make `name` current. The previous current mode is reset.
    ///
    /// # Errors
    ///
    /// `UnknownMode` when no mode has that name.
    pub fn set_current(&mut self, name: &str) -> HostResult<()> {
        let i = self
            .index_of(name)
            .ok_or_else(|| HostError::UnknownMode(name.to_string()))?;
        if let Some(old) = self.current {
            self.modes[old].reset();
        }
        self.current = Some(i);
        Ok(())
    }

    /// Remember `name` as the secondary mode.
    ///
    /// # Errors
    ///
    /// `UnknownMode` when no mode has that name.
    pub fn set_secondary(&mut self, name: &str) -> HostResult<()> {
        let i = self
            .index_of(name)
            .ok_or_else(|| HostError::UnknownMode(name.to_string()))?;
        self.secondary = Some(i);
        Ok(())
    }

    #[must_use]
    pub fn current(&self) -> Option<&dyn Mode> {
        self.current.map(|i| self.modes[i].as_ref())
    }

    pub fn current_mut(&mut self) -> Option<&mut dyn Mode> {
        match self.current {
            Some(i) => Some(self.modes[i].as_mut()),
            None => None,
        }
    }

    #[must_use]
    pub fn secondary(&self) -> Option<&dyn Mode> {
        self.secondary.map(|i| self.modes[i].as_ref())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Mode> {
        self.index_of(name).map(|i| self.modes[i].as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modes.iter().map(|m| m.name())
    }
}

impl fmt::Debug for ModeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeRegistry")
            .field("modes", &self.names().collect::<Vec<_>>())
            .field("current", &self.current().map(Mode::name))
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        name: &'static str,
        resets: usize,
    }

    impl Mode for Dummy {
        fn name(&self) -> &str {
            self.name
        }

        fn handle_input(&mut self, _ctx: &mut ModeContext<'_>, _key: KeyEvent) -> InputOutcome {
            InputOutcome::Completed
        }

        fn state(&self) -> ModeState {
            ModeState::Normal
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    fn dummy(name: &'static str) -> Box<dyn Mode> {
        Box::new(Dummy { name, resets: 0 })
    }

    // -- ModeState ----------------------------------------------------------

    #[test]
    fn display_names() {
        assert_eq!(ModeState::Visual(VisualKind::Block).to_string(), "VISUAL BLOCK");
        assert_eq!(ModeState::CommandLine.display_name(), "COMMAND");
    }

    #[test]
    fn past_end_states() {
        assert!(ModeState::Insert.cursor_past_end());
        assert!(ModeState::Replace.cursor_past_end());
        assert!(!ModeState::Normal.cursor_past_end());
        assert!(!ModeState::Visual(VisualKind::Char).cursor_past_end());
    }

    // -- Registry -----------------------------------------------------------

    #[test]
    fn first_registered_is_current() {
        let mut reg = ModeRegistry::new();
        assert!(reg.current().is_none());
        reg.register(dummy("vim"));
        reg.register(dummy("standard"));
        assert_eq!(reg.current().map(Mode::name), Some("vim"));
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["vim", "standard"]);
    }

    #[test]
    fn set_current_by_name() {
        let mut reg = ModeRegistry::new();
        reg.register(dummy("vim"));
        reg.register(dummy("standard"));
        reg.set_current("standard").unwrap();
        assert_eq!(reg.current().map(Mode::name), Some("standard"));
    }

    #[test]
    fn unknown_mode_errors() {
        let mut reg = ModeRegistry::new();
        reg.register(dummy("vim"));
        assert!(matches!(reg.set_current("emacs"), Err(HostError::UnknownMode(n)) if n == "emacs"));
        assert_eq!(reg.current().map(Mode::name), Some("vim"));
    }

    #[test]
    fn secondary_is_independent() {
        let mut reg = ModeRegistry::new();
        reg.register(dummy("vim"));
        reg.register(dummy("search"));
        reg.set_secondary("search").unwrap();
        assert_eq!(reg.secondary().map(Mode::name), Some("search"));
        assert_eq!(reg.current().map(Mode::name), Some("vim"));
    }

    #[test]
    fn register_replaces_same_name() {
        let mut reg = ModeRegistry::new();
        reg.register(dummy("vim"));
        reg.register(dummy("vim"));
        assert_eq!(reg.names().count(), 1);
        assert!(reg.get("vim").is_some());
    }
}
