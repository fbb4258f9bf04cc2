//! Collaborator seams: file system, clipboard, display.
//!
//! The engine never touches the OS directly. A host hands the editor an
//! implementation of each trait; the defaults here are enough to run
//! headless (`StdFileSystem`, `MemoryClipboard`) or with no clipboard at
//! all (`NoClipboard`).

use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use crate::buffer::BufferId;
use crate::error::{HostError, HostResult};
use crate::position::Position;
use crate::split::Rect;
use crate::syntax::SyntaxSpan;
use crate::window::WindowId;

// ---------------------------------------------------------------------------
// File system
// ---------------------------------------------------------------------------

pub trait FileSystem {
    /// # Errors
    ///
    /// `Io` when the file cannot be read as UTF-8 text.
    fn read(&self, path: &Path) -> HostResult<String>;

    /// # Errors
    ///
    /// `Io` when the file cannot be written.
    fn write(&self, path: &Path, text: &str) -> HostResult<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// `std::fs` passthrough.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn read(&self, path: &Path) -> HostResult<String> {
        Ok(fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, text: &str) -> HostResult<()> {
        Ok(fs::write(path, text)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

// ---------------------------------------------------------------------------
// Clipboard
// ---------------------------------------------------------------------------

/// The single OS clipboard slot.
pub trait Clipboard: Send + Sync {
    fn name(&self) -> Cow<'_, str>;

    /// # Errors
    ///
    /// `Clipboard` when the slot cannot be read.
    fn get_contents(&self) -> HostResult<String>;

    /// # Errors
    ///
    /// `Clipboard` when the slot cannot be written.
    fn set_contents(&self, content: &str) -> HostResult<()>;
}

/// A clipboard that lives in process memory.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<String>,
}

impl MemoryClipboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for MemoryClipboard {
    fn name(&self) -> Cow<'_, str> {
        "memory".into()
    }

    fn get_contents(&self) -> HostResult<String> {
        self.contents
            .lock()
            .map(|s| s.clone())
            .map_err(|_| HostError::Clipboard("clipboard lock poisoned".into()))
    }

    fn set_contents(&self, content: &str) -> HostResult<()> {
        let mut slot = self
            .contents
            .lock()
            .map_err(|_| HostError::Clipboard("clipboard lock poisoned".into()))?;
        *slot = content.to_owned();
        Ok(())
    }
}

/// No clipboard: reads fail, writes vanish.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClipboard;

impl Clipboard for NoClipboard {
    fn name(&self) -> Cow<'_, str> {
        "none".into()
    }

    fn get_contents(&self) -> HostResult<String> {
        Err(HostError::Clipboard("no clipboard available".into()))
    }

    fn set_contents(&self, _content: &str) -> HostResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// What the editor hands the display for one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowFrame {
    pub window: WindowId,
    pub buffer: BufferId,
    pub area: Rect,
    /// Buffer line shown on the window's first row.
    pub first_line: usize,
    /// Visible lines without their line break.
    pub lines: Vec<String>,
    pub left_col: usize,
    /// Gutter columns (0 when line numbers are off).
    pub gutter: u16,
    pub cursor: Position,
    /// Ordered selection, inclusive of both ends.
    pub selection: Option<(Position, Position)>,
    /// Syntax spans intersecting the visible lines, in buffer char offsets.
    pub spans: Vec<SyntaxSpan>,
    pub active: bool,
}

/// A paint target.
pub trait Display {
    /// Viewport `(width, height)` in cells.
    fn size(&self) -> (u16, u16);

    /// Called once per visible window, active tab only.
    fn paint(&mut self, frame: &WindowFrame);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- File system --------------------------------------------------------

    #[test]
    fn std_fs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let fs = StdFileSystem;
        assert!(!fs.exists(&path));
        fs.write(&path, "one\ntwo\n").unwrap();
        assert!(fs.exists(&path));
        assert_eq!(fs.read(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn std_fs_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StdFileSystem.read(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, HostError::Io(_)));
    }

    // -- Clipboard ----------------------------------------------------------

    #[test]
    fn memory_clipboard_holds_last_write() {
        let cb = MemoryClipboard::new();
        assert_eq!(cb.get_contents().unwrap(), "");
        cb.set_contents("first").unwrap();
        cb.set_contents("second").unwrap();
        assert_eq!(cb.get_contents().unwrap(), "second");
        assert_eq!(cb.name(), "memory");
    }

    #[test]
    fn no_clipboard_read_fails() {
        assert!(matches!(NoClipboard.get_contents(), Err(HostError::Clipboard(_))));
        assert!(NoClipboard.set_contents("x").is_ok());
    }
}
