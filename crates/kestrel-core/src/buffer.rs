//! Text buffer: rope storage, line index, undo history and syntax overlay.
//!
//! A `Buffer` wraps a [`ropey::Rope`]. The rope maintains the line index
//! incrementally, so every mutation leaves `line_count`, line starts and
//! offset conversions consistent without a rebuild.
//!
//! # Coordinates
//!
//! The mutation API takes **char offsets**. Line/column pairs are available
//! through [`offset_to_line_col`](Buffer::offset_to_line_col) and
//! [`line_col_to_offset`](Buffer::line_col_to_offset); the two are exact
//! inverses over every valid offset `0..=len_chars()`.
//!
//! # Bookkeeping
//!
//! Every successful [`insert`](Buffer::insert) or [`delete`](Buffer::delete):
//!
//! | Effect              | Detail                                          |
//! |---------------------|-------------------------------------------------|
//! | dirty               | set (cleared only by `mark_saved` / disk load)  |
//! | generation          | incremented                                     |
//! | syntax overlay      | spans over the edit dropped, later ones shifted |
//! | history             | edit joins the open group, or forms its own     |
//! | last modified       | set to now                                      |
//!
//! Undo and redo go through the same path, minus the history recording.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use ropey::{Rope, RopeSlice};

use crate::error::{EditError, Result};
use crate::history::{Edit, History};
use crate::position::Position;
use crate::syntax::{SyntaxOverlay, SyntaxSpan};

/// Default tab width for new buffers.
pub const DEFAULT_TAB_WIDTH: usize = 4;

// ---------------------------------------------------------------------------
// BufferId
// ---------------------------------------------------------------------------

/// Stable identity of a buffer. Allocated by the editor, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// LineEnding
// ---------------------------------------------------------------------------

/// Line ending style, detected from the first terminator in loaded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
    Cr,
}

impl LineEnding {
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Style of the first terminator in `text`, `Lf` if there is none.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        let Some(i) = text.find(['\n', '\r']) else {
            return Self::Lf;
        };
        match (text.as_bytes()[i], text.as_bytes().get(i + 1)) {
            (b'\r', Some(b'\n')) => Self::CrLf,
            (b'\r', _) => Self::Cr,
            _ => Self::Lf,
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lf => "LF",
            Self::CrLf => "CRLF",
            Self::Cr => "CR",
        })
    }
}

/// Chars the rope treats as ending a line.
#[inline]
#[must_use]
pub const fn is_line_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// An in-memory text document.
pub struct Buffer {
    id: BufferId,
    name: String,
    path: Option<PathBuf>,
    rope: Rope,
    dirty: bool,
    read_only: bool,
    loaded_from_disk: bool,
    externally_modified: bool,
    line_ending: LineEnding,
    tab_width: usize,
    generation: u64,
    overlay: SyntaxOverlay,
    last_modified: SystemTime,
    history: History,
}

impl Buffer {
    // -- Construction -------------------------------------------------------

    /// An empty, clean buffer with no path.
    #[must_use]
    pub fn new(id: BufferId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            path: None,
            rope: Rope::new(),
            dirty: false,
            read_only: false,
            loaded_from_disk: false,
            externally_modified: false,
            line_ending: LineEnding::Lf,
            tab_width: DEFAULT_TAB_WIDTH,
            generation: 0,
            overlay: SyntaxOverlay::new(),
            last_modified: SystemTime::now(),
            history: History::new(),
        }
    }

    /// A clean buffer holding `text`.
    #[must_use]
    pub fn from_text(id: BufferId, name: impl Into<String>, text: &str) -> Self {
        let mut buf = Self::new(id, name);
        buf.set_text(text, false);
        buf.dirty = false;
        buf
    }

    /// A buffer backed by `path` whose content was just read from disk.
    #[must_use]
    pub fn from_disk(id: BufferId, path: &Path, text: &str) -> Self {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let mut buf = Self::new(id, name);
        buf.path = Some(path.to_path_buf());
        buf.set_text(text, true);
        buf
    }

    // -- Identity & metadata ------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[inline]
    pub const fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    #[inline]
    #[must_use]
    pub const fn loaded_from_disk(&self) -> bool {
        self.loaded_from_disk
    }

    /// True after the file changed on disk behind the buffer's back.
    #[inline]
    #[must_use]
    pub const fn is_externally_modified(&self) -> bool {
        self.externally_modified
    }

    #[inline]
    pub const fn set_externally_modified(&mut self, modified: bool) {
        self.externally_modified = modified;
    }

    #[inline]
    #[must_use]
    pub const fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    #[inline]
    pub const fn set_line_ending(&mut self, ending: LineEnding) {
        self.line_ending = ending;
    }

    #[inline]
    #[must_use]
    pub const fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Set the tab width. Zero is treated as one.
    #[inline]
    pub fn set_tab_width(&mut self, width: usize) {
        self.tab_width = width.max(1);
    }

    /// Content generation. Bumped by every mutation, undo and redo included.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    #[must_use]
    pub const fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    #[inline]
    #[must_use]
    pub const fn overlay(&self) -> &SyntaxOverlay {
        &self.overlay
    }

    /// Install derived spans if they describe the current generation.
    pub fn apply_syntax(&mut self, generation: u64, spans: Vec<SyntaxSpan>) -> bool {
        self.overlay.apply(self.generation, generation, spans)
    }

    #[inline]
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    // -- Text access --------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Number of lines. Empty text has one line; a trailing terminator
    /// opens an empty last line.
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    #[inline]
    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Line `index` including its terminator.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `index >= line_count()`.
    pub fn line(&self, index: usize) -> Result<RopeSlice<'_>> {
        self.check_line(index)?;
        Ok(self.rope.line(index))
    }

    /// Char offset of the first char of line `index`.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `index >= line_count()`.
    pub fn line_start(&self, index: usize) -> Result<usize> {
        self.check_line(index)?;
        Ok(self.rope.line_to_char(index))
    }

    /// Length of line `index` without its terminator (`\n`, `\r\n`, `\r`).
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `index >= line_count()`.
    pub fn line_content_len(&self, index: usize) -> Result<usize> {
        let line = self.line(index)?;
        let total = line.len_chars();
        if total == 0 {
            return Ok(0);
        }
        let last = line.char(total - 1);
        if last == '\n' && total >= 2 && line.char(total - 2) == '\r' {
            Ok(total - 2)
        } else if is_line_break(last) {
            Ok(total - 1)
        } else {
            Ok(total)
        }
    }

    /// Char offset just past the last content char of line `index`.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `index >= line_count()`.
    pub fn line_content_end(&self, index: usize) -> Result<usize> {
        Ok(self.line_start(index)? + self.line_content_len(index)?)
    }

    #[must_use]
    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.rope.get_char(offset)
    }

    /// Text in `[start, end)`.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when the range is inverted or runs past the end.
    pub fn slice(&self, start: usize, end: usize) -> Result<RopeSlice<'_>> {
        self.check_range(start, end)?;
        Ok(self.rope.slice(start..end))
    }

    /// Whole content as a `String`.
    #[must_use]
    pub fn contents(&self) -> String {
        self.rope.to_string()
    }

    /// Content with every terminator rewritten to the buffer's line ending,
    /// ready to write to disk.
    #[must_use]
    pub fn to_disk_string(&self) -> String {
        normalize_line_endings(&self.contents(), self.line_ending.as_str())
    }

    // -- Coordinate conversion ----------------------------------------------

    /// Line and column of a char offset.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `offset > len_chars()`.
    pub fn offset_to_line_col(&self, offset: usize) -> Result<Position> {
        let len = self.rope.len_chars();
        if offset > len {
            return Err(EditError::out_of_range("offset", offset, len));
        }
        let line = self.rope.char_to_line(offset);
        Ok(Position::new(line, offset - self.rope.line_to_char(line)))
    }

    /// Char offset of a line and column.
    ///
    /// The column may address any char of the line, plus the position just
    /// past its content, but not past the final terminator char (that
    /// offset belongs to the next line).
    ///
    /// # Errors
    ///
    /// `OutOfRange` when the line does not exist or the column is too big.
    pub fn line_col_to_offset(&self, line: usize, col: usize) -> Result<usize> {
        let slice = self.line(line)?;
        let total = slice.len_chars();
        let limit = if total > 0 && is_line_break(slice.char(total - 1)) {
            total - 1
        } else {
            total
        };
        if col > limit {
            return Err(EditError::out_of_range("column", col, limit));
        }
        Ok(self.rope.line_to_char(line) + col)
    }

    /// Offset of `pos`.
    ///
    /// # Errors
    ///
    /// See [`line_col_to_offset`](Self::line_col_to_offset).
    #[inline]
    pub fn position_to_offset(&self, pos: Position) -> Result<usize> {
        self.line_col_to_offset(pos.line, pos.col)
    }

    /// Nearest valid content position: line clamped to the last line,
    /// column clamped to the content length.
    #[must_use]
    pub fn clamp_position(&self, pos: Position) -> Position {
        let line = pos.line.min(self.line_count().saturating_sub(1));
        let max_col = self.line_content_len(line).unwrap_or(0);
        Position::new(line, pos.col.min(max_col))
    }

    // -- Mutation -----------------------------------------------------------

    /// Insert `text` at `offset`.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `offset > len_chars()`, `InvalidMutation` when the
    /// buffer is read-only.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<()> {
        self.check_writable()?;
        let len = self.rope.len_chars();
        if offset > len {
            return Err(EditError::out_of_range("offset", offset, len));
        }
        if text.is_empty() {
            return Ok(());
        }
        let edit = Edit::Insert {
            offset,
            text: text.to_string(),
        };
        self.apply(&edit);
        let cursor = offset + text.chars().count();
        self.history.record(edit, cursor);
        Ok(())
    }

    /// Remove `[start, end)` and return the removed text.
    ///
    /// # Errors
    ///
    /// `OutOfRange` for an inverted range or one running past the end,
    /// `InvalidMutation` when the buffer is read-only.
    pub fn delete(&mut self, start: usize, end: usize) -> Result<String> {
        self.check_writable()?;
        self.check_range(start, end)?;
        if start == end {
            return Ok(String::new());
        }
        let removed = self.rope.slice(start..end).to_string();
        let edit = Edit::Delete {
            offset: start,
            text: removed.clone(),
        };
        self.apply(&edit);
        self.history.record(edit, start);
        Ok(removed)
    }

    /// Replace `[start, end)` with `text`. Both halves land in the same
    /// history group when one is open.
    ///
    /// # Errors
    ///
    /// As for [`delete`](Self::delete).
    pub fn replace(&mut self, start: usize, end: usize, text: &str) -> Result<String> {
        let removed = self.delete(start, end)?;
        self.insert(start, text)?;
        Ok(removed)
    }

    /// Replace the whole content. History is dropped. The buffer is clean
    /// afterwards only when the text came from disk.
    pub fn set_text(&mut self, text: &str, from_disk: bool) {
        let old_len = self.rope.len_chars();
        self.rope = Rope::from_str(text);
        self.line_ending = LineEnding::detect(text);
        self.history.clear();
        self.generation += 1;
        self.overlay.invalidate(0, old_len, self.rope.len_chars());
        self.last_modified = SystemTime::now();
        self.externally_modified = false;
        if from_disk {
            self.loaded_from_disk = true;
            self.dirty = false;
        } else {
            self.dirty = true;
        }
    }

    /// Mark the content as matching what is on disk.
    pub const fn mark_saved(&mut self) {
        self.dirty = false;
        self.externally_modified = false;
        self.loaded_from_disk = true;
    }

    // -- History ------------------------------------------------------------

    /// Open an undo group. `cursor` is restored when the group is undone.
    pub fn begin_group(&mut self, cursor: usize) {
        self.history.begin(cursor);
    }

    /// Close the open undo group. `cursor` is restored on redo.
    pub fn end_group(&mut self, cursor: usize) {
        self.history.commit(cursor);
    }

    /// Revert the newest group and return the cursor offset it started at.
    /// `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<usize> {
        if self.read_only {
            return None;
        }
        let txn = self.history.undo()?;
        let (edits, cursor) = (txn.undo_edits(), txn.cursor_before);
        for edit in &edits {
            self.apply(edit);
        }
        Some(cursor.min(self.rope.len_chars()))
    }

    /// Re-apply the newest undone group and return the cursor offset it
    /// ended at. `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<usize> {
        if self.read_only {
            return None;
        }
        let txn = self.history.redo()?;
        let (edits, cursor) = (txn.redo_edits(), txn.cursor_after);
        for edit in &edits {
            self.apply(edit);
        }
        Some(cursor.min(self.rope.len_chars()))
    }

    // -- Internals ----------------------------------------------------------

    /// Apply an edit to the rope with all bookkeeping except history.
    fn apply(&mut self, edit: &Edit) {
        match edit {
            Edit::Insert { offset, text } => {
                self.rope.insert(*offset, text);
                let end = offset + text.chars().count();
                self.overlay.invalidate(*offset, *offset, end);
            }
            Edit::Delete { offset, text } => {
                let end = offset + text.chars().count();
                self.rope.remove(*offset..end);
                self.overlay.invalidate(*offset, end, *offset);
            }
        }
        self.generation += 1;
        self.dirty = true;
        self.last_modified = SystemTime::now();
    }

    fn check_line(&self, index: usize) -> Result<()> {
        let count = self.rope.len_lines();
        if index >= count {
            return Err(EditError::out_of_range("line", index, count.saturating_sub(1)));
        }
        Ok(())
    }

    fn check_range(&self, start: usize, end: usize) -> Result<()> {
        let len = self.rope.len_chars();
        if end > len {
            return Err(EditError::out_of_range("offset", end, len));
        }
        if start > end {
            return Err(EditError::out_of_range("offset", start, end));
        }
        Ok(())
    }

    const fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(EditError::InvalidMutation);
        }
        Ok(())
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("lines", &self.line_count())
            .field("chars", &self.len_chars())
            .field("dirty", &self.dirty)
            .field("generation", &self.generation)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Rewrite `\r\n`, `\r` and `\n` in any mix to `target`.
fn normalize_line_endings(text: &str, target: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                out.push_str(target);
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' => out.push_str(target),
            _ => out.push(ch),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
