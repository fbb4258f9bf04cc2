//! Window: a view onto one buffer.
//!
//! A window holds the id of its buffer (never the buffer itself), a cursor,
//! a scroll position and the screen rectangle it was last laid out into.
//! The whole rectangle is text area: a line-number gutter on the left when
//! enabled, text to its right. Status lines and the like belong to the
//! display.
//!
//! Display columns differ from char columns: a tab advances to the next tab
//! stop and wide chars (CJK, most emoji) take two cells. The conversion
//! helpers here are used both for scrolling and for mapping mouse clicks
//! back to offsets.

use std::fmt;
use std::ops::Range;

use unicode_width::UnicodeWidthChar;

use crate::buffer::{Buffer, BufferId, is_line_break};
use crate::cursor::Cursor;
use crate::split::Rect;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Width of the line-number gutter: digits of the largest line number plus
/// one space. Zero when numbers are hidden.
#[must_use]
pub fn gutter_width(line_count: usize, show_numbers: bool) -> u16 {
    if !show_numbers {
        return 0;
    }
    let digits = line_count.max(1).ilog10() + 1;
    u16::try_from(digits + 1).unwrap_or(u16::MAX)
}

/// Display column at which char column `char_col` starts.
pub fn char_col_to_display_col<I: Iterator<Item = char>>(chars: I, char_col: usize, tab_width: usize) -> usize {
    let tab_w = tab_width.max(1);
    let mut display = 0;
    for ch in chars.take(char_col) {
        if is_line_break(ch) {
            break;
        }
        display = advance(display, ch, tab_w);
    }
    display
}

/// Char column whose cell span covers display column `target`. A target
/// past the end of the line maps to the content length.
pub fn display_col_to_char_col<I: Iterator<Item = char>>(chars: I, target: usize, tab_width: usize) -> usize {
    let tab_w = tab_width.max(1);
    let mut display = 0;
    let mut col = 0;
    for ch in chars {
        if is_line_break(ch) {
            break;
        }
        let next = advance(display, ch, tab_w);
        if target < next {
            return col;
        }
        display = next;
        col += 1;
    }
    col
}

fn advance(display: usize, ch: char, tab_w: usize) -> usize {
    if ch == '\t' {
        (display / tab_w + 1) * tab_w
    } else {
        display + ch.width().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Stable identity of a window. Allocated by the editor, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "win{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Window {
    id: WindowId,
    buffer: BufferId,
    cursor: Cursor,
    top_line: usize,
    left_col: usize,
    area: Rect,
}

impl Window {
    #[must_use]
    pub const fn new(id: WindowId, buffer: BufferId) -> Self {
        Self {
            id,
            buffer,
            cursor: Cursor::new(),
            top_line: 0,
            left_col: 0,
            area: Rect::new(0, 0, 0, 0),
        }
    }

    /// A new window showing the same buffer at the same spot.
    #[must_use]
    pub fn clone_as(&self, id: WindowId) -> Self {
        Self { id, ..self.clone() }
    }

    // -- Accessors ----------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn id(&self) -> WindowId {
        self.id
    }

    #[inline]
    #[must_use]
    pub const fn buffer_id(&self) -> BufferId {
        self.buffer
    }

    /// Point the window at another buffer, starting from its top.
    pub fn set_buffer(&mut self, buffer: BufferId) {
        self.buffer = buffer;
        self.cursor = Cursor::new();
        self.top_line = 0;
        self.left_col = 0;
    }

    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    #[inline]
    pub const fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    #[inline]
    #[must_use]
    pub const fn top_line(&self) -> usize {
        self.top_line
    }

    #[inline]
    pub const fn set_top_line(&mut self, line: usize) {
        self.top_line = line;
    }

    #[inline]
    #[must_use]
    pub const fn left_col(&self) -> usize {
        self.left_col
    }

    #[inline]
    #[must_use]
    pub const fn area(&self) -> Rect {
        self.area
    }

    #[inline]
    pub const fn set_area(&mut self, area: Rect) {
        self.area = area;
    }

    // -- Viewport -----------------------------------------------------------

    /// Cells available for text once the gutter is taken out.
    fn text_width(&self, buf: &Buffer, show_numbers: bool) -> usize {
        usize::from(
            self.area
                .w
                .saturating_sub(gutter_width(buf.line_count(), show_numbers)),
        )
    }

    /// Buffer lines currently on screen.
    #[must_use]
    pub fn visible_lines(&self, buf: &Buffer) -> Range<usize> {
        let start = self.top_line.min(buf.line_count());
        let end = (self.top_line + usize::from(self.area.h)).min(buf.line_count());
        start..end
    }

    /// Scroll so the cursor is on screen with at least `scroll_off` lines
    /// of context above and below where the window is tall enough.
    pub fn ensure_cursor_visible(&mut self, buf: &Buffer, show_numbers: bool, tab_width: usize, scroll_off: usize) {
        let height = usize::from(self.area.h);
        let width = self.text_width(buf, show_numbers);
        if height == 0 || width == 0 {
            return;
        }

        let line = self.cursor.line();
        let so = scroll_off.min((height - 1) / 2);
        if line < self.top_line + so {
            self.top_line = line.saturating_sub(so);
        }
        if line + so >= self.top_line + height {
            self.top_line = line + so + 1 - height;
        }
        self.top_line = self.top_line.min(buf.line_count().saturating_sub(1));

        let display = buf.line(line).map_or(0, |l| {
            char_col_to_display_col(l.chars(), self.cursor.col(), tab_width)
        });
        if display < self.left_col {
            self.left_col = display;
        }
        if display >= self.left_col + width {
            self.left_col = display + 1 - width;
        }
    }

    /// Bring cursor and scroll back inside `buf` after it changed.
    pub fn revalidate(&mut self, buf: &Buffer, past_end: bool) {
        self.cursor.clamp(buf, past_end);
        self.top_line = self.top_line.min(buf.line_count().saturating_sub(1));
    }

    // -- Mouse mapping ------------------------------------------------------

    /// Buffer offset under screen cell `(x, y)`, or `None` when the cell is
    /// outside the window. Clicks in the gutter land on column 0, clicks
    /// past the end of a line land after its last char, and clicks below
    /// the last line land on the last line.
    #[must_use]
    pub fn screen_to_offset(
        &self,
        buf: &Buffer,
        x: u16,
        y: u16,
        show_numbers: bool,
        tab_width: usize,
    ) -> Option<usize> {
        if !self.area.contains(x, y) {
            return None;
        }
        let last = buf.line_count().saturating_sub(1);
        let line = (self.top_line + usize::from(y - self.area.y)).min(last);
        let gutter = gutter_width(buf.line_count(), show_numbers);
        let rel_x = (x - self.area.x).saturating_sub(gutter);
        let target = self.left_col + usize::from(rel_x);

        let text = buf.line(line).ok()?;
        let col = display_col_to_char_col(text.chars(), target, tab_width);
        buf.line_col_to_offset(line, col).ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
