//! Cursor: position, sticky column and selection anchor.
//!
//! A cursor does not reference its buffer; every motion takes the buffer
//! as a parameter plus a `past_end` flag. With `past_end == false` the
//! cursor sits *on* a char (vim normal and visual); with `past_end == true`
//! it may also sit just after the last char of a line (insert, replace,
//! standard mode).
//!
//! Vertical motions remember the column they started from, so moving
//! through a short line and back onto a long one restores the column.
//! Every horizontal motion resets it.

use crate::buffer::Buffer;
use crate::position::Position;
use crate::word;

/// A cursor in a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cursor {
    pos: Position,
    sticky_col: usize,
    anchor: Option<Position>,
}

impl Cursor {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pos: Position::ZERO,
            sticky_col: 0,
            anchor: None,
        }
    }

    #[must_use]
    pub const fn at(pos: Position) -> Self {
        Self {
            pos,
            sticky_col: pos.col,
            anchor: None,
        }
    }

    // -- Accessors ----------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn position(&self) -> Position {
        self.pos
    }

    #[inline]
    #[must_use]
    pub const fn line(&self) -> usize {
        self.pos.line
    }

    #[inline]
    #[must_use]
    pub const fn col(&self) -> usize {
        self.pos.col
    }

    #[inline]
    #[must_use]
    pub const fn sticky_col(&self) -> usize {
        self.sticky_col
    }

    /// Char offset of the cursor, clamped into the buffer.
    #[must_use]
    pub fn offset(&self, buf: &Buffer) -> usize {
        let pos = buf.clamp_position(self.pos);
        buf.position_to_offset(pos).unwrap_or(0)
    }

    // -- Selection ----------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn anchor(&self) -> Option<Position> {
        self.anchor
    }

    /// Anchor the selection at the current position.
    pub const fn set_anchor(&mut self) {
        self.anchor = Some(self.pos);
    }

    pub const fn set_anchor_at(&mut self, pos: Position) {
        self.anchor = Some(pos);
    }

    pub const fn clear_anchor(&mut self) {
        self.anchor = None;
    }

    /// Ordered `(start, end)` of the selection, both inclusive of the
    /// positions themselves.
    #[must_use]
    pub fn selection(&self) -> Option<(Position, Position)> {
        self.anchor.map(|a| (a.min(self.pos), a.max(self.pos)))
    }

    /// Swap the cursor and the anchor (visual `o`).
    pub fn swap_anchor(&mut self) {
        if let Some(anchor) = self.anchor {
            self.anchor = Some(self.pos);
            self.pos = anchor;
            self.sticky_col = self.pos.col;
        }
    }

    // -- Direct positioning -------------------------------------------------

    pub fn set_position(&mut self, pos: Position, buf: &Buffer, past_end: bool) {
        self.pos = clamp(pos, buf, past_end);
        self.sticky_col = self.pos.col;
    }

    /// Move to a char offset. Offsets past the end clamp.
    pub fn set_offset(&mut self, offset: usize, buf: &Buffer, past_end: bool) {
        let pos = buf
            .offset_to_line_col(offset.min(buf.len_chars()))
            .unwrap_or(Position::ZERO);
        self.set_position(pos, buf, past_end);
    }

    // -- Horizontal ---------------------------------------------------------

    pub fn move_left(&mut self, count: usize, buf: &Buffer, past_end: bool) {
        let col = self.pos.col.min(max_col_for_line(buf, self.pos.line, past_end));
        self.pos.col = col.saturating_sub(count);
        self.sticky_col = self.pos.col;
    }

    pub fn move_right(&mut self, count: usize, buf: &Buffer, past_end: bool) {
        let max_col = max_col_for_line(buf, self.pos.line, past_end);
        self.pos.col = self.pos.col.saturating_add(count).min(max_col);
        self.sticky_col = self.pos.col;
    }

    pub const fn move_to_line_start(&mut self) {
        self.pos.col = 0;
        self.sticky_col = 0;
    }

    pub fn move_to_first_non_blank(&mut self, buf: &Buffer, past_end: bool) {
        let col = first_non_blank_col(buf, self.pos.line);
        self.pos.col = col.min(max_col_for_line(buf, self.pos.line, past_end));
        self.sticky_col = self.pos.col;
    }

    /// `$`. The sticky column becomes "end of line" so vertical motion
    /// keeps hugging line ends.
    pub fn move_to_line_end(&mut self, buf: &Buffer, past_end: bool) {
        self.pos.col = max_col_for_line(buf, self.pos.line, past_end);
        self.sticky_col = usize::MAX;
    }

    // -- Vertical -----------------------------------------------------------

    pub fn move_up(&mut self, count: usize, buf: &Buffer, past_end: bool) {
        self.pos.line = self.pos.line.saturating_sub(count);
        self.pos.col = self.sticky_col.min(max_col_for_line(buf, self.pos.line, past_end));
    }

    pub fn move_down(&mut self, count: usize, buf: &Buffer, past_end: bool) {
        let last = buf.line_count().saturating_sub(1);
        self.pos.line = self.pos.line.saturating_add(count).min(last);
        self.pos.col = self.sticky_col.min(max_col_for_line(buf, self.pos.line, past_end));
    }

    /// Go to `line` (clamped), on its first non-blank.
    pub fn goto_line(&mut self, line: usize, buf: &Buffer, past_end: bool) {
        self.pos.line = line.min(buf.line_count().saturating_sub(1));
        self.move_to_first_non_blank(buf, past_end);
    }

    // -- Words --------------------------------------------------------------

    pub fn word_forward(&mut self, count: usize, buf: &Buffer, past_end: bool) {
        self.repeat_offset_motion(count, buf, past_end, word::word_forward);
    }

    pub fn word_backward(&mut self, count: usize, buf: &Buffer, past_end: bool) {
        self.repeat_offset_motion(count, buf, past_end, word::word_backward);
    }

    pub fn word_end_forward(&mut self, count: usize, buf: &Buffer, past_end: bool) {
        self.repeat_offset_motion(count, buf, past_end, word::word_end_forward);
    }

    pub fn big_word_forward(&mut self, count: usize, buf: &Buffer, past_end: bool) {
        self.repeat_offset_motion(count, buf, past_end, word::big_word_forward);
    }

    pub fn big_word_backward(&mut self, count: usize, buf: &Buffer, past_end: bool) {
        self.repeat_offset_motion(count, buf, past_end, word::big_word_backward);
    }

    pub fn big_word_end_forward(&mut self, count: usize, buf: &Buffer, past_end: bool) {
        self.repeat_offset_motion(count, buf, past_end, word::big_word_end_forward);
    }

    fn repeat_offset_motion(
        &mut self,
        count: usize,
        buf: &Buffer,
        past_end: bool,
        motion: fn(&Buffer, usize) -> usize,
    ) {
        let mut offset = self.offset(buf);
        for _ in 0..count.max(1) {
            let next = motion(buf, offset);
            if next == offset {
                break;
            }
            offset = next;
        }
        self.set_offset(offset, buf, past_end);
    }

    // -- Character find -----------------------------------------------------

    /// `f{ch}`: the `count`th `ch` after the cursor on this line.
    /// Returns whether the cursor moved.
    pub fn find_forward(&mut self, buf: &Buffer, ch: char, count: usize) -> bool {
        match find_on_line_forward(buf, self.pos.line, self.pos.col, ch, count) {
            Some(col) => self.set_col(col),
            None => false,
        }
    }

    /// `t{ch}`: just before the `count`th `ch` after the cursor.
    pub fn till_forward(&mut self, buf: &Buffer, ch: char, count: usize) -> bool {
        match find_on_line_forward(buf, self.pos.line, self.pos.col, ch, count) {
            Some(col) if col - 1 > self.pos.col => self.set_col(col - 1),
            _ => false,
        }
    }

    /// `F{ch}`: the `count`th `ch` before the cursor on this line.
    pub fn find_backward(&mut self, buf: &Buffer, ch: char, count: usize) -> bool {
        match find_on_line_backward(buf, self.pos.line, self.pos.col, ch, count) {
            Some(col) => self.set_col(col),
            None => false,
        }
    }

    /// `T{ch}`: just after the `count`th `ch` before the cursor.
    pub fn till_backward(&mut self, buf: &Buffer, ch: char, count: usize) -> bool {
        match find_on_line_backward(buf, self.pos.line, self.pos.col, ch, count) {
            Some(col) if col + 1 < self.pos.col => self.set_col(col + 1),
            _ => false,
        }
    }

    const fn set_col(&mut self, col: usize) -> bool {
        self.pos.col = col;
        self.sticky_col = col;
        true
    }

    // -- Clamping -----------------------------------------------------------

    /// Pull the cursor and the anchor back inside the buffer after it
    /// changed underneath them.
    pub fn clamp(&mut self, buf: &Buffer, past_end: bool) {
        self.pos = clamp(self.pos, buf, past_end);
        if let Some(anchor) = &mut self.anchor {
            *anchor = clamp(*anchor, buf, past_end);
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Largest column the cursor may occupy on `line`.
#[must_use]
pub fn max_col_for_line(buf: &Buffer, line: usize, past_end: bool) -> usize {
    let len = buf.line_content_len(line).unwrap_or(0);
    if past_end { len } else { len.saturating_sub(1) }
}

/// Column of the first non-blank char on `line`, or the content length
/// for an all-blank line.
#[must_use]
pub fn first_non_blank_col(buf: &Buffer, line: usize) -> usize {
    let len = buf.line_content_len(line).unwrap_or(0);
    buf.line(line).map_or(0, |l| {
        l.chars()
            .take(len)
            .take_while(|c| *c == ' ' || *c == '\t')
            .count()
    })
}

fn find_on_line_forward(buf: &Buffer, line: usize, from: usize, ch: char, count: usize) -> Option<usize> {
    let text = buf.line(line).ok()?;
    let len = buf.line_content_len(line).ok()?;
    (from + 1..len)
        .filter(|&i| text.char(i) == ch)
        .nth(count.max(1) - 1)
}

fn find_on_line_backward(buf: &Buffer, line: usize, from: usize, ch: char, count: usize) -> Option<usize> {
    let text = buf.line(line).ok()?;
    let from = from.min(text.len_chars());
    (0..from)
        .rev()
        .filter(|&i| text.char(i) == ch)
        .nth(count.max(1) - 1)
}

fn clamp(pos: Position, buf: &Buffer, past_end: bool) -> Position {
    let line = pos.line.min(buf.line_count().saturating_sub(1));
    Position::new(line, pos.col.min(max_col_for_line(buf, line, past_end)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferId;

    fn buf(text: &str) -> Buffer {
        Buffer::from_text(BufferId(0), "c", text)
    }

    fn p(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    // -- Horizontal ---------------------------------------------------------

    #[test]
    fn right_stops_on_last_char_in_normal() {
        let b = buf("abc");
        let mut c = Cursor::new();
        c.move_right(10, &b, false);
        assert_eq!(c.position(), p(0, 2));
        c.move_right(10, &b, true);
        assert_eq!(c.position(), p(0, 3));
    }

    #[test]
    fn left_stops_at_zero() {
        let b = buf("abc");
        let mut c = Cursor::at(p(0, 2));
        c.move_left(5, &b, false);
        assert_eq!(c.col(), 0);
    }

    #[test]
    fn first_non_blank() {
        let b = buf("    x = 1");
        let mut c = Cursor::at(p(0, 7));
        c.move_to_first_non_blank(&b, false);
        assert_eq!(c.col(), 4);
        assert_eq!(first_non_blank_col(&buf("   "), 0), 3);
    }

    // -- Vertical -----------------------------------------------------------

    #[test]
    fn sticky_column_survives_short_line() {
        let b = buf("long line\nab\nlong line");
        let mut c = Cursor::at(p(0, 6));
        c.move_down(1, &b, false);
        assert_eq!(c.position(), p(1, 1));
        c.move_down(1, &b, false);
        assert_eq!(c.position(), p(2, 6));
    }

    #[test]
    fn dollar_sticks_to_line_end() {
        let b = buf("abc\nabcdef");
        let mut c = Cursor::new();
        c.move_to_line_end(&b, false);
        c.move_down(1, &b, false);
        assert_eq!(c.position(), p(1, 5));
    }

    #[test]
    fn down_clamps_to_last_line() {
        let b = buf("a\nb");
        let mut c = Cursor::new();
        c.move_down(9, &b, false);
        assert_eq!(c.line(), 1);
    }

    #[test]
    fn goto_line_lands_on_first_non_blank() {
        let b = buf("a\n  b\nc");
        let mut c = Cursor::new();
        c.goto_line(1, &b, false);
        assert_eq!(c.position(), p(1, 2));
        c.goto_line(99, &b, false);
        assert_eq!(c.position(), p(2, 0));
    }

    // -- Words --------------------------------------------------------------

    #[test]
    fn word_forward_with_count() {
        let b = buf("one two three");
        let mut c = Cursor::new();
        c.word_forward(2, &b, false);
        assert_eq!(c.col(), 8);
    }

    #[test]
    fn word_forward_past_last_clamps() {
        let b = buf("one");
        let mut c = Cursor::new();
        c.word_forward(1, &b, false);
        assert_eq!(c.col(), 2);
    }

    // -- Find ---------------------------------------------------------------

    #[test]
    fn find_and_till() {
        let b = buf("a,b,c,d");
        let mut c = Cursor::new();
        assert!(c.find_forward(&b, ',', 2));
        assert_eq!(c.col(), 3);
        assert!(c.till_forward(&b, ',', 1));
        assert_eq!(c.col(), 4);
        assert!(c.find_backward(&b, 'a', 1));
        assert_eq!(c.col(), 0);
        assert!(!c.find_forward(&b, 'z', 1));
        assert_eq!(c.col(), 0);
    }

    #[test]
    fn till_adjacent_does_not_move() {
        let b = buf("ab");
        let mut c = Cursor::new();
        assert!(!c.till_forward(&b, 'b', 1));
    }

    // -- Selection & clamping -----------------------------------------------

    #[test]
    fn selection_is_ordered() {
        let mut c = Cursor::at(p(2, 1));
        c.set_anchor_at(p(0, 4));
        assert_eq!(c.selection(), Some((p(0, 4), p(2, 1))));
        c.swap_anchor();
        assert_eq!(c.position(), p(0, 4));
        assert_eq!(c.anchor(), Some(p(2, 1)));
    }

    #[test]
    fn clamp_after_shrink() {
        let b = buf("x");
        let mut c = Cursor::at(p(5, 5));
        c.set_anchor_at(p(3, 0));
        c.clamp(&b, false);
        assert_eq!(c.position(), p(0, 0));
        assert_eq!(c.anchor(), Some(p(0, 0)));
    }

    #[test]
    fn offset_round_trip() {
        let b = buf("ab\ncd");
        let mut c = Cursor::new();
        c.set_offset(4, &b, false);
        assert_eq!(c.position(), p(1, 1));
        assert_eq!(c.offset(&b), 4);
    }
}
