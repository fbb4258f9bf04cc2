//! Word and WORD motions over char offsets.
//!
//! | Function                 | Key | Lands on                          |
//! |--------------------------|-----|-----------------------------------|
//! | [`word_forward`]         | `w` | start of the next word            |
//! | [`word_backward`]        | `b` | start of the previous word        |
//! | [`word_end_forward`]     | `e` | end of the current or next word   |
//! | [`big_word_forward`]     | `W` | start of the next WORD            |
//! | [`big_word_backward`]    | `B` | start of the previous WORD        |
//! | [`big_word_end_forward`] | `E` | end of the current or next WORD   |
//!
//! A word is a run of word chars (letters, digits, `_`) or a run of other
//! non-blank chars; `a.b` is three words. A WORD is any run of non-blanks;
//! `a.b` is one WORD. An empty line counts as a word for `w` and `b`.
//!
//! Forward motions with nothing left to reach return `len_chars()`; callers
//! clamp to wherever the cursor may sit.

use crate::buffer::{Buffer, is_line_break};

// ---------------------------------------------------------------------------
// Character classes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CharClass {
    Word,
    Punctuation,
    Blank,
    Newline,
}

pub(crate) fn classify(ch: char) -> CharClass {
    if is_line_break(ch) {
        CharClass::Newline
    } else if ch.is_whitespace() {
        CharClass::Blank
    } else if ch.is_alphanumeric() || ch == '_' {
        CharClass::Word
    } else {
        CharClass::Punctuation
    }
}

pub(crate) fn classify_big(ch: char) -> CharClass {
    match classify(ch) {
        CharClass::Punctuation => CharClass::Word,
        other => other,
    }
}

const fn is_token(class: CharClass) -> bool {
    matches!(class, CharClass::Word | CharClass::Punctuation)
}

// ---------------------------------------------------------------------------
// Motions
// ---------------------------------------------------------------------------

#[must_use]
pub fn word_forward(buf: &Buffer, offset: usize) -> usize {
    forward_start(buf, offset, classify)
}

#[must_use]
pub fn word_backward(buf: &Buffer, offset: usize) -> usize {
    backward_start(buf, offset, classify)
}

#[must_use]
pub fn word_end_forward(buf: &Buffer, offset: usize) -> usize {
    forward_end(buf, offset, classify)
}

#[must_use]
pub fn big_word_forward(buf: &Buffer, offset: usize) -> usize {
    forward_start(buf, offset, classify_big)
}

#[must_use]
pub fn big_word_backward(buf: &Buffer, offset: usize) -> usize {
    backward_start(buf, offset, classify_big)
}

#[must_use]
pub fn big_word_end_forward(buf: &Buffer, offset: usize) -> usize {
    forward_end(buf, offset, classify_big)
}

/// Skip the token under `offset`, then blanks and line breaks, stopping
/// early on an empty line.
fn forward_start(buf: &Buffer, offset: usize, class_of: fn(char) -> CharClass) -> usize {
    let rope = buf.rope();
    let total = rope.len_chars();
    if offset >= total {
        return total;
    }

    let mut idx = offset;
    let start = class_of(rope.char(idx));
    if is_token(start) {
        while idx < total && class_of(rope.char(idx)) == start {
            idx += 1;
        }
    }

    while idx < total {
        let ch = rope.char(idx);
        match class_of(ch) {
            CharClass::Word | CharClass::Punctuation => break,
            CharClass::Blank => idx += 1,
            CharClass::Newline => {
                idx += 1;
                if ch == '\r' && idx < total && rope.char(idx) == '\n' {
                    idx += 1;
                }
                if idx < total && class_of(rope.char(idx)) == CharClass::Newline {
                    break;
                }
            }
        }
    }
    idx
}

/// Step back over blanks and line breaks (stopping at an empty line), then
/// to the first char of the token found.
fn backward_start(buf: &Buffer, offset: usize, class_of: fn(char) -> CharClass) -> usize {
    let rope = buf.rope();
    let offset = offset.min(rope.len_chars());
    if offset == 0 {
        return 0;
    }

    let mut idx = offset - 1;
    loop {
        match class_of(rope.char(idx)) {
            CharClass::Word | CharClass::Punctuation => break,
            CharClass::Newline => {
                let line = rope.char_to_line(idx);
                if buf.line_content_len(line).unwrap_or(1) == 0 && rope.line_to_char(line) < offset {
                    return rope.line_to_char(line);
                }
                if idx == 0 {
                    return 0;
                }
                idx -= 1;
            }
            CharClass::Blank => {
                if idx == 0 {
                    return 0;
                }
                idx -= 1;
            }
        }
    }

    let class = class_of(rope.char(idx));
    while idx > 0 && class_of(rope.char(idx - 1)) == class {
        idx -= 1;
    }
    idx
}

/// Step forward once, skip blanks and line breaks, then run to the last
/// char of the token found.
fn forward_end(buf: &Buffer, offset: usize, class_of: fn(char) -> CharClass) -> usize {
    let rope = buf.rope();
    let total = rope.len_chars();
    if offset + 1 >= total {
        return total;
    }

    let mut idx = offset + 1;
    while idx < total && !is_token(class_of(rope.char(idx))) {
        idx += 1;
    }
    if idx >= total {
        return total;
    }

    let class = class_of(rope.char(idx));
    while idx + 1 < total && class_of(rope.char(idx + 1)) == class {
        idx += 1;
    }
    idx
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferId;

    fn buf(text: &str) -> Buffer {
        Buffer::from_text(BufferId(0), "w", text)
    }

    // -- Classification -----------------------------------------------------

    #[test]
    fn classes() {
        assert_eq!(classify('a'), CharClass::Word);
        assert_eq!(classify('_'), CharClass::Word);
        assert_eq!(classify('é'), CharClass::Word);
        assert_eq!(classify('.'), CharClass::Punctuation);
        assert_eq!(classify('\t'), CharClass::Blank);
        assert_eq!(classify('\r'), CharClass::Newline);
        assert_eq!(classify_big('.'), CharClass::Word);
    }

    // -- w / W --------------------------------------------------------------

    #[test]
    fn w_two_words() {
        assert_eq!(word_forward(&buf("hello world"), 0), 6);
        assert_eq!(word_forward(&buf("hello world"), 2), 6);
    }

    #[test]
    fn w_stops_at_punctuation() {
        let b = buf("hello.world");
        assert_eq!(word_forward(&b, 0), 5);
        assert_eq!(word_forward(&b, 5), 6);
    }

    #[test]
    fn w_crosses_line() {
        assert_eq!(word_forward(&buf("one\n  two"), 0), 6);
    }

    #[test]
    fn w_stops_on_empty_line() {
        assert_eq!(word_forward(&buf("one\n\ntwo"), 0), 4);
    }

    #[test]
    fn w_at_last_word_reaches_end() {
        assert_eq!(word_forward(&buf("last"), 1), 4);
        assert_eq!(word_forward(&buf("trail  "), 0), 7);
    }

    #[test]
    fn big_w_skips_punctuation() {
        assert_eq!(big_word_forward(&buf("a.b c"), 0), 4);
    }

    // -- b / B --------------------------------------------------------------

    #[test]
    fn b_previous_word() {
        let b = buf("hello world");
        assert_eq!(word_backward(&b, 6), 0);
        assert_eq!(word_backward(&b, 8), 6);
        assert_eq!(word_backward(&b, 0), 0);
    }

    #[test]
    fn b_crosses_line() {
        assert_eq!(word_backward(&buf("one\ntwo"), 4), 0);
    }

    #[test]
    fn b_stops_on_empty_line() {
        assert_eq!(word_backward(&buf("one\n\ntwo"), 5), 4);
    }

    #[test]
    fn big_b() {
        assert_eq!(big_word_backward(&buf("x a.b"), 4), 2);
    }

    // -- e / E --------------------------------------------------------------

    #[test]
    fn e_end_of_word() {
        let b = buf("hello world");
        assert_eq!(word_end_forward(&b, 0), 4);
        assert_eq!(word_end_forward(&b, 4), 10);
    }

    #[test]
    fn e_at_end_returns_len() {
        assert_eq!(word_end_forward(&buf("ab"), 1), 2);
    }

    #[test]
    fn big_e() {
        assert_eq!(big_word_end_forward(&buf("a.b c"), 0), 2);
    }
}
