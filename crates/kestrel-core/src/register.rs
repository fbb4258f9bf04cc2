//! Registers: named slots holding yanked and deleted text.
//!
//! | Name      | Role                                                     |
//! |-----------|----------------------------------------------------------|
//! | `"`       | unnamed, mirrors every yank and delete                   |
//! | `a`-`z`   | named; the uppercase name appends to the lowercase slot  |
//! | `0`       | last yank made without an explicit register              |
//! | `-`       | last small (within one line) delete without a register   |
//! | `_`       | black hole: writes vanish, reads are empty               |
//! | `+`, `*`  | clipboard slots; the editor bridges them to the host     |
//!
//! Any other char is accepted and stored as-is. There is no history per
//! slot: the last write wins.

use std::collections::BTreeMap;

/// The unnamed register.
pub const UNNAMED: char = '"';
/// The black-hole register.
pub const BLACK_HOLE: char = '_';

// ---------------------------------------------------------------------------
// Register
// ---------------------------------------------------------------------------

/// Text plus whether it was captured line-wise, which decides how `p`
/// pastes it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Register {
    pub text: String,
    pub line_wise: bool,
}

impl Register {
    #[must_use]
    pub fn new(text: impl Into<String>, line_wise: bool) -> Self {
        Self {
            text: text.into(),
            line_wise,
        }
    }

    #[must_use]
    pub fn char_wise(text: impl Into<String>) -> Self {
        Self::new(text, false)
    }

    #[must_use]
    pub fn line(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Append `other`. If either side is line-wise the result is line-wise
    /// and the two parts are separated by a newline.
    pub fn append(&mut self, other: &Self) {
        if self.line_wise || other.line_wise {
            if !self.text.is_empty() && !self.text.ends_with('\n') {
                self.text.push('\n');
            }
            self.text.push_str(&other.text);
            self.line_wise = true;
        } else {
            self.text.push_str(&other.text);
        }
    }
}

// ---------------------------------------------------------------------------
// RegisterStore
// ---------------------------------------------------------------------------

/// All registers of one editor.
#[derive(Debug, Clone, Default)]
pub struct RegisterStore {
    slots: BTreeMap<char, Register>,
}

impl RegisterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one register, with no mirroring.
    ///
    /// `_` discards. `A`-`Z` append to `a`-`z`.
    pub fn set(&mut self, name: char, reg: Register) {
        match name {
            BLACK_HOLE => {}
            'A'..='Z' => {
                self.slots
                    .entry(name.to_ascii_lowercase())
                    .or_default()
                    .append(&reg);
            }
            _ => {
                self.slots.insert(name, reg);
            }
        }
    }

    /// Read a register. Missing slots and `_` read as empty.
    #[must_use]
    pub fn get(&self, name: char) -> Register {
        let key = if name.is_ascii_uppercase() {
            name.to_ascii_lowercase()
        } else {
            name
        };
        self.slots.get(&key).cloned().unwrap_or_default()
    }

    /// Record a yank into `name` (or the default target), mirroring into
    /// the unnamed register, and into `0` when no register was named.
    pub fn yank(&mut self, name: Option<char>, reg: Register) {
        match name {
            Some(BLACK_HOLE) => {}
            Some(UNNAMED) | None => {
                self.slots.insert('0', reg.clone());
                self.slots.insert(UNNAMED, reg);
            }
            Some(n) => self.write_and_mirror(n, reg),
        }
    }

    /// Record deleted text into `name` (or the default target), mirroring
    /// into the unnamed register, and into `-` for a small unnamed delete.
    pub fn delete(&mut self, name: Option<char>, reg: Register) {
        match name {
            Some(BLACK_HOLE) => {}
            Some(UNNAMED) | None => {
                if !reg.line_wise && !reg.text.contains('\n') {
                    self.slots.insert('-', reg.clone());
                }
                self.slots.insert(UNNAMED, reg);
            }
            Some(n) => self.write_and_mirror(n, reg),
        }
    }

    fn write_and_mirror(&mut self, name: char, reg: Register) {
        self.set(name, reg);
        let full = self.get(name);
        self.slots.insert(UNNAMED, full);
    }

    /// Non-empty registers in name order.
    pub fn iter(&self) -> impl Iterator<Item = (char, &Register)> {
        self.slots
            .iter()
            .filter(|(_, r)| !r.is_empty())
            .map(|(name, r)| (*name, r))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Register -----------------------------------------------------------

    #[test]
    fn append_char_wise() {
        let mut r = Register::char_wise("foo");
        r.append(&Register::char_wise("bar"));
        assert_eq!(r, Register::char_wise("foobar"));
    }

    #[test]
    fn append_line_wise_inserts_separator() {
        let mut r = Register::char_wise("foo");
        r.append(&Register::line("bar\n"));
        assert_eq!(r, Register::line("foo\nbar\n"));
    }

    #[test]
    fn append_onto_line_wise() {
        let mut r = Register::line("a\n");
        r.append(&Register::char_wise("b"));
        assert_eq!(r, Register::line("a\nb"));
    }

    // -- Store --------------------------------------------------------------

    #[test]
    fn unknown_register_reads_empty() {
        let store = RegisterStore::new();
        assert!(store.get('q').is_empty());
    }

    #[test]
    fn black_hole_discards() {
        let mut store = RegisterStore::new();
        store.set(BLACK_HOLE, Register::char_wise("x"));
        store.yank(Some(BLACK_HOLE), Register::char_wise("y"));
        store.delete(Some(BLACK_HOLE), Register::char_wise("z"));
        assert!(store.get(BLACK_HOLE).is_empty());
        assert!(store.get(UNNAMED).is_empty());
    }

    #[test]
    fn set_then_get() {
        let mut store = RegisterStore::new();
        store.set('a', Register::char_wise("hello"));
        assert_eq!(store.get('a').text, "hello");
        assert_eq!(store.get('A').text, "hello");
    }

    #[test]
    fn uppercase_appends() {
        let mut store = RegisterStore::new();
        store.set('a', Register::char_wise("one"));
        store.set('A', Register::char_wise(" two"));
        assert_eq!(store.get('a').text, "one two");
    }

    #[test]
    fn unnamed_yank_fills_zero() {
        let mut store = RegisterStore::new();
        store.yank(None, Register::line("line\n"));
        assert_eq!(store.get('0'), Register::line("line\n"));
        assert_eq!(store.get(UNNAMED), Register::line("line\n"));
    }

    #[test]
    fn named_yank_mirrors_full_text_to_unnamed() {
        let mut store = RegisterStore::new();
        store.yank(Some('b'), Register::char_wise("x"));
        store.yank(Some('B'), Register::char_wise("y"));
        assert_eq!(store.get(UNNAMED).text, "xy");
        assert!(store.get('0').is_empty());
    }

    #[test]
    fn small_delete_goes_to_minus() {
        let mut store = RegisterStore::new();
        store.delete(None, Register::char_wise("word"));
        assert_eq!(store.get('-').text, "word");
        store.delete(None, Register::line("whole\n"));
        assert_eq!(store.get('-').text, "word");
        assert_eq!(store.get(UNNAMED).text, "whole\n");
    }

    #[test]
    fn iter_skips_empty_and_is_ordered() {
        let mut store = RegisterStore::new();
        store.set('z', Register::char_wise("last"));
        store.set('a', Register::char_wise("first"));
        store.set('m', Register::default());
        let names: Vec<char> = store.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!['a', 'z']);
    }
}
