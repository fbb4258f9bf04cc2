//! Line/column coordinates.
//!
//! The buffer's mutation API speaks char offsets. Cursors and motions speak
//! `(line, col)` because vertical movement, sticky columns and line-wise
//! operators are naturally expressed that way. Both are 0-indexed and both
//! count Unicode scalar values, never bytes.

use std::fmt;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A `(line, col)` pair, both 0-indexed. Ordered line first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub const ZERO: Self = Self { line: 0, col: 0 };

    #[inline]
    #[must_use]
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pos({}:{})", self.line, self.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1-indexed, the way a status line shows it.
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// A half-open `[start, end)` range of char offsets.
///
/// Built with [`Range::new`] from any two offsets; the constructor orders
/// them, so `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    /// Create a range from two offsets in either order.
    #[inline]
    #[must_use]
    pub const fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    #[inline]
    #[must_use]
    pub const fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    #[inline]
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    /// True if `offset` lies inside `[start, end)`.
    #[inline]
    #[must_use]
    pub const fn contains(self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// True if the two ranges share at least one offset.
    #[inline]
    #[must_use]
    pub const fn overlaps(self, other: Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_orders_line_first() {
        assert!(Position::new(0, 9) < Position::new(1, 0));
        assert!(Position::new(2, 1) < Position::new(2, 3));
    }

    #[test]
    fn position_display_is_one_indexed() {
        assert_eq!(Position::new(0, 0).to_string(), "1:1");
        assert_eq!(Position::new(4, 7).to_string(), "5:8");
    }

    #[test]
    fn position_debug() {
        assert_eq!(format!("{:?}", Position::new(3, 2)), "Pos(3:2)");
    }

    #[test]
    fn range_orders_endpoints() {
        assert_eq!(Range::new(7, 3), Range { start: 3, end: 7 });
        assert_eq!(Range::new(3, 7).len(), 4);
    }

    #[test]
    fn range_point_is_empty() {
        assert!(Range::point(5).is_empty());
        assert!(!Range::point(5).contains(5));
    }

    #[test]
    fn range_contains_is_half_open() {
        let r = Range::new(2, 5);
        assert!(r.contains(2));
        assert!(r.contains(4));
        assert!(!r.contains(5));
    }

    #[test]
    fn range_overlaps() {
        assert!(Range::new(0, 5).overlaps(Range::new(4, 8)));
        assert!(!Range::new(0, 5).overlaps(Range::new(5, 8)));
        assert!(!Range::new(0, 5).overlaps(Range::point(3)));
    }
}
