//! Split tree: how a tab's area is divided between its windows.
//!
//! ```text
//! Vertical
//! ├── Leaf(1)          left
//! └── Horizontal
//!     ├── Leaf(2)      top right
//!     └── Leaf(3)      bottom right
//! ```
//!
//! The tree stores window ids only; the windows themselves live in the
//! [`TabWindow`](crate::tab::TabWindow). [`Split::layout`] maps the tree
//! onto screen rectangles. A vertical split keeps one column between its
//! halves for a separator.

use crate::window::WindowId;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A screen rectangle in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

impl Rect {
    #[must_use]
    pub const fn new(x: u16, y: u16, w: u16, h: u16) -> Self {
        Self { x, y, w, h }
    }

    /// True if the cell `(x, y)` lies inside.
    #[must_use]
    pub const fn contains(self, x: u16, y: u16) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.w && y - self.y < self.h
    }
}

/// Orientation of a new split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitAxis {
    /// Stacked: the existing window on top, the new one below (`:sp`).
    Horizontal,
    /// Side by side: existing left, new right (`:vsp`).
    Vertical,
}

/// Direction for `<C-w> h/j/k/l`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Down,
    Up,
    Right,
}

// ---------------------------------------------------------------------------
// Split
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Split {
    Leaf(WindowId),
    Horizontal { first: Box<Self>, second: Box<Self> },
    Vertical { first: Box<Self>, second: Box<Self> },
}

impl Split {
    /// Window ids in depth-first, left-to-right order.
    #[must_use]
    pub fn leaves(&self) -> Vec<WindowId> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<WindowId>) {
        match self {
            Self::Leaf(id) => out.push(*id),
            Self::Horizontal { first, second } | Self::Vertical { first, second } => {
                first.collect_leaves(out);
                second.collect_leaves(out);
            }
        }
    }

    #[must_use]
    pub fn contains(&self, id: WindowId) -> bool {
        match self {
            Self::Leaf(w) => *w == id,
            Self::Horizontal { first, second } | Self::Vertical { first, second } => {
                first.contains(id) || second.contains(id)
            }
        }
    }

    // -- Layout -------------------------------------------------------------

    /// Rectangles for every window. They tile `area` without overlap,
    /// apart from the separator column of vertical splits.
    #[must_use]
    pub fn layout(&self, area: Rect) -> Vec<(WindowId, Rect)> {
        let mut out = Vec::new();
        self.layout_into(area, &mut out);
        out
    }

    fn layout_into(&self, area: Rect, out: &mut Vec<(WindowId, Rect)>) {
        match self {
            Self::Leaf(id) => out.push((*id, area)),
            Self::Horizontal { first, second } => {
                let top = area.h / 2;
                first.layout_into(Rect { h: top, ..area }, out);
                second.layout_into(
                    Rect {
                        y: area.y + top,
                        h: area.h - top,
                        ..area
                    },
                    out,
                );
            }
            Self::Vertical { first, second } => {
                if area.w < 3 {
                    // No room for two panes and a separator: the second
                    // half collapses to nothing.
                    first.layout_into(area, out);
                    second.layout_into(Rect { x: area.x + area.w, w: 0, ..area }, out);
                    return;
                }
                let left = area.w / 2;
                first.layout_into(Rect { w: left, ..area }, out);
                second.layout_into(
                    Rect {
                        x: area.x + left + 1,
                        w: area.w - left - 1,
                        ..area
                    },
                    out,
                );
            }
        }
    }

    // -- Mutation -----------------------------------------------------------

    /// Split the leaf `target`, placing `new_id` after it. Returns whether
    /// the target was found.
    pub fn split(&mut self, target: WindowId, new_id: WindowId, axis: SplitAxis) -> bool {
        match self {
            Self::Leaf(id) if *id == target => {
                let first = Box::new(Self::Leaf(target));
                let second = Box::new(Self::Leaf(new_id));
                *self = match axis {
                    SplitAxis::Horizontal => Self::Horizontal { first, second },
                    SplitAxis::Vertical => Self::Vertical { first, second },
                };
                true
            }
            Self::Leaf(_) => false,
            Self::Horizontal { first, second } | Self::Vertical { first, second } => {
                first.split(target, new_id, axis) || second.split(target, new_id, axis)
            }
        }
    }

    /// Remove the leaf `target`; its sibling takes the parent's place.
    /// The last remaining leaf cannot be removed.
    pub fn remove(&mut self, target: WindowId) -> bool {
        match self {
            Self::Leaf(_) => false,
            Self::Horizontal { first, second } | Self::Vertical { first, second } => {
                if matches!(first.as_ref(), Self::Leaf(id) if *id == target) {
                    *self = std::mem::replace(second.as_mut(), Self::Leaf(target));
                    return true;
                }
                if matches!(second.as_ref(), Self::Leaf(id) if *id == target) {
                    *self = std::mem::replace(first.as_mut(), Self::Leaf(target));
                    return true;
                }
                first.remove(target) || second.remove(target)
            }
        }
    }

    // -- Navigation ---------------------------------------------------------

    /// The leaf after `current`, wrapping.
    #[must_use]
    pub fn cycle_next(&self, current: WindowId) -> WindowId {
        let leaves = self.leaves();
        let pos = leaves.iter().position(|&id| id == current).unwrap_or(0);
        leaves.get((pos + 1) % leaves.len().max(1)).copied().unwrap_or(current)
    }

    /// The leaf before `current`, wrapping.
    #[must_use]
    pub fn cycle_prev(&self, current: WindowId) -> WindowId {
        let leaves = self.leaves();
        let n = leaves.len().max(1);
        let pos = leaves.iter().position(|&id| id == current).unwrap_or(0);
        leaves.get((pos + n - 1) % n).copied().unwrap_or(current)
    }

    /// Nearest window in `dir` from `current`, by distance between
    /// rectangle centres along the axis of travel (the other axis breaks
    /// ties).
    #[must_use]
    pub fn neighbor(&self, current: WindowId, dir: Direction, area: Rect) -> Option<WindowId> {
        let rects = self.layout(area);
        let cur = rects.iter().find(|(id, _)| *id == current)?.1;
        let centre = |r: Rect| {
            (
                i32::from(r.x) + i32::from(r.w) / 2,
                i32::from(r.y) + i32::from(r.h) / 2,
            )
        };
        let (cx, cy) = centre(cur);

        rects
            .iter()
            .filter(|(id, r)| {
                *id != current
                    && r.w > 0
                    && r.h > 0
                    && match dir {
                        Direction::Left => r.x + r.w <= cur.x,
                        Direction::Right => r.x >= cur.x + cur.w,
                        Direction::Up => r.y + r.h <= cur.y,
                        Direction::Down => r.y >= cur.y + cur.h,
                    }
            })
            .min_by_key(|(_, r)| {
                let (x, y) = centre(*r);
                match dir {
                    Direction::Left | Direction::Right => (x - cx).abs() * 1000 + (y - cy).abs(),
                    Direction::Up | Direction::Down => (y - cy).abs() * 1000 + (x - cx).abs(),
                }
            })
            .map(|(id, _)| *id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const fn w(n: u64) -> WindowId {
        WindowId(n)
    }

    fn three_way() -> Split {
        // 1 | (2 / 3)
        let mut s = Split::Leaf(w(1));
        s.split(w(1), w(2), SplitAxis::Vertical);
        s.split(w(2), w(3), SplitAxis::Horizontal);
        s
    }

    // -- Layout -------------------------------------------------------------

    #[test]
    fn single_leaf_takes_area() {
        let area = Rect::new(0, 0, 80, 24);
        assert_eq!(Split::Leaf(w(1)).layout(area), vec![(w(1), area)]);
    }

    #[test]
    fn vertical_reserves_separator() {
        let mut s = Split::Leaf(w(1));
        s.split(w(1), w(2), SplitAxis::Vertical);
        let rects = s.layout(Rect::new(0, 0, 81, 10));
        assert_eq!(rects[0].1, Rect::new(0, 0, 40, 10));
        assert_eq!(rects[1].1, Rect::new(41, 0, 40, 10));
    }

    #[test]
    fn horizontal_halves_height() {
        let mut s = Split::Leaf(w(1));
        s.split(w(1), w(2), SplitAxis::Horizontal);
        let rects = s.layout(Rect::new(0, 0, 10, 11));
        assert_eq!(rects[0].1, Rect::new(0, 0, 10, 5));
        assert_eq!(rects[1].1, Rect::new(0, 5, 10, 6));
    }

    #[test]
    fn narrow_vertical_collapses_second() {
        let mut s = Split::Leaf(w(1));
        s.split(w(1), w(2), SplitAxis::Vertical);
        let rects = s.layout(Rect::new(0, 0, 2, 5));
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0].1, Rect::new(0, 0, 2, 5));
        assert_eq!(rects[1].1.w, 0);
    }

    #[test]
    fn rect_contains() {
        let r = Rect::new(2, 3, 4, 5);
        assert!(r.contains(2, 3));
        assert!(r.contains(5, 7));
        assert!(!r.contains(6, 3));
        assert!(!r.contains(1, 3));
    }

    // -- Mutation -----------------------------------------------------------

    #[test]
    fn split_and_leaves() {
        assert_eq!(three_way().leaves(), vec![w(1), w(2), w(3)]);
    }

    #[test]
    fn split_missing_target() {
        let mut s = Split::Leaf(w(1));
        assert!(!s.split(w(9), w(2), SplitAxis::Vertical));
    }

    #[test]
    fn remove_promotes_sibling() {
        let mut s = three_way();
        assert!(s.remove(w(2)));
        assert_eq!(s.leaves(), vec![w(1), w(3)]);
        assert!(s.remove(w(1)));
        assert_eq!(s, Split::Leaf(w(3)));
        assert!(!s.remove(w(3)));
    }

    // -- Navigation ---------------------------------------------------------

    #[test]
    fn cycle_wraps() {
        let s = three_way();
        assert_eq!(s.cycle_next(w(3)), w(1));
        assert_eq!(s.cycle_prev(w(1)), w(3));
        assert_eq!(Split::Leaf(w(1)).cycle_next(w(1)), w(1));
    }

    #[test]
    fn neighbors() {
        let s = three_way();
        let area = Rect::new(0, 0, 81, 24);
        assert_eq!(s.neighbor(w(1), Direction::Right, area), Some(w(2)));
        assert_eq!(s.neighbor(w(2), Direction::Down, area), Some(w(3)));
        assert_eq!(s.neighbor(w(3), Direction::Left, area), Some(w(1)));
        assert_eq!(s.neighbor(w(1), Direction::Left, area), None);
    }
}
