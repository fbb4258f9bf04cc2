//! TabWindow: a set of windows arranged by a split tree.
//!
//! A tab owns its windows and the [`Split`] tree that places them. Exactly
//! one window is active while the tab has any. Closing the last window
//! leaves the tab empty; the editor then drops the tab.

use crate::buffer::BufferId;
use crate::split::{Direction, Rect, Split, SplitAxis};
use crate::window::{Window, WindowId};

/// Stable identity of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u64);

#[derive(Debug, Clone)]
pub struct TabWindow {
    id: TabId,
    name: Option<String>,
    root: Split,
    windows: Vec<Window>,
    active: WindowId,
    area: Rect,
}

impl TabWindow {
    /// A tab holding a single window.
    #[must_use]
    pub fn new(id: TabId, window: Window) -> Self {
        let active = window.id();
        Self {
            id,
            name: None,
            root: Split::Leaf(active),
            windows: vec![window],
            active,
            area: Rect::default(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> TabId {
        self.id
    }

    /// Explicit name, if one was given.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    #[must_use]
    pub const fn root(&self) -> &Split {
        &self.root
    }

    #[must_use]
    pub const fn area(&self) -> Rect {
        self.area
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    // -- Windows ------------------------------------------------------------

    /// Windows in layout order.
    #[must_use]
    pub fn windows(&self) -> Vec<&Window> {
        self.root
            .leaves()
            .into_iter()
            .filter_map(|id| self.window(id))
            .collect()
    }

    pub fn windows_mut(&mut self) -> impl Iterator<Item = &mut Window> {
        self.windows.iter_mut()
    }

    #[must_use]
    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id() == id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.id() == id)
    }

    #[inline]
    #[must_use]
    pub const fn active_id(&self) -> WindowId {
        self.active
    }

    #[must_use]
    pub fn active_window(&self) -> Option<&Window> {
        self.window(self.active)
    }

    pub fn active_window_mut(&mut self) -> Option<&mut Window> {
        let id = self.active;
        self.window_mut(id)
    }

    /// Make `id` active. Returns false for a window not in this tab.
    pub fn set_active(&mut self, id: WindowId) -> bool {
        if self.window(id).is_none() {
            return false;
        }
        self.active = id;
        true
    }

    /// Windows showing `buffer`.
    #[must_use]
    pub fn find_windows(&self, buffer: BufferId) -> Vec<WindowId> {
        self.windows
            .iter()
            .filter(|w| w.buffer_id() == buffer)
            .map(Window::id)
            .collect()
    }

    // -- Split / close ------------------------------------------------------

    /// Split the active window. The new window shows the same buffer at
    /// the same cursor and becomes active.
    pub fn split(&mut self, axis: SplitAxis, new_id: WindowId) -> Option<WindowId> {
        let clone = self.active_window()?.clone_as(new_id);
        if !self.root.split(self.active, new_id, axis) {
            return None;
        }
        self.windows.push(clone);
        self.active = new_id;
        self.relayout();
        Some(new_id)
    }

    /// Close a window. Returns true if the tab has no windows left.
    pub fn close_window(&mut self, id: WindowId) -> bool {
        let Some(index) = self.windows.iter().position(|w| w.id() == id) else {
            return self.windows.is_empty();
        };
        if self.windows.len() == 1 {
            self.windows.clear();
            return true;
        }
        if self.active == id {
            self.active = self.root.cycle_next(id);
        }
        self.root.remove(id);
        self.windows.remove(index);
        self.relayout();
        false
    }

    // -- Layout & navigation ------------------------------------------------

    /// Assign every window its rectangle within `area`.
    pub fn layout(&mut self, area: Rect) {
        self.area = area;
        self.relayout();
    }

    fn relayout(&mut self) {
        for (id, rect) in self.root.layout(self.area) {
            if let Some(w) = self.window_mut(id) {
                w.set_area(rect);
            }
        }
    }

    /// Window under screen cell `(x, y)`.
    #[must_use]
    pub fn window_at(&self, x: u16, y: u16) -> Option<WindowId> {
        self.windows
            .iter()
            .find(|w| w.area().contains(x, y))
            .map(Window::id)
    }

    /// Activate the next window in layout order.
    pub fn cycle_next(&mut self) {
        self.active = self.root.cycle_next(self.active);
    }

    pub fn cycle_prev(&mut self) {
        self.active = self.root.cycle_prev(self.active);
    }

    /// Activate the neighbour in `dir`, if any. Returns whether it moved.
    pub fn focus(&mut self, dir: Direction) -> bool {
        match self.root.neighbor(self.active, dir, self.area) {
            Some(id) => {
                self.active = id;
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    fn tab() -> TabWindow {
        let mut t = TabWindow::new(TabId(1), Window::new(WindowId(1), BufferId(10)));
        t.layout(Rect::new(0, 0, 81, 24));
        t
    }

    #[test]
    fn new_tab_has_one_active_window() {
        let t = tab();
        assert_eq!(t.active_id(), WindowId(1));
        assert_eq!(t.windows().len(), 1);
        assert_eq!(t.active_window().map(Window::area), Some(Rect::new(0, 0, 81, 24)));
    }

    #[test]
    fn split_clones_active_window() {
        let mut t = tab();
        if let Some(w) = t.active_window_mut() {
            w.cursor_mut().set_anchor_at(Position::new(0, 0));
        }
        assert_eq!(t.split(SplitAxis::Vertical, WindowId(2)), Some(WindowId(2)));
        assert_eq!(t.active_id(), WindowId(2));
        let new = t.window(WindowId(2)).unwrap();
        assert_eq!(new.buffer_id(), BufferId(10));
        assert_eq!(new.area(), Rect::new(41, 0, 40, 24));
        assert_eq!(t.window(WindowId(1)).map(Window::area), Some(Rect::new(0, 0, 40, 24)));
    }

    #[test]
    fn find_windows_by_buffer() {
        let mut t = tab();
        t.split(SplitAxis::Horizontal, WindowId(2));
        if let Some(w) = t.window_mut(WindowId(2)) {
            w.set_buffer(BufferId(11));
        }
        assert_eq!(t.find_windows(BufferId(10)), vec![WindowId(1)]);
        assert_eq!(t.find_windows(BufferId(11)), vec![WindowId(2)]);
        assert!(t.find_windows(BufferId(12)).is_empty());
    }

    #[test]
    fn close_window_moves_focus_and_relayouts() {
        let mut t = tab();
        t.split(SplitAxis::Vertical, WindowId(2));
        assert!(!t.close_window(WindowId(2)));
        assert_eq!(t.active_id(), WindowId(1));
        assert_eq!(t.active_window().map(Window::area), Some(Rect::new(0, 0, 81, 24)));
    }

    #[test]
    fn closing_last_window_empties_tab() {
        let mut t = tab();
        assert!(t.close_window(WindowId(1)));
        assert!(t.is_empty());
    }

    #[test]
    fn window_at_hits_rects() {
        let mut t = tab();
        t.split(SplitAxis::Vertical, WindowId(2));
        assert_eq!(t.window_at(10, 5), Some(WindowId(1)));
        assert_eq!(t.window_at(50, 5), Some(WindowId(2)));
        assert_eq!(t.window_at(40, 5), None);
    }

    #[test]
    fn set_active_and_cycle() {
        let mut t = tab();
        t.split(SplitAxis::Vertical, WindowId(2));
        assert!(t.set_active(WindowId(1)));
        assert!(!t.set_active(WindowId(9)));
        t.cycle_next();
        assert_eq!(t.active_id(), WindowId(2));
        assert!(t.focus(Direction::Left));
        assert_eq!(t.active_id(), WindowId(1));
    }
}
