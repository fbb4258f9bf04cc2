//! Undo/redo history.
//!
//! Every buffer mutation is recorded as a reversible [`Edit`]. Edits are
//! grouped into [`Transaction`]s, and a transaction is what one undo step
//! reverses:
//!
//! - **Vim normal mode**: each completed command (`x`, `dd`, `3J`) is one
//!   transaction.
//! - **Insert session**: everything from entering insert to `<Esc>`.
//! - **Outside any group**: a lone mutation becomes its own transaction.
//!
//! Grouping is driven by the mode through [`Buffer::begin_group`] and
//! [`Buffer::end_group`]; the history itself never decides boundaries.
//!
//! Empty transactions are discarded. Committing a transaction clears the
//! redo stack.
//!
//! [`Buffer::begin_group`]: crate::buffer::Buffer::begin_group
//! [`Buffer::end_group`]: crate::buffer::Buffer::end_group

// ---------------------------------------------------------------------------
// Edit
// ---------------------------------------------------------------------------

/// A single reversible mutation, in char offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// `text` was inserted at `offset`.
    Insert { offset: usize, text: String },
    /// `text` was removed starting at `offset`.
    Delete { offset: usize, text: String },
}

impl Edit {
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        match self {
            Self::Insert { offset, .. } | Self::Delete { offset, .. } => *offset,
        }
    }

    /// The edit that undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        match self {
            Self::Insert { offset, text } => Self::Delete {
                offset: *offset,
                text: text.clone(),
            },
            Self::Delete { offset, text } => Self::Insert {
                offset: *offset,
                text: text.clone(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A group of edits that undo and redo as one unit, plus the cursor
/// offsets to restore on either side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub edits: Vec<Edit>,
    pub cursor_before: usize,
    pub cursor_after: usize,
}

impl Transaction {
    const fn open(cursor: usize) -> Self {
        Self {
            edits: Vec::new(),
            cursor_before: cursor,
            cursor_after: cursor,
        }
    }

    /// Edits that revert this transaction, in application order.
    #[must_use]
    pub fn undo_edits(&self) -> Vec<Edit> {
        self.edits.iter().rev().map(Edit::inverse).collect()
    }

    /// Edits that re-apply this transaction, in application order.
    #[must_use]
    pub fn redo_edits(&self) -> Vec<Edit> {
        self.edits.clone()
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Undo and redo stacks plus the currently open group, if any.
#[derive(Debug, Default)]
pub struct History {
    undo_stack: Vec<Transaction>,
    redo_stack: Vec<Transaction>,
    pending: Option<Transaction>,
}

impl History {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            pending: None,
        }
    }

    /// Open a group. An already open group is committed first with its
    /// own last known cursor.
    pub fn begin(&mut self, cursor: usize) {
        if let Some(open) = &self.pending {
            let after = open.cursor_after;
            self.commit(after);
        }
        self.pending = Some(Transaction::open(cursor));
    }

    /// True while a group is open.
    #[inline]
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    /// Record an edit that has already been applied to the text. `cursor`
    /// is where the edit left the cursor.
    ///
    /// With a group open the edit joins it. Otherwise it is committed at
    /// once as a single-edit transaction that undoes to the edit's offset.
    pub fn record(&mut self, edit: Edit, cursor: usize) {
        if let Some(txn) = &mut self.pending {
            txn.edits.push(edit);
            txn.cursor_after = cursor;
            return;
        }
        let mut txn = Transaction::open(edit.offset());
        txn.cursor_after = cursor;
        txn.edits.push(edit);
        self.push_committed(txn);
    }

    /// Close the open group. `cursor` is where the cursor ended up.
    pub fn commit(&mut self, cursor: usize) {
        if let Some(mut txn) = self.pending.take() {
            if txn.edits.is_empty() {
                return;
            }
            txn.cursor_after = cursor;
            self.push_committed(txn);
        }
    }

    fn push_committed(&mut self, txn: Transaction) {
        self.redo_stack.clear();
        self.undo_stack.push(txn);
    }

    /// Move the newest transaction to the redo stack and return it.
    /// An open group is committed first so it can be undone.
    pub fn undo(&mut self) -> Option<&Transaction> {
        if let Some(open) = &self.pending {
            let after = open.cursor_after;
            self.commit(after);
        }
        let txn = self.undo_stack.pop()?;
        self.redo_stack.push(txn);
        self.redo_stack.last()
    }

    /// Move the newest undone transaction back to the undo stack and
    /// return it.
    pub fn redo(&mut self) -> Option<&Transaction> {
        if let Some(open) = &self.pending {
            let after = open.cursor_after;
            self.commit(after);
        }
        let txn = self.redo_stack.pop()?;
        self.undo_stack.push(txn);
        self.undo_stack.last()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.pending.as_ref().is_some_and(|t| !t.edits.is_empty())
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[must_use]
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drop all history, including any open group.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ins(offset: usize, text: &str) -> Edit {
        Edit::Insert {
            offset,
            text: text.to_string(),
        }
    }

    fn del(offset: usize, text: &str) -> Edit {
        Edit::Delete {
            offset,
            text: text.to_string(),
        }
    }

    // -- Edit ---------------------------------------------------------------

    #[test]
    fn inverse_swaps_kind() {
        assert_eq!(ins(3, "ab").inverse(), del(3, "ab"));
        assert_eq!(del(0, "x").inverse(), ins(0, "x"));
    }

    #[test]
    fn undo_edits_are_reversed_inverses() {
        let txn = Transaction {
            edits: vec![ins(0, "a"), ins(1, "b")],
            cursor_before: 0,
            cursor_after: 2,
        };
        assert_eq!(txn.undo_edits(), vec![del(1, "b"), del(0, "a")]);
        assert_eq!(txn.redo_edits(), txn.edits);
    }

    // -- Grouping -----------------------------------------------------------

    #[test]
    fn ungrouped_record_is_its_own_transaction() {
        let mut h = History::new();
        h.record(ins(0, "a"), 0);
        h.record(ins(1, "b"), 1);
        assert_eq!(h.undo_count(), 2);
    }

    #[test]
    fn grouped_records_form_one_transaction() {
        let mut h = History::new();
        h.begin(0);
        h.record(ins(0, "a"), 1);
        h.record(ins(1, "b"), 2);
        h.commit(2);
        assert_eq!(h.undo_count(), 1);
        let txn = h.undo().unwrap();
        assert_eq!(txn.edits.len(), 2);
        assert_eq!(txn.cursor_before, 0);
        assert_eq!(txn.cursor_after, 2);
    }

    #[test]
    fn empty_group_is_discarded() {
        let mut h = History::new();
        h.begin(4);
        h.commit(4);
        assert_eq!(h.undo_count(), 0);
        assert!(!h.can_undo());
    }

    #[test]
    fn begin_commits_open_group() {
        let mut h = History::new();
        h.begin(0);
        h.record(ins(0, "a"), 1);
        h.begin(1);
        h.record(ins(1, "b"), 2);
        h.commit(2);
        assert_eq!(h.undo_count(), 2);
    }

    #[test]
    fn commit_clears_redo() {
        let mut h = History::new();
        h.record(ins(0, "a"), 0);
        h.undo();
        assert!(h.can_redo());
        h.record(ins(0, "b"), 0);
        assert!(!h.can_redo());
    }

    // -- Undo / redo --------------------------------------------------------

    #[test]
    fn undo_commits_open_group() {
        let mut h = History::new();
        h.begin(0);
        h.record(ins(0, "abc"), 3);
        assert!(h.can_undo());
        assert!(h.undo().is_some());
        assert!(!h.is_open());
        assert_eq!(h.redo_count(), 1);
    }

    #[test]
    fn undo_redo_at_boundaries() {
        let mut h = History::new();
        assert!(h.undo().is_none());
        assert!(h.redo().is_none());
    }

    #[test]
    fn redo_moves_back_to_undo() {
        let mut h = History::new();
        h.record(ins(0, "a"), 0);
        h.undo();
        assert_eq!((h.undo_count(), h.redo_count()), (0, 1));
        h.redo();
        assert_eq!((h.undo_count(), h.redo_count()), (1, 0));
    }

    #[test]
    fn clear_drops_everything() {
        let mut h = History::new();
        h.record(ins(0, "a"), 0);
        h.begin(1);
        h.clear();
        assert!(!h.can_undo());
        assert!(!h.is_open());
    }
}
