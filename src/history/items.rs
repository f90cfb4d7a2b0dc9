//! The history item taxonomy.
//!
//! Each kind of recorded edit is its own enum variant rather than an integer tag on one
//! record type, so dispatch over them is exhaustive-checked by the compiler.

use crate::row::EndSlot;

/// One removed run of content plus whatever end marker it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedRun {
    /// The removed text.
    pub content: String,
    /// Whether/what row-end marker was removed along with it.
    pub end: EndSlot,
}

/// A reversible unit of edit history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryItem {
    /// Single-character removals, coalesced by direction (backspace vs. delete runs).
    Remove {
        /// Absolute data coordinate(s) the removal(s) happened at, oldest first.
        coord: Vec<usize>,
        /// What was removed at each coordinate.
        removed: Vec<RemovedRun>,
    },
    /// A `remove(range)` call.
    RemoveRange {
        /// Cursor position the removal leaves behind.
        cursor: usize,
        /// What was removed.
        removed: Vec<RemovedRun>,
    },
    /// Rows discarded by a restrictive trimmer.
    RestrictRemovement {
        /// The discarded rows' content and end markers.
        rows: Vec<RemovedRun>,
        /// If this item is itself the counterpart of an earlier restrict-removement
        /// (produced while undoing/redoing one), the id it pairs with.
        pairs_with: Option<i64>,
    },
    /// A bookmarked cursor move recorded for its own sake (not part of an edit).
    Cursor {
        /// The absolute data position.
        cursor: usize,
    },
    /// A write, recording enough to invert it.
    Write {
        /// `(start, end)` absolute data range the write touched.
        coord: (usize, usize),
        /// Content overwritten by the write, if any (substitution modes).
        removed: Option<Vec<RemovedRun>>,
        /// The window-relative row the write began in.
        work_row: usize,
    },
    /// The redo counterpart of a [`HistoryItem::Write`] (or vice versa — which is which is
    /// a matter of which id it's stored under, not the variant).
    ReWrite {
        /// `(start, end)` absolute data range touched.
        coord: (usize, usize),
        /// Content overwritten, if any.
        removed: Option<Vec<RemovedRun>>,
        /// The window-relative row the write began in.
        work_row: usize,
    },
    /// A snapshot of every marking, taken before an edit that might disturb them.
    Marks {
        /// `(start, end)` pairs.
        coord: Vec<(usize, usize)>,
        /// The cursor position at the time of the snapshot, if recorded.
        cursor: Option<usize>,
    },
    /// Bookkeeping row for the branch-fork store.
    BranchMetadata {
        /// The progress id the branch diverged from.
        prev_progress_id: i64,
        /// The redo id in effect at the divergence point.
        prev_redo_id: i64,
        /// Cursor position at the divergence point.
        cursor: usize,
        /// Order-stamp of the branch point, used by the maximal-items trim to know when a
        /// branch has aged out.
        order_stamp: i64,
    },
}

impl HistoryItem {
    /// Coordinate this item would coalesce on, for [`super::LocalHistory`]'s held-item
    /// contiguity check. `None` for item kinds that never coalesce.
    pub fn coalesce_coord(&self) -> Option<(usize, usize)> {
        match self {
            HistoryItem::Remove { coord, .. } => coord.last().map(|&c| (c, c)),
            HistoryItem::Write { coord, .. } => Some(*coord),
            _ => None,
        }
    }
}
