//! Secondary storage for redo tails preserved across a branch fork.
//!
//! When branch-forking is enabled, flushing a redo tail (because a new write happened past
//! an undo point) doesn't delete it — it moves into this store keyed by a rolling
//! `fork_id`, tagged with a branch-metadata record describing where the main line
//! diverged. [`crate::history::LocalHistory::branch_fork`] swaps a stored fork back in,
//! exchanging it for the main line's current tail.

use super::items::HistoryItem;
use super::Entry;

/// One preserved alternative redo tail.
#[derive(Debug, Clone)]
pub struct Fork {
    /// Rolling identifier, allocated in order of capture.
    pub fork_id: i64,
    /// Where the main line was when this fork was captured.
    pub metadata: HistoryItem,
    /// The entries that made up the flushed redo tail.
    pub entries: Vec<Entry>,
}

/// Store of preserved forks.
#[derive(Debug, Default)]
pub struct BranchStore {
    next_fork_id: i64,
    forks: Vec<Fork>,
}

impl BranchStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a flushed redo tail as a new fork. Returns its id.
    pub fn push(&mut self, metadata: HistoryItem, entries: Vec<Entry>) -> i64 {
        let fork_id = self.next_fork_id;
        self.next_fork_id += 1;
        self.forks.push(Fork {
            fork_id,
            metadata,
            entries,
        });
        fork_id
    }

    /// Remove and return the most recently captured fork (the default
    /// `branch_fork()` target when no id is given).
    pub fn pop_latest(&mut self) -> Option<Fork> {
        self.forks.pop()
    }

    /// Remove and return a specific fork.
    pub fn take(&mut self, fork_id: i64) -> Option<Fork> {
        let idx = self.forks.iter().position(|f| f.fork_id == fork_id)?;
        Some(self.forks.remove(idx))
    }

    /// Number of preserved forks.
    pub fn len(&self) -> usize {
        self.forks.len()
    }

    /// `true` if no forks are preserved.
    pub fn is_empty(&self) -> bool {
        self.forks.is_empty()
    }

    /// Drop every fork whose branch-metadata order-stamp is at or below `floor` (called by
    /// the maximal-items trim after renumbering; a fork anchored to a trimmed-away id can
    /// no longer be replayed).
    pub fn drop_aged_out(&mut self, floor: i64) {
        self.forks.retain(|f| match &f.metadata {
            HistoryItem::BranchMetadata { order_stamp, .. } => *order_stamp > floor,
            _ => true,
        });
    }
}
