//! Append-only chronological edit log with coalescing, unification, undo/redo, an
//! optional undo-lock, optional branch forks, and a maximal-items trim.
//!
//! The held, not-yet-flushed edit is a `Option<HistoryItem>` plus a `drain()` method. The
//! actual *inversion* of a stored item
//! into a buffer mutation is delegated to a [`HistoryApplier`] the owning
//! [`crate::buffer::TextBuffer`] implements — this component owns the log and the
//! id/order/cursor bookkeeping, not row mutation.

pub mod branch;
pub mod items;

use crate::error::{BufferError, Result};
pub use items::{HistoryItem, RemovedRun};

use branch::BranchStore;

/// One stored log entry.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Chronological id. Non-negative for forward (originally-written) items, negative
    /// for redo counterparts produced by an `undo()`.
    pub id: i64,
    /// Order within `id`, used to replay multiple items recorded under a unification scope
    /// in the right sequence.
    pub order: i64,
    /// The item itself.
    pub item: HistoryItem,
}

/// Callback the owning buffer implements so [`LocalHistory::undo`]/[`LocalHistory::redo`]
/// can turn a stored item into an actual document change.
pub trait HistoryApplier {
    /// Apply the inverse of `item` to the live document, and return a new item describing
    /// what was actually done (to be stored under the dedicated id so it can be inverted
    /// again later).
    fn apply_inverse(&mut self, item: &HistoryItem) -> HistoryItem;
}

/// Watermark of "document is in a known-clean state at this progress", as an enum rather
/// than a handful of magic sentinel integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clamp {
    /// Clean at this effective progress id.
    At(i64),
    /// The clean state is only reachable by first performing a `branch_fork()`.
    ReachableViaFork,
    /// The clean state was discarded by the maximal-items trim.
    LostToTrim,
    /// The clean state was discarded because its redo tail was flushed with no branch
    /// store configured to preserve it.
    LostToRedoFlush,
}

/// Configuration for [`LocalHistory::new`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryConfig {
    /// If set, the first `undo()` engages the undo-lock.
    pub undo_lock: bool,
    /// If set, flushed redo tails are preserved in a [`branch::BranchStore`] instead of
    /// being discarded.
    pub branch_forks: bool,
    /// If set, trims the log once `progress_id` exceeds `maximal_items + chunk`.
    pub maximal_items: Option<usize>,
    /// Chunk size used by the maximal-items trim.
    pub trim_chunk: usize,
}

/// The local-history engine.
pub struct LocalHistory {
    config: HistoryConfig,
    entries: Vec<Entry>,
    held: Option<Entry>,
    /// Next id to assign to a forward-dumped (non-held) item.
    progress_id: i64,
    /// The highest forward id not yet undone, or `-1` if none / all undone.
    undo_cursor: i64,
    /// The most recently undone forward id, if any (its negative counterpart is what
    /// `redo()` looks for).
    redo_cursor: Option<i64>,
    locked: bool,
    clamp: Clamp,
    branch: BranchStore,
    unify_id: Option<i64>,
    unify_order: i64,
}

/// Everything [`LocalHistory::snapshot`]/[`LocalHistory::restore`] need to persist and
/// reload the log across a process restart.
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    /// Every stored entry, oldest first.
    pub entries: Vec<Entry>,
    /// Next id to assign to a forward-dumped item.
    pub progress_id: i64,
    /// The highest forward id not yet undone.
    pub undo_cursor: i64,
    /// The most recently undone forward id, if any.
    pub redo_cursor: Option<i64>,
    /// The clamp state at the time of the snapshot.
    pub clamp: Clamp,
}

impl LocalHistory {
    /// A fresh, empty history.
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            held: None,
            progress_id: 0,
            undo_cursor: -1,
            redo_cursor: None,
            locked: false,
            clamp: Clamp::At(0),
            branch: BranchStore::new(),
            unify_id: None,
            unify_order: 0,
        }
    }

    /// Fail if the undo-lock is engaged. Every mutating `TextBuffer` method calls this
    /// first.
    pub fn assert_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(BufferError::UndoLocked);
        }
        Ok(())
    }

    /// `true` once the first `undo()` has engaged the lock.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Release the undo-lock, flushing the redo tail in the process: re-engaging editing
    /// after an undo-locked review discards what could have been redone, since the lock
    /// exists precisely to prevent a caller from losing track of that and overwriting it by
    /// accident.
    pub fn lock_release(&mut self) {
        self.locked = false;
        self.flush_redo();
    }

    /// The current forward-progress id (next id a dumped item will receive).
    pub fn progress_id(&self) -> i64 {
        self.progress_id
    }

    /// Coalesce `item` into the held slot if contiguous with it (same coordinate
    /// adjacency, per [`HistoryItem::coalesce_coord`]); otherwise flush the held item and
    /// hold `item` instead.
    pub fn hold(&mut self, item: HistoryItem) {
        if let Some(held) = &mut self.held {
            if Self::coalesces(&held.item, &item) {
                held.item = Self::merge(held.item.clone(), item);
                return;
            }
        }
        self.drain_held();
        self.held = Some(Entry {
            id: 0,
            order: 0,
            item,
        });
    }

    fn coalesces(held: &HistoryItem, next: &HistoryItem) -> bool {
        if std::mem::discriminant(held) != std::mem::discriminant(next) {
            return false;
        }
        match (held.coalesce_coord(), next.coalesce_coord()) {
            (Some((_, h_end)), Some((n_start, _))) => h_end == n_start || h_end + 1 == n_start,
            _ => false,
        }
    }

    fn merge(held: HistoryItem, next: HistoryItem) -> HistoryItem {
        match (held, next) {
            (
                HistoryItem::Remove {
                    mut coord,
                    mut removed,
                },
                HistoryItem::Remove {
                    coord: c2,
                    removed: r2,
                },
            ) => {
                coord.extend(c2);
                removed.extend(r2);
                HistoryItem::Remove { coord, removed }
            }
            (
                HistoryItem::Write {
                    coord: (start, _),
                    removed: r1,
                    work_row,
                },
                HistoryItem::Write {
                    coord: (_, end2),
                    removed: r2,
                    ..
                },
            ) => {
                let removed = match (r1, r2) {
                    (None, None) => None,
                    (r1, r2) => {
                        let mut merged = r1.unwrap_or_default();
                        merged.extend(r2.unwrap_or_default());
                        Some(merged)
                    }
                };
                HistoryItem::Write {
                    coord: (start, end2),
                    removed,
                    work_row,
                }
            }
            (_, next) => next,
        }
    }

    /// Drain the held item (if any) into the permanent log, under a fresh id.
    pub fn drain_held(&mut self) {
        if let Some(entry) = self.held.take() {
            self.dump(entry.item);
        }
    }

    /// Append `item` directly to the log (bypassing the held slot), under a fresh id (or
    /// the active unification id).
    pub fn dump(&mut self, item: HistoryItem) {
        self.flush_redo_on_new_write();
        let (id, order) = self.next_id_order();
        self.entries.push(Entry { id, order, item });
    }

    fn next_id_order(&mut self) -> (i64, i64) {
        if let Some(uid) = self.unify_id {
            let order = self.unify_order;
            self.unify_order -= 1;
            (uid, order)
        } else {
            let id = self.progress_id;
            self.progress_id += 1;
            self.undo_cursor = id;
            self.redo_cursor = None;
            (id, 0)
        }
    }

    fn flush_redo_on_new_write(&mut self) {
        if self.unify_id.is_some() {
            return;
        }
        if self.redo_cursor.is_none() {
            return;
        }
        self.flush_redo();
    }

    /// Discard (or, if branch-forks are configured, preserve) every entry with a negative
    /// id — the redo tail left by a prior `undo()`.
    pub fn flush_redo(&mut self) {
        let (kept, flushed): (Vec<Entry>, Vec<Entry>) =
            self.entries.drain(..).partition(|e| e.id >= 0);
        self.entries = kept;
        if flushed.is_empty() {
            self.redo_cursor = None;
            return;
        }
        if self.config.branch_forks {
            let metadata = HistoryItem::BranchMetadata {
                prev_progress_id: self.progress_id,
                prev_redo_id: self.redo_cursor.unwrap_or(0),
                cursor: 0,
                order_stamp: self.progress_id,
            };
            self.branch.push(metadata, flushed);
        } else if matches!(self.clamp, Clamp::At(c) if flushed.iter().any(|e| -e.id == c)) {
            self.clamp = Clamp::LostToRedoFlush;
        }
        self.redo_cursor = None;
    }

    /// Enter a unification scope: every item dumped inside shares one id and is ordered by
    /// descending `order_`. Nested calls are a no-op (the outer scope's guard governs).
    /// Returns a guard that, on drop, rolls the reserved id back if nothing was dumped.
    pub fn unite(&mut self) -> UniteGuard<'_> {
        let already_active = self.unify_id.is_some();
        if !already_active {
            self.unify_id = Some(self.progress_id);
            self.unify_order = 0;
        }
        UniteGuard {
            history: self,
            owns_scope: !already_active,
        }
    }

    fn end_unite(&mut self) {
        let Some(uid) = self.unify_id else { return };
        let used = self.entries.iter().any(|e| e.id == uid);
        self.unify_id = None;
        if used {
            self.progress_id = uid + 1;
            self.undo_cursor = uid;
            self.redo_cursor = None;
        }
    }

    /// Undo the most recent not-yet-undone forward unit, via `applier`. Returns `None` if
    /// there is nothing to undo (chronological progress 0 reached).
    pub fn undo(&mut self, applier: &mut dyn HistoryApplier) -> Option<()> {
        if self.undo_cursor < 0 {
            return None;
        }
        let cursor = self.undo_cursor;
        let mut items: Vec<&Entry> = self.entries.iter().filter(|e| e.id == cursor).collect();
        items.sort_by_key(|e| e.order);
        let inverses: Vec<HistoryItem> = items
            .into_iter()
            .rev()
            .map(|e| applier.apply_inverse(&e.item))
            .collect();
        for (i, item) in inverses.into_iter().enumerate() {
            self.entries.push(Entry {
                id: -cursor,
                order: i as i64,
                item,
            });
        }
        self.redo_cursor = Some(cursor);
        self.undo_cursor = cursor - 1;
        if self.config.undo_lock {
            self.locked = true;
            log::debug!("undo engaged the lock at progress {cursor}");
        }
        Some(())
    }

    /// Redo the most recently undone unit, via `applier`. Returns `None` if nothing is
    /// pending redo.
    pub fn redo(&mut self, applier: &mut dyn HistoryApplier) -> Option<()> {
        let target = self.redo_cursor?;
        let mut items: Vec<&Entry> = self.entries.iter().filter(|e| e.id == -target).collect();
        items.sort_by_key(|e| e.order);
        let forwards: Vec<HistoryItem> = items
            .into_iter()
            .map(|e| applier.apply_inverse(&e.item))
            .collect();
        let new_id = self.progress_id;
        for (i, item) in forwards.into_iter().enumerate() {
            self.entries.push(Entry {
                id: new_id,
                order: i as i64,
                item,
            });
        }
        self.progress_id = new_id + 1;
        self.undo_cursor = new_id;
        self.redo_cursor = None;
        Some(())
    }

    /// Preserve the current redo tail as a fork and install a previously captured one in
    /// its place. `fork_id = None` selects the most recently captured
    /// fork.
    pub fn branch_fork(&mut self, fork_id: Option<i64>) -> Result<()> {
        let fork = match fork_id {
            Some(id) => self.branch.take(id),
            None => self.branch.pop_latest(),
        };
        let Some(fork) = fork else {
            return Err(BufferError::DatabaseCorrupted(
                "no branch fork available to swap in".to_string(),
            ));
        };
        let current_tail: Vec<Entry> = self.entries.iter().filter(|e| e.id < 0).cloned().collect();
        self.entries.retain(|e| e.id >= 0);
        let metadata = HistoryItem::BranchMetadata {
            prev_progress_id: self.progress_id,
            prev_redo_id: self.redo_cursor.unwrap_or(0),
            cursor: 0,
            order_stamp: self.progress_id,
        };
        self.branch.push(metadata, current_tail);
        self.entries.extend(fork.entries);
        self.redo_cursor = self.entries.iter().filter(|e| e.id < 0).map(|e| -e.id).max();
        Ok(())
    }

    /// Set the clamp to the current effective progress (host calls this after a save).
    pub fn set_clamp(&mut self) {
        self.clamp = Clamp::At(self.effective_progress());
    }

    /// The effective progress id: accounts for undo position (not simply `progress_id`,
    /// which only tracks the *next* id to assign).
    pub fn effective_progress(&self) -> i64 {
        self.undo_cursor + 1
    }

    /// `true` if the document has diverged from the clamped clean state.
    pub fn clamp_is_diff(&self) -> bool {
        !matches!(self.clamp, Clamp::At(c) if c == self.effective_progress())
    }

    /// Run the maximal-items trim if `progress_id` has grown past `maximal_items + chunk`.
    /// Deletes the oldest `chunk` ids from the log (and from any branch forks), then
    /// renumbers the rest downward so ids stay contiguous from 0.
    pub fn trim_maximal(&mut self) {
        let Some(maximal_items) = self.config.maximal_items else { return };
        let chunk = self.config.trim_chunk.max(1);
        if self.progress_id <= (maximal_items + chunk) as i64 {
            return;
        }
        let floor = chunk as i64;
        log::debug!("trimming {floor} oldest history ids (progress was {})", self.progress_id);
        self.entries.retain(|e| e.id.unsigned_abs() as i64 >= floor);
        for e in self.entries.iter_mut() {
            if e.id > 0 {
                e.id -= floor;
            } else if e.id < 0 {
                e.id += floor;
            }
        }
        self.progress_id -= floor;
        self.undo_cursor -= floor;
        if let Some(r) = self.redo_cursor {
            self.redo_cursor = Some(r - floor);
        }
        self.branch.drop_aged_out(floor);
        if let Clamp::At(c) = self.clamp {
            if c < floor {
                self.clamp = Clamp::LostToTrim;
            } else {
                self.clamp = Clamp::At(c - floor);
            }
        }
    }

    /// All entries currently filed under `id`, sorted by order. For tests and for hosts
    /// inspecting history without going through undo/redo.
    pub fn entries_at(&self, id: i64) -> Vec<&Entry> {
        let mut items: Vec<&Entry> = self.entries.iter().filter(|e| e.id == id).collect();
        items.sort_by_key(|e| e.order);
        items
    }

    /// A snapshot of everything needed to persist and later restore the log
    ///. Branch forks are not
    /// included — they're a review convenience, not durable state; a reload starts with an
    /// empty [`branch::BranchStore`].
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            entries: self.entries.clone(),
            progress_id: self.progress_id,
            undo_cursor: self.undo_cursor,
            redo_cursor: self.redo_cursor,
            clamp: self.clamp,
        }
    }

    /// Rebuild a history engine from a previously taken [`HistorySnapshot`].
    pub fn restore(config: HistoryConfig, snapshot: HistorySnapshot) -> Self {
        Self {
            config,
            entries: snapshot.entries,
            held: None,
            progress_id: snapshot.progress_id,
            undo_cursor: snapshot.undo_cursor,
            redo_cursor: snapshot.redo_cursor,
            locked: false,
            clamp: snapshot.clamp,
            branch: BranchStore::new(),
            unify_id: None,
            unify_order: 0,
        }
    }

    /// Total number of log entries currently retained.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the log (and held slot) are both empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.held.is_none()
    }
}

/// Scope guard returned by [`LocalHistory::unite`]. Dropping it ends the unification scope.
pub struct UniteGuard<'a> {
    history: &'a mut LocalHistory,
    owns_scope: bool,
}

impl Drop for UniteGuard<'_> {
    fn drop(&mut self) {
        if self.owns_scope {
            self.history.end_unite();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoInverter;
    impl HistoryApplier for EchoInverter {
        fn apply_inverse(&mut self, item: &HistoryItem) -> HistoryItem {
            item.clone()
        }
    }

    #[test]
    fn held_items_coalesce_on_contiguous_coord() {
        let mut h = LocalHistory::new(HistoryConfig::default());
        h.hold(HistoryItem::Remove {
            coord: vec![5],
            removed: vec![RemovedRun {
                content: "a".into(),
                end: crate::row::EndSlot::NotRemoved,
            }],
        });
        h.hold(HistoryItem::Remove {
            coord: vec![6],
            removed: vec![RemovedRun {
                content: "b".into(),
                end: crate::row::EndSlot::NotRemoved,
            }],
        });
        match h.held.as_ref().unwrap().item.clone() {
            HistoryItem::Remove { coord, .. } => assert_eq!(coord, vec![5, 6]),
            _ => panic!("expected coalesced Remove"),
        }
    }

    #[test]
    fn undo_then_redo_round_trips() {
        let mut h = LocalHistory::new(HistoryConfig::default());
        h.dump(HistoryItem::Cursor { cursor: 3 });
        let mut applier = EchoInverter;
        assert!(h.undo(&mut applier).is_some());
        assert!(h.redo(&mut applier).is_some());
        assert!(h.undo(&mut applier).is_some());
        assert!(h.undo(&mut applier).is_none());
    }

    #[test]
    fn new_write_past_undo_flushes_redo() {
        let mut h = LocalHistory::new(HistoryConfig::default());
        h.dump(HistoryItem::Cursor { cursor: 1 });
        let mut applier = EchoInverter;
        h.undo(&mut applier);
        assert!(h.redo_cursor.is_some());
        h.dump(HistoryItem::Cursor { cursor: 2 });
        assert!(h.redo_cursor.is_none());
        assert!(h.redo(&mut applier).is_none());
    }

    #[test]
    fn unite_shares_one_id() {
        let mut h = LocalHistory::new(HistoryConfig::default());
        {
            let guard = h.unite();
            guard.history.entries.push(Entry {
                id: guard.history.unify_id.unwrap(),
                order: guard.history.unify_order,
                item: HistoryItem::Cursor { cursor: 1 },
            });
        }
        assert_eq!(h.progress_id, 1);
    }

    #[test]
    fn undo_lock_blocks_mutation_until_release() {
        let mut h = LocalHistory::new(HistoryConfig {
            undo_lock: true,
            ..Default::default()
        });
        h.dump(HistoryItem::Cursor { cursor: 1 });
        let mut applier = EchoInverter;
        h.undo(&mut applier);
        assert!(h.assert_unlocked().is_err());
        h.lock_release();
        assert!(h.assert_unlocked().is_ok());
    }
}
