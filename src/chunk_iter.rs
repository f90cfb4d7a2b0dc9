//! Cross-boundary iteration over a sorted coordinate list, under `MetaIndex` shadow mode.
//!
//! [`ChunkVisitor`] is a visitor trait (`chunk_enter`/`chunk_exit`/`coord_enter`/…) standing
//! in for what a closure-capturing generator would otherwise do. [`ChunkIter::rowwork`] is
//! the concrete entry point `TextBuffer::rowwork` uses: coordinates are
//! visited in reverse order (so earlier edits don't invalidate later coordinates' row
//! indices) while `MetaIndex` is in shadow mode, and the accumulated diffs commit once at
//! the end.
//!
//! This port's `rowwork` operates on the in-RAM window only — cross-chunk coordinates are
//! expected to already have been paged in by `Swap::demand` before a batch edit begins,
//! which keeps the shadow-commit pass a single, bounded operation instead of one that can
//! itself trigger further chunk loads mid-batch.

use crate::meta_index::{MetaIndex, PositionDiffArgs, PositionId};
use crate::row::{Row, WriteItem};

/// What a visitor wants to happen next after visiting one coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordSignal {
    /// Keep iterating.
    Continue,
    /// Stop iterating immediately.
    Break,
}

/// Visitor contract for a cross-chunk walk. Implementors only need the methods relevant to
/// their walk; all have no-op defaults.
pub trait ChunkVisitor {
    /// Called once per chunk boundary crossed, before any of its rows are visited.
    fn chunk_enter(&mut self) {}
    /// Called once per chunk boundary, after all its rows were visited.
    fn chunk_exit(&mut self) {}
    /// Called for each coordinate, with the row it resolved to. Returning
    /// [`CoordSignal::Break`] stops the walk.
    fn coord_enter(&mut self, coord: usize, row: &mut Row) -> CoordSignal;
}

/// Result of visiting one coordinate via [`ChunkIter::rowwork`].
#[derive(Debug)]
pub struct RowWorkResult {
    /// The coordinate (window row index) visited.
    pub coord: usize,
    /// What the worker returned for that row, if anything changed.
    pub outcome: Option<WriteItem>,
}

/// Drives a coordinate-list walk against the window under a [`MetaIndex`] shadow scope.
pub struct ChunkIter<'a> {
    index: &'a mut MetaIndex,
}

impl<'a> ChunkIter<'a> {
    /// Borrow the index this walk will shadow-adjust.
    pub fn new(index: &'a mut MetaIndex) -> Self {
        Self { index }
    }

    /// Visit `coords` (window-relative row indices) in descending order, calling `worker`
    /// once per coordinate that resolves to a live row. The whole walk runs under one
    /// `MetaIndex` shadow scope: each coordinate's `WriteItem::diff` is accumulated rather
    /// than propagated on the spot, and the batch's net size change is applied to every
    /// bottom chunk's start point in the single top-down pass `ShadowGuard::commit` does at
    /// the end — batched edits don't pay per-step propagation cost.
    pub fn rowwork(
        &mut self,
        window: &mut [Row],
        coords: &[usize],
        mut worker: impl FnMut(&mut Row, usize) -> Option<WriteItem>,
    ) -> Vec<RowWorkResult> {
        let bottom_len = self.index.bottom_len();
        let mut guard = self.index.begin_shadow();
        let mut sorted: Vec<usize> = coords.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.reverse();

        let mut results = Vec::with_capacity(sorted.len());
        let mut net_diff: i64 = 0;
        for coord in sorted {
            if let Some(row) = window.get_mut(coord) {
                let outcome = worker(row, coord);
                if let Some(item) = &outcome {
                    net_diff += item.diff as i64;
                }
                results.push(RowWorkResult { coord, outcome });
            }
        }
        if net_diff != 0 {
            let diff = PositionDiffArgs {
                data: net_diff,
                content: net_diff,
                row: 0,
                line: 0,
            };
            for i in 1..=bottom_len as i64 {
                guard.shadow_adjust(PositionId(i), diff);
            }
        }
        guard.commit();
        results
    }

    /// Visit `coords` through a [`ChunkVisitor`] instead of a bare closure, for callers
    /// that want `chunk_enter`/`chunk_exit` hooks around the coordinate walk. Since this
    /// port's window is a single contiguous chunk, `chunk_enter`/`chunk_exit` fire exactly
    /// once each, bracketing the whole walk.
    pub fn walk_with_visitor(&mut self, window: &mut [Row], coords: &[usize], visitor: &mut dyn ChunkVisitor) {
        let guard = self.index.begin_shadow();
        let mut sorted: Vec<usize> = coords.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.reverse();

        visitor.chunk_enter();
        for coord in sorted {
            if let Some(row) = window.get_mut(coord) {
                if visitor.coord_enter(coord, row) == CoordSignal::Break {
                    break;
                }
            }
        }
        visitor.chunk_exit();
        guard.commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta_index::{DocPoint, MetaIndexEntry, Slot};
    use crate::row::{EndSlot, Row, WriteItem};

    fn plain_row(c: &str) -> Row {
        let mut r = Row::default_row();
        r.content = c.to_string();
        r
    }

    fn bottom_entry(slot: u64, data_start: usize, n_rows: usize) -> MetaIndexEntry {
        MetaIndexEntry {
            slot: Slot(slot),
            start: DocPoint {
                data: data_start,
                content: data_start,
                row: 0,
                line: 0,
            },
            n_rows,
            n_newlines: n_rows,
        }
    }

    #[test]
    fn rowwork_shadow_adjusts_bottom_chunks_by_net_diff() {
        let mut index = MetaIndex::new();
        index.push_bottom(bottom_entry(1, 10, 2));
        index.push_bottom(bottom_entry(2, 20, 2));
        let mut window = vec![plain_row("ab")];
        let mut iter = ChunkIter::new(&mut index);
        iter.rowwork(&mut window, &[0], |_, _| {
            Some(WriteItem {
                write: 3,
                newlines: false,
                write_rows: None,
                begin: 0,
                work_row: 0,
                deleted: 0,
                removed: None,
                removed_end: EndSlot::NotRemoved,
                diff: 3,
                overflow: None,
            })
        });
        // `push_bottom` always inserts nearest-to-window at the front, so the
        // later-pushed entry (slot 2, started at data 20) is position 1.
        assert_eq!(index.entry_at(PositionId(1)).unwrap().start.data, 23);
        assert_eq!(index.entry_at(PositionId(2)).unwrap().start.data, 13);
    }

    #[test]
    fn rowwork_visits_in_descending_order() {
        let mut index = MetaIndex::new();
        let mut window = vec![plain_row("a"), plain_row("b"), plain_row("c")];
        let mut order = Vec::new();
        let mut iter = ChunkIter::new(&mut index);
        iter.rowwork(&mut window, &[0, 2, 1], |_, coord| {
            order.push(coord);
            None
        });
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn visitor_break_stops_early() {
        struct StopAtOne(Vec<usize>);
        impl ChunkVisitor for StopAtOne {
            fn coord_enter(&mut self, coord: usize, _row: &mut Row) -> CoordSignal {
                self.0.push(coord);
                if coord == 1 {
                    CoordSignal::Break
                } else {
                    CoordSignal::Continue
                }
            }
        }
        let mut index = MetaIndex::new();
        let mut window = vec![plain_row("a"), plain_row("b"), plain_row("c")];
        let mut visitor = StopAtOne(Vec::new());
        let mut iter = ChunkIter::new(&mut index);
        iter.walk_with_visitor(&mut window, &[0, 1, 2], &mut visitor);
        assert_eq!(visitor.0, vec![2, 1]);
    }
}
