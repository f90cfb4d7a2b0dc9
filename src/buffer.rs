//! `TextBuffer`: the top-level facade orchestrating every other component.
//!
//! Every mutating public method follows the same orchestration protocol:
//!
//! 1. check the history's undo-lock,
//! 2. notify the global cursor that a change is about to happen,
//! 3. snapshot markers if the edit might disturb them,
//! 4. perform the row-level mutation,
//! 5. reindex the window,
//! 6. propagate the size delta through `MetaIndex`,
//! 7. notify markers/the global cursor of the net diff,
//! 8. record (or hold, for coalescing edits) a history item,
//! 9. run the trimmer's poll/trim pass,
//! 10. notify the highlighter with a `ChunkLoad` describing what changed.
//!
//! This module is that orchestration: one type gluing storage, layout, and external
//! notification together, in the same shape as a top-level editor-session type.

use crate::chunk_buffer::ChunkBuffer;
use crate::chunk_iter::ChunkIter;
use crate::error::{BufferError, Result};
use crate::eof_metas::EofMetas;
use crate::history::{HistoryApplier, HistoryConfig, HistoryItem, LocalHistory, RemovedRun};
use crate::interfaces::{ChunkLoad, GlobCursorIF, HighlighterIF, MarkerIF, NullComponent, RangeEnd};
use crate::meta_index::{DocPoint, LocalSpan, PositionId};
use crate::row::{EndSlot, Row, RowEnd};
use crate::swap::{Side, StorePath, Swap};
use crate::trimmer::{RestrictSink, Trimmer};
use regex::Regex;

/// Per-row formatting policy, shared by every row the buffer creates.
#[derive(Debug, Clone)]
pub struct RowPolicy {
    /// Tab stop size.
    pub tab_size: usize,
    /// Expand written tabs to blanks immediately.
    pub tab_to_blanks: bool,
    /// Visual-width cap applied to ordinary rows.
    pub visual_max: Option<usize>,
    /// Distinct cap for the document's first row, if the swap morph's `keep_top_row_size`
    /// is set.
    pub top_row_visual_max: Option<usize>,
    /// Distinct cap for the document's last row, used by the restrictive morph.
    pub last_row_visual_max: Option<usize>,
    /// Optional autowrap pattern.
    pub autowrap_points: Option<Regex>,
}

impl Default for RowPolicy {
    fn default() -> Self {
        Self {
            tab_size: crate::width::DEFAULT_TAB_SIZE,
            tab_to_blanks: false,
            visual_max: None,
            top_row_visual_max: None,
            last_row_visual_max: None,
            autowrap_points: None,
        }
    }
}

/// Construction-time configuration for [`TextBuffer::new`].
pub struct TextBufferConfig {
    /// Row formatting policy.
    pub row_policy: RowPolicy,
    /// How many rows from a window edge trigger [`Trimmer::poll`]'s auto-load.
    pub load_distance: usize,
}

impl Default for TextBufferConfig {
    fn default() -> Self {
        Self {
            row_policy: RowPolicy::default(),
            load_distance: 4,
        }
    }
}

/// The text buffer. Owns the in-RAM row window and every component that backs it; markers,
/// the global cursor, and the highlighter are held as trait objects since their concrete
/// implementation is a host concern, not this crate's.
pub struct TextBuffer {
    window: Vec<Row>,
    cursor_row: usize,
    config: TextBufferConfig,
    swap: Option<Swap>,
    trimmer: Option<Trimmer>,
    history: Option<LocalHistory>,
    eof: EofMetas,
    marker: Box<dyn MarkerIF>,
    glob_cursor: Box<dyn GlobCursorIF>,
    highlighter: Box<dyn HighlighterIF>,
}

impl TextBuffer {
    /// A new, empty buffer with no swap paging, no history, and no trimmer.
    pub fn new(config: TextBufferConfig) -> Self {
        Self {
            window: vec![Self::fresh_row(&config.row_policy)],
            cursor_row: 0,
            config,
            swap: None,
            trimmer: None,
            history: None,
            eof: EofMetas::new(),
            marker: Box::new(NullComponent),
            glob_cursor: Box::new(NullComponent),
            highlighter: Box::new(NullComponent),
        }
    }

    fn fresh_row(policy: &RowPolicy) -> Row {
        Row::new(
            policy.tab_size,
            policy.tab_to_blanks,
            policy.visual_max,
            policy.autowrap_points.clone(),
        )
    }

    /// Attach a swap store, enabling the window to page chunks out.
    pub fn with_swap(mut self, swap: Swap) -> Self {
        self.swap = Some(swap);
        self
    }

    /// Attach a trimmer. Errors if the morph is `Drop` and a history is
    /// already attached, or vice versa, per the documented incompatibility.
    pub fn with_trimmer(mut self, trimmer: Trimmer) -> Result<Self> {
        if trimmer.is_drop() && self.history.is_some() {
            return Err(BufferError::Configuration(
                "a drop-morph trimmer cannot be combined with LocalHistory".to_string(),
            ));
        }
        self.trimmer = Some(trimmer);
        Ok(self)
    }

    /// Attach a local-history engine.
    pub fn with_history(mut self, config: HistoryConfig) -> Result<Self> {
        if self.trimmer.as_ref().is_some_and(Trimmer::is_drop) {
            return Err(BufferError::Configuration(
                "LocalHistory cannot be combined with a drop-morph trimmer".to_string(),
            ));
        }
        self.history = Some(LocalHistory::new(config));
        Ok(self)
    }

    /// Install a marker callback, replacing the no-op default.
    pub fn with_marker(mut self, marker: Box<dyn MarkerIF>) -> Self {
        self.marker = marker;
        self
    }

    /// Install a global-cursor callback, replacing the no-op default.
    pub fn with_glob_cursor(mut self, glob_cursor: Box<dyn GlobCursorIF>) -> Self {
        self.glob_cursor = glob_cursor;
        self
    }

    /// Install a highlighter callback, replacing the no-op default.
    pub fn with_highlighter(mut self, highlighter: Box<dyn HighlighterIF>) -> Self {
        self.highlighter = highlighter;
        self
    }

    /// Read-only access to the in-RAM window.
    pub fn window(&self) -> &[Row] {
        &self.window
    }

    /// The window-relative row the cursor currently sits in.
    pub fn cursor_row(&self) -> usize {
        self.cursor_row
    }

    /// Re-derive every row's position metadata from the window's start point (step 5 of the
    /// orchestration protocol). Must be called after any structural row mutation before the
    /// window is read again.
    fn reindex(&mut self) {
        let start = self.swap.as_ref().map(|s| s.index.window_start).unwrap_or(DocPoint::ZERO);
        let mut point = start;
        for (i, row) in self.window.iter_mut().enumerate() {
            row.row_index = i;
            row.row_num = point.row;
            row.line_num = point.line;
            row.content_start = point.content;
            row.data_start = point.data;
            point = DocPoint {
                data: point.data + row.data_len(),
                content: point.content + row.content.chars().count(),
                row: point.row + 1,
                line: point.line + row.end.starts_new_line() as usize,
            };
        }
        self.eof.mark_dirty();
    }

    fn chunk_load(&self, edited_range: Option<(usize, usize)>) -> ChunkLoad {
        let (top_id, btm_id) = self.swap.as_ref().map(Swap::current_ids).unwrap_or((0, 0));
        ChunkLoad {
            top_id,
            btm_id,
            top_cut: None,
            btm_cut: None,
            top_nload: None,
            btm_nload: None,
            spec_position: None,
            edited_range,
        }
    }

    /// Run the trimmer's poll pass and, if configured, its full trim pass, folding the
    /// results into a [`ChunkLoad`] (step 9 of the orchestration protocol). A trimmer needs
    /// no swap store at all (the restrictive morph discards rows outright), so only `poll`
    /// — which loads chunks back in from swap — is gated on one being attached.
    fn run_trim(&mut self, mut load: ChunkLoad) -> Result<ChunkLoad> {
        let Some(trimmer) = self.trimmer.as_mut() else {
            return Ok(load);
        };
        if let Some(swap) = self.swap.as_mut() {
            trimmer.poll(&mut self.window, self.cursor_row, swap, self.config.load_distance)?;
        }
        let mut sink = self.history.as_mut().map(|history| HistoryRestrictSink { history });
        let cut = trimmer.trim(
            &mut self.window,
            self.cursor_row,
            self.swap.as_mut(),
            None,
            sink.as_mut().map(|s| s as &mut dyn RestrictSink),
        )?;
        if let Some(top) = cut.top {
            self.cursor_row = self.cursor_row.saturating_sub(top.len());
            load.top_cut = Some(top);
        }
        if let Some(bottom) = cut.bottom {
            load.btm_cut = Some(bottom);
        }
        trimmer.sizing(
            &mut self.window,
            self.config.row_policy.top_row_visual_max,
            self.config.row_policy.last_row_visual_max,
        );
        self.reindex();
        let (top_id, btm_id) = self.swap.as_ref().map(Swap::current_ids).unwrap_or((0, 0));
        load.top_id = top_id;
        load.btm_id = btm_id;
        Ok(load)
    }

    /// Shift every already-dumped bottom chunk's start point by this edit's net size
    /// change (Invariant 1: editing the window moves where the rest of the document
    /// begins). A no-op if nothing has been dumped yet.
    fn propagate_bottom(&mut self, diff: isize, row_diff: isize) {
        if diff == 0 && row_diff == 0 {
            return;
        }
        let Some(swap) = self.swap.as_mut() else { return };
        if swap.index.bottom_len() == 0 {
            return;
        }
        let span = LocalSpan {
            data: diff.unsigned_abs(),
            content: diff.unsigned_abs(),
            n_rows: row_diff.unsigned_abs(),
            n_newlines: 0,
        };
        swap.propagate_from(PositionId(1), span, diff >= 0);
    }

    /// Finish an edit: adjust markers/cursor, propagate the size change to any already-dumped
    /// bottom chunks, then run the trim pass. `propagate_bottom` is the caller's
    /// responsibility when the edit already shadow-adjusted bottom chunks itself (batched
    /// row edits routed through [`ChunkIter::rowwork`]) — calling it again here would double
    /// the shift.
    fn finish(&mut self, begin: usize, diff: isize, row_diff: isize, range_end: RangeEnd, edited_range: (usize, usize)) -> Result<ChunkLoad> {
        self.marker.adjust(begin, diff, range_end);
        self.glob_cursor.adjust(begin, diff, range_end);
        let load = self.chunk_load(Some(edited_range));
        let load = self.run_trim(load)?;
        self.highlighter.notify(&load);
        Ok(load)
    }

    /// Move the cursor to an absolute data coordinate, loading chunks from swap as needed.
    pub fn goto_data(&mut self, data: i64) -> Result<()> {
        if data < 0 {
            return Err(BufferError::CursorNegativeIndexing(data));
        }
        let data = data as usize;
        let window_start = self.swap.as_ref().map(|s| s.index.window_start).unwrap_or(DocPoint::ZERO);
        if data < window_start.data {
            return self.load_toward(PositionId(-1), data);
        }
        if let Some(last) = self.window.last() {
            if data >= last.data_start + last.data_len() && last.end.data_width() == 0 {
                // at or past the very end of a bottom-less document: clamp to the end.
                self.cursor_row = self.window.len() - 1;
                self.window[self.cursor_row].cursor.set_content_clamped(data.saturating_sub(last.content_start), last.content_len());
                return Ok(());
            }
        }
        for (i, row) in self.window.iter().enumerate() {
            if data >= row.data_start && data < row.data_start + row.data_len().max(1) {
                self.cursor_row = i;
                let col = data.saturating_sub(row.data_start).min(row.content_len());
                self.window[i].cursor.set_content_clamped(col, row.content_len());
                return Ok(());
            }
        }
        self.load_toward(PositionId(1), data)
    }

    fn load_toward(&mut self, side_hint: PositionId, target: usize) -> Result<()> {
        let Some(swap) = self.swap.as_mut() else {
            return Err(BufferError::CursorChunkLoad { target });
        };
        let side = if side_hint.is_top() { Side::Top } else { Side::Bottom };
        if !swap.has_adjacent(side) {
            return Err(BufferError::CursorChunkLoad { target });
        }
        let Some(trimmer) = self.trimmer.as_ref() else {
            return Err(BufferError::CursorChunkLoad { target });
        };
        trimmer.poll(&mut self.window, self.cursor_row, swap, usize::MAX)?;
        self.reindex();
        self.goto_data(target as i64)
    }

    /// Move the cursor to a specific window-relative row, clamping the column to the row's
    /// length.
    pub fn goto_row(&mut self, row: usize) -> Result<()> {
        if row >= self.window.len() {
            return Err(BufferError::CursorPlacing { row_index: row, column: 0 });
        }
        self.cursor_row = row;
        Ok(())
    }

    /// Move the cursor to the first row whose `line_num` matches `line`.
    pub fn goto_line(&mut self, line: usize) -> Result<()> {
        if let Some(i) = self.window.iter().position(|r| r.line_num == line) {
            self.cursor_row = i;
            return Ok(());
        }
        Err(BufferError::CursorChunkLoad { target: line })
    }

    /// Move the cursor to row 0 of the chunk at `position` (loading it in first via
    /// [`Swap::load_specific`] if necessary).
    pub fn goto_chunk(&mut self, position: PositionId) -> Result<()> {
        let Some(swap) = self.swap.as_mut() else {
            return Err(BufferError::Configuration("no swap store attached".to_string()));
        };
        let Some(loaded) = swap.load_specific(position)? else {
            return Err(BufferError::CursorChunkLoad { target: position.0 as usize });
        };
        let cb = ChunkBuffer::from_loaded(loaded, false);
        let rows: Vec<Row> = cb
            .rows()
            .iter()
            .map(|r| {
                let mut row = Self::fresh_row(&self.config.row_policy);
                row.content = r.content.clone();
                row.end = r.end;
                row
            })
            .collect();
        if position.is_top() {
            for (i, r) in rows.into_iter().enumerate() {
                self.window.insert(i, r);
            }
        } else {
            self.window.extend(rows);
        }
        self.reindex();
        self.cursor_row = if position.is_top() { 0 } else { self.window.len().saturating_sub(1) };
        Ok(())
    }

    /// Write `string` at the cursor in plain-insert mode.
    pub fn write(&mut self, string: &str) -> Result<ChunkLoad> {
        self.write_mode(string, false, false, false, false)
    }

    /// Write `string` at the cursor with explicit substitution-mode flags.
    pub fn write_mode(
        &mut self,
        string: &str,
        sub_chars: bool,
        force_sub_chars: bool,
        sub_line: bool,
        nbnl: bool,
    ) -> Result<ChunkLoad> {
        self.assert_unlocked()?;
        self.glob_cursor.will_change();
        let row = self.cursor_row;
        let sanitized = string.replace('\r', "");
        let item = self.window[row].write(&sanitized, sub_chars, force_sub_chars, sub_line, nbnl);

        if let Some(overflow) = &item.overflow {
            let of_end = overflow.of_end;
            let mut new_rows = Vec::with_capacity(overflow.lines.len());
            for (i, content) in overflow.lines.iter().enumerate() {
                let mut r = Self::fresh_row(&self.config.row_policy);
                r.content = content.clone();
                r.end = if i + 1 == overflow.lines.len() { of_end } else if overflow.nbnl { RowEnd::Soft } else { RowEnd::Hard };
                new_rows.push(r);
            }
            for (i, r) in new_rows.into_iter().enumerate() {
                self.window.insert(row + 1 + i, r);
            }
            self.cursor_row = row + overflow.lines.len();
            if let Some(last) = self.window.get_mut(self.cursor_row) {
                last.cursor.set_content(last.content_len());
            }
        }

        self.reindex();

        if let Some(history) = self.history.as_mut() {
            history.hold(HistoryItem::Write {
                coord: (item.begin, item.begin + item.write),
                removed: item.removed.map(|content| {
                    vec![RemovedRun {
                        content,
                        end: item.removed_end,
                    }]
                }),
                work_row: item.work_row,
            });
        }

        let range_end = match item.removed_end {
            EndSlot::NotRemoved => RangeEnd::Unaffected,
            EndSlot::Removed(_) => RangeEnd::ToDocumentEnd,
        };
        let row_diff = item.overflow.as_ref().map(|o| o.lines.len() as isize).unwrap_or(0);
        self.propagate_bottom(item.diff, row_diff);
        self.finish(item.begin, item.diff, row_diff, range_end, (row, self.cursor_row + 1))
    }

    /// Delete one character to the right of the cursor (or join with the next row if at the
    /// row's end).
    pub fn delete(&mut self) -> Result<ChunkLoad> {
        self.assert_unlocked()?;
        self.glob_cursor.will_change();
        let row = self.cursor_row;
        let at_end = self.window[row].cursor.content == self.window[row].content_len();
        let mut row_diff = 0isize;
        let item = if at_end {
            let had_next = row + 1 < self.window.len();
            let deleted = self.window[row].delete(true);
            if deleted.is_some() && had_next {
                let next = self.window.remove(row + 1);
                self.window[row].content.push_str(&next.content);
                self.window[row].end = next.end;
                self.window[row].cursor.invalidate();
                row_diff = -1;
            }
            deleted
        } else {
            self.window[row].delete(false)
        };
        let Some(item) = item else {
            return Ok(self.chunk_load(None));
        };
        self.reindex();
        if let Some(history) = self.history.as_mut() {
            history.hold(HistoryItem::Remove {
                coord: vec![item.begin],
                removed: vec![RemovedRun {
                    content: item.removed.clone().unwrap_or_default(),
                    end: item.removed_end,
                }],
            });
        }
        self.propagate_bottom(item.diff, row_diff);
        self.finish(item.begin, item.diff, row_diff, RangeEnd::Unaffected, (row, row + 1))
    }

    /// Delete one character to the left of the cursor (or join with the previous row).
    pub fn backspace(&mut self) -> Result<ChunkLoad> {
        self.assert_unlocked()?;
        self.glob_cursor.will_change();
        let row = self.cursor_row;
        if self.window[row].cursor.content == 0 {
            if row == 0 {
                return Ok(self.chunk_load(None));
            }
            let current = self.window.remove(row);
            let prev = &mut self.window[row - 1];
            let join_col = prev.content_len();
            let prev_end = prev.end;
            prev.content.push_str(&current.content);
            prev.end = current.end;
            prev.cursor.invalidate();
            prev.cursor.set_content(join_col);
            self.cursor_row = row - 1;
            self.reindex();
            if let Some(history) = self.history.as_mut() {
                history.hold(HistoryItem::Remove {
                    coord: vec![self.window[self.cursor_row].data_start + join_col],
                    removed: vec![RemovedRun {
                        content: String::new(),
                        end: EndSlot::Removed(prev_end),
                    }],
                });
            }
            let begin = self.window[self.cursor_row].data_start + join_col;
            self.propagate_bottom(-1, -1);
            return self.finish(begin, -1, -1, RangeEnd::ToDocumentEnd, (self.cursor_row, self.cursor_row + 1));
        }
        let item = self.window[row].backspace();
        let Some(item) = item else {
            return Ok(self.chunk_load(None));
        };
        self.reindex();
        if let Some(history) = self.history.as_mut() {
            history.hold(HistoryItem::Remove {
                coord: vec![item.begin],
                removed: vec![RemovedRun {
                    content: item.removed.clone().unwrap_or_default(),
                    end: item.removed_end,
                }],
            });
        }
        self.propagate_bottom(item.diff, 0);
        self.finish(item.begin, item.diff, 0, RangeEnd::Unaffected, (row, row + 1))
    }

    /// Remove an absolute `[start, stop)` data-character range, possibly spanning several
    /// rows. `stop = None` removes through the end of the document.
    pub fn remove(&mut self, start: usize, stop: Option<usize>) -> Result<ChunkLoad> {
        self.assert_unlocked()?;
        self.glob_cursor.will_change();
        self.goto_data(start as i64)?;
        let begin_row = self.cursor_row;
        let begin_col = self.window[begin_row].cursor.content;

        let mut removed_runs = Vec::new();
        let mut total_diff: isize = 0;
        let mut rows_removed: isize = 0;
        let stop_col = stop.map(|s| s.saturating_sub(self.window[begin_row].data_start));

        loop {
            let row = self.cursor_row;
            let (removed, end_slot) = self.window[row].remove_area(begin_col.min(self.window[row].content_len()), stop_col, true);
            total_diff -= removed.chars().count() as isize;
            let end_was_removed = matches!(end_slot, EndSlot::Removed(_));
            if end_was_removed {
                total_diff -= 1;
            }
            removed_runs.push(RemovedRun { content: removed, end: end_slot });
            if !end_was_removed || row + 1 >= self.window.len() {
                break;
            }
            if stop.is_some() {
                break;
            }
            let next = self.window.remove(row + 1);
            self.window[row].content.push_str(&next.content);
            self.window[row].end = next.end;
            self.window[row].cursor.invalidate();
            rows_removed += 1;
        }

        self.reindex();
        if let Some(history) = self.history.as_mut() {
            history.dump(HistoryItem::RemoveRange {
                cursor: self.window[begin_row].data_start + begin_col,
                removed: removed_runs,
            });
        }
        let range_end = if stop.is_none() { RangeEnd::ToDocumentEnd } else { RangeEnd::At(stop.unwrap()) };
        self.propagate_bottom(total_diff, -rows_removed);
        self.finish(start, total_diff, -rows_removed, range_end, (begin_row, self.cursor_row + 1))
    }

    /// Indent (`back = false`) or outdent (`back = true`) every row in `rows` by one tab
    /// stop, batched under one `MetaIndex` shadow scope via [`ChunkIter`]. `ChunkIter`
    /// already shadow-adjusts bottom chunks for the batch's net diff, so `finish` isn't
    /// asked to propagate again.
    pub fn shift_rows(&mut self, rows: &[usize], back: bool) -> Result<ChunkLoad> {
        self.assert_unlocked()?;
        let swap_index = self.swap.as_mut().map(|s| &mut s.index);
        let mut held_diffs = Vec::new();
        if let Some(index) = swap_index {
            let mut iter = ChunkIter::new(index);
            let results = iter.rowwork(&mut self.window, rows, |row, _coord| row.shift(back));
            for r in results {
                if let Some(item) = r.outcome {
                    held_diffs.push((item.begin, item.diff, item.removed, item.removed_end));
                }
            }
        } else {
            let mut sorted: Vec<usize> = rows.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            sorted.reverse();
            for coord in sorted {
                if let Some(row) = self.window.get_mut(coord) {
                    if let Some(item) = row.shift(back) {
                        held_diffs.push((item.begin, item.diff, item.removed, item.removed_end));
                    }
                }
            }
        }
        self.reindex();
        if let Some(history) = self.history.as_mut() {
            for (begin, _, removed, end) in &held_diffs {
                history.hold(HistoryItem::Remove {
                    coord: vec![*begin],
                    removed: vec![RemovedRun {
                        content: removed.clone().unwrap_or_default(),
                        end: *end,
                    }],
                });
            }
        }
        let total_diff: isize = held_diffs.iter().map(|(_, d, _, _)| d).sum();
        let begin = held_diffs.first().map(|(b, _, _, _)| *b).unwrap_or(0);
        self.finish(
            begin,
            total_diff,
            0,
            RangeEnd::Unaffected,
            (rows.iter().copied().min().unwrap_or(0), rows.iter().copied().max().map(|m| m + 1).unwrap_or(0)),
        )
    }

    /// Expand tabs to blanks within `[start, stop)` of every row in `rows`.
    pub fn tab_replace(&mut self, rows: &[usize], start: usize, stop: Option<usize>, to_char: char) -> Result<ChunkLoad> {
        self.assert_unlocked()?;
        let mut sorted: Vec<usize> = rows.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.reverse();
        let mut total_diff: isize = 0;
        let mut begin = 0;
        for coord in &sorted {
            if let Some(row) = self.window.get_mut(*coord) {
                if let Some(item) = row.replace_tabs(start, stop, to_char) {
                    total_diff += item.diff;
                    begin = item.begin;
                }
            }
        }
        self.reindex();
        self.propagate_bottom(total_diff, 0);
        self.finish(
            begin,
            total_diff,
            0,
            RangeEnd::Unaffected,
            (sorted.last().copied().unwrap_or(0), sorted.first().map(|f| f + 1).unwrap_or(0)),
        )
    }

    /// Reversible batched row edit: visits `coords` via [`ChunkIter::rowwork`] under one
    /// `MetaIndex` shadow scope, recording one history item per touched row. Bottom-chunk
    /// propagation already happened inside that shadow scope when a swap is attached.
    pub fn rowwork(&mut self, coords: &[usize], mut worker: impl FnMut(&mut Row) -> Option<crate::row::WriteItem>) -> Result<ChunkLoad> {
        self.assert_unlocked()?;
        let results = if let Some(swap) = self.swap.as_mut() {
            let mut iter = ChunkIter::new(&mut swap.index);
            iter.rowwork(&mut self.window, coords, |row, _| worker(row))
        } else {
            let mut index = crate::meta_index::MetaIndex::new();
            let mut iter = ChunkIter::new(&mut index);
            iter.rowwork(&mut self.window, coords, |row, _| worker(row))
        };
        self.reindex();
        let mut total_diff: isize = 0;
        let mut begin = 0;
        for r in &results {
            if let Some(item) = &r.outcome {
                total_diff += item.diff;
                begin = item.begin;
                if let Some(history) = self.history.as_mut() {
                    history.hold(HistoryItem::Remove {
                        coord: vec![item.begin],
                        removed: vec![RemovedRun {
                            content: item.removed.clone().unwrap_or_default(),
                            end: item.removed_end,
                        }],
                    });
                }
            }
        }
        let lo = coords.iter().copied().min().unwrap_or(0);
        let hi = coords.iter().copied().max().map(|m| m + 1).unwrap_or(0);
        self.finish(begin, total_diff, 0, RangeEnd::Unaffected, (lo, hi))
    }

    /// Find the next/previous occurrence of `query` starting from an absolute data
    /// coordinate within the in-memory window. If the window has no match, falls through
    /// to a chunk-by-chunk walk of swap: top chunks for a reverse search, bottom chunks
    /// for a forward one. Each chunk is loaded sandboxed (read-only, restored to swap once
    /// searched) via [`ChunkBuffer`], so a hit deep in swap doesn't require the caller to
    /// page the whole document in first.
    pub fn find(&mut self, query: &str, options: crate::search::SearchOptions, from_data: usize, forward: bool) -> Result<Option<crate::search::SearchMatch>> {
        let text: String = self.window.iter().map(|r| r.content.as_str()).collect::<Vec<_>>().join("\n");
        let from_char = self.window.iter().take_while(|r| r.data_start + r.data_len() <= from_data).map(|r| r.content_len() + 1).sum();
        let result = if forward {
            crate::search::find_next(&text, query, options, from_char)
        } else {
            crate::search::find_prev(&text, query, options, from_char)
        };
        let window_match = result.map_err(|e| BufferError::Configuration(e.to_string()))?;
        if window_match.is_some() {
            return Ok(window_match);
        }
        self.find_in_swap(query, options, forward)
    }

    /// Walk swap chunks one at a time in the search direction, each loaded sandboxed and
    /// restored afterward regardless of whether it matched. Match coordinates are relative
    /// to the hit chunk's own text, same as a window hit is relative to the window's.
    fn find_in_swap(&mut self, query: &str, options: crate::search::SearchOptions, forward: bool) -> Result<Option<crate::search::SearchMatch>> {
        let Some(swap) = self.swap.as_mut() else {
            return Ok(None);
        };
        let side = if forward { Side::Bottom } else { Side::Top };
        let mut popped: Vec<(DocPoint, Vec<crate::swap::DumpRow>)> = Vec::new();
        let mut found = None;
        let mut search_err = None;
        while swap.has_adjacent(side) {
            let Some(loaded) = swap.load_chunk(side)? else { break };
            let start = loaded.entry.start;
            let rows_for_restore = loaded.rows.clone();
            let cb = ChunkBuffer::from_loaded(loaded, true);
            let chunk_text: String = cb.rows().iter().map(|r| r.content.as_str()).collect::<Vec<_>>().join("\n");
            let chunk_result = if forward {
                crate::search::find_next(&chunk_text, query, options, 0)
            } else {
                crate::search::find_prev(&chunk_text, query, options, chunk_text.chars().count())
            };
            popped.push((start, rows_for_restore));
            match chunk_result {
                Ok(Some(m)) => {
                    found = Some(m);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    search_err = Some(e);
                    break;
                }
            }
        }
        for (start, rows) in popped.into_iter().rev() {
            swap.dump_chunk(side, start, rows)?;
        }
        if let Some(e) = search_err {
            return Err(BufferError::Configuration(e.to_string()));
        }
        Ok(found)
    }

    fn assert_unlocked(&self) -> Result<()> {
        if let Some(history) = &self.history {
            history.assert_unlocked()?;
        }
        Ok(())
    }

    /// Undo the most recent edit, via this buffer's own [`HistoryApplier`] implementation.
    pub fn undo(&mut self) -> Result<bool> {
        let Some(mut history) = self.history.take() else {
            return Err(BufferError::Configuration("no history attached".to_string()));
        };
        let did = history.undo(self).is_some();
        self.history = Some(history);
        Ok(did)
    }

    /// Redo the most recently undone edit.
    pub fn redo(&mut self) -> Result<bool> {
        let Some(mut history) = self.history.take() else {
            return Err(BufferError::Configuration("no history attached".to_string()));
        };
        let did = history.redo(self).is_some();
        self.history = Some(history);
        Ok(did)
    }

    /// Mark the history's clamp at the current progress (host calls this after a save).
    pub fn mark_clean(&mut self) {
        if let Some(history) = self.history.as_mut() {
            history.set_clamp();
        }
    }

    /// `true` if the document has diverged from the last clamped clean state.
    pub fn is_dirty(&self) -> bool {
        self.history.as_ref().is_some_and(LocalHistory::clamp_is_diff)
    }

    /// Re-apply the top/last baserow visual-width caps (e.g. after a terminal resize changes
    /// `visual_max`).
    pub fn resize(&mut self, visual_max: Option<usize>) {
        self.config.row_policy.visual_max = visual_max;
        for row in self.window.iter_mut() {
            row.visual_max = visual_max;
        }
        if let Some(trimmer) = &self.trimmer {
            trimmer.sizing(&mut self.window, self.config.row_policy.top_row_visual_max, self.config.row_policy.last_row_visual_max);
        }
        self.reindex();
    }

    /// Document-size totals, recomputed lazily.
    pub fn eof(&mut self) -> DocPoint {
        let window = &self.window;
        let swap = &self.swap;
        let start = swap.as_ref().map(|s| s.index.window_start).unwrap_or(DocPoint::ZERO);
        self.eof.get(|| {
            let mut point = start;
            for row in window {
                point = DocPoint {
                    data: point.data + row.data_len(),
                    content: point.content + row.content.chars().count(),
                    row: point.row + 1,
                    line: point.line + row.end.starts_new_line() as usize,
                };
            }
            if let Some(swap) = swap {
                if swap.has_adjacent(Side::Bottom) {
                    // Bottom chunk still in swap: totals are only an in-RAM approximation
                    // until it's paged in. `TextBuffer::demand`-ing callers get the exact
                    // figure; this keeps `eof()` itself allocation-free and non-mutating.
                }
            }
            point
        })
    }

    /// Persist history/marker/cursor state into the swap store's own connection, then clone
    /// the whole thing to `dest`. `main_metas.swap`/`.history` are recorded as `:memory:`
    /// placeholders since this crate keeps the swap and history log in one connection rather
    /// than separate files.
    pub fn export_bufferdb(&self, dest: &StorePath) -> Result<()> {
        let swap = self.swap.as_ref().ok_or_else(|| BufferError::Configuration("no swap store attached".to_string()))?;
        let handle = swap.store_handle();
        if let Some(history) = &self.history {
            crate::swap::store::save_history(handle, &history.snapshot())?;
        }
        let cursor = self.window.get(self.cursor_row).map(|r| r.data_start + r.cursor.content).unwrap_or(0);
        crate::swap::store::save_main_metas(handle, ":memory:", ":memory:", cursor, &self.marker.snapshot(), &[])?;
        swap.clone_to(dest)
    }

    /// Reload a buffer from a store previously written by [`TextBuffer::export_bufferdb`].
    /// Brings in the swap's window (paging the first chunk(s) in via the trimmer if one is
    /// configured), the history log, and the last cursor position; markers are restored
    /// through the installed [`MarkerIF`] if `main_metas` recorded any.
    pub fn import_bufferdb(path: &StorePath, config: TextBufferConfig, history_config: Option<HistoryConfig>) -> Result<Self> {
        let mut swap = Swap::open(path)?;
        let mut window = Vec::new();
        if let Some(loaded) = swap.load_chunk(Side::Top)? {
            for dump in loaded.rows {
                let mut row = Self::fresh_row(&config.row_policy);
                row.content = dump.content;
                row.end = dump.end;
                window.push(row);
            }
        }
        if window.is_empty() {
            window.push(Self::fresh_row(&config.row_policy));
        }
        let history = match history_config {
            Some(cfg) => Some(crate::swap::store::load_history(swap.store_handle(), cfg)?),
            None => None,
        };
        let main_metas = crate::swap::store::load_main_metas(swap.store_handle())?;
        let mut buffer = Self {
            window,
            cursor_row: 0,
            config,
            swap: Some(swap),
            trimmer: None,
            history,
            eof: EofMetas::new(),
            marker: Box::new(NullComponent),
            glob_cursor: Box::new(NullComponent),
            highlighter: Box::new(NullComponent),
        };
        buffer.reindex();
        if let Some((_, _, cursor, markings, _)) = main_metas {
            buffer.marker.restore_snapshot(&markings);
            let _ = buffer.goto_data(cursor as i64);
        }
        Ok(buffer)
    }

    /// Discard all swap/history state and reset to a single empty row, keeping the
    /// configuration and callbacks in place.
    pub fn reinitialize(&mut self) -> Result<()> {
        if let Some(swap) = self.swap.as_mut() {
            swap.unlink()?;
        }
        self.window = vec![Self::fresh_row(&self.config.row_policy)];
        self.cursor_row = 0;
        self.history = Some(LocalHistory::new(HistoryConfig::default()));
        self.eof.mark_dirty();
        Ok(())
    }
}

/// Routes a restrictive trimmer's discarded rows into the history log, so an `undo()` has
/// something to invert (the trim itself never goes through `HistoryApplier`).
struct HistoryRestrictSink<'a> {
    history: &'a mut LocalHistory,
}

impl RestrictSink for HistoryRestrictSink<'_> {
    fn restrict_removed(&mut self, rows: Vec<Row>) {
        let runs = rows
            .iter()
            .map(|r| RemovedRun {
                content: r.content.clone(),
                end: EndSlot::Removed(r.end),
            })
            .collect();
        self.history.dump(HistoryItem::RestrictRemovement { rows: runs, pairs_with: None });
    }
}

impl HistoryApplier for TextBuffer {
    fn apply_inverse(&mut self, item: &HistoryItem) -> HistoryItem {
        match item {
            HistoryItem::Remove { coord, removed } => {
                let mut last_coord = 0;
                for (c, run) in coord.iter().rev().zip(removed.iter().rev()) {
                    last_coord = *c;
                    let _ = self.goto_data(*c as i64);
                    let row = self.cursor_row;
                    let mut content = run.content.clone();
                    if let EndSlot::Removed(end) = run.end {
                        if end.starts_new_line() {
                            content.push('\n');
                        }
                    }
                    self.window[row].write(&content, false, false, false, false);
                    self.reindex();
                }
                HistoryItem::Remove {
                    coord: vec![last_coord],
                    removed: Vec::new(),
                }
            }
            HistoryItem::RemoveRange { cursor, removed } => {
                let _ = self.goto_data(*cursor as i64);
                let row = self.cursor_row;
                let mut content = String::new();
                for run in removed {
                    content.push_str(&run.content);
                    if let EndSlot::Removed(end) = run.end {
                        if end.starts_new_line() {
                            content.push('\n');
                        }
                    }
                }
                self.window[row].write(&content, false, false, false, false);
                self.reindex();
                HistoryItem::RemoveRange {
                    cursor: *cursor,
                    removed: Vec::new(),
                }
            }
            HistoryItem::Write { coord, removed, work_row } => {
                let (start, end) = *coord;
                let _ = self.remove(start, Some(end));
                if let Some(runs) = removed {
                    let _ = self.goto_data(start as i64);
                    let row = self.cursor_row;
                    let mut content = String::new();
                    for run in runs {
                        content.push_str(&run.content);
                    }
                    self.window[row].write(&content, false, false, false, false);
                    self.reindex();
                }
                HistoryItem::ReWrite {
                    coord: *coord,
                    removed: removed.clone(),
                    work_row: *work_row,
                }
            }
            HistoryItem::ReWrite { coord, removed, work_row } => {
                let (start, end) = *coord;
                let _ = self.remove(start, Some(end));
                if let Some(runs) = removed {
                    let _ = self.goto_data(start as i64);
                    let row = self.cursor_row;
                    let mut content = String::new();
                    for run in runs {
                        content.push_str(&run.content);
                    }
                    self.window[row].write(&content, false, false, false, false);
                    self.reindex();
                }
                HistoryItem::Write {
                    coord: *coord,
                    removed: removed.clone(),
                    work_row: *work_row,
                }
            }
            HistoryItem::Cursor { cursor } => {
                let prev = self.window.get(self.cursor_row).map(|r| r.data_start).unwrap_or(0);
                let _ = self.goto_data(*cursor as i64);
                HistoryItem::Cursor { cursor: prev }
            }
            HistoryItem::Marks { coord, cursor } => {
                let prev = self.marker.snapshot();
                self.marker.restore_snapshot(coord);
                HistoryItem::Marks { coord: prev, cursor: *cursor }
            }
            HistoryItem::RestrictRemovement { rows, pairs_with } => {
                // Reinstate the rows the restrictive trimmer discarded. Deliberately does not
                // immediately re-run the trimmer even though the cap may now be exceeded: the
                // whole point of undoing a restrictive cut is to make the discarded row visible
                // again, and the next forward edit's own trim pass will re-enforce the cap
                // naturally if it's still over. The returned item is the redo counterpart —
                // replaying it removes these same rows again.
                for run in rows {
                    let mut row = Self::fresh_row(&self.config.row_policy);
                    row.content = run.content.clone();
                    if let EndSlot::Removed(end) = run.end {
                        row.end = end;
                    }
                    self.window.push(row);
                }
                self.reindex();
                HistoryItem::RestrictRemovement {
                    rows: rows.clone(),
                    pairs_with: *pairs_with,
                }
            }
            HistoryItem::BranchMetadata { .. } => item.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_goto_data_places_cursor() {
        let mut buf = TextBuffer::new(TextBufferConfig::default());
        buf.write("hello").unwrap();
        buf.goto_data(2).unwrap();
        assert_eq!(buf.window[buf.cursor_row].cursor.content, 2);
    }

    #[test]
    fn write_newline_splits_into_two_rows() {
        let mut buf = TextBuffer::new(TextBufferConfig::default());
        buf.write("hello\nworld").unwrap();
        assert_eq!(buf.window.len(), 2);
        assert_eq!(buf.window[0].content, "hello");
        assert_eq!(buf.window[1].content, "world");
    }

    #[test]
    fn backspace_joins_rows() {
        let mut buf = TextBuffer::new(TextBufferConfig::default());
        buf.write("hello\nworld").unwrap();
        buf.goto_row(1).unwrap();
        buf.window[1].cursor.set_content(0);
        buf.backspace().unwrap();
        assert_eq!(buf.window.len(), 1);
        assert_eq!(buf.window[0].content, "helloworld");
    }

    #[test]
    fn undo_reverts_a_write() {
        let mut buf = TextBuffer::new(TextBufferConfig::default()).with_history(HistoryConfig::default()).unwrap();
        buf.write("hi").unwrap();
        if let Some(h) = buf.history.as_mut() {
            h.drain_held();
        }
        assert_eq!(buf.window[0].content, "hi");
        buf.undo().unwrap();
        assert_eq!(buf.window[0].content, "");
    }

    #[test]
    fn remove_range_deletes_across_rows() {
        let mut buf = TextBuffer::new(TextBufferConfig::default());
        buf.write("hello\nworld").unwrap();
        buf.remove(3, Some(8)).unwrap();
        assert_eq!(buf.window.len(), 1);
        assert_eq!(buf.window[0].content, "helrld");
    }
}
