//! A restricted, in-memory view over a single swap chunk.
//!
//! Several operations need to look at (or briefly edit) one chunk without paying the cost
//! of a full `demand()`/`poll()` window reshuffle: `find` walking past the loaded window,
//! `EofMetas` measuring the bottom-most chunk, and the overflow sub-lines algorithm
//! consuming rows from swap. [`ChunkBuffer`] materializes one chunk's rows,
//! lets the caller read or mutate them, and on [`ChunkBuffer::commit`] either writes the
//! result back (re-dumping it under the same slot) or, if every row was consumed, lets the
//! chunk die (a chunk dies once the last row of the chunk is removed).

use crate::error::Result;
use crate::meta_index::{DocPoint, LocalSpan, Slot};
use crate::row::Row;
use crate::swap::{DumpRow, LoadedChunk, Side, Swap};

/// A materialized chunk, optionally read-only ("sandboxed").
pub struct ChunkBuffer {
    slot: Slot,
    start: DocPoint,
    rows: Vec<Row>,
    /// If `true`, [`ChunkBuffer::commit`] never writes back even if rows were mutated —
    /// used when the caller only wanted to measure or search the chunk (e.g.
    /// `EofMetas`/`find`).
    sandbox: bool,
    dirty: bool,
}

impl ChunkBuffer {
    /// Wrap a chunk popped from [`Swap`] via [`Swap::load_chunk`]/[`Swap::load_specific`].
    pub fn from_loaded(loaded: LoadedChunk, sandbox: bool) -> Self {
        let mut rows: Vec<Row> = loaded
            .rows
            .into_iter()
            .map(|d| {
                let mut r = Row::default_row();
                r.content = d.content;
                r.end = d.end;
                r
            })
            .collect();
        Self::index_rows(&mut rows, loaded.entry.start);
        Self {
            slot: loaded.entry.slot,
            start: loaded.entry.start,
            rows,
            sandbox,
            dirty: false,
        }
    }

    fn index_rows(rows: &mut [Row], start: DocPoint) {
        let mut point = start;
        for (i, row) in rows.iter_mut().enumerate() {
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
    }

    /// Read-only access to the chunk's rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Mutable access to the chunk's rows. Marks the chunk dirty; no-op for a sandboxed
    /// buffer beyond the mutation itself (it will simply not be persisted on commit).
    pub fn rows_mut(&mut self) -> &mut Vec<Row> {
        self.dirty = true;
        &mut self.rows
    }

    /// Remove and return the first row, shrinking the chunk (used by the overflow
    /// sub-lines algorithm consuming rows one at a time).
    pub fn take_first_row(&mut self) -> Option<Row> {
        if self.rows.is_empty() {
            return None;
        }
        self.dirty = true;
        Some(self.rows.remove(0))
    }

    /// `true` if every row has been consumed.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The chunk's slot.
    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Compute `(eof_data, eof_content, eof_row, eof_line)` as if this chunk were the end
    /// of the document — i.e. its own start point advanced by its current total span. Used
    /// by `EofMetas` when the bottom-most chunk is still in swap.
    pub fn indexing(&self) -> DocPoint {
        let span = LocalSpan {
            data: self.rows.iter().map(|r| r.data_len()).sum(),
            content: self.rows.iter().map(|r| r.content.chars().count()).sum(),
            n_rows: self.rows.len(),
            n_newlines: self.rows.iter().filter(|r| r.end.starts_new_line()).count(),
        };
        self.start.advance(span)
    }

    /// Finish working with the chunk: if it was mutated (and isn't sandboxed), re-dump it
    /// under a fresh slot on `side` and report the size delta so the caller can propagate
    /// it through `MetaIndex`. If every row was consumed, the chunk is left deleted (it was
    /// already popped out of the index by the `Swap::load_*` call that produced it) — this
    /// is chunk death.
    pub fn commit(self, swap: &mut Swap, side: Side) -> Result<Option<LocalSpan>> {
        if self.sandbox || !self.dirty {
            return Ok(None);
        }
        if self.rows.is_empty() {
            return Ok(None);
        }
        let dump: Vec<DumpRow> = self.rows.iter().map(DumpRow::from_row).collect();
        let new_span = LocalSpan {
            data: self.rows.iter().map(|r| r.data_len()).sum(),
            content: self.rows.iter().map(|r| r.content.chars().count()).sum(),
            n_rows: self.rows.len(),
            n_newlines: self.rows.iter().filter(|r| r.end.starts_new_line()).count(),
        };
        swap.dump_chunk(side, self.start, dump)?;
        Ok(Some(new_span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta_index::MetaIndexEntry;
    use crate::row::RowEnd;

    fn loaded(content: &[&str]) -> LoadedChunk {
        let rows: Vec<DumpRow> = content
            .iter()
            .map(|c| DumpRow {
                content: c.to_string(),
                end: RowEnd::Hard,
            })
            .collect();
        LoadedChunk {
            entry: MetaIndexEntry {
                slot: Slot(1),
                start: DocPoint::ZERO,
                n_rows: rows.len(),
                n_newlines: rows.len(),
            },
            rows,
        }
    }

    #[test]
    fn indexing_sums_span_from_start() {
        let cb = ChunkBuffer::from_loaded(loaded(&["ab", "cde"]), true);
        let end = cb.indexing();
        assert_eq!(end.data, 2 + 1 + 3 + 1);
        assert_eq!(end.row, 2);
    }

    #[test]
    fn take_first_row_shrinks_chunk() {
        let mut cb = ChunkBuffer::from_loaded(loaded(&["ab", "cde"]), false);
        let first = cb.take_first_row().unwrap();
        assert_eq!(first.content, "ab");
        assert_eq!(cb.rows().len(), 1);
    }
}
