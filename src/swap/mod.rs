//! Paging engine: a chunk store keyed by monotonic slot IDs, sitting behind the same
//! [`crate::meta_index::MetaIndex`] position algebra the buffer uses in RAM.
//!
//! The swap is a key-value store with two logical tables: a row store and a chunk index.
//! Here that's an embedded `rusqlite` connection (`bundled`, so no system SQLite install is
//! required). [`store`] owns the schema and connection; this module owns the slot allocator,
//! the [`MetaIndex`], and the auto-fill/poll policies that decide when to pull chunks back
//! into RAM.

pub mod store;

use crate::error::{BufferError, Result};
use crate::meta_index::{DocPoint, LocalSpan, MetaIndex, MetaIndexEntry, PositionId, Slot};
use crate::row::{Row, RowEnd};
use std::path::Path;

pub use store::StorePath;

/// Which side of the window a chunk sits on, or is being cut/loaded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Above the window (negative position IDs).
    Top,
    /// Below the window (positive position IDs).
    Bottom,
}

impl Side {
    fn code(self) -> i64 {
        match self {
            Side::Top => 0,
            Side::Bottom => 1,
        }
    }
}

/// A chunk's rows as persisted to / loaded from the store, independent of in-RAM [`Row`]
/// metadata (segments, cursor, autowrap regex — none of that survives a round trip).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRow {
    /// Row content.
    pub content: String,
    /// Row end marker.
    pub end: RowEnd,
}

impl DumpRow {
    /// Strip a live [`Row`] down to its persisted form.
    pub fn from_row(row: &Row) -> Self {
        Self {
            content: row.content.clone(),
            end: row.end,
        }
    }
}

/// A chunk popped out of the store: its rows plus the [`MetaIndexEntry`] it was filed
/// under.
#[derive(Debug, Clone)]
pub struct LoadedChunk {
    /// The chunk's metadata entry (slot, start point, local span).
    pub entry: MetaIndexEntry,
    /// The chunk's rows, in document order.
    pub rows: Vec<DumpRow>,
}

/// The paging engine. Owns the slot allocator, the on-disk connection, and the
/// [`MetaIndex`] tracking which slot sits at which position.
pub struct Swap {
    conn: store::StoreHandle,
    next_slot: u64,
    /// Chunk metadata. Public so [`crate::trimmer::Trimmer`] and
    /// [`crate::buffer::TextBuffer`] can read positions directly; all structural changes
    /// must go through [`Swap`]'s own methods so the on-disk store stays consistent.
    pub index: MetaIndex,
}

impl Swap {
    /// The underlying store handle, for callers that need to persist sibling state
    /// (history, main metas) into the same connection before a clone/export.
    pub fn store_handle(&self) -> &store::StoreHandle {
        &self.conn
    }

    /// Open (or create) a swap store at `path`.
    pub fn open(path: &StorePath) -> Result<Self> {
        let conn = store::open(path)?;
        let next_slot = store::max_slot(&conn)?.map(|s| s + 1).unwrap_or(1);
        let index = store::load_index(&conn)?;
        Ok(Self {
            conn,
            next_slot,
            index,
        })
    }

    /// Open an in-memory-only store (`:memory:`), never touching disk. Used by tests and
    /// by buffers with no swap paging configured.
    pub fn in_memory() -> Result<Self> {
        Self::open(&StorePath::Memory)
    }

    fn allocate_slot(&mut self) -> Slot {
        let slot = Slot(self.next_slot);
        self.next_slot += 1;
        slot
    }

    /// Persist `rows` as a new chunk on `side`, recording its [`MetaIndexEntry`].
    ///
    /// `start` is the chunk's absolute start point: for [`Side::Top`] this is the start
    /// point the loaded-out rows used to have; for [`Side::Bottom`] it is computed by the
    /// caller from the window's current end point (the buffer knows this, the swap does
    /// not track live window state).
    pub fn dump_chunk(&mut self, side: Side, start: DocPoint, rows: Vec<DumpRow>) -> Result<Slot> {
        let slot = self.allocate_slot();
        let n_rows = rows.len();
        let n_newlines = rows.iter().filter(|r| r.end.starts_new_line()).count();
        store::insert_rows(&self.conn, slot, &rows)?;
        let entry = MetaIndexEntry {
            slot,
            start,
            n_rows,
            n_newlines,
        };
        store::insert_index_entry(&self.conn, &entry)?;
        log::debug!("dumped {n_rows} rows to slot {} on {side:?}", slot.0);
        match side {
            Side::Top => self.index.push_top(entry),
            Side::Bottom => self.index.push_bottom(entry),
        }
        store::save_slot_map(&self.conn, &self.index)?;
        Ok(slot)
    }

    /// Pop the chunk adjacent to the window on `side`, deleting it from the store and
    /// removing its [`MetaIndexEntry`]. `None` if nothing is parked on that side.
    pub fn load_chunk(&mut self, side: Side) -> Result<Option<LoadedChunk>> {
        let entry = match side {
            Side::Top => self.index.pop_top(),
            Side::Bottom => self.index.pop_bottom(),
        };
        let Some(entry) = entry else { return Ok(None) };
        let rows = store::take_rows(&self.conn, entry.slot)?;
        store::delete_index_entry(&self.conn, entry.slot)?;
        store::save_slot_map(&self.conn, &self.index)?;
        log::debug!("loaded slot {} ({} rows) from {side:?}", entry.slot.0, rows.len());
        Ok(Some(LoadedChunk { entry, rows }))
    }

    /// Load the chunk at a specific, possibly non-adjacent, position. Rotates intervening
    /// chunks to the opposite side first, preserving Invariant 7.
    pub fn load_specific(&mut self, position: PositionId) -> Result<Option<LoadedChunk>> {
        if position == PositionId::WINDOW {
            return Ok(None);
        }
        let Some(entry) = self.index.entry_at(position) else {
            return Ok(None);
        };
        let Some(rotated) = self.index.rotate_to_adjacent(entry.slot) else {
            return Ok(None);
        };
        let side = if rotated.is_top() { Side::Top } else { Side::Bottom };
        store::save_slot_map(&self.conn, &self.index)?;
        self.load_chunk(side)
    }

    /// `true` if a chunk exists adjacent to the window on `side`.
    pub fn has_adjacent(&self, side: Side) -> bool {
        match side {
            Side::Top => self.index.top_len() > 0,
            Side::Bottom => self.index.bottom_len() > 0,
        }
    }

    /// Look up which position a slot currently occupies (`None` if it is the window or
    /// unknown).
    pub fn position_of(&self, slot: Slot) -> Option<PositionId> {
        self.index.position_of(slot)
    }

    /// Current adjacent ids, `(top_id, btm_id)`, for building a `ChunkLoad` descriptor.
    pub fn current_ids(&self) -> (i64, i64) {
        (self.index.top_id(), self.index.bottom_id())
    }

    /// Apply a span growth/shrink to every chunk below `from` (propagating Invariant 1
    /// downward after a bottom-side structural edit). No-op if no swap chunks exist.
    pub fn propagate_from(&mut self, from: PositionId, diff: LocalSpan, grows: bool) {
        self.index.adjust_by_position(from, diff, grows);
    }

    /// Clone this store (its rows, index, and slot map) to a new path, for
    /// `export_bufferdb`/clone-with-current-buffer. Does not touch `self`.
    pub fn clone_to(&self, dest: &StorePath) -> Result<()> {
        store::clone_store(&self.conn, dest)
    }

    /// Remove every row and index entry this swap owns, resetting the slot counter. Used
    /// by `reinitialize`.
    pub fn unlink(&mut self) -> Result<()> {
        store::clear_all(&self.conn)?;
        self.next_slot = 1;
        self.index = MetaIndex::new();
        Ok(())
    }

    /// Side effect free: resolve a filesystem path's existence, for `DatabaseFilesError`
    /// checks the buffer performs before opening a destination store.
    pub fn destination_is_free(path: impl AsRef<Path>) -> Result<()> {
        if path.as_ref().exists() {
            return Err(BufferError::DatabaseFiles(format!(
                "destination already exists: {}",
                path.as_ref().display()
            )));
        }
        Ok(())
    }
}
