//! Error taxonomy for the buffer core.
//!
//! Every distinct failure kind named by the buffer's design is its own [`BufferError`]
//! variant. Propagation policy (which errors are recovered at the boundary vs. re-raised
//! vs. fail fast) lives with the call sites that raise them, not here; see each variant's
//! doc comment for the recovery it expects.

use crate::meta_index::Slot;
use thiserror::Error;

/// Errors raised by the buffer core.
#[derive(Debug, Error)]
pub enum BufferError {
    /// Invalid composition of components (e.g. a `drop` trimmer paired with a
    /// [`crate::history::LocalHistory`], or a `:swap:` history path with no swap configured).
    /// Not recovered: indicates a caller bug, fails fast.
    #[error("invalid buffer configuration: {0}")]
    Configuration(String),

    /// `goto_*` target lies outside the loaded window and the required side has no chunks
    /// left to load. The cursor is left at its pre-call position.
    #[error("cursor target {target} is outside the loaded window and no chunk exists on that side")]
    CursorChunkLoad {
        /// The absolute coordinate that could not be reached.
        target: usize,
    },

    /// Chunks exist on the required side but their metadata disagrees with the request.
    /// Recovered by loading the nearest chunk and parking the cursor at its row 0.
    #[error("chunk metadata inconsistent while seeking toward {target}; parked at slot {nearest_slot:?}")]
    CursorChunkMeta {
        /// The absolute coordinate that was being sought.
        target: usize,
        /// The slot the cursor was parked at as a result.
        nearest_slot: Slot,
    },

    /// Final in-row placement failed (requested column exceeds row content). Recovered by
    /// placing the cursor as far as the row allows.
    #[error("cursor placement in row {row_index} failed for column {column}")]
    CursorPlacing {
        /// Row index placement was attempted in.
        row_index: usize,
        /// Requested in-row column.
        column: usize,
    },

    /// A negative coordinate was passed to a `goto_*` call. Not recovered: fails fast.
    #[error("negative cursor index: {0}")]
    CursorNegativeIndexing(i64),

    /// The destination file for a new store already exists (or the source file for an
    /// import does not exist). Propagates unchanged from construction.
    #[error("database file error: {0}")]
    DatabaseFiles(String),

    /// The store's on-disk schema conflicts with the schema this crate expects.
    /// Propagates unchanged from construction.
    #[error("database table error: {0}")]
    DatabaseTable(String),

    /// Data read back from the store violates an invariant during replay. Fatal; the
    /// caller must recover (e.g. reinitialize from a known-good backup).
    #[error("database corrupted: {0}")]
    DatabaseCorrupted(String),

    /// A mutating call was made while the undo-lock is engaged. Not recovered: fails fast;
    /// the caller must call `lock_release()` first.
    #[error("buffer is undo-locked; call lock_release() before mutating")]
    UndoLocked,

    /// Underlying SQLite error from the embedded store.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Underlying I/O error (e.g. resolving a `file:` URI, cloning a swap file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BufferError>;
