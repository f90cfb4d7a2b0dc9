#![warn(missing_docs)]
//! buffer-core — a headless, swap-backed editable text buffer.
//!
//! # Overview
//!
//! This crate is the storage and editing kernel for a terminal text editor: a row/chunk
//! data model, a trimmer/swap paging engine that keeps only a bounded window of rows in
//! memory, and a local-history engine giving coalesced, branch-aware undo/redo. It does not
//! render anything — hosts read [`buffer::TextBuffer::window`] and drive edits through the
//! buffer's methods, wiring their own marker/cursor/highlighter callbacks through the
//! [`interfaces`] traits.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  TextBuffer (orchestration, history applier)  │  ← Public API
//! ├──────────────────┬───────────────┬────────────┤
//! │  LocalHistory     │  Trimmer      │  MetaIndex │  ← Bookkeeping
//! ├──────────────────┴───────────────┴────────────┤
//! │  Swap (chunk paging, SQLite-backed)            │  ← Persistence
//! ├─────────────────────────────────────────────────┤
//! │  Row / RowCursor                               │  ← Text storage
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use buffer_core::buffer::{TextBuffer, TextBufferConfig};
//!
//! let mut buffer = TextBuffer::new(TextBufferConfig::default());
//! buffer.write("hello, world").unwrap();
//! buffer.goto_data(0).unwrap();
//! ```

pub mod buffer;
pub mod chunk_buffer;
pub mod chunk_iter;
pub mod eof_metas;
pub mod error;
pub mod history;
pub mod interfaces;
pub mod meta_index;
pub mod row;
pub mod row_cursor;
pub mod search;
pub mod swap;
pub mod trimmer;
pub mod width;
pub mod wire;

pub use buffer::{RowPolicy, TextBuffer, TextBufferConfig};
pub use error::{BufferError, Result};
pub use history::{HistoryConfig, HistoryItem, LocalHistory};
pub use interfaces::{ChunkLoad, GlobCursorIF, HighlighterIF, MarkerIF, RangeEnd};
pub use meta_index::{DocPoint, MetaIndex, PositionId, Slot};
pub use row::{EndSlot, Row, RowEnd, WriteItem};
pub use swap::{Side, StorePath, Swap};
pub use trimmer::{Morph, Trimmer};
