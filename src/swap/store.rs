//! The `rusqlite` connection and schema backing [`super::Swap`].
//!
//! `StoreHandle` is a single connection shared behind a lock, not a pool: `rusqlite::Connection`
//! is `Send` but not `Sync`, and only a locked cursor is needed here, not real parallel access.

use crate::error::{BufferError, Result};
use crate::history::{Clamp, Entry, HistoryConfig, HistoryItem, HistorySnapshot, LocalHistory, RemovedRun};
use crate::meta_index::{DocPoint, MetaIndex, MetaIndexEntry, Slot};
use crate::row::RowEnd;
use crate::swap::DumpRow;
use crate::wire::{self, WireValue};
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// A shared, lockable connection handle. Cloning shares the same underlying connection.
pub type StoreHandle = Arc<Mutex<Connection>>;

/// The three pseudo-paths names, plus an arbitrary filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorePath {
    /// `:memory:` — store in RAM, never touches disk.
    Memory,
    /// `:swap:` — co-locate with the swap store (resolved by the caller to that store's
    /// path before reaching here).
    CoSwap,
    /// `:history:` — co-locate with the history store (same resolution note).
    CoHistory,
    /// An explicit filesystem path.
    File(PathBuf),
}

impl StorePath {
    fn sqlite_target(&self) -> Result<String> {
        match self {
            StorePath::Memory => Ok(":memory:".to_string()),
            StorePath::File(p) => Ok(p.to_string_lossy().into_owned()),
            StorePath::CoSwap | StorePath::CoHistory => Err(BufferError::Configuration(
                "pseudo-path :swap:/:history: must be resolved to a concrete path by the caller before opening"
                    .to_string(),
            )),
        }
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS swap_chunk_index (
    slot INTEGER PRIMARY KEY,
    start_data INTEGER NOT NULL,
    start_content INTEGER NOT NULL,
    start_row INTEGER NOT NULL,
    start_line INTEGER NOT NULL,
    nrows INTEGER NOT NULL,
    nnl INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS swap_rows (
    slot INTEGER NOT NULL,
    seq INTEGER NOT NULL,
    content TEXT NOT NULL,
    end INTEGER NOT NULL,
    PRIMARY KEY (slot, seq)
);
CREATE INDEX IF NOT EXISTS swap_rows_slot ON swap_rows(slot);
CREATE TABLE IF NOT EXISTS swap_metas (
    id INTEGER PRIMARY KEY,
    cur_ids_text TEXT,
    slot_count INTEGER,
    slot_index_key INTEGER,
    slot_index_val INTEGER
);
CREATE TABLE IF NOT EXISTS local_history (
    id_ INTEGER NOT NULL,
    type_ INTEGER NOT NULL,
    typeval INTEGER NOT NULL,
    work_row INTEGER,
    coord BLOB,
    removed BLOB,
    restrict_removed BLOB,
    cursor INTEGER,
    order_ INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS local_history_branch (
    fork_id INTEGER NOT NULL,
    id_ INTEGER NOT NULL,
    type_ INTEGER NOT NULL,
    typeval INTEGER NOT NULL,
    work_row INTEGER,
    coord BLOB,
    removed BLOB,
    restrict_removed BLOB,
    cursor INTEGER,
    order_ INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS local_history_metas (
    undo_id INTEGER,
    fork_id INTEGER
);
CREATE TABLE IF NOT EXISTS main_metas (
    swap TEXT,
    history TEXT,
    marker BLOB,
    markings BLOB,
    cursor INTEGER,
    anchors BLOB
);
";

/// Open a store at `path`, creating the schema if absent.
pub fn open(path: &StorePath) -> Result<StoreHandle> {
    let target = path.sqlite_target()?;
    if let StorePath::File(p) = path {
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(BufferError::DatabaseFiles(format!(
                    "parent directory does not exist: {}",
                    parent.display()
                )));
            }
        }
    }
    let conn = Connection::open(&target).map_err(BufferError::Store)?;
    conn.execute_batch(SCHEMA).map_err(BufferError::Store)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Highest slot id currently stored, if any.
pub fn max_slot(handle: &StoreHandle) -> Result<Option<u64>> {
    let conn = handle.lock().expect("store mutex poisoned");
    let v: Option<i64> = conn
        .query_row("SELECT MAX(slot) FROM swap_chunk_index", [], |r| r.get(0))
        .map_err(BufferError::Store)?;
    Ok(v.map(|v| v as u64))
}

/// Rebuild the in-RAM [`MetaIndex`] from the persisted chunk index and slot map.
pub fn load_index(handle: &StoreHandle) -> Result<MetaIndex> {
    let conn = handle.lock().expect("store mutex poisoned");
    let mut index = MetaIndex::new();
    let mut stmt = conn
        .prepare("SELECT slot_index_key, slot_index_val FROM swap_metas WHERE slot_index_key IS NOT NULL ORDER BY id")
        .map_err(BufferError::Store)?;
    let mut rows = stmt.query([]).map_err(BufferError::Store)?;

    let mut top_slots = Vec::new();
    let mut bottom_slots = Vec::new();
    while let Some(row) = rows.next().map_err(BufferError::Store)? {
        let slot: i64 = row.get(0).map_err(BufferError::Store)?;
        let position: i64 = row.get(1).map_err(BufferError::Store)?;
        if position < 0 {
            top_slots.push((position, Slot(slot as u64)));
        } else if position > 0 {
            bottom_slots.push((position, Slot(slot as u64)));
        }
    }
    top_slots.sort_by_key(|(p, _)| std::cmp::Reverse(*p));
    bottom_slots.sort_by_key(|(p, _)| std::cmp::Reverse(*p));

    for (_, slot) in top_slots {
        if let Some(entry) = read_entry(&conn, slot)? {
            index.push_top(entry);
        }
    }
    for (_, slot) in bottom_slots {
        if let Some(entry) = read_entry(&conn, slot)? {
            index.push_bottom(entry);
        }
    }
    Ok(index)
}

fn read_entry(conn: &Connection, slot: Slot) -> Result<Option<MetaIndexEntry>> {
    conn.query_row(
        "SELECT start_data, start_content, start_row, start_line, nrows, nnl
         FROM swap_chunk_index WHERE slot = ?1",
        params![slot.0 as i64],
        |r| {
            Ok(MetaIndexEntry {
                slot,
                start: DocPoint {
                    data: r.get::<_, i64>(0)? as usize,
                    content: r.get::<_, i64>(1)? as usize,
                    row: r.get::<_, i64>(2)? as usize,
                    line: r.get::<_, i64>(3)? as usize,
                },
                n_rows: r.get::<_, i64>(4)? as usize,
                n_newlines: r.get::<_, i64>(5)? as usize,
            })
        },
    )
    .map(Some)
    .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(BufferError::Store(e)) })
}

/// Persist a chunk's rows under `slot`, in order.
pub fn insert_rows(handle: &StoreHandle, slot: Slot, rows: &[DumpRow]) -> Result<()> {
    let conn = handle.lock().expect("store mutex poisoned");
    for (seq, row) in rows.iter().enumerate() {
        conn.execute(
            "INSERT INTO swap_rows (slot, seq, content, end) VALUES (?1, ?2, ?3, ?4)",
            params![slot.0 as i64, seq as i64, row.content, row.end.code() as i64],
        )
        .map_err(BufferError::Store)?;
    }
    Ok(())
}

/// Take (read and delete) a chunk's rows, in order.
pub fn take_rows(handle: &StoreHandle, slot: Slot) -> Result<Vec<DumpRow>> {
    let conn = handle.lock().expect("store mutex poisoned");
    let mut stmt = conn
        .prepare("SELECT content, end FROM swap_rows WHERE slot = ?1 ORDER BY seq")
        .map_err(BufferError::Store)?;
    let rows = stmt
        .query_map(params![slot.0 as i64], |r| {
            let end_code: i64 = r.get(1)?;
            Ok(DumpRow {
                content: r.get(0)?,
                end: RowEnd::from_code(end_code as u8),
            })
        })
        .map_err(BufferError::Store)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(BufferError::Store)?;
    conn.execute("DELETE FROM swap_rows WHERE slot = ?1", params![slot.0 as i64])
        .map_err(BufferError::Store)?;
    Ok(rows)
}

/// Persist a chunk's index entry.
pub fn insert_index_entry(handle: &StoreHandle, entry: &MetaIndexEntry) -> Result<()> {
    let conn = handle.lock().expect("store mutex poisoned");
    conn.execute(
        "INSERT INTO swap_chunk_index (slot, start_data, start_content, start_row, start_line, nrows, nnl)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.slot.0 as i64,
            entry.start.data as i64,
            entry.start.content as i64,
            entry.start.row as i64,
            entry.start.line as i64,
            entry.n_rows as i64,
            entry.n_newlines as i64,
        ],
    )
    .map_err(BufferError::Store)?;
    Ok(())
}

/// Delete a chunk's index entry (its rows must already have been taken).
pub fn delete_index_entry(handle: &StoreHandle, slot: Slot) -> Result<()> {
    let conn = handle.lock().expect("store mutex poisoned");
    conn.execute("DELETE FROM swap_chunk_index WHERE slot = ?1", params![slot.0 as i64])
        .map_err(BufferError::Store)?;
    Ok(())
}

/// Rewrite the persisted slot map (`swap_metas`) from the in-RAM [`MetaIndex`].
pub fn save_slot_map(handle: &StoreHandle, index: &MetaIndex) -> Result<()> {
    let conn = handle.lock().expect("store mutex poisoned");
    conn.execute("DELETE FROM swap_metas", []).map_err(BufferError::Store)?;
    conn.execute(
        "INSERT INTO swap_metas (id, cur_ids_text, slot_count) VALUES (0, ?1, ?2)",
        params![
            format!("{},{}", index.top_id(), index.bottom_id()),
            (index.top_len() + index.bottom_len()) as i64
        ],
    )
    .map_err(BufferError::Store)?;
    let mut seq = 1i64;
    for (slot, position) in index.slot_map() {
        conn.execute(
            "INSERT INTO swap_metas (id, slot_index_key, slot_index_val) VALUES (?1, ?2, ?3)",
            params![seq, slot.0 as i64, position.0],
        )
        .map_err(BufferError::Store)?;
        seq += 1;
    }
    Ok(())
}

/// Copy every row of every table to a fresh store at `dest`.
pub fn clone_store(handle: &StoreHandle, dest: &StorePath) -> Result<()> {
    let dest_target = dest.sqlite_target()?;
    if let StorePath::File(p) = dest {
        if p.exists() {
            return Err(BufferError::DatabaseFiles(format!(
                "destination already exists: {}",
                p.display()
            )));
        }
    }
    let conn = handle.lock().expect("store mutex poisoned");
    let mut dest_conn = Connection::open(&dest_target).map_err(BufferError::Store)?;
    dest_conn.execute_batch(SCHEMA).map_err(BufferError::Store)?;
    let backup = rusqlite::backup::Backup::new(&conn, &mut dest_conn).map_err(BufferError::Store)?;
    backup
        .run_to_completion(5, std::time::Duration::from_millis(50), None)
        .map_err(BufferError::Store)?;
    Ok(())
}

/// Delete every row from every table, leaving the schema intact.
pub fn clear_all(handle: &StoreHandle) -> Result<()> {
    let conn = handle.lock().expect("store mutex poisoned");
    conn.execute_batch(
        "DELETE FROM swap_chunk_index; DELETE FROM swap_rows; DELETE FROM swap_metas;
         DELETE FROM local_history; DELETE FROM local_history_branch;
         DELETE FROM local_history_metas; DELETE FROM main_metas;",
    )
    .map_err(BufferError::Store)?;
    Ok(())
}

const TYPE_REMOVE: i64 = 0;
const TYPE_REMOVE_RANGE: i64 = 1;
const TYPE_RESTRICT_REMOVEMENT: i64 = 2;
const TYPE_CURSOR: i64 = 3;
const TYPE_WRITE: i64 = 4;
const TYPE_REWRITE: i64 = 5;
const TYPE_MARKS: i64 = 6;
const TYPE_BRANCH_METADATA: i64 = 7;

fn encode_runs(runs: &[RemovedRun]) -> Vec<u8> {
    wire::encode(
        &runs
            .iter()
            .map(|r| WireValue::StringEnd(r.content.clone(), r.end))
            .collect::<Vec<_>>(),
    )
}

fn decode_runs(bytes: &[u8]) -> Result<Vec<RemovedRun>> {
    wire::decode(bytes)
        .map_err(|_| BufferError::DatabaseCorrupted("malformed removed-run blob".to_string()))?
        .into_iter()
        .map(|v| match v {
            WireValue::StringEnd(content, end) => Ok(RemovedRun { content, end }),
            WireValue::Int(_) => Err(BufferError::DatabaseCorrupted("expected a removed-run, found an int".to_string())),
        })
        .collect()
}

/// Decompose a [`HistoryItem`] into the flat columns `local_history`/`local_history_branch`
/// store it under (`type_`, `typeval`, `work_row`, `coord`, `removed`, `cursor`).
fn item_columns(item: &HistoryItem) -> (i64, i64, Option<i64>, Option<Vec<u8>>, Option<Vec<u8>>, Option<i64>) {
    match item {
        HistoryItem::Remove { coord, removed } => (
            TYPE_REMOVE,
            0,
            None,
            Some(wire::encode_ints(&coord.iter().map(|&c| c as i64).collect::<Vec<_>>())),
            Some(encode_runs(removed)),
            None,
        ),
        HistoryItem::RemoveRange { cursor, removed } => (TYPE_REMOVE_RANGE, 0, None, None, Some(encode_runs(removed)), Some(*cursor as i64)),
        HistoryItem::RestrictRemovement { rows, pairs_with } => {
            (TYPE_RESTRICT_REMOVEMENT, pairs_with.unwrap_or(-1), None, None, Some(encode_runs(rows)), None)
        }
        HistoryItem::Cursor { cursor } => (TYPE_CURSOR, 0, None, None, None, Some(*cursor as i64)),
        HistoryItem::Write { coord, removed, work_row } => (
            TYPE_WRITE,
            removed.is_some() as i64,
            Some(*work_row as i64),
            Some(wire::encode_ints(&[coord.0 as i64, coord.1 as i64])),
            removed.as_ref().map(|r| encode_runs(r)),
            None,
        ),
        HistoryItem::ReWrite { coord, removed, work_row } => (
            TYPE_REWRITE,
            removed.is_some() as i64,
            Some(*work_row as i64),
            Some(wire::encode_ints(&[coord.0 as i64, coord.1 as i64])),
            removed.as_ref().map(|r| encode_runs(r)),
            None,
        ),
        HistoryItem::Marks { coord, cursor } => (
            TYPE_MARKS,
            cursor.is_some() as i64,
            None,
            Some(wire::encode_ints(&coord.iter().flat_map(|&(a, b)| [a as i64, b as i64]).collect::<Vec<_>>())),
            None,
            cursor.map(|c| c as i64),
        ),
        HistoryItem::BranchMetadata { prev_progress_id, prev_redo_id, cursor, order_stamp } => (
            TYPE_BRANCH_METADATA,
            0,
            None,
            Some(wire::encode_ints(&[*prev_progress_id, *prev_redo_id, *order_stamp])),
            None,
            Some(*cursor as i64),
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn item_from_columns(
    type_: i64,
    typeval: i64,
    work_row: Option<i64>,
    coord: Option<Vec<u8>>,
    removed: Option<Vec<u8>>,
    cursor: Option<i64>,
) -> Result<HistoryItem> {
    let decode_coord_ints = |bytes: &[u8]| -> Result<Vec<i64>> {
        wire::decode_ints(bytes).map_err(|_| BufferError::DatabaseCorrupted("malformed coord blob".to_string()))
    };
    Ok(match type_ {
        TYPE_REMOVE => HistoryItem::Remove {
            coord: decode_coord_ints(&coord.unwrap_or_default())?.into_iter().map(|c| c as usize).collect(),
            removed: decode_runs(&removed.unwrap_or_default())?,
        },
        TYPE_REMOVE_RANGE => HistoryItem::RemoveRange {
            cursor: cursor.unwrap_or(0) as usize,
            removed: decode_runs(&removed.unwrap_or_default())?,
        },
        TYPE_RESTRICT_REMOVEMENT => HistoryItem::RestrictRemovement {
            rows: decode_runs(&removed.unwrap_or_default())?,
            pairs_with: if typeval < 0 { None } else { Some(typeval) },
        },
        TYPE_CURSOR => HistoryItem::Cursor { cursor: cursor.unwrap_or(0) as usize },
        TYPE_WRITE | TYPE_REWRITE => {
            let ints = decode_coord_ints(&coord.unwrap_or_default())?;
            let coord = (*ints.first().unwrap_or(&0) as usize, *ints.get(1).unwrap_or(&0) as usize);
            let removed = if typeval != 0 { Some(decode_runs(&removed.unwrap_or_default())?) } else { None };
            let work_row = work_row.unwrap_or(0) as usize;
            if type_ == TYPE_WRITE {
                HistoryItem::Write { coord, removed, work_row }
            } else {
                HistoryItem::ReWrite { coord, removed, work_row }
            }
        }
        TYPE_MARKS => {
            let ints = decode_coord_ints(&coord.unwrap_or_default())?;
            let pairs = ints.chunks_exact(2).map(|c| (c[0] as usize, c[1] as usize)).collect();
            HistoryItem::Marks {
                coord: pairs,
                cursor: if typeval != 0 { cursor.map(|c| c as usize) } else { None },
            }
        }
        TYPE_BRANCH_METADATA => {
            let ints = decode_coord_ints(&coord.unwrap_or_default())?;
            HistoryItem::BranchMetadata {
                prev_progress_id: *ints.first().unwrap_or(&0),
                prev_redo_id: *ints.get(1).unwrap_or(&0),
                cursor: cursor.unwrap_or(0) as usize,
                order_stamp: *ints.get(2).unwrap_or(&0),
            }
        }
        other => return Err(BufferError::DatabaseCorrupted(format!("unknown history item type {other}"))),
    })
}

/// Persist a [`HistorySnapshot`] to `local_history`/`local_history_metas`, replacing any
/// prior content.
pub fn save_history(handle: &StoreHandle, snapshot: &HistorySnapshot) -> Result<()> {
    let conn = handle.lock().expect("store mutex poisoned");
    conn.execute("DELETE FROM local_history", []).map_err(BufferError::Store)?;
    conn.execute("DELETE FROM local_history_metas", []).map_err(BufferError::Store)?;
    for entry in &snapshot.entries {
        let (type_, typeval, work_row, coord, removed, cursor) = item_columns(&entry.item);
        conn.execute(
            "INSERT INTO local_history (id_, type_, typeval, work_row, coord, removed, restrict_removed, cursor, order_)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8)",
            params![entry.id, type_, typeval, work_row, coord, removed, cursor, entry.order],
        )
        .map_err(BufferError::Store)?;
    }
    let clamp_code: i64 = match snapshot.clamp {
        Clamp::At(id) => id,
        Clamp::ReachableViaFork => i64::MIN + 1,
        Clamp::LostToTrim => i64::MIN + 2,
        Clamp::LostToRedoFlush => i64::MIN + 3,
    };
    conn.execute(
        "INSERT INTO local_history_metas (undo_id, fork_id) VALUES (?1, ?2)",
        params![snapshot.progress_id, snapshot.redo_cursor.unwrap_or(i64::MIN)],
    )
    .map_err(BufferError::Store)?;
    conn.execute(
        "INSERT INTO local_history_metas (undo_id, fork_id) VALUES (?1, ?2)",
        params![snapshot.undo_cursor, clamp_code],
    )
    .map_err(BufferError::Store)?;
    Ok(())
}

/// Reload a [`LocalHistory`] engine from `local_history`/`local_history_metas`. Returns a
/// fresh empty history (per `config`) if no rows are present.
pub fn load_history(handle: &StoreHandle, config: HistoryConfig) -> Result<LocalHistory> {
    let conn = handle.lock().expect("store mutex poisoned");
    let mut stmt = conn
        .prepare("SELECT id_, type_, typeval, work_row, coord, removed, cursor, order_ FROM local_history ORDER BY id_, order_")
        .map_err(BufferError::Store)?;
    let mut rows = stmt.query([]).map_err(BufferError::Store)?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next().map_err(BufferError::Store)? {
        let id: i64 = row.get(0).map_err(BufferError::Store)?;
        let type_: i64 = row.get(1).map_err(BufferError::Store)?;
        let typeval: i64 = row.get(2).map_err(BufferError::Store)?;
        let work_row: Option<i64> = row.get(3).map_err(BufferError::Store)?;
        let coord: Option<Vec<u8>> = row.get(4).map_err(BufferError::Store)?;
        let removed: Option<Vec<u8>> = row.get(5).map_err(BufferError::Store)?;
        let cursor: Option<i64> = row.get(6).map_err(BufferError::Store)?;
        let order: i64 = row.get(7).map_err(BufferError::Store)?;
        let item = item_from_columns(type_, typeval, work_row, coord, removed, cursor)?;
        entries.push(Entry { id, order, item });
    }
    drop(rows);
    drop(stmt);
    let mut metas_stmt = conn.prepare("SELECT undo_id, fork_id FROM local_history_metas").map_err(BufferError::Store)?;
    let mut metas_rows: Vec<(i64, i64)> = metas_stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .map_err(BufferError::Store)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(BufferError::Store)?;
    if metas_rows.len() < 2 {
        return Ok(LocalHistory::new(config));
    }
    let (progress_id, redo_raw) = metas_rows.remove(0);
    let (undo_cursor, clamp_code) = metas_rows.remove(0);
    let redo_cursor = if redo_raw == i64::MIN { None } else { Some(redo_raw) };
    let clamp = match clamp_code {
        c if c == i64::MIN + 1 => Clamp::ReachableViaFork,
        c if c == i64::MIN + 2 => Clamp::LostToTrim,
        c if c == i64::MIN + 3 => Clamp::LostToRedoFlush,
        id => Clamp::At(id),
    };
    Ok(LocalHistory::restore(
        config,
        HistorySnapshot {
            entries,
            progress_id,
            undo_cursor,
            redo_cursor,
            clamp,
        },
    ))
}

/// Persist the `main_metas` row describing where the swap/history/marker stores live and
/// the buffer's last cursor position.
pub fn save_main_metas(handle: &StoreHandle, swap_path: &str, history_path: &str, cursor: usize, markings: &[(usize, usize)], anchors: &[usize]) -> Result<()> {
    let conn = handle.lock().expect("store mutex poisoned");
    conn.execute("DELETE FROM main_metas", []).map_err(BufferError::Store)?;
    let markings_blob = wire::encode_ints(&markings.iter().flat_map(|&(a, b)| [a as i64, b as i64]).collect::<Vec<_>>());
    let anchors_blob = wire::encode_ints(&anchors.iter().map(|&a| a as i64).collect::<Vec<_>>());
    conn.execute(
        "INSERT INTO main_metas (swap, history, marker, markings, cursor, anchors) VALUES (?1, ?2, NULL, ?3, ?4, ?5)",
        params![swap_path, history_path, markings_blob, cursor as i64, anchors_blob],
    )
    .map_err(BufferError::Store)?;
    Ok(())
}

/// Read back the `main_metas` row, if one has been saved.
pub fn load_main_metas(handle: &StoreHandle) -> Result<Option<(String, String, usize, Vec<(usize, usize)>, Vec<usize>)>> {
    let conn = handle.lock().expect("store mutex poisoned");
    let result = conn.query_row(
        "SELECT swap, history, markings, cursor, anchors FROM main_metas LIMIT 1",
        [],
        |r| {
            let swap: String = r.get(0)?;
            let history: String = r.get(1)?;
            let markings_blob: Vec<u8> = r.get(2)?;
            let cursor: i64 = r.get(3)?;
            let anchors_blob: Vec<u8> = r.get(4)?;
            Ok((swap, history, markings_blob, cursor, anchors_blob))
        },
    );
    match result {
        Ok((swap, history, markings_blob, cursor, anchors_blob)) => {
            let markings_ints = wire::decode_ints(&markings_blob).map_err(|_| BufferError::DatabaseCorrupted("malformed markings blob".to_string()))?;
            let markings = markings_ints.chunks_exact(2).map(|c| (c[0] as usize, c[1] as usize)).collect();
            let anchors = wire::decode_ints(&anchors_blob)
                .map_err(|_| BufferError::DatabaseCorrupted("malformed anchors blob".to_string()))?
                .into_iter()
                .map(|a| a as usize)
                .collect();
            Ok(Some((swap, history, cursor as usize, markings, anchors)))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(BufferError::Store(e)),
    }
}
