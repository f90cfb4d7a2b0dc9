//! Window-size policy: decides when to cut rows out of RAM and where they go.
//!
//! Three morphs share one surface: **swap** (cut chunks to
//! [`crate::swap::Swap`]), **drop** (cut chunks to a user callback, incompatible with
//! [`crate::history::LocalHistory`]), and **restrictive** (hard-cap total rows, discarding
//! the overflow with an optional history hook so undo can restore it). A tagged union over
//! the three rather than dynamic dispatch, since the variant set is closed and each morph's
//! fields differ.

use crate::error::{BufferError, Result};
use crate::meta_index::{DocPoint, LocalSpan};
use crate::row::Row;
use crate::swap::{DumpRow, Side, Swap};

/// Rows cut from the window by a trim pass, tagged with which side they came from.
#[derive(Debug, Clone)]
pub struct CutRows {
    /// Rows removed from the top of the window.
    pub top: Option<Vec<Row>>,
    /// Rows removed from the bottom of the window.
    pub bottom: Option<Vec<Row>>,
}

impl CutRows {
    fn empty() -> Self {
        Self {
            top: None,
            bottom: None,
        }
    }

    /// `true` if neither side cut anything.
    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.bottom.is_none()
    }
}

/// Where a restrictive morph's discarded rows go so [`crate::history::LocalHistory`] can
/// restore them on undo.
pub trait RestrictSink {
    /// Rows discarded by the restrictive trimmer, most recently trimmed last.
    fn restrict_removed(&mut self, rows: Vec<Row>);
}

/// Where a drop morph's cut rows go, in lieu of [`crate::swap::Swap`].
pub trait DropSink {
    /// Rows cut from `side` of the window.
    fn drop_chunk(&mut self, side: Side, rows: Vec<Row>);
}

/// The three trimming policies.
pub enum Morph {
    /// Page rows out to [`crate::swap::Swap`] when the window overflows.
    Swap {
        /// Row count threshold: trimming triggers once the window exceeds
        /// `rows_max + chunk_size`.
        rows_max: usize,
        /// Rows cut per trim step.
        chunk_size: usize,
        /// If set, the very first row of the document keeps its own width cap distinct
        /// from the rest of the window ("top baserow" policy).
        keep_top_row_size: bool,
    },
    /// Page rows out to a user-supplied sink. Does not coexist with `LocalHistory`.
    Drop {
        /// Same triggering rule as [`Morph::Swap`].
        rows_max: usize,
        /// Rows cut per trim step.
        chunk_size: usize,
    },
    /// Hard-cap total document rows, discarding overflow from the bottom.
    Restrictive {
        /// Absolute row cap.
        rows_max: usize,
    },
}

/// The trimming policy plus the state it needs across calls.
pub struct Trimmer {
    morph: Morph,
}

impl Trimmer {
    /// Construct a swap-morph trimmer. Errors if `chunk_size` is more than half of
    /// `rows_max`.
    pub fn swap(rows_max: usize, chunk_size: usize, keep_top_row_size: bool) -> Result<Self> {
        Self::check_half(rows_max, chunk_size)?;
        Ok(Self {
            morph: Morph::Swap {
                rows_max,
                chunk_size,
                keep_top_row_size,
            },
        })
    }

    /// Construct a drop-morph trimmer. Same sizing constraint as [`Trimmer::swap`].
    pub fn drop_morph(rows_max: usize, chunk_size: usize) -> Result<Self> {
        Self::check_half(rows_max, chunk_size)?;
        Ok(Self {
            morph: Morph::Drop { rows_max, chunk_size },
        })
    }

    /// Construct a restrictive-morph trimmer.
    pub fn restrictive(rows_max: usize) -> Result<Self> {
        if rows_max == 0 {
            return Err(BufferError::Configuration(
                "restrictive trimmer requires rows_max > 0".to_string(),
            ));
        }
        Ok(Self {
            morph: Morph::Restrictive { rows_max },
        })
    }

    fn check_half(rows_max: usize, chunk_size: usize) -> Result<()> {
        if chunk_size == 0 || chunk_size * 2 > rows_max {
            return Err(BufferError::Configuration(format!(
                "chunk_size ({chunk_size}) must be at most half of rows_max ({rows_max})"
            )));
        }
        Ok(())
    }

    /// Whether this morph is `Drop` (callers use this to reject pairing with
    /// `LocalHistory`,.3).
    pub fn is_drop(&self) -> bool {
        matches!(self.morph, Morph::Drop { .. })
    }

    fn span_of(rows: &[Row]) -> LocalSpan {
        let mut span = LocalSpan::default();
        for r in rows {
            span.content += r.content.chars().count();
            span.data += r.data_len();
            span.n_rows += 1;
            if r.end.starts_new_line() {
                span.n_newlines += 1;
            }
        }
        span
    }

    fn start_of(row: &Row) -> DocPoint {
        DocPoint {
            data: row.data_start,
            content: row.content_start,
            row: row.row_num,
            line: row.line_num,
        }
    }

    /// Run one trim pass. `window` is the in-RAM row list (already indexed); `cursor_row`
    /// is the window-relative index of the row the cursor currently sits in.
    ///
    /// Returns the rows cut, if any. Callers must re-index the window and restore the
    /// cursor's data position afterward (`sizing()`'s two remaining duties, folded into
    /// the caller since both require buffer-level context this type doesn't own).
    pub fn trim(
        &mut self,
        window: &mut Vec<Row>,
        cursor_row: usize,
        swap: Option<&mut Swap>,
        drop_sink: Option<&mut dyn DropSink>,
        restrict_sink: Option<&mut dyn RestrictSink>,
    ) -> Result<CutRows> {
        match &self.morph {
            Morph::Swap {
                rows_max,
                chunk_size,
                ..
            } => {
                let (rows_max, chunk_size) = (*rows_max, *chunk_size);
                let swap = swap.ok_or_else(|| {
                    BufferError::Configuration("swap morph requires a Swap store".to_string())
                })?;
                self.trim_swap(window, cursor_row, rows_max, chunk_size, swap)
            }
            Morph::Drop {
                rows_max,
                chunk_size,
            } => {
                let (rows_max, chunk_size) = (*rows_max, *chunk_size);
                let sink = drop_sink.ok_or_else(|| {
                    BufferError::Configuration("drop morph requires a DropSink".to_string())
                })?;
                Ok(Self::trim_drop(window, cursor_row, rows_max, chunk_size, sink))
            }
            Morph::Restrictive { rows_max } => {
                let rows_max = *rows_max;
                Ok(Self::trim_restrictive(window, rows_max, restrict_sink))
            }
        }
    }

    fn trim_swap(
        &mut self,
        window: &mut Vec<Row>,
        cursor_row: usize,
        rows_max: usize,
        chunk_size: usize,
        swap: &mut Swap,
    ) -> Result<CutRows> {
        if window.len() <= rows_max + chunk_size {
            return Ok(CutRows::empty());
        }
        let mut out = CutRows::empty();

        while cursor_row.saturating_sub(0) > 2 * chunk_size && window.len() > rows_max + chunk_size {
            if window.len() <= chunk_size {
                break;
            }
            let cut: Vec<Row> = window.drain(0..chunk_size).collect();
            let start = Self::start_of(&cut[0]);
            let span = Self::span_of(&cut);
            let dump: Vec<DumpRow> = cut.iter().map(DumpRow::from_row).collect();
            swap.dump_chunk(Side::Top, start, dump)?;
            swap.index.window_start = swap.index.window_start.advance(span);
            out.top.get_or_insert_with(Vec::new).extend(cut);
        }

        while window.len() > rows_max + chunk_size {
            if window.len() <= chunk_size {
                break;
            }
            let split = window.len() - chunk_size;
            let cut: Vec<Row> = window.drain(split..).collect();
            let start = Self::start_of(&cut[0]);
            let span = Self::span_of(&cut);
            let dump: Vec<DumpRow> = cut.iter().map(DumpRow::from_row).collect();
            swap.dump_chunk(Side::Bottom, start, dump)?;
            swap.propagate_from(crate::meta_index::PositionId(1), span, false);
            out.bottom.get_or_insert_with(Vec::new).extend(cut);
        }

        Ok(out)
    }

    fn trim_drop(
        window: &mut Vec<Row>,
        cursor_row: usize,
        rows_max: usize,
        chunk_size: usize,
        sink: &mut dyn DropSink,
    ) -> CutRows {
        if window.len() <= rows_max + chunk_size {
            return CutRows::empty();
        }
        let mut out = CutRows::empty();
        while cursor_row > 2 * chunk_size && window.len() > rows_max + chunk_size && window.len() > chunk_size {
            let cut: Vec<Row> = window.drain(0..chunk_size).collect();
            sink.drop_chunk(Side::Top, cut.clone());
            out.top.get_or_insert_with(Vec::new).extend(cut);
        }
        while window.len() > rows_max + chunk_size && window.len() > chunk_size {
            let split = window.len() - chunk_size;
            let cut: Vec<Row> = window.drain(split..).collect();
            sink.drop_chunk(Side::Bottom, cut.clone());
            out.bottom.get_or_insert_with(Vec::new).extend(cut);
        }
        out
    }

    fn trim_restrictive(
        window: &mut Vec<Row>,
        rows_max: usize,
        restrict_sink: Option<&mut dyn RestrictSink>,
    ) -> CutRows {
        if window.len() <= rows_max {
            return CutRows::empty();
        }
        let cut: Vec<Row> = window.drain(rows_max..).collect();
        if let Some(sink) = restrict_sink {
            sink.restrict_removed(cut.clone());
        }
        CutRows {
            top: None,
            bottom: Some(cut),
        }
    }

    /// Re-enforce the distinct width cap the first or last row of the document may carry
    ///, after a cut changed which row that
    /// is. Re-splitting content that now overflows the reasserted cap is the caller's job
    /// (the same overflow path `Row::write` already produces via `adjust_rows`).
    pub fn sizing(&self, window: &mut [Row], top_cap: Option<usize>, last_cap: Option<usize>) {
        match &self.morph {
            Morph::Swap {
                keep_top_row_size, ..
            } if *keep_top_row_size => {
                if let Some(first) = window.first_mut() {
                    first.visual_max = top_cap;
                }
            }
            Morph::Restrictive { .. } => {
                if let Some(last) = window.last_mut() {
                    last.visual_max = last_cap;
                }
            }
            _ => {}
        }
    }

    /// Cheap per-move check: load at most one chunk on whichever side the cursor is about
    /// to cross. Returns `true` if a chunk was loaded.
    pub fn poll(&self, window: &mut Vec<Row>, cursor_row: usize, swap: &mut Swap, load_distance: usize) -> Result<bool> {
        if cursor_row <= load_distance && swap.has_adjacent(Side::Top) {
            if let Some(loaded) = swap.load_chunk(Side::Top)? {
                let rows: Vec<Row> = loaded.rows.into_iter().map(row_from_dump).collect();
                for (i, r) in rows.into_iter().enumerate() {
                    window.insert(i, r);
                }
                return Ok(true);
            }
        }
        if window.len().saturating_sub(cursor_row) <= load_distance && swap.has_adjacent(Side::Bottom) {
            if let Some(loaded) = swap.load_chunk(Side::Bottom)? {
                for r in loaded.rows {
                    window.push(row_from_dump(r));
                }
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Fill the window to `rows_max`, loading from both sides as needed, rebalancing if
    /// one side runs out.
    pub fn demand(&self, window: &mut Vec<Row>, swap: &mut Swap, rows_max: usize) -> Result<()> {
        while window.len() < rows_max {
            let mut loaded_any = false;
            if swap.has_adjacent(Side::Top) {
                if let Some(loaded) = swap.load_chunk(Side::Top)? {
                    let rows: Vec<Row> = loaded.rows.into_iter().map(row_from_dump).collect();
                    for (i, r) in rows.into_iter().enumerate() {
                        window.insert(i, r);
                    }
                    loaded_any = true;
                }
            }
            if window.len() >= rows_max {
                break;
            }
            if swap.has_adjacent(Side::Bottom) {
                if let Some(loaded) = swap.load_chunk(Side::Bottom)? {
                    for r in loaded.rows {
                        window.push(row_from_dump(r));
                    }
                    loaded_any = true;
                }
            }
            if !loaded_any {
                break;
            }
        }
        Ok(())
    }
}

fn row_from_dump(dump: DumpRow) -> Row {
    let mut row = Row::default_row();
    row.content = dump.content;
    row.end = dump.end;
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_row(content: &str) -> Row {
        let mut r = Row::default_row();
        r.content = content.to_string();
        r
    }

    #[test]
    fn construction_rejects_oversized_chunk() {
        assert!(Trimmer::swap(7, 4, false).is_err());
        assert!(Trimmer::swap(8, 4, false).is_ok());
    }

    #[test]
    fn restrictive_caps_rows() {
        let mut window: Vec<Row> = (0..5).map(|i| plain_row(&i.to_string())).collect();
        let cut = Trimmer::trim_restrictive(&mut window, 3, None);
        assert_eq!(window.len(), 3);
        assert_eq!(cut.bottom.unwrap().len(), 2);
    }

    #[test]
    fn swap_trim_triggers_past_threshold() {
        let mut trimmer = Trimmer::swap(4, 2, false).unwrap();
        let mut window: Vec<Row> = (0..8).map(|i| plain_row(&i.to_string())).collect();
        let mut swap = Swap::in_memory().unwrap();
        let cut = trimmer.trim(&mut window, 0, Some(&mut swap), None, None).unwrap();
        assert!(!cut.is_empty());
        assert!(window.len() <= 6);
    }
}
