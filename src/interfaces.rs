//! Callback contracts for the components this crate treats as external collaborators.
//!
//! The marker set, the global cursor, and the highlighter live outside this core, specified
//! only through the interfaces it offers and consumes: a trait plus a small "what changed"
//! descriptor lets an external consumer react without the core knowing how styles or folds
//! are represented on the other side. [`MarkerIF`]/[`GlobCursorIF`] are the notify-side
//! contract (the core tells them what shifted), and [`HighlighterIF`] is the same shape for
//! the syntax/display side via [`ChunkLoad`].

use crate::row::Row;

/// How much of a range was removed by an edit, used when notifying markers/anchors/the
/// global cursor of a net diff. A proper enum in place of a `None`/`false`/integer sentinel
/// trio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEnd {
    /// Nothing was removed.
    Unaffected,
    /// Removed through the end of the document.
    ToDocumentEnd,
    /// Removed through this absolute data position.
    At(usize),
}

/// Callback contract for adjusting user-visible markings (selections, bookmarks, etc.)
/// after an edit shifts the document. The core calls this once per mutating operation with
/// the net effect; it never inspects or owns the marking set itself.
pub trait MarkerIF {
    /// Shift all markings at or after `start` by `diff` data characters; if `range_end` is
    /// not [`RangeEnd::Unaffected`], markings wholly inside `[start, range_end)` collapse to
    /// `start` instead of shifting.
    fn adjust(&mut self, start: usize, diff: isize, range_end: RangeEnd);

    /// Restore a previously captured marking snapshot verbatim (used by
    /// [`crate::history::LocalHistory`] undo of a `MARKS` item).
    fn restore_snapshot(&mut self, snapshot: &[(usize, usize)]);

    /// Capture the current marking set as `(start, end)` data-character pairs, for a
    /// `MARKS` history item.
    fn snapshot(&self) -> Vec<(usize, usize)>;
}

/// Callback contract for the single global cursor anchor a host UI tracks independently of
/// [`crate::buffer::TextBuffer`]'s own cursor (e.g. a visual-mode anchor).
pub trait GlobCursorIF {
    /// Called before a mutating operation begins, so the anchor can snapshot its own state
    /// if it needs to compare before/after.
    fn will_change(&mut self);

    /// Shift the anchor by the net diff of a completed operation, with the same semantics
    /// as [`MarkerIF::adjust`].
    fn adjust(&mut self, start: usize, diff: isize, range_end: RangeEnd);
}

/// Descriptor of what changed, handed to the highlighter/display layer after every public
/// mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLoad {
    /// Current top-side adjacent slot id (0 if no chunk is parked above the window).
    pub top_id: i64,
    /// Current bottom-side adjacent slot id (0 if no chunk is parked below the window).
    pub btm_id: i64,
    /// Rows cut from the top of the window into swap by this operation, if any.
    pub top_cut: Option<Vec<Row>>,
    /// Rows cut from the bottom of the window into swap by this operation, if any.
    pub btm_cut: Option<Vec<Row>>,
    /// Number of rows newly loaded from swap onto the top of the window, if any.
    pub top_nload: Option<usize>,
    /// Number of rows newly loaded from swap onto the bottom of the window, if any.
    pub btm_nload: Option<usize>,
    /// If the operation targeted one specific absolute position (e.g. `goto_data`), that
    /// position.
    pub spec_position: Option<usize>,
    /// The half-open row-index range inside the window that the edit actually touched.
    pub edited_range: Option<(usize, usize)>,
}

impl ChunkLoad {
    /// A descriptor carrying no change (used for read-only navigation that didn't cross a
    /// chunk boundary).
    pub fn unchanged(top_id: i64, btm_id: i64) -> Self {
        Self {
            top_id,
            btm_id,
            top_cut: None,
            btm_cut: None,
            top_nload: None,
            btm_nload: None,
            spec_position: None,
            edited_range: None,
        }
    }
}

/// Callback contract for the syntax/display layer: receives a [`ChunkLoad`] after every
/// public mutation and decides for itself what to re-highlight or redraw.
pub trait HighlighterIF {
    /// Notify of a completed buffer change.
    fn notify(&mut self, load: &ChunkLoad);
}

/// A no-op implementation of all three callback contracts, used when a host doesn't wire up
/// markers, a global cursor, or a highlighter.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullComponent;

impl MarkerIF for NullComponent {
    fn adjust(&mut self, _start: usize, _diff: isize, _range_end: RangeEnd) {}
    fn restore_snapshot(&mut self, _snapshot: &[(usize, usize)]) {}
    fn snapshot(&self) -> Vec<(usize, usize)> {
        Vec::new()
    }
}

impl GlobCursorIF for NullComponent {
    fn will_change(&mut self) {}
    fn adjust(&mut self, _start: usize, _diff: isize, _range_end: RangeEnd) {}
}

impl HighlighterIF for NullComponent {
    fn notify(&mut self, _load: &ChunkLoad) {}
}
