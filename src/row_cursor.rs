//! Per-row cursor: translates between content-character, visual-cell, and (tab-split)
//! segment coordinates within one [`crate::row::Row`].
//!
//! A row's content is indexed three ways: by character offset (`content`, used by
//! `write`/`delete`/`remove_area`), by visual cell (`visual`, used when placing a cursor
//! from a terminal column click-through), and by raster segment (`segment`/`in_segment`,
//! the position within the tab-split pieces a renderer lays out independently). Converting
//! between them requires walking the row's characters, which is cheap per call but not
//! free; [`RowCursor`] keeps a small LRU of recently resolved translations so repeated
//! moves in the same neighborhood (arrow-key repeats, for instance) don't re-walk from
//! column 0 every time.

use lru::LruCache;
use std::num::NonZeroUsize;

/// Number of recent content->(visual, segment) translations kept per row.
const CACHE_SLOTS: usize = 6;

/// A resolved coordinate triple for one content offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Resolved {
    visual: usize,
    segment: usize,
    in_segment: usize,
}

/// Tracks where within a row's content a cursor sits, and caches the visual/segment
/// translation of recently visited offsets.
#[derive(Debug)]
pub struct RowCursor {
    /// Character offset into the row's content. The authoritative coordinate; `visual` and
    /// `segment`/`in_segment` are derived from it on demand.
    pub content: usize,
    cache: LruCache<usize, Resolved>,
}

impl Clone for RowCursor {
    fn clone(&self) -> Self {
        let mut fresh = RowCursor::new();
        fresh.content = self.content;
        fresh
    }
}

impl Default for RowCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl RowCursor {
    /// A cursor parked at content offset 0 with an empty translation cache.
    pub fn new() -> Self {
        Self {
            content: 0,
            cache: LruCache::new(NonZeroUsize::new(CACHE_SLOTS).unwrap()),
        }
    }

    /// Drop all cached translations. Called by every [`crate::row::Row`] mutation, since
    /// a content edit invalidates every offset at or after it (and it's not worth tracking
    /// which entries survive).
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Move the cursor to an explicit content offset, clamped to `max_content`.
    pub fn set_content_clamped(&mut self, offset: usize, max_content: usize) {
        self.content = offset.min(max_content);
    }

    /// Move the cursor to an explicit content offset, with no bound applied (callers that
    /// already know the row's length should prefer
    /// [`RowCursor::set_content_clamped`]).
    pub fn set_content(&mut self, offset: usize) {
        self.content = offset;
    }

    fn resolve(&mut self, content_str: &str, tab_size: usize) -> Resolved {
        if let Some(r) = self.cache.get(&self.content) {
            return *r;
        }
        let mut visual = 0usize;
        let mut segment = 0usize;
        let mut seg_start = 0usize;
        for (col, ch) in content_str.chars().enumerate() {
            if col == self.content {
                break;
            }
            if ch == '\t' {
                segment += 1;
                seg_start = col + 1;
                visual = (visual / tab_size.max(1) + 1) * tab_size.max(1);
            } else {
                visual += crate::width::char_width(ch);
            }
        }
        let resolved = Resolved {
            visual,
            segment,
            in_segment: self.content.saturating_sub(seg_start),
        };
        self.cache.put(self.content, resolved);
        resolved
    }

    /// The cursor's visual (cell) column within `content_str`.
    pub fn visual(&mut self, content_str: &str, tab_size: usize) -> usize {
        self.resolve(content_str, tab_size).visual
    }

    /// Which raster (tab-split) segment the cursor falls in.
    pub fn segment(&mut self, content_str: &str, tab_size: usize) -> usize {
        self.resolve(content_str, tab_size).segment
    }

    /// The cursor's character offset within its raster segment.
    pub fn in_segment(&mut self, content_str: &str, tab_size: usize) -> usize {
        self.resolve(content_str, tab_size).in_segment
    }

    /// Place the cursor at the content offset whose visual column is closest to (without
    /// exceeding) `visual`, within `content_str`. This is the entry point a terminal-column
    /// click or arrow-key-with-sticky-column move uses.
    pub fn set_by_visual(&mut self, content_str: &str, visual: usize, tab_size: usize) {
        self.content = crate::width::column_for_visual_x(content_str, visual, tab_size);
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visual_tracks_tabs() {
        let mut cur = RowCursor::new();
        cur.set_content(3);
        assert_eq!(cur.visual("ab\tc", 4), 4);
    }

    #[test]
    fn set_by_visual_round_trip() {
        let mut cur = RowCursor::new();
        cur.set_by_visual("ab\tcd", 4, 4);
        assert_eq!(cur.content, 3);
    }

    #[test]
    fn cache_invalidate_forces_recompute() {
        let mut cur = RowCursor::new();
        cur.set_content(2);
        let v1 = cur.visual("hello", 4);
        cur.invalidate();
        let v2 = cur.visual("hello", 4);
        assert_eq!(v1, v2);
    }

    #[test]
    fn segment_counts_tab_splits() {
        let mut cur = RowCursor::new();
        cur.set_content(5);
        assert_eq!(cur.segment("ab\tcd", 4), 1);
        assert_eq!(cur.in_segment("ab\tcd", 4), 2);
    }
}
