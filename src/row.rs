//! Row: a single mutable text row with tab-aware cursor arithmetic.
//!
//! A [`Row`] owns its `content` (never containing a newline) plus an optional [`RowEnd`]
//! marker, and exposes the write/delete/backspace/shift/tab-replace primitives a row-level
//! edit needs. Every mutating primitive returns a [`WriteItem`] (or `None` if it was a
//! no-op) describing exactly what changed, which [`crate::buffer::TextBuffer`] uses to
//! drive indexing, marker adjustment, and history recording.
//!
//! Row-position metadata (`row_index`, `row_num`, `line_num`, `content_start`,
//! `data_start`) is written by the buffer's indexer and is **not authoritative** until
//! indexing has run after a structural mutation — see [`crate::buffer::TextBuffer::reindex`].
//!
//! Every primitive returns an explicit value describing what changed rather than raising on
//! overflow or a no-op edit; callers inspect the `Option`/`WriteItem` instead of unwinding.

use crate::row_cursor::RowCursor;
use crate::width::{self, DEFAULT_TAB_SIZE};
use regex::Regex;

/// How a row ends. Encodes to `0`/`1`/`2` on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowEnd {
    /// No newline; this is (for now) the last row of the document.
    #[default]
    None,
    /// Hard newline: starts a new line as well as a new row.
    Hard,
    /// Soft/non-breaking newline: starts a new row but not a new line.
    Soft,
}

impl RowEnd {
    /// Data characters this end marker contributes (Invariant 3: 0 for none,
    /// 1 for hard or soft).
    pub fn data_width(self) -> usize {
        match self {
            RowEnd::None => 0,
            RowEnd::Hard | RowEnd::Soft => 1,
        }
    }

    /// `true` only for [`RowEnd::Hard`] (Invariant 4/5: only a hard newline starts a new
    /// line).
    pub fn starts_new_line(self) -> bool {
        matches!(self, RowEnd::Hard)
    }

    /// On-disk/record encoding.
    pub fn code(self) -> u8 {
        match self {
            RowEnd::None => 0,
            RowEnd::Hard => 1,
            RowEnd::Soft => 2,
        }
    }

    /// Decode an on-disk end code. Panics on an out-of-range code, which can only come from
    /// a corrupted store (callers reading from [`crate::swap::Swap`] map that case to
    /// [`crate::error::BufferError::DatabaseCorrupted`] before calling this).
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => RowEnd::None,
            1 => RowEnd::Hard,
            2 => RowEnd::Soft,
            other => panic!("invalid row end code: {other}"),
        }
    }
}

/// Whether an edit's end slot reflects a removed/read end marker.
///
/// : "`false` in the end slot signals end not removed" — i.e. the edit's
/// range stopped strictly before the row's content length, so the end marker (hard, soft,
/// or none) was untouched. [`EndSlot::Removed`] carries the marker's value even when that
/// value is itself [`RowEnd::None`] (the range reached the row's end, but there was no
/// newline there to remove).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndSlot {
    /// The edit's range stopped before the row's end; the end marker is untouched.
    NotRemoved,
    /// The edit's range reached (or exceeded) the row's end; this is what the marker was.
    Removed(RowEnd),
}

/// Overflow produced by [`Row::write`] when the written string contains more than one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overflow {
    /// The remaining lines after the one written into the row that produced this overflow.
    pub lines: Vec<String>,
    /// The end marker the row had before the write (the last overflow row should absorb it).
    pub of_end: RowEnd,
    /// Whether the write was in line-substitute mode.
    pub sub_line: bool,
    /// Whether inserted boundaries should use [`RowEnd::Soft`] instead of [`RowEnd::Hard`].
    pub nbnl: bool,
    /// Total character length of `lines` joined.
    pub length: usize,
}

/// Describes one row mutation, returned by every [`Row`] write/delete/shift primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteItem {
    /// Characters written (content only, not counting any `end` marker change).
    pub write: usize,
    /// Whether this write introduced one or more newlines (i.e. produced [`Overflow`]).
    pub newlines: bool,
    /// Number of additional rows the write produced, if any.
    pub write_rows: Option<usize>,
    /// Absolute data-character offset where the edit began.
    pub begin: usize,
    /// Absolute row number the edit happened in (as of entry, before any reflow).
    pub work_row: usize,
    /// Characters deleted (content only).
    pub deleted: usize,
    /// The exact removed content, if any.
    pub removed: Option<String>,
    /// Whether/what end marker was removed.
    pub removed_end: EndSlot,
    /// Net signed change in data-character count this edit produced.
    pub diff: isize,
    /// Overflow rows to splice into the buffer, if the write spanned more than one row.
    pub overflow: Option<Overflow>,
}

impl WriteItem {
    fn simple(begin: usize, work_row: usize, deleted: usize, removed: Option<String>, diff: isize) -> Self {
        Self {
            write: 0,
            newlines: false,
            write_rows: None,
            begin,
            work_row,
            deleted,
            removed,
            removed_end: EndSlot::NotRemoved,
            diff,
        overflow: None,
        }
    }
}

/// A mutable text row. Not meaningful on its own — see the module docs: its metadata is
/// only authoritative after the owning buffer's indexer has run.
#[derive(Debug, Clone)]
pub struct Row {
    /// Printable content, never containing a newline.
    pub content: String,
    /// The row's end marker.
    pub end: RowEnd,
    /// Tab stop size for this row.
    pub tab_size: usize,
    /// If set, `'\t'` in written input is expanded to blanks immediately rather than kept
    /// as a literal tab character.
    pub tab_to_blanks: bool,
    /// Optional visual-width cap; content written beyond it overflows into new rows.
    pub visual_max: Option<usize>,
    /// Optional regex matched against content up to the visual cap, to choose a nicer
    /// autowrap point than a hard character cut.
    pub autowrap_points: Option<Regex>,
    /// Per-row cursor.
    pub cursor: RowCursor,

    /// Position in the in-RAM window. Set by the indexer.
    pub row_index: usize,
    /// Absolute row number in the document. Set by the indexer.
    pub row_num: usize,
    /// Absolute line number in the document. Set by the indexer.
    pub line_num: usize,
    /// Absolute content-character start offset. Set by the indexer.
    pub content_start: usize,
    /// Absolute data-character start offset. Set by the indexer.
    pub data_start: usize,
}

impl Row {
    /// A new, empty row with the given tab/width policy.
    pub fn new(tab_size: usize, tab_to_blanks: bool, visual_max: Option<usize>, autowrap_points: Option<Regex>) -> Self {
        Self {
            content: String::new(),
            end: RowEnd::None,
            tab_size,
            tab_to_blanks,
            visual_max,
            autowrap_points,
            cursor: RowCursor::new(),
            row_index: 0,
            row_num: 0,
            line_num: 0,
            content_start: 0,
            data_start: 0,
        }
    }

    /// A new empty row using defaults (tab size 4, no width cap).
    pub fn default_row() -> Self {
        Self::new(DEFAULT_TAB_SIZE, false, None, None)
    }

    /// Split `content` on `'\t'` (the row's "raster").
    pub fn raster(&self) -> Vec<&str> {
        self.content.split('\t').collect()
    }

    /// Total visual width of `content`, tabs expanded.
    pub fn visual_len(&self) -> usize {
        width::str_width(&self.content, self.tab_size)
    }

    /// Remaining visual cells before `visual_max` is hit, or `None` if uncapped.
    pub fn free_space(&self) -> Option<usize> {
        self.visual_max.map(|max| max.saturating_sub(self.visual_len()))
    }

    /// Content length in characters.
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Data length: content length plus one if an end marker is present.
    pub fn data_len(&self) -> usize {
        self.content_len() + self.end.data_width()
    }

    fn char_index(&self, n: usize) -> usize {
        self.content
            .char_indices()
            .nth(n)
            .map(|(b, _)| b)
            .unwrap_or(self.content.len())
    }

    fn slice(&self, start: usize, stop: Option<usize>) -> &str {
        let start_b = self.char_index(start);
        match stop {
            Some(stop) => &self.content[start_b..self.char_index(stop)],
            None => &self.content[start_b..],
        }
    }

    /// Enforce the row's visual-width cap, cutting overflow content off the end if
    /// exceeded. Returns the cut-off content and, if an autowrap pattern matched, the
    /// match end offset used as the cut point instead of the raw cap.
    fn trim_to_cap(&mut self) -> Option<(String, Option<usize>)> {
        let max = self.visual_max?;
        if self.visual_len() <= max {
            return None;
        }
        self.end = RowEnd::None;
        let stop = width::column_for_visual_x(&self.content, max, self.tab_size);
        if let Some(re) = &self.autowrap_points {
            let head = self.slice(0, Some(stop)).to_string();
            if let Some(m) = re.find(&head) {
                let cut = self.content[..m.end()].chars().count();
                let overflow = self.slice(cut, None).to_string();
                self.content.truncate(self.char_index(cut));
                return Some((overflow, Some(cut)));
            }
        }
        let overflow = self.slice(stop, None).to_string();
        self.content = self.slice(0, Some(stop)).to_string();
        Some((overflow, None))
    }

    /// Write `line` at the cursor using one of four substitution modes. Returns
    /// `(overflow-from-cap, n_deleted, removed_content)`.
    ///
    /// - default (all flags false): insert `line` at the cursor, pushing existing content
    ///   right.
    /// - `sub_chars`: substitute characters 1:1 up to the next tab (only meaningful when
    ///   `line` has no tabs or newlines).
    /// - `force_sub_chars`: substitute `line.len()` characters regardless of tabs.
    /// - `sub_line`: substitute everything from the cursor to the row's end.
    pub fn write_line(
        &mut self,
        line: &str,
        sub_chars: bool,
        force_sub_chars: bool,
        sub_line: bool,
    ) -> (Option<(String, Option<usize>)>, usize, Option<String>) {
        let cursor = self.cursor.content;
        if sub_line {
            let removed = self.slice(cursor, None).to_string();
            let deleted = removed.chars().count();
            self.content = format!("{}{}", self.slice(0, Some(cursor)), line);
            self.cursor.invalidate();
            return (self.trim_to_cap(), deleted, (!removed.is_empty()).then_some(removed));
        }
        if line.is_empty() {
            // newline rudiment
            return (self.trim_to_cap(), 0, None);
        }
        if force_sub_chars {
            let n = line.chars().count();
            let stop = (cursor + n).min(self.content_len());
            let removed = self.slice(cursor, Some(stop)).to_string();
            let deleted = removed.chars().count();
            self.content = format!(
                "{}{}{}",
                self.slice(0, Some(cursor)),
                line,
                self.slice(stop, None)
            );
            self.cursor.invalidate();
            return (
                self.trim_to_cap(),
                deleted,
                (!removed.is_empty()).then_some(removed),
            );
        }
        if sub_chars && !line.contains('\t') {
            let n = line.chars().count();
            let tab_stop = self.content[self.char_index(cursor)..]
                .find('\t')
                .map(|b| self.content[..self.char_index(cursor) + b].chars().count());
            let stop = match tab_stop {
                Some(t) => t.min(cursor + n),
                None => cursor + n,
            };
            let stop = stop.min(self.content_len());
            let removed = self.slice(cursor, Some(stop)).to_string();
            let deleted = removed.chars().count();
            self.content = format!(
                "{}{}{}",
                self.slice(0, Some(cursor)),
                line,
                self.slice(stop, None)
            );
            self.cursor.invalidate();
            return (
                self.trim_to_cap(),
                deleted,
                (!removed.is_empty()).then_some(removed),
            );
        }
        // plain insert
        self.content = format!(
            "{}{}{}",
            self.slice(0, Some(cursor)),
            line,
            self.slice(cursor, None)
        );
        self.cursor.invalidate();
        (self.trim_to_cap(), 0, None)
    }

    /// Tab-expand `line` relative to the row's current column, if `tab_to_blanks` is set.
    fn expand_tabs(&self, line: &str) -> String {
        if !self.tab_to_blanks || !line.contains('\t') {
            return line.to_string();
        }
        let segs: Vec<&str> = line.split('\t').collect();
        let mut out = String::new();
        let mut col = width::visual_x_for_column(&self.content, self.cursor.content, self.tab_size);
        for (i, seg) in segs.iter().enumerate() {
            out.push_str(seg);
            col += width::str_width(seg, self.tab_size);
            if i + 1 < segs.len() {
                let pad = self.tab_size - (col % self.tab_size);
                out.extend(std::iter::repeat_n(' ', pad));
                col += pad;
            }
        }
        out
    }

    /// Write `string` (splitting on `'\n'`) into the row at the cursor. CR (`'\r'`) is
    /// forbidden in `string` and will panic in debug builds if present — callers must
    /// strip it before calling (the buffer layer validates this once per call).
    ///
    /// `sub_chars`/`force_sub_chars`/`sub_line` select the substitution mode (see
    /// [`Row::write_line`]); `nbnl` forces [`RowEnd::Soft`] boundaries on any inserted
    /// overflow rows instead of [`RowEnd::Hard`].
    pub fn write(
        &mut self,
        string: &str,
        sub_chars: bool,
        force_sub_chars: bool,
        sub_line: bool,
        nbnl: bool,
    ) -> WriteItem {
        debug_assert!(!string.contains('\r'), "CR is not allowed in Row::write input");

        let mut lines: Vec<String> = string.split('\n').map(|s| s.to_string()).collect();
        let of_end = self.end;
        let had_end = !matches!(self.end, RowEnd::None);
        let begin = self.data_start + self.cursor.content;
        let work_row = self.row_num;
        let content_before = self.content_len();

        let first = self.expand_tabs(&lines.remove(0));
        let write_chars: usize = first.chars().count()
            + lines.iter().map(|l| self.expand_tabs(l).chars().count()).sum::<usize>();

        let (mut overflow, mut deleted, mut removed): (Option<Overflow>, usize, Option<String>);

        if lines.is_empty() {
            let (cap_overflow, d, r) = self.write_line(&first, sub_chars, force_sub_chars, sub_line);
            deleted = d;
            removed = r;
            overflow = cap_overflow.map(|(content, _wrap)| Overflow {
                lines: vec![content],
                of_end,
                sub_line,
                nbnl,
                length: 0,
            });
        } else {
            self.end = if nbnl { RowEnd::Soft } else { RowEnd::Hard };
            let after = self.slice(self.cursor.content, None).to_string();
            self.content = self.slice(0, Some(self.cursor.content)).to_string();

            let expanded_rest: Vec<String> = lines.iter().map(|l| self.expand_tabs(l)).collect();

            if sub_line {
                let (cap_overflow, d, r_after) = self.write_line(&first, sub_chars, force_sub_chars, sub_line);
                deleted = d + after.chars().count();
                removed = if after.is_empty() { r_after } else { Some(after.clone()) };
                let mut rest = expanded_rest;
                if let Some((cap_content, _)) = cap_overflow {
                    rest.insert(0, cap_content);
                }
                overflow = Some(Overflow {
                    length: rest.iter().map(|r| r.chars().count()).sum(),
                    lines: rest,
                    of_end,
                    sub_line,
                    nbnl,
                });
            } else {
                let (cap_overflow, d, r) = self.write_line(&first, sub_chars, force_sub_chars, sub_line);
                deleted = d;
                removed = r;
                let mut rest = expanded_rest;
                if let Some((cap_content, _)) = cap_overflow {
                    rest.insert(0, cap_content);
                }
                if let Some(last) = rest.last_mut() {
                    last.push_str(&after);
                } else {
                    rest.push(after);
                }
                overflow = Some(Overflow {
                    length: rest.iter().map(|r| r.chars().count()).sum(),
                    lines: rest,
                    of_end,
                    sub_line,
                    nbnl,
                });
            }
        }

        let diff = (self.content_len() as isize - content_before as isize)
            + (!matches!(self.end, RowEnd::None) as isize - had_end as isize);

        WriteItem {
            write: write_chars,
            newlines: overflow.is_some(),
            write_rows: overflow.as_ref().map(|o| o.lines.len()),
            begin,
            work_row,
            deleted,
            removed,
            removed_end: EndSlot::NotRemoved,
            diff,
            overflow: overflow.take(),
        }
    }

    /// Delete one character to the right of the cursor, or (if `end` is set) the row's end
    /// marker. `None` if there is nothing to delete.
    pub fn delete(&mut self, end: bool) -> Option<WriteItem> {
        if end {
            if matches!(self.end, RowEnd::None) {
                return None;
            }
            let removed_end = self.end;
            self.end = RowEnd::None;
            let begin = self.data_start + self.content_len();
            let mut item = WriteItem::simple(begin, self.row_num, 1, Some("\n".to_string()), -1);
            item.removed_end = EndSlot::Removed(removed_end);
            return Some(item);
        }
        if self.cursor.content == self.content_len() {
            return None;
        }
        let removed = self.slice(self.cursor.content, Some(self.cursor.content + 1)).to_string();
        self.content = format!(
            "{}{}",
            self.slice(0, Some(self.cursor.content)),
            self.slice(self.cursor.content + 1, None)
        );
        self.cursor.invalidate();
        let begin = self.data_start + self.cursor.content;
        Some(WriteItem::simple(begin, self.row_num, 1, Some(removed), -1))
    }

    /// Delete one character to the left of the cursor. No-op at column 0.
    pub fn backspace(&mut self) -> Option<WriteItem> {
        if self.cursor.content == 0 {
            return None;
        }
        let s = self.cursor.content - 1;
        let removed = self.slice(s, Some(s + 1)).to_string();
        self.content = format!("{}{}", self.slice(0, Some(s)), self.slice(self.cursor.content, None));
        self.cursor.set_content(s);
        let begin = self.data_start + self.cursor.content;
        Some(WriteItem::simple(begin, self.row_num, 1, Some(removed), -1))
    }

    /// Remove the content (and, if reached, the end marker) from `start` to `stop`
    /// (exclusive; `None` means to the row's end). If `saturate` is true, a `stop` beyond
    /// the row's length reads/removes through the row's end instead of failing.
    pub fn remove_area(&mut self, start: usize, stop: Option<usize>, saturate: bool) -> (String, EndSlot) {
        let len = self.content_len();
        let (removed, end_slot) = if start > len {
            (String::new(), EndSlot::Removed(self.end))
        } else {
            match stop {
                None => (self.slice(start, None).to_string(), EndSlot::Removed(self.end)),
                Some(stop) if stop > len => {
                    (self.slice(start, None).to_string(), EndSlot::Removed(self.end))
                }
                Some(stop) => (self.slice(start, Some(stop)).to_string(), EndSlot::NotRemoved),
            }
        };

        if start > len {
            if saturate {
                self.end = RowEnd::None;
            }
        } else {
            match stop {
                None => {
                    self.content = self.slice(0, Some(start)).to_string();
                    self.end = RowEnd::None;
                }
                Some(stop) if stop > len => {
                    if saturate {
                        self.content = self.slice(0, Some(start)).to_string();
                        self.end = RowEnd::None;
                    }
                }
                Some(stop) => {
                    self.content = format!("{}{}", self.slice(0, Some(start)), self.slice(stop, None));
                }
            }
        }
        self.cursor.invalidate();
        (removed, end_slot)
    }

    /// Insert one tab-equivalent of indent at row start (`back = false`), or remove up to
    /// one tab-equivalent of leading whitespace (`back = true`). `None` if there's nothing
    /// to do (no leading whitespace to remove, or no free space to indent into).
    pub fn shift(&mut self, back: bool) -> Option<WriteItem> {
        if back {
            if let Some(rest) = self.content.strip_prefix('\t') {
                self.content = rest.to_string();
                self.cursor.invalidate();
                return Some(WriteItem::simple(self.data_start, self.row_num, 1, Some("\t".to_string()), -1));
            }
            let leading: usize = self
                .content
                .chars()
                .take_while(|c| c.is_whitespace() && *c != '\t')
                .count();
            if leading == 0 {
                return None;
            }
            let rm = self.tab_size.min(leading);
            let removed: String = self.content.chars().take(rm).collect();
            self.content = self.content.chars().skip(rm).collect();
            self.cursor.invalidate();
            return Some(WriteItem::simple(self.data_start, self.row_num, rm, Some(removed), -(rm as isize)));
        }

        match self.free_space() {
            Some(free) if free < self.tab_size => None,
            _ => {
                let (insert, write) = if self.tab_to_blanks {
                    (" ".repeat(self.tab_size), self.tab_size)
                } else {
                    ("\t".to_string(), 1)
                };
                self.content = format!("{insert}{}", self.content);
                self.cursor.invalidate();
                let mut item = WriteItem::simple(self.data_start, self.row_num, 0, None, write as isize);
                item.write = write;
                Some(item)
            }
        }
    }

    /// Expand TAB bytes inside `[start, stop)` to `to_char` repeated to the next tab stop.
    /// `None` if the range has no tab to expand.
    pub fn replace_tabs(&mut self, start: usize, stop: Option<usize>, to_char: char) -> Option<WriteItem> {
        if self.content.is_empty() {
            return None;
        }
        let work = self.slice(start, stop).to_string();
        if work.is_empty() || !work.contains('\t') {
            return None;
        }
        let segs: Vec<&str> = work.split('\t').collect();
        if segs.len() < 2 {
            return None;
        }
        let mut replaced = String::new();
        for (i, seg) in segs.iter().enumerate() {
            replaced.push_str(seg);
            if i + 1 < segs.len() {
                let col = width::str_width(seg, self.tab_size) % self.tab_size;
                let pad = self.tab_size - col;
                replaced.extend(std::iter::repeat_n(to_char, pad));
            }
        }
        let before = self.slice(0, Some(start)).to_string();
        let after = match stop {
            Some(stop) => self.slice(stop, None).to_string(),
            None => String::new(),
        };
        let write = replaced.chars().count();
        let deleted = work.chars().count();
        self.content = format!("{before}{replaced}{after}");
        self.cursor.invalidate();
        Some(WriteItem {
            write,
            newlines: false,
            write_rows: None,
            begin: self.data_start + start,
            work_row: self.row_num,
            deleted,
            removed: Some(work),
            removed_end: EndSlot::NotRemoved,
            diff: write as isize - deleted as isize,
            overflow: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_plain_insert() {
        let mut row = Row::default_row();
        let item = row.write("hello", false, false, false, false);
        assert_eq!(row.content, "hello");
        assert_eq!(item.diff, 5);
        assert!(!item.newlines);
    }

    #[test]
    fn write_with_newline_produces_overflow() {
        let mut row = Row::default_row();
        let item = row.write("hello\nworld", false, false, false, false);
        assert_eq!(row.content, "hello");
        assert_eq!(row.end, RowEnd::Hard);
        let of = item.overflow.expect("overflow expected");
        assert_eq!(of.lines, vec!["world".to_string()]);
    }

    #[test]
    fn delete_end_joins_rows_semantically() {
        let mut row = Row::default_row();
        row.write("abc", false, false, false, false);
        row.end = RowEnd::Hard;
        let item = row.delete(true).unwrap();
        assert_eq!(row.end, RowEnd::None);
        assert_eq!(item.removed_end, EndSlot::Removed(RowEnd::Hard));
    }

    #[test]
    fn backspace_noop_at_start() {
        let mut row = Row::default_row();
        row.write("abc", false, false, false, false);
        row.cursor.set_content(0);
        assert!(row.backspace().is_none());
    }

    #[test]
    fn sub_chars_stops_at_next_tab() {
        let mut row = Row::default_row();
        row.write("ab\tcd", false, false, false, false);
        row.cursor.set_content(0);
        let (_, deleted, removed) = row.write_line("XY", true, false, false);
        assert_eq!(deleted, 2);
        assert_eq!(removed.as_deref(), Some("ab"));
        assert_eq!(row.content, "XY\tcd");
    }

    #[test]
    fn shift_back_removes_one_tab() {
        let mut row = Row::default_row();
        row.content = "\tcode".to_string();
        let item = row.shift(true).unwrap();
        assert_eq!(row.content, "code");
        assert_eq!(item.diff, -1);
    }

    #[test]
    fn remove_area_to_end_reports_end_removed() {
        let mut row = Row::default_row();
        row.write("hello", false, false, false, false);
        row.end = RowEnd::Hard;
        let (removed, end_slot) = row.remove_area(2, None, true);
        assert_eq!(removed, "llo");
        assert_eq!(end_slot, EndSlot::Removed(RowEnd::Hard));
        assert_eq!(row.content, "he");
        assert_eq!(row.end, RowEnd::None);
    }

    #[test]
    fn remove_area_within_row_end_not_removed() {
        let mut row = Row::default_row();
        row.write("hello", false, false, false, false);
        row.end = RowEnd::Hard;
        let (removed, end_slot) = row.remove_area(1, Some(3), true);
        assert_eq!(removed, "el");
        assert_eq!(end_slot, EndSlot::NotRemoved);
        assert_eq!(row.content, "hlo");
        assert_eq!(row.end, RowEnd::Hard);
    }

    #[test]
    fn replace_tabs_expands_to_blanks() {
        let mut row = Row::default_row();
        row.write("a\tb", false, false, false, false);
        let item = row.replace_tabs(0, None, ' ').unwrap();
        assert_eq!(row.content, "a   b");
        assert_eq!(item.deleted, 3);
    }
}
