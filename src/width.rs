//! Visual-width and tab arithmetic shared by [`crate::row::Row`] and [`crate::row_cursor::RowCursor`].
//!
//! Computes per-character cell widths per UAX #11 via `unicode-width`, and expands `'\t'` to
//! the next tab stop for a given tab size. This is the sole place width math lives; both the
//! row's raster cache and the cursor's content/visual translation build on it.

use unicode_width::UnicodeWidthChar;

/// Default tab size (in cells) used when a row does not specify one.
pub const DEFAULT_TAB_SIZE: usize = 4;

/// Visual width (in cells) of a single character, ignoring tab expansion.
///
/// - `1` for narrow characters (ASCII, etc).
/// - `2` for wide characters (CJK, fullwidth, etc).
/// - `0` for zero-width characters (combining marks, etc).
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(1)
}

/// Visual width (in cells) of `ch` at a given cell offset within its row, expanding `'\t'`
/// to the next tab stop.
pub fn cell_width_at(ch: char, cell_offset: usize, tab_size: usize) -> usize {
    if ch == '\t' {
        let tab_size = tab_size.max(1);
        let rem = cell_offset % tab_size;
        tab_size - rem
    } else {
        char_width(ch)
    }
}

/// Total visual width of `s`, expanding tabs with `tab_size`.
pub fn str_width(s: &str, tab_size: usize) -> usize {
    let mut x = 0usize;
    for ch in s.chars() {
        x = x.saturating_add(cell_width_at(ch, x, tab_size));
    }
    x
}

/// Visual cell offset of the given character `column` within `content`, expanding tabs.
///
/// `column` is counted in `char`s, not bytes.
pub fn visual_x_for_column(content: &str, column: usize, tab_size: usize) -> usize {
    let mut x = 0usize;
    for ch in content.chars().take(column) {
        x = x.saturating_add(cell_width_at(ch, x, tab_size));
    }
    x
}

/// Inverse of [`visual_x_for_column`]: the character column whose visual cell offset is the
/// closest to `visual` without exceeding it. Returns `content.chars().count()` if `visual`
/// is beyond the row's visual width.
pub fn column_for_visual_x(content: &str, visual: usize, tab_size: usize) -> usize {
    let mut x = 0usize;
    for (column, ch) in content.chars().enumerate() {
        let w = cell_width_at(ch, x, tab_size);
        if x.saturating_add(w) > visual {
            return column;
        }
        x += w;
    }
    content.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_expands_to_next_stop() {
        assert_eq!(cell_width_at('\t', 0, 4), 4);
        assert_eq!(cell_width_at('\t', 1, 4), 3);
        assert_eq!(cell_width_at('\t', 4, 4), 4);
    }

    #[test]
    fn wide_char_counts_two_cells() {
        assert_eq!(char_width('漢'), 2);
    }

    #[test]
    fn visual_and_column_round_trip_ascii() {
        let s = "ab\tcd";
        let v = visual_x_for_column(s, s.chars().count(), 4);
        assert_eq!(v, 2 + 2 + 2); // "ab" (2) + tab to col4 (2) + "cd" (2)
        assert_eq!(column_for_visual_x(s, 0, 4), 0);
        assert_eq!(column_for_visual_x(s, 2, 4), 2);
    }
}
