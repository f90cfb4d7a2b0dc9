//! End-to-end scenario tests, plus the named boundary cases.

use buffer_core::buffer::{TextBuffer, TextBufferConfig};
use buffer_core::history::HistoryConfig;
use buffer_core::interfaces::{MarkerIF, RangeEnd};
use buffer_core::trimmer::Trimmer;
use std::cell::RefCell;
use std::rc::Rc;

struct VecMarker(Rc<RefCell<Vec<(usize, usize)>>>);

impl MarkerIF for VecMarker {
    fn adjust(&mut self, start: usize, diff: isize, range_end: RangeEnd) {
        let shift = |c: &mut usize| {
            let collapsed = match range_end {
                RangeEnd::Unaffected => false,
                RangeEnd::ToDocumentEnd => *c >= start,
                RangeEnd::At(stop) => *c >= start && *c < stop,
            };
            if collapsed {
                *c = start;
            } else if *c >= start {
                *c = (*c as isize + diff).max(0) as usize;
            }
        };
        for (s, e) in self.0.borrow_mut().iter_mut() {
            shift(s);
            shift(e);
        }
    }

    fn restore_snapshot(&mut self, snapshot: &[(usize, usize)]) {
        *self.0.borrow_mut() = snapshot.to_vec();
    }

    fn snapshot(&self) -> Vec<(usize, usize)> {
        self.0.borrow().clone()
    }
}

fn document_text(buf: &TextBuffer) -> String {
    buf.window().iter().map(|r| r.content.clone()).collect::<Vec<_>>().join("|")
}

#[test]
fn scenario_write_then_undo() {
    let mut buf = TextBuffer::new(TextBufferConfig::default()).with_history(HistoryConfig::default()).unwrap();
    buf.write("hello\nworld").unwrap();
    assert_eq!(document_text(&buf), "hello|world");
    buf.undo().unwrap();
    assert_eq!(document_text(&buf), "");
}

#[test]
fn scenario_marker_adjust_across_remove() {
    let marks = Rc::new(RefCell::new(vec![(5usize, 10usize)]));
    let mut buf = TextBuffer::new(TextBufferConfig::default()).with_marker(Box::new(VecMarker(marks.clone())));
    buf.write("0123456789ABCDEF").unwrap();
    buf.remove(2, Some(6)).unwrap();
    assert_eq!(*marks.borrow(), vec![(2, 6)]);
}

#[test]
fn scenario_restrictive_trim_then_undo_reinserts_row() {
    let trimmer = Trimmer::restrictive(3).unwrap();
    let mut buf = TextBuffer::new(TextBufferConfig::default())
        .with_trimmer(trimmer)
        .unwrap()
        .with_history(HistoryConfig::default())
        .unwrap();
    buf.write("1\n2\n3\n4").unwrap();
    assert_eq!(document_text(&buf), "1|2|3");
    buf.undo().unwrap();
    assert_eq!(document_text(&buf), "1|2|3|4");
}

#[test]
fn boundary_backspace_at_origin_is_noop() {
    let mut buf = TextBuffer::new(TextBufferConfig::default());
    buf.backspace().unwrap();
    assert_eq!(document_text(&buf), "");
}

#[test]
fn boundary_goto_data_negative_errors() {
    let mut buf = TextBuffer::new(TextBufferConfig::default());
    assert!(buf.goto_data(-1).is_err());
}

#[test]
fn boundary_newline_at_end_produces_trailing_empty_row() {
    let mut buf = TextBuffer::new(TextBufferConfig::default());
    buf.write("hello\n").unwrap();
    assert_eq!(buf.window().len(), 2);
    assert_eq!(buf.window()[1].content, "");
}

#[test]
fn trimmer_rejects_rows_max_violating_half_chunk_rule() {
    assert!(Trimmer::swap(7, 4, false).is_err());
}
