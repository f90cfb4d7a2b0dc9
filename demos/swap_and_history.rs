//! A paged buffer with undo/redo: writes past the trimmer's `rows_max` push rows into an
//! in-memory swap store, and every edit is reversible.

use buffer_core::buffer::{TextBuffer, TextBufferConfig};
use buffer_core::history::HistoryConfig;
use buffer_core::swap::Swap;
use buffer_core::trimmer::Trimmer;

fn main() {
    env_logger::init();
    let swap = Swap::in_memory().unwrap();
    let trimmer = Trimmer::swap(16, 8, false).unwrap();
    let mut buffer = TextBuffer::new(TextBufferConfig::default())
        .with_swap(swap)
        .with_trimmer(trimmer)
        .unwrap()
        .with_history(HistoryConfig::default())
        .unwrap();

    for i in 0..40 {
        buffer.write(&format!("line {i}\n")).unwrap();
    }
    println!("window holds {} rows after 40 writes", buffer.window().len());

    for _ in 0..5 {
        buffer.undo().unwrap();
    }
    println!("window holds {} rows after 5 undos", buffer.window().len());
}
