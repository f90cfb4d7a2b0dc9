//! Minimal in-memory editing session: no swap, no history, just the row window.

use buffer_core::buffer::{TextBuffer, TextBufferConfig};

fn main() {
    let mut buffer = TextBuffer::new(TextBufferConfig::default());
    buffer.write("fn main() {\n    println!(\"hi\");\n}\n").unwrap();
    for (i, row) in buffer.window().iter().enumerate() {
        println!("{i:>3}: {:?}", row.content);
    }
    println!("eof = {:?}", buffer.eof());
}
