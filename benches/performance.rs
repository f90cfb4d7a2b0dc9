//! Throughput benchmarks for the swap paging engine and the history log.

use buffer_core::buffer::{TextBuffer, TextBufferConfig};
use buffer_core::history::HistoryConfig;
use buffer_core::trimmer::Trimmer;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_sequential_write(c: &mut Criterion) {
    c.bench_function("sequential_write_10k_chars", |b| {
        b.iter(|| {
            let mut buf = TextBuffer::new(TextBufferConfig::default());
            for _ in 0..200 {
                buf.write(black_box("0123456789\n")).unwrap();
            }
            black_box(buf.window().len());
        });
    });
}

fn bench_swap_paged_insert(c: &mut Criterion) {
    c.bench_function("swap_paged_insert_2k_rows", |b| {
        b.iter(|| {
            let swap = buffer_core::Swap::in_memory().unwrap();
            let trimmer = Trimmer::swap(32, 16, false).unwrap();
            let mut buf = TextBuffer::new(TextBufferConfig::default()).with_swap(swap).with_trimmer(trimmer).unwrap();
            for i in 0..2000 {
                buf.write(black_box(&format!("line {i}\n"))).unwrap();
            }
            black_box(buf.window().len());
        });
    });
}

fn bench_undo_redo_churn(c: &mut Criterion) {
    c.bench_function("undo_redo_1k_writes", |b| {
        b.iter(|| {
            let mut buf = TextBuffer::new(TextBufferConfig::default()).with_history(HistoryConfig::default()).unwrap();
            for i in 0..1000 {
                buf.write(black_box(&format!("{i}"))).unwrap();
            }
            for _ in 0..1000 {
                let _ = buf.undo();
            }
            black_box(buf.window().len());
        });
    });
}

criterion_group!(benches, bench_sequential_write, bench_swap_paged_insert, bench_undo_redo_churn);
criterion_main!(benches);
