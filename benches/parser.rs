//! Tokenizer benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use termframe::parser::Tokenizer;

fn bench_tokenize(c: &mut Criterion, name: &str, input: &[u8]) {
    let mut group = c.benchmark_group("tokenizer");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function(name, |b| {
        b.iter(|| {
            let mut tokenizer = Tokenizer::new();
            let mut count = 0usize;
            tokenizer.parse(black_box(input), |token| {
                black_box(token);
                count += 1;
            });
            count
        })
    });
    group.finish();
}

fn bench_plain_text(c: &mut Criterion) {
    bench_tokenize(c, "plain_text", "Hello, World! ".repeat(1000).as_bytes());
}

fn bench_csi_sequences(c: &mut Criterion) {
    let input = "\x1b[1;31mRed\x1b[0m \x1b[5;10H\x1b[2J".repeat(100);
    bench_tokenize(c, "csi_sequences", input.as_bytes());
}

fn bench_mixed(c: &mut Criterion) {
    let input = "Line 1: \x1b[32mOK\x1b[0m\r\nLine 2: \x1b[31mERROR\x1b[0m\r\n".repeat(500);
    bench_tokenize(c, "mixed_content", input.as_bytes());
}

fn bench_utf8(c: &mut Criterion) {
    bench_tokenize(c, "utf8_content", "Hello, 世界! 🎉 ".repeat(500).as_bytes());
}

fn bench_streamed_osc(c: &mut Criterion) {
    let mut input = b"\x1b]abc123;5;name=blob.bin;".to_vec();
    input.extend(std::iter::repeat(b'x').take(256 * 1024));
    input.push(0x07);
    bench_tokenize(c, "streamed_osc", &input);
}

criterion_group!(
    benches,
    bench_plain_text,
    bench_csi_sequences,
    bench_mixed,
    bench_utf8,
    bench_streamed_osc
);
criterion_main!(benches);
