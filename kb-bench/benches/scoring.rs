use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kb_core::SLOTS;

fn gen_columns(n: usize) -> Vec<[u8; SLOTS]> {
    // Simple deterministic xorshift64, no rand dependency.
    let mut x: u64 = 0x1234_5678_9ABC_DEF0;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let mut col = [0u8; SLOTS];
        for c in &mut col {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            // Leave some slots empty for representative columns.
            *c = (x % 7) as u8;
        }
        out.push(col);
    }
    out
}

fn bench_column_score(c: &mut Criterion) {
    let mut g = c.benchmark_group("kb_core_scoring");
    for &n in &[256usize, 4096usize] {
        let samples = gen_columns(n);
        g.bench_with_input(BenchmarkId::new("column_score_batch", n), &samples, |b, s| {
            b.iter(|| {
                for col in s.iter() {
                    black_box(kb_core::column_score(black_box(col)));
                }
            })
        });
    }
    g.finish();
}

criterion_group!(benches, bench_column_score);
criterion_main!(benches);
