use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ranktune::{ConstrainedReranker, GeneratorConfig, RankGenerator};
use std::hint::black_box;

fn bench_rerank(c: &mut Criterion) {
    let rr = ConstrainedReranker::new(vec![0.5, 0.3, 0.2]).unwrap();

    let mut group = c.benchmark_group("rerank");
    for &n_items in &[100usize, 1_000, 10_000] {
        // A strongly biased input, so the floors do real work.
        let gen = RankGenerator::from_proportions(&[0.5, 0.3, 0.2], n_items).unwrap();
        let out = gen
            .generate(&GeneratorConfig {
                phi: 0.9,
                seed: 7,
                ..Default::default()
            })
            .unwrap();
        let ranking = out.rankings.column(0).unwrap().to_vec();
        let scores: Vec<f64> = (0..n_items).map(|i| 1.0 - i as f64 / n_items as f64).collect();

        group.bench_with_input(BenchmarkId::new("full", n_items), &n_items, |b, &n| {
            b.iter(|| {
                let r = rr
                    .rerank(black_box(&ranking), &out.membership, &scores, n)
                    .unwrap();
                black_box(r);
            })
        });

        group.bench_with_input(BenchmarkId::new("top10", n_items), &n_items, |b, &_n| {
            b.iter(|| {
                let r = rr
                    .rerank(black_box(&ranking), &out.membership, &scores, 10)
                    .unwrap();
                black_box(r);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rerank);
criterion_main!(benches);
