use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ranktune::{GeneratorConfig, RankGenerator};
use std::hint::black_box;

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for &n_items in &[100usize, 1_000, 10_000] {
        let gen = RankGenerator::from_proportions(&[0.5, 0.3, 0.2], n_items).unwrap();

        for &phi in &[0.0f64, 0.5, 1.0] {
            let cfg = GeneratorConfig {
                phi,
                replicates: 4,
                seed: 123,
                ..Default::default()
            };
            group.bench_with_input(
                BenchmarkId::new(format!("phi{phi}"), n_items),
                &n_items,
                |b, &_n| {
                    b.iter(|| {
                        let out = gen.generate(black_box(&cfg)).unwrap();
                        black_box(out);
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);
