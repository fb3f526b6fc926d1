//! Property and integration tests for RankGenerator.

use std::collections::BTreeMap;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use ranktune::{GeneratorConfig, GroupId, RankGenerator};

fn universe(counts: &[usize]) -> (Vec<u32>, Vec<GroupId>) {
    let mut items = Vec::new();
    let mut groups = Vec::new();
    for (g, &c) in counts.iter().enumerate() {
        for _ in 0..c {
            items.push(items.len() as u32);
            groups.push(g as GroupId);
        }
    }
    (items, groups)
}

fn tally(groups: &[GroupId]) -> BTreeMap<GroupId, usize> {
    let mut m = BTreeMap::new();
    for &g in groups {
        *m.entry(g).or_insert(0) += 1;
    }
    m
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    /// Every replicate is a permutation of the universe, with labels carried over.
    #[test]
    fn output_is_a_permutation(
        counts in proptest::collection::vec(1usize..15, 1..5),
        phi in 0.0f64..=1.0,
        replicates in 1usize..4,
        seed in any::<u64>(),
    ) {
        let (items, groups) = universe(&counts);
        let gen = RankGenerator::from_items(items.clone(), groups).unwrap();
        let out = gen
            .generate(&GeneratorConfig { phi, replicates, seed, ..Default::default() })
            .unwrap();
        prop_assert_eq!(out.rankings.len(), replicates);
        for (col, labels) in out.rankings.iter().zip(out.groups.iter()) {
            let mut sorted = col.to_vec();
            sorted.sort_unstable();
            prop_assert_eq!(&sorted, &items);
            for (item, label) in col.iter().zip(labels) {
                prop_assert_eq!(out.membership.group_of(item), Some(*label));
            }
        }
    }

    /// Per-group counts in every ranking match the apportioned universe.
    #[test]
    fn group_counts_are_conserved(
        raw in proptest::collection::vec(1u32..20, 2..5),
        n in 20usize..120,
        phi in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let total: u32 = raw.iter().sum();
        let props: Vec<f64> = raw.iter().map(|&w| w as f64 / total as f64).collect();
        // A tiny share can round to zero members; that is a rejected input.
        let Ok(gen) = RankGenerator::from_proportions(&props, n) else {
            return Ok(());
        };
        let sizes = gen.membership().group_sizes();
        prop_assert_eq!(sizes.values().sum::<usize>(), n);
        for (g, &c) in &sizes {
            let quota = props[*g as usize] * n as f64;
            prop_assert!((c as f64 - quota).abs() < 1.0 + 1e-9);
        }
        let out = gen.generate(&GeneratorConfig { phi, seed, ..Default::default() }).unwrap();
        prop_assert_eq!(tally(out.groups.column(0).unwrap()), sizes);
    }

    /// phi_scaled rises monotonically from the minority share to 1.
    #[test]
    fn phi_scaled_is_monotone(
        counts in proptest::collection::vec(1usize..30, 2..5),
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
    ) {
        let (items, groups) = universe(&counts);
        let gen = RankGenerator::from_items(items, groups).unwrap();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let m = *counts.iter().min().unwrap() as f64 / counts.iter().sum::<usize>() as f64;
        let p_lo = gen.plan(lo).unwrap().phi_scaled();
        let p_hi = gen.plan(hi).unwrap().phi_scaled();
        prop_assert!(p_lo <= p_hi + 1e-12);
        prop_assert!(p_lo >= m - 1e-12 && p_hi <= 1.0 + 1e-12);
        prop_assert!((gen.plan(0.0).unwrap().phi_scaled() - m).abs() < 1e-12);
        prop_assert_eq!(gen.plan(1.0).unwrap().phi_scaled(), 1.0);
    }

    /// At the boundaries, the same seed reproduces the same batch.
    #[test]
    fn boundary_phi_is_reproducible(
        counts in proptest::collection::vec(1usize..20, 1..4),
        full in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let (items, groups) = universe(&counts);
        let gen = RankGenerator::from_items(items, groups).unwrap();
        let phi = if full { 1.0 } else { 0.0 };
        let cfg = GeneratorConfig { phi, replicates: 2, seed, ..Default::default() };
        prop_assert_eq!(gen.plan(phi).unwrap(), gen.plan(phi).unwrap());
        prop_assert_eq!(gen.generate(&cfg).unwrap(), gen.generate(&cfg).unwrap());
    }

    /// At phi = 1 the minority fills the top of the list.
    #[test]
    fn full_bias_segregates_minority(
        counts in proptest::collection::vec(1usize..20, 2..4),
        seed in any::<u64>(),
    ) {
        let (items, groups) = universe(&counts);
        let gen = RankGenerator::from_items(items, groups).unwrap();
        let plan = gen.plan(1.0).unwrap();
        let minority = plan.minority();
        let n_min = counts[minority as usize];
        let out = gen
            .generate(&GeneratorConfig { phi: 1.0, seed, ..Default::default() })
            .unwrap();
        let labels = out.groups.column(0).unwrap();
        prop_assert!(labels[..n_min].iter().all(|&g| g == minority));
    }
}

// ---------------------------------------------------------------------------
// Integration
// ---------------------------------------------------------------------------

#[test]
fn make_rank_with_caller_rng_matches_replicate_zero() {
    let gen = RankGenerator::from_proportions(&[0.3, 0.7], 30).unwrap();
    let cfg = GeneratorConfig {
        phi: 0.4,
        seed: 5,
        ..Default::default()
    };
    let plan = gen.plan(cfg.phi).unwrap();
    let mut rng = StdRng::seed_from_u64(ranktune::replicate_seed(cfg.seed, 0));
    let direct = gen.make_rank(&plan, false, &mut rng);
    let batched = gen.generate(&cfg).unwrap();
    assert_eq!(batched.rankings.column(0).unwrap(), direct.as_slice());
}

#[test]
fn adjacent_seeds_share_no_replicate() {
    let gen = RankGenerator::from_proportions(&[0.5, 0.5], 40).unwrap();
    let run = |seed: u64| {
        gen.generate(&GeneratorConfig {
            phi: 0.0,
            replicates: 4,
            seed,
            ..Default::default()
        })
        .unwrap()
    };
    for s in [0u64, 6, 1000] {
        let a = run(s);
        let b = run(s + 1);
        for x in a.rankings.iter() {
            for y in b.rankings.iter() {
                assert_ne!(x, y, "seeds {s} and {} repeat a column", s + 1);
            }
        }
    }
}

#[test]
fn stronger_bias_lifts_minority_exposure() {
    let gen = RankGenerator::from_proportions(&[0.8, 0.2], 200).unwrap();
    let mean_minority_pos = |phi: f64| {
        let out = gen
            .generate(&GeneratorConfig {
                phi,
                replicates: 20,
                seed: 17,
                ..Default::default()
            })
            .unwrap();
        let mut sum = 0usize;
        let mut n = 0usize;
        for labels in out.groups.iter() {
            for (pos, &g) in labels.iter().enumerate() {
                if g == 1 {
                    sum += pos;
                    n += 1;
                }
            }
        }
        sum as f64 / n as f64
    };
    let fair = mean_minority_pos(0.0);
    let biased = mean_minority_pos(0.9);
    assert!(biased < fair, "biased {biased} fair {fair}");
    // Fully biased: minority occupies ranks 0..40, mean 19.5.
    assert!((mean_minority_pos(1.0) - 19.5).abs() < 1e-12);
}
