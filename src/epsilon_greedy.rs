//! Epsilon-greedy randomized re-ranking (Feng & Shah baseline).
//!
//! Walks the ranking top to bottom; at each position, with probability `epsilon`, the
//! item there is swapped with a uniformly chosen item further down. The last position
//! is never swapped. Group labels and scores travel with their items.
//!
//! Useful as a seedable baseline against [`crate::ConstrainedReranker`]: it spreads
//! exposure without looking at groups at all.

use std::fmt::Debug;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use tracing::debug;

use crate::error::{ensure_len, invalid, Result};
use crate::groups::Membership;
use crate::rerank::Reranked;

/// Configuration for [`EpsilonGreedy`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpsilonGreedyConfig {
    /// Per-position swap probability in `[0, 1]`.
    pub epsilon: f64,
    /// Seed for [`EpsilonGreedy::rerank`].
    pub seed: u64,
}

impl Default for EpsilonGreedyConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.1,
            seed: 0,
        }
    }
}

/// Seedable epsilon-greedy re-ranker.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    cfg: EpsilonGreedyConfig,
}

impl EpsilonGreedy {
    pub fn new(cfg: EpsilonGreedyConfig) -> Result<Self> {
        if !(cfg.epsilon.is_finite() && (0.0..=1.0).contains(&cfg.epsilon)) {
            return Err(invalid(format!(
                "epsilon must be in [0, 1], got {}",
                cfg.epsilon
            )));
        }
        Ok(Self { cfg })
    }

    pub fn config(&self) -> EpsilonGreedyConfig {
        self.cfg
    }

    /// Re-rank with an RNG seeded from the config.
    pub fn rerank<I>(
        &self,
        ranking: &[I],
        membership: &Membership<I>,
        scores: &[f64],
    ) -> Result<Reranked<I>>
    where
        I: Clone + Ord + Debug,
    {
        let mut rng = StdRng::seed_from_u64(self.cfg.seed);
        self.rerank_with_rng(ranking, membership, scores, &mut rng)
    }

    /// Re-rank with a caller-owned RNG.
    pub fn rerank_with_rng<I, R>(
        &self,
        ranking: &[I],
        membership: &Membership<I>,
        scores: &[f64],
        rng: &mut R,
    ) -> Result<Reranked<I>>
    where
        I: Clone + Ord + Debug,
        R: Rng + ?Sized,
    {
        ensure_len("scores", ranking.len(), scores.len())?;
        let groups = membership.labels_for(ranking)?;

        let n = ranking.len();
        let mut order: Vec<usize> = (0..n).collect();
        let mut swaps = 0usize;
        for i in 0..n {
            let p: f64 = rng.random();
            if p <= self.cfg.epsilon && i + 1 < n {
                let j = rng.random_range(i + 1..n);
                order.swap(i, j);
                swaps += 1;
            }
        }
        debug!(items = n, epsilon = self.cfg.epsilon, swaps, "epsilon-greedy rerank");

        Ok(Reranked {
            items: order.iter().map(|&i| ranking[i].clone()).collect(),
            groups: order.iter().map(|&i| groups[i]).collect(),
            scores: order.iter().map(|&i| scores[i]).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn fixture() -> (Vec<u32>, Membership<u32>, Vec<f64>) {
        let items: Vec<u32> = (0..20).collect();
        let groups = items.iter().map(|i| i % 3).collect();
        let m = Membership::new(items.clone(), groups).unwrap();
        let scores = items.iter().map(|&i| 1.0 - i as f64 / 20.0).collect();
        (items, m, scores)
    }

    #[test]
    fn zero_epsilon_is_identity() {
        let (items, m, scores) = fixture();
        let eg = EpsilonGreedy::new(EpsilonGreedyConfig {
            epsilon: 0.0,
            seed: 5,
        })
        .unwrap();
        let out = eg.rerank(&items, &m, &scores).unwrap();
        assert_eq!(out.items, items);
        assert_eq!(out.scores, scores);
    }

    #[test]
    fn output_is_a_permutation_with_carried_fields() {
        let (items, m, scores) = fixture();
        let eg = EpsilonGreedy::new(EpsilonGreedyConfig {
            epsilon: 0.7,
            seed: 11,
        })
        .unwrap();
        let out = eg.rerank(&items, &m, &scores).unwrap();
        let mut sorted = out.items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, items);
        assert_ne!(out.items, items);
        for ((item, g), s) in out.items.iter().zip(&out.groups).zip(&out.scores) {
            assert_eq!(*g, item % 3);
            assert_eq!(*s, 1.0 - *item as f64 / 20.0);
        }
        // Seeded: same output twice.
        assert_eq!(out, eg.rerank(&items, &m, &scores).unwrap());
    }

    #[test]
    fn rejects_bad_epsilon_and_shapes() {
        assert!(EpsilonGreedy::new(EpsilonGreedyConfig {
            epsilon: 1.5,
            seed: 0
        })
        .is_err());
        let (items, m, scores) = fixture();
        let eg = EpsilonGreedy::new(EpsilonGreedyConfig::default()).unwrap();
        assert!(matches!(
            eg.rerank(&items, &m, &scores[..3]),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
