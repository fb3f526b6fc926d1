//! Deterministic constrained re-ranking (DetConstSort, Geyik et al. 2019).
//!
//! Given a ranking, group membership, relevance scores and a target share per group,
//! [`ConstrainedReranker::rerank`] builds a top-`k` list in which every prefix of length
//! `p` holds at least `floor(p * target[g])` items of each group `g` (or all of `g`'s
//! items, if it has fewer).
//!
//! The sweep walks an iteration counter `k_iter = 1, 2, ...`. At each step every group
//! whose floor just rose above its placed count contributes its best remaining item.
//! Staged items are appended best-first, then bubbled toward the front past lower-scored
//! items that are still free to move. An item staged at iteration `j` is *settled* at
//! positions `1..=j`: it is never pushed below position `j`. That rule is what keeps the
//! prefix guarantee exact while letting scores order everything the floors leave open.
//!
//! Within a group, items are consumed in descending score order (stable on input
//! order), so the input ranking need not be score-sorted.

use std::collections::BTreeSet;
use std::fmt::Debug;

use tracing::{debug, trace};

use crate::error::{ensure_len, invalid, Error, Result};
use crate::groups::{GroupId, GroupIndex, Membership};

/// Slack allowed when checking that a target distribution sums to at most 1.
const TARGET_SUM_TOL: f64 = 1e-9;

/// Slack added before flooring `k_iter * target[g]`, so shares like `0.3 * 10`
/// are not truncated by representation error.
const FLOOR_EPS: f64 = 1e-9;

/// Iteration numbers at or above this do not fit in `usize`.
const ITER_LIMIT: f64 = usize::MAX as f64;

/// Result of a re-ranking call. All vectors are aligned and have length `k`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reranked<I> {
    pub items: Vec<I>,
    /// Group label of each output item.
    pub groups: Vec<GroupId>,
    /// Relevance score carried over from the input.
    pub scores: Vec<f64>,
}

/// [`Reranked`] plus the sweep's bookkeeping, for tests and audit logs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RerankExplain<I> {
    pub reranked: Reranked<I>,
    /// Iteration at which each output item was staged; item `i` is guaranteed a
    /// position `<= staged_at[i]`.
    pub staged_at: Vec<usize>,
    /// Last iteration the sweep ran.
    pub iterations: usize,
}

impl<I: Clone + Ord + Debug> Reranked<I> {
    /// Item-to-group mapping restricted to the output.
    pub fn membership(&self) -> Result<Membership<I>> {
        Membership::new(self.items.clone(), self.groups.clone())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    // Position in the input ranking.
    src: usize,
    group: usize,
    score: f64,
    staged_at: usize,
}

/// DetConstSort re-ranker for a fixed target distribution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstrainedReranker {
    target: Vec<f64>,
}

impl ConstrainedReranker {
    /// `target[g]` is the minimum share for group label `g`.
    ///
    /// Shares must be finite, non-negative, and sum to at most 1; a larger total would
    /// demand more items per prefix than the prefix has room for.
    pub fn new(target: Vec<f64>) -> Result<Self> {
        if let Some(t) = target.iter().find(|t| !(t.is_finite() && **t >= 0.0)) {
            return Err(invalid(format!("target share {t} is not a finite share")));
        }
        let sum: f64 = target.iter().sum();
        if sum > 1.0 + TARGET_SUM_TOL {
            return Err(Error::InfeasibleDistribution(format!(
                "target shares sum to {sum}, more than 1"
            )));
        }
        Ok(Self { target })
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }

    /// Re-rank `ranking` into a list of length `k`.
    ///
    /// `scores[i]` is the relevance of `ranking[i]`. Errors:
    /// - `ShapeMismatch` if `scores` and `ranking` differ in length, or a group label has
    ///   no entry in the target;
    /// - `InvalidParameter` if `k > ranking.len()` or a score is not finite;
    /// - `DuplicateItem` / `UnknownItem` for malformed rankings;
    /// - `DegenerateGroup` if a positive share names a group absent from the ranking;
    /// - `InfeasibleDistribution` if every group with a positive share runs out of
    ///   items before `k` are placed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ranktune::{ConstrainedReranker, Membership};
    ///
    /// let items: Vec<u32> = (0..6).collect();
    /// let m = Membership::new(items.clone(), vec![0, 0, 0, 0, 1, 1]).unwrap();
    /// let scores = [0.9, 0.8, 0.7, 0.6, 0.5, 0.4];
    /// let rr = ConstrainedReranker::new(vec![0.5, 0.5]).unwrap();
    /// let out = rr.rerank(&items, &m, &scores, 4).unwrap();
    /// // floor(2 * 0.5) = 1: a group-1 item is in the top 2.
    /// assert!(out.groups[..2].contains(&1));
    /// ```
    pub fn rerank<I>(
        &self,
        ranking: &[I],
        membership: &Membership<I>,
        scores: &[f64],
        k: usize,
    ) -> Result<Reranked<I>>
    where
        I: Clone + Ord + Debug,
    {
        self.rerank_explain(ranking, membership, scores, k)
            .map(|e| e.reranked)
    }

    /// Like [`ConstrainedReranker::rerank`], also returning per-item settle bounds.
    pub fn rerank_explain<I>(
        &self,
        ranking: &[I],
        membership: &Membership<I>,
        scores: &[f64],
        k: usize,
    ) -> Result<RerankExplain<I>>
    where
        I: Clone + Ord + Debug,
    {
        ensure_len("scores", ranking.len(), scores.len())?;
        if k > ranking.len() {
            return Err(invalid(format!(
                "k = {k} exceeds ranking length {}",
                ranking.len()
            )));
        }
        if let Some(s) = scores.iter().find(|s| !s.is_finite()) {
            return Err(invalid(format!("relevance score {s} is not finite")));
        }
        let mut seen = BTreeSet::new();
        for item in ranking {
            if !seen.insert(item) {
                return Err(Error::DuplicateItem(format!("{item:?}")));
            }
        }

        let labels = membership.labels_for(ranking)?;
        let index = GroupIndex::from_labels(labels.iter().copied());
        if let Some(&max_label) = index.labels().last() {
            if max_label as usize >= self.target.len() {
                return Err(Error::ShapeMismatch {
                    what: "target_distribution",
                    expected: max_label as usize + 1,
                    actual: self.target.len(),
                });
            }
        }
        for (label, &share) in self.target.iter().enumerate() {
            if share > 0.0 && index.index_of(label as GroupId).is_none() {
                return Err(Error::DegenerateGroup(label as GroupId));
            }
        }

        let share: Vec<f64> = index
            .labels()
            .iter()
            .map(|&l| self.target[l as usize])
            .collect();

        // Per-group supply, best first.
        let mut supply: Vec<Vec<usize>> = vec![Vec::new(); index.len()];
        let mut dense = Vec::with_capacity(labels.len());
        for (pos, &l) in labels.iter().enumerate() {
            let g = index.index_of(l).unwrap_or(0);
            dense.push(g);
            supply[g].push(pos);
        }
        for s in &mut supply {
            s.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then_with(|| a.cmp(&b)));
        }

        debug!(
            items = ranking.len(),
            groups = index.len(),
            k,
            "constrained rerank start"
        );

        let (slots, iterations) = sweep(&supply, &share, scores, k)?;

        let mut reranked = Reranked {
            items: Vec::with_capacity(k),
            groups: Vec::with_capacity(k),
            scores: Vec::with_capacity(k),
        };
        let mut staged_at = Vec::with_capacity(k);
        for slot in slots.into_iter().take(k) {
            reranked.items.push(ranking[slot.src].clone());
            reranked.groups.push(index.label(dense[slot.src]));
            reranked.scores.push(slot.score);
            staged_at.push(slot.staged_at);
        }
        debug!(placed = reranked.len(), iterations, "constrained rerank done");
        Ok(RerankExplain {
            reranked,
            staged_at,
            iterations,
        })
    }
}

/// The DetConstSort sweep over dense groups. Returns at least `k` slots (possibly more:
/// the last iteration is completed before stopping) and the final iteration number.
fn sweep(
    supply: &[Vec<usize>],
    share: &[f64],
    scores: &[f64],
    k: usize,
) -> Result<(Vec<Slot>, usize)> {
    let groups = supply.len();
    let mut placed = vec![0usize; groups];
    let mut out: Vec<Slot> = Vec::with_capacity(k);
    let mut k_iter = 0usize;

    while out.len() < k {
        // First iteration at which some group with supply gets a higher floor. A share so
        // small that its next floor lies past `usize::MAX` can never be staged.
        let next_change = (0..groups)
            .filter(|&g| share[g] > 0.0 && placed[g] < supply[g].len())
            .map(|g| (((placed[g] + 1) as f64 - FLOOR_EPS) / share[g]).ceil())
            .filter(|&at| at.is_finite() && at < ITER_LIMIT)
            .map(|at| at as usize)
            .min();
        let Some(next_change) = next_change else {
            return Err(Error::InfeasibleDistribution(format!(
                "placed {} of {k} items before every positively-weighted group ran out",
                out.len()
            )));
        };
        // Skipped iterations would stage nothing; step back one to absorb rounding.
        k_iter = k_iter.saturating_add(1).max(next_change.saturating_sub(1));

        let mut staged: Vec<Slot> = (0..groups)
            .filter(|&g| {
                let floor = (k_iter as f64 * share[g] + FLOOR_EPS).floor() as usize;
                placed[g] < floor && placed[g] < supply[g].len()
            })
            .map(|g| {
                let src = supply[g][placed[g]];
                Slot {
                    src,
                    group: g,
                    score: scores[src],
                    staged_at: k_iter,
                }
            })
            .collect();
        if staged.is_empty() {
            if k_iter == usize::MAX {
                return Err(Error::InfeasibleDistribution(format!(
                    "placed {} of {k} items when the iteration counter ran out",
                    out.len()
                )));
            }
            continue;
        }
        staged.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.src.cmp(&b.src)));
        trace!(k_iter, staged = staged.len(), placed = out.len(), "stage");

        for slot in staged {
            placed[slot.group] += 1;
            out.push(slot);
            let mut start = out.len() - 1;
            // out[start - 1] may move to 0-based `start` only if it stays within its
            // settle bound: staged_at >= start + 1.
            while start > 0
                && out[start - 1].staged_at > start
                && out[start - 1].score < out[start].score
            {
                out.swap(start - 1, start);
                start -= 1;
            }
        }
    }
    Ok((out, k_iter))
}
