//! Fairness metrics over a batch of rankings.
//!
//! Every metric is a pure reduction of `(rankings, membership)` plus method-specific
//! inputs. Group-level metrics build one value per group on the membership's dense
//! [`GroupIndex`] and collapse it with a [`Combination`]; the per-group vector is
//! returned keyed by the caller's labels.
//!
//! Columns of a [`RankingBatch`] may have different lengths. Position weights are
//! computed per column, so a short column simply contributes fewer positions.
//!
//! | metric | per-group value |
//! |---|---|
//! | [`exp`] | summed `1/log2(k+1)` exposure / group size |
//! | [`expu`] | mean exposure / mean relevance |
//! | [`expru`] | mean CTR / mean relevance |
//! | [`eed`] | mean exposure (L2 norm, no combination) |
//! | [`awrf`] | mean geometric attention |
//! | [`arp`] | favored-pair representation |
//! | [`erbe`] / [`erbp`] / [`erbr`] | RBP exposure: raw / per member / per relevant item |
//!
//! [`iaa`] and [`ndkl`] are scalar only.

use std::collections::BTreeMap;
use std::fmt::Debug;

use tracing::trace;

use crate::combine::Combination;
use crate::error::{ensure_len, invalid, Error, Result};
use crate::groups::{GroupId, GroupIndex, Membership};
use crate::position::{
    attention_at_positions, exposure_at_positions, favored_pairs_at_positions, pair_count,
    rbp_at_positions,
};
use crate::ranking::{RankingBatch, ScoreBatch};

/// Smoothing added to both distributions in [`ndkl`].
pub const NDKL_EPSILON: f64 = 1e-7;

/// A combined metric value plus the per-group vector it was reduced from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricValue {
    pub value: f64,
    pub per_group: BTreeMap<GroupId, f64>,
}

impl MetricValue {
    fn combined(index: &GroupIndex, vals: &[f64], combo: Combination) -> Self {
        Self {
            value: combo.apply(vals),
            per_group: index.to_labeled(vals),
        }
    }
}

/// Membership resolved to dense indices, plus per-group member counts.
struct Dense {
    index: GroupIndex,
    sizes: Vec<f64>,
}

impl Dense {
    fn new<I: Clone + Ord + Debug>(membership: &Membership<I>) -> Result<Self> {
        if membership.is_empty() {
            return Err(invalid("membership is empty"));
        }
        let index = membership.group_index();
        let mut sizes = vec![0.0; index.len()];
        for &g in membership.groups() {
            sizes[dense_of(&index, g)?] += 1.0;
        }
        Ok(Self { index, sizes })
    }

    fn zeros(&self) -> Vec<f64> {
        vec![0.0; self.index.len()]
    }

    /// Dense group of every ranked item in `column`.
    fn column_groups<I: Clone + Ord + Debug>(
        &self,
        membership: &Membership<I>,
        column: &[I],
    ) -> Result<Vec<usize>> {
        membership
            .labels_for(column)?
            .into_iter()
            .map(|g| dense_of(&self.index, g))
            .collect()
    }

    /// `num[g] / den[g]`, failing on a zero denominator.
    fn divide(&self, num: &[f64], den: &[f64]) -> Result<Vec<f64>> {
        num.iter()
            .zip(den)
            .enumerate()
            .map(|(g, (n, d))| {
                if *d == 0.0 {
                    Err(Error::DegenerateGroup(self.index.label(g)))
                } else {
                    Ok(n / d)
                }
            })
            .collect()
    }
}

fn dense_of(index: &GroupIndex, label: GroupId) -> Result<usize> {
    index
        .index_of(label)
        .ok_or(Error::DegenerateGroup(label))
}

/// Sum `weights(len)[pos]` into the group of each ranked item, over every column.
fn accumulate<I, W>(
    rankings: &RankingBatch<I>,
    membership: &Membership<I>,
    dense: &Dense,
    weights: W,
) -> Result<Vec<f64>>
where
    I: Clone + Ord + Debug,
    W: Fn(usize) -> Vec<f64>,
{
    let mut totals = dense.zeros();
    for column in rankings.iter() {
        let groups = dense.column_groups(membership, column)?;
        let w = weights(column.len());
        for (g, w) in groups.into_iter().zip(w) {
            totals[g] += w;
        }
    }
    Ok(totals)
}

/// Sum aligned score cells into the group of each ranked item.
fn accumulate_scores<I>(
    rankings: &RankingBatch<I>,
    membership: &Membership<I>,
    dense: &Dense,
    scores: &ScoreBatch,
    what: &'static str,
    range: (f64, f64),
) -> Result<Vec<f64>>
where
    I: Clone + Ord + Debug,
{
    ensure_len(what, rankings.len(), scores.len())?;
    let mut totals = dense.zeros();
    for (column, vals) in rankings.iter().zip(scores.iter()) {
        ensure_len(what, column.len(), vals.len())?;
        let groups = dense.column_groups(membership, column)?;
        for (g, &v) in groups.into_iter().zip(vals) {
            if !(v >= range.0 && v <= range.1) {
                return Err(invalid(format!(
                    "{what} value {v} outside [{}, {}]",
                    range.0, range.1
                )));
            }
            totals[g] += v;
        }
    }
    Ok(totals)
}

fn check_decay(decay: f64) -> Result<()> {
    if !(0.0..1.0).contains(&decay) {
        return Err(invalid(format!("decay must be in [0, 1), got {decay}")));
    }
    Ok(())
}

/// Group exposure (Singh & Joachims; Diaz et al.).
///
/// Per group: total `1/log2(k+1)` exposure over all columns divided by the group's
/// member count, then combined.
///
/// # Example
///
/// ```rust
/// use ranktune::metrics::exp;
/// use ranktune::{Combination, Membership, RankingBatch};
///
/// let m = Membership::new(vec![0, 1, 2, 3], vec![0, 1, 0, 1]).unwrap();
/// let r = RankingBatch::single(vec![0, 1, 2, 3]);
/// let out = exp(&r, &m, Combination::MinMaxRatio).unwrap();
/// // Group 0 holds ranks 1 and 3, so it sees more exposure.
/// assert!(out.per_group[&0] > out.per_group[&1]);
/// assert!(out.value > 0.7 && out.value < 0.75);
/// assert_eq!(out.per_group.len(), 2);
/// ```
pub fn exp<I>(
    rankings: &RankingBatch<I>,
    membership: &Membership<I>,
    combo: Combination,
) -> Result<MetricValue>
where
    I: Clone + Ord + Debug,
{
    let dense = Dense::new(membership)?;
    let totals = accumulate(rankings, membership, &dense, exposure_at_positions)?;
    let vals = dense.divide(&totals, &dense.sizes)?;
    trace!(?vals, "exp");
    Ok(MetricValue::combined(&dense.index, &vals, combo))
}

/// Exposure per unit of relevance. `relevance` is aligned with `rankings` and must lie
/// in `[0, 1]`; a group with zero total relevance is `DegenerateGroup`.
pub fn expu<I>(
    rankings: &RankingBatch<I>,
    membership: &Membership<I>,
    relevance: &ScoreBatch,
    combo: Combination,
) -> Result<MetricValue>
where
    I: Clone + Ord + Debug,
{
    let dense = Dense::new(membership)?;
    let exposure = accumulate(rankings, membership, &dense, exposure_at_positions)?;
    let rel = accumulate_scores(rankings, membership, &dense, relevance, "relevance", (0.0, 1.0))?;
    let avg_exp = dense.divide(&exposure, &dense.sizes)?;
    let avg_rel = dense.divide(&rel, &dense.sizes)?;
    let vals = dense.divide(&avg_exp, &avg_rel)?;
    Ok(MetricValue::combined(&dense.index, &vals, combo))
}

/// Realized utility: mean click-through rate per unit of mean relevance.
pub fn expru<I>(
    rankings: &RankingBatch<I>,
    membership: &Membership<I>,
    relevance: &ScoreBatch,
    ctr: &ScoreBatch,
    combo: Combination,
) -> Result<MetricValue>
where
    I: Clone + Ord + Debug,
{
    let dense = Dense::new(membership)?;
    let rel = accumulate_scores(rankings, membership, &dense, relevance, "relevance", (0.0, 1.0))?;
    let clicks = accumulate_scores(rankings, membership, &dense, ctr, "ctr", (0.0, 1.0))?;
    let avg_ctr = dense.divide(&clicks, &dense.sizes)?;
    let avg_rel = dense.divide(&rel, &dense.sizes)?;
    let vals = dense.divide(&avg_ctr, &avg_rel)?;
    Ok(MetricValue::combined(&dense.index, &vals, combo))
}

/// Expected exposure disparity: L2 norm of per-group mean exposure.
pub fn eed<I>(rankings: &RankingBatch<I>, membership: &Membership<I>) -> Result<MetricValue>
where
    I: Clone + Ord + Debug,
{
    let dense = Dense::new(membership)?;
    let totals = accumulate(rankings, membership, &dense, exposure_at_positions)?;
    let vals = dense.divide(&totals, &dense.sizes)?;
    Ok(MetricValue::combined(&dense.index, &vals, Combination::LTwo))
}

/// Attention-weighted rank fairness (Sapiezynski et al.).
///
/// `p` is the share of attention the top position receives, in `(0, 1]`.
pub fn awrf<I>(
    rankings: &RankingBatch<I>,
    membership: &Membership<I>,
    p: f64,
    combo: Combination,
) -> Result<MetricValue>
where
    I: Clone + Ord + Debug,
{
    if !(p > 0.0 && p <= 1.0) {
        return Err(invalid(format!("p must be in (0, 1], got {p}")));
    }
    let dense = Dense::new(membership)?;
    let totals = accumulate(rankings, membership, &dense, |n| attention_at_positions(n, p))?;
    let vals = dense.divide(&totals, &dense.sizes)?;
    Ok(MetricValue::combined(&dense.index, &vals, combo))
}

/// Attribute rank parity (Cachel et al.).
///
/// For each column and each group `g` present in it with `n_g` of the column's `N`
/// items, the favored-pair representation is
/// `(favored_pairs(g) - C(n_g, 2)) / (n_g * (N - n_g))`: the share of mixed pairs in
/// which `g` is ranked above the other group. Values are summed over columns. A column
/// holding a single group has no mixed pairs and is rejected.
pub fn arp<I>(
    rankings: &RankingBatch<I>,
    membership: &Membership<I>,
    combo: Combination,
) -> Result<MetricValue>
where
    I: Clone + Ord + Debug,
{
    let dense = Dense::new(membership)?;
    let mut fpr = dense.zeros();
    for (ci, column) in rankings.iter().enumerate() {
        let groups = dense.column_groups(membership, column)?;
        let n = column.len();
        let favored = favored_pairs_at_positions(n);
        let mut count = vec![0usize; dense.index.len()];
        let mut total = vec![0u64; dense.index.len()];
        for (g, f) in groups.into_iter().zip(favored) {
            count[g] += 1;
            total[g] += f;
        }
        for g in 0..count.len() {
            let n_g = count[g];
            if n_g == 0 {
                continue;
            }
            let mixed = (n_g * (n - n_g)) as f64;
            if mixed == 0.0 {
                return Err(invalid(format!(
                    "column {ci} holds a single group; favored-pair representation is undefined"
                )));
            }
            fpr[g] += (total[g] - pair_count(n_g)) as f64 / mixed;
        }
    }
    Ok(MetricValue::combined(&dense.index, &fpr, combo))
}

fn rbp_exposure<I>(
    rankings: &RankingBatch<I>,
    membership: &Membership<I>,
    dense: &Dense,
    decay: f64,
) -> Result<Vec<f64>>
where
    I: Clone + Ord + Debug,
{
    check_decay(decay)?;
    let totals = accumulate(rankings, membership, dense, |n| rbp_at_positions(n, decay))?;
    Ok(totals.into_iter().map(|t| (1.0 - decay) * t).collect())
}

/// RBP exposure equality (Kirnap et al.): raw `(1 - decay) * Σ decay^(k-1)` per group.
pub fn erbe<I>(
    rankings: &RankingBatch<I>,
    membership: &Membership<I>,
    decay: f64,
    combo: Combination,
) -> Result<MetricValue>
where
    I: Clone + Ord + Debug,
{
    let dense = Dense::new(membership)?;
    let vals = rbp_exposure(rankings, membership, &dense, decay)?;
    Ok(MetricValue::combined(&dense.index, &vals, combo))
}

/// RBP exposure proportional to group size.
pub fn erbp<I>(
    rankings: &RankingBatch<I>,
    membership: &Membership<I>,
    decay: f64,
    combo: Combination,
) -> Result<MetricValue>
where
    I: Clone + Ord + Debug,
{
    let dense = Dense::new(membership)?;
    let exposure = rbp_exposure(rankings, membership, &dense, decay)?;
    let vals = dense.divide(&exposure, &dense.sizes)?;
    Ok(MetricValue::combined(&dense.index, &vals, combo))
}

/// RBP exposure proportional to the number of relevant items per group.
///
/// Relevance is binary: every cell must be exactly `0.0` or `1.0`. A group with no
/// relevant item is `DegenerateGroup`.
pub fn erbr<I>(
    rankings: &RankingBatch<I>,
    membership: &Membership<I>,
    relevance: &ScoreBatch,
    decay: f64,
    combo: Combination,
) -> Result<MetricValue>
where
    I: Clone + Ord + Debug,
{
    if let Some(v) = relevance
        .iter()
        .flatten()
        .find(|v| **v != 0.0 && **v != 1.0)
    {
        return Err(invalid(format!("relevance must be 0 or 1, got {v}")));
    }
    let dense = Dense::new(membership)?;
    let exposure = rbp_exposure(rankings, membership, &dense, decay)?;
    let relevant =
        accumulate_scores(rankings, membership, &dense, relevance, "relevance", (0.0, 1.0))?;
    let vals = dense.divide(&exposure, &relevant)?;
    Ok(MetricValue::combined(&dense.index, &vals, combo))
}

/// Inequity of amortized attention (Biega et al.).
///
/// `Σ |1/log2(k+1) - relevance_k|`, amortized by summing over every column. Relevance
/// is aligned with `rankings` and must lie in `[0, 1]`.
pub fn iaa<I>(rankings: &RankingBatch<I>, relevance: &ScoreBatch) -> Result<f64> {
    ensure_len("relevance", rankings.len(), relevance.len())?;
    let mut total = 0.0;
    for (column, rel) in rankings.iter().zip(relevance.iter()) {
        ensure_len("relevance", column.len(), rel.len())?;
        let attention = exposure_at_positions(column.len());
        for (a, &r) in attention.iter().zip(rel) {
            if !(0.0..=1.0).contains(&r) {
                return Err(invalid(format!("relevance value {r} outside [0, 1]")));
            }
            total += (a - r).abs();
        }
    }
    Ok(total)
}

/// Normalized discounted KL divergence (Geyik et al.) of a single ranking.
///
/// Compares the group distribution of every prefix with that of the whole ranking,
/// weighting prefix `k` by `1/log2(k+1)`. Groups are indexed densely over those
/// present in the ranking, so sparse labels do not distort the distributions.
/// `0.0` means every prefix mirrors the full list.
pub fn ndkl<I>(ranking: &[I], membership: &Membership<I>) -> Result<f64>
where
    I: Clone + Ord + Debug,
{
    if ranking.is_empty() {
        return Err(invalid("ndkl needs a non-empty ranking"));
    }
    let labels = membership.labels_for(ranking)?;
    let index = GroupIndex::from_labels(labels.iter().copied());
    let groups = labels
        .into_iter()
        .map(|g| dense_of(&index, g))
        .collect::<Result<Vec<_>>>()?;

    let n = groups.len();
    let mut full = vec![0.0; index.len()];
    for &g in &groups {
        full[g] += 1.0;
    }
    full.iter_mut().for_each(|c| *c /= n as f64);

    let z = exposure_at_positions(n);
    let mut prefix = vec![0.0; index.len()];
    let mut acc = 0.0;
    for (i, &g) in groups.iter().enumerate() {
        prefix[g] += 1.0;
        let len = (i + 1) as f64;
        let kl: f64 = prefix
            .iter()
            .zip(&full)
            .map(|(c, q)| {
                let p = c / len + NDKL_EPSILON;
                let q = q + NDKL_EPSILON;
                p * (p / q).ln()
            })
            .sum();
        acc += z[i] * kl;
    }
    Ok(acc / z.iter().sum::<f64>())
}
