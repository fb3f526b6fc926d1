//! Synthetic rankings with a tunable degree of group segregation.
//!
//! The generator draws groups position by position from a categorical distribution in
//! which the minority group's share has been inflated by `phi`, then drains whatever is
//! left once any group runs dry.
//!
//! Conventions:
//! - `phi = 0` is the fair end: every group is drawn at its natural share of the pool.
//! - `phi = 1` is the unfair end: the minority group is drawn exclusively until it is
//!   exhausted, i.e. it is pushed to the top of the list.
//! - In between, the minority share is `phi_scaled = phi * (1 - m) + m` where `m` is the
//!   minority's natural share; other groups split `1 - phi_scaled` in proportion to their
//!   natural shares.
//!
//! Each group's pool is a stack: items are emitted last-supplied first. At `phi = 1`
//! the pools are shuffled (unless disabled in [`GeneratorConfig`]) so that the
//! within-group order carries no signal.
//!
//! Generation is seedable. Batched calls give each replicate its own RNG derived from
//! `(seed, replicate)` (see [`crate::replicate_seed`]), so the output does not depend on
//! the order in which replicates are produced.

use std::fmt::Debug;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use crate::error::{ensure_len, invalid, Error, Result};
use crate::groups::{GroupId, GroupIndex, Membership};
use crate::ranking::{Batch, RankingBatch, ScoreBatch};
use crate::seed::{replicate_rng, stream_rng};

/// Tolerance for "proportions sum to 1".
const PROPORTION_SUM_TOL: f64 = 1e-9;

/// Salt separating the score stream from the ranking stream.
const SCORE_STREAM: u64 = 0x5343_4F52_4553; // "SCORES"

/// Configuration for a generation call.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneratorConfig {
    /// Bias in `[0, 1]`; 0 is representative, 1 is maximally segregated.
    pub phi: f64,
    /// Number of independent rankings to draw (must be >= 1).
    pub replicates: usize,
    /// Seed for all randomness in the call.
    pub seed: u64,
    /// Shuffle each group's pool when `phi == 1`.
    pub shuffle_on_full_bias: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            phi: 0.0,
            replicates: 1,
            seed: 0,
            shuffle_on_full_bias: true,
        }
    }
}

/// Distribution for synthetic relevance scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScoreDistribution {
    /// i.i.d. uniform on `[0, 1)`.
    Uniform,
    /// i.i.d. standard normal.
    Normal,
}

impl ScoreDistribution {
    fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> f64 {
        match self {
            ScoreDistribution::Uniform => rng.random::<f64>(),
            ScoreDistribution::Normal => rng.sample::<f64, _>(StandardNormal),
        }
    }
}

impl FromStr for ScoreDistribution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uniform" => Ok(ScoreDistribution::Uniform),
            "normal" => Ok(ScoreDistribution::Normal),
            other => Err(invalid(format!("unknown score distribution `{other}`"))),
        }
    }
}

/// One group's slice of the unit interval.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupInterval {
    /// Caller label of the group this interval draws.
    pub group: GroupId,
    /// Inclusive lower bound.
    pub low: f64,
    /// Exclusive upper bound.
    pub high: f64,
}

/// Per-call draw setup: rescaled shares and the intervals they induce.
///
/// Shared by every replicate of a call.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrawPlan {
    phi: f64,
    phi_scaled: f64,
    minority: GroupId,
    intervals: Vec<GroupInterval>,
}

impl DrawPlan {
    pub fn phi(&self) -> f64 {
        self.phi
    }

    /// Effective draw share of the minority group.
    pub fn phi_scaled(&self) -> f64 {
        self.phi_scaled
    }

    /// Label of the group with the smallest natural share (lowest label on ties).
    pub fn minority(&self) -> GroupId {
        self.minority
    }

    /// Intervals in ascending group order; they tile `[0, 1)` and the last ends at 1.0.
    pub fn intervals(&self) -> &[GroupInterval] {
        &self.intervals
    }

    /// Dense index of the interval holding `r`. Intervals tile `[0, 1)` in order, so
    /// the first one whose upper bound lies above `r` is it; the last interval also
    /// takes anything at or past its nominal end.
    fn pick(&self, r: f64) -> usize {
        let last = self.intervals.len().saturating_sub(1);
        self.intervals[..last]
            .iter()
            .position(|iv| r < iv.high)
            .unwrap_or(last)
    }
}

/// Output of [`RankGenerator::generate`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Generated<I: Ord> {
    /// One ranking per replicate.
    pub rankings: RankingBatch<I>,
    /// Group label of each ranked item, aligned with `rankings`.
    pub groups: Batch<GroupId>,
    /// The item universe and its groups.
    pub membership: Membership<I>,
}

/// Output of [`RankGenerator::generate_scored`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoredGenerated<I: Ord> {
    pub rankings: RankingBatch<I>,
    pub groups: Batch<GroupId>,
    pub membership: Membership<I>,
    /// Synthetic relevance, aligned positionally with `rankings`.
    pub scores: ScoreBatch,
}

/// Generator over a fixed item universe.
#[derive(Debug, Clone)]
pub struct RankGenerator<I: Ord> {
    membership: Membership<I>,
    index: GroupIndex,
    // Dense group -> items in membership order.
    pools: Vec<Vec<I>>,
}

impl RankGenerator<usize> {
    /// Universe `0..num_items`, split into contiguous runs by group label `0..G`.
    ///
    /// Group sizes use largest-remainder apportionment of `num_items * proportions[g]`
    /// (ties to the lower label), so every group gets the floor or ceiling of its quota
    /// and the sizes sum to exactly `num_items`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ranktune::{GeneratorConfig, RankGenerator};
    ///
    /// let gen = RankGenerator::from_proportions(&[0.2, 0.3, 0.5], 100).unwrap();
    /// let out = gen.generate(&GeneratorConfig { phi: 0.8, seed: 10, ..Default::default() }).unwrap();
    /// assert_eq!(out.rankings.column(0).unwrap().len(), 100);
    /// ```
    pub fn from_proportions(proportions: &[f64], num_items: usize) -> Result<Self> {
        let counts = apportion(proportions, num_items)?;
        let mut items = Vec::with_capacity(num_items);
        let mut groups = Vec::with_capacity(num_items);
        for (g, &c) in counts.iter().enumerate() {
            for _ in 0..c {
                items.push(items.len());
                groups.push(g as GroupId);
            }
        }
        Self::from_items(items, groups)
    }
}

impl<I> RankGenerator<I>
where
    I: Clone + Ord + Debug,
{
    /// Universe given as parallel item / group arrays.
    pub fn from_items(items: Vec<I>, groups: Vec<GroupId>) -> Result<Self> {
        Self::from_membership(Membership::new(items, groups)?)
    }

    /// Universe given as an existing membership.
    pub fn from_membership(membership: Membership<I>) -> Result<Self> {
        if membership.is_empty() {
            return Err(invalid("item universe is empty"));
        }
        let index = membership.group_index();
        let mut pools: Vec<Vec<I>> = vec![Vec::new(); index.len()];
        for (item, &g) in membership.items().iter().zip(membership.groups()) {
            // Every label in `membership` is in `index` by construction.
            if let Some(gi) = index.index_of(g) {
                pools[gi].push(item.clone());
            }
        }
        Ok(Self {
            membership,
            index,
            pools,
        })
    }

    pub fn membership(&self) -> &Membership<I> {
        &self.membership
    }

    pub fn group_index(&self) -> &GroupIndex {
        &self.index
    }

    /// Compute the draw plan for `phi`.
    pub fn plan(&self, phi: f64) -> Result<DrawPlan> {
        if !(phi.is_finite() && (0.0..=1.0).contains(&phi)) {
            return Err(invalid(format!("phi must be in [0, 1], got {phi}")));
        }
        let n = self.membership.len() as f64;
        let natural: Vec<f64> = self.pools.iter().map(|p| p.len() as f64 / n).collect();

        let mut minority = 0usize;
        for (g, &p) in natural.iter().enumerate() {
            if p < natural[minority] {
                minority = g;
            }
        }
        let m = natural[minority];
        // Exact at the endpoints so boundary intervals do not pick up rounding noise.
        let phi_scaled = if phi >= 1.0 { 1.0 } else { phi * (1.0 - m) + m };

        let others: f64 = natural
            .iter()
            .enumerate()
            .filter(|&(g, _)| g != minority)
            .map(|(_, p)| p)
            .sum();
        let shares: Vec<f64> = natural
            .iter()
            .enumerate()
            .map(|(g, &p)| {
                if g == minority {
                    phi_scaled
                } else if others > 0.0 {
                    p / others * (1.0 - phi_scaled)
                } else {
                    0.0
                }
            })
            .collect();

        let mut intervals = Vec::with_capacity(shares.len());
        let mut low = 0.0;
        for (g, &s) in shares.iter().enumerate() {
            let high = low + s;
            intervals.push(GroupInterval {
                group: self.index.label(g),
                low,
                high,
            });
            low = high;
        }
        if let Some(last) = intervals.last_mut() {
            last.high = 1.0;
        }

        Ok(DrawPlan {
            phi,
            phi_scaled,
            minority: self.index.label(minority),
            intervals,
        })
    }

    /// Draw one ranking with a caller-owned RNG.
    ///
    /// `plan` must come from [`RankGenerator::plan`] on this generator.
    pub fn make_rank<R: Rng + ?Sized>(&self, plan: &DrawPlan, shuffle: bool, rng: &mut R) -> Vec<I> {
        self.make_rank_with_groups(plan, shuffle, rng).0
    }

    fn make_rank_with_groups<R: Rng + ?Sized>(
        &self,
        plan: &DrawPlan,
        shuffle: bool,
        rng: &mut R,
    ) -> (Vec<I>, Vec<GroupId>) {
        let mut pools = self.pools.clone();
        if shuffle {
            for p in &mut pools {
                p.shuffle(rng);
            }
        }

        let n = self.membership.len();
        let mut items = Vec::with_capacity(n);
        let mut groups = Vec::with_capacity(n);

        // Draw phase: while every group still has supply.
        while pools.iter().all(|p| !p.is_empty()) {
            let r: f64 = rng.random();
            let g = plan.pick(r);
            if let Some(item) = pools[g].pop() {
                items.push(item);
                groups.push(self.index.label(g));
            }
        }

        // Drain phase: smallest remaining group first, whole group at a time.
        while let Some(g) = pools
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_empty())
            .min_by_key(|&(g, p)| (p.len(), g))
            .map(|(g, _)| g)
        {
            let label = self.index.label(g);
            while let Some(item) = pools[g].pop() {
                items.push(item);
                groups.push(label);
            }
        }

        (items, groups)
    }

    /// Generate `cfg.replicates` rankings.
    pub fn generate(&self, cfg: &GeneratorConfig) -> Result<Generated<I>> {
        if cfg.replicates == 0 {
            return Err(invalid("replicates must be >= 1"));
        }
        let plan = self.plan(cfg.phi)?;
        let shuffle = cfg.shuffle_on_full_bias && cfg.phi == 1.0;
        debug!(
            items = self.membership.len(),
            groups = self.index.len(),
            phi = cfg.phi,
            phi_scaled = plan.phi_scaled(),
            minority = plan.minority(),
            replicates = cfg.replicates,
            "generating rankings"
        );

        let mut rankings = RankingBatch::default();
        let mut groups = Batch::default();
        for r in 0..cfg.replicates {
            let mut rng = replicate_rng(cfg.seed, r);
            let (items, labels) = self.make_rank_with_groups(&plan, shuffle, &mut rng);
            ensure_len("generated ranking", self.membership.len(), items.len())?;
            rankings.push(items);
            groups.push(labels);
        }
        debug!(replicates = rankings.len(), "generated rankings");

        Ok(Generated {
            rankings,
            groups,
            membership: self.membership.clone(),
        })
    }

    /// Like [`RankGenerator::generate`], plus one column of synthetic relevance scores per
    /// replicate, drawn independently of the ranking.
    pub fn generate_scored(
        &self,
        cfg: &GeneratorConfig,
        dist: ScoreDistribution,
    ) -> Result<ScoredGenerated<I>> {
        let Generated {
            rankings,
            groups,
            membership,
        } = self.generate(cfg)?;

        let n = membership.len();
        let mut scores = ScoreBatch::default();
        for r in 0..cfg.replicates {
            let mut rng = stream_rng(cfg.seed, SCORE_STREAM, r);
            scores.push((0..n).map(|_| dist.sample(&mut rng)).collect());
        }
        debug!(?dist, replicates = cfg.replicates, "drew synthetic scores");

        Ok(ScoredGenerated {
            rankings,
            groups,
            membership,
            scores,
        })
    }
}

/// Validate `proportions` and split `num_items` among them.
fn apportion(proportions: &[f64], num_items: usize) -> Result<Vec<usize>> {
    if proportions.is_empty() {
        return Err(invalid("group proportions are empty"));
    }
    if num_items == 0 {
        return Err(invalid("num_items must be >= 1"));
    }
    if let Some(p) = proportions.iter().find(|p| !(p.is_finite() && **p >= 0.0)) {
        return Err(invalid(format!("group proportion {p} is not a finite share")));
    }
    let sum: f64 = proportions.iter().sum();
    if (sum - 1.0).abs() > PROPORTION_SUM_TOL {
        return Err(invalid(format!("group proportions sum to {sum}, expected 1")));
    }

    let quotas: Vec<f64> = proportions.iter().map(|p| p * num_items as f64).collect();
    let mut counts: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();
    let mut order: Vec<usize> = (0..quotas.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = quotas[a] - quotas[a].floor();
        let fb = quotas[b] - quotas[b].floor();
        fb.total_cmp(&fa).then_with(|| a.cmp(&b))
    });
    for &g in order.iter().take(num_items.saturating_sub(assigned)) {
        counts[g] += 1;
    }

    for (g, (&c, &p)) in counts.iter().zip(proportions).enumerate() {
        if c == 0 && p > 0.0 {
            return Err(Error::DegenerateGroup(g as GroupId));
        }
    }
    Ok(counts)
}
