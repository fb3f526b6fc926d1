//! Reductions from a per-group value vector to a single fairness score.
//!
//! Every group-level metric in [`crate::metrics`] ends with one of these formulas.
//! The set is closed; names round-trip through [`std::str::FromStr`] and `Display`
//! so experiment configs can still refer to them by name.

use std::fmt;
use std::str::FromStr;

use crate::error::{invalid, Error};

/// How to collapse per-group values into one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Combination {
    /// `min / max` (1.0 means parity).
    MinMaxRatio,
    /// `max / min`.
    MaxMinRatio,
    /// `max - min`.
    MaxMinDiff,
    /// Largest absolute deviation from the mean.
    MaxAbsDiff,
    /// Mean absolute deviation from the mean.
    MeanAbsDev,
    /// Euclidean norm.
    LTwo,
    /// Population variance.
    Variance,
}

impl Combination {
    /// Every variant, in declaration order.
    pub const ALL: [Combination; 7] = [
        Combination::MinMaxRatio,
        Combination::MaxMinRatio,
        Combination::MaxMinDiff,
        Combination::MaxAbsDiff,
        Combination::MeanAbsDev,
        Combination::LTwo,
        Combination::Variance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Combination::MinMaxRatio => "MinMaxRatio",
            Combination::MaxMinRatio => "MaxMinRatio",
            Combination::MaxMinDiff => "MaxMinDiff",
            Combination::MaxAbsDiff => "MaxAbsDiff",
            Combination::MeanAbsDev => "MeanAbsDev",
            Combination::LTwo => "LTwo",
            Combination::Variance => "Variance",
        }
    }

    /// Apply the formula. Returns `NaN` for an empty vector; ratio formulas follow
    /// IEEE division when the denominator is zero.
    pub fn apply(self, vals: &[f64]) -> f64 {
        if vals.is_empty() {
            return f64::NAN;
        }
        match self {
            Combination::MinMaxRatio => min(vals) / max(vals),
            Combination::MaxMinRatio => max(vals) / min(vals),
            Combination::MaxMinDiff => max(vals) - min(vals),
            Combination::MaxAbsDiff => {
                let m = mean(vals);
                vals.iter().map(|x| (x - m).abs()).fold(0.0, f64::max)
            }
            Combination::MeanAbsDev => {
                let m = mean(vals);
                vals.iter().map(|x| (x - m).abs()).sum::<f64>() / vals.len() as f64
            }
            Combination::LTwo => vals.iter().map(|x| x * x).sum::<f64>().sqrt(),
            Combination::Variance => {
                let m = mean(vals);
                vals.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / vals.len() as f64
            }
        }
    }
}

fn min(v: &[f64]) -> f64 {
    v.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(v: &[f64]) -> f64 {
    v.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Combination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Combination::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| invalid(format!("unknown combination `{s}`")))
    }
}
