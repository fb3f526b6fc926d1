//! Position-decay vectors shared by the metrics.
//!
//! All vectors are indexed by 0-based position; the formulas are written in terms of
//! the 1-based rank `k = position + 1`.

/// Logarithmic exposure `1 / log2(k + 1)` for ranks `1..=n`.
///
/// # Example
///
/// ```rust
/// use ranktune::exposure_at_positions;
///
/// let e = exposure_at_positions(3);
/// assert_eq!(e[0], 1.0);
/// assert!(e[1] < e[0] && e[2] < e[1]);
/// ```
pub fn exposure_at_positions(n: usize) -> Vec<f64> {
    (1..=n).map(|k| 1.0 / ((k as f64) + 1.0).log2()).collect()
}

/// Rank-biased-precision weights `decay^(k - 1)` for ranks `1..=n`.
pub fn rbp_at_positions(n: usize, decay: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(n);
    let mut w = 1.0;
    for _ in 0..n {
        out.push(w);
        w *= decay;
    }
    out
}

/// Geometric attention `100 * (1 - p)^(k - 1) * p` for ranks `1..=n`.
pub fn attention_at_positions(n: usize, p: f64) -> Vec<f64> {
    rbp_at_positions(n, 1.0 - p)
        .into_iter()
        .map(|w| 100.0 * w * p)
        .collect()
}

/// Number of items ranked below each position: `n - 1, n - 2, ..., 0`.
pub fn favored_pairs_at_positions(n: usize) -> Vec<u64> {
    (0..n).rev().map(|x| x as u64).collect()
}

/// Unordered pairs among `n` items.
pub fn pair_count(n: usize) -> u64 {
    let n = n as u64;
    n * n.saturating_sub(1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposure_matches_log2_discount() {
        let e = exposure_at_positions(4);
        assert_eq!(e.len(), 4);
        assert!((e[1] - 1.0 / 3f64.log2()).abs() < 1e-12);
        assert!((e[3] - 1.0 / 5f64.log2()).abs() < 1e-12);
    }

    #[test]
    fn rbp_and_attention_are_geometric() {
        let w = rbp_at_positions(3, 0.5);
        assert_eq!(w, vec![1.0, 0.5, 0.25]);
        let a = attention_at_positions(3, 0.5);
        assert_eq!(a, vec![50.0, 25.0, 12.5]);
        assert!(rbp_at_positions(0, 0.9).is_empty());
    }

    #[test]
    fn pair_helpers() {
        assert_eq!(favored_pairs_at_positions(4), vec![3, 2, 1, 0]);
        assert_eq!(pair_count(4), 6);
        assert_eq!(pair_count(1), 0);
        assert_eq!(pair_count(0), 0);
        // Total favored pairs equals all pairs.
        let total: u64 = favored_pairs_at_positions(10).iter().sum();
        assert_eq!(total, pair_count(10));
    }
}
