//! Deterministic seed derivation for replicates.
//!
//! Each replicate of a batched call gets its own `StdRng`, seeded from the caller's
//! seed, a stream id, and the replicate index only. Replicates are therefore
//! independent of the order in which they are produced.
//!
//! The inputs are mixed one at a time (`mix(mix(mix(seed) ^ stream) ^ r)`), so a seed
//! XORed with a replicate index or stream id does not reproduce another derived seed.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Stream used for rankings; other draws pick their own stream id.
pub const RANKING_STREAM: u64 = 0;

/// Seed for replicate `replicate` of stream `stream` in a call seeded with `seed`.
///
/// Nested SplitMix64 finalizers (good bit diffusion, stable across platforms). Not
/// cryptographic.
#[must_use]
pub fn stream_seed(seed: u64, stream: u64, replicate: usize) -> u64 {
    splitmix64(splitmix64(splitmix64(seed) ^ stream) ^ (replicate as u64))
}

/// Seed for replicate `replicate` of the ranking stream.
#[must_use]
pub fn replicate_seed(seed: u64, replicate: usize) -> u64 {
    stream_seed(seed, RANKING_STREAM, replicate)
}

/// Fresh RNG for replicate `replicate` of stream `stream`.
pub fn stream_rng(seed: u64, stream: u64, replicate: usize) -> StdRng {
    StdRng::seed_from_u64(stream_seed(seed, stream, replicate))
}

/// Fresh RNG for replicate `replicate` of the ranking stream.
pub fn replicate_rng(seed: u64, replicate: usize) -> StdRng {
    stream_rng(seed, RANKING_STREAM, replicate)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
