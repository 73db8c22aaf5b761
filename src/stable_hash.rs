//! Deterministic hashing for per-platform seed derivation and cache fingerprints.
//!
//! Not cryptographic. The only guarantee is stability: the same inputs hash to the
//! same value on every platform and in every process.

const FNV_OFFSET: u64 = 14695981039346656037u64;
const FNV_PRIME: u64 = 1099511628211u64;

/// Stable 64-bit hash of a string under `seed`.
///
/// Implementation:
/// - FNV-1a over bytes
/// - SplitMix64 finalizer (bit diffusion)
#[must_use]
pub fn stable_hash64(seed: u64, s: &str) -> u64 {
    splitmix64(seed ^ fnv1a(FNV_OFFSET, s.as_bytes()))
}

/// Seed for one platform's random stream within a run seeded by `run_seed`.
///
/// Distinct platform names get decorrelated streams, and a platform's stream does
/// not depend on which other platforms are in the run or on iteration order.
#[must_use]
pub fn platform_seed(run_seed: u64, platform: &str) -> u64 {
    stable_hash64(run_seed, platform)
}

/// Fold a sequence of `f64` values (by bit pattern) into a stable hash.
///
/// `-0.0` and `0.0` hash differently; every `NaN` payload hashes as its own bits.
#[must_use]
pub fn stable_hash_f64s(seed: u64, values: &[f64]) -> u64 {
    let mut h = FNV_OFFSET;
    for v in values {
        h = fnv1a(h, &v.to_bits().to_le_bytes());
    }
    splitmix64(seed ^ h)
}

#[inline]
fn fnv1a(mut h: u64, bytes: &[u8]) -> u64 {
    for b in bytes {
        h ^= *b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
