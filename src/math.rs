//! Numeric primitives: clamping, logistic transforms, Gaussian draws.
//!
//! All helpers are pure and stateless; randomness is always supplied by the caller.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Clamp `x` into `[lo, hi]`.
///
/// Unlike `f64::clamp`, this never panics (for `lo > hi` it returns `lo`), and a `NaN`
/// input maps to `lo`.
#[inline]
#[must_use]
pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    if x.is_nan() {
        return lo;
    }
    lo.max(hi.min(x))
}

/// Logistic function `1 / (1 + exp(-z))`.
///
/// Evaluated in the branch that never overflows `exp`, so large `|z|` saturates to
/// `0.0` / `1.0` instead of producing `NaN`.
#[inline]
#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Log-odds `ln(p / (1 - p))`.
///
/// Callers are responsible for `p` lying in `(0, 1)`; outside it the result is not finite.
#[inline]
#[must_use]
pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Draw one standard-normal variate.
#[inline]
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}

/// Draw from `N(mean, sd^2)` as `mean + sd * z`.
///
/// `sd == 0` degenerates to `mean` (one variate is still consumed, which keeps draw
/// order independent of the parameters).
#[inline]
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    mean + sd * standard_normal(rng)
}
