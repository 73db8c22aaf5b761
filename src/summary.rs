//! Distribution summaries: percentiles, means, and the certainty heuristic.
//!
//! `certainty_pct` is **not** a statistical confidence level. It is a dispersion
//! ratio turned into a 0–100 score:
//!
//! ```text
//!   certainty = (1 - (p90 - p10) / (2 * p50)) * 100,   clamped to [0, 100]
//! ```
//!
//! so a sample whose 80% central band is narrow relative to its median scores high.
//! A non-positive median makes the ratio meaningless; such samples score 0.

use crate::error::{Error, Result};
use crate::sampler::JointSamples;
use crate::Metric;

/// Default central fraction of the sorted sample used for [`MetricSummary::window_mean`].
pub const DEFAULT_WINDOW_FRAC: f64 = 0.15;

/// Summarizer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SummaryConfig {
    /// Central fraction of the sorted sample averaged into `window_mean`; in `(0, 1]`.
    pub window_frac: f64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            window_frac: DEFAULT_WINDOW_FRAC,
        }
    }
}

impl SummaryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_frac.is_finite() && self.window_frac > 0.0 && self.window_frac <= 1.0 {
            Ok(())
        } else {
            Err(Error::InvalidConfig("window_frac must be in (0, 1]"))
        }
    }
}

/// Read-only summary of one metric's samples.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricSummary {
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
    pub mean: f64,
    /// Mean of the central `window_frac` of the sorted sample.
    pub window_mean: f64,
    /// Dispersion heuristic in `[0, 100]` (see module docs).
    pub certainty_pct: f64,
    /// Reserved for time-series stability scoring; always `0.0`.
    pub stability_pct: f64,
}

/// Summaries for the three metrics of one platform.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlatformSummary {
    #[cfg_attr(feature = "serde", serde(rename = "CPM"))]
    pub cpm: MetricSummary,
    #[cfg_attr(feature = "serde", serde(rename = "CTR"))]
    pub ctr: MetricSummary,
    #[cfg_attr(feature = "serde", serde(rename = "CVR"))]
    pub cvr: MetricSummary,
}

impl PlatformSummary {
    /// Summarize each metric of a joint sample.
    pub fn from_samples(samples: &JointSamples, cfg: &SummaryConfig) -> Result<Self> {
        Ok(Self {
            cpm: summarize(&samples.cpm, cfg)?,
            ctr: summarize(&samples.ctr, cfg)?,
            cvr: summarize(&samples.cvr, cfg)?,
        })
    }

    pub fn get(&self, metric: Metric) -> &MetricSummary {
        match metric {
            Metric::Cpm => &self.cpm,
            Metric::Ctr => &self.ctr,
            Metric::Cvr => &self.cvr,
        }
    }
}

/// Linear-interpolated percentile of an ascending slice (`q` in `[0, 100]`).
///
/// Uses `index = q / 100 * (n - 1)` and interpolates between `floor(index)` and
/// `ceil(index)`. Returns `None` for an empty slice.
#[must_use]
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let q = q.clamp(0.0, 100.0);
    let index = q / 100.0 * (n - 1) as f64;
    let lo = index.floor() as usize;
    let hi = (index.ceil() as usize).min(n - 1);
    let w = index - lo as f64;
    // `a + (b - a) * w` keeps equal neighbours exact and stays within [a, b].
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * w)
}

/// Mean of the central `window_frac` of an ascending slice.
///
/// The window holds `max(1, floor(n * window_frac))` elements starting at
/// `(n - size) / 2`.
#[must_use]
pub fn window_mean_sorted(sorted: &[f64], window_frac: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let size = ((n as f64 * window_frac).floor() as usize).clamp(1, n);
    let start = (n - size) / 2;
    let window = &sorted[start..start + size];
    Some(window.iter().sum::<f64>() / size as f64)
}

/// Certainty heuristic from percentiles; `0.0` when `p50` is not positive.
#[must_use]
pub fn certainty_pct(p10: f64, p50: f64, p90: f64) -> f64 {
    if !(p50.is_finite() && p50 > 0.0) {
        return 0.0;
    }
    let c = (1.0 - (p90 - p10) / (2.0 * p50)) * 100.0;
    if c.is_finite() {
        c.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Summarize one metric's samples.
pub fn summarize(samples: &[f64], cfg: &SummaryConfig) -> Result<MetricSummary> {
    cfg.validate()?;
    if samples.is_empty() {
        return Err(Error::EmptySamples);
    }
    if samples.iter().any(|x| !x.is_finite()) {
        return Err(Error::NonFiniteSamples);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    // Non-empty was checked above, so the helpers cannot return `None`.
    let pct = |q| percentile_sorted(&sorted, q).unwrap_or(f64::NAN);
    let (p10, p50, p90) = (pct(10.0), pct(50.0), pct(90.0));
    let window_mean = window_mean_sorted(&sorted, cfg.window_frac).unwrap_or(f64::NAN);
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;

    Ok(MetricSummary {
        p10,
        p50,
        p90,
        mean,
        window_mean,
        certainty_pct: certainty_pct(p10, p50, p90),
        stability_pct: 0.0,
    })
}
