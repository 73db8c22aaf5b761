//! `budgetmux`: Bayesian Monte Carlo summaries and budget allocation across ad platforms.
//!
//! Given per-platform summary statistics for three metrics
//! (CPM: cost per mille, CTR: click-through rate, CVR: conversion rate), the crate
//!
//! 1. estimates a posterior for each metric in a transformed space
//!    (logit for the rates, log for cost), optionally combined with a prior;
//! 2. draws correlated joint samples through a shared latent factor;
//! 3. summarizes each metric (p10/p50/p90, mean, windowed mean, certainty);
//! 4. scores each platform and normalizes the scores into budget percentages.
//!
//! ```text
//!   PlatformInput ─► PlatformPosterior ─► JointSamples ─► PlatformSummary ─┐
//!                                                                          ├─► AllocationResult
//!   (one seeded stream per platform)                        ... others ────┘
//! ```
//!
//! **Goals:**
//! - **Deterministic by default**: same inputs + config + seed → same summaries and allocation.
//! - **Fail loudly, per platform**: bad input yields a typed [`Error`] naming the platform
//!   and metric; `NaN` never reaches an output.
//! - **Small runs**: a few thousand draws per platform, a handful of platforms.
//!
//! **Entry points:**
//! - [`run`]: strict end-to-end allocation.
//! - [`simulate_batch`] + [`BatchReport::allocate`]: per-platform failure isolation.
//! - [`simulate_platform`], [`PlatformPosterior::estimate`], [`JointSampler`],
//!   [`summarize`], [`allocate`]: the individual stages.
//! - [`SummaryCache`]: optional caller-owned memoization.
//!
//! **Non-goals:** data ingestion, persistence, rendering, latency guarantees.
//!
//! `certainty_pct` is a dispersion heuristic, not a confidence level; see [`summary`].
//!
//! # Example
//!
//! ```rust
//! use budgetmux::{run, PlatformInput, ScoreConfig, SimulationConfig};
//! use std::collections::BTreeMap;
//!
//! let same = PlatformInput {
//!     cpm_mean: 5.0, cpm_cv: 0.3,
//!     ctr_mean: 0.02, ctr_std: 0.005,
//!     cvr_mean: 0.03, cvr_std: 0.008,
//! };
//! let inputs: BTreeMap<String, PlatformInput> =
//!     ["Google", "Meta"].iter().map(|p| (p.to_string(), same)).collect();
//!
//! let result = run(&inputs, &SimulationConfig::default(), &ScoreConfig::default()).unwrap();
//! assert!((result.total_pct() - 100.0).abs() <= 0.1);
//! ```

#![forbid(unsafe_code)]

use std::fmt;

mod error;
pub use error::{Error, Result};

pub mod math;

mod stable_hash;
pub use stable_hash::*;

pub mod posterior;
pub use posterior::{PlatformPosterior, PosteriorParams, Prior, PriorPolicy};

pub mod sampler;
pub use sampler::{JointSampler, JointSamples, LatentLoadings, ResidualScales, SamplerConfig};

pub mod summary;
pub use summary::{summarize, MetricSummary, PlatformSummary, SummaryConfig};

mod alloc;
pub use alloc::*;

mod pipeline;
pub use pipeline::*;

mod cache;
pub use cache::*;

/// One of the three tracked advertising metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Metric {
    /// Cost per thousand impressions (log space).
    #[cfg_attr(feature = "serde", serde(rename = "CPM"))]
    Cpm,
    /// Click-through rate (logit space).
    #[cfg_attr(feature = "serde", serde(rename = "CTR"))]
    Ctr,
    /// Conversion rate (logit space).
    #[cfg_attr(feature = "serde", serde(rename = "CVR"))]
    Cvr,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Cpm, Metric::Ctr, Metric::Cvr];

    /// Whether the metric is a rate in `(0, 1)`.
    pub fn is_rate(self) -> bool {
        !matches!(self, Metric::Cpm)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Cpm => "CPM",
            Metric::Ctr => "CTR",
            Metric::Cvr => "CVR",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed mean and variability of one metric.
///
/// `variability` is a coefficient of variation for CPM and an absolute standard
/// deviation for the rates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricInput {
    pub mean: f64,
    pub variability: f64,
}

/// Raw summary statistics for one platform.
///
/// Valid input has `cpm_mean > 0`, rate means in `(0, 1)` and all variabilities `>= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlatformInput {
    pub cpm_mean: f64,
    /// Coefficient of variation of CPM.
    pub cpm_cv: f64,
    pub ctr_mean: f64,
    pub ctr_std: f64,
    pub cvr_mean: f64,
    pub cvr_std: f64,
}

impl PlatformInput {
    /// The `(mean, variability)` pair for one metric.
    pub fn metric(&self, metric: Metric) -> MetricInput {
        let (mean, variability) = match metric {
            Metric::Cpm => (self.cpm_mean, self.cpm_cv),
            Metric::Ctr => (self.ctr_mean, self.ctr_std),
            Metric::Cvr => (self.cvr_mean, self.cvr_std),
        };
        MetricInput { mean, variability }
    }
}
