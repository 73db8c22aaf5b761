//! Posterior estimation in transformed spaces.
//!
//! Rates (CTR, CVR) live in logit space, cost (CPM) in log space. The observed
//! `(mean, variability)` pair is mapped to a Normal in that space and optionally
//! combined with a Normal prior by precision weighting.

use crate::error::{Error, Result};
use crate::math::logit;
use crate::{Metric, MetricInput, PlatformInput};

/// Floor applied to a rate's standard deviation before the delta-method transform.
pub const MIN_RATE_STD: f64 = 1e-8;

/// Floor applied to the cost coefficient of variation before the log-normal transform.
pub const MIN_COST_CV: f64 = 1e-6;

/// Normal distribution `N(location, scale^2)` in a metric's transformed space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PosteriorParams {
    pub location: f64,
    /// Always finite and > 0.
    pub scale: f64,
}

/// Normal prior over a metric's transformed value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Prior {
    pub mu: f64,
    pub sigma: f64,
}

/// How priors are chosen when estimating a platform's posteriors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PriorPolicy {
    /// No prior: the posterior is the data-derived distribution unchanged.
    #[default]
    None,
    /// Weakly informative prior centered on the observed transformed mean with the
    /// given scale. Leaves the location unchanged and narrows the scale.
    CenteredOnData { sigma: f64 },
    /// Per-metric explicit priors (`None` entries fall back to the data).
    Explicit {
        cpm: Option<Prior>,
        ctr: Option<Prior>,
        cvr: Option<Prior>,
    },
}

impl PriorPolicy {
    fn prior_for(&self, metric: Metric, data: PosteriorParams) -> Option<Prior> {
        match *self {
            PriorPolicy::None => None,
            PriorPolicy::CenteredOnData { sigma } => Some(Prior {
                mu: data.location,
                sigma,
            }),
            PriorPolicy::Explicit { cpm, ctr, cvr } => match metric {
                Metric::Cpm => cpm,
                Metric::Ctr => ctr,
                Metric::Cvr => cvr,
            },
        }
    }
}

/// Posterior parameters for all three metrics of one platform.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlatformPosterior {
    /// Log-space posterior for CPM.
    pub cpm: PosteriorParams,
    /// Logit-space posterior for CTR.
    pub ctr: PosteriorParams,
    /// Logit-space posterior for CVR.
    pub cvr: PosteriorParams,
}

impl PlatformPosterior {
    /// Estimate all three posteriors for one platform's input.
    pub fn estimate(input: &PlatformInput, policy: &PriorPolicy) -> Result<Self> {
        let cpm = estimate_metric(Metric::Cpm, input.metric(Metric::Cpm), policy)?;
        let ctr = estimate_metric(Metric::Ctr, input.metric(Metric::Ctr), policy)?;
        let cvr = estimate_metric(Metric::Cvr, input.metric(Metric::Cvr), policy)?;
        Ok(Self { cpm, ctr, cvr })
    }

    /// Posterior for one metric.
    pub fn get(&self, metric: Metric) -> PosteriorParams {
        match metric {
            Metric::Cpm => self.cpm,
            Metric::Ctr => self.ctr,
            Metric::Cvr => self.cvr,
        }
    }
}

/// Estimate one metric's posterior, dispatching on its kind and applying `policy`.
pub fn estimate_metric(
    metric: Metric,
    input: MetricInput,
    policy: &PriorPolicy,
) -> Result<PosteriorParams> {
    let data = if metric.is_rate() {
        rate_likelihood(metric, input.mean, input.variability)?
    } else {
        cost_likelihood(metric, input.mean, input.variability)?
    };
    match policy.prior_for(metric, data) {
        Some(prior) => combine(metric, data, prior),
        None => Ok(data),
    }
}

/// Rate posterior in logit space (`mean` in `(0, 1)`, `std` absolute).
pub fn rate_posterior(
    metric: Metric,
    mean: f64,
    std: f64,
    prior: Option<Prior>,
) -> Result<PosteriorParams> {
    let data = rate_likelihood(metric, mean, std)?;
    match prior {
        Some(p) => combine(metric, data, p),
        None => Ok(data),
    }
}

/// Cost posterior in log space (`mean > 0`, `cv` a coefficient of variation).
pub fn cost_posterior(
    metric: Metric,
    mean: f64,
    cv: f64,
    prior: Option<Prior>,
) -> Result<PosteriorParams> {
    let data = cost_likelihood(metric, mean, cv)?;
    match prior {
        Some(p) => combine(metric, data, p),
        None => Ok(data),
    }
}

fn check_finite(metric: Metric, mean: f64, variability: f64) -> Result<()> {
    if !mean.is_finite() {
        return Err(Error::NonFinite {
            metric,
            field: "mean",
        });
    }
    if !variability.is_finite() {
        return Err(Error::NonFinite {
            metric,
            field: "variability",
        });
    }
    if variability < 0.0 {
        return Err(Error::NegativeVariability {
            metric,
            value: variability,
        });
    }
    Ok(())
}

// Delta method: sd[logit(p)] ~= sd[p] / (p (1 - p)).
fn rate_likelihood(metric: Metric, mean: f64, std: f64) -> Result<PosteriorParams> {
    check_finite(metric, mean, std)?;
    if mean <= 0.0 || mean >= 1.0 {
        return Err(Error::RateOutOfRange { metric, mean });
    }
    let std = std.max(MIN_RATE_STD);
    finite_params(metric, logit(mean), std / (mean * (1.0 - mean)))
}

// Log-normal moment matching: sigma^2 = ln(1 + cv^2), mu = ln(mean) - sigma^2 / 2.
fn cost_likelihood(metric: Metric, mean: f64, cv: f64) -> Result<PosteriorParams> {
    check_finite(metric, mean, cv)?;
    if mean <= 0.0 {
        return Err(Error::NonPositiveCost { metric, mean });
    }
    let cv = cv.max(MIN_COST_CV);
    let sigma2 = cv.mul_add(cv, 1.0).ln();
    finite_params(metric, mean.ln() - 0.5 * sigma2, sigma2.sqrt())
}

// Finite inputs can still overflow in the transforms (e.g. `cv^2` for a huge cv).
fn finite_params(metric: Metric, location: f64, scale: f64) -> Result<PosteriorParams> {
    if location.is_finite() && scale.is_finite() && scale > 0.0 {
        Ok(PosteriorParams { location, scale })
    } else {
        Err(Error::NonFinite {
            metric,
            field: "posterior",
        })
    }
}

/// Precision-weighted combination of a data-derived Normal with a Normal prior.
pub fn combine(metric: Metric, data: PosteriorParams, prior: Prior) -> Result<PosteriorParams> {
    if !(prior.sigma.is_finite() && prior.sigma > 0.0) {
        return Err(Error::InvalidPrior {
            metric,
            sigma: prior.sigma,
        });
    }
    if !prior.mu.is_finite() {
        return Err(Error::NonFinite {
            metric,
            field: "prior mu",
        });
    }
    let precision_prior = 1.0 / (prior.sigma * prior.sigma);
    let precision_data = 1.0 / (data.scale * data.scale);
    let precision_post = precision_prior + precision_data;
    finite_params(
        metric,
        (precision_prior * prior.mu + precision_data * data.location) / precision_post,
        (1.0 / precision_post).sqrt(),
    )
}
