//! Error taxonomy for the simulation and scoring pipeline.
//!
//! Every failure names the metric (and, once it crosses a platform boundary, the
//! platform) it came from. Nothing in this crate substitutes a default value for
//! bad input or lets `NaN` through to callers.

use crate::Metric;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the posterior, sampling, summarizing, and scoring stages.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A rate metric mean was outside the open interval `(0, 1)`.
    #[error("{metric}: mean {mean} is outside (0, 1)")]
    RateOutOfRange { metric: Metric, mean: f64 },

    /// The cost metric mean was zero or negative.
    #[error("{metric}: mean {mean} must be positive")]
    NonPositiveCost { metric: Metric, mean: f64 },

    /// A variability figure (std or coefficient of variation) was negative.
    #[error("{metric}: variability {value} must be non-negative")]
    NegativeVariability { metric: Metric, value: f64 },

    /// An input field was NaN or infinite.
    #[error("{metric}: {field} is not finite")]
    NonFinite { metric: Metric, field: &'static str },

    /// A prior scale was not finite and strictly positive.
    #[error("{metric}: prior sigma {sigma} must be finite and > 0")]
    InvalidPrior { metric: Metric, sigma: f64 },

    /// A configuration value was out of its domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A summary was requested for an empty sample vector.
    #[error("cannot summarize an empty sample set")]
    EmptySamples,

    /// A sample vector contained NaN or an infinity.
    #[error("sample set contains a non-finite value")]
    NonFiniteSamples,

    /// A zero (or non-finite) median would feed a division while scoring.
    #[error("{metric}: median is zero or not finite; cannot score")]
    ZeroMedian { metric: Metric },

    /// A scoring term overflowed or underflowed to a non-finite or zero value.
    #[error("score term {quantity} is degenerate ({value})")]
    DegenerateScore { quantity: &'static str, value: f64 },

    /// Composite scores summed to zero (or a non-finite value).
    #[error("composite scores sum to {sum}; cannot normalize allocations")]
    ZeroScoreSum { sum: f64 },

    /// Allocation was requested over an empty platform set.
    #[error("no platforms to allocate across")]
    NoPlatforms,

    /// A failure attributed to one platform.
    #[error("platform {platform}: {source}")]
    Platform {
        platform: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach a platform name to this error (idempotent for already-attributed errors).
    pub fn for_platform(self, platform: &str) -> Self {
        match self {
            e @ Error::Platform { .. } => e,
            e => Error::Platform {
                platform: platform.to_string(),
                source: Box::new(e),
            },
        }
    }

    /// The platform this error is attributed to, if any.
    pub fn platform(&self) -> Option<&str> {
        match self {
            Error::Platform { platform, .. } => Some(platform),
            _ => None,
        }
    }
}
