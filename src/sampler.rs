//! Correlated joint sampling of CPM, CTR and CVR for one platform.
//!
//! Each simulated unit draws one shared latent factor (a platform-wide demand shock).
//! Every metric's transformed value is then
//!
//! ```text
//!   posterior draw + loading * latent + residual noise
//! ```
//!
//! and is mapped back to natural units (sigmoid + clamp for rates, `exp` for cost).
//! The shared term is what makes the three metrics move together within a draw;
//! draws are independent of each other.
//!
//! Notes:
//! - The sampler is **seedable**; [`JointSampler::new`] uses a fixed seed.
//! - Draw order within a unit is fixed (latent, then CTR, CVR, CPM; posterior draw before
//!   residual), so a given seed always produces the same samples.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::math::{clamp, gaussian, sigmoid, standard_normal};
use crate::posterior::{PlatformPosterior, PosteriorParams};
use crate::Metric;

/// Lower clamp for sampled rates.
pub const RATE_FLOOR: f64 = 0.001;
/// Upper clamp for sampled rates.
pub const RATE_CEIL: f64 = 0.999;

/// Default number of draws per simulation run.
pub const DEFAULT_SAMPLES: usize = 5000;

/// Loadings of each metric on the shared latent factor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatentLoadings {
    pub ctr: f64,
    pub cvr: f64,
    pub cpm: f64,
}

impl Default for LatentLoadings {
    fn default() -> Self {
        Self {
            ctr: 0.40,
            cvr: 0.30,
            cpm: 0.15,
        }
    }
}

impl LatentLoadings {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Cpm => self.cpm,
            Metric::Ctr => self.ctr,
            Metric::Cvr => self.cvr,
        }
    }
}

/// Standard deviations of metric-specific residual noise (transformed space).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResidualScales {
    /// Logit scale.
    pub ctr: f64,
    /// Logit scale.
    pub cvr: f64,
    /// Log scale.
    pub cpm: f64,
}

impl Default for ResidualScales {
    fn default() -> Self {
        Self {
            ctr: 0.25,
            cvr: 0.25,
            cpm: 0.20,
        }
    }
}

impl ResidualScales {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Cpm => self.cpm,
            Metric::Ctr => self.ctr,
            Metric::Cvr => self.cvr,
        }
    }
}

/// Configuration for joint sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplerConfig {
    /// Draws per run (must be > 0).
    pub samples: usize,
    pub loadings: LatentLoadings,
    /// Residual scales (must be finite and >= 0).
    pub residuals: ResidualScales,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            loadings: LatentLoadings::default(),
            residuals: ResidualScales::default(),
        }
    }
}

impl SamplerConfig {
    /// Check the configuration domain.
    pub fn validate(&self) -> Result<()> {
        if self.samples == 0 {
            return Err(Error::InvalidConfig("sample count must be > 0"));
        }
        for m in Metric::ALL {
            if !self.loadings.get(m).is_finite() {
                return Err(Error::InvalidConfig("latent loadings must be finite"));
            }
            let r = self.residuals.get(m);
            if !(r.is_finite() && r >= 0.0) {
                return Err(Error::InvalidConfig("residual scales must be finite and >= 0"));
            }
        }
        Ok(())
    }
}

/// Natural-unit sample vectors for one platform, index-aligned by draw.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointSamples {
    /// Cost per mille, `>= 0`.
    pub cpm: Vec<f64>,
    /// Click-through rate in `[RATE_FLOOR, RATE_CEIL]`.
    pub ctr: Vec<f64>,
    /// Conversion rate in `[RATE_FLOOR, RATE_CEIL]`.
    pub cvr: Vec<f64>,
}

impl JointSamples {
    fn with_capacity(n: usize) -> Self {
        Self {
            cpm: Vec::with_capacity(n),
            ctr: Vec::with_capacity(n),
            cvr: Vec::with_capacity(n),
        }
    }

    /// Number of draws.
    pub fn len(&self) -> usize {
        self.ctr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ctr.is_empty()
    }

    /// Samples for one metric.
    pub fn get(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Cpm => &self.cpm,
            Metric::Ctr => &self.ctr,
            Metric::Cvr => &self.cvr,
        }
    }
}

/// Seedable joint sampler.
#[derive(Debug, Clone)]
pub struct JointSampler {
    cfg: SamplerConfig,
    rng: StdRng,
}

impl JointSampler {
    /// Create a sampler with a deterministic fixed seed (0).
    pub fn new(cfg: SamplerConfig) -> Self {
        Self::with_seed(cfg, 0)
    }

    /// Create a sampler with a fixed seed (reproducible).
    pub fn with_seed(cfg: SamplerConfig, seed: u64) -> Self {
        Self {
            cfg,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.cfg
    }

    /// Draw `cfg.samples` correlated triples from `post`.
    pub fn sample(&mut self, post: &PlatformPosterior) -> Result<JointSamples> {
        self.sample_n(post, self.cfg.samples)
    }

    /// Draw `n` correlated triples from `post`.
    pub fn sample_n(&mut self, post: &PlatformPosterior, n: usize) -> Result<JointSamples> {
        if n == 0 {
            return Err(Error::InvalidConfig("sample count must be > 0"));
        }
        self.cfg.validate()?;
        let mut out = JointSamples::with_capacity(n);
        for _ in 0..n {
            let latent = standard_normal(&mut self.rng);
            let ctr = self.transformed_draw(Metric::Ctr, post.ctr, latent);
            let cvr = self.transformed_draw(Metric::Cvr, post.cvr, latent);
            let cpm = self.transformed_draw(Metric::Cpm, post.cpm, latent);
            out.ctr.push(rate_from_logit(ctr));
            out.cvr.push(rate_from_logit(cvr));
            out.cpm.push(cpm.exp());
        }
        Ok(out)
    }

    fn transformed_draw(&mut self, metric: Metric, post: PosteriorParams, latent: f64) -> f64 {
        let base = gaussian(&mut self.rng, post.location, post.scale);
        let resid = gaussian(&mut self.rng, 0.0, self.cfg.residuals.get(metric));
        base + self.cfg.loadings.get(metric) * latent + resid
    }
}

impl Default for JointSampler {
    fn default() -> Self {
        Self::new(SamplerConfig::default())
    }
}

/// Inverse-logit followed by the rate clamp.
#[inline]
#[must_use]
pub fn rate_from_logit(z: f64) -> f64 {
    clamp(sigmoid(z), RATE_FLOOR, RATE_CEIL)
}
