//! End-to-end simulation: posterior -> joint samples -> summaries -> allocation.
//!
//! Every platform is simulated on its own seeded stream (see [`platform_seed`]), so
//! sequential and parallel (`parallel` feature) runs produce identical output.
//!
//! Two entry points cover the two failure policies:
//! - [`simulate_batch`] isolates failures: valid platforms are summarized and
//!   invalid ones are reported by name in [`BatchReport::failures`].
//! - [`run`] is strict: the first failing platform fails the call.

use std::collections::BTreeMap;

use crate::alloc::{allocate, AllocationResult, ScoreConfig};
use crate::error::{Error, Result};
use crate::posterior::{PlatformPosterior, PriorPolicy};
use crate::sampler::{JointSampler, JointSamples, SamplerConfig};
use crate::stable_hash::platform_seed;
use crate::summary::{PlatformSummary, SummaryConfig};
use crate::PlatformInput;

/// Default run seed.
pub const DEFAULT_SEED: u64 = 123;

/// Configuration for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationConfig {
    pub sampler: SamplerConfig,
    pub summary: SummaryConfig,
    pub prior: PriorPolicy,
    /// Run seed; per-platform streams are derived from it.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            summary: SummaryConfig::default(),
            prior: PriorPolicy::default(),
            seed: DEFAULT_SEED,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        self.sampler.validate()?;
        self.summary.validate()?;
        match self.prior {
            PriorPolicy::None => {}
            PriorPolicy::CenteredOnData { sigma } => {
                if !(sigma.is_finite() && sigma > 0.0) {
                    return Err(Error::InvalidConfig("centered prior sigma must be finite and > 0"));
                }
            }
            PriorPolicy::Explicit { cpm, ctr, cvr } => {
                for p in [cpm, ctr, cvr].into_iter().flatten() {
                    if !(p.sigma.is_finite() && p.sigma > 0.0) {
                        return Err(Error::InvalidConfig("explicit prior sigma must be finite and > 0"));
                    }
                    if !p.mu.is_finite() {
                        return Err(Error::InvalidConfig("explicit prior mu must be finite"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Intermediate products of one platform's simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformRun {
    pub posterior: PlatformPosterior,
    pub samples: JointSamples,
    pub summary: PlatformSummary,
}

/// Simulate one platform, keeping posterior and raw samples.
pub fn simulate_platform_detailed(
    platform: &str,
    input: &PlatformInput,
    cfg: &SimulationConfig,
) -> Result<PlatformRun> {
    let inner = || -> Result<PlatformRun> {
        cfg.validate()?;
        let posterior = PlatformPosterior::estimate(input, &cfg.prior)?;
        let seed = platform_seed(cfg.seed, platform);
        tracing::trace!(platform, seed, "derived platform stream");
        let samples = JointSampler::with_seed(cfg.sampler, seed).sample(&posterior)?;
        let summary = PlatformSummary::from_samples(&samples, &cfg.summary)?;
        tracing::debug!(
            platform,
            cpm_loc = posterior.cpm.location,
            ctr_loc = posterior.ctr.location,
            cvr_loc = posterior.cvr.location,
            cpm_p50 = summary.cpm.p50,
            ctr_p50 = summary.ctr.p50,
            cvr_p50 = summary.cvr.p50,
            "simulated platform"
        );
        Ok(PlatformRun {
            posterior,
            samples,
            summary,
        })
    };
    inner().map_err(|e| e.for_platform(platform))
}

/// Simulate one platform and summarize its metrics.
pub fn simulate_platform(
    platform: &str,
    input: &PlatformInput,
    cfg: &SimulationConfig,
) -> Result<PlatformSummary> {
    simulate_platform_detailed(platform, input, cfg).map(|r| r.summary)
}

/// Result of simulating a set of platforms with per-platform failure isolation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchReport {
    pub summaries: BTreeMap<String, PlatformSummary>,
    /// Platforms that could not be simulated, each with its (platform-attributed) error.
    pub failures: BTreeMap<String, Error>,
}

impl BatchReport {
    /// True when every platform was simulated.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Allocate across the successfully simulated platforms only.
    ///
    /// Failed platforms are excluded from normalization but stay listed in `failures`.
    pub fn allocate(&self, cfg: &ScoreConfig) -> Result<AllocationResult> {
        allocate(&self.summaries, cfg)
    }

    /// Convert into a strict result: the first failure (by name) becomes the error.
    pub fn into_result(self) -> Result<BTreeMap<String, PlatformSummary>> {
        match self.failures.into_iter().next() {
            Some((_, e)) => Err(e),
            None => Ok(self.summaries),
        }
    }
}

/// Simulate every platform, isolating per-platform failures.
///
/// Only an invalid `cfg` fails the whole call.
pub fn simulate_batch(
    inputs: &BTreeMap<String, PlatformInput>,
    cfg: &SimulationConfig,
) -> Result<BatchReport> {
    cfg.validate()?;

    #[cfg(feature = "parallel")]
    let results: Vec<(String, Result<PlatformSummary>)> = {
        use rayon::prelude::*;
        inputs
            .par_iter()
            .map(|(name, input)| (name.clone(), simulate_platform(name, input, cfg)))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let results: Vec<(String, Result<PlatformSummary>)> = inputs
        .iter()
        .map(|(name, input)| (name.clone(), simulate_platform(name, input, cfg)))
        .collect();

    let mut report = BatchReport::default();
    for (name, r) in results {
        match r {
            Ok(s) => {
                report.summaries.insert(name, s);
            }
            Err(e) => {
                tracing::warn!(platform = %name, error = %e, "platform simulation failed");
                report.failures.insert(name, e);
            }
        }
    }
    Ok(report)
}

/// Strict end-to-end run: simulate every platform and allocate.
pub fn run(
    inputs: &BTreeMap<String, PlatformInput>,
    sim: &SimulationConfig,
    score: &ScoreConfig,
) -> Result<AllocationResult> {
    if inputs.is_empty() {
        return Err(Error::NoPlatforms);
    }
    let summaries = simulate_batch(inputs, sim)?.into_result()?;
    allocate(&summaries, score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posterior::Prior;

    fn input() -> PlatformInput {
        PlatformInput {
            cpm_mean: 8.0,
            cpm_cv: 0.25,
            ctr_mean: 0.018,
            ctr_std: 0.006,
            cvr_mean: 0.04,
            cvr_std: 0.015,
        }
    }

    fn small_cfg() -> SimulationConfig {
        SimulationConfig {
            sampler: SamplerConfig {
                samples: 1000,
                ..SamplerConfig::default()
            },
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn platform_stream_ignores_batch_membership() {
        let cfg = small_cfg();
        let alone = simulate_platform("Google", &input(), &cfg).unwrap();
        let mut inputs = BTreeMap::new();
        inputs.insert("Google".to_string(), input());
        inputs.insert("Meta".to_string(), input());
        let batch = simulate_batch(&inputs, &cfg).unwrap();
        assert_eq!(batch.summaries["Google"], alone);
        assert_ne!(batch.summaries["Google"], batch.summaries["Meta"]);
    }

    #[test]
    fn invalid_platform_is_isolated_and_named() {
        let mut inputs = BTreeMap::new();
        inputs.insert("Google".to_string(), input());
        inputs.insert(
            "Broken".to_string(),
            PlatformInput {
                ctr_mean: 1.2,
                ..input()
            },
        );
        let report = simulate_batch(&inputs, &small_cfg()).unwrap();
        assert!(!report.is_complete());
        assert!(report.summaries.contains_key("Google"));
        let e = &report.failures["Broken"];
        assert_eq!(e.platform(), Some("Broken"));

        let alloc = report.allocate(&ScoreConfig::default()).unwrap();
        assert_eq!(alloc.allocations.len(), 1);
        assert_eq!(alloc.allocations["Google"], 100.0);

        let strict = run(&inputs, &small_cfg(), &ScoreConfig::default()).unwrap_err();
        assert_eq!(strict.platform(), Some("Broken"));
    }

    #[test]
    fn invalid_config_fails_whole_batch() {
        let cfg = SimulationConfig {
            prior: PriorPolicy::CenteredOnData { sigma: 0.0 },
            ..small_cfg()
        };
        let mut inputs = BTreeMap::new();
        inputs.insert("Google".to_string(), input());
        assert!(matches!(simulate_batch(&inputs, &cfg), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn bad_explicit_prior_is_one_config_error() {
        let cfg = SimulationConfig {
            prior: PriorPolicy::Explicit {
                cpm: None,
                ctr: Some(Prior { mu: -4.0, sigma: 0.0 }),
                cvr: None,
            },
            ..small_cfg()
        };
        let inputs: BTreeMap<String, PlatformInput> = ["Google", "Meta", "TikTok"]
            .iter()
            .map(|p| (p.to_string(), input()))
            .collect();
        assert_eq!(
            simulate_batch(&inputs, &cfg),
            Err(Error::InvalidConfig("explicit prior sigma must be finite and > 0"))
        );

        let nan_mu = SimulationConfig {
            prior: PriorPolicy::Explicit {
                cpm: Some(Prior { mu: f64::NAN, sigma: 1.0 }),
                ctr: None,
                cvr: None,
            },
            ..small_cfg()
        };
        assert!(matches!(nan_mu.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn empty_run_is_an_error() {
        let e = run(&BTreeMap::new(), &small_cfg(), &ScoreConfig::default()).unwrap_err();
        assert_eq!(e, Error::NoPlatforms);
    }

    #[test]
    fn detailed_run_exposes_intermediates() {
        let r = simulate_platform_detailed("Google", &input(), &small_cfg()).unwrap();
        assert_eq!(r.samples.len(), 1000);
        assert!(r.posterior.ctr.scale > 0.0);
        assert_eq!(r.summary, PlatformSummary::from_samples(&r.samples, &SummaryConfig::default()).unwrap());
    }
}
