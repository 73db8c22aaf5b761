//! Caller-owned cache of platform summaries.
//!
//! The simulation core never reads or writes this cache. A calling layer (UI,
//! report builder) owns one and decides when entries are reused.
//!
//! Invalidation rules:
//! - an entry is reused only when the fingerprint of (platform, input, config) matches
//!   and the stored input and config compare equal;
//!   any change to the input or the simulation config recomputes it;
//! - [`SummaryCache::invalidate`] drops one platform, [`SummaryCache::clear`] drops all.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::pipeline::{simulate_platform, SimulationConfig};
use crate::posterior::PriorPolicy;
use crate::stable_hash::{stable_hash64, stable_hash_f64s};
use crate::summary::PlatformSummary;
use crate::PlatformInput;

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    fingerprint: u64,
    input: PlatformInput,
    cfg: SimulationConfig,
    summary: PlatformSummary,
}

impl Entry {
    // Fingerprint first; the full comparison guards against hash collisions.
    fn matches(&self, fp: u64, input: &PlatformInput, cfg: &SimulationConfig) -> bool {
        self.fingerprint == fp && self.input == *input && self.cfg == *cfg
    }
}

/// Summary cache keyed by platform name.
#[derive(Debug, Clone, Default)]
pub struct SummaryCache {
    entries: BTreeMap<String, Entry>,
    stats: CacheStats,
}

impl SummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint of everything that determines a platform's summary.
    #[must_use]
    pub fn fingerprint(platform: &str, input: &PlatformInput, cfg: &SimulationConfig) -> u64 {
        let mut v = vec![
            input.cpm_mean,
            input.cpm_cv,
            input.ctr_mean,
            input.ctr_std,
            input.cvr_mean,
            input.cvr_std,
            cfg.sampler.samples as f64,
            cfg.sampler.loadings.ctr,
            cfg.sampler.loadings.cvr,
            cfg.sampler.loadings.cpm,
            cfg.sampler.residuals.ctr,
            cfg.sampler.residuals.cvr,
            cfg.sampler.residuals.cpm,
            cfg.summary.window_frac,
        ];
        match cfg.prior {
            PriorPolicy::None => v.push(0.0),
            PriorPolicy::CenteredOnData { sigma } => v.extend([1.0, sigma]),
            PriorPolicy::Explicit { cpm, ctr, cvr } => {
                v.push(2.0);
                for p in [cpm, ctr, cvr] {
                    match p {
                        Some(p) => v.extend([1.0, p.mu, p.sigma]),
                        None => v.push(0.0),
                    }
                }
            }
        }
        stable_hash_f64s(stable_hash64(cfg.seed, platform), &v)
    }

    /// Cached summary, if present and still valid for `(input, cfg)`.
    pub fn get(
        &self,
        platform: &str,
        input: &PlatformInput,
        cfg: &SimulationConfig,
    ) -> Option<&PlatformSummary> {
        let fp = Self::fingerprint(platform, input, cfg);
        self.entries
            .get(platform)
            .filter(|e| e.matches(fp, input, cfg))
            .map(|e| &e.summary)
    }

    /// Return the cached summary or simulate and store it.
    ///
    /// Errors are returned as-is and never cached.
    pub fn get_or_compute(
        &mut self,
        platform: &str,
        input: &PlatformInput,
        cfg: &SimulationConfig,
    ) -> Result<PlatformSummary> {
        let fp = Self::fingerprint(platform, input, cfg);
        if let Some(e) = self.entries.get(platform) {
            if e.matches(fp, input, cfg) {
                self.stats.hits += 1;
                return Ok(e.summary);
            }
        }
        self.stats.misses += 1;
        let summary = simulate_platform(platform, input, cfg)?;
        self.entries.insert(
            platform.to_string(),
            Entry {
                fingerprint: fp,
                input: *input,
                cfg: *cfg,
                summary,
            },
        );
        Ok(summary)
    }

    /// Drop one platform's entry. Returns whether an entry existed.
    pub fn invalidate(&mut self, platform: &str) -> bool {
        self.entries.remove(platform).is_some()
    }

    /// Drop every entry (counters are kept).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
