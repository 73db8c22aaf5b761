//! Budget scoring and allocation.
//!
//! Each platform's medians and certainties are reduced to a composite score:
//!
//! ```text
//!   cost_per_click        = cpm_p50 / (ctr_p50 * 1000)
//!   cost_per_conversion   = cost_per_click / cvr_p50
//!   overall_conv_rate     = ctr_p50 * cvr_p50
//!   efficiency            = overall_conv_rate / cost_per_conversion
//!   composite             = w_e * efficiency * scale + w_c * avg_certainty
//! ```
//!
//! and scores are normalized into percentages, each rounded on its own to the
//! configured precision. `composite` carries no physical unit; `scale` only balances the two
//! terms, whose natural magnitudes differ by orders of magnitude.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::summary::PlatformSummary;
use crate::Metric;

/// Default multiplier applied to the efficiency term of the composite score.
pub const EFFICIENCY_SCALE: f64 = 1_000_000.0;

/// Largest supported number of decimals for allocation percentages.
pub const MAX_DECIMALS: u32 = 6;

/// Scoring configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreConfig {
    /// Weight of the (scaled) efficiency term.
    pub efficiency_weight: f64,
    /// Weight of the average certainty term.
    pub certainty_weight: f64,
    /// Calibration multiplier for the efficiency term.
    pub efficiency_scale: f64,
    /// Decimal places of allocation percentages (at most [`MAX_DECIMALS`]).
    pub decimals: u32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            efficiency_weight: 0.7,
            certainty_weight: 0.3,
            efficiency_scale: EFFICIENCY_SCALE,
            decimals: 1,
        }
    }
}

impl ScoreConfig {
    pub fn validate(&self) -> Result<()> {
        let nonneg = |x: f64| x.is_finite() && x >= 0.0;
        if !nonneg(self.efficiency_weight) || !nonneg(self.certainty_weight) {
            return Err(Error::InvalidConfig("score weights must be finite and >= 0"));
        }
        if !nonneg(self.efficiency_scale) {
            return Err(Error::InvalidConfig("efficiency_scale must be finite and >= 0"));
        }
        if self.decimals > MAX_DECIMALS {
            return Err(Error::InvalidConfig("decimals must be <= 6"));
        }
        Ok(())
    }
}

/// Per-platform scoring detail.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlatformScore {
    pub composite_score: f64,
    pub cost_per_conversion: f64,
    pub overall_conversion_rate: f64,
    pub avg_certainty: f64,
}

/// Allocation percentages plus the scores they were derived from.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocationResult {
    /// Platform -> percentage; sums to 100 within rounding tolerance.
    pub allocations: BTreeMap<String, f64>,
    pub details: BTreeMap<String, PlatformScore>,
    /// Decimal places used for `allocations`.
    #[cfg_attr(feature = "serde", serde(default = "default_decimals"))]
    pub decimals: u32,
}

#[cfg(feature = "serde")]
fn default_decimals() -> u32 {
    1
}

impl AllocationResult {
    /// Platforms sorted by allocation, highest first (ties: name order).
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut v: Vec<(&str, f64)> = self
            .allocations
            .iter()
            .map(|(k, &p)| (k.as_str(), p))
            .collect();
        v.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        v
    }

    /// Sum of all allocation percentages.
    pub fn total_pct(&self) -> f64 {
        self.allocations.values().sum()
    }
}

impl fmt::Display for AllocationResult {
    /// `"Google: 40.2% Meta: 30.1% ..."`, highest allocation first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = self.decimals as usize;
        for (i, (name, pct)) in self.ranked().into_iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}: {pct:.prec$}%")?;
        }
        Ok(())
    }
}

fn positive_median(summary: &PlatformSummary, metric: Metric) -> Result<f64> {
    let p50 = summary.get(metric).p50;
    if p50.is_finite() && p50 > 0.0 {
        Ok(p50)
    } else {
        Err(Error::ZeroMedian { metric })
    }
}

/// Score one platform from its metric summaries.
pub fn score_platform(summary: &PlatformSummary, cfg: &ScoreConfig) -> Result<PlatformScore> {
    cfg.validate()?;
    let cpm = positive_median(summary, Metric::Cpm)?;
    let ctr = positive_median(summary, Metric::Ctr)?;
    let cvr = positive_median(summary, Metric::Cvr)?;

    let cost_per_click = cpm / (ctr * 1000.0);
    let cost_per_conversion = cost_per_click / cvr;
    let overall_conversion_rate = ctr * cvr;
    let efficiency = overall_conversion_rate / cost_per_conversion;
    let avg_certainty =
        (summary.cpm.certainty_pct + summary.ctr.certainty_pct + summary.cvr.certainty_pct) / 3.0;
    let composite_score = cfg.efficiency_weight * efficiency * cfg.efficiency_scale
        + cfg.certainty_weight * avg_certainty;

    // Positive finite medians can still underflow or overflow in the ratios above.
    for (quantity, value, positive) in [
        ("cost_per_conversion", cost_per_conversion, true),
        ("overall_conversion_rate", overall_conversion_rate, true),
        ("efficiency", efficiency, false),
        ("composite_score", composite_score, false),
    ] {
        if !value.is_finite() || (positive && value <= 0.0) {
            return Err(Error::DegenerateScore { quantity, value });
        }
    }

    Ok(PlatformScore {
        composite_score,
        cost_per_conversion,
        overall_conversion_rate,
        avg_certainty,
    })
}

/// Score every platform and normalize composite scores into percentages.
///
/// The first platform (in name order) that cannot be scored fails the whole call,
/// with the platform attached to the error.
pub fn allocate(
    summaries: &BTreeMap<String, PlatformSummary>,
    cfg: &ScoreConfig,
) -> Result<AllocationResult> {
    cfg.validate()?;
    if summaries.is_empty() {
        return Err(Error::NoPlatforms);
    }
    let mut details = BTreeMap::new();
    for (name, summary) in summaries {
        let score = score_platform(summary, cfg).map_err(|e| e.for_platform(name))?;
        details.insert(name.clone(), score);
    }
    let scores: BTreeMap<String, f64> = details
        .iter()
        .map(|(k, s)| (k.clone(), s.composite_score))
        .collect();
    let allocations = apportion_pct(&scores, cfg.decimals)?;
    tracing::debug!(platforms = details.len(), "allocated budget");
    Ok(AllocationResult {
        allocations,
        details,
        decimals: cfg.decimals,
    })
}

/// Normalize non-negative scores into percentages rounded to `decimals` places.
///
/// Each share is rounded on its own (half away from zero), so equal scores always get
/// equal percentages. The total is 100 only up to `n * 0.5 * 10^-decimals`.
pub fn apportion_pct(scores: &BTreeMap<String, f64>, decimals: u32) -> Result<BTreeMap<String, f64>> {
    if scores.is_empty() {
        return Err(Error::NoPlatforms);
    }
    if decimals > MAX_DECIMALS {
        return Err(Error::InvalidConfig("decimals must be <= 6"));
    }
    if scores.values().any(|s| !s.is_finite() || *s < 0.0) {
        return Err(Error::InvalidConfig("scores must be finite and >= 0"));
    }
    let sum: f64 = scores.values().sum();
    if !(sum.is_finite() && sum > 0.0) {
        return Err(Error::ZeroScoreSum { sum });
    }

    let factor = 10f64.powi(decimals as i32);
    Ok(scores
        .iter()
        .map(|(k, &s)| (k.clone(), (s / sum * 100.0 * factor).round() / factor))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::MetricSummary;
    use proptest::prelude::*;

    fn ms(p10: f64, p50: f64, p90: f64, certainty_pct: f64) -> MetricSummary {
        MetricSummary {
            p10,
            p50,
            p90,
            mean: p50,
            window_mean: p50,
            certainty_pct,
            stability_pct: 0.0,
        }
    }

    // Shape of the fixture platform data used in the reference scenario.
    fn reference_summary() -> PlatformSummary {
        PlatformSummary {
            cpm: ms(5.664778196438264, 7.748258114294895, 10.626222794664285, 45.5),
            ctr: ms(0.009844314766653995, 0.017798830325474795, 0.032348327546177495, 24.7),
            cvr: ms(0.024587983039335726, 0.039662794836444526, 0.06417009887270245, 31.24),
        }
    }

    #[test]
    fn score_matches_formula() {
        let s = reference_summary();
        let sc = score_platform(&s, &ScoreConfig::default()).unwrap();
        let cpc = s.cpm.p50 / (s.ctr.p50 * 1000.0);
        let cpconv = cpc / s.cvr.p50;
        let ocr = s.ctr.p50 * s.cvr.p50;
        let avg = (45.5 + 24.7 + 31.24) / 3.0;
        let composite = 0.7 * (ocr / cpconv) * 1e6 + 0.3 * avg;
        assert!((sc.cost_per_conversion - cpconv).abs() < 1e-9);
        assert!((sc.overall_conversion_rate - ocr).abs() < 1e-15);
        assert!((sc.avg_certainty - avg).abs() < 1e-12);
        assert!((sc.composite_score - composite).abs() < 1e-9);
    }

    #[test]
    fn equal_platforms_split_evenly() {
        let m: BTreeMap<String, PlatformSummary> = ["Google", "LinkedIn", "Meta", "TikTok"]
            .iter()
            .map(|k| (k.to_string(), reference_summary()))
            .collect();
        let r = allocate(&m, &ScoreConfig::default()).unwrap();
        for v in r.allocations.values() {
            assert_eq!(*v, 25.0);
        }
        assert!((r.total_pct() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_median_is_attributed_to_platform() {
        let mut bad = reference_summary();
        bad.ctr.p50 = 0.0;
        let mut m = BTreeMap::new();
        m.insert("Good".to_string(), reference_summary());
        m.insert("Bad".to_string(), bad);
        let e = allocate(&m, &ScoreConfig::default()).unwrap_err();
        assert_eq!(e.platform(), Some("Bad"));
        assert!(matches!(
            e,
            Error::Platform { ref source, .. } if **source == Error::ZeroMedian { metric: Metric::Ctr }
        ));
    }

    #[test]
    fn zero_score_sum_is_an_error() {
        let cfg = ScoreConfig {
            efficiency_weight: 0.0,
            certainty_weight: 0.0,
            ..ScoreConfig::default()
        };
        let mut m = BTreeMap::new();
        m.insert("a".to_string(), reference_summary());
        assert!(matches!(allocate(&m, &cfg), Err(Error::ZeroScoreSum { .. })));
    }

    #[test]
    fn empty_set_is_an_error() {
        assert_eq!(
            allocate(&BTreeMap::new(), &ScoreConfig::default()),
            Err(Error::NoPlatforms)
        );
    }

    #[test]
    fn thirds_round_independently() {
        let scores: BTreeMap<String, f64> =
            [("a", 1.0), ("b", 1.0), ("c", 1.0)].iter().map(|(k, v)| (k.to_string(), *v)).collect();
        let p = apportion_pct(&scores, 1).unwrap();
        assert_eq!(p["a"], 33.3);
        assert_eq!(p["b"], 33.3);
        assert_eq!(p["c"], 33.3);
    }

    #[test]
    fn equal_scores_get_equal_shares_next_to_a_smaller_one() {
        let scores: BTreeMap<String, f64> = [("a", 0.3344), ("b", 0.3344), ("c", 0.3312)]
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        let p = apportion_pct(&scores, 1).unwrap();
        assert_eq!(p["a"], 33.4);
        assert_eq!(p["b"], 33.4);
        assert_eq!(p["c"], 33.1);
    }

    #[test]
    fn identical_summaries_allocate_identically() {
        let m: BTreeMap<String, PlatformSummary> = ["A", "B", "C"]
            .iter()
            .map(|k| (k.to_string(), reference_summary()))
            .collect();
        let r = allocate(&m, &ScoreConfig::default()).unwrap();
        for v in r.allocations.values() {
            assert_eq!(*v, 33.3);
        }
    }

    #[test]
    fn tiny_cpm_median_is_a_score_error() {
        let mut tiny = reference_summary();
        tiny.cpm.p50 = 1e-310;
        let e = score_platform(&tiny, &ScoreConfig::default()).unwrap_err();
        assert!(matches!(e, Error::DegenerateScore { .. }), "{e:?}");
    }

    #[test]
    fn degenerate_score_names_the_platform() {
        let mut tiny = reference_summary();
        tiny.cpm.p50 = 1e-310;
        let mut m = BTreeMap::new();
        m.insert("Normal".to_string(), reference_summary());
        m.insert("Tiny".to_string(), tiny);
        let e = allocate(&m, &ScoreConfig::default()).unwrap_err();
        assert_eq!(e.platform(), Some("Tiny"));
        assert!(matches!(
            e,
            Error::Platform { ref source, .. } if matches!(**source, Error::DegenerateScore { .. })
        ));
    }

    #[test]
    fn display_ranks_highest_first() {
        let mut r = AllocationResult {
            decimals: 1,
            ..AllocationResult::default()
        };
        r.allocations.insert("Meta".to_string(), 20.0);
        r.allocations.insert("Google".to_string(), 50.5);
        r.allocations.insert("TikTok".to_string(), 29.5);
        assert_eq!(r.to_string(), "Google: 50.5% TikTok: 29.5% Meta: 20.0%");
    }

    #[test]
    fn custom_scale_is_honored() {
        let s = reference_summary();
        let cfg = ScoreConfig {
            efficiency_scale: 0.0,
            ..ScoreConfig::default()
        };
        let sc = score_platform(&s, &cfg).unwrap();
        assert!((sc.composite_score - 0.3 * sc.avg_certainty).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn apportioned_percentages_round_each_share(
            vals in proptest::collection::vec(0.0f64..1.0e6, 1..12),
            decimals in 0u32..=3,
        ) {
            prop_assume!(vals.iter().any(|v| *v > 0.0));
            let scores: BTreeMap<String, f64> = vals
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("p{i:02}"), *v))
                .collect();
            let p = apportion_pct(&scores, decimals).unwrap();
            prop_assert_eq!(p.len(), scores.len());
            let half_unit = 0.5 * 10f64.powi(-(decimals as i32));
            let sum: f64 = p.values().sum();
            prop_assert!(
                (sum - 100.0).abs() <= vals.len() as f64 * half_unit + 1e-9,
                "sum={}", sum
            );
            let total: f64 = vals.iter().sum();
            for (k, v) in &p {
                prop_assert!(*v >= 0.0);
                let exact = scores[k] / total * 100.0;
                prop_assert!((v - exact).abs() <= half_unit + 1e-9, "{} vs {}", v, exact);
            }
        }

        #[test]
        fn equal_scores_get_equal_percentages(
            shared in 1.0e-3f64..1.0e6,
            copies in 2usize..6,
            others in proptest::collection::vec(0.0f64..1.0e6, 0..6),
            decimals in 0u32..=3,
        ) {
            let mut scores = BTreeMap::new();
            for i in 0..copies {
                scores.insert(format!("same{i}"), shared);
            }
            for (i, v) in others.iter().enumerate() {
                scores.insert(format!("other{i}"), *v);
            }
            let p = apportion_pct(&scores, decimals).unwrap();
            let first = p["same0"];
            for i in 1..copies {
                prop_assert_eq!(p[&format!("same{i}")], first);
            }
        }
    }
}
