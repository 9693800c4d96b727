// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Threshold Calibrator
// ─────────────────────────────────────────────────────────────────────
//! Learns `(warn, reject)` thresholds as empirical quantiles of a
//! calibration corpus of CDI scores.
//!
//! Fitting only produces thresholds. Moving a live guard onto them is a
//! separate step: `CdiPolicy::from_thresholds` then `CdiGuard::set_policy`.

use cdi_types::score::quantile_sorted;
use cdi_types::{CalibrationSummary, GuardError, GuardResult, ThresholdPair, Thresholds};

pub const DEFAULT_WARN_PERCENTILE: f64 = 0.85;
pub const DEFAULT_REJECT_PERCENTILE: f64 = 0.95;

#[derive(Debug, Clone, PartialEq)]
pub struct CdiCalibrator {
    warn_percentile: f64,
    reject_percentile: f64,
    thresholds: Thresholds,
}

impl CdiCalibrator {
    pub fn new(warn_percentile: f64, reject_percentile: f64) -> GuardResult<Self> {
        if !(0.0 < warn_percentile && warn_percentile < reject_percentile && reject_percentile < 1.0)
        {
            return Err(GuardError::Config(format!(
                "percentiles must satisfy 0 < warn < reject < 1, got warn={warn_percentile} reject={reject_percentile}"
            )));
        }
        Ok(Self {
            warn_percentile,
            reject_percentile,
            thresholds: Thresholds::Uncalibrated,
        })
    }

    /// Fit thresholds from `scores`.
    ///
    /// Fails on an empty or non-finite corpus, and when the quantiles do
    /// not form a valid pair (e.g. a constant corpus). A failed fit keeps
    /// the previous thresholds.
    pub fn fit(&mut self, scores: &[f64]) -> GuardResult<ThresholdPair> {
        if scores.is_empty() {
            return Err(GuardError::Config(
                "cannot calibrate on an empty score corpus".to_string(),
            ));
        }
        if scores.iter().any(|v| !v.is_finite()) {
            return Err(GuardError::Config(
                "calibration corpus contains non-finite scores".to_string(),
            ));
        }
        let mut sorted = scores.to_vec();
        sorted.sort_by(f64::total_cmp);
        let (Some(warn), Some(reject)) = (
            quantile_sorted(&sorted, self.warn_percentile),
            quantile_sorted(&sorted, self.reject_percentile),
        ) else {
            return Err(GuardError::Numerical(
                "calibration quantiles are undefined".to_string(),
            ));
        };

        let pair = ThresholdPair::new(warn, reject)?;
        log::debug!(
            "calibrated CDI thresholds on {} scores: warn={warn:.6} (p{}) reject={reject:.6} (p{})",
            scores.len(),
            self.warn_percentile * 100.0,
            self.reject_percentile * 100.0,
        );
        self.thresholds = Thresholds::Calibrated(pair);
        Ok(pair)
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn warn_percentile(&self) -> f64 {
        self.warn_percentile
    }

    pub fn reject_percentile(&self) -> f64 {
        self.reject_percentile
    }

    pub fn summary(&self) -> CalibrationSummary {
        let pair = self.thresholds.pair();
        CalibrationSummary {
            warn_threshold: pair.map(|p| p.warn()),
            reject_threshold: pair.map(|p| p.reject()),
            warn_percentile: self.warn_percentile,
            reject_percentile: self.reject_percentile,
        }
    }
}

impl Default for CdiCalibrator {
    fn default() -> Self {
        Self {
            warn_percentile: DEFAULT_WARN_PERCENTILE,
            reject_percentile: DEFAULT_REJECT_PERCENTILE,
            thresholds: Thresholds::Uncalibrated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::CdiPolicy;
    use cdi_types::Decision;

    fn corpus() -> Vec<f64> {
        (1..=100).map(|i| i as f64 / 101.0).collect()
    }

    #[test]
    fn test_percentile_validation() {
        assert!(CdiCalibrator::new(0.95, 0.85).is_err());
        assert!(CdiCalibrator::new(0.0, 0.5).is_err());
        assert!(CdiCalibrator::new(0.5, 1.0).is_err());
        assert!(CdiCalibrator::new(0.8, 0.95).is_ok());
    }

    #[test]
    fn test_fit_matches_linear_quantiles() {
        let mut cal = CdiCalibrator::default();
        let pair = cal.fit(&corpus()).unwrap();
        // h = 99 * 0.85 = 84.15 → 85/101 + 0.15/101
        assert!((pair.warn() - 85.15 / 101.0).abs() < 1e-9);
        assert!((pair.reject() - 95.05 / 101.0).abs() < 1e-9);
        assert!(cal.thresholds().is_calibrated());
    }

    #[test]
    fn test_fit_errors() {
        let mut cal = CdiCalibrator::default();
        assert!(matches!(cal.fit(&[]), Err(GuardError::Config(_))));
        assert!(cal.fit(&[0.5; 10]).is_err());
        assert!(cal.fit(&[0.2, f64::NAN]).is_err());
        assert!(!cal.thresholds().is_calibrated());
    }

    #[test]
    fn test_summary_before_and_after() {
        let mut cal = CdiCalibrator::new(0.8, 0.95).unwrap();
        let before = cal.summary();
        assert_eq!(before.warn_threshold, None);
        assert_eq!(before.warn_percentile, 0.8);
        let pair = cal.fit(&corpus()).unwrap();
        let after = cal.summary();
        assert_eq!(after.warn_threshold, Some(pair.warn()));
        assert_eq!(after.reject_threshold, Some(pair.reject()));
    }

    #[test]
    fn test_calibrated_policy_splits_corpus() {
        let scores = corpus();
        let mut cal = CdiCalibrator::new(0.8, 0.95).unwrap();
        cal.fit(&scores).unwrap();
        let policy = CdiPolicy::from_thresholds(&cal.thresholds()).unwrap();
        let count = |d| scores.iter().filter(|&&s| policy.decide(s) == d).count();
        assert!(count(Decision::Accept) > 0);
        assert!(count(Decision::Warn) > 0);
        assert!(count(Decision::Reject) > 0);
    }
}
