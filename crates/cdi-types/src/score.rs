// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Guardrail Score Types
// ─────────────────────────────────────────────────────────────────────

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::Reduction;
use crate::error::{GuardError, GuardResult};

/// Empirical quantile with linear interpolation between order statistics.
///
/// `q` is clamped to [0, 1]. Returns `None` for an empty sample.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

/// Same as [`quantile`] for an already ascending slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let h = last as f64 * q.clamp(0.0, 1.0);
    let lo = (h.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Gate outcome for one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Warn,
    Reject,
}

impl Decision {
    pub const ALL: [Decision; 3] = [Decision::Accept, Decision::Warn, Decision::Reject];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Warn => "warn",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = GuardError;

    fn from_str(s: &str) -> GuardResult<Self> {
        match s {
            "accept" => Ok(Self::Accept),
            "warn" => Ok(Self::Warn),
            "reject" => Ok(Self::Reject),
            other => Err(GuardError::Config(format!("unknown decision: {other}"))),
        }
    }
}

/// Validated `(warn, reject)` pair with `0 < warn < reject < 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdPair {
    warn: f64,
    reject: f64,
}

impl ThresholdPair {
    /// Pre-calibration default: warn at 0.7, reject at 0.9.
    pub const CONSERVATIVE: ThresholdPair = ThresholdPair {
        warn: 0.7,
        reject: 0.9,
    };

    pub fn new(warn: f64, reject: f64) -> GuardResult<Self> {
        if !(0.0 < warn && warn < reject && reject < 1.0) {
            return Err(GuardError::Config(format!(
                "thresholds must satisfy 0 < warn < reject < 1, got warn={warn} reject={reject}"
            )));
        }
        Ok(Self { warn, reject })
    }

    pub fn warn(&self) -> f64 {
        self.warn
    }

    pub fn reject(&self) -> f64 {
        self.reject
    }
}

/// Threshold state before and after calibration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub enum Thresholds {
    #[default]
    Uncalibrated,
    Calibrated(ThresholdPair),
}

impl Thresholds {
    pub fn pair(&self) -> Option<ThresholdPair> {
        match self {
            Self::Uncalibrated => None,
            Self::Calibrated(pair) => Some(*pair),
        }
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self, Self::Calibrated(_))
    }
}

/// Decomposed boundary violation: calibration error and stability gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryVector {
    pub calibration: f64,
    pub stability: f64,
}

impl BoundaryVector {
    pub const KEYS: [&'static str; 2] = ["calibration", "stability"];

    pub fn values(&self) -> [f64; 2] {
        [self.calibration, self.stability]
    }

    /// Component by key name.
    pub fn get(&self, key: &str) -> Option<f64> {
        match key {
            "calibration" => Some(self.calibration),
            "stability" => Some(self.stability),
            _ => None,
        }
    }

    pub fn reduce(&self, reduction: Reduction) -> f64 {
        reduction.apply(&self.values())
    }
}

/// Rolling-window statistics over CDI values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitorSummary {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Two-sample Kolmogorov–Smirnov outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsResult {
    pub statistic: f64,
    pub p_value: f64,
    pub drift: bool,
}

/// KS comparison plus the independently computed PSI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub ks: KsResult,
    pub psi: f64,
}

/// Bootstrap confidence interval of a sample mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    pub confidence: f64,
}

/// Calibrator state for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub warn_threshold: Option<f64>,
    pub reject_threshold: Option<f64>,
    pub warn_percentile: f64,
    pub reject_percentile: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_linear_interpolation() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 1.0), Some(4.0));
        // h = 3 * 0.5 = 1.5 → 2 + 0.5 * (3 - 2)
        assert!((quantile(&v, 0.5).unwrap() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_empty_and_single() {
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[0.42], 0.99), Some(0.42));
    }

    #[test]
    fn test_quantile_sorted_empty_is_none() {
        assert_eq!(quantile_sorted(&[], 0.5), None);
        assert_eq!(quantile_sorted(&[0.0, 0.5], 0.5), Some(0.25));
    }

    #[test]
    fn test_threshold_pair_invariant() {
        assert!(ThresholdPair::new(0.7, 0.9).is_ok());
        assert!(ThresholdPair::new(0.9, 0.7).is_err());
        assert!(ThresholdPair::new(0.0, 0.5).is_err());
        assert!(ThresholdPair::new(0.5, 1.0).is_err());
        assert!(ThresholdPair::new(0.5, 0.5).is_err());
    }

    #[test]
    fn test_thresholds_default_uncalibrated() {
        let t = Thresholds::default();
        assert!(!t.is_calibrated());
        assert!(t.pair().is_none());
    }

    #[test]
    fn test_decision_roundtrip_str() {
        for d in Decision::ALL {
            assert_eq!(d.as_str().parse::<Decision>().unwrap(), d);
        }
        assert_eq!(serde_json::to_string(&Decision::Warn).unwrap(), "\"warn\"");
    }

    #[test]
    fn test_boundary_vector_keys() {
        let bv = BoundaryVector {
            calibration: 0.2,
            stability: 0.05,
        };
        assert_eq!(bv.get("calibration"), Some(0.2));
        assert_eq!(bv.get("stability"), Some(0.05));
        assert_eq!(bv.get("other"), None);
        assert!(bv.reduce(Reduction::L2) >= 0.2);
    }
}
