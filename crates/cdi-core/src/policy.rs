// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Decision Policy
// ─────────────────────────────────────────────────────────────────────

use cdi_types::{Decision, GuardError, GuardResult, ThresholdPair, Thresholds};

/// Threshold gate: reject at or above `reject`, warn at or above `warn`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CdiPolicy {
    thresholds: ThresholdPair,
}

impl CdiPolicy {
    pub fn new(warn_threshold: f64, reject_threshold: f64) -> GuardResult<Self> {
        Ok(Self::from_pair(ThresholdPair::new(
            warn_threshold,
            reject_threshold,
        )?))
    }

    pub fn from_pair(thresholds: ThresholdPair) -> Self {
        Self { thresholds }
    }

    /// Fails on [`Thresholds::Uncalibrated`].
    pub fn from_thresholds(thresholds: &Thresholds) -> GuardResult<Self> {
        thresholds.pair().map(Self::from_pair).ok_or_else(|| {
            GuardError::Config("thresholds have not been calibrated".to_string())
        })
    }

    pub fn thresholds(&self) -> ThresholdPair {
        self.thresholds
    }

    pub fn warn_threshold(&self) -> f64 {
        self.thresholds.warn()
    }

    pub fn reject_threshold(&self) -> f64 {
        self.thresholds.reject()
    }

    pub fn decide(&self, cdi: f64) -> Decision {
        if cdi >= self.thresholds.reject() {
            Decision::Reject
        } else if cdi >= self.thresholds.warn() {
            Decision::Warn
        } else {
            Decision::Accept
        }
    }
}

impl Default for CdiPolicy {
    /// Pre-calibration policy (0.7 / 0.9).
    fn default() -> Self {
        Self::from_pair(ThresholdPair::CONSERVATIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_boundaries() {
        let p = CdiPolicy::new(0.7, 0.9).unwrap();
        assert_eq!(p.decide(0.0), Decision::Accept);
        assert_eq!(p.decide(0.6999), Decision::Accept);
        assert_eq!(p.decide(0.7), Decision::Warn);
        assert_eq!(p.decide(0.8999), Decision::Warn);
        assert_eq!(p.decide(0.9), Decision::Reject);
        assert_eq!(p.decide(1.0), Decision::Reject);
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(CdiPolicy::new(0.9, 0.7).is_err());
        assert!(CdiPolicy::new(0.5, 0.5).is_err());
        assert!(CdiPolicy::new(-0.1, 0.5).is_err());
        assert!(CdiPolicy::new(0.5, 1.0).is_err());
    }

    #[test]
    fn test_from_thresholds() {
        let err = CdiPolicy::from_thresholds(&Thresholds::Uncalibrated).unwrap_err();
        assert!(matches!(err, GuardError::Config(_)));
        let pair = ThresholdPair::new(0.4, 0.6).unwrap();
        let p = CdiPolicy::from_thresholds(&Thresholds::Calibrated(pair)).unwrap();
        assert_eq!(p.warn_threshold(), 0.4);
        assert_eq!(p.reject_threshold(), 0.6);
    }

    #[test]
    fn test_default_is_conservative() {
        let p = CdiPolicy::default();
        assert_eq!(p.warn_threshold(), 0.7);
        assert_eq!(p.reject_threshold(), 0.9);
    }
}
