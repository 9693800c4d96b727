// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Guardrail Configuration
// ─────────────────────────────────────────────────────────────────────

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GuardError, GuardResult};

/// Input perturbation used by the stability sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseKind {
    /// `eps * N(0, 1)` per element.
    #[default]
    Gaussian,
    /// `eps * U(-1, 1)` per element.
    Uniform,
}

impl FromStr for NoiseKind {
    type Err = GuardError;

    fn from_str(s: &str) -> GuardResult<Self> {
        match s {
            "gaussian" => Ok(Self::Gaussian),
            "uniform" => Ok(Self::Uniform),
            other => Err(GuardError::Config(format!("unknown noise type: {other}"))),
        }
    }
}

impl fmt::Display for NoiseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gaussian => "gaussian",
            Self::Uniform => "uniform",
        })
    }
}

/// Reduction of a boundary vector to a single scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    #[default]
    L2,
    L1,
    Max,
}

impl Reduction {
    /// Reduce non-negative components to one scalar.
    pub fn apply(self, values: &[f64]) -> f64 {
        match self {
            Self::L2 => values.iter().map(|v| v * v).sum::<f64>().sqrt(),
            Self::L1 => values.iter().map(|v| v.abs()).sum(),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max).max(0.0),
        }
    }
}

impl FromStr for Reduction {
    type Err = GuardError;

    fn from_str(s: &str) -> GuardResult<Self> {
        match s {
            "l2" => Ok(Self::L2),
            "l1" => Ok(Self::L1),
            "max" => Ok(Self::Max),
            other => Err(GuardError::Config(format!("unknown reduction: {other}"))),
        }
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::L2 => "l2",
            Self::L1 => "l1",
            Self::Max => "max",
        })
    }
}

/// Which internal-pressure estimator a guard runs on the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureMode {
    /// Activation + parameter gradient norms (one full backward pass).
    #[default]
    Full,
    /// Margin-gradient norm against one feature tensor.
    Fast,
}

/// Runtime configuration for a CDI guard and its observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// CDI at or above this is a `warn`. Default: 0.7 (pre-calibration).
    pub warn_threshold: f64,

    /// CDI at or above this is a `reject`. Default: 0.9 (pre-calibration).
    pub reject_threshold: f64,

    /// Sub-modules whose outputs are captured on every forward pass.
    pub activation_layers: Vec<String>,

    /// Pressure estimator selected at guard construction.
    pub pressure_mode: PressureMode,

    /// Feature tensor for the fast estimator. Defaults to the last
    /// captured layer when unset.
    pub feature_layer: Option<String>,

    /// Confidence bins for the calibration sub-score. Default: 10.
    pub ece_bins: usize,

    /// Boundary vector reduction on the audit path. Default: l2.
    pub boundary_reduction: Reduction,

    /// Perturbation magnitude for the stability sub-score. Default: 1e-3.
    pub stability_eps: f64,

    /// Perturbation draws per stability estimate. Default: 1.
    pub stability_samples: usize,

    /// Perturbation distribution. Default: gaussian.
    pub noise: NoiseKind,

    /// Rolling monitor capacity. Default: 1000.
    pub window_size: usize,

    /// KS significance level. Default: 0.05.
    pub drift_alpha: f64,

    /// PSI histogram bins over [0, 1]. Default: 10.
    pub psi_bins: usize,

    /// PSI floor for empty bins. Default: 1e-6.
    pub psi_eps: f64,

    /// Service tag stamped on every emitted metric record.
    pub service_name: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            warn_threshold: 0.7,
            reject_threshold: 0.9,
            activation_layers: Vec::new(),
            pressure_mode: PressureMode::Full,
            feature_layer: None,
            ece_bins: 10,
            boundary_reduction: Reduction::L2,
            stability_eps: 1e-3,
            stability_samples: 1,
            noise: NoiseKind::Gaussian,
            window_size: 1000,
            drift_alpha: 0.05,
            psi_bins: 10,
            psi_eps: 1e-6,
            service_name: "cdi_guardrail".to_string(),
        }
    }
}

impl GuardConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> GuardResult<()> {
        if !(0.0 < self.warn_threshold
            && self.warn_threshold < self.reject_threshold
            && self.reject_threshold < 1.0)
        {
            return Err(GuardError::Config(format!(
                "thresholds must satisfy 0 < warn < reject < 1, got warn={} reject={}",
                self.warn_threshold, self.reject_threshold
            )));
        }
        if self.ece_bins == 0 {
            return Err(GuardError::Config("ece_bins must be >= 1".to_string()));
        }
        if !(self.stability_eps >= 0.0 && self.stability_eps.is_finite()) {
            return Err(GuardError::Config(format!(
                "stability_eps must be finite and >= 0, got {}",
                self.stability_eps
            )));
        }
        if self.stability_samples == 0 {
            return Err(GuardError::Config(
                "stability_samples must be >= 1".to_string(),
            ));
        }
        if self.window_size == 0 {
            return Err(GuardError::Config("window_size must be >= 1".to_string()));
        }
        if !(0.0 < self.drift_alpha && self.drift_alpha < 1.0) {
            return Err(GuardError::Config(format!(
                "drift_alpha must be in (0, 1), got {}",
                self.drift_alpha
            )));
        }
        if self.psi_bins == 0 {
            return Err(GuardError::Config("psi_bins must be >= 1".to_string()));
        }
        if self.psi_eps <= 0.0 {
            return Err(GuardError::Config(format!(
                "psi_eps must be > 0, got {}",
                self.psi_eps
            )));
        }
        if self.pressure_mode == PressureMode::Fast && self.activation_layers.is_empty() {
            return Err(GuardError::Config(
                "fast pressure needs at least one activation layer".to_string(),
            ));
        }
        if let Some(feature) = &self.feature_layer {
            if !self.activation_layers.iter().any(|l| l == feature) {
                return Err(GuardError::Config(format!(
                    "feature_layer '{feature}' is not among activation_layers"
                )));
            }
        }
        Ok(())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> GuardResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| GuardError::Config(format!("JSON parse error: {e}")))
    }
}
