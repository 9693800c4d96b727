// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Guard
// ─────────────────────────────────────────────────────────────────────
//! Wraps a [`ClassifierModel`] with per-prediction CDI scoring.
//!
//! - **Level 1** [`CdiGuard::forward_with_cdi`]: hot path. Capture
//!   forward, pressure, ECE boundary, CDI, decision.
//! - **Level 2** [`CdiGuard::forward_detailed`]: audit path. Decomposed
//!   boundary vector (calibration, stability) plus its reduction. Never
//!   touches Level 1 state.
//!
//! The guard only reads the model. Each call owns its capture record
//! and gradients, so one guard can serve concurrent callers.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use cdi_types::{
    BoundaryVector, Decision, GuardConfig, GuardError, GuardResult, MetricsSink, NoiseKind,
    PressureMode, Reduction, ThresholdPair,
};

use crate::boundary::{compute_boundary_vector, expected_calibration_error, StabilitySettings};
use crate::loss::{check_labels, cross_entropy};
use crate::model::ClassifierModel;
use crate::policy::CdiPolicy;
use crate::pressure::PressureEstimator;
use crate::scorer::compute_cdi;
use crate::tensor::Tensor;

/// Level 1 result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CdiPrediction {
    /// Argmax class per sample.
    pub prediction: Vec<usize>,
    pub cdi: f64,
    pub decision: Decision,
    pub pressure: f64,
    pub boundary: f64,
    pub latency_ms: f64,
}

/// Level 2 knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailedOptions {
    pub reduction: Reduction,
    pub stability_eps: f64,
    pub stability_samples: usize,
    pub noise: NoiseKind,
    /// Fixed seed for the perturbation draws; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl DetailedOptions {
    pub fn from_config(config: &GuardConfig) -> Self {
        Self {
            reduction: config.boundary_reduction,
            stability_eps: config.stability_eps,
            stability_samples: config.stability_samples,
            noise: config.noise,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for DetailedOptions {
    fn default() -> Self {
        Self::from_config(&GuardConfig::default())
    }
}

/// Level 2 result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedReport {
    pub prediction: Vec<usize>,
    pub boundary_vector: BoundaryVector,
    pub boundary_scalar: f64,
}

pub struct CdiGuard<M: ClassifierModel> {
    model: Arc<M>,
    config: GuardConfig,
    estimator: PressureEstimator,
    policy: RwLock<CdiPolicy>,
    sink: Option<Arc<dyn MetricsSink>>,
}

impl<M: ClassifierModel> CdiGuard<M> {
    /// Build a guard; fails on an invalid config or on activation layers
    /// the model does not expose.
    pub fn new(model: Arc<M>, config: GuardConfig) -> GuardResult<Self> {
        config.validate()?;
        let modules = model.named_modules();
        if let Some(unknown) = config
            .activation_layers
            .iter()
            .find(|l| !modules.contains(l))
        {
            return Err(GuardError::Config(format!(
                "activation layer '{unknown}' is not a sub-module of the model"
            )));
        }

        let estimator = match config.pressure_mode {
            PressureMode::Full => PressureEstimator::Full,
            PressureMode::Fast => {
                let feature_layer = match &config.feature_layer {
                    Some(layer) => layer.clone(),
                    // Last captured layer in forward order.
                    None => modules
                        .iter()
                        .rev()
                        .find(|m| config.activation_layers.contains(m))
                        .cloned()
                        .ok_or_else(|| {
                            GuardError::Config(
                                "fast pressure needs at least one activation layer".to_string(),
                            )
                        })?,
                };
                PressureEstimator::Fast { feature_layer }
            }
        };

        let policy = CdiPolicy::from_pair(ThresholdPair::new(
            config.warn_threshold,
            config.reject_threshold,
        )?);

        Ok(Self {
            model,
            config,
            estimator,
            policy: RwLock::new(policy),
            sink: None,
        })
    }

    pub fn with_policy(self, policy: CdiPolicy) -> Self {
        *self.policy.write() = policy;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn policy(&self) -> CdiPolicy {
        *self.policy.read()
    }

    /// Swap the live policy (e.g. after calibration). Calls in flight
    /// finish with the policy they read.
    pub fn set_policy(&self, policy: CdiPolicy) {
        *self.policy.write() = policy;
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn estimator(&self) -> &PressureEstimator {
        &self.estimator
    }

    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    /// Argmax class per sample, no scoring.
    pub fn predict(&self, x: &Tensor) -> GuardResult<Vec<usize>> {
        Ok(self.model.forward(x)?.argmax_rows())
    }

    /// Level 1: forward pass with CDI risk scoring.
    pub fn forward_with_cdi(&self, x: &Tensor, labels: &[usize]) -> GuardResult<CdiPrediction> {
        let start = Instant::now();

        let pass = self
            .model
            .forward_with_capture(x, &self.config.activation_layers)?;
        let loss = cross_entropy(&pass.logits, labels)?;
        let pressure = self
            .estimator
            .estimate(self.model.as_ref(), &pass, &loss, labels)?;
        let boundary = expected_calibration_error(&pass.logits, labels, self.config.ece_bins)?;

        let cdi = compute_cdi(pressure, boundary);
        if !cdi.is_finite() {
            log::error!(
                "non-finite CDI (pressure={pressure}, boundary={boundary}); prediction aborted"
            );
            return Err(GuardError::Numerical(format!(
                "CDI is not finite: pressure={pressure} boundary={boundary}"
            )));
        }

        let decision = self.policy().decide(cdi);
        if decision == Decision::Reject {
            log::error!("prediction rejected: cdi={cdi:.4} pressure={pressure:.4e} boundary={boundary:.4e}");
        }
        let latency_ms = start.elapsed().as_secs_f64() * 1e3;
        if let Some(sink) = &self.sink {
            sink.log_prediction(cdi, decision, Some(latency_ms));
        }

        Ok(CdiPrediction {
            prediction: pass.logits.argmax_rows(),
            cdi,
            decision,
            pressure,
            boundary,
            latency_ms,
        })
    }

    /// Level 2: decomposed boundary evidence. No gradients are computed.
    pub fn forward_detailed(
        &self,
        x: &Tensor,
        labels: &[usize],
        options: &DetailedOptions,
    ) -> GuardResult<DetailedReport> {
        let logits = self.model.forward(x)?;
        check_labels(&logits, labels)?;

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let boundary_vector = compute_boundary_vector(
            self.model.as_ref(),
            x,
            &logits,
            labels,
            self.config.ece_bins,
            StabilitySettings {
                eps: options.stability_eps,
                samples: options.stability_samples,
                noise: options.noise,
            },
            &mut rng,
        )?;

        Ok(DetailedReport {
            prediction: logits.argmax_rows(),
            boundary_scalar: boundary_vector.reduce(options.reduction),
            boundary_vector,
        })
    }
}
