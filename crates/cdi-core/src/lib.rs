// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Guardrail Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Per-prediction risk scoring for differentiable classifiers.
//!
//! The Consistency Deviation Index combines two signals:
//! internal pressure `P` (gradient magnitudes inside the model) and
//! boundary violation `B` (calibration error, output instability):
//!
//! `CDI = P / (P + B + 1e-12)`
//!
//! A high CDI flags predictions that look well-behaved from outside
//! while the model strains internally. [`CdiPolicy`] turns the score
//! into accept / warn / reject; [`CdiCalibrator`] fits the thresholds.
//!
//! # Invariants
//!
//! 1. **Read-only model**: the guard never modifies model parameters.
//!    Gradients are returned by value from [`ClassifierModel::backward`],
//!    so no gradient state survives a call.
//!
//! 2. **Per-call capture**: every forward pass yields its own
//!    [`CaptureRecord`]. Concurrent calls on one guard never share it.
//!
//! 3. **No guessed decisions**: a non-finite CDI aborts the prediction
//!    with [`cdi_types::GuardError::Numerical`].

pub mod boundary;
pub mod calibrator;
pub mod guard;
pub mod loss;
pub mod mlp;
pub mod model;
pub mod policy;
pub mod pressure;
pub mod scorer;
pub mod tensor;

pub use boundary::{
    compute_boundary_vector, expected_calibration_error, prediction_stability_gap,
    reduce_boundary_vector, StabilitySettings,
};
pub use calibrator::CdiCalibrator;
pub use guard::{CdiGuard, CdiPrediction, DetailedOptions, DetailedReport};
pub use loss::{cross_entropy, margin_loss, Loss};
pub use mlp::{Activation, Layer, Mlp};
pub use model::{
    BackwardRequest, CaptureRecord, ClassifierModel, ForwardPass, Gradients, ParameterGrad,
    ParameterInfo,
};
pub use policy::CdiPolicy;
pub use pressure::{activation_and_param_pressure, representation_pressure, PressureEstimator};
pub use scorer::{compute_cdi, CDI_EPS};
pub use tensor::Tensor;
