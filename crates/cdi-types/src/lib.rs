// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Guardrail Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! CDI Guardrail, the per-prediction risk gate for classifier models.

pub mod config;
pub mod error;
pub mod score;
pub mod sink;

pub use config::{GuardConfig, NoiseKind, PressureMode, Reduction};
pub use error::{GuardError, GuardResult};
pub use score::{
    quantile, BoundaryVector, CalibrationSummary, ConfidenceInterval, Decision, DriftReport,
    KsResult, MonitorSummary, ThresholdPair, Thresholds,
};
pub use sink::{FanoutSink, MetricsSink};
