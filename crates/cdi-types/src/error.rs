// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Guardrail Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all CDI Guardrail failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuardError {
    /// Configuration error (thresholds, percentiles, kinds, sample sizes).
    #[error("config error: {0}")]
    Config(String),

    /// Tensor or label dimensions do not line up.
    #[error("shape error: {0}")]
    Shape(String),

    /// The wrapped model failed to produce a forward or backward result.
    #[error("model error: {0}")]
    Model(String),

    /// Numerical error (NaN/Inf in the scoring path).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Metric registration or exposition failed.
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

pub type GuardResult<T> = Result<T, GuardError>;
