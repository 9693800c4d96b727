// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Consistency Deviation Index
// ─────────────────────────────────────────────────────────────────────
//! `CDI = P / (P + B + ε)` for internal pressure `P` and boundary
//! violation `B`.
//!
//! A CDI near 1 means the model is under heavy internal pressure while
//! its external behaviour still looks fine. That is the silent-failure
//! regime the guard gates on.

/// Denominator floor; makes `P = B = 0` score ≈0 instead of NaN.
pub const CDI_EPS: f64 = 1e-12;

pub fn compute_cdi(pressure: f64, boundary: f64) -> f64 {
    pressure / (pressure + boundary + CDI_EPS)
}
