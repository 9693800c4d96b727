// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Drift Detection
// ─────────────────────────────────────────────────────────────────────
//! Two independent comparisons of a current CDI distribution against a
//! reference:
//!
//! - **KS**: two-sample Kolmogorov–Smirnov statistic with an exact
//!   p-value up to [`EXACT_KS_MAX_SAMPLES`] points per side, asymptotic
//!   above; drift when `p < alpha`.
//! - **PSI**: Population Stability Index over equal-width bins on
//!   [0, 1]. Values outside [0, 1] are not counted.
//!
//! All functions are pure.

use cdi_types::{DriftReport, GuardConfig, GuardError, GuardResult, KsResult, MetricsSink};

pub const DEFAULT_ALPHA: f64 = 0.05;
pub const DEFAULT_PSI_BINS: usize = 10;
pub const DEFAULT_PSI_EPS: f64 = 1e-6;
/// Largest sample size for which the KS p-value is computed exactly.
pub const EXACT_KS_MAX_SAMPLES: usize = 10_000;

fn check_sample(name: &str, values: &[f64]) -> GuardResult<()> {
    if values.is_empty() {
        return Err(GuardError::Config(format!("{name} sample is empty")));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(GuardError::Config(format!(
            "{name} sample contains non-finite values"
        )));
    }
    Ok(())
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Kolmogorov distribution tail `Q(λ) = 2 Σ (−1)^{j−1} exp(−2 j² λ²)`.
fn kolmogorov_tail(lambda: f64) -> f64 {
    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut prev = 0.0;
    for j in 1..=100 {
        let j = j as f64;
        let term = fac * (a2 * j * j).exp();
        sum += term;
        if term.abs() <= 1e-3 * prev || term.abs() <= 1e-8 * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        prev = term.abs();
    }
    // Series has not converged: λ is tiny, the samples are indistinguishable.
    1.0
}

/// `P(D >= k/n)` for two samples of equal size `n`, by reflection:
/// `2 Σ_{j>=1} (−1)^{j+1} C(2n, n−jk) / C(2n, n)`.
fn exact_p_equal(n: usize, k: usize) -> f64 {
    if k == 0 {
        return 1.0;
    }
    let mut ratio = 1.0;
    let mut m = 0;
    let mut sum = 0.0;
    let mut sign = 1.0;
    let mut j = 1;
    while j * k <= n {
        // C(2n, n−m) / C(2n, n) = Π_{i=1..m} (n−i+1) / (n+i)
        while m < j * k {
            m += 1;
            ratio *= (n - m + 1) as f64 / (n + m) as f64;
        }
        sum += sign * ratio;
        sign = -sign;
        j += 1;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// `P(D >= t / (n1·n2))` by counting lattice paths from (0, 0) to
/// (n1, n2) that stay strictly inside `|i·n2 − j·n1| < t`.
///
/// Each cell holds the path count divided by `C(i+j, i)`, which keeps
/// every value in [0, 1].
fn exact_p_lattice(n1: usize, n2: usize, t: u64) -> f64 {
    if t == 0 {
        return 1.0;
    }
    let inside =
        |i: usize, j: usize| (i as i64 * n2 as i64 - j as i64 * n1 as i64).unsigned_abs() < t;
    let mut row = vec![0.0f64; n2 + 1];
    row[0] = 1.0;
    for j in 1..=n2 {
        row[j] = if inside(0, j) { row[j - 1] } else { 0.0 };
    }
    for i in 1..=n1 {
        if !inside(i, 0) {
            row[0] = 0.0;
        }
        for j in 1..=n2 {
            row[j] = if inside(i, j) {
                (i as f64 * row[j] + j as f64 * row[j - 1]) / (i + j) as f64
            } else {
                0.0
            };
        }
    }
    (1.0 - row[n2]).clamp(0.0, 1.0)
}

/// Two-sample KS test: `(statistic, p_value)`.
///
/// The statistic is the supremum distance between the two empirical
/// CDFs. The p-value is exact while both samples have at most
/// [`EXACT_KS_MAX_SAMPLES`] points; beyond that it uses the asymptotic
/// Kolmogorov distribution with Stephens' correction.
pub fn ks_2samp(reference: &[f64], current: &[f64]) -> GuardResult<(f64, f64)> {
    check_sample("reference", reference)?;
    check_sample("current", current)?;
    let a = sorted(reference);
    let b = sorted(current);
    let (n1, n2) = (a.len(), b.len());

    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;
    while i < n1 && j < n2 {
        let x = a[i].min(b[j]);
        while i < n1 && a[i] <= x {
            i += 1;
        }
        while j < n2 && b[j] <= x {
            j += 1;
        }
        let gap = (i as f64 / n1 as f64 - j as f64 / n2 as f64).abs();
        d = d.max(gap);
    }

    let p = if n1.max(n2) <= EXACT_KS_MAX_SAMPLES {
        if n1 == n2 {
            exact_p_equal(n1, (d * n1 as f64).round() as usize)
        } else {
            exact_p_lattice(n1, n2, (d * (n1 * n2) as f64).round() as u64)
        }
    } else {
        let en = ((n1 * n2) as f64 / (n1 + n2) as f64).sqrt();
        kolmogorov_tail((en + 0.12 + 0.11 / en) * d)
    };
    Ok((d, p))
}

pub fn ks_drift(reference: &[f64], current: &[f64], alpha: f64) -> GuardResult<KsResult> {
    let (statistic, p_value) = ks_2samp(reference, current)?;
    Ok(KsResult {
        statistic,
        p_value,
        drift: p_value < alpha,
    })
}

/// Equal-width histogram on [0, 1], last bin closed.
fn histogram(values: &[f64], n_bins: usize) -> Vec<usize> {
    let edges: Vec<f64> = (0..=n_bins).map(|i| i as f64 / n_bins as f64).collect();
    let mut counts = vec![0usize; n_bins];
    for &v in values {
        if !(0.0..=1.0).contains(&v) {
            continue;
        }
        let bin = if v == 1.0 {
            n_bins - 1
        } else {
            // last edge <= v
            edges.partition_point(|&e| e <= v).saturating_sub(1)
        };
        counts[bin.min(n_bins - 1)] += 1;
    }
    counts
}

/// `Σ (cur − ref) · ln((cur + eps) / (ref + eps))` over bin fractions.
pub fn population_stability_index(
    reference: &[f64],
    current: &[f64],
    n_bins: usize,
    eps: f64,
) -> GuardResult<f64> {
    check_sample("reference", reference)?;
    check_sample("current", current)?;
    if n_bins == 0 {
        return Err(GuardError::Config("psi_bins must be >= 1".to_string()));
    }
    if !(eps > 0.0) {
        return Err(GuardError::Config(format!("psi_eps must be > 0, got {eps}")));
    }

    let fractions = |values: &[f64]| -> Vec<f64> {
        let hist = histogram(values, n_bins);
        let total = (hist.iter().sum::<usize>() as f64).max(eps);
        hist.into_iter().map(|c| c as f64 / total).collect()
    };
    let ref_pct = fractions(reference);
    let cur_pct = fractions(current);

    Ok(ref_pct
        .iter()
        .zip(&cur_pct)
        .map(|(&r, &c)| (c - r) * ((c + eps) / (r + eps)).ln())
        .sum())
}

/// KS + PSI comparison with fixed parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftDetector {
    alpha: f64,
    psi_bins: usize,
    psi_eps: f64,
}

impl DriftDetector {
    pub fn new(alpha: f64, psi_bins: usize, psi_eps: f64) -> GuardResult<Self> {
        if !(0.0 < alpha && alpha < 1.0) {
            return Err(GuardError::Config(format!(
                "drift alpha must be in (0, 1), got {alpha}"
            )));
        }
        if psi_bins == 0 {
            return Err(GuardError::Config("psi_bins must be >= 1".to_string()));
        }
        if !(psi_eps > 0.0) {
            return Err(GuardError::Config(format!(
                "psi_eps must be > 0, got {psi_eps}"
            )));
        }
        Ok(Self {
            alpha,
            psi_bins,
            psi_eps,
        })
    }

    pub fn from_config(config: &GuardConfig) -> GuardResult<Self> {
        Self::new(config.drift_alpha, config.psi_bins, config.psi_eps)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn compare(&self, reference: &[f64], current: &[f64]) -> GuardResult<DriftReport> {
        let ks = ks_drift(reference, current, self.alpha)?;
        let psi = population_stability_index(reference, current, self.psi_bins, self.psi_eps)?;
        if ks.drift {
            log::warn!(
                "CDI drift: ks={:.4} p={:.3e} psi={psi:.4}",
                ks.statistic,
                ks.p_value
            );
        }
        Ok(DriftReport { ks, psi })
    }

    /// [`compare`](Self::compare), then forward the result to `sink`.
    pub fn compare_and_publish(
        &self,
        reference: &[f64],
        current: &[f64],
        sink: &dyn MetricsSink,
    ) -> GuardResult<DriftReport> {
        let report = self.compare(reference, current)?;
        sink.log_drift(&report.ks, report.psi);
        Ok(report)
    }
}

impl Default for DriftDetector {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            psi_bins: DEFAULT_PSI_BINS,
            psi_eps: DEFAULT_PSI_EPS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ks_identical_samples() {
        let v: Vec<f64> = (0..50).map(|i| i as f64 / 50.0).collect();
        let (d, p) = ks_2samp(&v, &v).unwrap();
        assert_eq!(d, 0.0);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_ks_disjoint_samples() {
        let a: Vec<f64> = (0..40).map(|i| 0.1 + i as f64 * 0.001).collect();
        let b: Vec<f64> = (0..40).map(|i| 0.8 + i as f64 * 0.001).collect();
        let r = ks_drift(&a, &b, 0.05).unwrap();
        assert!((r.statistic - 1.0).abs() < 1e-12);
        assert!(r.p_value < 1e-6);
        assert!(r.drift);
    }

    #[test]
    fn test_ks_statistic_with_ties() {
        // F_a jumps to 1 at 0.5; F_b is 0.5 at 0.5
        let a = [0.5, 0.5];
        let b = [0.5, 0.9];
        let (d, _) = ks_2samp(&a, &b).unwrap();
        assert!((d - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ks_exact_p_near_alpha() {
        // D = 0.6 with n = m = 10: p = 2 · C(20, 4) / C(20, 10)
        let a: Vec<f64> = (0..10).map(|i| i as f64 / 100.0).collect();
        let b: Vec<f64> = (6..16).map(|i| i as f64 / 100.0).collect();
        let r = ks_drift(&a, &b, 0.05).unwrap();
        assert!((r.statistic - 0.6).abs() < 1e-12);
        assert!((r.p_value - 2.0 * 4845.0 / 184_756.0).abs() < 1e-9);
        assert!(!r.drift);
    }

    #[test]
    fn test_ks_exact_unequal_sizes() {
        // orderings of {a} vs {b, b}: only b-a-b stays inside D = 1
        let (d, p) = ks_2samp(&[0.0], &[1.0, 2.0]).unwrap();
        assert_eq!(d, 1.0);
        assert!((p - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_lattice_matches_reflection_formula() {
        for (n, k) in [(10, 6), (10, 3), (25, 7), (40, 1)] {
            let lattice = exact_p_lattice(n, n, (k * n) as u64);
            let closed = exact_p_equal(n, k);
            assert!((lattice - closed).abs() < 1e-9, "n={n} k={k}: {lattice} vs {closed}");
        }
    }

    #[test]
    fn test_ks_large_samples_use_asymptotic_tail() {
        let a: Vec<f64> = (0..EXACT_KS_MAX_SAMPLES + 1).map(|i| i as f64).collect();
        let (d, p) = ks_2samp(&a, &a).unwrap();
        assert_eq!(d, 0.0);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_kolmogorov_tail_reference_values() {
        // Q(1.0) ≈ 0.26999967, Q(1.36) ≈ 0.0494
        assert!((kolmogorov_tail(1.0) - 0.269_999_67).abs() < 1e-6);
        assert!((kolmogorov_tail(1.36) - 0.0494).abs() < 1e-3);
        assert_eq!(kolmogorov_tail(0.0), 1.0);
    }

    #[test]
    fn test_psi_identical_is_zero() {
        let v: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
        let psi = population_stability_index(&v, &v, 10, 1e-6).unwrap();
        assert!(psi.abs() < 1e-12);
    }

    #[test]
    fn test_psi_shifted_is_large() {
        let a = vec![0.15; 100];
        let b = vec![0.85; 100];
        let psi = population_stability_index(&a, &b, 10, 1e-6).unwrap();
        assert!(psi > 10.0);
    }

    #[test]
    fn test_psi_histogram_edges() {
        let counts = histogram(&[0.0, 0.05, 0.1, 0.999, 1.0, 1.5, -0.1], 10);
        assert_eq!(counts[0], 2);
        assert_eq!(counts[1], 1);
        assert_eq!(counts[9], 2);
        assert_eq!(counts.iter().sum::<usize>(), 5);
    }

    #[test]
    fn test_psi_all_out_of_range_is_finite() {
        let psi = population_stability_index(&[2.0, 3.0], &[0.5], 10, 1e-6).unwrap();
        assert!(psi.is_finite());
        assert!(psi > 0.0);
    }

    #[test]
    fn test_empty_and_non_finite_inputs() {
        assert!(matches!(ks_2samp(&[], &[0.1]), Err(GuardError::Config(_))));
        assert!(matches!(ks_2samp(&[0.1], &[]), Err(GuardError::Config(_))));
        assert!(population_stability_index(&[f64::NAN], &[0.1], 10, 1e-6).is_err());
        assert!(population_stability_index(&[0.1], &[0.1], 0, 1e-6).is_err());
    }

    #[test]
    fn test_detector_validation() {
        assert!(DriftDetector::new(0.0, 10, 1e-6).is_err());
        assert!(DriftDetector::new(0.05, 0, 1e-6).is_err());
        assert!(DriftDetector::new(0.05, 10, 0.0).is_err());
        let d = DriftDetector::from_config(&GuardConfig::default()).unwrap();
        assert_eq!(d, DriftDetector::default());
    }
}
