// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Statistics
// ─────────────────────────────────────────────────────────────────────
//! Reporting helpers over CDI samples: z-score against a baseline,
//! bootstrap confidence interval of the mean, Spearman rank correlation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cdi_types::{quantile, ConfidenceInterval, GuardError, GuardResult};

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Standard deviations of `value` from the reference mean.
///
/// Returns 0.0 for a constant reference.
pub fn zscore(value: f64, reference: &[f64]) -> GuardResult<f64> {
    if reference.len() < 2 {
        return Err(GuardError::Config(format!(
            "z-score needs >= 2 reference values, got {}",
            reference.len()
        )));
    }
    let std = std_dev(reference);
    if std == 0.0 {
        log::warn!("z-score reference has zero variance; returning 0.0");
        return Ok(0.0);
    }
    Ok((value - mean(reference)) / std)
}

/// Percentile bootstrap CI of the mean.
///
/// `seed = None` draws from OS entropy; a fixed seed reproduces the
/// interval exactly.
pub fn bootstrap_ci(
    values: &[f64],
    confidence: f64,
    n_bootstrap: usize,
    seed: Option<u64>,
) -> GuardResult<ConfidenceInterval> {
    if values.is_empty() {
        return Err(GuardError::Config(
            "cannot bootstrap an empty sample".to_string(),
        ));
    }
    if !(0.0 < confidence && confidence < 1.0) {
        return Err(GuardError::Config(format!(
            "confidence must be in (0, 1), got {confidence}"
        )));
    }
    if n_bootstrap == 0 {
        return Err(GuardError::Config("n_bootstrap must be >= 1".to_string()));
    }

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let n = values.len();
    let means: Vec<f64> = (0..n_bootstrap)
        .map(|_| (0..n).map(|_| values[rng.gen_range(0..n)]).sum::<f64>() / n as f64)
        .collect();

    let alpha = 1.0 - confidence;
    let lower = quantile(&means, alpha / 2.0);
    let upper = quantile(&means, 1.0 - alpha / 2.0);
    match (lower, upper) {
        (Some(lower), Some(upper)) => Ok(ConfidenceInterval {
            mean: mean(values),
            lower,
            upper,
            confidence,
        }),
        _ => Err(GuardError::Numerical(
            "bootstrap produced no resamples".to_string(),
        )),
    }
}

/// 1-based ranks, ties share their average rank.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

/// Spearman rank correlation. A constant input yields 0.0.
pub fn spearman(a: &[f64], b: &[f64]) -> GuardResult<f64> {
    if a.len() != b.len() {
        return Err(GuardError::Config(format!(
            "spearman needs equal lengths, got {} and {}",
            a.len(),
            b.len()
        )));
    }
    if a.len() < 2 {
        return Err(GuardError::Config(
            "spearman needs at least 2 pairs".to_string(),
        ));
    }
    if a.iter().chain(b).any(|v| !v.is_finite()) {
        return Err(GuardError::Config(
            "spearman input contains non-finite values".to_string(),
        ));
    }
    let ra = average_ranks(a);
    let rb = average_ranks(b);
    let (ma, mb) = (mean(&ra), mean(&rb));
    let cov: f64 = ra.iter().zip(&rb).map(|(x, y)| (x - ma) * (y - mb)).sum();
    let va: f64 = ra.iter().map(|x| (x - ma).powi(2)).sum();
    let vb: f64 = rb.iter().map(|y| (y - mb).powi(2)).sum();
    if va == 0.0 || vb == 0.0 {
        log::warn!("spearman input is constant; returning 0.0");
        return Ok(0.0);
    }
    Ok(cov / (va * vb).sqrt())
}
