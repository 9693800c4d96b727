// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Boundary Violation Estimators
// ─────────────────────────────────────────────────────────────────────
//! External "boundary violation" signals.
//!
//! - **calibration**: expected calibration error (ECE) of the batch.
//! - **stability**: prediction stability gap (PSG), the mean L2 distance
//!   between clean and noise-perturbed probability vectors.

use rand::Rng;
use rand_distr::StandardNormal;

use cdi_types::{BoundaryVector, GuardError, GuardResult, NoiseKind, Reduction};

use crate::loss::check_labels;
use crate::model::ClassifierModel;
use crate::tensor::Tensor;

pub const DEFAULT_ECE_BINS: usize = 10;
pub const DEFAULT_STABILITY_EPS: f64 = 1e-3;

/// ECE over the batch with `n_bins` equal-width bins `[i/n, (i+1)/n)`.
///
/// A batch of one is valid and yields the per-sample gap
/// `|correct − confidence|`. A confidence of exactly 1.0 lands in no bin.
pub fn expected_calibration_error(
    logits: &Tensor,
    labels: &[usize],
    n_bins: usize,
) -> GuardResult<f64> {
    if n_bins == 0 {
        return Err(GuardError::Config("ece_bins must be positive".to_string()));
    }
    let (batch, _) = check_labels(logits, labels)?;
    let probs = logits.softmax_rows()?;

    // (count, Σ correct, Σ confidence) per bin
    let mut bins = vec![(0usize, 0.0f64, 0.0f64); n_bins];
    for (b, pred) in probs.argmax_rows().into_iter().enumerate() {
        let conf = probs.row(b)[pred];
        let correct = if pred == labels[b] { 1.0 } else { 0.0 };
        let Some(bin) = (0..n_bins).find(|&i| {
            let lo = i as f64 / n_bins as f64;
            let hi = (i + 1) as f64 / n_bins as f64;
            conf >= lo && conf < hi
        }) else {
            continue;
        };
        let slot = &mut bins[bin];
        slot.0 += 1;
        slot.1 += correct;
        slot.2 += conf;
    }

    Ok(bins
        .iter()
        .filter(|(count, _, _)| *count > 0)
        .map(|&(count, correct, conf)| {
            let n = count as f64;
            (n / batch as f64) * (correct / n - conf / n).abs()
        })
        .sum())
}

/// Mean (over draws) of the batch-mean ‖p − p_eps‖₂.
pub fn prediction_stability_gap<M, R>(
    model: &M,
    x: &Tensor,
    eps: f64,
    noise: NoiseKind,
    n_samples: usize,
    rng: &mut R,
) -> GuardResult<f64>
where
    M: ClassifierModel + ?Sized,
    R: Rng,
{
    if n_samples == 0 {
        return Err(GuardError::Config(
            "stability_samples must be >= 1".to_string(),
        ));
    }
    let p = model.forward(x)?.softmax_rows()?;

    let mut gap = 0.0;
    for _ in 0..n_samples {
        let data = x
            .data()
            .iter()
            .map(|&v| {
                let delta = match noise {
                    NoiseKind::Gaussian => eps * rng.sample::<f64, _>(StandardNormal),
                    NoiseKind::Uniform => eps * (2.0 * rng.gen::<f64>() - 1.0),
                };
                v + delta
            })
            .collect();
        let perturbed = Tensor::new(x.shape().to_vec(), data)?;
        let p_eps = model.forward(&perturbed)?.softmax_rows()?;
        gap += mean_row_distance(&p, &p_eps)?;
    }
    Ok(gap / n_samples as f64)
}

fn mean_row_distance(a: &Tensor, b: &Tensor) -> GuardResult<f64> {
    let diff = a.zip_map(b, |u, v| u - v)?;
    let rows = diff.rows();
    if rows == 0 {
        return Ok(0.0);
    }
    let total: f64 = (0..rows)
        .map(|r| diff.row(r).iter().map(|d| d * d).sum::<f64>().sqrt())
        .sum();
    Ok(total / rows as f64)
}

/// Stability-gap settings for [`compute_boundary_vector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilitySettings {
    pub eps: f64,
    pub samples: usize,
    pub noise: NoiseKind,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            eps: DEFAULT_STABILITY_EPS,
            samples: 1,
            noise: NoiseKind::Gaussian,
        }
    }
}

/// Both boundary components for one batch.
pub fn compute_boundary_vector<M, R>(
    model: &M,
    x: &Tensor,
    logits: &Tensor,
    labels: &[usize],
    n_bins: usize,
    stability: StabilitySettings,
    rng: &mut R,
) -> GuardResult<BoundaryVector>
where
    M: ClassifierModel + ?Sized,
    R: Rng,
{
    let calibration = expected_calibration_error(logits, labels, n_bins)?;
    let stability = prediction_stability_gap(
        model,
        x,
        stability.eps,
        stability.noise,
        stability.samples,
        rng,
    )?;
    Ok(BoundaryVector {
        calibration,
        stability,
    })
}

pub fn reduce_boundary_vector(vector: &BoundaryVector, reduction: Reduction) -> f64 {
    vector.reduce(reduction)
}
