// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Guardrail Losses
// ─────────────────────────────────────────────────────────────────────
//! Scalar losses over `[batch, classes]` logits, each paired with its
//! gradient w.r.t. the logits (the seed handed to `backward`).

use cdi_types::{GuardError, GuardResult};

use crate::tensor::Tensor;

/// Stand-in for −∞ when masking the true class out of the runner-up max.
pub const MASK_VALUE: f64 = -1e9;

#[derive(Debug, Clone, PartialEq)]
pub struct Loss {
    pub value: f64,
    pub grad_logits: Tensor,
}

/// Validate labels against logits; returns `(batch, classes)`.
pub fn check_labels(logits: &Tensor, labels: &[usize]) -> GuardResult<(usize, usize)> {
    let (batch, classes) = logits.dims2()?;
    if batch == 0 {
        return Err(GuardError::Shape("empty batch".to_string()));
    }
    if labels.len() != batch {
        return Err(GuardError::Shape(format!(
            "{} labels for a batch of {batch}",
            labels.len()
        )));
    }
    if let Some(&bad) = labels.iter().find(|&&y| y >= classes) {
        return Err(GuardError::Shape(format!(
            "label {bad} out of range for {classes} classes"
        )));
    }
    Ok((batch, classes))
}

/// Mean softmax cross-entropy.
pub fn cross_entropy(logits: &Tensor, labels: &[usize]) -> GuardResult<Loss> {
    let (batch, classes) = check_labels(logits, labels)?;
    let probs = logits.softmax_rows()?;
    let scale = 1.0 / batch as f64;

    let mut value = 0.0;
    let mut grad = probs.data().to_vec();
    for (b, &y) in labels.iter().enumerate() {
        value -= probs.row(b)[y].max(f64::MIN_POSITIVE).ln();
        grad[b * classes + y] -= 1.0;
    }
    for g in &mut grad {
        *g *= scale;
    }
    Ok(Loss {
        value: value * scale,
        grad_logits: Tensor::new(vec![batch, classes], grad)?,
    })
}

/// Runner-up class per sample: the best logit once the true class is
/// masked to [`MASK_VALUE`].
pub fn runner_up(logits: &Tensor, labels: &[usize]) -> GuardResult<Vec<usize>> {
    check_labels(logits, labels)?;
    Ok(labels
        .iter()
        .enumerate()
        .map(|(b, &y)| {
            let row = logits.row(b);
            let mut best = 0;
            let mut best_val = f64::NEG_INFINITY;
            for (c, &v) in row.iter().enumerate() {
                let v = if c == y { MASK_VALUE } else { v };
                if v > best_val {
                    best = c;
                    best_val = v;
                }
            }
            best
        })
        .collect())
}

/// `−mean(true logit − runner-up logit)`.
///
/// The masked true-class entry is a constant, so when the runner-up is
/// the true class itself (single-class logits) only the true-logit term
/// contributes to the gradient.
pub fn margin_loss(logits: &Tensor, labels: &[usize]) -> GuardResult<Loss> {
    let (batch, classes) = check_labels(logits, labels)?;
    let second = runner_up(logits, labels)?;
    let scale = 1.0 / batch as f64;

    let mut margin_sum = 0.0;
    let mut grad = vec![0.0; batch * classes];
    for (b, (&y, &j)) in labels.iter().zip(&second).enumerate() {
        let row = logits.row(b);
        let second_val = if j == y { MASK_VALUE } else { row[j] };
        margin_sum += row[y] - second_val;
        grad[b * classes + y] -= scale;
        if j != y {
            grad[b * classes + j] += scale;
        }
    }
    Ok(Loss {
        value: -margin_sum * scale,
        grad_logits: Tensor::new(vec![batch, classes], grad)?,
    })
}
