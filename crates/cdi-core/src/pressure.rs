// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Internal Pressure Estimators
// ─────────────────────────────────────────────────────────────────────
//! Gradient-based "internal pressure" of a prediction.
//!
//! - **Full**: Σ‖∂loss/∂activation‖ over captured layers plus the norm
//!   of the concatenated parameter gradient. One backward pass covering
//!   parameters, so it scales with model size.
//! - **Fast**: ‖∂(−mean margin)/∂feature‖ for one feature tensor. No
//!   parameter gradients are requested.

use cdi_types::{GuardError, GuardResult, PressureMode};

use crate::loss::{margin_loss, Loss};
use crate::model::{BackwardRequest, ClassifierModel, ForwardPass};

/// Full-graph pressure for an already computed `loss` over `pass`.
pub fn activation_and_param_pressure<M: ClassifierModel + ?Sized>(
    model: &M,
    pass: &ForwardPass<M::Tape>,
    loss: &Loss,
) -> GuardResult<f64> {
    let request = BackwardRequest::full(&pass.capture);
    let grads = model.backward(pass, &loss.grad_logits, &request)?;

    let act_pressure: f64 = pass
        .capture
        .layers()
        .filter_map(|layer| grads.activation(layer))
        .map(|g| g.l2_norm())
        .sum();
    Ok(act_pressure + grads.parameter_norm())
}

/// Margin-gradient norm at `feature_layer`.
pub fn representation_pressure<M: ClassifierModel + ?Sized>(
    model: &M,
    pass: &ForwardPass<M::Tape>,
    feature_layer: &str,
    labels: &[usize],
) -> GuardResult<f64> {
    if !pass.capture.contains(feature_layer) {
        return Err(GuardError::Model(format!(
            "feature layer '{feature_layer}' was not captured"
        )));
    }
    let loss = margin_loss(&pass.logits, labels)?;
    let grads = model.backward(
        pass,
        &loss.grad_logits,
        &BackwardRequest::feature_only(feature_layer),
    )?;
    grads
        .activation(feature_layer)
        .map(|g| g.l2_norm())
        .ok_or_else(|| {
            GuardError::Model(format!("no gradient returned for '{feature_layer}'"))
        })
}

/// Pressure strategy fixed at guard construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PressureEstimator {
    Full,
    Fast { feature_layer: String },
}

impl PressureEstimator {
    pub fn mode(&self) -> PressureMode {
        match self {
            Self::Full => PressureMode::Full,
            Self::Fast { .. } => PressureMode::Fast,
        }
    }

    /// `loss` is the cross-entropy of `pass`; the fast variant builds its
    /// own margin loss instead.
    pub fn estimate<M: ClassifierModel + ?Sized>(
        &self,
        model: &M,
        pass: &ForwardPass<M::Tape>,
        loss: &Loss,
        labels: &[usize],
    ) -> GuardResult<f64> {
        match self {
            Self::Full => activation_and_param_pressure(model, pass, loss),
            Self::Fast { feature_layer } => {
                representation_pressure(model, pass, feature_layer, labels)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::cross_entropy;
    use crate::mlp::{Activation, Mlp};
    use crate::tensor::Tensor;

    fn model() -> Mlp {
        Mlp::random(&[3, 5, 4], Activation::Tanh, 11).unwrap()
    }

    fn input() -> Tensor {
        Tensor::from_rows(&[vec![0.4, -1.2, 0.7]]).unwrap()
    }

    #[test]
    fn test_full_pressure_positive_and_includes_params() {
        let m = model();
        let pass = m.forward_with_capture(&input(), &[]).unwrap();
        let loss = cross_entropy(&pass.logits, &[2]).unwrap();
        // With nothing captured, only the parameter term remains.
        let p = activation_and_param_pressure(&m, &pass, &loss).unwrap();
        assert!(p > 0.0);

        let layers = vec!["fc1".to_string(), "act1".to_string()];
        let pass = m.forward_with_capture(&input(), &layers).unwrap();
        let p_acts = activation_and_param_pressure(&m, &pass, &loss).unwrap();
        assert!(p_acts > p);
    }

    #[test]
    fn test_fast_pressure_requires_capture() {
        let m = model();
        let pass = m.forward_with_capture(&input(), &[]).unwrap();
        let err = representation_pressure(&m, &pass, "act1", &[0]).unwrap_err();
        assert!(matches!(err, GuardError::Model(_)));
    }

    #[test]
    fn test_fast_pressure_matches_weight_difference() {
        // d(−margin)/d(act1) = W2[runner] − W2[true]
        let m = model();
        let pass = m
            .forward_with_capture(&input(), &["act1".to_string()])
            .unwrap();
        let y = 1;
        let runner = crate::loss::runner_up(&pass.logits, &[y]).unwrap()[0];
        let p = representation_pressure(&m, &pass, "act1", &[y]).unwrap();
        let w2 = match &m.layers()[2] {
            crate::mlp::Layer::Linear { weight, .. } => weight.clone(),
            _ => unreachable!(),
        };
        let expected: f64 = w2
            .row(runner)
            .iter()
            .zip(w2.row(y))
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        assert!((p - expected).abs() < 1e-9);
    }

    #[test]
    fn test_estimator_dispatch() {
        let m = model();
        let pass = m
            .forward_with_capture(&input(), &["act1".to_string()])
            .unwrap();
        let loss = cross_entropy(&pass.logits, &[0]).unwrap();
        let fast = PressureEstimator::Fast {
            feature_layer: "act1".into(),
        };
        assert_eq!(fast.mode(), PressureMode::Fast);
        assert_eq!(PressureEstimator::Full.mode(), PressureMode::Full);
        let f = fast.estimate(&m, &pass, &loss, &[0]).unwrap();
        let g = PressureEstimator::Full
            .estimate(&m, &pass, &loss, &[0])
            .unwrap();
        assert!(f > 0.0 && g > 0.0);
    }
}
