// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Guardrail Model Interface
// ─────────────────────────────────────────────────────────────────────
//! Capability set the guard needs from a differentiable classifier.
//!
//! The guard never holds hooks inside the model. A forward pass that
//! should expose intermediate outputs returns them in a
//! [`CaptureRecord`] owned by that single call, together with an
//! adapter-specific tape for the matching backward pass. Gradients come
//! back as values, so no gradient state survives between calls and a
//! backward pass that does not request parameters leaves none behind.
//!
//! Any neural-network library can sit behind [`ClassifierModel`]; the
//! bundled [`crate::mlp::Mlp`] is the reference adapter.

use cdi_types::GuardResult;

use crate::tensor::Tensor;

/// Layer outputs recorded during one forward pass, in forward order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureRecord {
    entries: Vec<(String, Tensor)>,
}

impl CaptureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a layer output. A repeated name replaces the earlier entry.
    pub fn insert(&mut self, layer: impl Into<String>, output: Tensor) {
        let layer = layer.into();
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| *name == layer) {
            slot.1 = output;
        } else {
            self.entries.push((layer, output));
        }
    }

    pub fn get(&self, layer: &str) -> Option<&Tensor> {
        self.entries
            .iter()
            .find(|(name, _)| name == layer)
            .map(|(_, t)| t)
    }

    pub fn contains(&self, layer: &str) -> bool {
        self.get(layer).is_some()
    }

    pub fn layers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.entries.iter().map(|(name, t)| (name.as_str(), t))
    }

    /// Most recently captured layer.
    pub fn last(&self) -> Option<(&str, &Tensor)> {
        self.entries.last().map(|(name, t)| (name.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a forward pass with capture.
#[derive(Debug, Clone)]
pub struct ForwardPass<T> {
    /// `[batch, classes]`.
    pub logits: Tensor,
    pub capture: CaptureRecord,
    /// Whatever the adapter must keep to run backward later.
    pub tape: T,
}

/// Trainable parameter descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: String,
    pub numel: usize,
}

/// What a backward pass must produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackwardRequest {
    /// Layers whose output gradient is returned.
    pub activations: Vec<String>,
    /// Whether parameter gradients are computed.
    pub parameters: bool,
}

impl BackwardRequest {
    /// Every captured layer plus all parameters.
    pub fn full(capture: &CaptureRecord) -> Self {
        Self {
            activations: capture.layers().map(str::to_string).collect(),
            parameters: true,
        }
    }

    /// One feature tensor, no parameters.
    pub fn feature_only(layer: &str) -> Self {
        Self {
            activations: vec![layer.to_string()],
            parameters: false,
        }
    }

    pub fn wants_activation(&self, layer: &str) -> bool {
        self.activations.iter().any(|l| l == layer)
    }
}

/// Gradient of a parameter; `None` when the parameter took no part.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrad {
    pub name: String,
    pub grad: Option<Tensor>,
}

/// Output of one backward pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gradients {
    pub activations: Vec<(String, Tensor)>,
    pub parameters: Vec<ParameterGrad>,
}

impl Gradients {
    pub fn activation(&self, layer: &str) -> Option<&Tensor> {
        self.activations
            .iter()
            .find(|(name, _)| name == layer)
            .map(|(_, g)| g)
    }

    /// L2 norm of all present parameter gradients, concatenated.
    pub fn parameter_norm(&self) -> f64 {
        self.parameters
            .iter()
            .filter_map(|p| p.grad.as_ref())
            .map(Tensor::squared_norm)
            .sum::<f64>()
            .sqrt()
    }
}

/// Differentiable classifier consumed read-only by the guard.
pub trait ClassifierModel: Send + Sync {
    type Tape: Send;

    /// Sub-module identifiers in forward order.
    fn named_modules(&self) -> Vec<String>;

    fn parameters(&self) -> Vec<ParameterInfo>;

    /// Forward pass with capture of the named sub-module outputs.
    fn forward_with_capture(
        &self,
        input: &Tensor,
        layers: &[String],
    ) -> GuardResult<ForwardPass<Self::Tape>>;

    /// Reverse-mode pass seeded with `grad_logits` = ∂loss/∂logits.
    fn backward(
        &self,
        pass: &ForwardPass<Self::Tape>,
        grad_logits: &Tensor,
        request: &BackwardRequest,
    ) -> GuardResult<Gradients>;

    /// Plain forward pass: `[batch, classes]` logits.
    fn forward(&self, input: &Tensor) -> GuardResult<Tensor> {
        Ok(self.forward_with_capture(input, &[])?.logits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(v: f64) -> Tensor {
        Tensor::new(vec![1, 1], vec![v]).unwrap()
    }

    #[test]
    fn test_capture_preserves_forward_order() {
        let mut rec = CaptureRecord::new();
        rec.insert("fc1", t(1.0));
        rec.insert("act1", t(2.0));
        assert_eq!(rec.layers().collect::<Vec<_>>(), vec!["fc1", "act1"]);
        assert_eq!(rec.last().unwrap().0, "act1");
    }

    #[test]
    fn test_capture_replaces_duplicate() {
        let mut rec = CaptureRecord::new();
        rec.insert("fc1", t(1.0));
        rec.insert("fc1", t(3.0));
        assert_eq!(rec.len(), 1);
        assert_eq!(rec.get("fc1").unwrap().data(), &[3.0]);
    }

    #[test]
    fn test_parameter_norm_skips_missing() {
        let grads = Gradients {
            activations: Vec::new(),
            parameters: vec![
                ParameterGrad {
                    name: "a".into(),
                    grad: Some(Tensor::new(vec![2], vec![3.0, 0.0]).unwrap()),
                },
                ParameterGrad {
                    name: "b".into(),
                    grad: None,
                },
                ParameterGrad {
                    name: "c".into(),
                    grad: Some(t(4.0)),
                },
            ],
        };
        assert!((grads.parameter_norm() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_backward_request_builders() {
        let mut rec = CaptureRecord::new();
        rec.insert("fc1", t(1.0));
        rec.insert("act1", t(1.0));
        let full = BackwardRequest::full(&rec);
        assert!(full.parameters);
        assert!(full.wants_activation("fc1") && full.wants_activation("act1"));
        let fast = BackwardRequest::feature_only("act1");
        assert!(!fast.parameters);
        assert!(!fast.wants_activation("fc1"));
    }
}
