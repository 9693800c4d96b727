// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reference MLP Adapter
// ─────────────────────────────────────────────────────────────────────
//! Multi-layer perceptron implementing [`ClassifierModel`] with exact
//! backpropagation.
//!
//! Layers are named the way the guard addresses them: `fc1`, `act1`,
//! `fc2`, ... with parameters `fc1.weight` (`[out, in]`) and `fc1.bias`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cdi_types::{GuardError, GuardResult};

use crate::model::{
    BackwardRequest, CaptureRecord, ClassifierModel, ForwardPass, Gradients, ParameterGrad,
    ParameterInfo,
};
use crate::tensor::Tensor;

/// Hidden-layer nonlinearity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Tanh,
}

/// One parameter entry handed to an initialiser.
#[derive(Debug, Clone, Copy)]
pub struct InitSlot<'a> {
    /// Full parameter name, e.g. `fc2.weight`.
    pub param: &'a str,
    /// Zero-based index of the linear layer.
    pub layer: usize,
    pub row: usize,
    pub col: usize,
    pub fan_in: usize,
}

impl InitSlot<'_> {
    pub fn is_bias(&self) -> bool {
        self.param.ends_with(".bias")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Linear {
        name: String,
        weight: Tensor,
        bias: Tensor,
    },
    Relu {
        name: String,
    },
    Tanh {
        name: String,
    },
}

impl Layer {
    pub fn linear(name: impl Into<String>, weight: Tensor, bias: Tensor) -> GuardResult<Self> {
        let (out, _) = weight.dims2()?;
        if bias.numel() != out {
            return Err(GuardError::Shape(format!(
                "bias has {} elements, weight has {out} rows",
                bias.numel()
            )));
        }
        Ok(Self::Linear {
            name: name.into(),
            weight,
            bias,
        })
    }

    pub fn activation(name: impl Into<String>, kind: Activation) -> Self {
        match kind {
            Activation::Relu => Self::Relu { name: name.into() },
            Activation::Tanh => Self::Tanh { name: name.into() },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Linear { name, .. } | Self::Relu { name } | Self::Tanh { name } => name,
        }
    }

    fn forward(&self, x: &Tensor) -> GuardResult<Tensor> {
        match self {
            Self::Linear { name, weight, bias } => {
                let (rows, cols) = x.dims2()?;
                let (out, inp) = weight.dims2()?;
                if cols != inp {
                    return Err(GuardError::Shape(format!(
                        "{name}: input width {cols}, expected {inp}"
                    )));
                }
                let w = weight.data();
                let b = bias.data();
                let mut y = Vec::with_capacity(rows * out);
                for r in 0..rows {
                    let xr = x.row(r);
                    for o in 0..out {
                        let wr = &w[o * inp..(o + 1) * inp];
                        let dot: f64 = xr.iter().zip(wr).map(|(a, b)| a * b).sum();
                        y.push(dot + b[o]);
                    }
                }
                Tensor::new(vec![rows, out], y)
            }
            Self::Relu { .. } => Ok(x.map(|v| v.max(0.0))),
            Self::Tanh { .. } => Ok(x.map(f64::tanh)),
        }
    }

    /// Gradient w.r.t. the layer input; parameter gradients go to `params`.
    fn backward(
        &self,
        input: &Tensor,
        output: &Tensor,
        grad_out: &Tensor,
        params: Option<&mut Vec<ParameterGrad>>,
    ) -> GuardResult<Tensor> {
        match self {
            Self::Linear { name, weight, .. } => {
                let (rows, out) = grad_out.dims2()?;
                let (_, inp) = weight.dims2()?;
                let w = weight.data();
                let g = grad_out.data();
                let mut grad_in = vec![0.0; rows * inp];
                for r in 0..rows {
                    for o in 0..out {
                        let go = g[r * out + o];
                        if go == 0.0 {
                            continue;
                        }
                        for k in 0..inp {
                            grad_in[r * inp + k] += go * w[o * inp + k];
                        }
                    }
                }
                if let Some(params) = params {
                    let x = input.data();
                    let mut dw = vec![0.0; out * inp];
                    let mut db = vec![0.0; out];
                    for r in 0..rows {
                        for o in 0..out {
                            let go = g[r * out + o];
                            db[o] += go;
                            for k in 0..inp {
                                dw[o * inp + k] += go * x[r * inp + k];
                            }
                        }
                    }
                    params.push(ParameterGrad {
                        name: format!("{name}.weight"),
                        grad: Some(Tensor::new(vec![out, inp], dw)?),
                    });
                    params.push(ParameterGrad {
                        name: format!("{name}.bias"),
                        grad: Some(Tensor::new(vec![out], db)?),
                    });
                }
                Tensor::new(vec![rows, inp], grad_in)
            }
            Self::Relu { .. } => grad_out.zip_map(input, |g, x| if x > 0.0 { g } else { 0.0 }),
            Self::Tanh { .. } => grad_out.zip_map(output, |g, y| g * (1.0 - y * y)),
        }
    }
}

/// Activations kept between forward and backward: the input of every
/// layer followed by the logits.
#[derive(Debug, Clone)]
pub struct MlpTape {
    activations: Vec<Tensor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    layers: Vec<Layer>,
    input_dim: usize,
    num_classes: usize,
}

impl Mlp {
    pub fn new(layers: Vec<Layer>) -> GuardResult<Self> {
        let mut width: Option<usize> = None;
        let mut input_dim = None;
        for (i, layer) in layers.iter().enumerate() {
            if layers[..i].iter().any(|l| l.name() == layer.name()) {
                return Err(GuardError::Config(format!(
                    "duplicate layer name '{}'",
                    layer.name()
                )));
            }
            if let Layer::Linear { name, weight, .. } = layer {
                let (out, inp) = weight.dims2()?;
                if let Some(w) = width {
                    if w != inp {
                        return Err(GuardError::Shape(format!(
                            "{name}: expects width {inp}, previous layer gives {w}"
                        )));
                    }
                }
                input_dim.get_or_insert(inp);
                width = Some(out);
            }
        }
        match (input_dim, width) {
            (Some(input_dim), Some(num_classes)) => Ok(Self {
                layers,
                input_dim,
                num_classes,
            }),
            _ => Err(GuardError::Config(
                "an MLP needs at least one linear layer".to_string(),
            )),
        }
    }

    /// Build `fc1 → act1 → fc2 → ... → fcN` for `dims = [in, h1, ..., classes]`.
    pub fn build(
        dims: &[usize],
        activation: Activation,
        mut init: impl FnMut(InitSlot<'_>) -> f64,
    ) -> GuardResult<Self> {
        if dims.len() < 2 || dims.contains(&0) {
            return Err(GuardError::Config(format!(
                "MLP dims must list >= 2 positive widths, got {dims:?}"
            )));
        }
        let n_linear = dims.len() - 1;
        let mut layers = Vec::with_capacity(2 * n_linear - 1);
        for l in 0..n_linear {
            let (inp, out) = (dims[l], dims[l + 1]);
            let name = format!("fc{}", l + 1);
            let weight_name = format!("{name}.weight");
            let bias_name = format!("{name}.bias");
            let mut w = Vec::with_capacity(out * inp);
            for row in 0..out {
                for col in 0..inp {
                    w.push(init(InitSlot {
                        param: &weight_name,
                        layer: l,
                        row,
                        col,
                        fan_in: inp,
                    }));
                }
            }
            let b = (0..out)
                .map(|row| {
                    init(InitSlot {
                        param: &bias_name,
                        layer: l,
                        row,
                        col: 0,
                        fan_in: inp,
                    })
                })
                .collect();
            layers.push(Layer::linear(
                name,
                Tensor::new(vec![out, inp], w)?,
                Tensor::new(vec![out], b)?,
            )?);
            if l + 1 < n_linear {
                layers.push(Layer::activation(format!("act{}", l + 1), activation));
            }
        }
        Self::new(layers)
    }

    /// Uniform `±1/√fan_in` initialisation from a seeded RNG.
    pub fn random(dims: &[usize], activation: Activation, seed: u64) -> GuardResult<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::build(dims, activation, |slot| {
            let bound = 1.0 / (slot.fan_in as f64).sqrt();
            rng.gen_range(-bound..bound)
        })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn has_layer(&self, name: &str) -> bool {
        self.layers.iter().any(|l| l.name() == name)
    }
}

impl ClassifierModel for Mlp {
    type Tape = MlpTape;

    fn named_modules(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.name().to_string()).collect()
    }

    fn parameters(&self) -> Vec<ParameterInfo> {
        self.layers
            .iter()
            .filter_map(|l| match l {
                Layer::Linear { name, weight, bias } => Some([
                    ParameterInfo {
                        name: format!("{name}.weight"),
                        numel: weight.numel(),
                    },
                    ParameterInfo {
                        name: format!("{name}.bias"),
                        numel: bias.numel(),
                    },
                ]),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn forward_with_capture(
        &self,
        input: &Tensor,
        layers: &[String],
    ) -> GuardResult<ForwardPass<MlpTape>> {
        let (_, cols) = input.dims2()?;
        if cols != self.input_dim {
            return Err(GuardError::Shape(format!(
                "input width {cols}, model expects {}",
                self.input_dim
            )));
        }
        if let Some(unknown) = layers.iter().find(|l| !self.has_layer(l)) {
            return Err(GuardError::Model(format!("no sub-module named '{unknown}'")));
        }

        let mut capture = CaptureRecord::new();
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.clone());
        for layer in &self.layers {
            let out = layer.forward(&activations[activations.len() - 1])?;
            if layers.iter().any(|l| l == layer.name()) {
                capture.insert(layer.name(), out.clone());
            }
            activations.push(out);
        }
        let logits = activations[activations.len() - 1].clone();
        Ok(ForwardPass {
            logits,
            capture,
            tape: MlpTape { activations },
        })
    }

    fn backward(
        &self,
        pass: &ForwardPass<MlpTape>,
        grad_logits: &Tensor,
        request: &BackwardRequest,
    ) -> GuardResult<Gradients> {
        let acts = &pass.tape.activations;
        if acts.len() != self.layers.len() + 1 {
            return Err(GuardError::Model(
                "tape does not belong to this model".to_string(),
            ));
        }
        if grad_logits.shape() != pass.logits.shape() {
            return Err(GuardError::Shape(format!(
                "grad_logits shape {:?}, logits shape {:?}",
                grad_logits.shape(),
                pass.logits.shape()
            )));
        }

        let mut pending = self
            .layers
            .iter()
            .filter(|l| request.wants_activation(l.name()))
            .count();
        let mut grad = grad_logits.clone();
        let mut activation_grads = Vec::new();
        let mut param_grads: Vec<Vec<ParameterGrad>> = Vec::new();

        for (i, layer) in self.layers.iter().enumerate().rev() {
            if request.wants_activation(layer.name()) {
                activation_grads.push((layer.name().to_string(), grad.clone()));
                pending -= 1;
            }
            if !request.parameters && pending == 0 {
                break;
            }
            let mut layer_params = request.parameters.then(Vec::new);
            grad = layer.backward(&acts[i], &acts[i + 1], &grad, layer_params.as_mut())?;
            if let Some(p) = layer_params {
                param_grads.push(p);
            }
        }

        activation_grads.reverse();
        param_grads.reverse();
        Ok(Gradients {
            activations: activation_grads,
            parameters: param_grads.into_iter().flatten().collect(),
        })
    }
}
