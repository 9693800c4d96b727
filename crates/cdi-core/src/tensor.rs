// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Guardrail Dense Tensor
// ─────────────────────────────────────────────────────────────────────
//! Minimal dense `f64` tensor (row-major) exchanged with the model.
//!
//! Batched values use the layout `[batch, width...]`; row helpers treat
//! everything after the first axis as one flattened row.

use cdi_types::{GuardError, GuardResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> GuardResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(GuardError::Shape(format!(
                "shape {shape:?} needs {expected} elements, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let n = shape.iter().product();
        Self {
            shape,
            data: vec![0.0; n],
        }
    }

    /// Stack equal-length rows into a `[rows, width]` tensor.
    pub fn from_rows(rows: &[Vec<f64>]) -> GuardResult<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(GuardError::Shape(format!(
                "ragged rows: expected width {width}, got {}",
                bad.len()
            )));
        }
        Ok(Self {
            shape: vec![rows.len(), width],
            data: rows.concat(),
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Size of the leading (batch) axis.
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Elements per row.
    pub fn row_width(&self) -> usize {
        match self.rows() {
            0 => 0,
            r => self.data.len() / r,
        }
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let w = self.row_width();
        &self.data[i * w..(i + 1) * w]
    }

    /// `(rows, cols)` for a 2-D tensor.
    pub fn dims2(&self) -> GuardResult<(usize, usize)> {
        match self.shape.as_slice() {
            [r, c] => Ok((*r, *c)),
            other => Err(GuardError::Shape(format!(
                "expected a 2-D tensor, got shape {other:?}"
            ))),
        }
    }

    pub fn squared_norm(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum()
    }

    /// Frobenius / L2 norm over all elements.
    pub fn l2_norm(&self) -> f64 {
        self.squared_norm().sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Tensor {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    pub fn zip_map(&self, other: &Tensor, f: impl Fn(f64, f64) -> f64) -> GuardResult<Tensor> {
        if self.shape != other.shape {
            return Err(GuardError::Shape(format!(
                "shape mismatch: {:?} vs {:?}",
                self.shape, other.shape
            )));
        }
        Ok(Tensor {
            shape: self.shape.clone(),
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Row-wise softmax of a `[batch, classes]` tensor.
    pub fn softmax_rows(&self) -> GuardResult<Tensor> {
        let (rows, cols) = self.dims2()?;
        let mut out = Vec::with_capacity(self.data.len());
        for r in 0..rows {
            let row = &self.data[r * cols..(r + 1) * cols];
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let exps: Vec<f64> = row.iter().map(|&v| (v - max).exp()).collect();
            let sum: f64 = exps.iter().sum();
            out.extend(exps.into_iter().map(|e| e / sum));
        }
        Tensor::new(self.shape.clone(), out)
    }

    /// Index of the maximum entry per row (first on ties).
    pub fn argmax_rows(&self) -> Vec<usize> {
        (0..self.rows())
            .map(|r| {
                let row = self.row(r);
                let mut best = 0;
                for (i, &v) in row.iter().enumerate() {
                    if v > row[best] {
                        best = i;
                    }
                }
                best
            })
            .collect()
    }
}
