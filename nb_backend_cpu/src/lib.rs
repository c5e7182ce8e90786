//! Reference CPU backend for nb_tensor.
//!
//! Plain `Vec<f32>` storage in row-major order. Kernels favour clarity over
//! speed: broadcasting and reductions go through explicit index arithmetic.

use nb_tensor::prelude::*;
use nb_tensor::Strides;

/// Row-major f32 buffer with its shape.
#[derive(Clone, Debug, PartialEq)]
pub struct CpuTensor {
    data: Vec<f32>,
    shape: Shape,
}

impl CpuTensor {
    pub fn new(data: Vec<f32>, shape: Shape) -> Self {
        assert_eq!(
            data.len(),
            shape.numel(),
            "data length {} doesn't match shape {} (numel={})",
            data.len(),
            shape,
            shape.numel()
        );
        CpuTensor { data, shape }
    }

    fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        CpuTensor::new(self.data.iter().map(|&v| f(v)).collect(), self.shape.clone())
    }

    /// Element-wise combination after broadcasting both operands.
    fn zip_with(&self, other: &Self, f: impl Fn(f32, f32) -> f32) -> Self {
        let shape = self.shape.broadcast_with(&other.shape).unwrap_or_else(|| {
            panic!("shapes {} and {} are not broadcast compatible", self.shape, other.shape)
        });
        let lhs = CpuBackend::broadcast_to(self, &shape);
        let rhs = CpuBackend::broadcast_to(other, &shape);
        let data = lhs.data.iter().zip(&rhs.data).map(|(&a, &b)| f(a, b)).collect();
        CpuTensor::new(data, shape)
    }

    fn reduce(
        &self,
        axes: Option<&[usize]>,
        keepdims: bool,
        init: f32,
        f: impl Fn(f32, f32) -> f32,
    ) -> Self {
        // Accumulate into the keepdims layout, which has the same element
        // order as the squeezed result.
        let kept = self.shape.reduced(axes, true);
        let kept_strides = kept.contiguous_strides();
        let mut data = vec![init; kept.numel()];

        for (flat, &value) in self.data.iter().enumerate() {
            let mut target = 0;
            let mut rest = flat;
            for axis in (0..self.shape.ndim()).rev() {
                let dim = self.shape.dim(axis);
                let coord = rest % dim;
                rest /= dim;
                if kept.dim(axis) != 1 {
                    target += coord * kept_strides.as_slice()[axis];
                }
            }
            data[target] = f(data[target], value);
        }

        CpuTensor::new(data, self.shape.reduced(axes, keepdims))
    }
}

impl TensorData for CpuTensor {
    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Source offset in `from` for every element of its broadcast to `to`.
fn broadcast_offsets(from: &Shape, to: &Shape) -> Vec<usize> {
    let offset = to.ndim() - from.ndim();
    // Stretched axes contribute nothing to the source offset.
    let strides = from.contiguous_strides();
    let source_strides = Strides(
        (0..to.ndim())
            .map(|axis| match axis.checked_sub(offset) {
                Some(src) if from.dim(src) != 1 => strides.as_slice()[src],
                _ => 0,
            })
            .collect(),
    );

    let mut index = vec![0usize; to.ndim()];
    let mut offsets = Vec::with_capacity(to.numel());
    for _ in 0..to.numel() {
        offsets.push(source_strides.offset(&index));
        for axis in (0..to.ndim()).rev() {
            index[axis] += 1;
            if index[axis] < to.dim(axis) {
                break;
            }
            index[axis] = 0;
        }
    }
    offsets
}

fn signum_or_zero(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        v * 0.0
    }
}

fn mask(condition: bool) -> f32 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// CPU backend marker.
#[derive(Clone, Copy, Debug)]
pub struct CpuBackend;

impl Backend for CpuBackend {
    type Tensor = CpuTensor;

    fn from_vec(data: Vec<f32>, shape: Shape) -> CpuTensor {
        CpuTensor::new(data, shape)
    }

    fn full(shape: &Shape, value: f32) -> CpuTensor {
        CpuTensor::new(vec![value; shape.numel()], shape.clone())
    }

    fn neg(x: &CpuTensor) -> CpuTensor {
        x.map(|v| -v)
    }

    fn exp(x: &CpuTensor) -> CpuTensor {
        x.map(f32::exp)
    }

    fn log(x: &CpuTensor) -> CpuTensor {
        x.map(f32::ln)
    }

    fn abs(x: &CpuTensor) -> CpuTensor {
        x.map(f32::abs)
    }

    fn sign(x: &CpuTensor) -> CpuTensor {
        x.map(signum_or_zero)
    }

    fn relu(x: &CpuTensor) -> CpuTensor {
        x.map(|v| v.max(0.0))
    }

    fn sigmoid(x: &CpuTensor) -> CpuTensor {
        x.map(|v| 1.0 / (1.0 + (-v).exp()))
    }

    fn tanh(x: &CpuTensor) -> CpuTensor {
        x.map(f32::tanh)
    }

    fn add(a: &CpuTensor, b: &CpuTensor) -> CpuTensor {
        a.zip_with(b, |x, y| x + y)
    }

    fn sub(a: &CpuTensor, b: &CpuTensor) -> CpuTensor {
        a.zip_with(b, |x, y| x - y)
    }

    fn mul(a: &CpuTensor, b: &CpuTensor) -> CpuTensor {
        a.zip_with(b, |x, y| x * y)
    }

    fn div(a: &CpuTensor, b: &CpuTensor) -> CpuTensor {
        a.zip_with(b, |x, y| x / y)
    }

    fn maximum(a: &CpuTensor, b: &CpuTensor) -> CpuTensor {
        a.zip_with(b, f32::max)
    }

    fn minimum(a: &CpuTensor, b: &CpuTensor) -> CpuTensor {
        a.zip_with(b, f32::min)
    }

    fn gt(a: &CpuTensor, b: &CpuTensor) -> CpuTensor {
        a.zip_with(b, |x, y| mask(x > y))
    }

    fn ge(a: &CpuTensor, b: &CpuTensor) -> CpuTensor {
        a.zip_with(b, |x, y| mask(x >= y))
    }

    fn eq(a: &CpuTensor, b: &CpuTensor) -> CpuTensor {
        a.zip_with(b, |x, y| mask(x == y))
    }

    fn sum(x: &CpuTensor, axes: Option<&[usize]>, keepdims: bool) -> CpuTensor {
        x.reduce(axes, keepdims, 0.0, |acc, v| acc + v)
    }

    fn max(x: &CpuTensor, axes: Option<&[usize]>, keepdims: bool) -> CpuTensor {
        x.reduce(axes, keepdims, f32::NEG_INFINITY, f32::max)
    }

    fn reshape(x: &CpuTensor, shape: &Shape) -> CpuTensor {
        assert_eq!(
            x.shape.numel(),
            shape.numel(),
            "cannot reshape {} into {}",
            x.shape,
            shape
        );
        CpuTensor::new(x.data.clone(), shape.clone())
    }

    fn broadcast_to(x: &CpuTensor, shape: &Shape) -> CpuTensor {
        if &x.shape == shape {
            return x.clone();
        }
        let data = broadcast_offsets(&x.shape, shape)
            .into_iter()
            .map(|offset| x.data[offset])
            .collect();
        CpuTensor::new(data, shape.clone())
    }

    fn accumulate(dst: &mut CpuTensor, src: &CpuTensor) {
        assert_eq!(dst.shape, src.shape, "gradient shape mismatch");
        for (d, s) in dst.data.iter_mut().zip(&src.data) {
            *d += s;
        }
    }
}

/// Graph tensor on the CPU backend.
pub type CpuExpr = Tensor<CpuBackend>;

/// Tracked variable from row-major data.
pub fn var(name: &str, data: Vec<f32>, shape: Shape) -> CpuExpr {
    Tensor::var(name, CpuBackend::from_vec(data, shape))
}

/// Constant from row-major data.
pub fn constant(data: Vec<f32>, shape: Shape) -> CpuExpr {
    Tensor::constant(CpuBackend::from_vec(data, shape))
}

/// Central-difference gradient of `sum(f(inputs))` with respect to each input.
///
/// Inputs are perturbed one element at a time as constants, so `f` never sees
/// autodiff state. Returns one gradient vector per input, in input order.
pub fn finite_diff_grad<F>(f: F, inputs: &[CpuExpr], eps: f32) -> Vec<Vec<f32>>
where
    F: Fn(&[CpuExpr]) -> CpuExpr,
{
    let evaluate = |which: usize, element: usize, delta: f32| -> f64 {
        let perturbed: Vec<CpuExpr> = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                let mut data = input.to_vec();
                if i == which {
                    data[element] += delta;
                }
                constant(data, input.shape().clone())
            })
            .collect();
        f(&perturbed).sum(None, false).item() as f64
    };

    inputs
        .iter()
        .enumerate()
        .map(|(which, input)| {
            (0..input.numel())
                .map(|element| {
                    let plus = evaluate(which, element, eps);
                    let minus = evaluate(which, element, -eps);
                    ((plus - minus) / (2.0 * eps as f64)) as f32
                })
                .collect()
        })
        .collect()
}

/// Largest absolute element-wise difference between two gradients.
pub fn max_grad_error(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "gradient lengths differ");
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
}
