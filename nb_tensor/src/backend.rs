//! Compute backend abstraction.
//!
//! A backend owns the storage type and the raw kernels. The graph layer in
//! [`crate::node`] records which kernel produced each value; [`crate::backward`]
//! calls the same kernels again to build gradients.

use crate::shape::Shape;
use crate::tensor::TensorData;

/// Kernels every backend provides.
///
/// Binary kernels broadcast their operands. Reductions take `None` to mean
/// "all axes", producing a scalar unless `keepdims` is set.
pub trait Backend: Clone + Send + Sync + 'static {
    type Tensor: TensorData;

    // === Creation ===

    /// Panics if `data.len()` differs from `shape.numel()`.
    fn from_vec(data: Vec<f32>, shape: Shape) -> Self::Tensor;

    fn full(shape: &Shape, value: f32) -> Self::Tensor;

    fn zeros(shape: &Shape) -> Self::Tensor {
        Self::full(shape, 0.0)
    }

    fn ones(shape: &Shape) -> Self::Tensor {
        Self::full(shape, 1.0)
    }

    fn scalar(value: f32) -> Self::Tensor {
        Self::full(&Shape::scalar(), value)
    }

    // === Element-wise unary ===

    fn neg(x: &Self::Tensor) -> Self::Tensor;
    fn exp(x: &Self::Tensor) -> Self::Tensor;
    fn log(x: &Self::Tensor) -> Self::Tensor;
    fn abs(x: &Self::Tensor) -> Self::Tensor;
    /// -1, 0 or 1 per element; `sign(0) == 0`.
    fn sign(x: &Self::Tensor) -> Self::Tensor;
    fn relu(x: &Self::Tensor) -> Self::Tensor;
    fn sigmoid(x: &Self::Tensor) -> Self::Tensor;
    fn tanh(x: &Self::Tensor) -> Self::Tensor;

    // === Element-wise binary ===

    fn add(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor;
    fn sub(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor;
    fn mul(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor;
    fn div(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor;
    fn maximum(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor;
    fn minimum(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor;

    // === Comparison masks (1.0 where true, 0.0 elsewhere) ===

    fn gt(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor;
    fn ge(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor;
    fn eq(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor;

    // === Reductions ===

    fn sum(x: &Self::Tensor, axes: Option<&[usize]>, keepdims: bool) -> Self::Tensor;
    fn max(x: &Self::Tensor, axes: Option<&[usize]>, keepdims: bool) -> Self::Tensor;

    fn mean(x: &Self::Tensor, axes: Option<&[usize]>, keepdims: bool) -> Self::Tensor {
        let count = x.shape().reduced_count(axes);
        Self::div(&Self::sum(x, axes, keepdims), &Self::scalar(count as f32))
    }

    // === Shape ===

    /// Panics if the element count changes.
    fn reshape(x: &Self::Tensor, shape: &Shape) -> Self::Tensor;

    fn broadcast_to(x: &Self::Tensor, shape: &Shape) -> Self::Tensor;

    /// Inverse of `broadcast_to` for gradients: sums the broadcast axes away.
    fn sum_to(x: &Self::Tensor, shape: &Shape) -> Self::Tensor {
        if x.shape() == shape {
            return x.clone();
        }
        let axes = shape.broadcast_axes(x.shape());
        Self::reshape(&Self::sum(x, Some(&axes), false), shape)
    }

    /// Insert a length-1 axis at `axis`.
    fn unsqueeze(x: &Self::Tensor, axis: usize) -> Self::Tensor {
        let mut dims = x.shape().dims().to_vec();
        dims.insert(axis, 1);
        Self::reshape(x, &Shape::new(dims))
    }

    // === Gradient accumulation ===

    /// `dst += src`; both must have the same shape.
    fn accumulate(dst: &mut Self::Tensor, src: &Self::Tensor);
}
