//! Activation functions.
//!
//! Forward passes are graph ops, so autodiff sees through them. The
//! `*_backward` functions recompute the local derivative by hand from values
//! the caller already holds; they return constants and exist to be compared
//! against autodiff.

use nb_tensor::prelude::*;

/// Axis [`softmax`] normalizes over: the second one, i.e. classes in a
/// `[batch, classes]` matrix.
pub const DEFAULT_SOFTMAX_AXIS: usize = 1;

/// ReLU: max(0, x)
pub fn relu<B: Backend>(x: &Tensor<B>) -> Tensor<B> {
    x.relu()
}

/// Sigmoid: 1 / (1 + exp(-x))
pub fn sigmoid<B: Backend>(x: &Tensor<B>) -> Tensor<B> {
    x.sigmoid()
}

/// Tanh: (exp(x) - exp(-x)) / (exp(x) + exp(-x))
pub fn tanh<B: Backend>(x: &Tensor<B>) -> Tensor<B> {
    x.tanh()
}

/// Softmax over [`DEFAULT_SOFTMAX_AXIS`], or over the only axis of a vector.
///
/// A 0-d input is a one-element distribution: the result is 1.0, still
/// connected to `x` with zero gradient.
pub fn softmax<B: Backend>(x: &Tensor<B>) -> Tensor<B> {
    if x.ndim() == 0 {
        return softmax_axis(&x.unsqueeze(0), 0).sum(Some(&[0]), false);
    }
    let axis = DEFAULT_SOFTMAX_AXIS.min(x.ndim() - 1);
    softmax_axis(x, axis)
}

/// Softmax along `axis`: exp(x - max) / sum(exp(x - max)).
///
/// Subtracting the per-slice maximum keeps `exp` from overflowing and does not
/// change the result. No hand-written backward exists; use autodiff.
///
/// Panics if `axis` is not a dimension of `x`; see [`try_softmax_axis`].
pub fn softmax_axis<B: Backend>(x: &Tensor<B>, axis: usize) -> Tensor<B> {
    assert!(
        axis < x.ndim(),
        "softmax axis {axis} out of range for shape {}",
        x.shape()
    );
    let shifted = x - x.max(Some(&[axis]), true);
    let exp = shifted.exp();
    let total = exp.sum(Some(&[axis]), true);
    exp / total
}

/// [`softmax_axis`] that returns [`TensorError::AxisOutOfRange`] instead of
/// panicking when `axis` is not a dimension of `x`.
pub fn try_softmax_axis<B: Backend>(x: &Tensor<B>, axis: usize) -> Result<Tensor<B>, TensorError> {
    x.shape().check_axis(axis)?;
    Ok(softmax_axis(x, axis))
}

/// log(softmax(x)) along `axis`, computed as x - max - log(sum(exp(x - max))).
pub fn log_softmax<B: Backend>(x: &Tensor<B>, axis: usize) -> Tensor<B> {
    assert!(
        axis < x.ndim(),
        "log_softmax axis {axis} out of range for shape {}",
        x.shape()
    );
    let shifted = x - x.max(Some(&[axis]), true);
    let log_total = shifted.exp().sum(Some(&[axis]), true).log();
    shifted - log_total
}

/// Hand-written ReLU "derivative": 1 where `grad_output >= 1`, else 0.
///
/// This is not the ReLU derivative. It only lines up with it when
/// `grad_output` is the forward output and every positive output is at least
/// 1; an output of 0.5 gets 0 here although its derivative is 1. Use autodiff
/// for real gradients.
pub fn relu_backward<B: Backend>(grad_output: &Tensor<B>) -> Tensor<B> {
    Tensor::constant(B::ge(grad_output.data(), &B::scalar(1.0)))
}

/// grad_input = y (1 - y) grad_output, where `output` is y = sigmoid(x).
pub fn sigmoid_backward<B: Backend>(output: &Tensor<B>, grad_output: &Tensor<B>) -> Tensor<B> {
    let one_minus = Tensor::<B>::scalar(1.0) - output;
    (output * one_minus * grad_output).detach()
}

/// grad_input = (1 - y^2) grad_output, where `output` is y = tanh(x).
pub fn tanh_backward<B: Backend>(output: &Tensor<B>, grad_output: &Tensor<B>) -> Tensor<B> {
    let local = Tensor::<B>::scalar(1.0) - output * output;
    (local * grad_output).detach()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nb_backend_cpu::{constant, var, CpuBackend};

    type T = Tensor<CpuBackend>;

    fn assert_all_close(actual: &[f32], expected: &[f32], tol: f32) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() < tol, "[{i}]: {a} vs {e}");
        }
    }

    #[test]
    fn test_relu() {
        let x = T::from_vec(vec![-1.0, 0.0, 1.0, 2.0], Shape::new(vec![4]));
        assert_eq!(relu(&x).as_slice(), &[0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_sigmoid_and_tanh_at_zero() {
        let x = T::from_vec(vec![0.0], Shape::new(vec![1]));
        assert!((sigmoid(&x).item() - 0.5).abs() < 1e-6);
        assert!(tanh(&x).item().abs() < 1e-6);
    }

    #[test]
    fn test_tanh_matches_exponential_form() {
        let data = vec![-2.0f32, -0.5, 0.3, 1.7];
        let x = T::from_vec(data.clone(), Shape::new(vec![4]));
        let expected: Vec<f32> = data
            .iter()
            .map(|v| (v.exp() - (-v).exp()) / (v.exp() + (-v).exp()))
            .collect();
        assert_all_close(tanh(&x).as_slice(), &expected, 1e-6);
    }

    #[test]
    fn test_softmax_rows() {
        let x = T::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], Shape::new(vec![2, 3]));
        let y = softmax(&x);
        assert_eq!(y.shape().dims(), &[2, 3]);
        assert_all_close(
            y.as_slice(),
            &[0.0900, 0.2447, 0.6652, 0.0900, 0.2447, 0.6652],
            1e-4,
        );
    }

    #[test]
    fn test_softmax_vector_uses_only_axis() {
        let x = T::from_vec(vec![1.0, 2.0, 3.0], Shape::new(vec![3]));
        let sum: f32 = softmax(&x).as_slice().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_softmax_scalar_is_one() {
        let x = var("x", vec![3.5], Shape::scalar());
        let y = softmax(&x);
        assert!(y.shape().is_scalar());
        assert!((y.item() - 1.0).abs() < 1e-6);

        let grads = y.backward();
        assert!(grads.wrt(&x).unwrap().as_slice()[0].abs() < 1e-6);
    }

    #[test]
    fn test_softmax_axis_zero() {
        let x = T::from_vec(vec![0.0, 5.0, 0.0, 5.0], Shape::new(vec![2, 2]));
        let y = softmax_axis(&x, 0);
        assert_all_close(y.as_slice(), &[0.5, 0.5, 0.5, 0.5], 1e-6);
    }

    #[test]
    fn test_softmax_large_logits_stay_finite() {
        let x = T::from_vec(vec![1000.0, 1001.0, 1002.0], Shape::new(vec![1, 3]));
        let y = softmax(&x);
        assert!(y.as_slice().iter().all(|v| v.is_finite()));
        assert_all_close(y.as_slice(), &[0.0900, 0.2447, 0.6652], 1e-4);
    }

    #[test]
    fn test_try_softmax_axis_rejects_bad_axis() {
        let x = T::from_vec(vec![1.0, 2.0], Shape::new(vec![2]));
        let err = try_softmax_axis(&x, 1).unwrap_err();
        assert_eq!(err, TensorError::AxisOutOfRange { axis: 1, ndim: 1 });
    }

    #[test]
    fn test_log_softmax_matches_log_of_softmax() {
        let x = T::from_vec(vec![0.5, -1.0, 2.0, 3.0, 3.0, 0.0], Shape::new(vec![2, 3]));
        let expected: Vec<f32> = softmax(&x).as_slice().iter().map(|p| p.ln()).collect();
        assert_all_close(log_softmax(&x, 1).as_slice(), &expected, 1e-5);
    }

    #[test]
    fn test_relu_backward_shortcut() {
        let y = relu(&T::from_vec(vec![-1.0, 0.0, 1.0, 2.0], Shape::new(vec![4])));
        assert_eq!(relu_backward(&y).as_slice(), &[0.0, 0.0, 1.0, 1.0]);

        // The shortcut misses positive outputs below 1.
        let y = relu(&T::from_vec(vec![0.5], Shape::new(vec![1])));
        assert_eq!(relu_backward(&y).as_slice(), &[0.0]);
    }

    #[test]
    fn test_sigmoid_backward_matches_autodiff() {
        let x = var("x", vec![-2.0, -0.1, 0.0, 0.7, 3.0], Shape::new(vec![5]));
        let upstream = constant(vec![1.0, 2.0, -1.0, 0.5, 3.0], Shape::new(vec![5]));

        let y = sigmoid(&x);
        let grads = (&y * &upstream).sum(None, false).backward();
        let manual = sigmoid_backward(&y, &upstream);

        assert!(matches!(manual.op(), TensorOp::Const));
        assert_all_close(manual.as_slice(), grads.wrt(&x).unwrap().as_slice(), 1e-6);
    }

    #[test]
    fn test_tanh_backward_matches_autodiff() {
        let x = var("x", vec![-1.5, 0.0, 0.4, 2.0], Shape::new(vec![4]));
        let upstream = constant(vec![0.5, 1.0, -2.0, 1.0], Shape::new(vec![4]));

        let y = tanh(&x);
        let grads = (&y * &upstream).sum(None, false).backward();
        let manual = tanh_backward(&y, &upstream);

        assert_all_close(manual.as_slice(), grads.wrt(&x).unwrap().as_slice(), 1e-6);
    }

    #[test]
    fn test_softmax_gradient_sums_to_zero_per_row() {
        // Each row of softmax sums to one, so d(sum of a row)/dx vanishes.
        let x = var("x", vec![0.2, -0.4, 1.1, 2.0, 0.0, -1.0], Shape::new(vec![2, 3]));
        let grads = softmax(&x).sum(None, false).backward();
        assert_all_close(grads.wrt(&x).unwrap().as_slice(), &[0.0; 6], 1e-5);
    }
}
