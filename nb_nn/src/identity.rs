//! Sigmoid as two-class Softmax.
//!
//! For logits `[z, 0]`:
//!
//! ```text
//! softmax([z, 0])_0 = e^z / (e^z + e^0)
//!                   = 1 / (1 + e^-z)        (divide through by e^z)
//!                   = sigmoid(z)
//! ```
//!
//! and the second component is `1 - sigmoid(z)`. Any pair `[a, b]` reduces to
//! this case by shift invariance: `softmax([a, b]) = softmax([a - b, 0])`.

use nb_tensor::prelude::*;

use crate::activations::softmax_axis;

/// First component of softmax over `[z, 0]`, for every element of `z`.
///
/// The pair is built in the graph (a new trailing axis times `[1, 0]`), so
/// gradients flow back to `z` and match those of [`crate::sigmoid`].
pub fn two_class_softmax<B: Backend>(z: &Tensor<B>) -> Tensor<B> {
    let axis = z.ndim();
    let first = Tensor::<B>::from_vec(vec![1.0, 0.0], Shape::new(vec![2]));
    let logits = z.unsqueeze(axis) * &first;
    let probs = softmax_axis(&logits, axis);
    (probs * first).sum(Some(&[axis]), false)
}
