//! # nb_nn - loss and activation functions on nb_tensor
//!
//! Each function is a closed-form formula written with nb_tensor primitives
//! (element-wise arithmetic, `exp`, `log`, `abs`, `max`/`sum` along an axis),
//! so its gradient comes from the graph rather than from custom kernels.
//!
//! - **Losses**: L1, MSE, Binary Cross-Entropy (on probabilities and on
//!   logits), Categorical Cross-Entropy (class indices or soft targets)
//! - **Activations**: ReLU, Sigmoid, Tanh, Softmax, Log-Softmax, plus
//!   hand-written backward passes for ReLU, Sigmoid and Tanh
//! - **Identity**: Sigmoid as the first component of a two-class Softmax
//!
//! ## Example
//!
//! ```ignore
//! use nb_backend_cpu::{var, CpuBackend};
//! use nb_nn::{l1_loss, sigmoid, sigmoid_backward};
//! use nb_tensor::prelude::*;
//!
//! let pred = var("pred", vec![1.0, 2.0, 3.0, 4.0], Shape::new(vec![4]));
//! let target = Tensor::<CpuBackend>::from_vec(vec![1.5, 2.5, 3.0, 4.5], Shape::new(vec![4]));
//!
//! let loss = l1_loss(&pred, &target);          // 0.375
//! let grads = loss.backward();
//! let dpred = grads.wrt(&pred).unwrap();       // [-0.25, -0.25, 0.0, -0.25]
//!
//! // Manual backward takes the forward output explicitly.
//! let y = sigmoid(&pred);
//! let dx = sigmoid_backward(&y, &Tensor::ones(y.shape()));
//! ```

pub mod activations;
pub mod identity;
pub mod loss;

pub use activations::{
    log_softmax, relu, relu_backward, sigmoid, sigmoid_backward, softmax, softmax_axis, tanh,
    tanh_backward, try_softmax_axis, DEFAULT_SOFTMAX_AXIS,
};
pub use identity::two_class_softmax;
pub use loss::{
    binary_cross_entropy, binary_cross_entropy_with_logits, cross_entropy_loss,
    cross_entropy_loss_unstabilized, l1_loss, mse_loss, soft_cross_entropy_loss, BCE_EPSILON,
};
