//! # nb_tensor - tensors with reverse-mode autodiff
//!
//! The graph layer behind `nb_nn`. A [`Tensor`] is a reference-counted node
//! holding its eagerly computed value, the [`TensorOp`] that produced it and
//! its operands. Calling [`Tensor::backward`] on a scalar walks that graph in
//! reverse and returns [`Gradients`].
//!
//! Storage and kernels come from a [`Backend`]; `nb_backend_cpu` is the
//! reference implementation.
//!
//! ```ignore
//! use nb_tensor::prelude::*;
//! use nb_backend_cpu::CpuBackend;
//!
//! let x = Tensor::<CpuBackend>::var("x", CpuBackend::from_vec(vec![1.0, -2.0], Shape::new(vec![2])));
//! let y = x.abs().mean(None, false);
//! let grads = y.backward();
//! assert_eq!(grads.wrt(&x).unwrap().as_slice(), &[0.5, -0.5]);
//! ```

pub mod backend;
pub mod backward;
pub mod error;
pub mod node;
pub mod shape;
pub mod tensor;

pub use backend::Backend;
pub use backward::Gradients;
pub use error::{Result, TensorError};
pub use node::{NodeId, Tensor, TensorOp};
pub use shape::{Shape, Strides};
pub use tensor::TensorData;

pub mod prelude {
    pub use crate::backend::Backend;
    pub use crate::backward::Gradients;
    pub use crate::error::TensorError;
    pub use crate::node::{NodeId, Tensor, TensorOp};
    pub use crate::shape::Shape;
    pub use crate::tensor::TensorData;
}
