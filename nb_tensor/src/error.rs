//! Errors for data-driven tensor construction and indexing.

use thiserror::Error;

use crate::shape::Shape;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    #[error("data length {len} does not match shape {shape} (numel={numel})")]
    DataLength { len: usize, shape: Shape, numel: usize },
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: Shape, actual: Shape },
    #[error("expected a {expected}-d tensor, got shape {actual}")]
    RankMismatch { expected: usize, actual: Shape },
    #[error("index {index} out of range for axis of size {size}")]
    IndexOutOfRange { index: usize, size: usize },
    #[error("axis {axis} out of range for {ndim}-d tensor")]
    AxisOutOfRange { axis: usize, ndim: usize },
}

pub type Result<T> = std::result::Result<T, TensorError>;
