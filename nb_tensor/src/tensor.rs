//! Storage abstraction implemented by each backend.

use crate::shape::Shape;

/// Contiguous, row-major f32 storage with a shape.
pub trait TensorData: Clone + std::fmt::Debug + Send + Sync + 'static {
    fn shape(&self) -> &Shape;

    /// Elements in row-major order.
    fn as_slice(&self) -> &[f32];

    fn numel(&self) -> usize {
        self.shape().numel()
    }

    fn is_scalar(&self) -> bool {
        self.shape().is_scalar()
    }

    /// Value of a single-element tensor.
    ///
    /// Panics if the tensor holds more than one element.
    fn scalar_value(&self) -> f32 {
        assert_eq!(
            self.numel(),
            1,
            "expected a single-element tensor, got shape {}",
            self.shape()
        );
        self.as_slice()[0]
    }
}
