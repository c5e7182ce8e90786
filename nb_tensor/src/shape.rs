//! Shapes, strides and the broadcasting rules shared by every backend.

use std::fmt;

use crate::error::{Result, TensorError};

/// Tensor dimensions, outermost first.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The 0-dimensional shape of a scalar.
    pub fn scalar() -> Self {
        Shape(Vec::new())
    }

    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    pub fn dim(&self, axis: usize) -> usize {
        self.0[axis]
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of elements. A scalar holds one.
    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    /// Fail with [`TensorError::AxisOutOfRange`] unless `axis` names a dimension.
    pub fn check_axis(&self, axis: usize) -> Result<()> {
        if axis < self.ndim() {
            Ok(())
        } else {
            Err(TensorError::AxisOutOfRange {
                axis,
                ndim: self.ndim(),
            })
        }
    }

    /// Row-major strides.
    pub fn contiguous_strides(&self) -> Strides {
        let mut strides = vec![1usize; self.ndim()];
        for axis in (0..self.ndim().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.0[axis + 1];
        }
        Strides(strides)
    }

    /// NumPy-style broadcast of two shapes, aligned on trailing dimensions.
    /// Returns `None` when some pair of dimensions differs and neither is 1.
    pub fn broadcast_with(&self, other: &Shape) -> Option<Shape> {
        let ndim = self.ndim().max(other.ndim());
        let lhs = self.padded_to(ndim);
        let rhs = other.padded_to(ndim);

        lhs.iter()
            .zip(rhs.iter())
            .map(|(&a, &b)| match (a, b) {
                (a, b) if a == b => Some(a),
                (1, b) => Some(b),
                (a, 1) => Some(a),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(Shape)
    }

    /// Axes of `broadcast` that were created or stretched when broadcasting
    /// `self` up to it. Summing over them folds a gradient back to `self`.
    pub fn broadcast_axes(&self, broadcast: &Shape) -> Vec<usize> {
        let offset = broadcast.ndim() - self.ndim();
        let mut axes: Vec<usize> = (0..offset).collect();
        axes.extend(
            (0..self.ndim())
                .filter(|&axis| self.0[axis] == 1 && broadcast.0[offset + axis] != 1)
                .map(|axis| offset + axis),
        );
        axes
    }

    /// Shape left after reducing `axes` (all axes when `None`).
    pub fn reduced(&self, axes: Option<&[usize]>, keepdims: bool) -> Shape {
        let reduces = |axis: usize| axes.map_or(true, |axes| axes.contains(&axis));
        let dims = (0..self.ndim())
            .filter_map(|axis| match (reduces(axis), keepdims) {
                (true, true) => Some(1),
                (true, false) => None,
                (false, _) => Some(self.0[axis]),
            })
            .collect();
        Shape(dims)
    }

    /// Number of elements folded into each output element by a reduction.
    pub fn reduced_count(&self, axes: Option<&[usize]>) -> usize {
        match axes {
            Some(axes) => axes.iter().map(|&axis| self.0[axis]).product(),
            None => self.numel(),
        }
    }

    fn padded_to(&self, ndim: usize) -> Vec<usize> {
        let mut dims = vec![1; ndim - self.ndim()];
        dims.extend_from_slice(&self.0);
        dims
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.0)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        match dims.len() {
            1 => write!(f, "({},)", dims[0]),
            _ => write!(f, "({})", dims.join(", ")),
        }
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape(dims.to_vec())
    }
}

/// Element step per dimension in a flat buffer.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Strides(pub Vec<usize>);

impl Strides {
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Flat offset of a multi-dimensional index.
    pub fn offset(&self, index: &[usize]) -> usize {
        debug_assert_eq!(self.0.len(), index.len());
        self.0.iter().zip(index).map(|(s, i)| s * i).sum()
    }
}
