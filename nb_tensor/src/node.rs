//! Graph nodes: every tensor remembers the op and operands that produced it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::tensor::TensorData;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a node in the computation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The operation that produced a node.
#[derive(Debug, Clone)]
pub enum TensorOp {
    /// Leaf that gradients stop at.
    Const,
    /// Leaf that gradients are reported for.
    Var { name: String },

    Neg,
    Exp,
    Log,
    Abs,
    Relu,
    Sigmoid,
    Tanh,

    Add,
    Sub,
    Mul,
    Div,
    Maximum,
    Minimum,

    Sum { axes: Option<Vec<usize>>, keepdims: bool },
    Mean { axes: Option<Vec<usize>>, keepdims: bool },
    Max { axes: Option<Vec<usize>>, keepdims: bool },

    Unsqueeze { axis: usize },
}

pub struct TensorNode<B: Backend> {
    pub id: NodeId,
    pub op: TensorOp,
    pub data: B::Tensor,
    pub children: Vec<Tensor<B>>,
}

/// Cheap-to-clone handle to a node. The value is computed eagerly when the
/// node is built; [`Tensor::backward`] walks the recorded graph.
pub struct Tensor<B: Backend>(pub(crate) Arc<TensorNode<B>>);

impl<B: Backend> Clone for Tensor<B> {
    fn clone(&self) -> Self {
        Tensor(Arc::clone(&self.0))
    }
}

impl<B: Backend> std::fmt::Debug for Tensor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("id", &self.0.id)
            .field("op", &self.0.op)
            .field("shape", self.shape())
            .field("data", &self.as_slice())
            .finish()
    }
}

impl<B: Backend> Tensor<B> {
    fn node(op: TensorOp, data: B::Tensor, children: Vec<Tensor<B>>) -> Self {
        Tensor(Arc::new(TensorNode {
            id: NodeId::fresh(),
            op,
            data,
            children,
        }))
    }

    fn unary(&self, op: TensorOp, kernel: fn(&B::Tensor) -> B::Tensor) -> Self {
        Self::node(op, kernel(self.data()), vec![self.clone()])
    }

    fn binary(
        &self,
        other: &Self,
        op: TensorOp,
        kernel: fn(&B::Tensor, &B::Tensor) -> B::Tensor,
    ) -> Self {
        Self::node(
            op,
            kernel(self.data(), other.data()),
            vec![self.clone(), other.clone()],
        )
    }

    // === Leaves ===

    /// A named leaf whose gradient [`Tensor::backward`] reports.
    pub fn var(name: &str, data: B::Tensor) -> Self {
        Self::node(TensorOp::Var { name: name.to_string() }, data, Vec::new())
    }

    pub fn constant(data: B::Tensor) -> Self {
        Self::node(TensorOp::Const, data, Vec::new())
    }

    pub fn scalar(value: f32) -> Self {
        Self::constant(B::scalar(value))
    }

    pub fn ones(shape: &Shape) -> Self {
        Self::constant(B::ones(shape))
    }

    /// Constant from row-major data. Panics on a length mismatch; see
    /// [`Tensor::try_from_vec`] for untrusted input.
    pub fn from_vec(data: Vec<f32>, shape: Shape) -> Self {
        Self::constant(B::from_vec(data, shape))
    }

    pub fn try_from_vec(data: Vec<f32>, shape: Shape) -> Result<Self> {
        if data.len() != shape.numel() {
            return Err(TensorError::DataLength {
                len: data.len(),
                numel: shape.numel(),
                shape,
            });
        }
        Ok(Self::from_vec(data, shape))
    }

    /// `[indices.len(), classes]` constant with a single 1.0 per row.
    pub fn one_hot(indices: &[usize], classes: usize) -> Result<Self> {
        let mut data = vec![0.0; indices.len() * classes];
        for (row, &index) in indices.iter().enumerate() {
            if index >= classes {
                return Err(TensorError::IndexOutOfRange {
                    index,
                    size: classes,
                });
            }
            data[row * classes + index] = 1.0;
        }
        Ok(Self::from_vec(data, Shape::new(vec![indices.len(), classes])))
    }

    /// Copy of the current value as a new constant, cut from the graph.
    pub fn detach(&self) -> Self {
        Self::constant(self.data().clone())
    }

    // === Accessors ===

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn op(&self) -> &TensorOp {
        &self.0.op
    }

    pub fn data(&self) -> &B::Tensor {
        &self.0.data
    }

    pub fn children(&self) -> &[Tensor<B>] {
        &self.0.children
    }

    pub fn shape(&self) -> &Shape {
        self.0.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.shape().ndim()
    }

    pub fn numel(&self) -> usize {
        self.shape().numel()
    }

    pub fn var_name(&self) -> Option<&str> {
        match &self.0.op {
            TensorOp::Var { name } => Some(name),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        self.0.data.as_slice()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.as_slice().to_vec()
    }

    /// Value of a single-element tensor.
    pub fn item(&self) -> f32 {
        self.0.data.scalar_value()
    }

    // === Element-wise unary ===

    pub fn neg(&self) -> Self {
        self.unary(TensorOp::Neg, B::neg)
    }

    pub fn exp(&self) -> Self {
        self.unary(TensorOp::Exp, B::exp)
    }

    /// Natural logarithm.
    pub fn log(&self) -> Self {
        self.unary(TensorOp::Log, B::log)
    }

    /// Absolute value. The gradient is `sign(x)`, so it is 0 at 0.
    pub fn abs(&self) -> Self {
        self.unary(TensorOp::Abs, B::abs)
    }

    pub fn relu(&self) -> Self {
        self.unary(TensorOp::Relu, B::relu)
    }

    pub fn sigmoid(&self) -> Self {
        self.unary(TensorOp::Sigmoid, B::sigmoid)
    }

    pub fn tanh(&self) -> Self {
        self.unary(TensorOp::Tanh, B::tanh)
    }

    // === Element-wise binary ===

    pub fn add(&self, other: &Self) -> Self {
        self.binary(other, TensorOp::Add, B::add)
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.binary(other, TensorOp::Sub, B::sub)
    }

    pub fn mul(&self, other: &Self) -> Self {
        self.binary(other, TensorOp::Mul, B::mul)
    }

    pub fn div(&self, other: &Self) -> Self {
        self.binary(other, TensorOp::Div, B::div)
    }

    pub fn maximum(&self, other: &Self) -> Self {
        self.binary(other, TensorOp::Maximum, B::maximum)
    }

    pub fn minimum(&self, other: &Self) -> Self {
        self.binary(other, TensorOp::Minimum, B::minimum)
    }

    /// Limit every element to `[min, max]`. Elements sitting exactly on a
    /// bound keep their gradient.
    pub fn clamp(&self, min: f32, max: f32) -> Self {
        self.maximum(&Self::scalar(min)).minimum(&Self::scalar(max))
    }

    // === Reductions ===

    /// Sum over `axes` (all axes when `None`).
    pub fn sum(&self, axes: Option<&[usize]>, keepdims: bool) -> Self {
        Self::node(
            TensorOp::Sum {
                axes: axes.map(<[usize]>::to_vec),
                keepdims,
            },
            B::sum(self.data(), axes, keepdims),
            vec![self.clone()],
        )
    }

    pub fn mean(&self, axes: Option<&[usize]>, keepdims: bool) -> Self {
        Self::node(
            TensorOp::Mean {
                axes: axes.map(<[usize]>::to_vec),
                keepdims,
            },
            B::mean(self.data(), axes, keepdims),
            vec![self.clone()],
        )
    }

    pub fn max(&self, axes: Option<&[usize]>, keepdims: bool) -> Self {
        Self::node(
            TensorOp::Max {
                axes: axes.map(<[usize]>::to_vec),
                keepdims,
            },
            B::max(self.data(), axes, keepdims),
            vec![self.clone()],
        )
    }

    // === Shape ===

    pub fn unsqueeze(&self, axis: usize) -> Self {
        Self::node(
            TensorOp::Unsqueeze { axis },
            B::unsqueeze(self.data(), axis),
            vec![self.clone()],
        )
    }

    /// Reverse-mode gradients of every node reachable from `self`.
    pub fn backward(&self) -> crate::backward::Gradients<B> {
        crate::backward::backward(self)
    }
}

impl<B: Backend> std::ops::Neg for &Tensor<B> {
    type Output = Tensor<B>;
    fn neg(self) -> Tensor<B> {
        Tensor::neg(self)
    }
}

impl<B: Backend> std::ops::Neg for Tensor<B> {
    type Output = Tensor<B>;
    fn neg(self) -> Tensor<B> {
        Tensor::neg(&self)
    }
}

/// Arithmetic operators for every owned/borrowed pairing.
macro_rules! impl_binary_operator {
    ($trait:ident, $method:ident) => {
        impl<B: Backend> std::ops::$trait<&Tensor<B>> for &Tensor<B> {
            type Output = Tensor<B>;
            fn $method(self, rhs: &Tensor<B>) -> Tensor<B> {
                Tensor::$method(self, rhs)
            }
        }

        impl<B: Backend> std::ops::$trait<Tensor<B>> for &Tensor<B> {
            type Output = Tensor<B>;
            fn $method(self, rhs: Tensor<B>) -> Tensor<B> {
                Tensor::$method(self, &rhs)
            }
        }

        impl<B: Backend> std::ops::$trait<&Tensor<B>> for Tensor<B> {
            type Output = Tensor<B>;
            fn $method(self, rhs: &Tensor<B>) -> Tensor<B> {
                Tensor::$method(&self, rhs)
            }
        }

        impl<B: Backend> std::ops::$trait<Tensor<B>> for Tensor<B> {
            type Output = Tensor<B>;
            fn $method(self, rhs: Tensor<B>) -> Tensor<B> {
                Tensor::$method(&self, &rhs)
            }
        }
    };
}

impl_binary_operator!(Add, add);
impl_binary_operator!(Sub, sub);
impl_binary_operator!(Mul, mul);
impl_binary_operator!(Div, div);
