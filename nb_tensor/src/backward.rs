//! Reverse-mode differentiation over the recorded graph.

use std::collections::{HashMap, HashSet};

use crate::backend::Backend;
use crate::node::{NodeId, Tensor, TensorOp};
use crate::shape::Shape;
use crate::tensor::TensorData;

/// Gradients of one output with respect to every node it depends on.
pub struct Gradients<B: Backend> {
    adjoints: HashMap<NodeId, B::Tensor>,
    by_name: HashMap<String, NodeId>,
}

impl<B: Backend> Gradients<B> {
    /// Gradient with respect to `tensor`, if it took part in the output.
    pub fn wrt(&self, tensor: &Tensor<B>) -> Option<&B::Tensor> {
        self.adjoints.get(&tensor.id())
    }

    /// Gradient of the variable called `name`. When several variables share a
    /// name, the earliest in graph order wins.
    pub fn by_name(&self, name: &str) -> Option<&B::Tensor> {
        self.by_name.get(name).and_then(|id| self.adjoints.get(id))
    }
}

pub fn backward<B: Backend>(output: &Tensor<B>) -> Gradients<B> {
    let order = topological_order(output);

    let mut adjoints: HashMap<NodeId, B::Tensor> = HashMap::new();
    adjoints.insert(output.id(), B::ones(output.shape()));

    for node in order.iter().rev() {
        let Some(upstream) = adjoints.get(&node.id()).cloned() else {
            continue;
        };
        for (child, grad) in node.children().iter().zip(local_gradients(node, &upstream)) {
            adjoints
                .entry(child.id())
                .and_modify(|acc| B::accumulate(acc, &grad))
                .or_insert(grad);
        }
    }

    let mut by_name = HashMap::new();
    for node in &order {
        if let Some(name) = node.var_name() {
            if adjoints.contains_key(&node.id()) {
                by_name.entry(name.to_string()).or_insert(node.id());
            }
        }
    }

    Gradients { adjoints, by_name }
}

/// Gradient for each child of `node`, in child order.
fn local_gradients<B: Backend>(node: &Tensor<B>, upstream: &B::Tensor) -> Vec<B::Tensor> {
    let children = node.children();
    let out = node.data();

    match node.op() {
        TensorOp::Const | TensorOp::Var { .. } => Vec::new(),

        TensorOp::Neg => vec![B::neg(upstream)],
        TensorOp::Exp => vec![B::mul(upstream, out)],
        TensorOp::Log => vec![B::div(upstream, children[0].data())],
        TensorOp::Abs => vec![B::mul(upstream, &B::sign(children[0].data()))],
        TensorOp::Relu => {
            let mask = B::gt(children[0].data(), &B::scalar(0.0));
            vec![B::mul(upstream, &mask)]
        }
        TensorOp::Sigmoid => {
            // s' = s (1 - s)
            let local = B::mul(out, &B::sub(&B::scalar(1.0), out));
            vec![B::mul(upstream, &local)]
        }
        TensorOp::Tanh => {
            // t' = 1 - t^2
            let local = B::sub(&B::scalar(1.0), &B::mul(out, out));
            vec![B::mul(upstream, &local)]
        }

        TensorOp::Add => vec![
            B::sum_to(upstream, children[0].shape()),
            B::sum_to(upstream, children[1].shape()),
        ],
        TensorOp::Sub => vec![
            B::sum_to(upstream, children[0].shape()),
            B::sum_to(&B::neg(upstream), children[1].shape()),
        ],
        TensorOp::Mul => {
            let (a, b) = (children[0].data(), children[1].data());
            vec![
                B::sum_to(&B::mul(upstream, b), a.shape()),
                B::sum_to(&B::mul(upstream, a), b.shape()),
            ]
        }
        TensorOp::Div => {
            // d(a/b) = da / b - a db / b^2
            let (a, b) = (children[0].data(), children[1].data());
            let grad_a = B::div(upstream, b);
            let grad_b = B::neg(&B::div(&B::mul(&grad_a, a), b));
            vec![B::sum_to(&grad_a, a.shape()), B::sum_to(&grad_b, b.shape())]
        }
        TensorOp::Maximum => {
            // Ties go to the left operand.
            let (a, b) = (children[0].data(), children[1].data());
            let to_a = B::ge(a, b);
            let to_b = B::gt(b, a);
            vec![
                B::sum_to(&B::mul(upstream, &to_a), a.shape()),
                B::sum_to(&B::mul(upstream, &to_b), b.shape()),
            ]
        }
        TensorOp::Minimum => {
            let (a, b) = (children[0].data(), children[1].data());
            let to_a = B::ge(b, a);
            let to_b = B::gt(a, b);
            vec![
                B::sum_to(&B::mul(upstream, &to_a), a.shape()),
                B::sum_to(&B::mul(upstream, &to_b), b.shape()),
            ]
        }

        TensorOp::Sum { axes, keepdims } => {
            let input = children[0].shape();
            vec![spread::<B>(upstream, input, axes.as_deref(), *keepdims)]
        }
        TensorOp::Mean { axes, keepdims } => {
            let input = children[0].shape();
            let count = input.reduced_count(axes.as_deref());
            let spread = spread::<B>(upstream, input, axes.as_deref(), *keepdims);
            vec![B::div(&spread, &B::scalar(count as f32))]
        }
        TensorOp::Max { axes, keepdims } => {
            // Every element equal to the maximum receives the full gradient.
            let input = children[0].shape();
            let grad = spread::<B>(upstream, input, axes.as_deref(), *keepdims);
            let max = spread::<B>(out, input, axes.as_deref(), *keepdims);
            vec![B::mul(&grad, &B::eq(children[0].data(), &max))]
        }

        TensorOp::Unsqueeze { .. } => vec![B::reshape(upstream, children[0].shape())],
    }
}

/// Broadcast a reduced tensor back over the input shape it was reduced from.
fn spread<B: Backend>(
    reduced: &B::Tensor,
    input: &Shape,
    axes: Option<&[usize]>,
    keepdims: bool,
) -> B::Tensor {
    let kept = if keepdims {
        reduced.clone()
    } else {
        B::reshape(reduced, &input.reduced(axes, true))
    };
    B::broadcast_to(&kept, input)
}

/// Post-order DFS from `root`: operands always precede their consumers.
fn topological_order<B: Backend>(root: &Tensor<B>) -> Vec<Tensor<B>> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![(root.clone(), false)];

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        if !visited.insert(node.id()) {
            continue;
        }
        stack.push((node.clone(), true));
        for child in node.children().iter().rev() {
            if !visited.contains(&child.id()) {
                stack.push((child.clone(), false));
            }
        }
    }

    order
}

