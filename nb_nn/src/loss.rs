//! Loss functions.
//!
//! Every loss returns a 0-d tensor that stays connected to its prediction in
//! the autodiff graph.

use nb_tensor::prelude::*;
use tracing::{debug, trace, Level};

use crate::activations::log_softmax;

/// Lower bound applied to probabilities before they reach `log` in
/// [`binary_cross_entropy`].
pub const BCE_EPSILON: f32 = 1e-12;

/// Mean Absolute Error: mean(|pred - target|)
///
/// The gradient is sign(pred - target) / N, and exactly 0 where the two agree.
pub fn l1_loss<B: Backend>(pred: &Tensor<B>, target: &Tensor<B>) -> Tensor<B> {
    let loss = (pred - target).abs().mean(None, false);
    trace!(loss = loss.item(), numel = pred.numel(), "l1_loss");
    loss
}

/// Mean Squared Error: mean((pred - target)^2)
pub fn mse_loss<B: Backend>(pred: &Tensor<B>, target: &Tensor<B>) -> Tensor<B> {
    let diff = pred - target;
    let loss = (&diff * &diff).mean(None, false);
    trace!(loss = loss.item(), numel = pred.numel(), "mse_loss");
    loss
}

/// Binary Cross-Entropy on probabilities:
/// -mean(t log(clamp(p, eps, 1)) + (1 - t) log(clamp(1 - p, eps, 1)))
///
/// `probs` are expected in [0, 1] and `targets` in {0, 1}. The clamp with
/// [`BCE_EPSILON`] keeps predictions of exactly 0 or 1 finite.
pub fn binary_cross_entropy<B: Backend>(probs: &Tensor<B>, targets: &Tensor<B>) -> Tensor<B> {
    if tracing::enabled!(Level::DEBUG) {
        let saturated = saturated_count(probs.as_slice());
        if saturated > 0 {
            debug!(saturated, eps = BCE_EPSILON, "binary_cross_entropy clamped probabilities");
        }
    }

    let one = Tensor::<B>::scalar(1.0);
    let log_p = probs.clamp(BCE_EPSILON, 1.0).log();
    let log_not_p = (&one - probs).clamp(BCE_EPSILON, 1.0).log();

    let per_element = targets * log_p + (&one - targets) * log_not_p;
    let loss = -per_element.mean(None, false);
    trace!(loss = loss.item(), numel = probs.numel(), "binary_cross_entropy");
    loss
}

/// Binary Cross-Entropy on logits:
/// mean(max(x, 0) - x t + log(1 + exp(-|x|)))
///
/// Equal to `binary_cross_entropy(sigmoid(x), t)` without ever forming the
/// probabilities, so it needs no clamp.
pub fn binary_cross_entropy_with_logits<B: Backend>(
    logits: &Tensor<B>,
    targets: &Tensor<B>,
) -> Tensor<B> {
    let softplus_tail = (Tensor::<B>::scalar(1.0) + (-logits.abs()).exp()).log();
    let per_element = logits.relu() - logits * targets + softplus_tail;
    let loss = per_element.mean(None, false);
    trace!(loss = loss.item(), numel = logits.numel(), "binary_cross_entropy_with_logits");
    loss
}

/// Categorical Cross-Entropy from raw logits and class indices.
///
/// `logits` is `[batch, classes]`, `targets[i]` is the class of row `i`. The
/// loss is -sum_i log_softmax(logits)[i, targets[i]] / batch, with the
/// log-sum-exp shifted by the row maximum.
pub fn cross_entropy_loss<B: Backend>(
    logits: &Tensor<B>,
    targets: &[usize],
) -> Result<Tensor<B>, TensorError> {
    let selected = one_hot_targets(logits, targets)?;
    let loss = nll(&log_softmax(logits, 1), &selected);
    trace!(loss = loss.item(), batch = targets.len(), "cross_entropy_loss");
    Ok(loss)
}

/// [`cross_entropy_loss`] with the unshifted log-sum-exp
/// `logits - log(sum(exp(logits)))`.
///
/// Matches the stable version for moderate logits but overflows to a
/// non-finite loss once some `exp(logit)` exceeds f32 range (logits around 89).
pub fn cross_entropy_loss_unstabilized<B: Backend>(
    logits: &Tensor<B>,
    targets: &[usize],
) -> Result<Tensor<B>, TensorError> {
    let selected = one_hot_targets(logits, targets)?;
    let log_probs = logits - logits.exp().sum(Some(&[1]), true).log();
    let loss = nll(&log_probs, &selected);
    trace!(loss = loss.item(), batch = targets.len(), "cross_entropy_loss_unstabilized");
    Ok(loss)
}

/// Cross-Entropy against target distributions:
/// -mean_i(sum_j targets[i, j] log_softmax(logits)[i, j])
///
/// With one-hot `targets` this equals [`cross_entropy_loss`].
pub fn soft_cross_entropy_loss<B: Backend>(logits: &Tensor<B>, targets: &Tensor<B>) -> Tensor<B> {
    let log_probs = log_softmax(logits, 1);
    let loss = -(targets * log_probs).sum(Some(&[1]), false).mean(None, false);
    trace!(loss = loss.item(), "soft_cross_entropy_loss");
    loss
}

/// Number of probabilities the [`BCE_EPSILON`] clamp moves, on either side.
fn saturated_count(probs: &[f32]) -> usize {
    probs
        .iter()
        .filter(|&&p| p < BCE_EPSILON || 1.0 - p < BCE_EPSILON)
        .count()
}

/// Validate class indices against `[batch, classes]` logits and turn them
/// into a constant one-hot mask.
fn one_hot_targets<B: Backend>(
    logits: &Tensor<B>,
    targets: &[usize],
) -> Result<Tensor<B>, TensorError> {
    if logits.ndim() != 2 {
        return Err(TensorError::RankMismatch {
            expected: 2,
            actual: logits.shape().clone(),
        });
    }
    let batch = logits.shape().dim(0);
    if targets.len() != batch {
        return Err(TensorError::ShapeMismatch {
            expected: Shape::new(vec![batch]),
            actual: Shape::new(vec![targets.len()]),
        });
    }
    Tensor::one_hot(targets, logits.shape().dim(1))
}

/// -sum(mask * log_probs) / batch
fn nll<B: Backend>(log_probs: &Tensor<B>, mask: &Tensor<B>) -> Tensor<B> {
    let batch = Tensor::<B>::scalar(log_probs.shape().dim(0) as f32);
    -((mask * log_probs).sum(None, false) / batch)
}
