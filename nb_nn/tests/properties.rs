//! Randomized checks of the algebraic properties every loss and activation
//! must satisfy, whatever the input.

use nb_backend_cpu::{constant, CpuBackend, CpuExpr};
use nb_nn::{
    binary_cross_entropy, l1_loss, mse_loss, sigmoid, softmax, softmax_axis, two_class_softmax,
};
use nb_tensor::prelude::*;
use rand::rngs::ThreadRng;
use rand::Rng;

const TRIALS: usize = 25;

fn random_data(rng: &mut ThreadRng, n: usize, lo: f32, hi: f32) -> Vec<f32> {
    (0..n).map(|_| rng.gen_range(lo..hi)).collect()
}

fn random_tensor(rng: &mut ThreadRng, dims: &[usize], lo: f32, hi: f32) -> CpuExpr {
    let shape = Shape::from(dims);
    constant(random_data(rng, shape.numel(), lo, hi), shape)
}

fn random_dims(rng: &mut ThreadRng) -> Vec<usize> {
    vec![rng.gen_range(1..5), rng.gen_range(2..6)]
}

// ============================================================================
// Regression losses
// ============================================================================

#[test]
fn test_l1_and_mse_zero_on_equal_inputs() {
    let mut rng = rand::thread_rng();
    for _ in 0..TRIALS {
        let dims = random_dims(&mut rng);
        let p = random_tensor(&mut rng, &dims, -10.0, 10.0);
        let t = constant(p.to_vec(), p.shape().clone());
        assert_eq!(l1_loss(&p, &t).item(), 0.0);
        assert_eq!(mse_loss(&p, &t).item(), 0.0);
    }
}

#[test]
fn test_mse_positive_once_any_entry_differs() {
    let mut rng = rand::thread_rng();
    for _ in 0..TRIALS {
        let dims = random_dims(&mut rng);
        let p = random_tensor(&mut rng, &dims, -10.0, 10.0);
        let mut shifted = p.to_vec();
        let i = rng.gen_range(0..shifted.len());
        shifted[i] += rng.gen_range(0.01..1.0);
        let t = constant(shifted, p.shape().clone());

        let loss = mse_loss(&p, &t).item();
        assert!(loss > 0.0, "mse = {loss}");
    }
}

#[test]
fn test_l1_bounded_by_root_mse() {
    // mean|d| <= sqrt(mean d^2)
    let mut rng = rand::thread_rng();
    for _ in 0..TRIALS {
        let dims = random_dims(&mut rng);
        let p = random_tensor(&mut rng, &dims, -3.0, 3.0);
        let t = random_tensor(&mut rng, &dims, -3.0, 3.0);
        let l1 = l1_loss(&p, &t).item();
        let l2 = mse_loss(&p, &t).item();
        assert!(l1 >= 0.0 && l2 >= 0.0);
        assert!(l1 <= l2.sqrt() + 1e-5, "l1 = {l1}, mse = {l2}");
    }
}

// ============================================================================
// Binary cross-entropy
// ============================================================================

#[test]
fn test_bce_non_negative() {
    let mut rng = rand::thread_rng();
    for _ in 0..TRIALS {
        let n = rng.gen_range(1..16);
        let probs = constant(random_data(&mut rng, n, 1e-4, 1.0 - 1e-4), Shape::new(vec![n]));
        let labels: Vec<f32> = (0..n).map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 }).collect();
        let targets = constant(labels, Shape::new(vec![n]));

        let loss = binary_cross_entropy(&probs, &targets).item();
        assert!(loss.is_finite() && loss >= 0.0, "bce = {loss}");
    }
}

// ============================================================================
// Softmax
// ============================================================================

#[test]
fn test_softmax_rows_are_distributions() {
    let mut rng = rand::thread_rng();
    for _ in 0..TRIALS {
        let dims = random_dims(&mut rng);
        let y = softmax(&random_tensor(&mut rng, &dims, -5.0, 5.0));

        for row in y.as_slice().chunks(dims[1]) {
            let total: f32 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-5, "row sums to {total}");
            assert!(row.iter().all(|&p| p > 0.0 && p < 1.0), "{row:?}");
        }
    }
}

#[test]
fn test_softmax_shift_invariance() {
    let mut rng = rand::thread_rng();
    for _ in 0..TRIALS {
        let dims = random_dims(&mut rng);
        let x = random_tensor(&mut rng, &dims, -5.0, 5.0);
        // One constant per row, broadcast across the class axis.
        let offsets = random_tensor(&mut rng, &[dims[0], 1], -50.0, 50.0);

        let base = softmax(&x);
        let shifted = softmax(&(&x + &offsets));
        for (a, b) in base.as_slice().iter().zip(shifted.as_slice()) {
            assert!((a - b).abs() < 1e-5, "{a} vs {b}");
        }
    }
}

#[test]
fn test_softmax_axis_zero_columns_are_distributions() {
    let mut rng = rand::thread_rng();
    let x = random_tensor(&mut rng, &[4, 3], -5.0, 5.0);
    let y = softmax_axis(&x, 0);
    let column_sums = y.sum(Some(&[0]), false);
    for total in column_sums.as_slice() {
        assert!((total - 1.0).abs() < 1e-5);
    }
}

// ============================================================================
// Sigmoid / Softmax identity
// ============================================================================

#[test]
fn test_sigmoid_equals_two_class_softmax() {
    let mut rng = rand::thread_rng();
    for _ in 0..TRIALS {
        let z = random_tensor(&mut rng, &[8], -15.0, 15.0);
        let direct = sigmoid(&z);
        let via_softmax = two_class_softmax(&z);
        for (a, b) in direct.as_slice().iter().zip(via_softmax.as_slice()) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }
}

#[test]
fn test_two_class_softmax_matches_explicit_pair() {
    let mut rng = rand::thread_rng();
    for _ in 0..TRIALS {
        let z: f32 = rng.gen_range(-10.0..10.0);
        let pair = Tensor::<CpuBackend>::from_vec(vec![z, 0.0], Shape::new(vec![1, 2]));
        let first = softmax(&pair).as_slice()[0];
        let via_identity = two_class_softmax(&Tensor::<CpuBackend>::scalar(z)).item();
        assert!((first - via_identity).abs() < 1e-6);
    }
}
