//! CLI demo for the nb_nn losses and activations.
//!
//! Evaluates each loss and activation on small fixed inputs, compares the
//! graph gradients with the hand-written backward passes and with finite
//! differences, and checks that Sigmoid equals a two-class Softmax.

use nb_backend_cpu::{constant, finite_diff_grad, max_grad_error, var, CpuExpr};
use nb_nn::{
    binary_cross_entropy, cross_entropy_loss, l1_loss, mse_loss, relu, relu_backward, sigmoid,
    sigmoid_backward, softmax, tanh, tanh_backward, two_class_softmax,
};
use nb_tensor::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TOLERANCE: f32 = 1e-4;
const FD_TOLERANCE: f32 = 1e-2;

fn main() -> Result<(), TensorError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut failures = 0;

    println!("=== Losses ===\n");

    println!("1. Regression losses");
    let pred = var("pred", vec![1.0, 2.0, 3.0, 4.0], Shape::new(vec![4]));
    let target = constant(vec![1.5, 2.5, 3.0, 4.5], Shape::new(vec![4]));
    let l1 = l1_loss(&pred, &target);
    let l2 = mse_loss(&pred, &target);
    let dl1 = l1.backward();
    println!("   pred   = {:?}", pred.as_slice());
    println!("   target = {:?}", target.as_slice());
    println!("   L1  = {:.6} (expected: 0.375)", l1.item());
    println!("   MSE = {:.6} (expected: 0.1875)", l2.item());
    println!("   dL1/dpred = {:?}\n", grad_of(&dl1, &pred));
    failures += report("l1", &[l1.item()], &[0.375]);
    failures += report("mse", &[l2.item()], &[0.1875]);

    println!("2. Binary cross-entropy");
    let probs = var("probs", vec![0.9, 0.2, 0.7], Shape::new(vec![3]));
    let labels = constant(vec![1.0, 0.0, 1.0], Shape::new(vec![3]));
    let bce = binary_cross_entropy(&probs, &labels);
    let expected = -(0.9f32.ln() + 0.8f32.ln() + 0.7f32.ln()) / 3.0;
    println!("   BCE = {:.6} (expected: {:.6})", bce.item(), expected);
    failures += report("bce", &[bce.item()], &[expected]);

    let saturated = binary_cross_entropy(
        &constant(vec![0.0, 1.0], Shape::new(vec![2])),
        &constant(vec![1.0, 0.0], Shape::new(vec![2])),
    );
    println!(
        "   BCE at saturated probabilities = {:.6} (finite: {})\n",
        saturated.item(),
        saturated.item().is_finite()
    );

    println!("3. Categorical cross-entropy");
    let logits = var("logits", vec![2.0, 1.0, 0.1, 0.5, 1.5, 1.0], Shape::new(vec![2, 3]));
    let ce = cross_entropy_loss(&logits, &[0, 2])?;
    let grads = ce.backward();
    println!("   logits = {:?} with targets [0, 2]", logits.as_slice());
    println!("   CE = {:.6}", ce.item());
    println!("   dCE/dlogits = {:?}\n", grad_of(&grads, &logits));

    let f = |t: &[CpuExpr]| cross_entropy_loss(&t[0], &[0, 2]).expect("valid targets");
    let fd = finite_diff_grad(f, &[logits.clone()], 1e-3);
    failures += report_fd("cross_entropy", &grad_of(&grads, &logits), &fd[0]);

    println!("\n=== Activations ===\n");

    println!("4. Softmax of [1, 2, 3]");
    let row = constant(vec![1.0, 2.0, 3.0], Shape::new(vec![1, 3]));
    let probs = softmax(&row);
    println!("   softmax = {:?}", probs.as_slice());
    println!("   expected  [0.0900, 0.2447, 0.6652]\n");
    failures += report("softmax", probs.as_slice(), &[0.09003057, 0.24472847, 0.66524096]);

    println!("5. Manual backward vs autodiff");
    let x = var("x", vec![-2.0, -0.5, 0.0, 0.5, 2.0], Shape::new(vec![5]));
    let ones = CpuExpr::ones(x.shape());

    let y = sigmoid(&x);
    let manual = sigmoid_backward(&y, &ones);
    let auto = y.sum(None, false).backward();
    println!("   sigmoid: manual   = {:?}", manual.as_slice());
    println!("            autodiff = {:?}", grad_of(&auto, &x));
    failures += report("sigmoid_backward", manual.as_slice(), &grad_of(&auto, &x));

    let y = tanh(&x);
    let manual = tanh_backward(&y, &ones);
    let auto = y.sum(None, false).backward();
    println!("   tanh:    manual   = {:?}", manual.as_slice());
    println!("            autodiff = {:?}", grad_of(&auto, &x));
    failures += report("tanh_backward", manual.as_slice(), &grad_of(&auto, &x));

    let y = relu(&x);
    println!("   relu:    forward  = {:?}", y.as_slice());
    println!(
        "            relu_backward(grad >= 1 mask) = {:?}\n",
        relu_backward(&constant(vec![0.0, 0.5, 1.0, 2.0], Shape::new(vec![4]))).as_slice()
    );

    println!("6. Sigmoid as two-class Softmax");
    let z = constant(vec![-3.0, -1.0, 0.0, 1.0, 3.0], Shape::new(vec![5]));
    let direct = sigmoid(&z);
    let via_softmax = two_class_softmax(&z);
    println!("   sigmoid(z)              = {:?}", direct.as_slice());
    println!("   softmax([z, 0])[0]      = {:?}", via_softmax.as_slice());
    failures += report("two_class_softmax", via_softmax.as_slice(), direct.as_slice());

    if failures == 0 {
        println!("\nPASS: all checks within tolerance");
        Ok(())
    } else {
        println!("\nFAIL: {} check(s) out of tolerance", failures);
        std::process::exit(1);
    }
}

fn grad_of(grads: &Gradients<nb_backend_cpu::CpuBackend>, x: &CpuExpr) -> Vec<f32> {
    match grads.wrt(x) {
        Some(g) => g.as_slice().to_vec(),
        None => vec![0.0; x.numel()],
    }
}

fn report(name: &str, actual: &[f32], expected: &[f32]) -> usize {
    let err = max_grad_error(actual, expected);
    if err < TOLERANCE {
        info!(check = name, err, "ok");
        0
    } else {
        warn!(check = name, err, "out of tolerance");
        1
    }
}

fn report_fd(name: &str, autodiff: &[f32], fd: &[f32]) -> usize {
    let err = max_grad_error(autodiff, fd);
    println!("   |autodiff - fd| = {:.2e}", err);
    if err < FD_TOLERANCE {
        info!(check = name, err, "finite differences agree");
        0
    } else {
        warn!(check = name, err, "finite differences disagree");
        1
    }
}
