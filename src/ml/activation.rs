// ============================================================
// Layer 5 — Activations and Regularizers on burn tensors
// ============================================================
// The domain layer only names an activation or a regularizer.
// This file gives those names their tensor meaning using
// burn::tensor::activation where burn has the function, and
// elementwise tensor ops where it does not (relu6, softsign,
// elu, selu).
//
// Reference: Burn Book §3 (Building Blocks)

use burn::{prelude::*, tensor::activation};

use crate::domain::params::{Activation, Regularizer};

const LEAKY_RELU_SLOPE: f64 = 0.2;
const SELU_ALPHA: f64 = 1.673_263_242_354_377_2;
const SELU_SCALE: f64 = 1.050_700_987_355_480_5;

impl Activation {
    /// Apply the activation elementwise; softmax variants reduce
    /// over the last (feature) dimension.
    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Self::Relu       => activation::relu(x),
            Self::Relu6      => x.clamp(0.0, 6.0),
            Self::Sigmoid    => activation::sigmoid(x),
            Self::Tanh       => activation::tanh(x),
            Self::Gelu       => activation::gelu(x),
            Self::Silu       => activation::silu(x),
            Self::Softmax    => activation::softmax(x, D - 1),
            Self::LogSoftmax => activation::log_softmax(x, D - 1),
            Self::LeakyRelu  => activation::leaky_relu(x, LEAKY_RELU_SLOPE),
            Self::Softplus   => activation::softplus(x, 1.0),
            Self::Softsign   => x.clone().div(x.abs().add_scalar(1.0)),
            Self::Elu        => elu(x, 1.0),
            Self::Selu       => elu(x, SELU_ALPHA).mul_scalar(SELU_SCALE),
            Self::Linear     => x,
        }
    }
}

/// max(0, x) + alpha * (exp(min(0, x)) - 1)
fn elu<B: Backend, const D: usize>(x: Tensor<B, D>, alpha: f64) -> Tensor<B, D> {
    let negative = x.clone().clamp_max(0.0).exp().sub_scalar(1.0).mul_scalar(alpha);
    x.clamp_min(0.0) + negative
}

impl Regularizer {
    /// Scalar penalty contributed by `x`, shape [1].
    pub fn penalty<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, 1> {
        match self {
            Self::L2(strength) => x.powf_scalar(2.0).sum().mul_scalar(*strength),
        }
    }
}

/// Sum two optional penalties.
pub fn add_penalty<B: Backend>(acc: Option<Tensor<B, 1>>, extra: Option<Tensor<B, 1>>) -> Option<Tensor<B, 1>> {
    match (acc, extra) {
        (Some(a), Some(b)) => Some(a + b),
        (a, None) => a,
        (None, b) => b,
    }
}
