// ============================================================
// Layer 5 — Runtime Layers
// ============================================================
// A built model is a list of Layer values. Layers change the
// rank of the data flowing through them (a Reshape turns
// [batch, features] into [batch, 1, features] before an LSTM),
// so activations travel as a LayerTensor that is either flat
// (rank 2) or a sequence (rank 3).
//
// The rank of every step is known when the model is built
// (see FeatureShape), so forward never has to guess.

use std::fmt;

use burn::{
    nn::{Dropout, LayerNorm, Linear},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::domain::params::{Activation, Regularizer};
use crate::ml::activation::add_penalty;
use crate::ml::recurrent::RecurrentLayer;
use crate::ml::transformer::TransformerBlock;

// ─── FeatureShape ─────────────────────────────────────────────────────────────
/// Per-sample shape of the data between two layers (batch excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureShape {
    Flat(usize),
    Seq { steps: usize, features: usize },
}

impl FeatureShape {
    /// Size of the last axis — what a Dense layer reads.
    pub fn width(&self) -> usize {
        match self {
            Self::Flat(w) => *w,
            Self::Seq { features, .. } => *features,
        }
    }

    /// Number of values per sample.
    pub fn total(&self) -> usize {
        match self {
            Self::Flat(w) => *w,
            Self::Seq { steps, features } => steps * features,
        }
    }

    /// Same rank, new last axis.
    pub fn with_width(&self, width: usize) -> Self {
        match self {
            Self::Flat(_) => Self::Flat(width),
            Self::Seq { steps, .. } => Self::Seq { steps: *steps, features: width },
        }
    }
}

impl fmt::Display for FeatureShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat(w) => write!(f, "(None, {w})"),
            Self::Seq { steps, features } => write!(f, "(None, {steps}, {features})"),
        }
    }
}

// ─── LayerTensor ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub enum LayerTensor<B: Backend> {
    Flat(Tensor<B, 2>),
    Seq(Tensor<B, 3>),
}

impl<B: Backend> LayerTensor<B> {
    pub fn dims(&self) -> Vec<usize> {
        match self {
            Self::Flat(t) => t.dims().to_vec(),
            Self::Seq(t)  => t.dims().to_vec(),
        }
    }

    /// Collapse to [batch, features].
    pub fn into_flat(self) -> Tensor<B, 2> {
        match self {
            Self::Flat(t) => t,
            Self::Seq(t) => {
                let [batch, steps, features] = t.dims();
                t.reshape([batch, steps * features])
            }
        }
    }

    /// View as [batch, steps, features]; a flat tensor becomes one step.
    pub fn into_seq(self) -> Tensor<B, 3> {
        match self {
            Self::Flat(t) => t.unsqueeze_dim::<3>(1),
            Self::Seq(t)  => t,
        }
    }

    fn batch(&self) -> usize {
        match self {
            Self::Flat(t) => t.dims()[0],
            Self::Seq(t)  => t.dims()[0],
        }
    }

    /// Reshape to `shape`, keeping the batch axis.
    pub fn reshape(self, shape: FeatureShape) -> Self {
        let batch = self.batch();
        let flat = self.into_flat();
        match shape {
            FeatureShape::Flat(w) => Self::Flat(flat.reshape([batch, w])),
            FeatureShape::Seq { steps, features } => Self::Seq(flat.reshape([batch, steps, features])),
        }
    }
}

// ─── Dense ────────────────────────────────────────────────────────────────────
#[derive(Debug)]
pub struct Dense<B: Backend> {
    pub linear:               Linear<B>,
    pub activation:           Option<Activation>,
    pub kernel_regularizer:   Option<Regularizer>,
    pub bias_regularizer:     Option<Regularizer>,
    pub activity_regularizer: Option<Regularizer>,
}

impl<B: Backend> Dense<B> {
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        let out = self.linear.forward(x);
        match self.activation {
            Some(activation) => activation.apply(out),
            None => out,
        }
    }

    /// Kernel and bias penalties.
    pub fn weight_penalty(&self) -> Option<Tensor<B, 1>> {
        let kernel = self
            .kernel_regularizer
            .map(|r| r.penalty(self.linear.weight.val()));
        let bias = match (&self.bias_regularizer, &self.linear.bias) {
            (Some(r), Some(bias)) => Some(r.penalty(bias.val())),
            _ => None,
        };
        add_penalty(kernel, bias)
    }

    fn activity_penalty<const D: usize>(&self, out: &Tensor<B, D>) -> Option<Tensor<B, 1>> {
        self.activity_regularizer.map(|r| r.penalty(out.clone()))
    }
}

// ─── Layer ────────────────────────────────────────────────────────────────────
#[derive(Debug)]
pub enum Layer<B: Backend> {
    Dense(Dense<B>),
    Dropout(Dropout),
    Activation(Activation),
    Flatten,
    Reshape(FeatureShape),
    LayerNorm(LayerNorm<B>),
    Recurrent(RecurrentLayer<B>),
    Transformer(TransformerBlock<B>),
}

impl<B: Backend> Layer<B> {
    /// Forward pass plus the activity penalty of this layer, if any.
    pub fn forward(&self, x: LayerTensor<B>) -> (LayerTensor<B>, Option<Tensor<B, 1>>) {
        use crate::ml::layers::LayerTensor::{Flat, Seq};

        match (self, x) {
            (Self::Dense(dense), Flat(t)) => {
                let out = dense.forward(t);
                let penalty = dense.activity_penalty(&out);
                (Flat(out), penalty)
            }
            (Self::Dense(dense), Seq(t)) => {
                let out = dense.forward(t);
                let penalty = dense.activity_penalty(&out);
                (Seq(out), penalty)
            }
            (Self::Dropout(dropout), Flat(t)) => (Flat(dropout.forward(t)), None),
            (Self::Dropout(dropout), Seq(t))  => (Seq(dropout.forward(t)), None),
            (Self::Activation(a), Flat(t))    => (Flat(a.apply(t)), None),
            (Self::Activation(a), Seq(t))     => (Seq(a.apply(t)), None),
            (Self::Flatten, x)                => (Flat(x.into_flat()), None),
            (Self::Reshape(shape), x)         => (x.reshape(*shape), None),
            (Self::LayerNorm(norm), Flat(t))  => (Flat(norm.forward(t)), None),
            (Self::LayerNorm(norm), Seq(t))   => (Seq(norm.forward(t)), None),
            (Self::Recurrent(rnn), x) => {
                let out = rnn.forward(x.into_seq());
                if rnn.return_sequences {
                    (Seq(out), None)
                } else {
                    (Flat(Seq(out).into_flat()), None)
                }
            }
            (Self::Transformer(block), Flat(t)) => {
                let [batch, width] = t.dims();
                let out = block.forward(t.unsqueeze_dim::<3>(1));
                (Flat(out.reshape([batch, width])), None)
            }
            (Self::Transformer(block), Seq(t)) => (Seq(block.forward(t)), None),
        }
    }

    pub fn weight_penalty(&self) -> Option<Tensor<B, 1>> {
        match self {
            Self::Dense(dense) => dense.weight_penalty(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::LinearConfig;

    type TestBackend = NdArray;

    #[test]
    fn test_feature_shape_helpers() {
        let seq = FeatureShape::Seq { steps: 2, features: 3 };
        assert_eq!(seq.width(), 3);
        assert_eq!(seq.total(), 6);
        assert_eq!(seq.with_width(5), FeatureShape::Seq { steps: 2, features: 5 });
        assert_eq!(seq.to_string(), "(None, 2, 3)");
        assert_eq!(FeatureShape::Flat(4).to_string(), "(None, 4)");
    }

    #[test]
    fn test_reshape_round_trip_keeps_values() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0, 3.0, 4.0]], &device);
        let seq = LayerTensor::Flat(x).reshape(FeatureShape::Seq { steps: 1, features: 4 });
        assert_eq!(seq.dims(), vec![1, 1, 4]);
        let flat = seq.into_flat();
        assert_eq!(flat.into_data().to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_dense_penalties() {
        let device = Default::default();
        let dense = Dense::<TestBackend> {
            linear: LinearConfig::new(2, 3)
                .with_initializer(burn::nn::Initializer::Ones)
                .init(&device),
            activation: None,
            kernel_regularizer: Some(Regularizer::L2(1.0)),
            bias_regularizer: Some(Regularizer::L2(1.0)),
            activity_regularizer: Some(Regularizer::L2(1.0)),
        };
        // kernel: 6 ones, bias: 3 ones
        let weights: f32 = dense.weight_penalty().unwrap().into_scalar().elem();
        assert!((weights - 9.0).abs() < 1e-5);

        let layer = Layer::Dense(dense);
        let (out, penalty) = layer.forward(LayerTensor::Flat(Tensor::zeros([1, 2], &device)));
        assert_eq!(out.dims(), vec![1, 3]);
        // zero input → output equals the bias (ones)
        let activity: f32 = penalty.unwrap().into_scalar().elem();
        assert!((activity - 3.0).abs() < 1e-5);
    }
}
