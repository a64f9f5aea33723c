// ============================================================
// Layer 5 — Layer Catalog
// ============================================================
// Maps the layer kind written in a model description to a burn
// constructor:
//
//   "Dense"              → nn::Linear (+ activation, regularizers)
//   "Dropout"            → nn::Dropout
//   "Activation"         → a bare activation
//   "Flatten"            → reshape to [batch, features]
//   "Reshape"            → reshape to target_shape
//   "LayerNormalization" → nn::LayerNorm
//   "LSTM" / "GRU"       → nn::Lstm / nn::Gru over a sequence
//   "LSTMCell"/"GRUCell" → update cells only (see recurrent.rs)
//   "transformerblock"   → ml::transformer::TransformerBlock
//
// Building happens in two steps, the way burn itself does it:
//
//   plan()  — check the arguments, infer the input width from the
//             previous layer and produce a tensor-free LayerPlan
//             holding burn Configs. Every error surfaces here.
//   init()  — allocate the parameters on a device. Cannot fail.
//
// The check command only runs plan(), so a description can be
// validated without touching a device.

use std::f64::consts::SQRT_2;

use burn::{
    nn::{DropoutConfig, Initializer, LayerNormConfig, LinearConfig},
    prelude::*,
};

use crate::domain::error::BuildError;
use crate::domain::layer_spec::LayerSpec;
use crate::domain::params::{Activation, Regularizer};
use crate::ml::layers::{Dense, FeatureShape, Layer};
use crate::ml::recurrent::{CellConfig, RecurrentLayer};
use crate::ml::transformer::TransformerBlockConfig;

const LAYER_NORM_EPSILON: f64 = 1e-3;

// ─── LayerKind ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Dense,
    Dropout,
    Activation,
    Flatten,
    Reshape,
    LayerNormalization,
    Lstm,
    Gru,
    LstmCell,
    GruCell,
    TransformerBlock,
}

impl LayerKind {
    pub fn from_name(name: &str) -> Result<Self, BuildError> {
        let kind = match name {
            "Dense"              => Self::Dense,
            "Dropout"            => Self::Dropout,
            "Activation"         => Self::Activation,
            "Flatten"            => Self::Flatten,
            "Reshape"            => Self::Reshape,
            "LayerNormalization" => Self::LayerNormalization,
            "LSTM"               => Self::Lstm,
            "GRU"                => Self::Gru,
            "LSTMCell"           => Self::LstmCell,
            "GRUCell"            => Self::GruCell,
            "transformerblock" | "TransformerBlock" => Self::TransformerBlock,
            other => return Err(BuildError::unknown_layer(other)),
        };
        Ok(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Dense              => "Dense",
            Self::Dropout            => "Dropout",
            Self::Activation         => "Activation",
            Self::Flatten            => "Flatten",
            Self::Reshape            => "Reshape",
            Self::LayerNormalization => "LayerNormalization",
            Self::Lstm               => "LSTM",
            Self::Gru                => "GRU",
            Self::LstmCell           => "LSTMCell",
            Self::GruCell            => "GRUCell",
            Self::TransformerBlock   => "transformerblock",
        }
    }

    /// Layer kinds that need a sequence input, and therefore get an
    /// implicit Reshape in front of them.
    pub fn is_recurrent(name: &str) -> bool {
        matches!(name, "LSTM" | "GRU")
    }

    fn mandatory(&self) -> &'static [&'static str] {
        match self {
            Self::Dense | Self::Lstm | Self::Gru | Self::LstmCell | Self::GruCell => &["units"],
            Self::Dropout            => &["rate"],
            Self::Activation         => &["activation"],
            Self::Reshape            => &["target_shape"],
            Self::TransformerBlock   => &["embed_dim", "num_heads", "ff_dim"],
            Self::Flatten | Self::LayerNormalization => &[],
        }
    }

    /// Everything else a kind accepts; `name` is always allowed.
    fn optional(&self) -> &'static [&'static str] {
        match self {
            Self::Dense => &[
                "activation",
                "use_bias",
                "kernel_initializer",
                "kernel_regularizer",
                "bias_regularizer",
                "activity_regularizer",
            ],
            Self::LayerNormalization       => &["epsilon"],
            Self::Lstm | Self::Gru         => &["use_bias", "return_sequences", "kernel_initializer"],
            Self::LstmCell | Self::GruCell => &["use_bias", "kernel_initializer"],
            Self::TransformerBlock         => &["rate"],
            Self::Dropout | Self::Activation | Self::Flatten | Self::Reshape => &[],
        }
    }

    /// Reject unknown keys and missing mandatory ones.
    pub fn check(&self, spec: &LayerSpec) -> Result<(), BuildError> {
        spec.check_keys(self.mandatory(), self.optional())
    }
}

// ─── Initializers ─────────────────────────────────────────────────────────────
/// Resolve `kernel_initializer` to a burn Initializer.
pub fn kernel_initializer(spec: &LayerSpec) -> Result<Option<Initializer>, BuildError> {
    let Some(name) = spec.str("kernel_initializer")? else {
        return Ok(None);
    };
    let init = match name {
        "glorot_uniform" => Initializer::XavierUniform { gain: 1.0 },
        "glorot_normal"  => Initializer::XavierNormal { gain: 1.0 },
        "he_uniform"     => Initializer::KaimingUniform { gain: SQRT_2, fan_out_only: false },
        "he_normal"      => Initializer::KaimingNormal { gain: SQRT_2, fan_out_only: false },
        "zeros"          => Initializer::Zeros,
        "ones"           => Initializer::Ones,
        "random_uniform" => Initializer::Uniform { min: -0.05, max: 0.05 },
        "random_normal"  => Initializer::Normal { mean: 0.0, std: 0.05 },
        _ => return Err(spec.arguments_error()),
    };
    Ok(Some(init))
}

// ─── LayerPlan ────────────────────────────────────────────────────────────────
#[derive(Clone)]
pub struct DensePlan {
    pub linear:               LinearConfig,
    pub activation:           Option<Activation>,
    pub kernel_regularizer:   Option<Regularizer>,
    pub bias_regularizer:     Option<Regularizer>,
    pub activity_regularizer: Option<Regularizer>,
}

/// A checked, tensor-free layer.
#[derive(Clone)]
pub enum LayerPlan {
    Dense(DensePlan),
    Dropout(DropoutConfig),
    Activation(Activation),
    Flatten,
    Reshape(FeatureShape),
    LayerNorm(LayerNormConfig),
    Recurrent { cell: CellConfig, return_sequences: bool },
    Transformer(TransformerBlockConfig),
}

impl LayerPlan {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Layer<B> {
        match self {
            Self::Dense(plan) => Layer::Dense(Dense {
                linear:               plan.linear.init(device),
                activation:           plan.activation,
                kernel_regularizer:   plan.kernel_regularizer,
                bias_regularizer:     plan.bias_regularizer,
                activity_regularizer: plan.activity_regularizer,
            }),
            Self::Dropout(config)   => Layer::Dropout(config.init()),
            Self::Activation(a)     => Layer::Activation(*a),
            Self::Flatten           => Layer::Flatten,
            Self::Reshape(shape)    => Layer::Reshape(*shape),
            Self::LayerNorm(config) => Layer::LayerNorm(config.init(device)),
            Self::Recurrent { cell, return_sequences } => Layer::Recurrent(RecurrentLayer {
                module:           cell.init(device),
                return_sequences: *return_sequences,
            }),
            Self::Transformer(config) => Layer::Transformer(config.init(device)),
        }
    }
}

/// Check `spec` against its kind and the incoming shape, returning
/// the plan and the shape it produces.
pub fn plan(spec: &LayerSpec, input: FeatureShape) -> Result<(LayerPlan, FeatureShape), BuildError> {
    let kind = LayerKind::from_name(&spec.kind)?;
    kind.check(spec)?;

    match kind {
        LayerKind::Dense => {
            let units = positive(spec, "units")?;
            let mut linear = LinearConfig::new(input.width(), units)
                .with_bias(spec.bool("use_bias")?.unwrap_or(true));
            if let Some(init) = kernel_initializer(spec)? {
                linear = linear.with_initializer(init);
            }
            let plan = DensePlan {
                linear,
                activation:           spec.activation("activation")?,
                kernel_regularizer:   spec.regularizer("kernel_regularizer")?,
                bias_regularizer:     spec.regularizer("bias_regularizer")?,
                activity_regularizer: spec.regularizer("activity_regularizer")?,
            };
            Ok((LayerPlan::Dense(plan), input.with_width(units)))
        }

        LayerKind::Dropout => {
            let rate = spec.require_f64("rate")?;
            if !(0.0..1.0).contains(&rate) {
                return Err(spec.arguments_error());
            }
            Ok((LayerPlan::Dropout(DropoutConfig::new(rate)), input))
        }

        LayerKind::Activation => {
            let activation = spec
                .activation("activation")?
                .ok_or_else(|| spec.arguments_error())?;
            Ok((LayerPlan::Activation(activation), input))
        }

        LayerKind::Flatten => Ok((LayerPlan::Flatten, FeatureShape::Flat(input.total()))),

        LayerKind::Reshape => {
            let target = spec.shape("target_shape")?.ok_or_else(|| spec.arguments_error())?;
            let output = reshape_target(&target, input.total()).ok_or_else(|| {
                BuildError::shape(
                    format!("{target:?}"),
                    format!("Cannot reshape {input} into this target shape."),
                )
            })?;
            Ok((LayerPlan::Reshape(output), output))
        }

        LayerKind::LayerNormalization => {
            let epsilon = spec.f64("epsilon")?.unwrap_or(LAYER_NORM_EPSILON);
            let config = LayerNormConfig::new(input.width()).with_epsilon(epsilon);
            Ok((LayerPlan::LayerNorm(config), input))
        }

        LayerKind::Lstm | LayerKind::Gru => {
            let FeatureShape::Seq { steps, features } = input else {
                return Err(BuildError::shape(
                    input.to_string(),
                    format!("{} expects a sequence input; add a Reshape in front of it.", spec.kind),
                ));
            };
            let units = positive(spec, "units")?;
            let cell = CellConfig::new(
                kind == LayerKind::Lstm,
                features,
                units,
                spec.bool("use_bias")?.unwrap_or(true),
                kernel_initializer(spec)?,
            );
            let return_sequences = spec.bool("return_sequences")?.unwrap_or(false);
            let output = if return_sequences {
                FeatureShape::Seq { steps, features: units }
            } else {
                FeatureShape::Flat(units)
            };
            Ok((LayerPlan::Recurrent { cell, return_sequences }, output))
        }

        LayerKind::LstmCell | LayerKind::GruCell => Err(BuildError::new(
            &spec.kind,
            "layer",
            "Recurrent cells can only be used as update functions.",
        )),

        LayerKind::TransformerBlock => {
            let embed_dim = positive(spec, "embed_dim")?;
            let num_heads = positive(spec, "num_heads")?;
            let ff_dim    = positive(spec, "ff_dim")?;
            if embed_dim % num_heads != 0 {
                return Err(spec.arguments_error());
            }
            if embed_dim != input.width() {
                return Err(BuildError::shape(
                    input.to_string(),
                    format!("transformerblock embed_dim {embed_dim} must match the input width."),
                ));
            }
            let mut config = TransformerBlockConfig::new(embed_dim, num_heads, ff_dim);
            if let Some(rate) = spec.f64("rate")? {
                if !(0.0..1.0).contains(&rate) {
                    return Err(spec.arguments_error());
                }
                config = config.with_rate(rate);
            }
            Ok((LayerPlan::Transformer(config), input))
        }
    }
}

fn positive(spec: &LayerSpec, key: &str) -> Result<usize, BuildError> {
    match spec.require_usize(key)? {
        0 => Err(spec.arguments_error()),
        n => Ok(n),
    }
}

/// Resolve a target shape of one or two axes, at most one of them -1,
/// against `total` values per sample.
fn reshape_target(target: &[i64], total: usize) -> Option<FeatureShape> {
    if target.is_empty() || target.len() > 2 {
        return None;
    }
    if target.iter().filter(|&&d| d == -1).count() > 1 {
        return None;
    }
    if target.iter().any(|&d| d == 0 || d < -1) {
        return None;
    }

    let known: usize = target.iter().filter(|&&d| d > 0).map(|&d| d as usize).product();
    let dims: Vec<usize> = target
        .iter()
        .map(|&d| if d == -1 { total / known.max(1) } else { d as usize })
        .collect();
    if dims.iter().product::<usize>() != total || dims.contains(&0) {
        return None;
    }

    match dims.as_slice() {
        [w] => Some(FeatureShape::Flat(*w)),
        [steps, features] => Some(FeatureShape::Seq { steps: *steps, features: *features }),
        _ => None,
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn spec(kind: &str, params: Value) -> LayerSpec {
        LayerSpec::new(kind, params.as_object().unwrap()).unwrap()
    }

    fn planned(kind: &str, params: Value, input: FeatureShape) -> Result<FeatureShape, BuildError> {
        plan(&spec(kind, params), input).map(|(_, shape)| shape)
    }

    #[test]
    fn test_unknown_kind() {
        let err = planned("Conv9D", json!({}), FeatureShape::Flat(4)).unwrap_err();
        assert_eq!(err.variable, "layer");
        assert_eq!(err.parameter, "Conv9D");
    }

    #[test]
    fn test_recurrent_kinds() {
        assert!(LayerKind::is_recurrent("LSTM"));
        assert!(LayerKind::is_recurrent("GRU"));
        assert!(!LayerKind::is_recurrent("GRUCell"));
        assert!(!LayerKind::is_recurrent("Dense"));
    }

    #[test]
    fn test_dense_keeps_rank() {
        let shape = planned("Dense", json!({"units": "8"}), FeatureShape::Flat(4)).unwrap();
        assert_eq!(shape, FeatureShape::Flat(8));
        let shape = planned("Dense", json!({"units": 8}), FeatureShape::Seq { steps: 2, features: 4 }).unwrap();
        assert_eq!(shape, FeatureShape::Seq { steps: 2, features: 8 });
    }

    #[test]
    fn test_dense_argument_errors() {
        let err = planned("Dense", json!({}), FeatureShape::Flat(4)).unwrap_err();
        assert_eq!(err.variable, "Dense");
        let err = planned("Dense", json!({"units": 0}), FeatureShape::Flat(4)).unwrap_err();
        assert_eq!(err.variable, "Dense");
        let err = planned("Dense", json!({"units": 2, "kernel_initializer": "magic"}), FeatureShape::Flat(4))
            .unwrap_err();
        assert_eq!(err.variable, "Dense");
    }

    #[test]
    fn test_dropout_rate_range() {
        assert!(planned("Dropout", json!({"rate": "0.3"}), FeatureShape::Flat(4)).is_ok());
        assert!(planned("Dropout", json!({"rate": 1.0}), FeatureShape::Flat(4)).is_err());
    }

    #[test]
    fn test_reshape_targets() {
        assert_eq!(reshape_target(&[1, -1], 6), Some(FeatureShape::Seq { steps: 1, features: 6 }));
        assert_eq!(reshape_target(&[-1], 6), Some(FeatureShape::Flat(6)));
        assert_eq!(reshape_target(&[3, 2], 6), Some(FeatureShape::Seq { steps: 3, features: 2 }));
        assert_eq!(reshape_target(&[4, -1], 6), None);
        assert_eq!(reshape_target(&[-1, -1], 6), None);
        assert_eq!(reshape_target(&[1, 2, 3], 6), None);
    }

    #[test]
    fn test_reshape_error_is_a_shape_error() {
        let err = planned("Reshape", json!({"target_shape": [5, -1]}), FeatureShape::Flat(4)).unwrap_err();
        assert_eq!(err.variable, "shape");
    }

    #[test]
    fn test_recurrent_needs_sequence() {
        let err = planned("GRU", json!({"units": 4}), FeatureShape::Flat(4)).unwrap_err();
        assert_eq!(err.variable, "shape");

        let seq = FeatureShape::Seq { steps: 1, features: 3 };
        assert_eq!(planned("LSTM", json!({"units": 4}), seq).unwrap(), FeatureShape::Flat(4));
        assert_eq!(
            planned("GRU", json!({"units": 4, "return_sequences": "True"}), seq).unwrap(),
            FeatureShape::Seq { steps: 1, features: 4 }
        );
    }

    #[test]
    fn test_cells_are_update_only() {
        let err = planned("GRUCell", json!({"units": 4}), FeatureShape::Flat(4)).unwrap_err();
        assert_eq!(err.variable, "layer");
    }

    #[test]
    fn test_transformer_checks() {
        let ok = json!({"embed_dim": "8", "num_heads": "2", "ff_dim": "16"});
        assert_eq!(planned("transformerblock", ok.clone(), FeatureShape::Flat(8)).unwrap(), FeatureShape::Flat(8));
        assert_eq!(planned("transformerblock", ok, FeatureShape::Flat(6)).unwrap_err().variable, "shape");

        let bad_heads = json!({"embed_dim": 8, "num_heads": 3, "ff_dim": 16});
        let err = planned("transformerblock", bad_heads, FeatureShape::Flat(8)).unwrap_err();
        assert_eq!(err.variable, "transformerblock");
    }

    #[test]
    fn test_layer_norm_default_epsilon() {
        let (plan, _) = plan(&spec("LayerNormalization", json!({})), FeatureShape::Flat(4)).unwrap();
        match plan {
            LayerPlan::LayerNorm(config) => assert_eq!(config.epsilon, LAYER_NORM_EPSILON),
            _ => panic!("expected a LayerNorm plan"),
        }
    }
}
