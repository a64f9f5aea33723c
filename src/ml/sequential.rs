// ============================================================
// Layer 5 — Feed-Forward Models
// ============================================================
// Turns the "architecture" list of a feed_forward network into
// a Sequential model.
//
// Two rules are applied while reading the list:
//
//   - every LSTM / GRU entry gets an implicit
//     Reshape(target_shape = [1, -1]) in front of it, so a
//     [batch, features] input becomes a one-step sequence
//
//   - layers without a name are called
//     layer_<counter>_<type>_<role>
//
// And one while building:
//
//   - when the caller passes a destination dimension (readout
//     and update models), the LAST layer is built with
//     units = dst_dim, whatever the description says
//
// Reference: Burn Book §3 (Building Blocks)

use burn::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::BuildError;
use crate::domain::layer_spec::{LayerSpec, ModelRole, TYPE_KEY};
use crate::domain::params::ParamValue;
use crate::domain::traits::LayerDefinition;
use crate::ml::activation::add_penalty;
use crate::ml::catalog::{self, LayerKind, LayerPlan};
use crate::ml::layers::{FeatureShape, Layer, LayerTensor};

// ─── FeedForwardLayer ─────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct FeedForwardLayer {
    spec: LayerSpec,
}

impl LayerDefinition for FeedForwardLayer {
    fn spec(&self) -> &LayerSpec {
        &self.spec
    }
}

impl FeedForwardLayer {
    pub fn new(kind: &str, raw: &Map<String, Value>) -> Result<Self, BuildError> {
        Ok(Self { spec: LayerSpec::new(kind, raw)? })
    }

    /// The Reshape that precedes every recurrent layer.
    fn implicit_reshape() -> Self {
        let mut spec = LayerSpec::from_params("Reshape", Default::default());
        spec.set(
            "target_shape",
            ParamValue::List(vec![ParamValue::Int(1), ParamValue::Int(-1)]),
        );
        Self { spec }
    }

    pub fn plan(&self, input: FeatureShape) -> Result<(LayerPlan, FeatureShape), BuildError> {
        catalog::plan(&self.spec, input)
    }

    /// Plan this layer as the last of a model, with `dst_units` units.
    pub fn plan_last(&self, dst_units: usize, input: FeatureShape) -> Result<(LayerPlan, FeatureShape), BuildError> {
        let units = i64::try_from(dst_units).map_err(|_| self.spec.arguments_error())?;
        let mut spec = self.spec.clone();
        spec.set("units", ParamValue::Int(units));
        catalog::plan(&spec, input)
    }
}

// ─── FeedForwardModel ─────────────────────────────────────────────────────────
/// The checked layer list of one feed_forward network.
#[derive(Debug, Clone)]
pub struct FeedForwardModel {
    layers: Vec<FeedForwardLayer>,
    role:   ModelRole,
}

impl FeedForwardModel {
    pub fn new(architecture: &[Map<String, Value>], role: ModelRole) -> Result<Self, BuildError> {
        let mut layers = Vec::with_capacity(architecture.len());

        for (counter, entry) in architecture.iter().enumerate() {
            let type_layer = entry
                .get(TYPE_KEY)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    BuildError::new(
                        Value::Object(entry.clone()).to_string(),
                        TYPE_KEY,
                        "Every layer of an architecture needs a type_layer.",
                    )
                })?;

            if LayerKind::is_recurrent(type_layer) {
                layers.push(FeedForwardLayer::implicit_reshape());
            }

            let mut entry = entry.clone();
            if !entry.contains_key("name") {
                entry.insert(
                    "name".to_string(),
                    Value::from(format!("layer_{counter}_{type_layer}_{role}")),
                );
            }

            layers.push(FeedForwardLayer::new(type_layer, &entry)?);
        }

        Ok(Self { layers, role })
    }

    pub fn layers(&self) -> &[FeedForwardLayer] {
        &self.layers
    }

    /// Plan every layer against `input_dim`, overriding the last
    /// layer's units with `dst_dim` when given.
    pub fn plan(
        &self,
        input_dim: usize,
        dst_dim:   Option<usize>,
    ) -> Result<Vec<(String, String, LayerPlan, FeatureShape)>, BuildError> {
        if input_dim == 0 {
            return Err(BuildError::shape("0", "The model input width must be positive."));
        }

        let mut shape = FeatureShape::Flat(input_dim);
        let mut plans = Vec::with_capacity(self.layers.len());
        let last = self.layers.len().saturating_sub(1);

        for (index, layer) in self.layers.iter().enumerate() {
            let (plan, output) = match dst_dim {
                Some(units) if index == last => layer.plan_last(units, shape)?,
                _ => layer.plan(shape)?,
            };
            let name = layer
                .spec()
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}_{index}", layer.kind().to_lowercase()));
            plans.push((name, layer.kind().to_string(), plan, output));
            shape = output;
        }
        Ok(plans)
    }

    /// Build the model on `device`. Returns it with its output width
    /// (the size of the last axis).
    pub fn construct_model<B: Backend>(
        &self,
        input_dim: usize,
        dst_dim:   Option<usize>,
        device:    &B::Device,
    ) -> Result<(Sequential<B>, usize), BuildError> {
        let layers: Vec<NamedLayer<B>> = self
            .plan(input_dim, dst_dim)?
            .into_iter()
            .map(|(name, kind, plan, output)| NamedLayer {
                name,
                kind,
                output,
                layer: plan.init(device),
            })
            .collect();

        let model = Sequential { input: FeatureShape::Flat(input_dim), layers };
        let output_dim = model.output_shape().width();
        tracing::debug!(
            "Constructed {} model: {} layers, {} → {}",
            self.role,
            model.layers.len(),
            input_dim,
            output_dim
        );
        Ok((model, output_dim))
    }
}

// ─── Sequential ───────────────────────────────────────────────────────────────
#[derive(Debug)]
pub struct NamedLayer<B: Backend> {
    pub name:   String,
    pub kind:   String,
    pub output: FeatureShape,
    pub layer:  Layer<B>,
}

/// One line of a model summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSummary {
    pub name:         String,
    pub kind:         String,
    pub output_shape: FeatureShape,
}

#[derive(Debug)]
pub struct Sequential<B: Backend> {
    pub input:  FeatureShape,
    pub layers: Vec<NamedLayer<B>>,
}

impl<B: Backend> Sequential<B> {
    pub fn output_shape(&self) -> FeatureShape {
        self.layers.last().map(|l| l.output).unwrap_or(self.input)
    }

    /// x: [batch, input_dim]
    pub fn forward(&self, x: Tensor<B, 2>) -> LayerTensor<B> {
        self.forward_with_penalty(x).0
    }

    /// Forward pass plus the summed activity penalties.
    pub fn forward_with_penalty(&self, x: Tensor<B, 2>) -> (LayerTensor<B>, Option<Tensor<B, 1>>) {
        let mut x = LayerTensor::Flat(x);
        let mut penalty = None;
        for named in &self.layers {
            let (out, extra) = named.layer.forward(x);
            penalty = add_penalty(penalty, extra);
            x = out;
        }
        (x, penalty)
    }

    /// Summed kernel and bias penalties.
    pub fn weight_penalty(&self) -> Option<Tensor<B, 1>> {
        self.layers
            .iter()
            .fold(None, |acc, named| add_penalty(acc, named.layer.weight_penalty()))
    }

    pub fn summary(&self) -> Vec<LayerSummary> {
        self.layers
            .iter()
            .map(|l| LayerSummary {
                name:         l.name.clone(),
                kind:         l.kind.clone(),
                output_shape: l.output,
            })
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use serde_json::json;

    type TestBackend = NdArray;

    fn architecture(value: Value) -> Vec<Map<String, Value>> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_recurrent_layers_get_exactly_one_reshape() {
        let arch = architecture(json!([
            {"type_layer": "Dense", "units": "8"},
            {"type_layer": "GRU", "units": "4"},
            {"type_layer": "Dense", "units": "2"},
        ]));
        let model = FeedForwardModel::new(&arch, ModelRole::Message).unwrap();
        let kinds: Vec<&str> = model.layers().iter().map(|l| l.kind()).collect();
        assert_eq!(kinds, vec!["Dense", "Reshape", "GRU", "Dense"]);
    }

    #[test]
    fn test_generated_names_skip_reshape_in_counter() {
        let arch = architecture(json!([
            {"type_layer": "LSTM", "units": "4"},
            {"type_layer": "Dense", "units": "2", "name": "head"},
            {"type_layer": "Dense", "units": "2"},
        ]));
        let model = FeedForwardModel::new(&arch, ModelRole::Readout).unwrap();
        let names: Vec<Option<&str>> = model.layers().iter().map(|l| l.spec().name()).collect();
        assert_eq!(
            names,
            vec![None, Some("layer_0_LSTM_readout"), Some("head"), Some("layer_2_Dense_readout")]
        );
    }

    #[test]
    fn test_missing_type_layer() {
        let arch = architecture(json!([{"units": "8"}]));
        let err = FeedForwardModel::new(&arch, ModelRole::Message).unwrap_err();
        assert_eq!(err.variable, "type_layer");
    }

    #[test]
    fn test_destination_dimension_overrides_last_units() {
        let device = Default::default();
        let arch = architecture(json!([
            {"type_layer": "Dense", "units": "16", "activation": "relu"},
            {"type_layer": "Dense", "units": "3"},
        ]));
        let model = FeedForwardModel::new(&arch, ModelRole::Readout).unwrap();

        let (seq, out_dim) = model.construct_model::<TestBackend>(5, Some(7), &device).unwrap();
        assert_eq!(out_dim, 7);
        let out = seq.forward(Tensor::ones([2, 5], &device));
        assert_eq!(out.dims(), vec![2, 7]);

        let (_, out_dim) = model.construct_model::<TestBackend>(5, None, &device).unwrap();
        assert_eq!(out_dim, 3);
    }

    #[test]
    fn test_recurrent_last_layer_takes_destination_units() {
        let device = Default::default();
        let arch = architecture(json!([
            {"type_layer": "Dense", "units": "6"},
            {"type_layer": "LSTM", "units": "2"},
        ]));
        let model = FeedForwardModel::new(&arch, ModelRole::Update).unwrap();
        let (seq, out_dim) = model.construct_model::<TestBackend>(4, Some(9), &device).unwrap();
        assert_eq!(out_dim, 9);
        assert_eq!(seq.forward(Tensor::ones([3, 4], &device)).dims(), vec![3, 9]);

        let summary = seq.summary();
        assert_eq!(summary[1].kind, "Reshape");
        assert_eq!(summary[1].output_shape, FeatureShape::Seq { steps: 1, features: 6 });
    }

    #[test]
    fn test_override_rejected_for_layers_without_units() {
        let device = Default::default();
        let arch = architecture(json!([
            {"type_layer": "Dense", "units": "4"},
            {"type_layer": "Dropout", "rate": "0.5"},
        ]));
        let model = FeedForwardModel::new(&arch, ModelRole::Readout).unwrap();
        let err = model.construct_model::<TestBackend>(4, Some(2), &device).unwrap_err();
        assert_eq!(err.variable, "Dropout");
    }

    #[test]
    fn test_destination_units_beyond_i64_are_rejected() {
        let arch = architecture(json!([{"type_layer": "Dense", "units": "4"}]));
        let model = FeedForwardModel::new(&arch, ModelRole::Readout).unwrap();
        let err = model.layers()[0]
            .plan_last(usize::MAX, FeatureShape::Flat(4))
            .err()
            .unwrap();
        assert_eq!(err.variable, "Dense");
    }

    #[test]
    fn test_penalties_are_collected() {
        let device = Default::default();
        let arch = architecture(json!([
            {"type_layer": "Dense", "units": "3", "kernel_regularizer": "0.1", "activity_regularizer": "0.1"},
            {"type_layer": "Dense", "units": "2"},
        ]));
        let model = FeedForwardModel::new(&arch, ModelRole::Message).unwrap();
        let (seq, _) = model.construct_model::<TestBackend>(4, None, &device).unwrap();
        assert!(seq.weight_penalty().is_some());
        let (_, activity) = seq.forward_with_penalty(Tensor::ones([1, 4], &device));
        assert!(activity.is_some());
    }

    #[test]
    fn test_transformer_in_stack() {
        let device = Default::default();
        let arch = architecture(json!([
            {"type_layer": "transformerblock", "embed_dim": "4", "num_heads": "2", "ff_dim": "8"},
            {"type_layer": "Flatten"},
            {"type_layer": "Dense", "units": "1"},
        ]));
        let model = FeedForwardModel::new(&arch, ModelRole::Readout).unwrap();
        let (seq, out_dim) = model.construct_model::<TestBackend>(4, None, &device).unwrap();
        assert_eq!(out_dim, 1);
        assert_eq!(seq.forward(Tensor::zeros([2, 4], &device)).dims(), vec![2, 1]);
    }
}
