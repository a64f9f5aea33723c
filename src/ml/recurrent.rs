// ============================================================
// Layer 5 — Recurrent Layers and the Update Cell
// ============================================================
// Two ways a recurrent kind shows up in a model description:
//
//   1. Inside a feed-forward architecture ("LSTM", "GRU").
//      The layer runs over a sequence and returns either the
//      whole sequence or its last step.
//
//   2. As the update function of a graph entity
//      ({"nn_type": "recurrent_nn", "recurrent_type": "GRU"}).
//      Here the old hidden state of each destination node is
//      passed in explicitly and the cell width is forced to the
//      destination dimension.
//
// Update strategies:
//
//   unsorted — all messages of a destination were already
//              aggregated into one vector: a single RNN step
//
//   sorted   — messages arrive as a padded sequence per
//              destination plus its real length. Destination i
//              consumes its first final_len[i] messages in order;
//              a destination with no messages gets a zero output.
//
// Reference: Burn Book §3 (Building Blocks)
//            Cho et al. (2014) GRU, Hochreiter & Schmidhuber (1997) LSTM

use burn::{
    nn::{gru::{Gru, GruConfig}, Initializer, Lstm, LstmConfig, LstmState},
    prelude::*,
    tensor::TensorData,
};
use serde_json::{Map, Value};

use crate::domain::error::BuildError;
use crate::domain::layer_spec::LayerSpec;
use crate::domain::params::ParamValue;
use crate::domain::traits::LayerDefinition;
use crate::ml::catalog::{kernel_initializer, LayerKind};

// ─── CellConfig ───────────────────────────────────────────────────────────────
/// Tensor-free description of an LSTM or GRU, ready to `init`.
#[derive(Clone)]
pub enum CellConfig {
    Lstm(LstmConfig),
    Gru(GruConfig),
}

impl CellConfig {
    pub fn new(
        lstm:        bool,
        d_input:     usize,
        units:       usize,
        bias:        bool,
        initializer: Option<Initializer>,
    ) -> Self {
        if lstm {
            let config = LstmConfig::new(d_input, units, bias);
            Self::Lstm(match initializer {
                Some(init) => config.with_initializer(init),
                None       => config,
            })
        } else {
            let config = GruConfig::new(d_input, units, bias);
            Self::Gru(match initializer {
                Some(init) => config.with_initializer(init),
                None       => config,
            })
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> RecurrentModule<B> {
        match self {
            Self::Lstm(config) => RecurrentModule::Lstm(config.init(device)),
            Self::Gru(config)  => RecurrentModule::Gru(config.init(device)),
        }
    }
}

// ─── RecurrentModule ──────────────────────────────────────────────────────────
#[derive(Debug)]
pub enum RecurrentModule<B: Backend> {
    Lstm(Lstm<B>),
    Gru(Gru<B>),
}

impl<B: Backend> RecurrentModule<B> {
    /// x: [batch, steps, d_input], state: [batch, units] → [batch, steps, units]
    ///
    /// For an LSTM the given state is the hidden state; the cell
    /// state starts at zero.
    pub fn forward(&self, x: Tensor<B, 3>, state: Option<Tensor<B, 2>>) -> Tensor<B, 3> {
        match self {
            Self::Lstm(lstm) => {
                let state = state.map(|hidden| {
                    let cell = Tensor::zeros(hidden.dims(), &hidden.device());
                    LstmState::new(cell, hidden)
                });
                let (outputs, _) = lstm.forward(x, state);
                outputs
            }
            Self::Gru(gru) => gru.forward(x, state),
        }
    }
}

// ─── RecurrentLayer ───────────────────────────────────────────────────────────
/// LSTM / GRU used as a layer of a feed-forward stack.
#[derive(Debug)]
pub struct RecurrentLayer<B: Backend> {
    pub module:           RecurrentModule<B>,
    pub return_sequences: bool,
}

impl<B: Backend> RecurrentLayer<B> {
    /// Returns [batch, steps, units] or, for the last step only, [batch, 1, units].
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let outputs = self.module.forward(x, None);
        if self.return_sequences {
            return outputs;
        }
        let [batch, steps, units] = outputs.dims();
        outputs.slice([0..batch, steps - 1..steps, 0..units])
    }
}

// ─── RecurrentUpdateCell ──────────────────────────────────────────────────────
/// Update function of an entity. Kept apart from feed-forward
/// models because the old state is passed in explicitly.
#[derive(Debug, Clone)]
pub struct RecurrentUpdateCell {
    spec: LayerSpec,
}

impl LayerDefinition for RecurrentUpdateCell {
    fn spec(&self) -> &LayerSpec {
        &self.spec
    }
}

impl RecurrentUpdateCell {
    /// `kind` may be given with or without the "Cell" suffix.
    pub fn new(kind: &str, raw: &Map<String, Value>) -> Result<Self, BuildError> {
        let kind = if kind.contains("Cell") { kind.to_string() } else { format!("{kind}Cell") };
        Ok(Self { spec: LayerSpec::new(kind, raw)? })
    }

    /// Resolve the cell kind and check its arguments, with the
    /// unit count forced to `dst_dim`.
    pub fn plan(&self, dst_dim: usize, input_dim: usize) -> Result<CellConfig, BuildError> {
        let kind = LayerKind::from_name(&self.spec.kind)?;
        let lstm = match kind {
            LayerKind::LstmCell => true,
            LayerKind::GruCell  => false,
            _ => return Err(BuildError::unknown_layer(&self.spec.kind)),
        };

        let units = i64::try_from(dst_dim).map_err(|_| self.spec.arguments_error())?;
        let mut spec = self.spec.clone();
        spec.set("units", ParamValue::Int(units));
        kind.check(&spec)?;

        if dst_dim == 0 || input_dim == 0 {
            return Err(BuildError::shape(
                format!("input {input_dim}, units {dst_dim}"),
                "Recurrent cells need a non-zero input width and unit count.",
            ));
        }

        let bias = spec.bool("use_bias")?.unwrap_or(true);
        let init = kernel_initializer(&spec)?;
        Ok(CellConfig::new(lstm, input_dim, dst_dim, bias, init))
    }

    /// Build the cell with `dst_dim` units reading `input_dim`-wide messages.
    pub fn build<B: Backend>(
        &self,
        dst_dim:   usize,
        input_dim: usize,
        device:    &B::Device,
    ) -> Result<UpdateCell<B>, BuildError> {
        let config = self.plan(dst_dim, input_dim)?;
        tracing::debug!("Built {} with {} units over {}-wide messages", self.spec.kind, dst_dim, input_dim);
        Ok(UpdateCell { module: config.init(device), units: dst_dim, input_dim })
    }
}

// ─── UpdateCell ───────────────────────────────────────────────────────────────
#[derive(Debug)]
pub struct UpdateCell<B: Backend> {
    module:    RecurrentModule<B>,
    units:     usize,
    input_dim: usize,
}

impl<B: Backend> UpdateCell<B> {
    pub fn units(&self) -> usize {
        self.units
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// One recurrent step per destination.
    ///
    /// src_input: [n, input_dim], old_state: [n, units] → [n, units]
    pub fn perform_unsorted_update(
        &self,
        src_input: Tensor<B, 2>,
        old_state: Tensor<B, 2>,
    ) -> Result<Tensor<B, 2>, BuildError> {
        let [n, d] = src_input.dims();
        self.check_state(n, &old_state)?;
        if d != self.input_dim {
            return Err(BuildError::shape(
                format!("{:?}", src_input.dims()),
                format!("Update input must be {} wide.", self.input_dim),
            ));
        }

        let outputs = self.module.forward(src_input.unsqueeze_dim::<3>(1), Some(old_state));
        Ok(outputs.reshape([n, self.units]))
    }

    /// Masked sequence update.
    ///
    /// src_input: [n, steps, input_dim] (padded), old_state: [n, units],
    /// final_len[i]: number of real messages of destination i.
    pub fn perform_sorted_update(
        &self,
        src_input: Tensor<B, 3>,
        dst_name:  &str,
        old_state: Tensor<B, 2>,
        final_len: &[usize],
    ) -> Result<Tensor<B, 2>, BuildError> {
        let [n, steps, d] = src_input.dims();
        self.check_state(n, &old_state)?;
        if d != self.input_dim {
            return Err(BuildError::shape(
                format!("{:?}", src_input.dims()),
                format!("Update input must be {} wide.", self.input_dim),
            ));
        }
        if final_len.len() != n {
            return Err(BuildError::shape(
                format!("{} lengths", final_len.len()),
                format!("Expected one sequence length per destination ({n})."),
            ));
        }
        if let Some(len) = final_len.iter().find(|&&len| len > steps) {
            return Err(BuildError::shape(
                len.to_string(),
                format!("Sequence length exceeds the {steps} padded steps."),
            ));
        }

        tracing::debug!("{}_update: {} destinations, up to {} messages", dst_name, n, steps);
        if n == 0 || steps == 0 {
            return Ok(Tensor::zeros([n, self.units], &old_state.device()));
        }

        let outputs = self.module.forward(src_input, Some(old_state));
        let device  = outputs.device();

        // One-hot on the last real step of each row. A row with no
        // messages selects nothing, so its output stays at zero.
        let mut select = vec![0.0f32; n * steps];
        for (row, &len) in final_len.iter().enumerate() {
            if len > 0 {
                select[row * steps + len - 1] = 1.0;
            }
        }

        let select = Tensor::<B, 3>::from_data(TensorData::new(select, [n, steps, 1]), &device)
            .expand([n, steps, self.units]);

        Ok((outputs * select).sum_dim(1).reshape([n, self.units]))
    }

    fn check_state(&self, n: usize, old_state: &Tensor<B, 2>) -> Result<(), BuildError> {
        let dims = old_state.dims();
        if dims != [n, self.units] {
            return Err(BuildError::shape(
                format!("{dims:?}"),
                format!("Old state must be [{n}, {}].", self.units),
            ));
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use serde_json::json;

    type TestBackend = NdArray;

    fn cell(kind: &str, params: Value) -> RecurrentUpdateCell {
        RecurrentUpdateCell::new(kind, params.as_object().unwrap()).unwrap()
    }

    fn rows(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_cell_suffix_is_appended_once() {
        assert_eq!(cell("GRU", json!({})).kind(), "GRUCell");
        assert_eq!(cell("LSTMCell", json!({})).kind(), "LSTMCell");
    }

    #[test]
    fn test_units_follow_destination_dimension() {
        let device = Default::default();
        // a user-provided unit count is overridden
        let update = cell("GRU", json!({"units": "3"}))
            .build::<TestBackend>(5, 4, &device)
            .unwrap();
        assert_eq!(update.units(), 5);
        assert_eq!(update.input_dim(), 4);
    }

    #[test]
    fn test_unknown_cell_kind() {
        let err = cell("SimpleRNN", json!({})).plan(4, 4).err().unwrap();
        assert_eq!(err.variable, "layer");
        assert_eq!(err.parameter, "SimpleRNNCell");
    }

    #[test]
    fn test_destination_dimension_beyond_i64_is_rejected() {
        let err = cell("GRU", json!({})).plan(usize::MAX, 4).err().unwrap();
        assert_eq!(err.variable, "GRUCell");
    }

    #[test]
    fn test_unsupported_argument_is_rejected() {
        let err = cell("LSTM", json!({"dropout": "0.2"})).plan(4, 4).err().unwrap();
        assert_eq!(err.variable, "LSTMCell");
    }

    #[test]
    fn test_unsorted_update_shape() {
        let device = Default::default();
        for kind in ["GRU", "LSTM"] {
            let update = cell(kind, json!({})).build::<TestBackend>(6, 3, &device).unwrap();
            let src   = Tensor::<TestBackend, 2>::ones([4, 3], &device);
            let state = Tensor::<TestBackend, 2>::zeros([4, 6], &device);
            let new_state = update.perform_unsorted_update(src, state).unwrap();
            assert_eq!(new_state.dims(), [4, 6]);
        }
    }

    #[test]
    fn test_unsorted_update_rejects_wrong_state() {
        let device = Default::default();
        let update = cell("GRU", json!({})).build::<TestBackend>(6, 3, &device).unwrap();
        let src   = Tensor::<TestBackend, 2>::ones([4, 3], &device);
        let state = Tensor::<TestBackend, 2>::zeros([4, 5], &device);
        let err = update.perform_unsorted_update(src, state).unwrap_err();
        assert_eq!(err.variable, "shape");
    }

    #[test]
    fn test_sorted_update_respects_lengths() {
        let device = Default::default();
        let update = cell("GRU", json!({})).build::<TestBackend>(2, 2, &device).unwrap();

        // row 0: two real messages, row 1: one real message then padding,
        // row 2: no messages at all
        let src = Tensor::<TestBackend, 3>::from_floats(
            [
                [[1.0, 0.5], [0.2, -0.3]],
                [[1.0, 0.5], [9.0, 9.0]],
                [[4.0, 4.0], [4.0, 4.0]],
            ],
            &device,
        );
        let old = Tensor::<TestBackend, 2>::from_floats([[0.1, 0.2], [0.1, 0.2], [0.7, -0.7]], &device);

        let sorted = rows(
            update
                .perform_sorted_update(src, "node", old, &[2, 1, 0])
                .unwrap(),
        );

        // row 1 must equal a single step over its first message
        let first_step = rows(
            update
                .perform_unsorted_update(
                    Tensor::<TestBackend, 2>::from_floats([[1.0, 0.5]], &device),
                    Tensor::<TestBackend, 2>::from_floats([[0.1, 0.2]], &device),
                )
                .unwrap(),
        );
        assert!((sorted[2] - first_step[0]).abs() < 1e-5);
        assert!((sorted[3] - first_step[1]).abs() < 1e-5);

        // row 2 never steps, so its output stays at zero
        assert!(sorted[4].abs() < 1e-6);
        assert!(sorted[5].abs() < 1e-6);
    }

    #[test]
    fn test_gru_sorted_update_chains_messages_in_order() {
        let device = Default::default();
        let update = cell("GRU", json!({})).build::<TestBackend>(2, 2, &device).unwrap();
        let first  = [1.0f32, 0.5];
        let second = [-2.0f32, 3.0];

        let sorted = rows(
            update
                .perform_sorted_update(
                    Tensor::<TestBackend, 3>::from_floats([[first, second]], &device),
                    "node",
                    Tensor::<TestBackend, 2>::from_floats([[0.1, 0.2]], &device),
                    &[2],
                )
                .unwrap(),
        );

        // two single steps, the second starting from the first's output
        let step_one = update
            .perform_unsorted_update(
                Tensor::<TestBackend, 2>::from_floats([first], &device),
                Tensor::<TestBackend, 2>::from_floats([[0.1, 0.2]], &device),
            )
            .unwrap();
        let chained = rows(
            update
                .perform_unsorted_update(Tensor::<TestBackend, 2>::from_floats([second], &device), step_one)
                .unwrap(),
        );

        for (s, c) in sorted.iter().zip(chained.iter()) {
            assert!((s - c).abs() < 1e-5, "sorted {sorted:?} vs chained {chained:?}");
        }
    }

    #[test]
    fn test_lstm_sorted_update_ignores_padding() {
        // The LSTM carries its cell state across messages, which a chain of
        // single updates (each starting from a zero cell state) cannot
        // reproduce. Compare against the same messages without padding.
        let device = Default::default();
        let update = cell("LSTM", json!({})).build::<TestBackend>(2, 2, &device).unwrap();
        let old = Tensor::<TestBackend, 2>::from_floats([[0.1, 0.2]], &device);

        let padded = rows(
            update
                .perform_sorted_update(
                    Tensor::<TestBackend, 3>::from_floats([[[1.0, 0.5], [-2.0, 3.0], [9.0, 9.0]]], &device),
                    "node",
                    old.clone(),
                    &[2],
                )
                .unwrap(),
        );
        let exact = rows(
            update
                .perform_sorted_update(
                    Tensor::<TestBackend, 3>::from_floats([[[1.0, 0.5], [-2.0, 3.0]]], &device),
                    "node",
                    old,
                    &[2],
                )
                .unwrap(),
        );

        for (p, e) in padded.iter().zip(exact.iter()) {
            assert!((p - e).abs() < 1e-5);
        }
    }

    #[test]
    fn test_sorted_update_depends_on_message_order() {
        let device = Default::default();
        for kind in ["GRU", "LSTM"] {
            let update = cell(kind, json!({})).build::<TestBackend>(2, 2, &device).unwrap();
            let old = Tensor::<TestBackend, 2>::from_floats([[0.1, 0.2], [0.1, 0.2]], &device);
            let src = Tensor::<TestBackend, 3>::from_floats(
                [
                    [[1.0, 0.5], [-2.0, 3.0]],
                    [[-2.0, 3.0], [1.0, 0.5]],
                ],
                &device,
            );

            let out = rows(update.perform_sorted_update(src, "node", old, &[2, 2]).unwrap());
            let differs = (out[0] - out[2]).abs() > 1e-6 || (out[1] - out[3]).abs() > 1e-6;
            assert!(differs, "{kind}: swapping messages left {out:?} unchanged");
        }
    }

    #[test]
    fn test_sorted_update_rejects_long_lengths() {
        let device = Default::default();
        let update = cell("LSTM", json!({})).build::<TestBackend>(2, 2, &device).unwrap();
        let src = Tensor::<TestBackend, 3>::zeros([1, 2, 2], &device);
        let old = Tensor::<TestBackend, 2>::zeros([1, 2], &device);
        assert!(update.perform_sorted_update(src, "node", old, &[3]).is_err());
    }

    #[test]
    fn test_recurrent_layer_last_step() {
        let device = Default::default();
        let layer = RecurrentLayer::<TestBackend> {
            module: CellConfig::new(true, 3, 4, true, None).init(&device),
            return_sequences: false,
        };
        let out = layer.forward(Tensor::ones([2, 5, 3], &device));
        assert_eq!(out.dims(), [2, 1, 4]);
    }
}
