// ============================================================
// Layer 3 — BuildError
// ============================================================
// The single error type raised while turning a model description
// into layers. Every failure carries three pieces of information:
//
//   parameter — the offending value, as written in the config
//   variable  — the category of the value (regularizer, activation,
//               layer, shape, or the layer kind whose constructor
//               rejected its arguments)
//   message   — what the user should check
//
// Nothing in the builder recovers from a BuildError; it always
// propagates up to the application layer, where anyhow adds the
// file context.
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Recoverable Errors with Result)

use thiserror::Error;

/// Message attached to constructor argument mismatches.
pub const ARGUMENTS_MESSAGE: &str = "Please make sure that you defined all mandatory parameters \
     and all the optional ones are correctly defined.";

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {variable} '{parameter}': {message}")]
pub struct BuildError {
    pub parameter: String,
    pub variable:  String,
    pub message:   String,
}

impl BuildError {
    pub fn new(
        parameter: impl Into<String>,
        variable:  impl Into<String>,
        message:   impl Into<String>,
    ) -> Self {
        Self {
            parameter: parameter.into(),
            variable:  variable.into(),
            message:   message.into(),
        }
    }

    /// A regularizer strength that is not a number.
    pub fn regularizer(value: impl Into<String>) -> Self {
        Self::new(value, "regularizer", "Please make sure it is a numerical value.")
    }

    /// An activation name missing from the activation catalog.
    pub fn activation(name: impl Into<String>) -> Self {
        Self::new(
            name,
            "activation",
            "Please make sure it is a valid activation function \
             (relu, relu6, sigmoid, tanh, gelu, silu, swish, softmax, log_softmax, \
             leaky_relu, softplus, softsign, elu, selu, linear).",
        )
    }

    /// A layer kind missing from the layer catalog.
    pub fn unknown_layer(kind: impl Into<String>) -> Self {
        Self::new(
            kind,
            "layer",
            "Please make sure it is a valid layer (Dense, Dropout, Activation, Flatten, \
             Reshape, LayerNormalization, LSTM, GRU, LSTMCell, GRUCell, transformerblock).",
        )
    }

    /// Missing, unknown or ill-typed constructor arguments for `kind`.
    pub fn arguments(parameters: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(parameters, kind, ARGUMENTS_MESSAGE)
    }

    /// Input width or rank that the layer cannot consume.
    pub fn shape(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(parameter, "shape", message)
    }
}
