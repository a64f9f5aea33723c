// ============================================================
// Layer 3 — Model Description Domain Types
// ============================================================
// The declarative input of the builder, as loaded from JSON:
//
//   {
//     "nn_architectures": [
//       { "nn_name": "message_fn", "nn_type": "feed_forward",
//         "architecture": [ {"type_layer": "Dense", "units": "64"} ] },
//       { "nn_name": "update_fn", "nn_type": "recurrent_nn",
//         "recurrent_type": "GRU" }
//     ]
//   }
//
// Layer parameters stay as raw serde_json values here; they are
// coerced when a LayerSpec is built from them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescription {
    pub nn_architectures: Vec<NetworkDescription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    FeedForward,
    RecurrentNn,
}

/// One named network of the description.
///
/// For `feed_forward` networks `architecture` lists the layers in
/// order. For `recurrent_nn` networks `recurrent_type` names the
/// cell and every other key ends up in `parameters`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDescription {
    pub nn_name: String,
    pub nn_type: NetworkType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub architecture: Vec<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrent_type: Option<String>,

    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}
