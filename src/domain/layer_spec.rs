// ============================================================
// Layer 3 — LayerSpec Domain Type
// ============================================================
// A LayerSpec is one entry of a model description after its
// parameters have been coerced:
//
//   {"type_layer": "Dense", "units": "64", "activation": "relu"}
//        │
//        ▼
//   LayerSpec { kind: "Dense",
//               params: { units: '64', activation: relu } }
//
// Specs are transient: the ML layer reads them once to build
// burn modules and then drops them.
//
// The typed getters below all report failures with the same
// "arguments" BuildError, naming the layer kind and the full
// parameter map, so a user can see the whole layer definition
// that was rejected.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::domain::error::BuildError;
use crate::domain::params::{Activation, ParamValue, Regularizer};

/// Key that carries the layer kind inside a raw architecture entry.
pub const TYPE_KEY: &str = "type_layer";

// ─── ModelRole ────────────────────────────────────────────────────────────────
/// What a constructed model is used for. Only used for naming
/// layers and for log output; the last-layer override is driven
/// by the destination dimension itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelRole {
    #[default]
    Message,
    Update,
    Readout,
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Message => "message",
            Self::Update  => "update",
            Self::Readout => "readout",
        };
        f.write_str(s)
    }
}

// ─── LayerSpec ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub kind:   String,
    pub params: BTreeMap<String, ParamValue>,
}

impl LayerSpec {
    /// Build a spec from a raw parameter map, dropping `type_layer`
    /// and coercing every remaining value.
    pub fn new(kind: impl Into<String>, raw: &Map<String, Value>) -> Result<Self, BuildError> {
        let params = raw
            .iter()
            .filter(|(key, _)| key.as_str() != TYPE_KEY)
            .map(|(key, value)| Ok((key.clone(), ParamValue::coerce(key, value)?)))
            .collect::<Result<BTreeMap<_, _>, BuildError>>()?;

        Ok(Self { kind: kind.into(), params })
    }

    /// A spec whose parameters are already typed.
    pub fn from_params(kind: impl Into<String>, params: BTreeMap<String, ParamValue>) -> Self {
        Self { kind: kind.into(), params }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: ParamValue) {
        self.params.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// The `name` parameter, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(ParamValue::as_str)
    }

    /// Render the parameter map the way it appears in error messages.
    pub fn render_params(&self) -> String {
        let parts: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("'{k}': {v}"))
            .collect();
        format!("{{{}}}", parts.join(", "))
    }

    pub fn arguments_error(&self) -> BuildError {
        BuildError::arguments(self.render_params(), &self.kind)
    }

    /// Reject unknown keys and report missing mandatory ones.
    pub fn check_keys(&self, mandatory: &[&str], optional: &[&str]) -> Result<(), BuildError> {
        let unknown = self.params.keys().any(|key| {
            key != "name" && !mandatory.contains(&key.as_str()) && !optional.contains(&key.as_str())
        });
        let missing = mandatory.iter().any(|key| !self.present(key));
        if unknown || missing {
            tracing::debug!("Rejected arguments for {}: {}", self.kind, self.render_params());
            return Err(self.arguments_error());
        }
        Ok(())
    }

    // ── Typed getters ─────────────────────────────────────────────────────────
    // A key holding ParamValue::None counts as absent, so "None" in a
    // config falls back to the layer default.

    fn present(&self, key: &str) -> bool {
        !matches!(self.get(key), None | Some(ParamValue::None))
    }

    fn typed<T>(&self, key: &str, read: impl Fn(&ParamValue) -> Option<T>) -> Result<Option<T>, BuildError> {
        match self.get(key) {
            None | Some(ParamValue::None) => Ok(None),
            Some(value) => read(value).map(Some).ok_or_else(|| self.arguments_error()),
        }
    }

    pub fn usize(&self, key: &str) -> Result<Option<usize>, BuildError> {
        self.typed(key, ParamValue::as_usize)
    }

    pub fn require_usize(&self, key: &str) -> Result<usize, BuildError> {
        self.usize(key)?.ok_or_else(|| self.arguments_error())
    }

    pub fn f64(&self, key: &str) -> Result<Option<f64>, BuildError> {
        self.typed(key, ParamValue::as_f64)
    }

    pub fn require_f64(&self, key: &str) -> Result<f64, BuildError> {
        self.f64(key)?.ok_or_else(|| self.arguments_error())
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>, BuildError> {
        self.typed(key, ParamValue::as_bool)
    }

    pub fn shape(&self, key: &str) -> Result<Option<Vec<i64>>, BuildError> {
        self.typed(key, ParamValue::as_shape)
    }

    pub fn str(&self, key: &str) -> Result<Option<&str>, BuildError> {
        match self.get(key) {
            None | Some(ParamValue::None) => Ok(None),
            Some(ParamValue::Str(s)) => Ok(Some(s)),
            Some(_) => Err(self.arguments_error()),
        }
    }

    pub fn activation(&self, key: &str) -> Result<Option<Activation>, BuildError> {
        self.typed(key, |v| match v {
            ParamValue::Activation(a) => Some(*a),
            _ => None,
        })
    }

    pub fn regularizer(&self, key: &str) -> Result<Option<Regularizer>, BuildError> {
        self.typed(key, |v| match v {
            ParamValue::Regularizer(r) => Some(*r),
            _ => None,
        })
    }
}
