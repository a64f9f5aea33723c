// ============================================================
// Layer 3 — Parameter Values and Coercion
// ============================================================
// Model descriptions are written by hand, so most parameter
// values arrive as strings: "64", "True", "relu", "0.01".
// This module turns them into typed values before any layer
// is constructed.
//
// Coercion rules (first match wins):
//
//   "None" / null              → ParamValue::None
//   "True" / "False"           → ParamValue::Bool
//   key contains "regularizer" → L2 regularizer, value must be numeric
//   key contains "activation"  → Activation, value must be a known name
//   anything else              → kept as read (Int, Float, Str, List...)
//
// Numeric strings such as "64" are kept as Str here and converted
// by the typed accessors (as_usize, as_f64) when a constructor
// asks for them.
//
// No burn types in this file — Activation and Regularizer are
// plain descriptions; ml::activation applies them to tensors.

use std::fmt;

use serde_json::Value;

use crate::domain::error::BuildError;

// ─── Activation ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Relu6,
    Sigmoid,
    Tanh,
    Gelu,
    Silu,
    Softmax,
    LogSoftmax,
    LeakyRelu,
    Softplus,
    Softsign,
    Elu,
    Selu,
    Linear,
}

impl Activation {
    /// Look an activation up by the name used in model descriptions.
    pub fn from_name(name: &str) -> Result<Self, BuildError> {
        let activation = match name {
            "relu"        => Self::Relu,
            "relu6"       => Self::Relu6,
            "sigmoid"     => Self::Sigmoid,
            "tanh"        => Self::Tanh,
            "gelu"        => Self::Gelu,
            "silu" | "swish" => Self::Silu,
            "softmax"     => Self::Softmax,
            "log_softmax" => Self::LogSoftmax,
            "leaky_relu"  => Self::LeakyRelu,
            "softplus"    => Self::Softplus,
            "softsign"    => Self::Softsign,
            "elu"         => Self::Elu,
            "selu"        => Self::Selu,
            "linear"      => Self::Linear,
            other         => return Err(BuildError::activation(other)),
        };
        Ok(activation)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Relu       => "relu",
            Self::Relu6      => "relu6",
            Self::Sigmoid    => "sigmoid",
            Self::Tanh       => "tanh",
            Self::Gelu       => "gelu",
            Self::Silu       => "silu",
            Self::Softmax    => "softmax",
            Self::LogSoftmax => "log_softmax",
            Self::LeakyRelu  => "leaky_relu",
            Self::Softplus   => "softplus",
            Self::Softsign   => "softsign",
            Self::Elu        => "elu",
            Self::Selu       => "selu",
            Self::Linear     => "linear",
        }
    }
}

// ─── Regularizer ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Regularizer {
    /// strength * sum(x²)
    L2(f64),
}

impl Regularizer {
    pub fn strength(&self) -> f64 {
        match self {
            Self::L2(s) => *s,
        }
    }
}

// ─── ParamValue ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ParamValue>),
    Activation(Activation),
    Regularizer(Regularizer),
}

impl ParamValue {
    /// Coerce one raw configuration value stored under `key`.
    pub fn coerce(key: &str, raw: &Value) -> Result<Self, BuildError> {
        match raw {
            Value::Null => return Ok(Self::None),
            Value::String(s) if s == "None"  => return Ok(Self::None),
            Value::String(s) if s == "True"  => return Ok(Self::Bool(true)),
            Value::String(s) if s == "False" => return Ok(Self::Bool(false)),
            _ => {}
        }

        if key.contains("regularizer") {
            let strength = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            return strength
                .filter(|s| s.is_finite())
                .map(|s| Self::Regularizer(Regularizer::L2(s)))
                .ok_or_else(|| BuildError::regularizer(render_raw(raw)));
        }

        if key.contains("activation") {
            return match raw {
                Value::String(name) => Activation::from_name(name).map(Self::Activation),
                other => Err(BuildError::activation(render_raw(other))),
            };
        }

        Ok(Self::from_plain(raw))
    }

    /// Typed copy of a value with no key-specific rules (list items).
    fn from_plain(raw: &Value) -> Self {
        match raw {
            Value::Null => Self::None,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None    => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) if s == "None"  => Self::None,
            Value::String(s) if s == "True"  => Self::Bool(true),
            Value::String(s) if s == "False" => Self::Bool(false),
            Value::String(s) => Self::Str(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_plain).collect()),
            Value::Object(_) => Self::Str(raw.to_string()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|i| usize::try_from(i).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i)   => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Str(s)   => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Str(s) if s.eq_ignore_ascii_case("true")  => Some(true),
            Self::Str(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// A shape such as `[1, -1]`, or the string forms "(1, -1)" / "1,-1".
    pub fn as_shape(&self) -> Option<Vec<i64>> {
        match self {
            Self::List(items) => items.iter().map(ParamValue::as_i64).collect(),
            Self::Int(i) => Some(vec![*i]),
            Self::Str(s) => s
                .trim()
                .trim_start_matches(['(', '['])
                .trim_end_matches([')', ']'])
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| part.parse::<i64>().ok())
                .collect(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None     => write!(f, "None"),
            Self::Bool(b)  => write!(f, "{}", if *b { "True" } else { "False" }),
            Self::Int(i)   => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s)   => write!(f, "'{s}'"),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Self::Activation(a)  => write!(f, "{}", a.name()),
            Self::Regularizer(r) => write!(f, "l2({})", r.strength()),
        }
    }
}

fn render_raw(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
