//! Field values held in entity state, flows and signal payloads.

use std::fmt;

use fg_materials::{Material, MaterialError};
use serde::{Deserialize, Serialize};

/// What a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Scalar,
    Material,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Scalar => write!(f, "scalar"),
            FieldKind::Material => write!(f, "material"),
        }
    }
}

/// A scalar or a material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(f64),
    Material(Material),
}

/// Why a rate could not be integrated into a value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AccumulateError {
    Kind { expected: FieldKind, found: FieldKind },
    Material(MaterialError),
}

impl fmt::Display for AccumulateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccumulateError::Kind { expected, found } => {
                write!(f, "rate is a {found}, field is a {expected}")
            }
            AccumulateError::Material(err) => write!(f, "{err}"),
        }
    }
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Scalar(_) => FieldKind::Scalar,
            Value::Material(_) => FieldKind::Material,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Material(_) => None,
        }
    }

    pub fn as_material(&self) -> Option<&Material> {
        match self {
            Value::Material(m) => Some(m),
            Value::Scalar(_) => None,
        }
    }

    pub fn scale(&self, factor: f64) -> Value {
        match self {
            Value::Scalar(v) => Value::Scalar(v * factor),
            Value::Material(m) => Value::Material(m.scale(factor)),
        }
    }

    /// `self + factor * rate`.
    pub(crate) fn accumulate(&self, rate: &Value, factor: f64) -> Result<Value, AccumulateError> {
        match (self, rate) {
            (Value::Scalar(v), Value::Scalar(r)) => Ok(Value::Scalar(v + factor * r)),
            (Value::Material(m), Value::Material(r)) => m
                .combine(&r.scale(factor))
                .map(Value::Material)
                .map_err(AccumulateError::Material),
            _ => Err(AccumulateError::Kind {
                expected: self.kind(),
                found: rate.kind(),
            }),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<Material> for Value {
    fn from(m: Material) -> Self {
        Value::Material(m)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(v) => write!(f, "{v}"),
            Value::Material(m) => write!(f, "{m}"),
        }
    }
}
