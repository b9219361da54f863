//! Named state records and their declared schemas.

use std::collections::BTreeMap;

use fg_materials::Material;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};
use crate::value::{FieldKind, Value};

/// One declared state field of a node, edge or controller type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Filled in when construction omits the field.
    pub default: Option<f64>,
}

impl FieldSpec {
    pub const fn scalar(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Scalar,
            default: None,
        }
    }

    pub const fn material(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Material,
            default: None,
        }
    }

    /// Scalar default. Materials have none.
    pub const fn with_default(self, value: f64) -> Self {
        Self {
            default: Some(value),
            ..self
        }
    }
}

/// Ordered record of named values.
///
/// Once an entity is built its state has a fixed key set: [`State::set`]
/// refuses unknown names and kind changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    fields: BTreeMap<String, Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used while assembling construction state.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn value(&self, name: &str) -> GraphResult<&Value> {
        self.get(name).ok_or_else(|| GraphError::NoSuchField {
            field: name.to_string(),
        })
    }

    pub fn scalar(&self, name: &str) -> GraphResult<f64> {
        let value = self.value(name)?;
        value.as_scalar().ok_or_else(|| GraphError::FieldKind {
            field: name.to_string(),
            expected: FieldKind::Scalar,
            found: value.kind(),
        })
    }

    pub fn material(&self, name: &str) -> GraphResult<&Material> {
        let value = self.value(name)?;
        value.as_material().ok_or_else(|| GraphError::FieldKind {
            field: name.to_string(),
            expected: FieldKind::Material,
            found: value.kind(),
        })
    }

    /// Overwrite an existing field with a value of the same kind.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> GraphResult<()> {
        let value = value.into();
        let slot = self.fields.get_mut(name).ok_or_else(|| GraphError::NoSuchField {
            field: name.to_string(),
        })?;
        if slot.kind() != value.kind() {
            return Err(GraphError::FieldKind {
                field: name.to_string(),
                expected: slot.kind(),
                found: value.kind(),
            });
        }
        *slot = value;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check construction state against a declared schema: fill scalar
    /// defaults, then reject missing fields, extra fields and kind mismatches.
    pub(crate) fn conform(mut self, owner: &str, fields: &[FieldSpec]) -> GraphResult<Self> {
        for spec in fields {
            if let (false, Some(default)) = (self.contains(spec.name), spec.default) {
                self.fields.insert(spec.name.to_string(), Value::Scalar(default));
            }
        }

        let missing: Vec<String> = fields
            .iter()
            .filter(|spec| !self.contains(spec.name))
            .map(|spec| spec.name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(GraphError::MissingFields {
                owner: owner.to_string(),
                fields: missing,
            });
        }

        let unknown: Vec<String> = self
            .names()
            .filter(|name| !fields.iter().any(|spec| spec.name == *name))
            .map(str::to_string)
            .collect();
        if !unknown.is_empty() {
            return Err(GraphError::UnknownFields {
                owner: owner.to_string(),
                fields: unknown,
            });
        }

        for spec in fields {
            let found = self.value(spec.name)?.kind();
            if found != spec.kind {
                return Err(GraphError::FieldKind {
                    field: spec.name.to_string(),
                    expected: spec.kind,
                    found,
                });
            }
        }
        Ok(self)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for State {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
