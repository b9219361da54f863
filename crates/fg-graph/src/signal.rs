//! Controller-to-endpoint bindings and the commands they carry.

use std::collections::BTreeMap;

use fg_core::ComponentId;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};
use crate::state::State;
use crate::value::Value;

/// A command written by a controller: field name to new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload {
    values: BTreeMap<String, Value>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fold `other` in; its values win.
    pub fn merge(&mut self, other: Payload) {
        self.values.extend(other.values);
    }
}

/// Overwrite fields from each payload in order, so the latest write wins.
///
/// Fails on a name the state does not have, before changing anything.
pub fn apply_payloads(state: &mut State, owner: &str, payloads: &[Payload]) -> GraphResult<()> {
    for payload in payloads {
        if let Some((name, _)) = payload.iter().find(|(name, _)| !state.contains(name)) {
            return Err(GraphError::UnknownSignalField {
                owner: owner.to_string(),
                field: name.to_string(),
            });
        }
    }
    for payload in payloads {
        for (name, value) in payload.iter() {
            state.set(name, value.clone())?;
        }
    }
    Ok(())
}

/// Direction of a controller connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Read => "read",
            Direction::Write => "write",
        }
    }
}

/// Binding between one controller connection and one node or edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    name: String,
    controller: ComponentId,
    endpoint: ComponentId,
    direction: Direction,
    last_payload: Option<Payload>,
}

impl Signal {
    pub(crate) fn new(
        name: impl Into<String>,
        controller: ComponentId,
        endpoint: ComponentId,
        direction: Direction,
    ) -> Self {
        Self {
            name: name.into(),
            controller,
            endpoint,
            direction,
            last_payload: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn controller(&self) -> ComponentId {
        self.controller
    }

    pub fn endpoint(&self) -> ComponentId {
        self.endpoint
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Most recent command sent over a write signal.
    pub fn last_payload(&self) -> Option<&Payload> {
        self.last_payload.as_ref()
    }

    pub(crate) fn record(&mut self, payload: Payload) {
        self.last_payload = Some(payload);
    }

    pub(crate) fn rebind(&mut self, endpoint: ComponentId) {
        self.endpoint = endpoint;
    }
}
