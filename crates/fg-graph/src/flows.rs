//! Per-cycle rates produced by edges.

use std::collections::BTreeMap;

use fg_core::ComponentId;

use crate::error::{GraphError, GraphResult};
use crate::value::Value;

/// Rates keyed by canonical quantity name, per unit time.
pub type FlowMap = BTreeMap<String, Value>;

/// Which endpoint of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum End {
    Source,
    Target,
}

impl End {
    /// Sign applied to conservative rates at this end.
    pub fn sign(self) -> f64 {
        match self {
            End::Source => -1.0,
            End::Target => 1.0,
        }
    }
}

/// Result of one edge's flow calculation.
///
/// Conservative rates move a quantity from source to target: the source loses
/// `rate * dt` and the target gains the same. The per-endpoint maps (the
/// reserved `_source`/`_target` keys) are added to that endpoint as given and
/// carry no conservation guarantee, e.g. a reaction that consumes one
/// material and produces another. A quantity goes through one route or the
/// other, never both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flows {
    conservative: FlowMap,
    source: Option<FlowMap>,
    target: Option<FlowMap>,
}

impl Flows {
    pub const SOURCE_KEY: &'static str = "_source";
    pub const TARGET_KEY: &'static str = "_target";

    pub fn new() -> Self {
        Self::default()
    }

    /// Conservative rate for `name`, positive from source to target.
    pub fn with(mut self, name: impl Into<String>, rate: impl Into<Value>) -> Self {
        self.conservative.insert(name.into(), rate.into());
        self
    }

    /// Rate added directly to the source's `name`.
    pub fn with_source(mut self, name: impl Into<String>, rate: impl Into<Value>) -> Self {
        self.source
            .get_or_insert_with(FlowMap::new)
            .insert(name.into(), rate.into());
        self
    }

    /// Rate added directly to the target's `name`.
    pub fn with_target(mut self, name: impl Into<String>, rate: impl Into<Value>) -> Self {
        self.target
            .get_or_insert_with(FlowMap::new)
            .insert(name.into(), rate.into());
        self
    }

    pub fn rate(&self, name: &str) -> Option<&Value> {
        self.conservative.get(name)
    }

    pub fn conservative(&self) -> &FlowMap {
        &self.conservative
    }

    pub fn overrides(&self, end: End) -> Option<&FlowMap> {
        match end {
            End::Source => self.source.as_ref(),
            End::Target => self.target.as_ref(),
        }
    }

    pub fn is_conservative(&self) -> bool {
        self.source.is_none() && self.target.is_none()
    }

    /// Every rate scaled by `factor`, e.g. to model a leak fraction.
    pub fn scale(&self, factor: f64) -> Flows {
        let scale_map = |map: &FlowMap| -> FlowMap {
            map.iter()
                .map(|(k, v)| (k.clone(), v.scale(factor)))
                .collect()
        };
        Flows {
            conservative: scale_map(&self.conservative),
            source: self.source.as_ref().map(scale_map),
            target: self.target.as_ref().map(scale_map),
        }
    }

    /// Rates as they apply at `end`: `(canonical name, rate, factor)`.
    pub(crate) fn contributions(&self, end: End) -> impl Iterator<Item = (&str, &Value, f64)> {
        let sign = end.sign();
        self.conservative
            .iter()
            .map(move |(k, v)| (k.as_str(), v, sign))
            .chain(
                self.overrides(end)
                    .into_iter()
                    .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v, 1.0))),
            )
    }

    /// Rejects reserved conservative keys and quantities that appear both
    /// as a conservative rate and in a per-endpoint map.
    pub(crate) fn check_keys(&self, edge: ComponentId) -> GraphResult<()> {
        for key in [Self::SOURCE_KEY, Self::TARGET_KEY] {
            if self.conservative.contains_key(key) {
                return Err(GraphError::ReservedFlowKey {
                    edge,
                    key: key.to_string(),
                });
            }
        }
        for end in [End::Source, End::Target] {
            let overlap = self
                .overrides(end)
                .and_then(|map| map.keys().find(|k| self.conservative.contains_key(*k)));
            if let Some(key) = overlap {
                return Err(GraphError::OverlappingFlow {
                    edge,
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }
}
