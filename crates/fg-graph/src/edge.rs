//! Edges: directed flow calculators between two nodes.

use std::collections::BTreeMap;
use std::fmt;

use fg_core::ComponentId;
use fg_materials::Material;

use crate::alias::AliasMap;
use crate::error::{GraphError, GraphResult};
use crate::flows::{End, Flows};
use crate::graph::Graph;
use crate::node::{Node, label};
use crate::signal::{Payload, apply_payloads};
use crate::state::{FieldSpec, State};
use crate::value::Value;

/// Read access to the two endpoint states during a flow calculation.
///
/// The `*_field` accessors resolve canonical names through the edge's alias
/// maps. `source` and `target` expose the raw states and bypass aliasing.
#[derive(Clone, Copy)]
pub struct Endpoints<'a> {
    pub source: &'a State,
    pub target: &'a State,
    alias_source: &'a AliasMap,
    alias_target: &'a AliasMap,
}

impl<'a> Endpoints<'a> {
    pub fn new(
        source: &'a State,
        target: &'a State,
        alias_source: &'a AliasMap,
        alias_target: &'a AliasMap,
    ) -> Self {
        Self {
            source,
            target,
            alias_source,
            alias_target,
        }
    }

    pub fn field(&self, end: End, name: &str) -> GraphResult<&'a Value> {
        let (state, aliases) = match end {
            End::Source => (self.source, self.alias_source),
            End::Target => (self.target, self.alias_target),
        };
        state.value(aliases.resolve(name))
    }

    pub fn source_field(&self, name: &str) -> GraphResult<&'a Value> {
        self.field(End::Source, name)
    }

    pub fn target_field(&self, name: &str) -> GraphResult<&'a Value> {
        self.field(End::Target, name)
    }

    pub fn source_scalar(&self, name: &str) -> GraphResult<f64> {
        self.source.scalar(self.alias_source.resolve(name))
    }

    pub fn target_scalar(&self, name: &str) -> GraphResult<f64> {
        self.target.scalar(self.alias_target.resolve(name))
    }

    pub fn source_material(&self, name: &str) -> GraphResult<&'a Material> {
        self.source.material(self.alias_source.resolve(name))
    }

    pub fn target_material(&self, name: &str) -> GraphResult<&'a Material> {
        self.target.material(self.alias_target.resolve(name))
    }
}

/// Behaviour of an edge type.
pub trait EdgeModel: Send + Sync {
    fn type_name(&self) -> &'static str;

    /// Declared state fields (parameters and internal state).
    fn fields(&self) -> &'static [FieldSpec];

    /// Per-time rates from endpoint state as of the start of the cycle.
    fn calculate_flows(
        &mut self,
        state: &mut State,
        ends: Endpoints<'_>,
        dt: f64,
    ) -> GraphResult<Flows>;

    /// Default: overwrite the named fields, latest command wins.
    fn update_from_signals(
        &mut self,
        state: &mut State,
        payloads: &[Payload],
        _dt: f64,
    ) -> GraphResult<()> {
        apply_payloads(state, self.type_name(), payloads)
    }

    /// Post-processing after flows are known; may adjust them.
    fn update_from_state(
        &mut self,
        _state: &mut State,
        _flows: &mut Flows,
        _dt: f64,
    ) -> GraphResult<()> {
        Ok(())
    }
}

/// Everything needed to add an edge to a graph.
pub struct EdgeSpec {
    pub(crate) name: Option<String>,
    pub(crate) model: Box<dyn EdgeModel>,
    pub(crate) state: State,
    pub(crate) source: ComponentId,
    pub(crate) target: ComponentId,
    pub(crate) alias_source: AliasMap,
    pub(crate) alias_target: AliasMap,
}

impl EdgeSpec {
    pub fn new(model: impl EdgeModel + 'static, source: ComponentId, target: ComponentId) -> Self {
        Self::boxed(Box::new(model), source, target)
    }

    pub fn boxed(model: Box<dyn EdgeModel>, source: ComponentId, target: ComponentId) -> Self {
        Self {
            name: None,
            model,
            state: State::new(),
            source,
            target,
            alias_source: AliasMap::new(),
            alias_target: AliasMap::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state = self.state.with(name, value);
        self
    }

    pub fn state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    pub fn alias_source(mut self, aliases: impl Into<AliasMap>) -> Self {
        self.alias_source = aliases.into();
        self
    }

    pub fn alias_target(mut self, aliases: impl Into<AliasMap>) -> Self {
        self.alias_target = aliases.into();
        self
    }
}

/// Nodes visible to the edges of one graph level: its own and every
/// sub-graph's.
pub(crate) struct NodeScope<'a> {
    pub(crate) nodes: &'a BTreeMap<ComponentId, Node>,
    pub(crate) graphs: &'a BTreeMap<ComponentId, Graph>,
}

impl<'a> NodeScope<'a> {
    pub(crate) fn find(&self, id: ComponentId) -> Option<&'a Node> {
        self.nodes
            .get(&id)
            .or_else(|| self.graphs.values().find_map(|g| g.node(id)))
    }
}

/// An edge owned by a graph.
pub struct Edge {
    pub(crate) id: ComponentId,
    pub(crate) name: Option<String>,
    pub(crate) state: State,
    pub(crate) model: Box<dyn EdgeModel>,
    pub(crate) source: ComponentId,
    pub(crate) target: ComponentId,
    pub(crate) alias_source: AliasMap,
    pub(crate) alias_target: AliasMap,
    pub(crate) flows: Option<Flows>,
    pub(crate) flows_cycle: Option<u64>,
    pub(crate) readers: Vec<ComponentId>,
    pub(crate) writers: Vec<ComponentId>,
    pub(crate) inbox: Vec<Payload>,
}

impl Edge {
    /// Builds the edge and checks its aliases against the endpoint states.
    pub(crate) fn new(
        id: ComponentId,
        spec: EdgeSpec,
        source: &Node,
        target: &Node,
    ) -> GraphResult<Self> {
        let label = label(spec.model.type_name(), spec.name.as_deref(), id);
        if spec.source == spec.target {
            return Err(GraphError::SelfLoop {
                edge: label,
                node: spec.source,
            });
        }
        for (aliases, node) in [(&spec.alias_source, source), (&spec.alias_target, target)] {
            let missing = aliases.iter().find(|(_, local)| !node.state.contains(local));
            if let Some((_, local)) = missing {
                return Err(GraphError::UnknownFlow {
                    edge: id,
                    node: node.id,
                    field: local.to_string(),
                });
            }
        }
        let state = spec.state.conform(&label, spec.model.fields())?;
        Ok(Self {
            id,
            name: spec.name,
            state,
            model: spec.model,
            source: spec.source,
            target: spec.target,
            alias_source: spec.alias_source,
            alias_target: spec.alias_target,
            flows: None,
            flows_cycle: None,
            readers: Vec::new(),
            writers: Vec::new(),
            inbox: Vec::new(),
        })
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn type_name(&self) -> &'static str {
        self.model.type_name()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn source(&self) -> ComponentId {
        self.source
    }

    pub fn target(&self) -> ComponentId {
        self.target
    }

    pub fn endpoint(&self, end: End) -> ComponentId {
        match end {
            End::Source => self.source,
            End::Target => self.target,
        }
    }

    pub fn alias(&self, end: End) -> &AliasMap {
        match end {
            End::Source => &self.alias_source,
            End::Target => &self.alias_target,
        }
    }

    /// Source-side field name for canonical `name`.
    pub fn get_field_source<'a>(&'a self, name: &'a str) -> &'a str {
        self.alias_source.resolve(name)
    }

    /// Target-side field name for canonical `name`.
    pub fn get_field_target<'a>(&'a self, name: &'a str) -> &'a str {
        self.alias_target.resolve(name)
    }

    /// Flows from the most recent calculation, whatever cycle it was.
    pub fn flows(&self) -> Option<&Flows> {
        self.flows.as_ref()
    }

    /// Flows only if they were calculated in `cycle`.
    pub fn flows_for(&self, cycle: u64) -> Option<&Flows> {
        match self.flows_cycle {
            Some(c) if c == cycle => self.flows.as_ref(),
            _ => None,
        }
    }

    pub fn readers(&self) -> &[ComponentId] {
        &self.readers
    }

    pub fn writers(&self) -> &[ComponentId] {
        &self.writers
    }

    pub fn pending(&self) -> &[Payload] {
        &self.inbox
    }

    pub fn label(&self) -> String {
        label(self.type_name(), self.name.as_deref(), self.id)
    }

    /// Signals, then flow calculation, then state; caches the flows for
    /// `cycle`. Fails if either endpoint has already integrated `cycle`.
    /// Commits nothing on failure.
    pub(crate) fn update(&mut self, dt: f64, cycle: u64, nodes: &NodeScope<'_>) -> GraphResult<()> {
        let source = nodes
            .find(self.source)
            .ok_or(GraphError::UnknownId { id: self.source })?;
        let target = nodes
            .find(self.target)
            .ok_or(GraphError::UnknownId { id: self.target })?;
        for node in [source, target] {
            if node.integrated_cycle == Some(cycle) {
                return Err(GraphError::NodeAlreadyIntegrated {
                    edge: self.id,
                    node: node.id,
                    cycle,
                });
            }
        }

        let mut working = self.state.clone();
        self.model
            .update_from_signals(&mut working, &self.inbox, dt)?;
        let ends = Endpoints::new(
            &source.state,
            &target.state,
            &self.alias_source,
            &self.alias_target,
        );
        let mut flows = self.model.calculate_flows(&mut working, ends, dt)?;
        self.model.update_from_state(&mut working, &mut flows, dt)?;
        flows.check_keys(self.id)?;

        self.state = working;
        self.flows = Some(flows);
        self.flows_cycle = Some(cycle);
        self.inbox.clear();
        tracing::trace!(edge = %self.id, cycle, "edge flows calculated");
        Ok(())
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("id", &self.id)
            .field("type", &self.type_name())
            .field("name", &self.name)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("state", &self.state)
            .finish()
    }
}
