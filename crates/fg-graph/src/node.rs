//! Nodes: the entities that hold conserved quantities.

use std::collections::BTreeMap;
use std::fmt;

use fg_core::ComponentId;

use crate::edge::Edge;
use crate::error::{GraphError, GraphResult};
use crate::flows::End;
use crate::signal::{Payload, apply_payloads};
use crate::state::{FieldSpec, State};
use crate::value::Value;

/// Behaviour of a node type.
///
/// The engine owns the state record and the integration of edge flows; a
/// model only declares its fields and may hook the signal and state phases.
pub trait NodeModel: Send + Sync {
    /// Stable type tag, used for labels and the snapshot registry.
    fn type_name(&self) -> &'static str;

    /// Declared state fields. Construction state must match exactly.
    fn fields(&self) -> &'static [FieldSpec];

    /// Apply commands staged by controllers during the previous cycle.
    ///
    /// Default: overwrite the named fields, latest command wins.
    fn update_from_signals(
        &mut self,
        state: &mut State,
        payloads: &[Payload],
        _dt: f64,
    ) -> GraphResult<()> {
        apply_payloads(state, self.type_name(), payloads)
    }

    /// Node-intrinsic dynamics after flows are integrated (e.g. decay).
    fn update_from_state(&mut self, _state: &mut State, _dt: f64) -> GraphResult<()> {
        Ok(())
    }
}

/// Everything needed to add a node to a graph.
pub struct NodeSpec {
    pub(crate) name: Option<String>,
    pub(crate) model: Box<dyn NodeModel>,
    pub(crate) state: State,
}

impl NodeSpec {
    pub fn new(model: impl NodeModel + 'static) -> Self {
        Self::boxed(Box::new(model))
    }

    pub fn boxed(model: Box<dyn NodeModel>) -> Self {
        Self {
            name: None,
            model,
            state: State::new(),
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
}

/// Edges visible from one graph level: its own plus every ancestor's.
pub(crate) struct EdgeScope<'a> {
    pub(crate) edges: &'a BTreeMap<ComponentId, Edge>,
    pub(crate) parent: Option<&'a EdgeScope<'a>>,
}

impl<'a> EdgeScope<'a> {
    pub(crate) fn find(&self, id: ComponentId) -> Option<&'a Edge> {
        self.edges
            .get(&id)
            .or_else(|| self.parent.and_then(|p| p.find(id)))
    }
}

/// A node owned by a graph.
pub struct Node {
    pub(crate) id: ComponentId,
    pub(crate) name: Option<String>,
    pub(crate) state: State,
    pub(crate) model: Box<dyn NodeModel>,
    pub(crate) edges_incoming: Vec<ComponentId>,
    pub(crate) edges_outgoing: Vec<ComponentId>,
    pub(crate) readers: Vec<ComponentId>,
    pub(crate) writers: Vec<ComponentId>,
    pub(crate) inbox: Vec<Payload>,
    pub(crate) integrated_cycle: Option<u64>,
}

impl Node {
    pub(crate) fn new(id: ComponentId, spec: NodeSpec) -> GraphResult<Self> {
        let label = label(spec.model.type_name(), spec.name.as_deref(), id);
        let state = spec.state.conform(&label, spec.model.fields())?;
        Ok(Self {
            id,
            name: spec.name,
            state,
            model: spec.model,
            edges_incoming: Vec::new(),
            edges_outgoing: Vec::new(),
            readers: Vec::new(),
            writers: Vec::new(),
            inbox: Vec::new(),
            integrated_cycle: None,
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

    /// Edges whose target is this node.
    pub fn edges_incoming(&self) -> &[ComponentId] {
        &self.edges_incoming
    }

    /// Edges whose source is this node.
    pub fn edges_outgoing(&self) -> &[ComponentId] {
        &self.edges_outgoing
    }

    /// Controllers reading this node.
    pub fn readers(&self) -> &[ComponentId] {
        &self.readers
    }

    /// Controllers writing this node.
    pub fn writers(&self) -> &[ComponentId] {
        &self.writers
    }

    /// Commands waiting for the next signal phase.
    pub fn pending(&self) -> &[Payload] {
        &self.inbox
    }

    pub fn label(&self) -> String {
        label(self.type_name(), self.name.as_deref(), self.id)
    }

    /// Attached edges in id order, with this node's end of each.
    fn attached(&self) -> Vec<(ComponentId, End)> {
        let mut all: Vec<(ComponentId, End)> = self
            .edges_incoming
            .iter()
            .map(|&e| (e, End::Target))
            .chain(self.edges_outgoing.iter().map(|&e| (e, End::Source)))
            .collect();
        all.sort_by_key(|(e, _)| *e);
        all
    }

    /// Fails unless every attached edge has flows for `cycle` and the node
    /// has not integrated them yet.
    pub(crate) fn check_ready(&self, cycle: u64, edges: &EdgeScope<'_>) -> GraphResult<()> {
        if self.integrated_cycle == Some(cycle) {
            return Err(GraphError::AlreadyIntegrated {
                node: self.id,
                cycle,
            });
        }
        for (edge_id, _) in self.attached() {
            let edge = edges
                .find(edge_id)
                .ok_or(GraphError::UnknownId { id: edge_id })?;
            if edge.flows_for(cycle).is_none() {
                return Err(GraphError::FlowsNotCalculated {
                    node: self.id,
                    edge: edge_id,
                });
            }
        }
        Ok(())
    }

    /// Signals, then flow integration, then intrinsic dynamics, committed
    /// only if every phase succeeds.
    pub(crate) fn update(
        &mut self,
        dt: f64,
        cycle: u64,
        edges: &EdgeScope<'_>,
        validate_materials: bool,
    ) -> GraphResult<()> {
        let state = self.stage(dt, cycle, edges, validate_materials)?;
        self.commit(state, cycle);
        Ok(())
    }

    /// Runs every phase on a copy of the state and returns it. The node's
    /// state, inbox and cycle tag are left untouched.
    pub(crate) fn stage(
        &mut self,
        dt: f64,
        cycle: u64,
        edges: &EdgeScope<'_>,
        validate_materials: bool,
    ) -> GraphResult<State> {
        self.check_ready(cycle, edges)?;

        let mut working = self.state.clone();
        self.model
            .update_from_signals(&mut working, &self.inbox, dt)?;
        self.integrate(&mut working, dt, cycle, edges)?;
        self.model.update_from_state(&mut working, dt)?;
        if validate_materials {
            validate_state(&working, &self.label())?;
        }
        Ok(working)
    }

    pub(crate) fn commit(&mut self, state: State, cycle: u64) {
        self.state = state;
        self.inbox.clear();
        self.integrated_cycle = Some(cycle);
        tracing::trace!(node = %self.id, cycle, "node updated");
    }

    fn integrate(
        &self,
        working: &mut State,
        dt: f64,
        cycle: u64,
        edges: &EdgeScope<'_>,
    ) -> GraphResult<()> {
        for (edge_id, end) in self.attached() {
            let edge = edges
                .find(edge_id)
                .ok_or(GraphError::UnknownId { id: edge_id })?;
            let flows = edge.flows_for(cycle).ok_or(GraphError::FlowsNotCalculated {
                node: self.id,
                edge: edge_id,
            })?;
            let aliases = edge.alias(end);
            for (name, rate, factor) in flows.contributions(end) {
                let local = aliases.resolve(name);
                let current = working.get(local).ok_or_else(|| GraphError::UnknownFlow {
                    edge: edge_id,
                    node: self.id,
                    field: local.to_string(),
                })?;
                let next = current.accumulate(rate, factor * dt).map_err(|err| {
                    GraphError::IncompatibleFlow {
                        edge: edge_id,
                        node: self.id,
                        field: local.to_string(),
                        reason: err.to_string(),
                    }
                })?;
                working.set(local, next)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn label(type_name: &str, name: Option<&str>, id: ComponentId) -> String {
    match name {
        Some(name) => format!("{type_name}({name})"),
        None => format!("{type_name}({id})"),
    }
}

pub(crate) fn validate_state(state: &State, owner: &str) -> GraphResult<()> {
    for (field, value) in state.iter() {
        if let Value::Material(m) = value {
            m.validate().map_err(|source| GraphError::NonPhysical {
                owner: owner.to_string(),
                field: field.to_string(),
                source,
            })?;
        }
    }
    Ok(())
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type", &self.type_name())
            .field("name", &self.name)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter;

    impl NodeModel for Counter {
        fn type_name(&self) -> &'static str {
            "Counter"
        }

        fn fields(&self) -> &'static [FieldSpec] {
            const FIELDS: &[FieldSpec] = &[FieldSpec::scalar("count").with_default(0.0)];
            FIELDS
        }

        fn update_from_state(&mut self, state: &mut State, dt: f64) -> GraphResult<()> {
            let count = state.scalar("count")?;
            state.set("count", count + dt)
        }
    }

    fn no_edges() -> BTreeMap<ComponentId, Edge> {
        BTreeMap::new()
    }

    #[test]
    fn new_conforms_state_and_labels() {
        let node = Node::new(ComponentId::from_index(3), NodeSpec::new(Counter)).unwrap();
        assert_eq!(node.state().scalar("count").unwrap(), 0.0);
        assert_eq!(node.label(), "Counter(3)");

        let named =
            Node::new(ComponentId::from_index(3), NodeSpec::new(Counter).named("c")).unwrap();
        assert_eq!(named.label(), "Counter(c)");
    }

    #[test]
    fn unconnected_node_runs_all_phases() {
        let edges = no_edges();
        let scope = EdgeScope {
            edges: &edges,
            parent: None,
        };
        let mut node = Node::new(ComponentId::from_index(0), NodeSpec::new(Counter)).unwrap();
        node.inbox.push(Payload::new().with("count", 10.0));
        node.update(0.5, 1, &scope, false).unwrap();
        assert_eq!(node.state().scalar("count").unwrap(), 10.5);
        assert!(node.pending().is_empty());
    }

    #[test]
    fn failed_update_keeps_state_and_inbox() {
        let edges = no_edges();
        let scope = EdgeScope {
            edges: &edges,
            parent: None,
        };
        let mut node = Node::new(ComponentId::from_index(0), NodeSpec::new(Counter)).unwrap();
        node.inbox.push(Payload::new().with("bogus", 1.0));
        assert!(matches!(
            node.update(0.5, 1, &scope, false),
            Err(GraphError::UnknownSignalField { .. })
        ));
        assert_eq!(node.state().scalar("count").unwrap(), 0.0);
        assert_eq!(node.pending().len(), 1);
    }

    #[test]
    fn second_integration_in_a_cycle_is_rejected() {
        let edges = no_edges();
        let scope = EdgeScope {
            edges: &edges,
            parent: None,
        };
        let mut node = Node::new(ComponentId::from_index(0), NodeSpec::new(Counter)).unwrap();
        node.update(0.1, 7, &scope, false).unwrap();
        assert!(matches!(
            node.update(0.1, 7, &scope, false),
            Err(GraphError::AlreadyIntegrated { cycle: 7, .. })
        ));
    }

    #[test]
    fn staging_leaves_node_untouched() {
        let edges = no_edges();
        let scope = EdgeScope {
            edges: &edges,
            parent: None,
        };
        let mut node = Node::new(ComponentId::from_index(0), NodeSpec::new(Counter)).unwrap();
        node.inbox.push(Payload::new().with("count", 2.0));
        let staged = node.stage(1.0, 3, &scope, false).unwrap();
        assert_eq!(staged.scalar("count").unwrap(), 3.0);
        assert_eq!(node.state().scalar("count").unwrap(), 0.0);
        assert_eq!(node.pending().len(), 1);
        assert_eq!(node.integrated_cycle, None);

        node.commit(staged, 3);
        assert_eq!(node.state().scalar("count").unwrap(), 3.0);
        assert!(node.pending().is_empty());
        assert_eq!(node.integrated_cycle, Some(3));
    }
}
