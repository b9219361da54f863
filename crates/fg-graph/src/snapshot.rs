//! Serializable graph snapshots.
//!
//! A snapshot records ids, names, type names, state, connectivity, alias
//! maps, pending commands, cycle count and time for the whole tree. Edge
//! flow caches and controller monitors are derived data and are rebuilt by
//! the next step.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use fg_core::{ComponentId, IdAllocator};
use serde::{Deserialize, Serialize};

use crate::alias::AliasMap;
use crate::controller::{Controller, ControllerSpec};
use crate::edge::{Edge, EdgeSpec};
use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::node::{Node, NodeSpec};
use crate::options::GraphOptions;
use crate::registry::Registry;
use crate::signal::Payload;
use crate::state::State;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub state: State,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending: Vec<Payload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source: ComponentId,
    pub target: ComponentId,
    #[serde(default, skip_serializing_if = "AliasMap::is_empty")]
    pub alias_source: AliasMap,
    #[serde(default, skip_serializing_if = "AliasMap::is_empty")]
    pub alias_target: AliasMap,
    pub state: State,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending: Vec<Payload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub connections: BTreeMap<String, ComponentId>,
    #[serde(default)]
    pub state: State,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub id: ComponentId,
    pub name: String,
    /// Next free id index. Present on the top-level snapshot only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_id: Option<u32>,
    #[serde(default)]
    pub options: GraphOptions,
    #[serde(default)]
    pub cycle: u64,
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub nodes: BTreeMap<ComponentId, NodeSnapshot>,
    #[serde(default)]
    pub edges: BTreeMap<ComponentId, EdgeSnapshot>,
    #[serde(default)]
    pub controllers: BTreeMap<ComponentId, ControllerSnapshot>,
    #[serde(default)]
    pub graphs: BTreeMap<ComponentId, GraphSnapshot>,
}

impl GraphSnapshot {
    fn ids(&self, out: &mut Vec<ComponentId>) {
        out.push(self.id);
        out.extend(self.nodes.keys());
        out.extend(self.edges.keys());
        out.extend(self.controllers.keys());
        for g in self.graphs.values() {
            g.ids(out);
        }
    }
}

impl Graph {
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut snap = self.snapshot_level();
        snap.next_id = Some(self.ids.peek());
        snap
    }

    fn snapshot_level(&self) -> GraphSnapshot {
        GraphSnapshot {
            id: self.id,
            name: self.name.clone(),
            next_id: None,
            options: self.options,
            cycle: self.cycle(),
            time: self.time,
            nodes: self
                .nodes
                .values()
                .map(|n| {
                    let snap = NodeSnapshot {
                        type_name: n.type_name().to_string(),
                        name: n.name.clone(),
                        state: n.state.clone(),
                        pending: n.inbox.clone(),
                    };
                    (n.id, snap)
                })
                .collect(),
            edges: self
                .edges
                .values()
                .map(|e| {
                    let snap = EdgeSnapshot {
                        type_name: e.type_name().to_string(),
                        name: e.name.clone(),
                        source: e.source,
                        target: e.target,
                        alias_source: e.alias_source.clone(),
                        alias_target: e.alias_target.clone(),
                        state: e.state.clone(),
                        pending: e.inbox.clone(),
                    };
                    (e.id, snap)
                })
                .collect(),
            controllers: self
                .controllers
                .values()
                .map(|c| {
                    let snap = ControllerSnapshot {
                        type_name: c.type_name().to_string(),
                        name: c.name.clone(),
                        connections: c.connections(),
                        state: c.state.clone(),
                    };
                    (c.id, snap)
                })
                .collect(),
            graphs: self
                .graphs
                .values()
                .map(|g| (g.id, g.snapshot_level()))
                .collect(),
        }
    }

    /// Rebuilds a graph tree. Nodes are restored first, then edges, then
    /// controllers, so every reference resolves regardless of level.
    pub fn from_snapshot(snapshot: &GraphSnapshot, registry: &Registry) -> GraphResult<Graph> {
        let mut all = Vec::new();
        snapshot.ids(&mut all);
        let mut seen = BTreeSet::new();
        for id in &all {
            if !seen.insert(*id) {
                return Err(GraphError::DuplicateId { id: *id });
            }
        }

        let ids = Arc::new(IdAllocator::starting_at(snapshot.next_id.unwrap_or(0)));
        if let Some(max) = seen.last() {
            ids.reserve_through(*max);
        }

        let cycle = Arc::new(AtomicU64::new(snapshot.cycle));
        let mut graph = Graph::restore_nodes(snapshot, registry, &ids, &cycle)?;
        graph.restore_edges(snapshot, registry)?;
        graph.restore_controllers(snapshot, registry)?;
        tracing::debug!(graph = %graph.id, entities = all.len(), "graph restored");
        Ok(graph)
    }

    fn restore_nodes(
        snap: &GraphSnapshot,
        registry: &Registry,
        ids: &Arc<IdAllocator>,
        cycle: &Arc<AtomicU64>,
    ) -> GraphResult<Graph> {
        let mut graph = Graph::with_allocator(
            snap.id,
            snap.name.clone(),
            Arc::clone(ids),
            Arc::clone(cycle),
            snap.options,
        );
        graph.time = snap.time;
        for (&id, ns) in &snap.nodes {
            let spec = NodeSpec {
                name: ns.name.clone(),
                model: registry.node(&ns.type_name)?,
                state: ns.state.clone(),
            };
            let mut node = Node::new(id, spec)?;
            node.inbox = ns.pending.clone();
            graph.nodes.insert(id, node);
        }
        for (&id, gs) in &snap.graphs {
            graph.graphs.insert(id, Graph::restore_nodes(gs, registry, ids, cycle)?);
        }
        Ok(graph)
    }

    fn restore_edges(&mut self, snap: &GraphSnapshot, registry: &Registry) -> GraphResult<()> {
        for (&id, es) in &snap.edges {
            let spec = EdgeSpec {
                name: es.name.clone(),
                model: registry.edge(&es.type_name)?,
                state: es.state.clone(),
                source: es.source,
                target: es.target,
                alias_source: es.alias_source.clone(),
                alias_target: es.alias_target.clone(),
            };
            let source = self.expect_node(spec.source)?;
            let target = self.expect_node(spec.target)?;
            let mut edge = Edge::new(id, spec, source, target)?;
            edge.inbox = es.pending.clone();
            self.attach_edge(&edge);
            self.edges.insert(id, edge);
        }
        for (id, gs) in &snap.graphs {
            let child = self.graphs.get_mut(id).ok_or(GraphError::UnknownId { id: *id })?;
            child.restore_edges(gs, registry)?;
        }
        Ok(())
    }

    fn restore_controllers(
        &mut self,
        snap: &GraphSnapshot,
        registry: &Registry,
    ) -> GraphResult<()> {
        for (&id, cs) in &snap.controllers {
            let spec = ControllerSpec {
                name: cs.name.clone(),
                model: registry.controller(&cs.type_name)?,
                state: cs.state.clone(),
                connections: cs.connections.clone(),
            };
            for endpoint in spec.endpoints() {
                self.expect_endpoint(endpoint)?;
            }
            let controller = Controller::new(id, spec)?;
            self.attach_signals(&controller);
            self.controllers.insert(id, controller);
        }
        for (id, gs) in &snap.graphs {
            let child = self.graphs.get_mut(id).ok_or(GraphError::UnknownId { id: *id })?;
            child.restore_controllers(gs, registry)?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> GraphResult<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    pub fn from_json(json: &str, registry: &Registry) -> GraphResult<Graph> {
        let snapshot: GraphSnapshot = serde_json::from_str(json)?;
        Graph::from_snapshot(&snapshot, registry)
    }

    pub fn to_yaml(&self) -> GraphResult<String> {
        Ok(serde_yaml::to_string(&self.snapshot())?)
    }

    pub fn from_yaml(yaml: &str, registry: &Registry) -> GraphResult<Graph> {
        let snapshot: GraphSnapshot = serde_yaml::from_str(yaml)?;
        Graph::from_snapshot(&snapshot, registry)
    }
}
