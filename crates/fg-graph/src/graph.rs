//! The graph: owner of nodes, edges, controllers and sub-graphs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fg_core::{ComponentId, IdAllocator};

use crate::controller::{Controller, ControllerSpec};
use crate::edge::{Edge, EdgeSpec};
use crate::error::{GraphError, GraphResult};
use crate::node::{Node, NodeSpec};
use crate::options::GraphOptions;
use crate::signal::Direction;

/// Borrowed view of any entity in a graph tree.
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    Node(&'a Node),
    Edge(&'a Edge),
    Controller(&'a Controller),
    Graph(&'a Graph),
}

impl<'a> Entity<'a> {
    pub fn id(&self) -> ComponentId {
        match self {
            Entity::Node(n) => n.id(),
            Entity::Edge(e) => e.id(),
            Entity::Controller(c) => c.id(),
            Entity::Graph(g) => g.id(),
        }
    }

    pub fn name(&self) -> Option<&'a str> {
        match *self {
            Entity::Node(n) => n.name(),
            Entity::Edge(e) => e.name(),
            Entity::Controller(c) => c.name(),
            Entity::Graph(g) => Some(g.name()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Entity::Node(_) => "node",
            Entity::Edge(_) => "edge",
            Entity::Controller(_) => "controller",
            Entity::Graph(_) => "graph",
        }
    }

    pub fn as_node(&self) -> Option<&'a Node> {
        match *self {
            Entity::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<&'a Edge> {
        match *self {
            Entity::Edge(e) => Some(e),
            _ => None,
        }
    }
}

/// A conservation graph.
///
/// Edges at one level may connect nodes of that level and of any sub-graph
/// below it. Controllers may observe and command nodes and edges of their
/// level and below. All graphs of one tree draw ids from a single allocator,
/// so ids are unique tree-wide, and count cycles on a single counter.
pub struct Graph {
    pub(crate) id: ComponentId,
    pub(crate) name: String,
    pub(crate) ids: Arc<IdAllocator>,
    pub(crate) options: GraphOptions,
    pub(crate) cycle: Arc<AtomicU64>,
    pub(crate) time: f64,
    pub(crate) nodes: BTreeMap<ComponentId, Node>,
    pub(crate) edges: BTreeMap<ComponentId, Edge>,
    pub(crate) controllers: BTreeMap<ComponentId, Controller>,
    pub(crate) graphs: BTreeMap<ComponentId, Graph>,
}

impl Graph {
    /// Root graph. It takes id 0; entities start at 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_allocator(
            ComponentId::from_index(0),
            name.into(),
            Arc::new(IdAllocator::starting_at(1)),
            Arc::new(AtomicU64::new(0)),
            GraphOptions::default(),
        )
    }

    pub(crate) fn with_allocator(
        id: ComponentId,
        name: String,
        ids: Arc<IdAllocator>,
        cycle: Arc<AtomicU64>,
        options: GraphOptions,
    ) -> Self {
        Self {
            id,
            name,
            ids,
            options,
            cycle,
            time: 0.0,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            controllers: BTreeMap::new(),
            graphs: BTreeMap::new(),
        }
    }

    pub fn with_options(mut self, options: GraphOptions) -> Self {
        self.set_options(options);
        self
    }

    /// Replace the options here and in every sub-graph.
    pub fn set_options(&mut self, options: GraphOptions) {
        self.options = options;
        for g in self.graphs.values_mut() {
            g.set_options(options);
        }
    }

    pub fn options(&self) -> GraphOptions {
        self.options
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simulated time, advanced by `dt` after each completed step.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of cycles begun anywhere in this tree.
    pub fn cycle(&self) -> u64 {
        self.cycle.load(Ordering::Acquire)
    }

    /// Nodes of this level, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn controllers(&self) -> impl Iterator<Item = &Controller> {
        self.controllers.values()
    }

    /// Direct sub-graphs.
    pub fn graphs(&self) -> impl Iterator<Item = &Graph> {
        self.graphs.values()
    }

    // --- construction ---

    pub fn add_node(&mut self, spec: NodeSpec) -> GraphResult<ComponentId> {
        let id = self.ids.allocate()?;
        let node = Node::new(id, spec)?;
        tracing::debug!(graph = %self.id, node = %id, kind = node.type_name(), "node added");
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Adds an edge between two nodes of this level or of sub-graphs.
    pub fn add_edge(&mut self, spec: EdgeSpec) -> GraphResult<ComponentId> {
        let source = self.expect_node(spec.source)?;
        let target = self.expect_node(spec.target)?;
        let id = self.ids.allocate()?;
        let edge = Edge::new(id, spec, source, target)?;
        self.attach_edge(&edge);
        tracing::debug!(graph = %self.id, edge = %id, kind = edge.type_name(), "edge added");
        self.edges.insert(id, edge);
        Ok(id)
    }

    /// Adds a controller whose endpoints are nodes or edges of this level
    /// or of sub-graphs.
    pub fn add_controller(&mut self, spec: ControllerSpec) -> GraphResult<ComponentId> {
        for endpoint in spec.endpoints() {
            self.expect_endpoint(endpoint)?;
        }
        let id = self.ids.allocate()?;
        let controller = Controller::new(id, spec)?;
        self.attach_signals(&controller);
        tracing::debug!(
            graph = %self.id,
            controller = %id,
            kind = controller.type_name(),
            "controller added"
        );
        self.controllers.insert(id, controller);
        Ok(id)
    }

    /// Adds an empty sub-graph sharing this graph's allocator, options,
    /// cycle counter and time.
    pub fn add_graph(&mut self, name: impl Into<String>) -> GraphResult<&mut Graph> {
        let id = self.ids.allocate()?;
        let mut child = Graph::with_allocator(
            id,
            name.into(),
            Arc::clone(&self.ids),
            Arc::clone(&self.cycle),
            self.options,
        );
        child.time = self.time;
        Ok(self.graphs.entry(id).or_insert(child))
    }

    // --- lookup ---

    /// Node anywhere in this tree.
    pub fn node(&self, id: ComponentId) -> Option<&Node> {
        self.nodes
            .get(&id)
            .or_else(|| self.graphs.values().find_map(|g| g.node(id)))
    }

    pub fn edge(&self, id: ComponentId) -> Option<&Edge> {
        self.edges
            .get(&id)
            .or_else(|| self.graphs.values().find_map(|g| g.edge(id)))
    }

    pub fn controller(&self, id: ComponentId) -> Option<&Controller> {
        self.controllers
            .get(&id)
            .or_else(|| self.graphs.values().find_map(|g| g.controller(id)))
    }

    /// This graph or a sub-graph at any depth.
    pub fn graph(&self, id: ComponentId) -> Option<&Graph> {
        if id == self.id {
            return Some(self);
        }
        self.graphs.values().find_map(|g| g.graph(id))
    }

    pub fn graph_mut(&mut self, id: ComponentId) -> Option<&mut Graph> {
        if id == self.id {
            return Some(self);
        }
        self.graphs.values_mut().find_map(|g| g.graph_mut(id))
    }

    pub(crate) fn node_mut(&mut self, id: ComponentId) -> Option<&mut Node> {
        self.level_mut(id).and_then(|g| g.nodes.get_mut(&id))
    }

    pub(crate) fn edge_mut(&mut self, id: ComponentId) -> Option<&mut Edge> {
        self.level_mut(id).and_then(|g| g.edges.get_mut(&id))
    }

    pub(crate) fn controller_mut(&mut self, id: ComponentId) -> Option<&mut Controller> {
        self.level_mut(id).and_then(|g| g.controllers.get_mut(&id))
    }

    /// Whether this level itself owns `id`.
    pub(crate) fn owns(&self, id: ComponentId) -> bool {
        self.nodes.contains_key(&id)
            || self.edges.contains_key(&id)
            || self.controllers.contains_key(&id)
            || self.graphs.contains_key(&id)
    }

    /// The graph level that directly owns `id`.
    pub(crate) fn level(&self, id: ComponentId) -> Option<&Graph> {
        if self.owns(id) {
            return Some(self);
        }
        self.graphs.values().find_map(|g| g.level(id))
    }

    pub(crate) fn level_mut(&mut self, id: ComponentId) -> Option<&mut Graph> {
        if self.owns(id) {
            return Some(self);
        }
        self.graphs.values_mut().find_map(|g| g.level_mut(id))
    }

    /// Any entity in this tree, this graph included.
    pub fn entity(&self, id: ComponentId) -> Option<Entity<'_>> {
        if id == self.id {
            return Some(Entity::Graph(self));
        }
        let level = self.level(id)?;
        if let Some(n) = level.nodes.get(&id) {
            Some(Entity::Node(n))
        } else if let Some(e) = level.edges.get(&id) {
            Some(Entity::Edge(e))
        } else if let Some(c) = level.controllers.get(&id) {
            Some(Entity::Controller(c))
        } else {
            level.graphs.get(&id).map(Entity::Graph)
        }
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.entity(id).is_some()
    }

    /// Entity named `name` anywhere in this tree. Names need not be unique;
    /// the lowest id wins.
    pub fn find(&self, name: &str) -> Option<Entity<'_>> {
        let mut found: Option<Entity<'_>> = None;
        self.visit(&mut |entity| {
            if entity.name() == Some(name) && found.is_none_or(|f| entity.id() < f.id()) {
                found = Some(entity);
            }
        });
        found
    }

    /// Calls `f` for this graph and every entity below it, level by level.
    pub fn visit<'a>(&'a self, f: &mut dyn FnMut(Entity<'a>)) {
        f(Entity::Graph(self));
        self.nodes.values().for_each(|n| f(Entity::Node(n)));
        self.edges.values().for_each(|e| f(Entity::Edge(e)));
        self.controllers.values().for_each(|c| f(Entity::Controller(c)));
        for g in self.graphs.values() {
            g.visit(f);
        }
    }

    pub(crate) fn expect_node(&self, id: ComponentId) -> GraphResult<&Node> {
        match self.entity(id) {
            Some(Entity::Node(n)) => Ok(n),
            Some(other) => Err(GraphError::WrongKind {
                id,
                expected: "node",
                found: other.kind(),
            }),
            None => Err(GraphError::UnknownId { id }),
        }
    }

    pub(crate) fn expect_endpoint(&self, id: ComponentId) -> GraphResult<()> {
        match self.entity(id) {
            Some(Entity::Node(_) | Entity::Edge(_)) => Ok(()),
            Some(other) => Err(GraphError::InvalidEndpoint {
                id,
                kind: other.kind(),
            }),
            None => Err(GraphError::UnknownId { id }),
        }
    }

    // --- back-references ---

    pub(crate) fn attach_edge(&mut self, edge: &Edge) {
        if let Some(n) = self.node_mut(edge.source) {
            n.edges_outgoing.push(edge.id);
        }
        if let Some(n) = self.node_mut(edge.target) {
            n.edges_incoming.push(edge.id);
        }
    }

    pub(crate) fn detach_edge(&mut self, edge: &Edge) {
        if let Some(n) = self.node_mut(edge.source) {
            n.edges_outgoing.retain(|&e| e != edge.id);
        }
        if let Some(n) = self.node_mut(edge.target) {
            n.edges_incoming.retain(|&e| e != edge.id);
        }
    }

    pub(crate) fn attach_signals(&mut self, controller: &Controller) {
        let id = controller.id;
        for signal in controller.reads().chain(controller.writes()) {
            if let Some((readers, writers)) = self.subscribers_mut(signal.endpoint()) {
                let list = match signal.direction() {
                    Direction::Read => readers,
                    Direction::Write => writers,
                };
                if !list.contains(&id) {
                    list.push(id);
                }
            }
        }
    }

    pub(crate) fn detach_signals(&mut self, controller: &Controller) {
        let id = controller.id;
        for endpoint in controller.endpoints() {
            if let Some((readers, writers)) = self.subscribers_mut(endpoint) {
                readers.retain(|&c| c != id);
                writers.retain(|&c| c != id);
            }
        }
    }

    /// Reader and writer lists of a node or edge.
    pub(crate) fn subscribers_mut(
        &mut self,
        endpoint: ComponentId,
    ) -> Option<(&mut Vec<ComponentId>, &mut Vec<ComponentId>)> {
        let level = self.level_mut(endpoint)?;
        if let Some(n) = level.nodes.get_mut(&endpoint) {
            return Some((&mut n.readers, &mut n.writers));
        }
        level
            .edges
            .get_mut(&endpoint)
            .map(|e| (&mut e.readers, &mut e.writers))
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("cycle", &self.cycle())
            .field("time", &self.time)
            .field("nodes", &self.nodes.values().collect::<Vec<_>>())
            .field("edges", &self.edges.values().collect::<Vec<_>>())
            .field("controllers", &self.controllers.values().collect::<Vec<_>>())
            .field("graphs", &self.graphs.values().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FieldSpec, State};
    use crate::node::NodeModel;

    struct Bucket;

    impl NodeModel for Bucket {
        fn type_name(&self) -> &'static str {
            "Bucket"
        }

        fn fields(&self) -> &'static [FieldSpec] {
            const FIELDS: &[FieldSpec] = &[FieldSpec::scalar("level")];
            FIELDS
        }
    }

    fn bucket(name: &str) -> NodeSpec {
        NodeSpec::new(Bucket).named(name).state(State::new().with("level", 1.0))
    }

    #[test]
    fn ids_are_unique_across_sub_graphs() {
        let mut g = Graph::new("plant");
        let a = g.add_node(bucket("a")).unwrap();
        let sub = g.add_graph("loop").unwrap();
        let sub_id = sub.id();
        let b = sub.add_node(bucket("b")).unwrap();

        let mut all = vec![g.id(), a, sub_id, b];
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 4);
        assert_eq!(g.node(b).and_then(Node::name), Some("b"));
        assert_eq!(g.entity(sub_id).map(|e| e.kind()), Some("graph"));
    }

    #[test]
    fn find_returns_lowest_id() {
        let mut g = Graph::new("plant");
        let first = g.add_node(bucket("tank")).unwrap();
        g.add_graph("sub").unwrap().add_node(bucket("tank")).unwrap();
        assert_eq!(g.find("tank").map(|e| e.id()), Some(first));
        assert!(g.find("nothing").is_none());
    }

    #[test]
    fn sub_graph_inherits_options() {
        let opts = GraphOptions {
            parallel: true,
            validate_materials: false,
        };
        let mut g = Graph::new("plant").with_options(opts);
        let sub = g.add_graph("sub").unwrap().id();
        assert_eq!(g.graph(sub).map(Graph::options), Some(opts));

        g.set_options(GraphOptions::default());
        assert_eq!(g.graph(sub).map(Graph::options), Some(GraphOptions::default()));
    }

    #[test]
    fn endpoint_kind_is_checked() {
        let mut g = Graph::new("plant");
        let sub = g.add_graph("sub").unwrap().id();
        assert!(matches!(
            g.expect_endpoint(sub),
            Err(GraphError::InvalidEndpoint { kind: "graph", .. })
        ));
        assert!(matches!(
            g.expect_node(ComponentId::from_index(99)),
            Err(GraphError::UnknownId { .. })
        ));
    }
}
