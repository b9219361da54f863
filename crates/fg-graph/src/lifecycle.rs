//! Removing and replacing entities of a live graph.
//!
//! Every operation here validates first and mutates second, so a failed call
//! leaves the graph untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use fg_core::ComponentId;
use tracing::instrument;

use crate::controller::{Controller, ControllerSpec};
use crate::error::{GraphError, GraphResult};
use crate::flows::End;
use crate::graph::{Entity, Graph};

impl Graph {
    /// Removes a controller and its signals.
    pub fn remove_controller(&mut self, id: ComponentId) -> GraphResult<()> {
        let level = self
            .level_mut(id)
            .filter(|g| g.controllers.contains_key(&id))
            .ok_or(GraphError::UnknownId { id })?;
        if let Some(controller) = level.controllers.remove(&id) {
            level.detach_signals(&controller);
        }
        tracing::debug!(controller = %id, "controller removed");
        Ok(())
    }

    /// Removes an edge. Fails while a controller is connected to it.
    pub fn remove_edge(&mut self, id: ComponentId) -> GraphResult<()> {
        let edge = self.edge(id).ok_or(GraphError::UnknownId { id })?;
        let by = sorted(edge.readers.iter().chain(&edge.writers).copied());
        if !by.is_empty() {
            return Err(GraphError::InUse { id, by });
        }
        let level = self.level_mut(id).ok_or(GraphError::UnknownId { id })?;
        let Some(edge) = level.edges.remove(&id) else {
            return Err(GraphError::UnknownId { id });
        };
        // Endpoints may live below the edge's level, never above it.
        level.detach_edge(&edge);
        tracing::debug!(edge = %id, "edge removed");
        Ok(())
    }

    /// Removes a node. Fails while an edge or controller refers to it.
    pub fn remove_node(&mut self, id: ComponentId) -> GraphResult<()> {
        let node = self.node(id).ok_or(GraphError::UnknownId { id })?;
        let by = sorted(
            node.edges_incoming
                .iter()
                .chain(&node.edges_outgoing)
                .chain(&node.readers)
                .chain(&node.writers)
                .copied(),
        );
        if !by.is_empty() {
            return Err(GraphError::InUse { id, by });
        }
        if let Some(level) = self.level_mut(id) {
            level.nodes.remove(&id);
        }
        tracing::debug!(node = %id, "node removed");
        Ok(())
    }

    /// Removes a sub-graph and everything in it. Fails while anything
    /// outside it refers to anything inside.
    pub fn remove_graph(&mut self, id: ComponentId) -> GraphResult<()> {
        if id == self.id {
            return Err(GraphError::InvalidArg {
                what: "a graph cannot remove itself",
            });
        }
        let sub = self
            .graph(id)
            .ok_or(GraphError::UnknownId { id })?;
        let by = sorted(sub.inbound_references().into_iter().map(|(by, _)| by));
        if !by.is_empty() {
            return Err(GraphError::InUse { id, by });
        }
        if let Some(level) = self.level_mut(id) {
            level.graphs.remove(&id);
        }
        tracing::debug!(graph = %id, "graph removed");
        Ok(())
    }

    /// Replaces a controller's model, state and connections, keeping its id.
    #[instrument(level = "debug", skip(self, spec))]
    pub fn swap_controller(&mut self, id: ComponentId, spec: ControllerSpec) -> GraphResult<()> {
        let level = self
            .level_mut(id)
            .filter(|g| g.controllers.contains_key(&id))
            .ok_or(GraphError::UnknownId { id })?;
        for endpoint in spec.endpoints() {
            level.expect_endpoint(endpoint)?;
        }
        let replacement = Controller::new(id, spec)?;

        if let Some(old) = level.controllers.remove(&id) {
            level.detach_signals(&old);
        }
        level.attach_signals(&replacement);
        level.controllers.insert(id, replacement);
        Ok(())
    }

    /// Replaces sub-graph `id` with the graph `build` produces, keeping its
    /// id and name.
    ///
    /// Edges and controllers outside the sub-graph that referred to an
    /// entity inside it are rebound to the entity of the same kind and name
    /// in the replacement. Fails with `SwapUnresolved` when no such entity
    /// exists and with `ExternalReference` when a referrer is not part of
    /// this graph tree.
    #[instrument(level = "debug", skip(self, build))]
    pub fn swap_graph<F>(&mut self, id: ComponentId, build: F) -> GraphResult<()>
    where
        F: FnOnce(&mut Graph) -> GraphResult<()>,
    {
        if id == self.id {
            return Err(GraphError::InvalidArg {
                what: "a graph cannot swap itself",
            });
        }
        let old = self.graph(id).ok_or(GraphError::UnknownId { id })?;
        let mut replacement = Graph::with_allocator(
            id,
            old.name.clone(),
            Arc::clone(&self.ids),
            Arc::clone(&self.cycle),
            old.options,
        );
        replacement.time = old.time;
        build(&mut replacement)?;

        let rebind = self.plan_rebind(old, &replacement)?;

        // Back-references from the replacement's side.
        for (&by, targets) in &rebind {
            for (_, &to) in targets {
                if let Some(edge) = self.edge(by) {
                    let (source, target) = rebound_ends(edge.source, edge.target, targets);
                    if let Some(node) = replacement.node_mut(to) {
                        if source == to && !node.edges_outgoing.contains(&by) {
                            node.edges_outgoing.push(by);
                        }
                        if target == to && !node.edges_incoming.contains(&by) {
                            node.edges_incoming.push(by);
                        }
                    }
                } else if let Some(ctrl) = self.controller(by) {
                    let reads = ctrl.reads().any(|s| targets.get(&s.endpoint()) == Some(&to));
                    let writes = ctrl.writes().any(|s| targets.get(&s.endpoint()) == Some(&to));
                    if let Some((readers, writers)) = replacement.subscribers_mut(to) {
                        if reads && !readers.contains(&by) {
                            readers.push(by);
                        }
                        if writes && !writers.contains(&by) {
                            writers.push(by);
                        }
                    }
                }
            }
        }

        // Referrers on this side.
        for (by, targets) in &rebind {
            if let Some(edge) = self.edge_mut(*by) {
                let (source, target) = rebound_ends(edge.source, edge.target, targets);
                edge.source = source;
                edge.target = target;
            } else if let Some(ctrl) = self.controller_mut(*by) {
                for (&from, &to) in targets {
                    ctrl.rebind(from, to);
                }
            }
        }

        if let Some(level) = self.level_mut(id) {
            level.graphs.insert(id, replacement);
        }
        tracing::debug!(graph = %id, rebound = rebind.len(), "graph swapped");
        Ok(())
    }

    /// For every referrer outside `old`, the mapping from the old entities it
    /// refers to onto their counterparts in `replacement`.
    fn plan_rebind(
        &self,
        old: &Graph,
        replacement: &Graph,
    ) -> GraphResult<BTreeMap<ComponentId, BTreeMap<ComponentId, ComponentId>>> {
        let mut plan: BTreeMap<ComponentId, BTreeMap<ComponentId, ComponentId>> = BTreeMap::new();
        for (by, referenced) in old.inbound_references() {
            if !self.contains(by) {
                return Err(GraphError::ExternalReference {
                    id: referenced,
                    from: by,
                });
            }
            let entity = old
                .entity(referenced)
                .ok_or(GraphError::UnknownId { id: referenced })?;
            let kind = entity.kind();
            let name = entity.name().ok_or_else(|| GraphError::SwapUnresolved {
                id: referenced,
                kind,
                name: String::new(),
            })?;
            let counterpart = replacement
                .find_kind(kind, name)
                .ok_or_else(|| GraphError::SwapUnresolved {
                    id: referenced,
                    kind,
                    name: name.to_string(),
                })?;
            plan.entry(by).or_default().insert(referenced, counterpart.id());
        }

        for (&by, targets) in &plan {
            if let Some(edge) = self.edge(by) {
                let (source, target) = rebound_ends(edge.source, edge.target, targets);
                if source == target {
                    return Err(GraphError::SelfLoop {
                        edge: edge.label(),
                        node: source,
                    });
                }
                for (end, node_id) in [(End::Source, source), (End::Target, target)] {
                    let Some(node) = replacement.node(node_id) else {
                        continue;
                    };
                    let missing = edge.alias(end).iter().find(|(_, l)| !node.state.contains(l));
                    if let Some((_, local)) = missing {
                        return Err(GraphError::UnknownFlow {
                            edge: by,
                            node: node_id,
                            field: local.to_string(),
                        });
                    }
                }
            }
        }
        Ok(plan)
    }

    /// Entity of `kind` named `name` in this tree, lowest id first.
    fn find_kind(&self, kind: &str, name: &str) -> Option<Entity<'_>> {
        let mut found: Option<Entity<'_>> = None;
        self.visit(&mut |entity| {
            if entity.kind() == kind
                && entity.name() == Some(name)
                && found.is_none_or(|f| entity.id() < f.id())
            {
                found = Some(entity);
            }
        });
        found
    }

    /// Ids of this graph and everything below it.
    pub(crate) fn subtree_ids(&self) -> BTreeSet<ComponentId> {
        let mut ids = BTreeSet::new();
        self.visit(&mut |entity| {
            ids.insert(entity.id());
        });
        ids
    }

    /// `(referrer, referenced)` pairs where the referenced node or edge lies
    /// in this tree and the referring edge or controller does not.
    pub(crate) fn inbound_references(&self) -> Vec<(ComponentId, ComponentId)> {
        let inside = self.subtree_ids();
        let mut refs = Vec::new();
        self.visit(&mut |entity| {
            let (id, by): (ComponentId, Vec<ComponentId>) = match entity {
                Entity::Node(n) => (
                    n.id,
                    n.edges_incoming
                        .iter()
                        .chain(&n.edges_outgoing)
                        .chain(&n.readers)
                        .chain(&n.writers)
                        .copied()
                        .collect(),
                ),
                Entity::Edge(e) => (e.id, e.readers.iter().chain(&e.writers).copied().collect()),
                _ => return,
            };
            for referrer in by {
                if !inside.contains(&referrer) && !refs.contains(&(referrer, id)) {
                    refs.push((referrer, id));
                }
            }
        });
        refs
    }
}

fn rebound_ends(
    source: ComponentId,
    target: ComponentId,
    targets: &BTreeMap<ComponentId, ComponentId>,
) -> (ComponentId, ComponentId) {
    (
        targets.get(&source).copied().unwrap_or(source),
        targets.get(&target).copied().unwrap_or(target),
    )
}

fn sorted(ids: impl Iterator<Item = ComponentId>) -> Vec<ComponentId> {
    let set: BTreeSet<ComponentId> = ids.collect();
    set.into_iter().collect()
}
