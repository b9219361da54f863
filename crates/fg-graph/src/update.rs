//! Stepping: the three-phase cycle.
//!
//! One step runs every edge, then every node, then every controller in the
//! whole tree, and advances time. Edges read node state from the start of
//! the cycle, nodes integrate the flows computed in this cycle, and commands
//! written by controllers land in inboxes that are only drained in the next
//! cycle.

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;

use fg_core::{ComponentId, ensure_positive};
use rayon::prelude::*;
use tracing::instrument;

use crate::controller::{Controller, Monitor, Reading};
use crate::edge::NodeScope;
use crate::error::{GraphError, GraphResult};
use crate::graph::{Entity, Graph};
use crate::node::EdgeScope;
use crate::signal::Payload;
use crate::state::State;

impl Graph {
    /// Runs `steps` full cycles of length `dt`.
    #[instrument(level = "debug", skip(self), fields(graph = %self.id))]
    pub fn update(&mut self, dt: f64, steps: usize) -> GraphResult<()> {
        ensure_positive(dt, "dt must be finite and positive")?;
        for _ in 0..steps {
            self.step(dt)?;
        }
        tracing::debug!(cycle = self.cycle(), time = self.time, "steps complete");
        Ok(())
    }

    /// One full cycle.
    pub fn step(&mut self, dt: f64) -> GraphResult<()> {
        ensure_positive(dt, "dt must be finite and positive")?;
        self.begin_cycle();
        self.update_edges(dt)?;
        self.update_nodes(dt)?;
        self.update_controllers(dt)?;
        self.advance_time(dt);
        Ok(())
    }

    /// Opens a new cycle. The counter is shared by the whole tree, so a
    /// sub-graph stepped on its own never reuses a cycle number of the root.
    pub fn begin_cycle(&mut self) {
        self.cycle.fetch_add(1, Ordering::AcqRel);
    }

    pub fn advance_time(&mut self, dt: f64) {
        self.time += dt;
        for g in self.graphs.values_mut() {
            g.advance_time(dt);
        }
    }

    /// Edge phase over the whole tree.
    pub fn update_edges(&mut self, dt: f64) -> GraphResult<()> {
        let cycle = self.cycle();
        self.edges_phase(dt, cycle)
    }

    fn edges_phase(&mut self, dt: f64, cycle: u64) -> GraphResult<()> {
        let Graph {
            nodes,
            edges,
            graphs,
            options,
            ..
        } = self;
        let scope = NodeScope { nodes, graphs };
        if options.parallel {
            edges
                .par_iter_mut()
                .try_for_each(|(_, edge)| edge.update(dt, cycle, &scope))?;
        } else {
            for edge in edges.values_mut() {
                edge.update(dt, cycle, &scope)?;
            }
        }
        for g in graphs.values_mut() {
            g.edges_phase(dt, cycle)?;
        }
        Ok(())
    }

    /// Node phase over the whole tree.
    ///
    /// Every node's preconditions are checked, then every node is updated
    /// into a working copy. States are committed only once all of them
    /// succeeded, so a failure leaves the whole tree at the previous step.
    pub fn update_nodes(&mut self, dt: f64) -> GraphResult<()> {
        let cycle = self.cycle();
        self.check_nodes(cycle, None)?;
        let mut staged = BTreeMap::new();
        self.stage_nodes(dt, cycle, None, &mut staged)?;
        self.commit_nodes(cycle, &mut staged);
        Ok(())
    }

    fn check_nodes(&self, cycle: u64, parent: Option<&EdgeScope<'_>>) -> GraphResult<()> {
        let scope = EdgeScope {
            edges: &self.edges,
            parent,
        };
        for node in self.nodes.values() {
            node.check_ready(cycle, &scope)?;
        }
        for g in self.graphs.values() {
            g.check_nodes(cycle, Some(&scope))?;
        }
        Ok(())
    }

    fn stage_nodes(
        &mut self,
        dt: f64,
        cycle: u64,
        parent: Option<&EdgeScope<'_>>,
        staged: &mut BTreeMap<ComponentId, State>,
    ) -> GraphResult<()> {
        let Graph {
            nodes,
            edges,
            graphs,
            options,
            ..
        } = self;
        let scope = EdgeScope { edges, parent };
        let validate = options.validate_materials;
        let level: Vec<(ComponentId, State)> = if options.parallel {
            nodes
                .par_iter_mut()
                .map(|(&id, node)| node.stage(dt, cycle, &scope, validate).map(|s| (id, s)))
                .collect::<GraphResult<_>>()?
        } else {
            nodes
                .iter_mut()
                .map(|(&id, node)| node.stage(dt, cycle, &scope, validate).map(|s| (id, s)))
                .collect::<GraphResult<_>>()?
        };
        staged.extend(level);
        for g in graphs.values_mut() {
            g.stage_nodes(dt, cycle, Some(&scope), staged)?;
        }
        Ok(())
    }

    fn commit_nodes(&mut self, cycle: u64, staged: &mut BTreeMap<ComponentId, State>) {
        for (id, node) in self.nodes.iter_mut() {
            if let Some(state) = staged.remove(id) {
                node.commit(state, cycle);
            }
        }
        for g in self.graphs.values_mut() {
            g.commit_nodes(cycle, staged);
        }
    }

    /// Controller phase over the whole tree.
    ///
    /// Within one level every controller observes the same state; commands
    /// are delivered afterwards in controller id order.
    pub fn update_controllers(&mut self, dt: f64) -> GraphResult<()> {
        let monitors = self
            .controllers
            .values()
            .map(|c| self.observe(c))
            .collect::<GraphResult<Vec<Monitor>>>()?;

        let parallel = self.options.parallel;
        let jobs: Vec<_> = self.controllers.values_mut().zip(monitors).collect();
        let outboxes: Vec<Vec<(ComponentId, Payload)>> = if parallel {
            jobs.into_par_iter()
                .map(|(ctrl, monitor)| ctrl.run(monitor, dt))
                .collect::<GraphResult<_>>()?
        } else {
            jobs.into_iter()
                .map(|(ctrl, monitor)| ctrl.run(monitor, dt))
                .collect::<GraphResult<_>>()?
        };
        for (endpoint, payload) in outboxes.into_iter().flatten() {
            self.deliver(endpoint, payload)?;
        }

        for g in self.graphs.values_mut() {
            g.update_controllers(dt)?;
        }
        Ok(())
    }

    /// Runs one edge against the current cycle.
    pub fn update_edge(&mut self, id: ComponentId, dt: f64) -> GraphResult<()> {
        ensure_positive(dt, "dt must be finite and positive")?;
        let cycle = self.cycle();
        let level = self
            .level_mut(id)
            .filter(|g| g.edges.contains_key(&id))
            .ok_or(GraphError::UnknownId { id })?;
        let Graph {
            nodes,
            edges,
            graphs,
            ..
        } = level;
        let edge = edges.get_mut(&id).ok_or(GraphError::UnknownId { id })?;
        edge.update(dt, cycle, &NodeScope { nodes, graphs })
    }

    /// Integrates one node for the current cycle. Call on the root graph so
    /// that edges of every ancestor level are visible.
    pub fn update_node(&mut self, id: ComponentId, dt: f64) -> GraphResult<()> {
        ensure_positive(dt, "dt must be finite and positive")?;
        let cycle = self.cycle();
        self.node_in_scope(id, dt, cycle, None)
            .unwrap_or(Err(GraphError::UnknownId { id }))
    }

    fn node_in_scope(
        &mut self,
        id: ComponentId,
        dt: f64,
        cycle: u64,
        parent: Option<&EdgeScope<'_>>,
    ) -> Option<GraphResult<()>> {
        let Graph {
            nodes,
            edges,
            graphs,
            options,
            ..
        } = self;
        let scope = EdgeScope { edges, parent };
        if let Some(node) = nodes.get_mut(&id) {
            return Some(node.update(dt, cycle, &scope, options.validate_materials));
        }
        graphs
            .values_mut()
            .find_map(|g| g.node_in_scope(id, dt, cycle, Some(&scope)))
    }

    /// Observes, runs and delivers for one controller.
    pub fn update_controller(&mut self, id: ComponentId, dt: f64) -> GraphResult<()> {
        ensure_positive(dt, "dt must be finite and positive")?;
        let level = self
            .level_mut(id)
            .filter(|g| g.controllers.contains_key(&id))
            .ok_or(GraphError::UnknownId { id })?;
        let monitor = {
            let ctrl = level.controllers.get(&id).ok_or(GraphError::UnknownId { id })?;
            level.observe(ctrl)?
        };
        let ctrl = level
            .controllers
            .get_mut(&id)
            .ok_or(GraphError::UnknownId { id })?;
        for (endpoint, payload) in ctrl.run(monitor, dt)? {
            level.deliver(endpoint, payload)?;
        }
        Ok(())
    }

    /// Fresh readings for every read connection of `ctrl`.
    fn observe(&self, ctrl: &Controller) -> GraphResult<Monitor> {
        let readings: BTreeMap<String, Reading> = ctrl
            .reads()
            .map(|signal| {
                let id = signal.endpoint();
                let reading = match self.entity(id) {
                    Some(Entity::Node(n)) => Reading {
                        state: n.state.clone(),
                        flows: None,
                    },
                    Some(Entity::Edge(e)) => Reading {
                        state: e.state.clone(),
                        flows: e.flows.clone(),
                    },
                    Some(other) => {
                        return Err(GraphError::InvalidEndpoint {
                            id,
                            kind: other.kind(),
                        });
                    }
                    None => return Err(GraphError::UnknownId { id }),
                };
                Ok((signal.name().to_string(), reading))
            })
            .collect::<GraphResult<_>>()?;
        Ok(Monitor::from_readings(readings))
    }

    /// Queues `payload` for the endpoint's next signal phase.
    fn deliver(&mut self, endpoint: ComponentId, payload: Payload) -> GraphResult<()> {
        let level = self
            .level_mut(endpoint)
            .ok_or(GraphError::UnknownId { id: endpoint })?;
        if let Some(node) = level.nodes.get_mut(&endpoint) {
            node.inbox.push(payload);
        } else if let Some(edge) = level.edges.get_mut(&endpoint) {
            edge.inbox.push(payload);
        } else {
            return Err(GraphError::InvalidEndpoint {
                id: endpoint,
                kind: "non-signal entity",
            });
        }
        tracing::trace!(endpoint = %endpoint, "command queued");
        Ok(())
    }
}
