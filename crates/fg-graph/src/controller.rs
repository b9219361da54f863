//! Controllers: observe nodes and edges, send commands back one cycle later.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use fg_core::ComponentId;
use fg_materials::Material;

use crate::error::{GraphError, GraphResult};
use crate::flows::Flows;
use crate::node::label;
use crate::signal::{Direction, Payload, Signal};
use crate::state::{FieldSpec, State};
use crate::value::Value;

/// What a controller saw on one read connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub state: State,
    /// Most recent flows, for edge endpoints that have calculated any.
    pub flows: Option<Flows>,
}

/// Readings for every read connection, refreshed before each controller run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Monitor {
    readings: BTreeMap<String, Reading>,
}

impl Monitor {
    pub(crate) fn from_readings(readings: BTreeMap<String, Reading>) -> Self {
        Self { readings }
    }

    pub fn get(&self, name: &str) -> Option<&Reading> {
        self.readings.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Reading)> {
        self.readings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Behaviour of a controller type.
///
/// `required_read` and `required_write` have no default: every controller
/// type must state its connection contract.
pub trait ControllerModel: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn required_read(&self) -> &'static [&'static str];

    fn required_write(&self) -> &'static [&'static str];

    fn fields(&self) -> &'static [FieldSpec] {
        &[]
    }

    /// Control law. The monitor is already refreshed when this runs.
    fn update(&mut self, _ctx: &mut ControlContext<'_>, _dt: f64) -> GraphResult<()> {
        Ok(())
    }
}

/// The controller's view of the world during [`ControllerModel::update`].
pub struct ControlContext<'a> {
    owner: &'a str,
    monitor: &'a Monitor,
    state: &'a mut State,
    writes: &'a BTreeMap<String, Signal>,
    outbox: BTreeMap<String, Payload>,
}

impl<'a> ControlContext<'a> {
    fn unknown(&self, name: &str, direction: Direction) -> GraphError {
        GraphError::UnknownConnection {
            controller: self.owner.to_string(),
            name: name.to_string(),
            direction: direction.label(),
        }
    }

    fn reading(&self, name: &str) -> GraphResult<&'a Reading> {
        self.monitor
            .get(name)
            .ok_or_else(|| self.unknown(name, Direction::Read))
    }

    /// Endpoint state behind read connection `name`.
    pub fn read(&self, name: &str) -> GraphResult<&'a State> {
        Ok(&self.reading(name)?.state)
    }

    pub fn read_value(&self, name: &str, field: &str) -> GraphResult<&'a Value> {
        self.read(name)?.value(field)
    }

    pub fn read_scalar(&self, name: &str, field: &str) -> GraphResult<f64> {
        self.read(name)?.scalar(field)
    }

    pub fn read_material(&self, name: &str, field: &str) -> GraphResult<&'a Material> {
        self.read(name)?.material(field)
    }

    /// Flows of an edge endpoint; `None` for nodes and for edges that have
    /// not run yet.
    pub fn read_flows(&self, name: &str) -> GraphResult<Option<&'a Flows>> {
        Ok(self.reading(name)?.flows.as_ref())
    }

    /// Stage a command for write connection `name`. Several writes in one
    /// run merge, later values winning.
    pub fn write(&mut self, name: &str, payload: Payload) -> GraphResult<()> {
        if !self.writes.contains_key(name) {
            return Err(self.unknown(name, Direction::Write));
        }
        self.outbox
            .entry(name.to_string())
            .or_default()
            .merge(payload);
        Ok(())
    }

    pub fn state(&self) -> &State {
        self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        self.state
    }

    pub fn monitor(&self) -> &'a Monitor {
        self.monitor
    }
}

/// Everything needed to add a controller to a graph.
pub struct ControllerSpec {
    pub(crate) name: Option<String>,
    pub(crate) model: Box<dyn ControllerModel>,
    pub(crate) state: State,
    pub(crate) connections: BTreeMap<String, ComponentId>,
}

impl ControllerSpec {
    pub fn new(model: impl ControllerModel + 'static) -> Self {
        Self::boxed(Box::new(model))
    }

    pub fn boxed(model: Box<dyn ControllerModel>) -> Self {
        Self {
            name: None,
            model,
            state: State::new(),
            connections: BTreeMap::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Bind connection `name` to a node or edge.
    pub fn connect(mut self, name: impl Into<String>, endpoint: ComponentId) -> Self {
        self.connections.insert(name.into(), endpoint);
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

    pub fn endpoints(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.connections.values().copied()
    }
}

/// A controller owned by a graph.
pub struct Controller {
    pub(crate) id: ComponentId,
    pub(crate) name: Option<String>,
    pub(crate) state: State,
    pub(crate) model: Box<dyn ControllerModel>,
    pub(crate) reads: BTreeMap<String, Signal>,
    pub(crate) writes: BTreeMap<String, Signal>,
    pub(crate) monitor: Monitor,
}

impl Controller {
    /// Checks the connection contract and binds the signals. Endpoint kinds
    /// are the graph's to check.
    pub(crate) fn new(id: ComponentId, spec: ControllerSpec) -> GraphResult<Self> {
        let label = label(spec.model.type_name(), spec.name.as_deref(), id);
        let read = spec.model.required_read();
        let write = spec.model.required_write();
        let required: BTreeSet<&str> = read.iter().chain(write).copied().collect();

        let missing: Vec<String> = required
            .iter()
            .filter(|name| !spec.connections.contains_key(**name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(GraphError::MissingConnections {
                controller: label,
                names: missing,
            });
        }
        let unexpected: Vec<String> = spec
            .connections
            .keys()
            .filter(|name| !required.contains(name.as_str()))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(GraphError::UnexpectedConnections {
                controller: label,
                names: unexpected,
            });
        }

        let bind = |names: &[&str], direction: Direction| -> BTreeMap<String, Signal> {
            names
                .iter()
                .filter_map(|&name| {
                    let endpoint = *spec.connections.get(name)?;
                    let signal = Signal::new(name, id, endpoint, direction);
                    Some((name.to_string(), signal))
                })
                .collect()
        };
        let reads = bind(read, Direction::Read);
        let writes = bind(write, Direction::Write);
        let state = spec.state.conform(&label, spec.model.fields())?;

        Ok(Self {
            id,
            name: spec.name,
            state,
            model: spec.model,
            reads,
            writes,
            monitor: Monitor::default(),
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

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn reads(&self) -> impl Iterator<Item = &Signal> {
        self.reads.values()
    }

    pub fn writes(&self) -> impl Iterator<Item = &Signal> {
        self.writes.values()
    }

    pub fn signal(&self, name: &str, direction: Direction) -> Option<&Signal> {
        match direction {
            Direction::Read => self.reads.get(name),
            Direction::Write => self.writes.get(name),
        }
    }

    /// Connection name to endpoint id, read and write together.
    pub fn connections(&self) -> BTreeMap<String, ComponentId> {
        self.reads
            .values()
            .chain(self.writes.values())
            .map(|s| (s.name().to_string(), s.endpoint()))
            .collect()
    }

    /// Distinct endpoint ids.
    pub fn endpoints(&self) -> BTreeSet<ComponentId> {
        self.reads
            .values()
            .chain(self.writes.values())
            .map(Signal::endpoint)
            .collect()
    }

    pub fn label(&self) -> String {
        label(self.type_name(), self.name.as_deref(), self.id)
    }

    pub(crate) fn rebind(&mut self, from: ComponentId, to: ComponentId) {
        for signal in self.reads.values_mut().chain(self.writes.values_mut()) {
            if signal.endpoint() == from {
                signal.rebind(to);
            }
        }
    }

    /// Runs the control law against `monitor` and returns the commands to
    /// deliver, keyed by endpoint. Commits nothing on failure.
    pub(crate) fn run(
        &mut self,
        monitor: Monitor,
        dt: f64,
    ) -> GraphResult<Vec<(ComponentId, Payload)>> {
        let owner = self.label();
        let mut working = self.state.clone();
        let mut ctx = ControlContext {
            owner: &owner,
            monitor: &monitor,
            state: &mut working,
            writes: &self.writes,
            outbox: BTreeMap::new(),
        };
        self.model.update(&mut ctx, dt)?;
        let outbox = ctx.outbox;

        let mut deliveries = Vec::with_capacity(outbox.len());
        for (name, payload) in outbox {
            if let Some(signal) = self.writes.get_mut(&name) {
                signal.record(payload.clone());
                deliveries.push((signal.endpoint(), payload));
            }
        }
        self.state = working;
        self.monitor = monitor;
        tracing::trace!(controller = %self.id, commands = deliveries.len(), "controller ran");
        Ok(deliveries)
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.id)
            .field("type", &self.type_name())
            .field("name", &self.name)
            .field("connections", &self.connections())
            .field("state", &self.state)
            .finish()
    }
}
