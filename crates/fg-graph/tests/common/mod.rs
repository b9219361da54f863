//! Small models shared by the fg-graph integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use fg_graph::{
    ControlContext, ControllerModel, EdgeModel, Endpoints, FieldSpec, Flows, Graph, GraphResult,
    NodeModel, Payload, Registry, State,
};

/// Scalar store of `q`.
#[derive(Default)]
pub struct Bin;

impl NodeModel for Bin {
    fn type_name(&self) -> &'static str {
        "Bin"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        const F: &[FieldSpec] = &[FieldSpec::scalar("q")];
        F
    }
}

/// Moves `q` down the gradient: rate = k (q_s - q_t).
#[derive(Default)]
pub struct Leak;

impl EdgeModel for Leak {
    fn type_name(&self) -> &'static str {
        "Leak"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        const F: &[FieldSpec] = &[FieldSpec::scalar("k").with_default(1.0)];
        F
    }

    fn calculate_flows(
        &mut self,
        state: &mut State,
        ends: Endpoints<'_>,
        _dt: f64,
    ) -> GraphResult<Flows> {
        let k = state.scalar("k")?;
        let rate = k * (ends.source_scalar("q")? - ends.target_scalar("q")?);
        Ok(Flows::new().with("q", rate))
    }
}

/// Fixed conservative rate of `q`.
#[derive(Default)]
pub struct Pump;

impl EdgeModel for Pump {
    fn type_name(&self) -> &'static str {
        "Pump"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        const F: &[FieldSpec] = &[FieldSpec::scalar("rate").with_default(1.0)];
        F
    }

    fn calculate_flows(
        &mut self,
        state: &mut State,
        _ends: Endpoints<'_>,
        _dt: f64,
    ) -> GraphResult<Flows> {
        Ok(Flows::new().with("q", state.scalar("rate")?))
    }
}

/// Consumes `q` at the source and produces `yield` times as much at the
/// target.
#[derive(Default)]
pub struct Reactor;

impl EdgeModel for Reactor {
    fn type_name(&self) -> &'static str {
        "Reactor"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        const F: &[FieldSpec] = &[
            FieldSpec::scalar("rate").with_default(1.0),
            FieldSpec::scalar("yield").with_default(2.0),
        ];
        F
    }

    fn calculate_flows(
        &mut self,
        state: &mut State,
        _ends: Endpoints<'_>,
        _dt: f64,
    ) -> GraphResult<Flows> {
        let rate = state.scalar("rate")?;
        let y = state.scalar("yield")?;
        Ok(Flows::new().with_source("q", -rate).with_target("q", rate * y))
    }
}

/// Copies the sensor's `q` into the actuator's `field`.
#[derive(Default)]
pub struct Copier;

impl ControllerModel for Copier {
    fn type_name(&self) -> &'static str {
        "Copier"
    }

    fn required_read(&self) -> &'static [&'static str] {
        &["sensor"]
    }

    fn required_write(&self) -> &'static [&'static str] {
        &["actuator"]
    }

    fn fields(&self) -> &'static [FieldSpec] {
        const F: &[FieldSpec] = &[FieldSpec::scalar("gain").with_default(1.0)];
        F
    }

    fn update(&mut self, ctx: &mut ControlContext<'_>, _dt: f64) -> GraphResult<()> {
        let gain = ctx.state().scalar("gain")?;
        let q = ctx.read_scalar("sensor", "q")?;
        ctx.write("actuator", Payload::new().with("q", gain * q))
    }
}

/// Read-only controller with the default update.
#[derive(Default)]
pub struct Probe;

impl ControllerModel for Probe {
    fn type_name(&self) -> &'static str {
        "Probe"
    }

    fn required_read(&self) -> &'static [&'static str] {
        &["target"]
    }

    fn required_write(&self) -> &'static [&'static str] {
        &[]
    }
}

pub type Log = Arc<Mutex<Vec<String>>>;

fn push(log: &Log, entry: String) {
    if let Ok(mut entries) = log.lock() {
        entries.push(entry);
    }
}

/// Bin that records when its phases run.
pub struct LoggedBin(pub Log, pub &'static str);

impl NodeModel for LoggedBin {
    fn type_name(&self) -> &'static str {
        "LoggedBin"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        Bin.fields()
    }

    fn update_from_state(&mut self, _state: &mut State, _dt: f64) -> GraphResult<()> {
        push(&self.0, format!("node {}", self.1));
        Ok(())
    }
}

/// Leak that records when it calculates.
pub struct LoggedLeak(pub Log, pub &'static str);

impl EdgeModel for LoggedLeak {
    fn type_name(&self) -> &'static str {
        "LoggedLeak"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        Leak.fields()
    }

    fn calculate_flows(
        &mut self,
        state: &mut State,
        ends: Endpoints<'_>,
        dt: f64,
    ) -> GraphResult<Flows> {
        push(&self.0, format!("edge {}", self.1));
        Leak.calculate_flows(state, ends, dt)
    }
}

/// Probe that records when it runs.
pub struct LoggedProbe(pub Log, pub &'static str);

impl ControllerModel for LoggedProbe {
    fn type_name(&self) -> &'static str {
        "LoggedProbe"
    }

    fn required_read(&self) -> &'static [&'static str] {
        &["target"]
    }

    fn required_write(&self) -> &'static [&'static str] {
        &[]
    }

    fn update(&mut self, _ctx: &mut ControlContext<'_>, _dt: f64) -> GraphResult<()> {
        push(&self.0, format!("controller {}", self.1));
        Ok(())
    }
}

pub fn registry() -> Registry {
    Registry::new()
        .with_node::<Bin>()
        .with_edge::<Leak>()
        .with_edge::<Pump>()
        .with_edge::<Reactor>()
        .with_controller::<Copier>()
        .with_controller::<Probe>()
}

pub fn q(graph: &Graph, id: fg_graph::ComponentId) -> f64 {
    graph
        .node(id)
        .and_then(|n| n.state().scalar("q").ok())
        .unwrap_or(f64::NAN)
}

pub fn total_q(graph: &Graph) -> f64 {
    let mut total = 0.0;
    graph.visit(&mut |entity| {
        if let Some(n) = entity.as_node() {
            total += n.state().scalar("q").unwrap_or(0.0);
        }
    });
    total
}
