//! Reference controllers.

use fg_graph::{ControlContext, ControllerModel, FieldSpec, GraphError, GraphResult, Payload};

/// What a [`PiController`] measures on its `sensor` endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Measure {
    /// A scalar field.
    Scalar(String),
    /// Temperature of a material field, in kelvin.
    Temperature(String),
    /// Mass of a material field, in kg.
    Mass(String),
}

impl Measure {
    fn read(&self, ctx: &ControlContext<'_>) -> GraphResult<f64> {
        match self {
            Measure::Scalar(field) => ctx.read_scalar(PiController::SENSOR, field),
            Measure::Temperature(field) => Ok(ctx
                .read_material(PiController::SENSOR, field)?
                .temperature()?
                .value),
            Measure::Mass(field) => Ok(ctx.read_material(PiController::SENSOR, field)?.mass_kg),
        }
    }
}

/// PI feedback loop from `sensor` to `actuator`.
///
/// Gains, setpoint and output limits live in the controller state so they can
/// be retuned by writing the state and persist with snapshots. The integral
/// stops accumulating while the output is saturated.
///
/// Which field is measured and which field is commanded are fixed at
/// construction. The [`Default`] controller is a thermostat: it measures
/// the temperature of `contents` and commands `power_w`.
#[derive(Debug, Clone)]
pub struct PiController {
    measure: Measure,
    command: String,
}

impl PiController {
    const SENSOR: &'static str = "sensor";
    const ACTUATOR: &'static str = "actuator";

    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::scalar("kp"),
        FieldSpec::scalar("ti"),
        FieldSpec::scalar("setpoint"),
        FieldSpec::scalar("out_min"),
        FieldSpec::scalar("out_max"),
        FieldSpec::scalar("integral").with_default(0.0),
    ];

    pub fn new(measure: Measure, command: impl Into<String>) -> Self {
        Self {
            measure,
            command: command.into(),
        }
    }

    pub fn measure(&self) -> &Measure {
        &self.measure
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Default for PiController {
    fn default() -> Self {
        Self::new(Measure::Temperature("contents".into()), "power_w")
    }
}

impl ControllerModel for PiController {
    fn type_name(&self) -> &'static str {
        "PiController"
    }

    fn required_read(&self) -> &'static [&'static str] {
        &[Self::SENSOR]
    }

    fn required_write(&self) -> &'static [&'static str] {
        &[Self::ACTUATOR]
    }

    fn fields(&self) -> &'static [FieldSpec] {
        Self::FIELDS
    }

    fn update(&mut self, ctx: &mut ControlContext<'_>, dt: f64) -> GraphResult<()> {
        let state = ctx.state();
        let kp = state.scalar("kp")?;
        let ti = state.scalar("ti")?;
        let sp = state.scalar("setpoint")?;
        let out_min = state.scalar("out_min")?;
        let out_max = state.scalar("out_max")?;
        let integral = state.scalar("integral")?;
        if ti <= 0.0 {
            return Err(GraphError::InvalidArg {
                what: "ti must be positive",
            });
        }
        if out_min >= out_max {
            return Err(GraphError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }

        let pv = self.measure.read(ctx)?;
        let error = sp - pv;
        let ki = kp / ti;
        let candidate = integral + error * dt;
        let raw = kp * error + ki * candidate;
        let output = raw.clamp(out_min, out_max);

        // Saturated: hold the integral.
        let integral = if output == raw { candidate } else { integral };
        if output != raw {
            tracing::debug!(pv, sp, raw, output, "pi output saturated");
        }

        ctx.state_mut().set("integral", integral)?;
        ctx.write(Self::ACTUATOR, Payload::new().with(self.command.as_str(), output))
    }
}

/// Read-only controller. It never commands anything; its monitor holds the
/// latest view of `target` after every step.
#[derive(Debug, Clone, Copy, Default)]
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
