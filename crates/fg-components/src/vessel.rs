//! Vessels: nodes holding a single material inventory.

use fg_graph::{FieldSpec, GraphError, GraphResult, NodeModel, State};
use fg_materials::Material;

/// Open vessel with a flat bottom. The liquid level is `volume / area_m2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vessel;

impl Vessel {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::material("contents"),
        FieldSpec::scalar("area_m2").with_default(1.0),
    ];
}

impl NodeModel for Vessel {
    fn type_name(&self) -> &'static str {
        "Vessel"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        Self::FIELDS
    }
}

/// Level of the contents in a vessel state, in metres.
pub fn level(contents: &Material, area_m2: f64) -> GraphResult<f64> {
    if area_m2 <= 0.0 {
        return Err(GraphError::InvalidArg {
            what: "vessel area must be positive",
        });
    }
    Ok(contents.volume_m3 / area_m2)
}

/// Vessel with an internal heat source.
///
/// The source delivers `power_w` into the contents and decays as
/// `power_w * exp(-decay_per_s * dt)` each step, so a controller that writes
/// `power_w` sets the starting point of a new decay curve.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeatedVessel;

impl HeatedVessel {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::material("contents"),
        FieldSpec::scalar("area_m2").with_default(1.0),
        FieldSpec::scalar("power_w").with_default(0.0),
        FieldSpec::scalar("decay_per_s").with_default(0.0),
    ];
}

impl NodeModel for HeatedVessel {
    fn type_name(&self) -> &'static str {
        "HeatedVessel"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        Self::FIELDS
    }

    fn update_from_state(&mut self, state: &mut State, dt: f64) -> GraphResult<()> {
        let power = state.scalar("power_w")?;
        let decay = state.scalar("decay_per_s")?;
        if decay < 0.0 {
            return Err(GraphError::InvalidArg {
                what: "decay rate must not be negative",
            });
        }
        let heated = state
            .material("contents")?
            .combine(&Material::energy(power * dt))?;
        state.set("contents", heated)?;
        state.set("power_w", power * (-decay * dt).exp())?;
        Ok(())
    }
}
