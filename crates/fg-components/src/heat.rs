//! Heat transfer edges.

use fg_graph::{EdgeModel, Endpoints, FieldSpec, Flows, GraphError, GraphResult, State};
use fg_materials::Material;

fn temperature_difference(ends: &Endpoints<'_>) -> GraphResult<f64> {
    let t_src = ends.source_material("material")?.temperature()?.value;
    let t_tgt = ends.target_material("material")?.temperature()?.value;
    Ok(t_src - t_tgt)
}

/// Conductive heat exchange, `Q = conductance * (T_src - T_tgt)` watts.
///
/// Reads and writes the canonical field `material`; alias it onto whatever
/// the endpoint nodes call their inventory.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeatExchange;

impl HeatExchange {
    const FIELDS: &'static [FieldSpec] = &[FieldSpec::scalar("conductance")];
}

impl EdgeModel for HeatExchange {
    fn type_name(&self) -> &'static str {
        "HeatExchange"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        Self::FIELDS
    }

    fn calculate_flows(
        &mut self,
        state: &mut State,
        ends: Endpoints<'_>,
        _dt: f64,
    ) -> GraphResult<Flows> {
        let q = state.scalar("conductance")? * temperature_difference(&ends)?;
        Ok(Flows::new().with("material", Material::energy(q)))
    }
}

/// Lossy thermal link: the source gives up `Q = conductance * dT` while the
/// target receives only `efficiency * Q`. Not conservative.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThermalCoupling;

impl ThermalCoupling {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::scalar("conductance"),
        FieldSpec::scalar("efficiency").with_default(1.0),
    ];
}

impl EdgeModel for ThermalCoupling {
    fn type_name(&self) -> &'static str {
        "ThermalCoupling"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        Self::FIELDS
    }

    fn calculate_flows(
        &mut self,
        state: &mut State,
        ends: Endpoints<'_>,
        _dt: f64,
    ) -> GraphResult<Flows> {
        let eta = state.scalar("efficiency")?;
        if !(0.0..=1.0).contains(&eta) {
            return Err(GraphError::InvalidArg {
                what: "efficiency must lie in [0, 1]",
            });
        }
        let q = state.scalar("conductance")? * temperature_difference(&ends)?;
        Ok(Flows::new()
            .with_source("material", Material::energy(-q))
            .with_target("material", Material::energy(eta * q)))
    }
}
