//! Level-driven pipe between two vessels.

use fg_graph::{EdgeModel, Endpoints, FieldSpec, Flows, GraphError, GraphResult, State};
use fg_materials::Material;

use crate::vessel::level;

/// Gravity-driven connection between two open vessels.
///
/// The mass rate is `conductance * (level_src - level_tgt)` in kg/s. The
/// moving mass carries the donor's specific energy and volume with it. An
/// optional wall conduction term `thermal_conductance * (T_src - T_tgt)` adds
/// heat on top. Both rates are limited to `max_flow_fraction` of the donor's
/// inventory per step so an explicit step can never overdraw a vessel.
///
/// Flows one canonical quantity, `contents`, conservatively.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelPipe;

impl LevelPipe {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::scalar("conductance"),
        FieldSpec::scalar("thermal_conductance").with_default(0.0),
        FieldSpec::scalar("max_flow_fraction").with_default(0.05),
    ];
}

impl EdgeModel for LevelPipe {
    fn type_name(&self) -> &'static str {
        "LevelPipe"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        Self::FIELDS
    }

    fn calculate_flows(
        &mut self,
        state: &mut State,
        ends: Endpoints<'_>,
        dt: f64,
    ) -> GraphResult<Flows> {
        let conductance = state.scalar("conductance")?;
        let thermal = state.scalar("thermal_conductance")?;
        let fraction = state.scalar("max_flow_fraction")?;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(GraphError::InvalidArg {
                what: "max_flow_fraction must lie in [0, 1]",
            });
        }

        let src = ends.source_material("contents")?;
        let tgt = ends.target_material("contents")?;
        let level_src = level(src, ends.source_scalar("area_m2")?)?;
        let level_tgt = level(tgt, ends.target_scalar("area_m2")?)?;

        let m_dot = conductance * (level_src - level_tgt);
        let donor = if m_dot >= 0.0 { src } else { tgt };
        let advected = if donor.mass_kg > 0.0 {
            let m_dot = clamp_rate(m_dot, fraction * donor.mass_kg / dt);
            donor.scale(m_dot / donor.mass_kg)
        } else {
            Material::new(src.substance.clone(), 0.0, 0.0, 0.0)
        };

        let mut rate = advected;
        if thermal != 0.0 {
            let dt_k = src.temperature()?.value - tgt.temperature()?.value;
            let q = thermal * dt_k;
            let hot = if q >= 0.0 { src } else { tgt };
            let q = clamp_rate(q, fraction * hot.energy_j.abs() / dt);
            rate = rate.combine(&Material::energy(q))?;
        }

        tracing::trace!(
            m_dot = rate.mass_kg,
            e_dot = rate.energy_j,
            "level pipe rates"
        );
        Ok(Flows::new().with("contents", rate))
    }
}

fn clamp_rate(rate: f64, limit: f64) -> f64 {
    rate.clamp(-limit, limit)
}
