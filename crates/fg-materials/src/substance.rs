//! Substance constant tables.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MaterialError, MaterialResult};

/// Thermodynamic phase of a substance, with the constants specific to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Phase {
    /// Ideal gas.
    Gas { molar_mass_kg_per_mol: f64 },
    /// Incompressible liquid.
    Liquid { density_kg_per_m3: f64 },
    /// Incompressible solid.
    Solid { density_kg_per_m3: f64 },
    /// Pure energy with no mass or volume, e.g. a heat flow.
    Energy,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Gas { .. } => "gas",
            Phase::Liquid { .. } => "liquid",
            Phase::Solid { .. } => "solid",
            Phase::Energy => "energy",
        }
    }

    /// Fixed density of condensed phases.
    pub fn fixed_density(&self) -> Option<f64> {
        match *self {
            Phase::Liquid { density_kg_per_m3 } | Phase::Solid { density_kg_per_m3 } => {
                Some(density_kg_per_m3)
            }
            Phase::Gas { .. } | Phase::Energy => None,
        }
    }

    pub fn molar_mass(&self) -> Option<f64> {
        match *self {
            Phase::Gas {
                molar_mass_kg_per_mol,
            } => Some(molar_mass_kg_per_mol),
            _ => None,
        }
    }
}

/// Reference point for the Clausius-Clapeyron saturation curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Saturation {
    pub t0_k: f64,
    pub p0_pa: f64,
    pub latent_heat_j_per_kg: f64,
    pub molar_mass_kg_per_mol: f64,
}

/// Concrete material type: two materials may be combined only when their
/// substances are equal (energy excepted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substance {
    pub name: Cow<'static, str>,
    pub phase: Phase,
    /// Heat capacity at constant volume, J/(kg K).
    pub cv_j_per_kg_k: f64,
    /// Reference temperature where the specific energy equals `u0_j_per_kg`.
    #[serde(default)]
    pub t0_k: f64,
    #[serde(default)]
    pub u0_j_per_kg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturation: Option<Saturation>,
}

impl Substance {
    pub fn new(name: impl Into<Cow<'static, str>>, phase: Phase, cv_j_per_kg_k: f64) -> Self {
        Self {
            name: name.into(),
            phase,
            cv_j_per_kg_k,
            t0_k: 0.0,
            u0_j_per_kg: 0.0,
            saturation: None,
        }
    }

    /// The massless pseudo-substance carried by energy-only materials.
    pub fn energy() -> Self {
        Self::new("Energy", Phase::Energy, 0.0)
    }

    /// Reference the energy scale to `(t0, u0)` instead of absolute zero.
    pub fn with_reference(mut self, t0_k: f64, u0_j_per_kg: f64) -> Self {
        self.t0_k = t0_k;
        self.u0_j_per_kg = u0_j_per_kg;
        self
    }

    pub fn with_saturation(mut self, saturation: Saturation) -> Self {
        self.saturation = Some(saturation);
        self
    }

    pub fn is_energy(&self) -> bool {
        matches!(self.phase, Phase::Energy)
    }

    /// Energy scale starts at absolute zero, so negative energy is non-physical.
    pub fn is_absolute_referenced(&self) -> bool {
        self.t0_k == 0.0 && self.u0_j_per_kg == 0.0
    }

    /// Check the constant table itself.
    pub fn validate(&self) -> MaterialResult<()> {
        if self.is_energy() {
            return Ok(());
        }
        if !is_positive(self.cv_j_per_kg_k) {
            return Err(MaterialError::NonPhysical {
                what: "heat capacity",
                value: self.cv_j_per_kg_k,
            });
        }
        match self.phase {
            Phase::Gas {
                molar_mass_kg_per_mol,
            } if !is_positive(molar_mass_kg_per_mol) => Err(MaterialError::NonPhysical {
                what: "molar mass",
                value: molar_mass_kg_per_mol,
            }),
            Phase::Liquid { density_kg_per_m3 } | Phase::Solid { density_kg_per_m3 }
                if !is_positive(density_kg_per_m3) =>
            {
                Err(MaterialError::NonPhysical {
                    what: "density",
                    value: density_kg_per_m3,
                })
            }
            _ => Ok(()),
        }
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl fmt::Display for Substance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.phase.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_constants() {
        let liquid = Phase::Liquid {
            density_kg_per_m3: 1000.0,
        };
        assert_eq!(liquid.fixed_density(), Some(1000.0));
        assert_eq!(liquid.molar_mass(), None);
        assert_eq!(Phase::Energy.fixed_density(), None);
        assert_eq!(
            Phase::Gas {
                molar_mass_kg_per_mol: 0.029
            }
            .label(),
            "gas"
        );
    }

    #[test]
    fn validate_rejects_bad_constants() {
        let bad = Substance::new(
            "Bad",
            Phase::Liquid {
                density_kg_per_m3: 0.0,
            },
            4000.0,
        );
        assert!(matches!(
            bad.validate(),
            Err(MaterialError::NonPhysical { what: "density", .. })
        ));

        let bad = Substance::new(
            "Bad",
            Phase::Gas {
                molar_mass_kg_per_mol: 0.029,
            },
            -1.0,
        );
        assert!(bad.validate().is_err());
        assert!(Substance::energy().validate().is_ok());
    }

    #[test]
    fn display_includes_phase() {
        let s = Substance::new("Brine", Phase::Liquid { density_kg_per_m3: 1200.0 }, 3500.0);
        assert_eq!(s.to_string(), "Brine (liquid)");
    }
}
